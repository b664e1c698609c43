//! Action Menu message handler
//!
//! Routes each inbound action menu message to the matching `process_*` call.
//! Action menus never auto-respond: a menu request is answered when the
//! application calls `create_menu`. The only outbound message produced here
//! is the problem report for a selection on a cleared menu.

use std::sync::Arc;

use agent_telemetry::{log_rejected_message, metric_inc, PROBLEM_REPORTS_SENT};
use shared_types::{
    AgentMessage, InboundMessageContext, OutboundMessageContext, PlaintextMessage,
    ProblemReportDescription,
};
use tracing::debug;

use crate::error::{ActionMenuError, ActionMenuProblemReportReason, ActionMenuResult};
use crate::messages::{ActionMenuMessage, ActionMenuProblemReportMessage, PROTOCOL_NAME};
use crate::ports::inbound::ActionMenuApi;

/// Handler for every `https://didcomm.org/action-menu/1.x/*` message.
pub struct ActionMenuHandler<A>
where
    A: ActionMenuApi + ?Sized,
{
    service: Arc<A>,
}

impl<A> ActionMenuHandler<A>
where
    A: ActionMenuApi + ?Sized,
{
    pub fn new(service: Arc<A>) -> Self {
        Self { service }
    }

    /// Handle one inbound message, returning the reply to send, if any.
    pub async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> ActionMenuResult<Option<OutboundMessageContext>> {
        let message = ActionMenuMessage::parse(&inbound.message)?;
        let name = message.name();
        debug!(message = name, id = %inbound.message.id(), "Handling action menu message");

        let result = match message {
            ActionMenuMessage::MenuRequest(request) => self
                .service
                .process_request(&inbound.with_message(request))
                .await
                .map(|_| None),
            ActionMenuMessage::Menu(menu) => self
                .service
                .process_menu(&inbound.with_message(menu))
                .await
                .map(|_| None),
            ActionMenuMessage::Perform(perform) => {
                let inbound = inbound.with_message(perform);
                match self.service.process_perform(&inbound).await {
                    Ok(_) => Ok(None),
                    Err(ActionMenuError::ProblemReport { message, reason }) => {
                        self.problem_report(&inbound, message, reason).map(Some)
                    }
                    Err(err) => Err(err),
                }
            }
            ActionMenuMessage::ProblemReport(report) => self
                .service
                .process_problem_report(&inbound.with_message(report))
                .await
                .map(|_| None),
        };

        if let Err(err) = &result {
            log_rejected_message!(PROTOCOL_NAME, name, err, kind = err.kind());
        }
        result
    }

    /// Problem report on the inbound thread, back over the same connection.
    fn problem_report<M: AgentMessage>(
        &self,
        inbound: &InboundMessageContext<M>,
        description: String,
        reason: ActionMenuProblemReportReason,
    ) -> ActionMenuResult<OutboundMessageContext> {
        let connection = inbound.assert_ready_connection()?.clone();
        let report = ActionMenuProblemReportMessage::new(
            ProblemReportDescription::new(description, reason.as_str()),
            inbound.message.thread_id(),
        );
        metric_inc!(PROBLEM_REPORTS_SENT, &[PROTOCOL_NAME, reason.as_str()]);
        Ok(OutboundMessageContext::for_connection(
            &report,
            &inbound.agent_context,
            connection,
            None,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionMenuRecord, ActionMenuRole, ActionMenuState};
    use crate::messages::{MenuMessage, MenuRequestMessage, PerformMessage};
    use crate::ports::inbound::{
        ClearMenuOptions, CreateMenuOptions, CreatePerformOptions, CreateRequestOptions,
        FindMenuOptions, MessageAndRecord,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_storage::{Query, QueryOptions};
    use shared_types::{AgentContext, ConnectionRecord, DidExchangeState, OutboundTarget};

    // Mock ActionMenuApi recording which process_* call was made
    struct MockActionMenuApi {
        calls: Mutex<Vec<&'static str>>,
        menu_cleared: bool,
    }

    impl MockActionMenuApi {
        fn new(menu_cleared: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                menu_cleared,
            }
        }

        fn record(&self, call: &'static str) -> ActionMenuRecord {
            self.calls.lock().push(call);
            ActionMenuRecord::new("conn-1", ActionMenuRole::Responder, ActionMenuState::Done, "t")
        }
    }

    #[async_trait]
    impl ActionMenuApi for MockActionMenuApi {
        async fn create_request(
            &self,
            _ctx: &AgentContext,
            _options: CreateRequestOptions,
        ) -> ActionMenuResult<MessageAndRecord<MenuRequestMessage>> {
            unimplemented!()
        }

        async fn process_request(
            &self,
            _inbound: &InboundMessageContext<MenuRequestMessage>,
        ) -> ActionMenuResult<ActionMenuRecord> {
            Ok(self.record("process_request"))
        }

        async fn create_menu(
            &self,
            _ctx: &AgentContext,
            _options: CreateMenuOptions,
        ) -> ActionMenuResult<MessageAndRecord<MenuMessage>> {
            unimplemented!()
        }

        async fn process_menu(
            &self,
            _inbound: &InboundMessageContext<MenuMessage>,
        ) -> ActionMenuResult<ActionMenuRecord> {
            Ok(self.record("process_menu"))
        }

        async fn create_perform(
            &self,
            _ctx: &AgentContext,
            _options: CreatePerformOptions,
        ) -> ActionMenuResult<MessageAndRecord<PerformMessage>> {
            unimplemented!()
        }

        async fn process_perform(
            &self,
            inbound: &InboundMessageContext<PerformMessage>,
        ) -> ActionMenuResult<ActionMenuRecord> {
            self.calls.lock().push("process_perform");
            if self.menu_cleared {
                Err(ActionMenuError::ProblemReport {
                    message: "Action Menu has been cleared by the responder".into(),
                    reason: ActionMenuProblemReportReason::Timeout,
                })
            } else {
                Err(ActionMenuError::NotFound(format!(
                    "No Action Menu found with thread id {}",
                    inbound.message.thread_id()
                )))
            }
        }

        async fn clear_menu(
            &self,
            _ctx: &AgentContext,
            _options: ClearMenuOptions,
        ) -> ActionMenuResult<ActionMenuRecord> {
            unimplemented!()
        }

        async fn process_problem_report(
            &self,
            _inbound: &InboundMessageContext<ActionMenuProblemReportMessage>,
        ) -> ActionMenuResult<ActionMenuRecord> {
            Ok(self.record("process_problem_report"))
        }

        async fn find_by_id(
            &self,
            _ctx: &AgentContext,
            _record_id: &str,
        ) -> ActionMenuResult<Option<ActionMenuRecord>> {
            Ok(None)
        }

        async fn find(
            &self,
            _ctx: &AgentContext,
            _options: &FindMenuOptions,
        ) -> ActionMenuResult<Option<ActionMenuRecord>> {
            Ok(None)
        }

        async fn find_all_by_query(
            &self,
            _ctx: &AgentContext,
            _query: &Query,
            _options: QueryOptions,
        ) -> ActionMenuResult<Vec<ActionMenuRecord>> {
            Ok(Vec::new())
        }
    }

    fn inbound(value: serde_json::Value) -> InboundMessageContext<PlaintextMessage> {
        InboundMessageContext::new(
            PlaintextMessage::from_value(value).unwrap(),
            AgentContext::default(),
        )
        .with_connection(ConnectionRecord::new(DidExchangeState::Completed))
    }

    #[tokio::test]
    async fn test_routes_by_message_name() {
        let api = Arc::new(MockActionMenuApi::new(false));
        let handler = ActionMenuHandler::new(api.clone());

        for (name, body) in [
            ("menu-request", json!({})),
            ("menu", json!({"title": "t", "description": "d", "options": []})),
            (
                "problem-report",
                json!({"description": {"en": "expired", "code": "timeout"}}),
            ),
        ] {
            let mut value = json!({
                "@id": format!("id-{name}"),
                "@type": format!("https://didcomm.org/action-menu/1.0/{name}"),
            });
            value
                .as_object_mut()
                .unwrap()
                .extend(body.as_object().unwrap().clone());

            let reply = handler.handle(inbound(value)).await.unwrap();
            assert!(reply.is_none());
        }

        assert_eq!(
            *api.calls.lock(),
            vec!["process_request", "process_menu", "process_problem_report"]
        );
    }

    #[tokio::test]
    async fn test_cleared_menu_perform_answers_with_problem_report() {
        let handler = ActionMenuHandler::new(Arc::new(MockActionMenuApi::new(true)));
        let message = inbound(json!({
            "@id": "perform-1",
            "@type": "https://didcomm.org/action-menu/1.0/perform",
            "~thread": {"thid": "thread-1"},
            "name": "opt1"
        }));
        let connection_id = message.connection.as_ref().unwrap().id.clone();

        let outbound = handler.handle(message).await.unwrap().unwrap();

        assert_eq!(
            outbound.message.message_type(),
            "https://didcomm.org/action-menu/1.0/problem-report"
        );
        assert_eq!(outbound.message.thread_id(), "thread-1");
        assert_eq!(
            outbound.message.as_value()["description"]["code"],
            "timeout"
        );
        assert!(matches!(outbound.target, OutboundTarget::Connection(_)));
        assert_eq!(outbound.connection_id(), Some(connection_id.as_str()));
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let handler = ActionMenuHandler::new(Arc::new(MockActionMenuApi::new(false)));
        let message = inbound(json!({
            "@id": "perform-1",
            "@type": "https://didcomm.org/action-menu/1.0/perform",
            "name": "opt1"
        }));

        let err = handler.handle(message).await.unwrap_err();
        assert!(matches!(err, ActionMenuError::NotFound(_)));
        assert!(err.to_string().contains("perform-1"));
    }

    #[tokio::test]
    async fn test_foreign_message_type_rejected() {
        let handler = ActionMenuHandler::new(Arc::new(MockActionMenuApi::new(false)));
        let message = inbound(json!({
            "@id": "x",
            "@type": "https://didcomm.org/action-menu/1.0/unknown"
        }));

        assert!(matches!(
            handler.handle(message).await,
            Err(ActionMenuError::Message(_))
        ));
    }
}
