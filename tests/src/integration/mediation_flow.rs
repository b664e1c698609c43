//! # Coordinate Mediation Flow
//!
//! Recipient (alice) asking mediator (bob) for routing, then maintaining
//! its keylist. Bob announces `http://mediator.example:3000` and one
//! routing key.

#[cfg(test)]
mod tests {
    use agent_runtime::{AgentConfig, AgentError, AgentEvent};
    use dc_03_mediation::{
        KeylistUpdate, KeylistUpdateResult, MediationError, MediationEvent, MediationRole,
        MediationState,
    };
    use shared_bus::{EventFilter, EventTopic};

    use crate::integration::fixture::AgentPair;

    const MEDIATOR_ENDPOINT: &str = "http://mediator.example:3000";
    const ROUTING_KEY: &str = "8HH5gYEeNc3z7PYXmd54d4x6qAfCNrqQqEB3nS7Zfu7K";

    fn mediator(config: &mut AgentConfig) {
        config.mediator.endpoint = Some(MEDIATOR_ENDPOINT.to_string());
        config.mediator.routing_keys = vec![ROUTING_KEY.to_string()];
    }

    fn auto_mediator(config: &mut AgentConfig) {
        mediator(config);
        config.mediator.auto_accept_mediation_requests = true;
    }

    #[tokio::test]
    async fn test_request_grant_and_update_keylist() {
        let mut pair = AgentPair::with_configs(|_| {}, mediator);
        let mut alice_events = pair
            .alice
            .subscribe(EventFilter::topics(vec![EventTopic::Mediation]));

        let requested = pair
            .alice
            .mediation()
            .request_mediation(&pair.alice_connection_id)
            .await
            .unwrap();
        assert_eq!(requested.state, MediationState::Requested);
        assert_eq!(requested.role, MediationRole::Recipient);
        pair.pump().await;

        let pending = pair
            .bob
            .mediation()
            .find_by_connection_id(&pair.bob_connection_id, MediationRole::Mediator)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.state, MediationState::Requested);

        let granted = pair.bob.mediation().grant_request(&pending.id).await.unwrap();
        assert_eq!(granted.state, MediationState::Granted);
        pair.pump().await;

        let recipient = pair.alice.mediation().get_by_id(&requested.id).await.unwrap();
        assert_eq!(recipient.state, MediationState::Granted);
        assert_eq!(recipient.endpoint.as_deref(), Some(MEDIATOR_ENDPOINT));
        assert_eq!(recipient.routing_keys, vec![ROUTING_KEY]);

        pair.alice
            .mediation()
            .update_keylist(
                &recipient.id,
                vec![KeylistUpdate::add("key-1"), KeylistUpdate::add("key-2")],
            )
            .await
            .unwrap();
        pair.pump().await;

        let recipient = pair.alice.mediation().get_by_id(&recipient.id).await.unwrap();
        assert_eq!(recipient.recipient_keys, vec!["key-1", "key-2"]);
        let mediator = pair.bob.mediation().get_by_id(&pending.id).await.unwrap();
        assert_eq!(mediator.recipient_keys, vec!["key-1", "key-2"]);

        // Removing an unknown key changes nothing on either side
        pair.alice
            .mediation()
            .update_keylist(
                &recipient.id,
                vec![KeylistUpdate::remove("key-1"), KeylistUpdate::remove("key-9")],
            )
            .await
            .unwrap();
        pair.pump().await;

        let recipient = pair.alice.mediation().get_by_id(&recipient.id).await.unwrap();
        assert_eq!(recipient.recipient_keys, vec!["key-2"]);

        let keylists: Vec<_> = alice_events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                AgentEvent::Mediation(MediationEvent::KeylistUpdated(updated)) => {
                    Some(updated.keylist)
                }
                _ => None,
            })
            .collect();
        assert_eq!(keylists.len(), 2);
        assert_eq!(
            keylists[1]
                .iter()
                .map(|updated| updated.result)
                .collect::<Vec<_>>(),
            vec![KeylistUpdateResult::Success, KeylistUpdateResult::NoChange]
        );
    }

    #[tokio::test]
    async fn test_auto_accept_grants_immediately() {
        let mut pair = AgentPair::with_configs(|_| {}, auto_mediator);

        let requested = pair
            .alice
            .mediation()
            .request_mediation(&pair.alice_connection_id)
            .await
            .unwrap();
        // request, then the grant coming back
        assert_eq!(pair.pump().await, 2);

        let recipient = pair.alice.mediation().get_by_id(&requested.id).await.unwrap();
        assert_eq!(recipient.state, MediationState::Granted);

        let recipient = pair
            .alice
            .mediation()
            .set_default_mediator(&recipient.id)
            .await
            .unwrap();
        assert!(recipient.is_default());
        let default = pair.alice.mediation().find_default_mediator().await.unwrap();
        assert_eq!(default.map(|record| record.id), Some(recipient.id));
    }

    #[tokio::test]
    async fn test_denied_request() {
        let mut pair = AgentPair::with_configs(|_| {}, mediator);

        let requested = pair
            .alice
            .mediation()
            .request_mediation(&pair.alice_connection_id)
            .await
            .unwrap();
        pair.pump().await;

        let pending = pair
            .bob
            .mediation()
            .find_by_connection_id(&pair.bob_connection_id, MediationRole::Mediator)
            .await
            .unwrap()
            .unwrap();
        let denied = pair.bob.mediation().deny_request(&pending.id).await.unwrap();
        assert_eq!(denied.state, MediationState::Denied);
        pair.pump().await;

        let recipient = pair.alice.mediation().get_by_id(&requested.id).await.unwrap();
        assert_eq!(recipient.state, MediationState::Denied);

        let result = pair
            .alice
            .mediation()
            .update_keylist(&recipient.id, vec![KeylistUpdate::add("key-1")])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_grant_without_routing_fails() {
        let mut pair = AgentPair::new();

        pair.alice
            .mediation()
            .request_mediation(&pair.alice_connection_id)
            .await
            .unwrap();
        pair.pump().await;

        let pending = pair
            .bob
            .mediation()
            .find_by_connection_id(&pair.bob_connection_id, MediationRole::Mediator)
            .await
            .unwrap()
            .unwrap();
        let err = pair.bob.mediation().grant_request(&pending.id).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Mediation(MediationError::MediatorNotInitialized)
        ));

        let pending = pair.bob.mediation().get_by_id(&pending.id).await.unwrap();
        assert_eq!(pending.state, MediationState::Requested);
    }
}
