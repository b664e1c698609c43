//! # Action Menu Flow
//!
//! Requester (alice) and responder (bob) walking the action menu protocol:
//!
//! 1. **Request**: alice asks for the root menu
//! 2. **Menu**: bob answers with options
//! 3. **Perform**: alice selects an option, both sides finish in `done`
//!
//! Plus the unsolicited menu and the selection on a cleared menu.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use agent_runtime::AgentEvent;
    use dc_01_action_menu::{
        ActionMenu, ActionMenuEvent, ActionMenuOption, ActionMenuRole, ActionMenuSelection,
        ActionMenuState,
    };
    use shared_bus::{EventFilter, EventTopic, Subscription};

    use crate::integration::fixture::AgentPair;

    fn bank_menu() -> ActionMenu {
        ActionMenu::new(
            "Bank",
            "What would you like to do?",
            vec![
                ActionMenuOption::new("balance", "Check balance", "Show the balance"),
                ActionMenuOption::new("statement", "Statement", "Send the last statement"),
            ],
        )
        .unwrap()
    }

    fn transitions(events: &mut Subscription<AgentEvent>) -> Vec<(Option<ActionMenuState>, ActionMenuState)> {
        events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                AgentEvent::ActionMenu(ActionMenuEvent::StateChanged(changed)) => Some((
                    changed.previous_state,
                    changed.action_menu_record.state,
                )),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_request_menu_perform() {
        let mut pair = AgentPair::new();
        let mut alice_events = pair
            .alice
            .subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));
        let mut bob_events = pair
            .bob
            .subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));

        // Step 1: request
        let request = pair
            .alice
            .action_menu()
            .request_menu(&pair.alice_connection_id)
            .await
            .unwrap();
        assert_eq!(request.state, ActionMenuState::AwaitingRootMenu);
        assert_eq!(pair.pump().await, 1);

        let bob_record = pair
            .bob
            .action_menu()
            .find_active_menu(&pair.bob_connection_id, ActionMenuRole::Responder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob_record.state, ActionMenuState::PreparingRootMenu);
        assert_eq!(bob_record.thread_id, request.thread_id);

        // Step 2: menu
        let sent = pair
            .bob
            .action_menu()
            .send_menu(&pair.bob_connection_id, bank_menu())
            .await
            .unwrap();
        assert_eq!(sent.state, ActionMenuState::AwaitingSelection);
        pair.pump().await;

        let alice_record = pair
            .alice
            .action_menu()
            .find_active_menu(&pair.alice_connection_id, ActionMenuRole::Requester)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice_record.state, ActionMenuState::PreparingSelection);
        assert_eq!(alice_record.menu, Some(bank_menu()));
        assert_eq!(alice_record.thread_id, request.thread_id);

        // Step 3: perform
        let params = BTreeMap::from([("period".to_string(), "2024-01".to_string())]);
        let performed = pair
            .alice
            .action_menu()
            .perform_action(
                &pair.alice_connection_id,
                ActionMenuSelection::new("statement").with_params(params.clone()),
            )
            .await
            .unwrap();
        assert_eq!(performed.state, ActionMenuState::Done);
        pair.pump().await;

        let bob_record = pair
            .bob
            .action_menu()
            .find_active_menu(&pair.bob_connection_id, ActionMenuRole::Responder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob_record.state, ActionMenuState::Done);
        let selection = bob_record.performed_action.unwrap();
        assert_eq!(selection.name, "statement");
        assert_eq!(selection.params, Some(params));

        assert_eq!(
            transitions(&mut alice_events),
            vec![
                (None, ActionMenuState::AwaitingRootMenu),
                (
                    Some(ActionMenuState::AwaitingRootMenu),
                    ActionMenuState::PreparingSelection
                ),
                (
                    Some(ActionMenuState::PreparingSelection),
                    ActionMenuState::Done
                ),
            ]
        );
        assert_eq!(
            transitions(&mut bob_events),
            vec![
                (None, ActionMenuState::PreparingRootMenu),
                (
                    Some(ActionMenuState::PreparingRootMenu),
                    ActionMenuState::AwaitingSelection
                ),
                (Some(ActionMenuState::AwaitingSelection), ActionMenuState::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_unsolicited_menu() {
        let mut pair = AgentPair::new();

        pair.bob
            .action_menu()
            .send_menu(&pair.bob_connection_id, bank_menu())
            .await
            .unwrap();
        pair.pump().await;

        let alice_record = pair
            .alice
            .action_menu()
            .find_active_menu(&pair.alice_connection_id, ActionMenuRole::Requester)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice_record.state, ActionMenuState::PreparingSelection);
        assert!(alice_record.menu.unwrap().has_option("balance"));
    }

    #[tokio::test]
    async fn test_perform_on_cleared_menu_reports_problem() {
        let mut pair = AgentPair::new();

        pair.bob
            .action_menu()
            .send_menu(&pair.bob_connection_id, bank_menu())
            .await
            .unwrap();
        pair.pump().await;

        let cleared = pair
            .bob
            .action_menu()
            .clear_active_menu(&pair.bob_connection_id, ActionMenuRole::Responder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.state, ActionMenuState::Null);
        assert_eq!(pair.pump().await, 0);

        pair.alice
            .action_menu()
            .perform_action(&pair.alice_connection_id, ActionMenuSelection::new("balance"))
            .await
            .unwrap();
        // perform, then the problem report coming back
        assert_eq!(pair.pump().await, 2);

        let alice_record = pair
            .alice
            .action_menu()
            .find_active_menu(&pair.alice_connection_id, ActionMenuRole::Requester)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice_record.state, ActionMenuState::Null);
        assert!(alice_record.menu.is_none());
        assert!(alice_record.performed_action.is_none());
    }

    #[tokio::test]
    async fn test_perform_without_menu_fails() {
        let pair = AgentPair::new();

        let result = pair
            .alice
            .action_menu()
            .perform_action(&pair.alice_connection_id, ActionMenuSelection::new("balance"))
            .await;
        assert!(result.is_err());
    }
}
