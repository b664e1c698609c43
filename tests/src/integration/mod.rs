//! # Integration Flows
//!
//! Each test builds two agents, `alice` and `bob`, joined by a completed
//! connection over one [`agent_runtime::LoopbackTransport`]. Deliveries are
//! processed by [`fixture::AgentPair::pump`] rather than by spawned run
//! loops, so every exchange step is deterministic.

pub mod action_menu_flow;
pub mod credential_flow;
pub mod mediation_flow;

#[cfg(test)]
pub(crate) mod fixture {
    use std::sync::Arc;

    use agent_runtime::{Agent, AgentConfig, Delivery, LoopbackTransport};
    use shared_types::{ConnectionRecord, DidExchangeState};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Upper bound on pump rounds; a protocol bouncing forever fails the test.
    const MAX_PUMP_ROUNDS: usize = 32;

    pub struct AgentPair {
        pub alice: Agent,
        pub bob: Agent,
        pub alice_connection_id: String,
        pub bob_connection_id: String,
        alice_inbox: UnboundedReceiver<Delivery>,
        bob_inbox: UnboundedReceiver<Delivery>,
    }

    impl AgentPair {
        pub fn new() -> Self {
            Self::with_configs(|_| {}, |_| {})
        }

        pub fn with_configs(
            alice_config: impl FnOnce(&mut AgentConfig),
            bob_config: impl FnOnce(&mut AgentConfig),
        ) -> Self {
            let transport = Arc::new(LoopbackTransport::new());

            let mut alice_cfg = config("alice");
            alice_config(&mut alice_cfg);
            let mut bob_cfg = config("bob");
            bob_config(&mut bob_cfg);

            let alice_inbox = transport.register_endpoint("loop://alice");
            let bob_inbox = transport.register_endpoint("loop://bob");
            let alice = Agent::new(alice_cfg, transport.clone()).unwrap();
            let bob = Agent::new(bob_cfg, transport.clone()).unwrap();

            let alice_connection =
                ConnectionRecord::new(DidExchangeState::Completed).with_their_label("bob");
            let bob_connection =
                ConnectionRecord::new(DidExchangeState::Completed).with_their_label("alice");
            transport.connect(
                "loop://alice",
                &alice_connection.id,
                "loop://bob",
                &bob_connection.id,
            );

            let pair = Self {
                alice_connection_id: alice_connection.id.clone(),
                bob_connection_id: bob_connection.id.clone(),
                alice,
                bob,
                alice_inbox,
                bob_inbox,
            };
            pair.alice.add_connection(alice_connection);
            pair.bob.add_connection(bob_connection);
            pair
        }

        /// Deliver queued messages in both directions until neither inbox
        /// has anything left. Returns the number of deliveries processed.
        pub async fn pump(&mut self) -> usize {
            let mut total = 0;
            for _ in 0..MAX_PUMP_ROUNDS {
                let processed = self.alice.process_pending(&mut self.alice_inbox).await
                    + self.bob.process_pending(&mut self.bob_inbox).await;
                if processed == 0 {
                    return total;
                }
                total += processed;
            }
            panic!("agents still exchanging messages after {MAX_PUMP_ROUNDS} rounds");
        }
    }

    fn config(label: &str) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.identity.label = label.to_string();
        config.identity.endpoints = vec![format!("loop://{label}")];
        config
    }
}
