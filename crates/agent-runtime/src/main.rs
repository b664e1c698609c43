//! # Agent Runtime Demo
//!
//! Runs two agents in one process, connected over a [`LoopbackTransport`],
//! through a complete action menu exchange:
//!
//! ```text
//!  alice (requester)                       bob (responder)
//!        │ ── menu-request ──────────────────→ │ preparing-root-menu
//!        │ ←───────────────────────── menu ── │ awaiting-selection
//!        │ preparing-selection                 │
//!        │ ── perform ───────────────────────→ │ done
//!        │ done                                │
//! ```
//!
//! Configuration for the responder is read from `DIDCOMM_*` variables; the
//! requester uses defaults with its own label.

use std::sync::Arc;
use std::time::Duration;

use agent_runtime::{Agent, AgentConfig, AgentEvent, LoopbackTransport};
use agent_telemetry::{init_telemetry, TelemetryConfig};
use anyhow::{anyhow, Context, Result};
use dc_01_action_menu::{
    ActionMenu, ActionMenuEvent, ActionMenuOption, ActionMenuRecord, ActionMenuSelection,
    ActionMenuState,
};
use shared_bus::{EventFilter, EventTopic, Subscription};
use shared_types::{ConnectionRecord, DidExchangeState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Two agents and the tasks driving their inboxes.
struct DemoRuntime {
    alice: Arc<Agent>,
    bob: Arc<Agent>,
    alice_connection_id: String,
    bob_connection_id: String,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DemoRuntime {
    fn start(bob_config: AgentConfig) -> Result<Self> {
        let transport = Arc::new(LoopbackTransport::new());

        let mut alice_config = AgentConfig::default();
        alice_config.identity.label = "alice".to_string();
        alice_config.identity.endpoints = vec!["loop://alice".to_string()];
        let alice_endpoint = first_endpoint(&alice_config)?;
        let bob_endpoint = first_endpoint(&bob_config)?;

        let alice_inbox = transport.register_endpoint(alice_endpoint.clone());
        let bob_inbox = transport.register_endpoint(bob_endpoint.clone());

        let alice = Arc::new(Agent::new(alice_config, transport.clone())?);
        let bob = Arc::new(Agent::new(bob_config, transport.clone())?);

        // Connections are established out of band.
        let alice_connection =
            ConnectionRecord::new(DidExchangeState::Completed).with_their_label(bob.label());
        let bob_connection =
            ConnectionRecord::new(DidExchangeState::Completed).with_their_label(alice.label());
        transport.connect(
            &alice_endpoint,
            &alice_connection.id,
            &bob_endpoint,
            &bob_connection.id,
        );
        let alice_connection_id = alice_connection.id.clone();
        let bob_connection_id = bob_connection.id.clone();
        alice.add_connection(alice_connection);
        bob.add_connection(bob_connection);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(Arc::clone(&alice).run(alice_inbox, shutdown_rx.clone())),
            tokio::spawn(Arc::clone(&bob).run(bob_inbox, shutdown_rx)),
        ];

        Ok(Self {
            alice,
            bob,
            alice_connection_id,
            bob_connection_id,
            shutdown_tx,
            tasks,
        })
    }

    async fn run_action_menu(&self) -> Result<ActionMenuRecord> {
        let mut alice_events = self
            .alice
            .subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));
        let mut bob_events = self
            .bob
            .subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));

        self.alice
            .action_menu()
            .request_menu(&self.alice_connection_id)
            .await?;
        wait_for_state(&mut bob_events, ActionMenuState::PreparingRootMenu).await?;

        let menu = ActionMenu::new(
            "Bank",
            "What would you like to do?",
            vec![
                ActionMenuOption::new("balance", "Check balance", "Show the account balance"),
                ActionMenuOption::new("statement", "Statement", "Send the last statement"),
            ],
        )?;
        self.bob
            .action_menu()
            .send_menu(&self.bob_connection_id, menu)
            .await?;

        let received = wait_for_state(&mut alice_events, ActionMenuState::PreparingSelection).await?;
        let option = received
            .menu
            .as_ref()
            .and_then(|menu| menu.options.first())
            .ok_or_else(|| anyhow!("menu has no options"))?;
        info!(option = %option.name, "Alice selects an option");

        self.alice
            .action_menu()
            .perform_action(
                &self.alice_connection_id,
                ActionMenuSelection::new(option.name.clone()),
            )
            .await?;

        wait_for_state(&mut bob_events, ActionMenuState::Done).await
    }

    async fn shutdown(self) -> Result<()> {
        info!("Shutting down agents");
        self.shutdown_tx.send(true)?;
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}

fn first_endpoint(config: &AgentConfig) -> Result<String> {
    config
        .identity
        .endpoints
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("agent {} has no endpoint", config.identity.label))
}

/// Next action menu record reaching `state` on this subscription.
async fn wait_for_state(
    events: &mut Subscription<AgentEvent>,
    state: ActionMenuState,
) -> Result<ActionMenuRecord> {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if let AgentEvent::ActionMenu(ActionMenuEvent::StateChanged(changed)) = event {
                if changed.action_menu_record.state == state {
                    return Ok(changed.action_menu_record);
                }
            }
        }
        Err(anyhow!("event bus closed"))
    })
    .await
    .with_context(|| format!("timed out waiting for action menu state {state}"))?
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let mut bob_config = AgentConfig::from_env();
    if bob_config.identity.label == AgentConfig::default().identity.label {
        bob_config.identity.label = "bob".to_string();
        bob_config.identity.endpoints = vec!["loop://bob".to_string()];
    }

    let runtime = DemoRuntime::start(bob_config)?;
    let record = runtime.run_action_menu().await?;

    let selection = record
        .performed_action
        .as_ref()
        .map(|selection| selection.name.as_str())
        .unwrap_or("none");
    info!(
        responder = %runtime.bob.label(),
        selection,
        thread_id = %record.thread_id,
        "Action menu exchange completed"
    );

    runtime.shutdown().await
}
