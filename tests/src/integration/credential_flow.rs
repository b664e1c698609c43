//! # Issue Credential Flow
//!
//! Holder (alice) and issuer (bob) over issue-credential 1.0:
//!
//! ```text
//! alice                         bob
//!   │ ── propose (optional) ──→ │
//!   │ ←────────────── offer ─── │
//!   │ ── request ─────────────→ │
//!   │ ←───────── credential ─── │
//!   │ ── ack ─────────────────→ │
//! ```

#[cfg(test)]
mod tests {
    use agent_runtime::Agent;
    use dc_02_issue_credential::{
        AutoAcceptCredential, CredentialExchangeRecord, CredentialFormatInput, CredentialPreview,
        CredentialPreviewAttribute, CredentialRole, CredentialState,
    };

    use crate::integration::fixture::AgentPair;

    const CRED_DEF_ID: &str = "did:example:bob:3:CL:20:tag";

    fn attributes() -> Vec<CredentialPreviewAttribute> {
        vec![
            CredentialPreviewAttribute::new("name", "Alice"),
            CredentialPreviewAttribute::new("degree", "Computer Science"),
        ]
    }

    fn offer() -> CredentialFormatInput {
        CredentialFormatInput {
            cred_def_id: CRED_DEF_ID.to_string(),
            schema_id: None,
            attributes: attributes(),
        }
    }

    async fn record_on_thread(agent: &Agent, thread_id: &str) -> CredentialExchangeRecord {
        agent
            .credentials()
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .find(|record| record.thread_id == thread_id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_offer_request_issue_ack() {
        let mut pair = AgentPair::new();

        let issuer = pair
            .bob
            .credentials()
            .offer_credential(&pair.bob_connection_id, offer())
            .await
            .unwrap();
        assert_eq!(issuer.state, CredentialState::OfferSent);
        assert_eq!(issuer.role, CredentialRole::Issuer);
        pair.pump().await;

        let holder = record_on_thread(&pair.alice, &issuer.thread_id).await;
        assert_eq!(holder.state, CredentialState::OfferReceived);
        assert_eq!(holder.role, CredentialRole::Holder);
        assert_eq!(holder.connection_id.as_deref(), Some(pair.alice_connection_id.as_str()));
        assert_eq!(holder.credential_attributes, Some(attributes()));

        let holder = pair.alice.credentials().accept_offer(&holder.id).await.unwrap();
        assert_eq!(holder.state, CredentialState::RequestSent);
        pair.pump().await;

        let issuer = pair.bob.credentials().get_by_id(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::RequestReceived);

        let issuer = pair.bob.credentials().accept_request(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::CredentialIssued);
        pair.pump().await;

        let holder = pair.alice.credentials().get_by_id(&holder.id).await.unwrap();
        assert_eq!(holder.state, CredentialState::CredentialReceived);
        assert_eq!(holder.credential_ids.len(), 1);

        let holder = pair
            .alice
            .credentials()
            .accept_credential(&holder.id)
            .await
            .unwrap();
        assert_eq!(holder.state, CredentialState::Done);
        pair.pump().await;

        let issuer = pair.bob.credentials().get_by_id(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::Done);
    }

    #[tokio::test]
    async fn test_proposal_answered_with_offer() {
        let mut pair = AgentPair::new();

        let holder = pair
            .alice
            .credentials()
            .propose_credential(
                &pair.alice_connection_id,
                CredentialPreview::new(attributes()),
                Some(CRED_DEF_ID.to_string()),
            )
            .await
            .unwrap();
        assert_eq!(holder.state, CredentialState::ProposalSent);
        pair.pump().await;

        let issuer = record_on_thread(&pair.bob, &holder.thread_id).await;
        assert_eq!(issuer.state, CredentialState::ProposalReceived);
        assert_eq!(issuer.role, CredentialRole::Issuer);

        let issuer = pair.bob.credentials().accept_proposal(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::OfferSent);
        assert_eq!(issuer.thread_id, holder.thread_id);
        pair.pump().await;

        let holder = pair.alice.credentials().get_by_id(&holder.id).await.unwrap();
        assert_eq!(holder.state, CredentialState::OfferReceived);
    }

    #[tokio::test]
    async fn test_auto_accept_always_completes_exchange() {
        let mut pair = AgentPair::with_configs(
            |alice| alice.credentials.auto_accept_credentials = AutoAcceptCredential::Always,
            |bob| bob.credentials.auto_accept_credentials = AutoAcceptCredential::Always,
        );

        let issuer = pair
            .bob
            .credentials()
            .offer_credential(&pair.bob_connection_id, offer())
            .await
            .unwrap();
        // request, credential and ack are sent by the handlers
        assert_eq!(pair.pump().await, 4);

        let issuer = pair.bob.credentials().get_by_id(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::Done);
        let holder = record_on_thread(&pair.alice, &issuer.thread_id).await;
        assert_eq!(holder.state, CredentialState::Done);
        assert_eq!(holder.credential_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_declined_offer_sends_nothing() {
        let mut pair = AgentPair::new();

        let issuer = pair
            .bob
            .credentials()
            .offer_credential(&pair.bob_connection_id, offer())
            .await
            .unwrap();
        pair.pump().await;

        let holder = record_on_thread(&pair.alice, &issuer.thread_id).await;
        let holder = pair.alice.credentials().decline_offer(&holder.id).await.unwrap();
        assert_eq!(holder.state, CredentialState::Declined);
        assert_eq!(pair.pump().await, 0);

        let issuer = pair.bob.credentials().get_by_id(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::OfferSent);
    }

    #[tokio::test]
    async fn test_accept_request_out_of_order_rejected() {
        let mut pair = AgentPair::new();

        let issuer = pair
            .bob
            .credentials()
            .offer_credential(&pair.bob_connection_id, offer())
            .await
            .unwrap();
        pair.pump().await;

        let result = pair.bob.credentials().accept_request(&issuer.id).await;
        assert!(result.is_err());
        let issuer = pair.bob.credentials().get_by_id(&issuer.id).await.unwrap();
        assert_eq!(issuer.state, CredentialState::OfferSent);
    }
}
