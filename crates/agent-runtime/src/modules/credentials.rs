//! Issue credential module API
//!
//! Covers connection-based exchanges. Connection-less offers go through
//! [`CredentialsApi::create_offer`] directly.

use std::sync::Arc;

use dc_02_issue_credential::{
    AcceptCredentialOptions, AcceptOfferOptions, AcceptProposalOptions, AcceptRequestOptions,
    CreateOfferOptions, CreateProposalOptions, CredentialExchangeRecord, CredentialFormatInput,
    CredentialPreview, CredentialsApi,
};
use shared_storage::ExchangeGuard;
use shared_types::{AgentMessage, ConnectionRecord};

use super::ModuleContext;
use crate::error::{AgentError, AgentResult};

pub struct CredentialsModule {
    service: Arc<dyn CredentialsApi>,
    context: ModuleContext,
}

impl CredentialsModule {
    pub fn new(service: Arc<dyn CredentialsApi>, context: ModuleContext) -> Self {
        Self { service, context }
    }

    /// Holder proposes a credential.
    pub async fn propose_credential(
        &self,
        connection_id: &str,
        credential_proposal: CredentialPreview,
        cred_def_id: Option<String>,
    ) -> AgentResult<CredentialExchangeRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let mut options = CreateProposalOptions::new(connection.clone(), credential_proposal);
        options.cred_def_id = cred_def_id;

        let created = self
            .service
            .create_proposal(&self.context.agent_context, options)
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    /// Issuer answers a received proposal with an offer.
    pub async fn accept_proposal(&self, record_id: &str) -> AgentResult<CredentialExchangeRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.record_connection(&record)?;
        let created = self
            .service
            .accept_proposal(&self.context.agent_context, AcceptProposalOptions::new(record))
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    /// Issuer starts an exchange with an offer.
    pub async fn offer_credential(
        &self,
        connection_id: &str,
        offer: CredentialFormatInput,
    ) -> AgentResult<CredentialExchangeRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let created = self
            .service
            .create_offer(
                &self.context.agent_context,
                CreateOfferOptions {
                    connection: Some(connection.clone()),
                    offer,
                    comment: None,
                    auto_accept_credential: None,
                },
            )
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    /// Holder answers a received offer with a request.
    pub async fn accept_offer(&self, record_id: &str) -> AgentResult<CredentialExchangeRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.record_connection(&record)?;
        let created = self
            .service
            .accept_offer(&self.context.agent_context, AcceptOfferOptions::new(record))
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    /// Holder declines a received offer. Nothing is sent to the issuer.
    pub async fn decline_offer(&self, record_id: &str) -> AgentResult<CredentialExchangeRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        Ok(self
            .service
            .decline_offer(&self.context.agent_context, record)
            .await?)
    }

    /// Issuer answers a received request with the credential.
    pub async fn accept_request(&self, record_id: &str) -> AgentResult<CredentialExchangeRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.record_connection(&record)?;
        let created = self
            .service
            .accept_request(&self.context.agent_context, AcceptRequestOptions::new(record))
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    /// Holder stores the received credential and acknowledges it.
    pub async fn accept_credential(
        &self,
        record_id: &str,
    ) -> AgentResult<CredentialExchangeRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.record_connection(&record)?;
        let created = self
            .service
            .accept_credential(
                &self.context.agent_context,
                AcceptCredentialOptions {
                    credential_record: record,
                },
            )
            .await?;
        self.send(&created.message, connection, &created.record).await?;
        Ok(created.record)
    }

    pub async fn get_by_id(&self, record_id: &str) -> AgentResult<CredentialExchangeRecord> {
        Ok(self
            .service
            .get_by_id(&self.context.agent_context, record_id)
            .await?)
    }

    pub async fn get_all(&self) -> AgentResult<Vec<CredentialExchangeRecord>> {
        Ok(self.service.get_all(&self.context.agent_context).await?)
    }

    /// Lock the record's exchange, then read the record again so changes
    /// made while waiting are not overwritten.
    async fn locked_record(
        &self,
        record_id: &str,
    ) -> AgentResult<(ExchangeGuard, CredentialExchangeRecord)> {
        let record = self.get_by_id(record_id).await?;
        let guard = self
            .context
            .lock_exchange(record.connection_id.as_deref(), &record.thread_id)
            .await;
        Ok((guard, self.get_by_id(record_id).await?))
    }

    fn record_connection(&self, record: &CredentialExchangeRecord) -> AgentResult<ConnectionRecord> {
        let connection_id = record
            .connection_id
            .as_deref()
            .ok_or_else(|| AgentError::RecordWithoutConnection(record.id.clone()))?;
        self.context.ready_connection(connection_id)
    }

    async fn send<M: AgentMessage>(
        &self,
        message: &M,
        connection: ConnectionRecord,
        record: &CredentialExchangeRecord,
    ) -> AgentResult<()> {
        self.context
            .send_to_connection(message, connection, Some(record.id.clone()))
            .await
    }
}
