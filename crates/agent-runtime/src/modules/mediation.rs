//! Coordinate mediation module API

use std::sync::Arc;

use dc_03_mediation::{KeylistUpdate, MediationApi, MediationRecord, MediationRole};

use shared_storage::ExchangeGuard;

use super::ModuleContext;
use crate::error::AgentResult;

pub struct MediationModule {
    service: Arc<dyn MediationApi>,
    context: ModuleContext,
}

impl MediationModule {
    pub fn new(service: Arc<dyn MediationApi>, context: ModuleContext) -> Self {
        Self { service, context }
    }

    /// Recipient asks the peer to mediate for it.
    pub async fn request_mediation(&self, connection_id: &str) -> AgentResult<MediationRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let created = self
            .service
            .create_request(&self.context.agent_context, &connection)
            .await?;
        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Mediator grants a pending request.
    pub async fn grant_request(&self, record_id: &str) -> AgentResult<MediationRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.context.ready_connection(&record.connection_id)?;
        let created = self
            .service
            .create_grant_mediation_message(&self.context.agent_context, record)
            .await?;
        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Mediator denies a pending request.
    pub async fn deny_request(&self, record_id: &str) -> AgentResult<MediationRecord> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.context.ready_connection(&record.connection_id)?;
        let created = self
            .service
            .create_deny_mediation_message(&self.context.agent_context, record)
            .await?;
        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Recipient asks its mediator to add or remove routed keys. The record
    /// changes once the mediator's response arrives.
    pub async fn update_keylist(
        &self,
        record_id: &str,
        updates: Vec<KeylistUpdate>,
    ) -> AgentResult<()> {
        let (_guard, record) = self.locked_record(record_id).await?;
        let connection = self.context.ready_connection(&record.connection_id)?;
        let message = self
            .service
            .create_keylist_update_message(&self.context.agent_context, &record, updates)
            .await?;
        self.context
            .send_to_connection(&message, connection, Some(record.id))
            .await
    }

    pub async fn set_default_mediator(&self, record_id: &str) -> AgentResult<MediationRecord> {
        let (_guard, mut record) = self.locked_record(record_id).await?;
        self.service
            .set_default_mediator(&self.context.agent_context, &mut record)
            .await?;
        Ok(record)
    }

    pub async fn find_default_mediator(&self) -> AgentResult<Option<MediationRecord>> {
        Ok(self
            .service
            .find_default_mediator(&self.context.agent_context)
            .await?)
    }

    /// Mediation record for the connection, as seen from `role`.
    pub async fn find_by_connection_id(
        &self,
        connection_id: &str,
        role: MediationRole,
    ) -> AgentResult<Option<MediationRecord>> {
        Ok(self
            .service
            .find_by_connection_id(&self.context.agent_context, connection_id, role)
            .await?)
    }

    /// Lock the record's connection, then read the record again so changes
    /// made while waiting are not overwritten.
    async fn locked_record(
        &self,
        record_id: &str,
    ) -> AgentResult<(ExchangeGuard, MediationRecord)> {
        let record = self.get_by_id(record_id).await?;
        let guard = self.context.lock_connection(&record.connection_id).await;
        Ok((guard, self.get_by_id(record_id).await?))
    }

    pub async fn get_by_id(&self, record_id: &str) -> AgentResult<MediationRecord> {
        Ok(self
            .service
            .get_by_id(&self.context.agent_context, record_id)
            .await?)
    }

    pub async fn get_all(&self) -> AgentResult<Vec<MediationRecord>> {
        Ok(self.service.get_all(&self.context.agent_context).await?)
    }
}
