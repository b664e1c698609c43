//! Connection lookup
//!
//! DID exchange is handled elsewhere; the agent only needs to resolve the
//! connection an inbound message arrived on, and the connection an
//! application call targets.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::ConnectionRecord;

use crate::error::{AgentError, AgentResult};

/// In-memory connection records, keyed by id.
#[derive(Debug, Default)]
pub struct ConnectionStore {
    connections: RwLock<HashMap<String, ConnectionRecord>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a connection.
    pub fn save(&self, connection: ConnectionRecord) {
        self.connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    pub fn find_by_id(&self, connection_id: &str) -> Option<ConnectionRecord> {
        self.connections.read().get(connection_id).cloned()
    }

    pub fn get_by_id(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        self.find_by_id(connection_id)
            .ok_or_else(|| AgentError::ConnectionNotFound(connection_id.to_string()))
    }

    pub fn get_all(&self) -> Vec<ConnectionRecord> {
        self.connections.read().values().cloned().collect()
    }

    pub fn remove(&self, connection_id: &str) -> Option<ConnectionRecord> {
        self.connections.write().remove(connection_id)
    }
}
