//! Agent container: configuration of every module.

pub mod config;

pub use config::{
    AgentConfig, AgentIdentity, BusConfig, ConfigError, CredentialsModuleConfig,
    MediatorModuleConfig,
};
