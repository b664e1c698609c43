//! # Shared Storage
//!
//! Persistence for exchange records.
//!
//! ```text
//!  Exchange Service
//!        │ typed records
//!        ↓
//!  Repository<T>  ──serialize + tags──→  StorageService (port)
//!                                              │
//!                                  ┌───────────┴───────────┐
//!                                  ↓                       ↓
//!                       InMemoryStorageService      external engine
//! ```
//!
//! | Concern | Type |
//! |---------|------|
//! | Entity contract | [`Record`] |
//! | Tag query language | [`Query`], [`QueryOptions`] |
//! | Store port | [`StorageService`] |
//! | Typed access | [`Repository`] |
//! | Stored protocol messages | [`DidCommMessageRepository`] |
//! | Per-exchange exclusivity | [`ExchangeLocks`] |

pub mod adapters;
pub mod didcomm_message;
pub mod error;
pub mod lock;
pub mod ports;
pub mod query;
pub mod record;
pub mod repository;

pub use adapters::InMemoryStorageService;
pub use didcomm_message::{DidCommMessageRecord, DidCommMessageRepository, DidCommMessageRole};
pub use error::{StorageError, StorageResult};
pub use lock::{ExchangeGuard, ExchangeLocks};
pub use ports::{StorageService, StoredRecord};
pub use query::{Query, QueryOptions};
pub use record::{Record, TagValue, Tags, TagsExt};
pub use repository::Repository;
