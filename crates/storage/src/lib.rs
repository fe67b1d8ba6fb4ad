//! arena-pulse-storage: table store abstraction and backends.
//!
//! The prediction pipeline only ever inserts; [`TableReader`] exists for
//! tooling and the conformance suite.

pub mod conformance;
mod error;
pub mod jsonl;
pub mod memory;
mod record;
#[cfg(feature = "rest")]
pub mod rest;
mod traits;

pub use error::StorageError;
pub use jsonl::{JsonlEntry, JsonlStore};
pub use memory::{InMemoryStore, NullStore};
pub use record::{PersistedPredictionRecord, PREDICTIONS_TABLE, SYSTEM_CREATOR};
#[cfg(feature = "rest")]
pub use rest::{RestStore, RestStoreConfig};
pub use traits::{TableReader, TableStore};
