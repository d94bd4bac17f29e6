//! Edit journal: the records the registry persists and the sinks it writes
//! them to.
//!
//! Replay drivers feed records back through
//! [`crate::StorageVolumeManager::replay`] in append order.

mod log;
mod record;

pub use log::{EditLog, JsonLinesEditLog, MemoryEditLog};
pub use record::{JournalRecord, TableStorageInfo, TableStorageInfos};
