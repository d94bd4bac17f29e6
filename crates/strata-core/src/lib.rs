//! Strata Core - Storage volume registry for a shared-data database.
//!
//! This crate keeps track of which storage volume each database and table
//! stores its data on, resolves process-level cloud storage settings into a
//! volume definition, and replays journaled changes to rebuild that state.
//! Volume definitions themselves live in an external directory service
//! reached through the [`VolumeDirectory`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::{
//!     CloudStorageConfig, InMemoryCatalog, InMemoryVolumeDirectory, MemoryEditLog,
//!     StorageVolumeManager,
//! };
//!
//! fn main() -> strata_core::Result<()> {
//!     let config = CloudStorageConfig::load("strata.json".as_ref())?;
//!     let manager = StorageVolumeManager::new(
//!         Arc::new(InMemoryVolumeDirectory::new()),
//!         Arc::new(InMemoryCatalog::new()),
//!         Arc::new(MemoryEditLog::new()),
//!         config,
//!     );
//!
//!     // Create the builtin volume and bind a new database to the default
//!     let builtin_id = manager.create_builtin_volume()?;
//!     manager.bind_database_to_volume("default", 10001)?;
//!     println!("Builtin volume: {}", builtin_id);
//!
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod error;
pub mod journal;
pub mod manager;
pub mod resolver;
pub mod volume;

// Re-export commonly used types
pub use binding::{BindingSnapshot, BindingTable};
pub use catalog::{CatalogTable, InMemoryCatalog, MetadataCatalog};
pub use config::{CloudStorageConfig, RegistryConfig};
pub use directory::{InMemoryVolumeDirectory, SqliteVolumeDirectory, VolumeDirectory};
pub use error::{ErrorKind, Result, VolumeError};
pub use journal::{
    EditLog, JournalRecord, JsonLinesEditLog, MemoryEditLog, TableStorageInfo, TableStorageInfos,
};
pub use manager::{StorageVolumeManager, UnboundEntities};
pub use resolver::{AwsCredentialType, ResolvedVolumeConfig};
pub use volume::{DatabaseId, PathInfo, StorageType, StorageVolume, TableId, VolumeDef};
