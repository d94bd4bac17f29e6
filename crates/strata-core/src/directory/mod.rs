//! Volume directory service: the authoritative store of volume definitions.
//!
//! The registry only talks to the [`VolumeDirectory`] trait. Two
//! implementations ship with the crate:
//! - [`InMemoryVolumeDirectory`] for embedding and tests
//! - [`SqliteVolumeDirectory`] for a standalone, persistent directory

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryVolumeDirectory;
pub use sqlite::SqliteVolumeDirectory;
pub use traits::VolumeDirectory;
