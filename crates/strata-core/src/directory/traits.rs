//! Volume directory trait.

use crate::error::Result;
use crate::volume::{DatabaseId, PathInfo, StorageVolume, TableId, VolumeDef};

/// Authoritative store of volume definitions.
///
/// All operations are synchronous. Absence is reported as `Ok(None)`;
/// transport or storage failures as [`crate::VolumeError::Upstream`].
pub trait VolumeDirectory: Send + Sync {
    fn get_by_name(&self, name: &str) -> Result<Option<StorageVolume>>;

    fn get_by_id(&self, id: &str) -> Result<Option<StorageVolume>>;

    fn list(&self) -> Result<Vec<StorageVolume>>;

    /// Create a volume and return its assigned id.
    ///
    /// Fails with [`crate::VolumeError::AlreadyExists`] if the name is taken.
    fn create(&self, def: &VolumeDef) -> Result<String>;

    /// Apply changed attributes of an existing volume, matched by id.
    fn update(&self, volume: &StorageVolume) -> Result<()>;

    /// Replace the full definition of an existing volume, matched by id.
    fn replace(&self, volume: &StorageVolume) -> Result<()>;

    fn remove_by_name(&self, name: &str) -> Result<()>;

    /// Allocate a physical path for a table's data under a volume.
    fn allocate_path(
        &self,
        volume_id: &str,
        db_id: DatabaseId,
        table_id: TableId,
    ) -> Result<PathInfo>;
}

/// Path layout shared by the bundled directories.
pub(crate) fn table_path(location: &str, db_id: DatabaseId, table_id: TableId) -> String {
    format!("{}/db{}/{}", location.trim_end_matches('/'), db_id, table_id)
}
