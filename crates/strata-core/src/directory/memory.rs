//! In-process volume directory.

use super::traits::{table_path, VolumeDirectory};
use crate::error::{Result, VolumeError};
use crate::volume::{DatabaseId, PathInfo, StorageVolume, TableId, VolumeDef};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Volume directory kept entirely in memory.
///
/// Useful for embedding and tests. Volumes are keyed by id; name lookups
/// scan, which is fine for the handful of volumes a cluster has.
#[derive(Default)]
pub struct InMemoryVolumeDirectory {
    volumes: RwLock<HashMap<String, StorageVolume>>,
    allocations: AtomicUsize,
}

impl InMemoryVolumeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `allocate_path` calls served so far.
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, StorageVolume>>> {
        self.volumes
            .read()
            .map_err(|_| VolumeError::upstream("Failed to acquire volume directory lock"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StorageVolume>>> {
        self.volumes
            .write()
            .map_err(|_| VolumeError::upstream("Failed to acquire volume directory lock"))
    }
}

impl VolumeDirectory for InMemoryVolumeDirectory {
    fn get_by_name(&self, name: &str) -> Result<Option<StorageVolume>> {
        Ok(self.read()?.values().find(|v| v.name == name).cloned())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<StorageVolume>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<StorageVolume>> {
        let mut volumes: Vec<_> = self.read()?.values().cloned().collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    fn create(&self, def: &VolumeDef) -> Result<String> {
        let mut volumes = self.write()?;
        if volumes.values().any(|v| v.name == def.name) {
            return Err(VolumeError::AlreadyExists {
                name: def.name.clone(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        volumes.insert(id.clone(), def.clone().into_volume(id.clone()));
        debug!("Created volume {} with id {}", def.name, id);
        Ok(id)
    }

    fn update(&self, volume: &StorageVolume) -> Result<()> {
        let mut volumes = self.write()?;
        let existing = volumes
            .get_mut(&volume.id)
            .ok_or_else(|| VolumeError::not_found(&volume.name))?;
        existing.params = volume.params.clone();
        existing.enabled = volume.enabled;
        existing.comment = volume.comment.clone();
        Ok(())
    }

    fn replace(&self, volume: &StorageVolume) -> Result<()> {
        let mut volumes = self.write()?;
        if !volumes.contains_key(&volume.id) {
            return Err(VolumeError::not_found(&volume.name));
        }
        volumes.insert(volume.id.clone(), volume.clone());
        Ok(())
    }

    fn remove_by_name(&self, name: &str) -> Result<()> {
        let mut volumes = self.write()?;
        let before = volumes.len();
        volumes.retain(|_, v| v.name != name);
        if volumes.len() == before {
            return Err(VolumeError::not_found(name));
        }
        Ok(())
    }

    fn allocate_path(
        &self,
        volume_id: &str,
        db_id: DatabaseId,
        table_id: TableId,
    ) -> Result<PathInfo> {
        let volumes = self.read()?;
        let volume = volumes
            .get(volume_id)
            .ok_or_else(|| VolumeError::upstream(format!("Unknown volume id {}", volume_id)))?;
        let location = volume.locations.first().ok_or_else(|| {
            VolumeError::upstream(format!("Volume {} has no location", volume.name))
        })?;

        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(PathInfo {
            volume_id: volume_id.to_string(),
            full_path: table_path(location, db_id, table_id),
        })
    }
}
