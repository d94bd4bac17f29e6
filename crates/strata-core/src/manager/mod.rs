//! Storage volume manager: the entry point for volume DDL, binding DDL,
//! builtin bootstrap and journal replay.

mod rebind;

use crate::binding::BindingTable;
use crate::catalog::MetadataCatalog;
use crate::config::{CloudStorageConfig, RegistryConfig};
use crate::directory::VolumeDirectory;
use crate::error::{Result, VolumeError};
use crate::journal::{EditLog, JournalRecord, TableStorageInfos};
use crate::resolver;
use crate::volume::{DatabaseId, StorageType, StorageVolume, TableId, VolumeDef};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Databases and tables that predate volume bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnboundEntities {
    pub databases: Vec<DatabaseId>,
    pub tables: Vec<TableId>,
}

impl UnboundEntities {
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.tables.is_empty()
    }
}

/// Orchestrates the volume directory, the binding table and the journal.
///
/// All collaborators are passed in as handles so they can be swapped for
/// in-memory versions.
pub struct StorageVolumeManager {
    directory: Arc<dyn VolumeDirectory>,
    catalog: Arc<dyn MetadataCatalog>,
    edit_log: Arc<dyn EditLog>,
    config: CloudStorageConfig,
    bindings: BindingTable,
    /// Serializes builtin volume creation.
    bootstrap_lock: Mutex<()>,
}

fn is_default_keyword(name: &str) -> bool {
    name.eq_ignore_ascii_case(RegistryConfig::DEFAULT_VOLUME_KEYWORD)
}

impl StorageVolumeManager {
    pub fn new(
        directory: Arc<dyn VolumeDirectory>,
        catalog: Arc<dyn MetadataCatalog>,
        edit_log: Arc<dyn EditLog>,
        config: CloudStorageConfig,
    ) -> Self {
        Self {
            bindings: BindingTable::new(directory.clone()),
            directory,
            catalog,
            edit_log,
            config,
            bootstrap_lock: Mutex::new(()),
        }
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn config(&self) -> &CloudStorageConfig {
        &self.config
    }

    /// Append a record for a change already applied in memory. If the append
    /// fails, `rollback` undoes the change and the append error is returned.
    fn journal_or_rollback(
        &self,
        record: &JournalRecord,
        rollback: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        if let Err(err) = self.edit_log.append(record) {
            if let Err(rollback_err) = rollback() {
                warn!("Failed to roll back unjournaled change {:?}: {}", record, rollback_err);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Undo a database bind, restoring the volume it was bound to before.
    fn restore_database(&self, db_id: DatabaseId, previous: Option<String>) -> Result<()> {
        match previous {
            Some(volume_id) => self.bindings.bind_database(&volume_id, db_id, true).map(|_| ()),
            None => self.bindings.unbind_database(db_id),
        }
    }

    fn restore_table(&self, table_id: TableId, previous: Option<String>) -> Result<()> {
        match previous {
            Some(volume_id) => self.bindings.bind_table(&volume_id, table_id, true).map(|_| ()),
            None => self.bindings.unbind_table(table_id),
        }
    }

    /// Bind a database and journal it, leaving the binding untouched if the
    /// journal rejects the record.
    fn bind_database_journaled(&self, volume_id: &str, db_id: DatabaseId) -> Result<bool> {
        let previous = self.bindings.volume_id_of_database(db_id)?;
        if !self.bindings.bind_database(volume_id, db_id, false)? {
            return Ok(false);
        }
        self.journal_or_rollback(
            &JournalRecord::BindDatabase {
                volume_id: volume_id.to_string(),
                db_id,
            },
            || self.restore_database(db_id, previous),
        )?;
        Ok(true)
    }

    fn bind_table_journaled(&self, volume_id: &str, table_id: TableId) -> Result<bool> {
        let previous = self.bindings.volume_id_of_table(table_id)?;
        if !self.bindings.bind_table(volume_id, table_id, false)? {
            return Ok(false);
        }
        self.journal_or_rollback(
            &JournalRecord::BindTable {
                volume_id: volume_id.to_string(),
                table_id,
            },
            || self.restore_table(table_id, previous),
        )?;
        Ok(true)
    }

    // ========================================
    // Volume lookups
    // ========================================

    pub fn get_volume_by_name(&self, name: &str) -> Result<Option<StorageVolume>> {
        self.directory.get_by_name(name)
    }

    pub fn get_volume(&self, id: &str) -> Result<Option<StorageVolume>> {
        self.directory.get_by_id(id)
    }

    pub fn list_volumes(&self) -> Result<Vec<StorageVolume>> {
        self.directory.list()
    }

    pub fn list_volume_names(&self) -> Result<Vec<String>> {
        Ok(self.directory.list()?.into_iter().map(|v| v.name).collect())
    }

    fn require_volume(&self, name: &str) -> Result<StorageVolume> {
        self.get_volume_by_name(name)?
            .ok_or_else(|| VolumeError::not_found(name))
    }

    // ========================================
    // Volume DDL
    // ========================================

    /// Create a volume and return its id. `enabled` defaults to true.
    pub fn create_volume(
        &self,
        name: &str,
        storage_type: StorageType,
        locations: Vec<String>,
        params: BTreeMap<String, String>,
        enabled: Option<bool>,
        comment: &str,
    ) -> Result<String> {
        if self.get_volume_by_name(name)?.is_some() {
            return Err(VolumeError::AlreadyExists {
                name: name.to_string(),
            });
        }
        resolver::validate_locations(storage_type, &locations)?;

        let id = self.directory.create(&VolumeDef {
            name: name.to_string(),
            storage_type,
            locations,
            params,
            enabled: enabled.unwrap_or(true),
            comment: comment.to_string(),
            storage_key: String::new(),
        })?;
        info!("Created storage volume {} ({})", name, id);
        Ok(id)
    }

    /// Apply changed params, enabled flag or comment of a volume.
    pub fn update_volume(&self, volume: &StorageVolume) -> Result<()> {
        if self.get_volume(&volume.id)?.is_none() {
            return Err(VolumeError::not_found(&volume.name));
        }
        if !volume.enabled && self.is_default_volume(&volume.id)? {
            return Err(VolumeError::InUse {
                name: volume.name.clone(),
                reason: "the default storage volume cannot be disabled".to_string(),
            });
        }

        self.directory.update(volume)?;
        info!("Updated storage volume {}", volume.name);
        Ok(())
    }

    /// Replace the full definition of a volume, then move every table bound
    /// to it onto freshly allocated paths.
    pub fn replace_volume(&self, volume: &StorageVolume) -> Result<TableStorageInfos> {
        if self.get_volume(&volume.id)?.is_none() {
            return Err(VolumeError::not_found(&volume.name));
        }
        resolver::validate_locations(volume.storage_type, &volume.locations)?;
        if !volume.enabled && self.is_default_volume(&volume.id)? {
            return Err(VolumeError::InUse {
                name: volume.name.clone(),
                reason: "the default storage volume cannot be disabled".to_string(),
            });
        }

        self.directory.replace(volume)?;
        info!("Replaced storage volume {}", volume.name);
        self.update_table_storage_info(&volume.id)
    }

    /// Remove a volume that is neither the default nor bound to anything.
    ///
    /// The bound-entity check and the directory removal do not hold the
    /// binding lock. A bind that passed its existence check just before the
    /// removal can still land on the removed volume; callers that need to
    /// exclude this must serialize volume DDL with binding DDL.
    pub fn remove_volume(&self, name: &str) -> Result<()> {
        let volume = self.require_volume(name)?;
        if self.is_default_volume(&volume.id)? {
            return Err(VolumeError::InUse {
                name: name.to_string(),
                reason: "it is the default storage volume".to_string(),
            });
        }

        let databases = self.bindings.databases_of_volume(&volume.id)?;
        let tables = self.bindings.tables_of_volume(&volume.id)?;
        if !databases.is_empty() || !tables.is_empty() {
            return Err(VolumeError::InUse {
                name: name.to_string(),
                reason: format!(
                    "{} database(s) and {} table(s) are still bound to it",
                    databases.len(),
                    tables.len()
                ),
            });
        }

        self.directory.remove_by_name(name)?;
        info!("Removed storage volume {}", name);
        Ok(())
    }

    // ========================================
    // Default volume
    // ========================================

    /// The effective default volume: the pointer if set, else the builtin
    /// volume if it exists.
    pub fn get_default_volume(&self) -> Result<Option<StorageVolume>> {
        match self.bindings.default_volume_id()? {
            Some(id) => self.get_volume(&id),
            None => self.get_volume_by_name(RegistryConfig::BUILTIN_STORAGE_VOLUME),
        }
    }

    fn is_default_volume(&self, volume_id: &str) -> Result<bool> {
        Ok(self
            .get_default_volume()?
            .is_some_and(|default| default.id == volume_id))
    }

    /// Make an enabled volume the default and journal the change.
    pub fn set_default_volume(&self, name: &str) -> Result<()> {
        let volume = self.require_volume(name)?;
        if !volume.enabled {
            return Err(VolumeError::Disabled {
                name: name.to_string(),
            });
        }

        let previous = self.bindings.default_volume_id()?;
        self.bindings.set_default_volume_id(&volume.id)?;
        self.journal_or_rollback(
            &JournalRecord::SetDefaultVolume {
                volume_id: volume.id.clone(),
            },
            || {
                self.bindings
                    .set_default_volume_id(previous.as_deref().unwrap_or_default())
            },
        )?;
        info!("Default storage volume is now {}", name);
        Ok(())
    }

    // ========================================
    // Binding DDL
    // ========================================

    fn resolve_named_volume(&self, name: &str) -> Result<StorageVolume> {
        if is_default_keyword(name) {
            self.get_default_volume()?
                .ok_or(VolumeError::NoDefaultVolume)
        } else {
            self.require_volume(name)
        }
    }

    fn resolve_table_volume(&self, name: &str, db_id: DatabaseId) -> Result<StorageVolume> {
        if !name.is_empty() {
            return self.resolve_named_volume(name);
        }
        match self.bindings.volume_id_of_database(db_id)? {
            Some(volume_id) => self
                .get_volume(&volume_id)?
                .ok_or_else(|| VolumeError::not_found(volume_id)),
            None => self
                .get_default_volume()?
                .ok_or(VolumeError::NoDefaultVolume),
        }
    }

    fn ensure_enabled(volume: &StorageVolume) -> Result<()> {
        if volume.enabled {
            Ok(())
        } else {
            Err(VolumeError::Disabled {
                name: volume.name.clone(),
            })
        }
    }

    /// Bind a new database to a volume given by name or `DEFAULT`.
    pub fn bind_database_to_volume(&self, name: &str, db_id: DatabaseId) -> Result<bool> {
        let volume = self.resolve_named_volume(name)?;
        Self::ensure_enabled(&volume)?;

        self.bind_database_journaled(&volume.id, db_id)
    }

    /// Bind a new table to a volume.
    ///
    /// An empty name means the volume of the owning database, falling back
    /// to the default volume.
    pub fn bind_table_to_volume(
        &self,
        name: &str,
        db_id: DatabaseId,
        table_id: TableId,
    ) -> Result<bool> {
        let volume = self.resolve_table_volume(name, db_id)?;
        Self::ensure_enabled(&volume)?;

        self.bind_table_journaled(&volume.id, table_id)
    }

    pub fn unbind_database(&self, db_id: DatabaseId) -> Result<()> {
        self.bindings.unbind_database(db_id)
    }

    pub fn unbind_table(&self, table_id: TableId) -> Result<()> {
        self.bindings.unbind_table(table_id)
    }

    // ========================================
    // Builtin volume
    // ========================================

    /// Create the builtin volume from configuration if it does not exist yet.
    ///
    /// Returns an empty id when loading volumes from configuration is turned
    /// off. The new volume becomes the default only if no default is set.
    pub fn create_builtin_volume(&self) -> Result<String> {
        if !self.config.enable_load_volume_from_conf {
            debug!("Loading storage volume from configuration is disabled");
            return Ok(String::new());
        }

        let _guard = self
            .bootstrap_lock
            .lock()
            .map_err(|_| VolumeError::Internal("Failed to acquire bootstrap lock".to_string()))?;

        if let Some(existing) = self.get_volume_by_name(RegistryConfig::BUILTIN_STORAGE_VOLUME)? {
            return Ok(existing.id);
        }

        let resolved = resolver::resolve(&self.config)?;
        let id = self.directory.create(&VolumeDef {
            name: RegistryConfig::BUILTIN_STORAGE_VOLUME.to_string(),
            storage_type: resolved.storage_type,
            locations: resolved.locations,
            params: resolved.params,
            enabled: true,
            comment: String::new(),
            storage_key: resolved.storage_key,
        })?;
        info!("Created builtin storage volume ({})", id);

        if self.bindings.default_volume_id()?.is_none() {
            self.set_default_volume(RegistryConfig::BUILTIN_STORAGE_VOLUME)?;
        }
        Ok(id)
    }

    /// Non-system databases and cloud-native tables without a binding.
    ///
    /// Tables of an already bound database are not reported.
    pub fn unbound_entities(&self) -> Result<UnboundEntities> {
        let snapshot = self.bindings.snapshot()?;
        let mut unbound = UnboundEntities::default();

        for db_id in self.catalog.database_ids() {
            if db_id <= RegistryConfig::NEXT_ID_INIT_VALUE
                || snapshot.database_volumes.contains_key(&db_id)
            {
                continue;
            }
            unbound.databases.push(db_id);
            unbound.tables.extend(
                self.catalog
                    .tables_of(db_id)
                    .iter()
                    .filter(|t| t.cloud_native && !snapshot.table_volumes.contains_key(&t.id))
                    .map(|t| t.id),
            );
        }
        Ok(unbound)
    }

    /// Bind every unbound entity to the builtin volume, journaling each
    /// binding. Returns the number of new bindings.
    pub fn bind_unbound_entities_to_builtin(&self) -> Result<usize> {
        let builtin = self.require_volume(RegistryConfig::BUILTIN_STORAGE_VOLUME)?;
        let unbound = self.unbound_entities()?;

        let mut count = 0;
        for db_id in unbound.databases {
            if self.bind_database_journaled(&builtin.id, db_id)? {
                count += 1;
            }
        }
        for table_id in unbound.tables {
            if self.bind_table_journaled(&builtin.id, table_id)? {
                count += 1;
            }
        }

        if count > 0 {
            info!("Bound {} existing entities to the builtin storage volume", count);
        }
        Ok(count)
    }

    // ========================================
    // Replay
    // ========================================

    /// Apply one journal record without validation.
    pub fn replay(&self, record: &JournalRecord) -> Result<()> {
        match record {
            JournalRecord::BindDatabase { volume_id, db_id } => {
                if !self.bindings.bind_database(volume_id, *db_id, true)? {
                    warn!("Skipping bind_database replay for database {}: empty volume id", db_id);
                }
            }
            JournalRecord::BindTable {
                volume_id,
                table_id,
            } => {
                if !self.bindings.bind_table(volume_id, *table_id, true)? {
                    warn!("Skipping bind_table replay for table {}: empty volume id", table_id);
                }
            }
            JournalRecord::SetDefaultVolume { volume_id } => {
                self.bindings.set_default_volume_id(volume_id)?;
            }
            JournalRecord::UpdateTableStorageInfos(infos) => {
                self.replay_update_table_storage_infos(infos);
            }
        }
        Ok(())
    }

    /// Apply records in order. Returns how many were applied.
    pub fn replay_all<'a>(&self, records: impl IntoIterator<Item = &'a JournalRecord>) -> Result<usize> {
        let mut applied = 0;
        for record in records {
            self.replay(record)?;
            applied += 1;
        }
        debug!("Replayed {} journal records", applied);
        Ok(applied)
    }
}
