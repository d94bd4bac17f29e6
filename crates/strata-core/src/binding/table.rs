//! Volume binding table.

use super::index::BindingIndex;
use crate::directory::VolumeDirectory;
use crate::error::{Result, VolumeError};
use crate::volume::{DatabaseId, TableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Everything the binding table owns, guarded as one unit.
#[derive(Debug, Default)]
struct BindingState {
    databases: BindingIndex<DatabaseId>,
    tables: BindingIndex<TableId>,
    default_volume_id: Option<String>,
}

/// Point-in-time copy of all bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    pub database_volumes: BTreeMap<DatabaseId, String>,
    pub volume_databases: BTreeMap<String, BTreeSet<DatabaseId>>,
    pub table_volumes: BTreeMap<TableId, String>,
    pub volume_tables: BTreeMap<String, BTreeSet<TableId>>,
    pub default_volume_id: Option<String>,
}

impl BindingSnapshot {
    /// Whether each reverse index is exactly the inverse of its forward map,
    /// with no empty volume entries.
    pub fn is_consistent(&self) -> bool {
        fn check(forward: &BTreeMap<i64, String>, reverse: &BTreeMap<String, BTreeSet<i64>>) -> bool {
            let forward_ok = forward
                .iter()
                .all(|(entity, volume_id)| reverse.get(volume_id).is_some_and(|s| s.contains(entity)));
            let reverse_ok = reverse.iter().all(|(volume_id, entities)| {
                !entities.is_empty()
                    && entities
                        .iter()
                        .all(|e| forward.get(e).map(String::as_str) == Some(volume_id.as_str()))
            });
            forward_ok && reverse_ok
        }

        check(&self.database_volumes, &self.volume_databases)
            && check(&self.table_volumes, &self.volume_tables)
    }
}

/// Concurrency-safe bindings between volumes and the databases and tables
/// that store data on them, plus the default volume pointer.
///
/// A single reader/writer lock covers all maps. Directory lookups needed to
/// validate a bind happen before the write lock is taken, so the critical
/// section only touches memory.
pub struct BindingTable {
    state: RwLock<BindingState>,
    directory: Arc<dyn VolumeDirectory>,
}

impl BindingTable {
    pub fn new(directory: Arc<dyn VolumeDirectory>) -> Self {
        Self {
            state: RwLock::new(BindingState::default()),
            directory,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BindingState>> {
        self.state
            .read()
            .map_err(|_| VolumeError::Internal("Failed to acquire read lock for bindings".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BindingState>> {
        self.state
            .write()
            .map_err(|_| VolumeError::Internal("Failed to acquire write lock for bindings".to_string()))
    }

    fn volume_exists(&self, volume_id: &str) -> Result<bool> {
        Ok(self.directory.get_by_id(volume_id)?.is_some())
    }

    /// Bind a database to a volume.
    ///
    /// Outside replay the volume must already have database bindings or be
    /// known to the directory; otherwise nothing changes and `false` is
    /// returned. Replay trusts the caller and skips that check. An empty
    /// volume id never binds.
    pub fn bind_database(&self, volume_id: &str, db_id: DatabaseId, replay: bool) -> Result<bool> {
        if volume_id.is_empty() {
            return Ok(false);
        }

        if !replay {
            let known = self.read()?.databases.has_volume(volume_id);
            if !known && !self.volume_exists(volume_id)? {
                debug!("Refusing to bind database {} to unknown volume {}", db_id, volume_id);
                return Ok(false);
            }
        }

        let mut state = self.write()?;
        if let Some(old) = state.databases.bind(db_id, volume_id) {
            debug!("Moved database {} from volume {} to {}", db_id, old, volume_id);
        } else {
            debug!("Bound database {} to volume {}", db_id, volume_id);
        }
        Ok(true)
    }

    /// Remove the binding of a database. No-op if it is not bound.
    pub fn unbind_database(&self, db_id: DatabaseId) -> Result<()> {
        if let Some(volume_id) = self.write()?.databases.unbind(db_id) {
            debug!("Unbound database {} from volume {}", db_id, volume_id);
        }
        Ok(())
    }

    /// Bind a table to a volume.
    ///
    /// Same contract as [`Self::bind_database`], except that a volume already
    /// referenced by table bindings alone also counts as known, even if the
    /// directory no longer has it.
    pub fn bind_table(&self, volume_id: &str, table_id: TableId, replay: bool) -> Result<bool> {
        if volume_id.is_empty() {
            return Ok(false);
        }

        if !replay {
            let known = {
                let state = self.read()?;
                state.databases.has_volume(volume_id) || state.tables.has_volume(volume_id)
            };
            if !known && !self.volume_exists(volume_id)? {
                debug!("Refusing to bind table {} to unknown volume {}", table_id, volume_id);
                return Ok(false);
            }
        }

        let mut state = self.write()?;
        if let Some(old) = state.tables.bind(table_id, volume_id) {
            debug!("Moved table {} from volume {} to {}", table_id, old, volume_id);
        } else {
            debug!("Bound table {} to volume {}", table_id, volume_id);
        }
        Ok(true)
    }

    /// Remove the binding of a table. No-op if it is not bound.
    pub fn unbind_table(&self, table_id: TableId) -> Result<()> {
        if let Some(volume_id) = self.write()?.tables.unbind(table_id) {
            debug!("Unbound table {} from volume {}", table_id, volume_id);
        }
        Ok(())
    }

    pub fn volume_id_of_database(&self, db_id: DatabaseId) -> Result<Option<String>> {
        Ok(self.read()?.databases.volume_of(db_id).map(str::to_string))
    }

    pub fn volume_id_of_table(&self, table_id: TableId) -> Result<Option<String>> {
        Ok(self.read()?.tables.volume_of(table_id).map(str::to_string))
    }

    pub fn databases_of_volume(&self, volume_id: &str) -> Result<Vec<DatabaseId>> {
        Ok(self.read()?.databases.entities_of(volume_id))
    }

    pub fn tables_of_volume(&self, volume_id: &str) -> Result<Vec<TableId>> {
        Ok(self.read()?.tables.entities_of(volume_id))
    }

    /// Whether any database or table is bound to the volume.
    pub fn is_volume_bound(&self, volume_id: &str) -> Result<bool> {
        let state = self.read()?;
        Ok(state.databases.has_volume(volume_id) || state.tables.has_volume(volume_id))
    }

    pub fn default_volume_id(&self) -> Result<Option<String>> {
        Ok(self.read()?.default_volume_id.clone())
    }

    /// Point the default at a volume id. An empty id clears the pointer.
    pub fn set_default_volume_id(&self, volume_id: &str) -> Result<()> {
        let mut state = self.write()?;
        state.default_volume_id = if volume_id.is_empty() {
            None
        } else {
            Some(volume_id.to_string())
        };
        debug!("Default volume set to {:?}", state.default_volume_id);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<BindingSnapshot> {
        let state = self.read()?;
        Ok(BindingSnapshot {
            database_volumes: state.databases.forward_sorted(),
            volume_databases: state.databases.reverse_sorted(),
            table_volumes: state.tables.forward_sorted(),
            volume_tables: state.tables.reverse_sorted(),
            default_volume_id: state.default_volume_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryVolumeDirectory;
    use crate::volume::{StorageType, VolumeDef};

    fn setup() -> (Arc<InMemoryVolumeDirectory>, BindingTable, String) {
        let directory = Arc::new(InMemoryVolumeDirectory::new());
        let volume_id = directory
            .create(&VolumeDef {
                name: "sv1".to_string(),
                storage_type: StorageType::S3,
                locations: vec!["s3://bucket/prefix".to_string()],
                params: BTreeMap::new(),
                enabled: true,
                comment: String::new(),
                storage_key: String::new(),
            })
            .unwrap();
        let table = BindingTable::new(directory.clone());
        (directory, table, volume_id)
    }

    #[test]
    fn test_bind_database_twice_is_idempotent() {
        let (_, table, volume_id) = setup();
        assert!(table.bind_database(&volume_id, 10001, false).unwrap());
        let once = table.snapshot().unwrap();
        assert!(table.bind_database(&volume_id, 10001, false).unwrap());
        assert_eq!(table.snapshot().unwrap(), once);
        assert_eq!(table.databases_of_volume(&volume_id).unwrap(), vec![10001]);
    }

    #[test]
    fn test_unbind_unbound_is_noop() {
        let (_, table, _) = setup();
        table.unbind_database(10001).unwrap();
        table.unbind_table(1).unwrap();
        assert_eq!(table.snapshot().unwrap(), BindingSnapshot::default());
    }

    #[test]
    fn test_bind_unknown_volume_fails_without_replay() {
        let (_, table, _) = setup();
        assert!(!table.bind_database("missing", 10001, false).unwrap());
        assert!(!table.bind_table("missing", 1, false).unwrap());
        assert!(table.volume_id_of_database(10001).unwrap().is_none());
    }

    #[test]
    fn test_empty_volume_id_never_binds() {
        let (_, table, _) = setup();
        assert!(!table.bind_database("", 10001, true).unwrap());
        assert!(!table.bind_table("", 1, false).unwrap());
    }

    #[test]
    fn test_replay_skips_existence_check() {
        let (_, table, _) = setup();
        assert!(table.bind_database("gone", 10001, true).unwrap());
        assert!(table.bind_table("gone", 1, true).unwrap());
        assert_eq!(table.volume_id_of_table(1).unwrap().as_deref(), Some("gone"));
    }

    #[test]
    fn test_last_unbind_removes_reverse_entry() {
        let (_, table, volume_id) = setup();
        table.bind_table(&volume_id, 1, false).unwrap();
        table.bind_table(&volume_id, 2, false).unwrap();
        table.unbind_table(1).unwrap();
        assert!(table.is_volume_bound(&volume_id).unwrap());
        table.unbind_table(2).unwrap();

        let snapshot = table.snapshot().unwrap();
        assert!(!snapshot.volume_tables.contains_key(&volume_id));
        assert!(!table.is_volume_bound(&volume_id).unwrap());
    }

    #[test]
    fn test_table_bind_accepts_volume_known_only_to_table_index() {
        // Intentional leniency: a volume still referenced by table bindings
        // stays bindable for tables after the directory drops it.
        let (directory, table, volume_id) = setup();
        table.bind_table(&volume_id, 1, false).unwrap();
        directory.remove_by_name("sv1").unwrap();

        assert!(table.bind_table(&volume_id, 2, false).unwrap());
        assert!(!table.bind_database(&volume_id, 10001, false).unwrap());
    }

    #[test]
    fn test_table_bind_accepts_volume_known_to_database_index() {
        let (directory, table, volume_id) = setup();
        table.bind_database(&volume_id, 10001, false).unwrap();
        directory.remove_by_name("sv1").unwrap();

        assert!(table.bind_table(&volume_id, 1, false).unwrap());
        assert!(table.bind_database(&volume_id, 10002, false).unwrap());
    }

    #[test]
    fn test_moving_entity_keeps_inverse() {
        let (_, table, volume_id) = setup();
        table.bind_database(&volume_id, 10001, false).unwrap();
        table.bind_database("other", 10001, true).unwrap();

        let snapshot = table.snapshot().unwrap();
        assert!(snapshot.is_consistent());
        assert!(!snapshot.volume_databases.contains_key(&volume_id));
        assert_eq!(snapshot.database_volumes[&10001], "other");
    }

    #[test]
    fn test_default_volume_pointer() {
        let (_, table, volume_id) = setup();
        assert!(table.default_volume_id().unwrap().is_none());
        table.set_default_volume_id(&volume_id).unwrap();
        assert_eq!(table.default_volume_id().unwrap(), Some(volume_id));
        table.set_default_volume_id("").unwrap();
        assert!(table.default_volume_id().unwrap().is_none());
    }

    #[test]
    fn test_concurrent_binds_stay_consistent() {
        let (_, table, volume_id) = setup();
        let table = Arc::new(table);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let table = table.clone();
                let volume_id = volume_id.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = worker * 100 + i;
                        table.bind_table(&volume_id, id, false).unwrap();
                        if i % 3 == 0 {
                            table.unbind_table(id).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = table.snapshot().unwrap();
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.table_volumes.len(), 8 * (50 - 17));
    }
}
