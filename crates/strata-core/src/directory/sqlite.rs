//! SQLite-backed volume directory.

use super::traits::{table_path, VolumeDirectory};
use crate::config::RegistryConfig;
use crate::error::{Result, VolumeError};
use crate::volume::{DatabaseId, PathInfo, StorageType, StorageVolume, TableId, VolumeDef};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SELECT_COLUMNS: &str =
    "SELECT id, name, storage_type, locations_json, params_json, enabled, comment, storage_key
     FROM volumes";

/// Raw column values of a `volumes` row.
struct VolumeRow {
    id: String,
    name: String,
    storage_type: String,
    locations_json: String,
    params_json: String,
    enabled: bool,
    comment: String,
    storage_key: String,
}

impl VolumeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            storage_type: row.get(2)?,
            locations_json: row.get(3)?,
            params_json: row.get(4)?,
            enabled: row.get(5)?,
            comment: row.get(6)?,
            storage_key: row.get(7)?,
        })
    }

    fn into_volume(self) -> Result<StorageVolume> {
        let storage_type: StorageType = self.storage_type.parse().map_err(|_| {
            VolumeError::upstream(format!(
                "Volume {} has unknown storage type {}",
                self.name, self.storage_type
            ))
        })?;
        Ok(StorageVolume {
            id: self.id,
            name: self.name,
            storage_type,
            locations: serde_json::from_str(&self.locations_json)?,
            params: serde_json::from_str(&self.params_json)?,
            enabled: self.enabled,
            comment: self.comment,
            storage_key: self.storage_key,
        })
    }
}

/// Volume directory persisted in a SQLite database.
///
/// Uses WAL mode for safe concurrent access across processes and
/// `Arc<Mutex<Connection>>` for thread safety within a process.
pub struct SqliteVolumeDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVolumeDirectory {
    /// Open the directory at a specific path.
    ///
    /// Creates the database and parent directories if they don't exist.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| VolumeError::Upstream {
                    message: format!(
                        "Failed to create volume directory folder: {}",
                        parent.display()
                    ),
                    source: Some(Box::new(e)),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;
        info!("Opened volume directory at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA temp_store=MEMORY;",
            RegistryConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS volumes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                storage_type TEXT NOT NULL,
                locations_json TEXT NOT NULL,
                params_json TEXT NOT NULL DEFAULT '{}',
                enabled INTEGER NOT NULL DEFAULT 1,
                comment TEXT NOT NULL DEFAULT '',
                storage_key TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VolumeError::upstream("Failed to acquire volume directory connection lock"))
    }

    fn query_one(&self, clause: &str, key: &str) -> Result<Option<StorageVolume>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!("{} WHERE {} = ?1", SELECT_COLUMNS, clause),
                params![key],
                VolumeRow::from_row,
            )
            .optional()?;
        row.map(VolumeRow::into_volume).transpose()
    }
}

impl VolumeDirectory for SqliteVolumeDirectory {
    fn get_by_name(&self, name: &str) -> Result<Option<StorageVolume>> {
        self.query_one("name", name)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<StorageVolume>> {
        self.query_one("id", id)
    }

    fn list(&self) -> Result<Vec<StorageVolume>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY name", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], VolumeRow::from_row)?;

        let mut volumes = Vec::new();
        for row in rows {
            volumes.push(row?.into_volume()?);
        }
        Ok(volumes)
    }

    fn create(&self, def: &VolumeDef) -> Result<String> {
        let conn = self.lock_conn()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM volumes WHERE name = ?1",
                params![def.name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(VolumeError::AlreadyExists {
                name: def.name.clone(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO volumes (id, name, storage_type, locations_json, params_json, enabled,
                                  comment, storage_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                id,
                def.name,
                def.storage_type.as_str(),
                serde_json::to_string(&def.locations)?,
                serde_json::to_string(&def.params)?,
                def.enabled,
                def.comment,
                def.storage_key,
                now,
            ],
        )?;

        debug!("Created volume {} with id {}", def.name, id);
        Ok(id)
    }

    fn update(&self, volume: &StorageVolume) -> Result<()> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE volumes SET params_json = ?1, enabled = ?2, comment = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                serde_json::to_string(&volume.params)?,
                volume.enabled,
                volume.comment,
                Utc::now().to_rfc3339(),
                volume.id,
            ],
        )?;
        if rows == 0 {
            return Err(VolumeError::not_found(&volume.name));
        }
        Ok(())
    }

    fn replace(&self, volume: &StorageVolume) -> Result<()> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE volumes SET name = ?1, storage_type = ?2, locations_json = ?3,
                                params_json = ?4, enabled = ?5, comment = ?6,
                                storage_key = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                volume.name,
                volume.storage_type.as_str(),
                serde_json::to_string(&volume.locations)?,
                serde_json::to_string(&volume.params)?,
                volume.enabled,
                volume.comment,
                volume.storage_key,
                Utc::now().to_rfc3339(),
                volume.id,
            ],
        )?;
        if rows == 0 {
            return Err(VolumeError::not_found(&volume.name));
        }
        debug!("Replaced volume {} ({})", volume.name, volume.id);
        Ok(())
    }

    fn remove_by_name(&self, name: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM volumes WHERE name = ?1", params![name])?;
        if rows == 0 {
            return Err(VolumeError::not_found(name));
        }
        debug!("Removed volume {}", name);
        Ok(())
    }

    fn allocate_path(
        &self,
        volume_id: &str,
        db_id: DatabaseId,
        table_id: TableId,
    ) -> Result<PathInfo> {
        let volume = self
            .get_by_id(volume_id)?
            .ok_or_else(|| VolumeError::upstream(format!("Unknown volume id {}", volume_id)))?;
        let location = volume.locations.first().ok_or_else(|| {
            VolumeError::upstream(format!("Volume {} has no location", volume.name))
        })?;

        Ok(PathInfo {
            volume_id: volume_id.to_string(),
            full_path: table_path(location, db_id, table_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_directory() -> (SqliteVolumeDirectory, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test-volumes.db");
        let directory = SqliteVolumeDirectory::open_at(&db_path).unwrap();
        (directory, temp_dir)
    }

    fn hdfs_def(name: &str) -> VolumeDef {
        VolumeDef {
            name: name.to_string(),
            storage_type: StorageType::Hdfs,
            locations: vec!["hdfs://nn:9000/warehouse".to_string()],
            params: BTreeMap::from([("dfs.replication".to_string(), "3".to_string())]),
            enabled: true,
            comment: "primary".to_string(),
            storage_key: "hdfs://nn:9000/warehouse".to_string(),
        }
    }

    #[test]
    fn test_create_and_get_round_trips_all_fields() {
        let (directory, _temp_dir) = create_test_directory();
        let id = directory.create(&hdfs_def("hdfs_sv")).unwrap();

        let volume = directory.get_by_name("hdfs_sv").unwrap().unwrap();
        assert_eq!(volume, hdfs_def("hdfs_sv").into_volume(id.clone()));
        assert_eq!(directory.get_by_id(&id).unwrap().unwrap().name, "hdfs_sv");
    }

    #[test]
    fn test_create_duplicate_name_fails() {
        let (directory, _temp_dir) = create_test_directory();
        directory.create(&hdfs_def("hdfs_sv")).unwrap();

        let err = directory.create(&hdfs_def("hdfs_sv")).unwrap_err();
        assert!(matches!(err, VolumeError::AlreadyExists { .. }));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (directory, _temp_dir) = create_test_directory();
        assert!(directory.get_by_name("nope").unwrap().is_none());
        assert!(directory.get_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let (directory, _temp_dir) = create_test_directory();
        directory.create(&hdfs_def("b")).unwrap();
        directory.create(&hdfs_def("a")).unwrap();

        let names: Vec<_> = directory
            .list()
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_update_and_replace() {
        let (directory, _temp_dir) = create_test_directory();
        let id = directory.create(&hdfs_def("hdfs_sv")).unwrap();

        let mut volume = directory.get_by_id(&id).unwrap().unwrap();
        volume.enabled = false;
        volume.comment = "retired".to_string();
        volume.locations = vec!["hdfs://other:9000/x".to_string()];
        directory.update(&volume).unwrap();

        let stored = directory.get_by_id(&id).unwrap().unwrap();
        assert!(!stored.enabled);
        assert_eq!(stored.comment, "retired");
        assert_eq!(stored.locations, vec!["hdfs://nn:9000/warehouse".to_string()]);

        directory.replace(&volume).unwrap();
        let stored = directory.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.locations, vec!["hdfs://other:9000/x".to_string()]);
    }

    #[test]
    fn test_remove_by_name() {
        let (directory, _temp_dir) = create_test_directory();
        directory.create(&hdfs_def("hdfs_sv")).unwrap();

        directory.remove_by_name("hdfs_sv").unwrap();
        assert!(directory.get_by_name("hdfs_sv").unwrap().is_none());
        assert!(directory.remove_by_name("hdfs_sv").is_err());
    }

    #[test]
    fn test_allocate_path() {
        let (directory, _temp_dir) = create_test_directory();
        let id = directory.create(&hdfs_def("hdfs_sv")).unwrap();

        let info = directory.allocate_path(&id, 10001, 7).unwrap();
        assert_eq!(info.full_path, "hdfs://nn:9000/warehouse/db10001/7");

        let err = directory.allocate_path("missing", 1, 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UpstreamFailure);
    }

    #[test]
    fn test_two_directories_same_db() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("shared.db");

        let dir1 = SqliteVolumeDirectory::open_at(&db_path).unwrap();
        let dir2 = SqliteVolumeDirectory::open_at(&db_path).unwrap();

        dir1.create(&hdfs_def("shared")).unwrap();
        assert!(dir2.get_by_name("shared").unwrap().is_some());
    }
}
