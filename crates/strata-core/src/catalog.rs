//! Database/table metadata catalog seam.
//!
//! The registry needs three things from the catalog: the list of databases,
//! the tables of each database, and a handle to a table whose cached storage
//! path it can overwrite. The cached path is guarded by the table's own lock,
//! never by the registry's.

use crate::volume::{DatabaseId, PathInfo, TableId};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A table as seen by the registry.
#[derive(Debug)]
pub struct CatalogTable {
    pub id: TableId,
    pub name: String,
    /// Only cloud-native tables store data on a volume and carry a path.
    pub cloud_native: bool,
    path_info: RwLock<Option<PathInfo>>,
}

impl CatalogTable {
    pub fn new(id: TableId, name: impl Into<String>, cloud_native: bool) -> Self {
        Self {
            id,
            name: name.into(),
            cloud_native,
            path_info: RwLock::new(None),
        }
    }

    pub fn with_path_info(self, path_info: PathInfo) -> Self {
        self.set_path_info(path_info);
        self
    }

    pub fn path_info(&self) -> Option<PathInfo> {
        self.path_info
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_path_info(&self, path_info: PathInfo) {
        *self
            .path_info
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(path_info);
    }
}

/// Read access to the metadata catalog, including the recycle bin.
pub trait MetadataCatalog: Send + Sync {
    fn database_ids(&self) -> Vec<DatabaseId>;

    fn tables_of(&self, db_id: DatabaseId) -> Vec<Arc<CatalogTable>>;

    fn table(&self, db_id: DatabaseId, table_id: TableId) -> Option<Arc<CatalogTable>> {
        self.tables_of(db_id).into_iter().find(|t| t.id == table_id)
    }
}

/// Catalog populated programmatically.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    databases: RwLock<BTreeMap<DatabaseId, Vec<Arc<CatalogTable>>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<DatabaseId, Vec<Arc<CatalogTable>>>> {
        self.databases
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<DatabaseId, Vec<Arc<CatalogTable>>>> {
        self.databases
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_database(&self, db_id: DatabaseId) {
        self.write().entry(db_id).or_default();
    }

    /// Add a table, creating its database if needed.
    pub fn add_table(&self, db_id: DatabaseId, table: CatalogTable) -> Arc<CatalogTable> {
        let table = Arc::new(table);
        let mut databases = self.write();
        let tables = databases.entry(db_id).or_default();
        tables.retain(|t| t.id != table.id);
        tables.push(table.clone());
        table
    }

    pub fn drop_database(&self, db_id: DatabaseId) {
        self.write().remove(&db_id);
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn database_ids(&self) -> Vec<DatabaseId> {
        self.read().keys().copied().collect()
    }

    fn tables_of(&self, db_id: DatabaseId) -> Vec<Arc<CatalogTable>> {
        self.read().get(&db_id).cloned().unwrap_or_default()
    }
}
