//! Moving bound tables onto new paths after a volume's backing changes.

use super::StorageVolumeManager;
use crate::error::Result;
use crate::journal::{JournalRecord, TableStorageInfo, TableStorageInfos};
use crate::volume::TableId;
use std::collections::HashSet;
use tracing::{debug, info};

impl StorageVolumeManager {
    /// Allocate a fresh path for every cloud-native table bound to the
    /// volume, update the tables and journal the batch as one record.
    ///
    /// The set of bound tables is read under the binding lock, which is
    /// released before any path is allocated. Tables bound or unbound while
    /// the rebind runs may be missed or included. All paths are allocated
    /// before any table is touched, so an allocation failure changes nothing.
    pub fn update_table_storage_info(&self, volume_id: &str) -> Result<TableStorageInfos> {
        let bound: HashSet<TableId> = self
            .bindings
            .tables_of_volume(volume_id)?
            .into_iter()
            .collect();
        if bound.is_empty() {
            debug!("No tables bound to volume {}, nothing to rebind", volume_id);
            return Ok(TableStorageInfos::default());
        }

        let mut allocated = Vec::with_capacity(bound.len());
        for db_id in self.catalog.database_ids() {
            for table in self.catalog.tables_of(db_id) {
                if !table.cloud_native || !bound.contains(&table.id) {
                    continue;
                }
                let path_info = self.directory.allocate_path(volume_id, db_id, table.id)?;
                allocated.push((db_id, table, path_info));
            }
        }

        let mut infos = TableStorageInfos::default();
        for (db_id, table, path_info) in allocated {
            table.set_path_info(path_info.clone());
            infos.push(
                db_id,
                TableStorageInfo {
                    table_id: table.id,
                    path_info,
                },
            );
        }

        self.edit_log
            .append(&JournalRecord::UpdateTableStorageInfos(infos.clone()))?;
        info!(
            "Updated storage paths of {} tables on volume {}",
            infos.len(),
            volume_id
        );
        Ok(infos)
    }

    /// Re-apply journaled table paths without allocating anything.
    ///
    /// Tables that no longer exist or are not cloud-native are skipped.
    /// Returns the number of tables updated.
    pub fn replay_update_table_storage_infos(&self, infos: &TableStorageInfos) -> usize {
        let mut applied = 0;
        for (db_id, info) in infos.iter() {
            match self.catalog.table(db_id, info.table_id) {
                Some(table) if table.cloud_native => {
                    table.set_path_info(info.path_info.clone());
                    applied += 1;
                }
                Some(_) => debug!(
                    "Skipping storage path of non cloud-native table {} in database {}",
                    info.table_id, db_id
                ),
                None => debug!(
                    "Skipping storage path of missing table {} in database {}",
                    info.table_id, db_id
                ),
            }
        }
        applied
    }
}
