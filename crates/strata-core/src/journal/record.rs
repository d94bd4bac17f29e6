//! Journal record shapes.

use crate::volume::{DatabaseId, PathInfo, TableId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// New storage path of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStorageInfo {
    pub table_id: TableId,
    pub path_info: PathInfo,
}

/// Batch of table path updates, grouped by owning database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStorageInfos {
    pub infos: BTreeMap<DatabaseId, Vec<TableStorageInfo>>,
}

impl TableStorageInfos {
    pub fn push(&mut self, db_id: DatabaseId, info: TableStorageInfo) {
        self.infos.entry(db_id).or_default().push(info);
    }

    /// Number of tables covered.
    pub fn len(&self) -> usize {
        self.infos.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(db_id, table_info)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DatabaseId, &TableStorageInfo)> {
        self.infos
            .iter()
            .flat_map(|(db_id, infos)| infos.iter().map(move |info| (*db_id, info)))
    }
}

/// A state change of the registry, persisted for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalRecord {
    BindDatabase {
        volume_id: String,
        db_id: DatabaseId,
    },
    BindTable {
        volume_id: String,
        table_id: TableId,
    },
    SetDefaultVolume {
        volume_id: String,
    },
    UpdateTableStorageInfos(TableStorageInfos),
}

impl JournalRecord {
    pub fn op_name(&self) -> &'static str {
        match self {
            JournalRecord::BindDatabase { .. } => "bind_database",
            JournalRecord::BindTable { .. } => "bind_table",
            JournalRecord::SetDefaultVolume { .. } => "set_default_volume",
            JournalRecord::UpdateTableStorageInfos(_) => "update_table_storage_infos",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_keyed_by_op_name() {
        let record = JournalRecord::BindTable {
            volume_id: "v1".to_string(),
            table_id: 42,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json[record.op_name()]["table_id"], 42);
    }

    #[test]
    fn test_storage_infos_grouping() {
        let mut infos = TableStorageInfos::default();
        let path = |p: &str| PathInfo {
            volume_id: "v1".to_string(),
            full_path: p.to_string(),
        };
        infos.push(10001, TableStorageInfo { table_id: 1, path_info: path("a") });
        infos.push(10001, TableStorageInfo { table_id: 2, path_info: path("b") });
        infos.push(10002, TableStorageInfo { table_id: 3, path_info: path("c") });

        assert_eq!(infos.len(), 3);
        assert_eq!(infos.infos.len(), 2);
        let tables: Vec<_> = infos.iter().map(|(db, info)| (db, info.table_id)).collect();
        assert_eq!(tables, vec![(10001, 1), (10001, 2), (10002, 3)]);

        let record = JournalRecord::UpdateTableStorageInfos(infos.clone());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: JournalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
