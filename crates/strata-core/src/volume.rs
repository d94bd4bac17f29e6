//! Storage volume data model.

use crate::error::VolumeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Identifier of a database in the metadata catalog.
pub type DatabaseId = i64;

/// Identifier of a table in the metadata catalog.
pub type TableId = i64;

/// Supported storage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    S3,
    Hdfs,
    AzBlob,
    Adls2,
    Gs,
}

impl StorageType {
    pub const ALL: [StorageType; 5] = [
        StorageType::Hdfs,
        StorageType::S3,
        StorageType::AzBlob,
        StorageType::Adls2,
        StorageType::Gs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::S3 => "S3",
            StorageType::Hdfs => "HDFS",
            StorageType::AzBlob => "AZBLOB",
            StorageType::Adls2 => "ADLS2",
            StorageType::Gs => "GS",
        }
    }

    /// URI scheme used to normalize bare `authority/path` locations.
    pub fn default_scheme(&self) -> &'static str {
        match self {
            StorageType::S3 => "s3",
            StorageType::Hdfs => "hdfs",
            StorageType::AzBlob => "azblob",
            StorageType::Adls2 => "adls2",
            StorageType::Gs => "gs",
        }
    }

    /// Whether locations must use exactly [`Self::default_scheme`].
    ///
    /// HDFS-compatible filesystems come with their own schemes (`viewfs`,
    /// `webhdfs`, ...), so HDFS accepts any absolute URI.
    pub fn requires_matching_scheme(&self) -> bool {
        !matches!(self, StorageType::Hdfs)
    }
}

impl FromStr for StorageType {
    type Err = VolumeError;

    /// Parse a storage type name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageType::S3),
            "hdfs" => Ok(StorageType::Hdfs),
            "azblob" => Ok(StorageType::AzBlob),
            "adls2" => Ok(StorageType::Adls2),
            "gs" => Ok(StorageType::Gs),
            _ => Err(VolumeError::invalid_config(format!(
                "Unknown storage type \"{}\"",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A storage volume as held by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVolume {
    pub id: String,
    pub name: String,
    pub storage_type: StorageType,
    pub locations: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub enabled: bool,
    #[serde(default)]
    pub comment: String,
    /// Key the directory uses to address the underlying store. Empty when the
    /// directory assigns one itself.
    #[serde(default)]
    pub storage_key: String,
}

/// Everything needed to create a volume; the directory assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDef {
    pub name: String,
    pub storage_type: StorageType,
    pub locations: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub enabled: bool,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub storage_key: String,
}

impl VolumeDef {
    /// Attach the id assigned by the directory.
    pub fn into_volume(self, id: impl Into<String>) -> StorageVolume {
        StorageVolume {
            id: id.into(),
            name: self.name,
            storage_type: self.storage_type,
            locations: self.locations,
            params: self.params,
            enabled: self.enabled,
            comment: self.comment,
            storage_key: self.storage_key,
        }
    }
}

/// Physical location allocated for one table's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    pub volume_id: String,
    pub full_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_parse_ignores_case() {
        for storage_type in StorageType::ALL {
            let parsed: StorageType = storage_type
                .as_str()
                .to_lowercase()
                .parse()
                .expect("Should parse");
            assert_eq!(storage_type, parsed);
        }
        assert_eq!("AzBlob".parse::<StorageType>().unwrap(), StorageType::AzBlob);
        assert!("oss".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_storage_type_parse_rejects_padding() {
        assert!(" s3".parse::<StorageType>().is_err());
        assert!("hdfs\n".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_storage_type_serde_names() {
        let json = serde_json::to_string(&StorageType::AzBlob).unwrap();
        assert_eq!(json, "\"AZBLOB\"");
        let parsed: StorageType = serde_json::from_str("\"ADLS2\"").unwrap();
        assert_eq!(parsed, StorageType::Adls2);
    }

    #[test]
    fn test_only_hdfs_skips_scheme_match() {
        assert!(!StorageType::Hdfs.requires_matching_scheme());
        assert!(StorageType::S3.requires_matching_scheme());
        assert!(StorageType::Gs.requires_matching_scheme());
    }
}
