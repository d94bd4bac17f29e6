//! Centralized configuration for the storage volume registry.
//!
//! [`RegistryConfig`] holds fixed constants. [`CloudStorageConfig`] holds the
//! process-level cloud storage settings that drive builtin volume creation;
//! it is loaded from a JSON file whose keys mirror the field names.

use crate::error::{Result, VolumeError};
use crate::volume::StorageType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Registry-level constants.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Reserved name of the volume created from process configuration.
    pub const BUILTIN_STORAGE_VOLUME: &'static str = "builtin_storage_volume";
    /// Volume name that resolves to the effective default volume.
    pub const DEFAULT_VOLUME_KEYWORD: &'static str = "default";
    /// Database ids at or below this value belong to system databases.
    pub const NEXT_ID_INIT_VALUE: i64 = 10_000;
    pub const BUSY_TIMEOUT_MS: u32 = 5_000;
    pub const DIRECTORY_DB_FILENAME: &'static str = "volumes.db";
    pub const JOURNAL_FILENAME: &'static str = "journal.jsonl";
}

/// Process-level cloud storage settings.
///
/// Unknown keys in the source file are ignored; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudStorageConfig {
    pub enable_load_volume_from_conf: bool,
    pub cloud_native_storage_type: String,

    // S3
    pub aws_s3_path: String,
    pub aws_s3_region: String,
    pub aws_s3_endpoint: String,
    pub aws_s3_access_key: String,
    pub aws_s3_secret_key: String,
    pub aws_s3_external_id: String,
    pub aws_s3_iam_role_arn: String,
    pub aws_s3_use_aws_sdk_default_behavior: bool,
    pub aws_s3_use_instance_profile: bool,

    // HDFS
    pub cloud_native_hdfs_url: String,

    // Azure Blob
    pub azure_blob_path: String,
    pub azure_blob_endpoint: String,
    pub azure_blob_shared_key: String,
    pub azure_blob_sas_token: String,

    // Azure Data Lake Storage Gen2
    pub azure_adls2_path: String,
    pub azure_adls2_endpoint: String,
    pub azure_adls2_shared_key: String,
    pub azure_adls2_sas_token: String,
    pub azure_adls2_oauth2_use_managed_identity: bool,
    pub azure_adls2_oauth2_tenant_id: String,
    pub azure_adls2_oauth2_client_id: String,
    pub azure_adls2_oauth2_client_secret: String,
    pub azure_adls2_oauth2_client_endpoint: String,

    // Google Cloud Storage
    pub gcp_gcs_path: String,
    pub gcp_gcs_endpoint: String,
    pub gcp_gcs_use_compute_engine_service_account: bool,
    pub gcp_gcs_service_account_email: String,
    pub gcp_gcs_service_account_private_key: String,
    pub gcp_gcs_service_account_private_key_id: String,
    pub gcp_gcs_impersonation_service_account: String,
}

impl Default for CloudStorageConfig {
    fn default() -> Self {
        Self {
            enable_load_volume_from_conf: true,
            cloud_native_storage_type: StorageType::S3.as_str().to_string(),
            aws_s3_path: String::new(),
            aws_s3_region: String::new(),
            aws_s3_endpoint: String::new(),
            aws_s3_access_key: String::new(),
            aws_s3_secret_key: String::new(),
            aws_s3_external_id: String::new(),
            aws_s3_iam_role_arn: String::new(),
            aws_s3_use_aws_sdk_default_behavior: false,
            aws_s3_use_instance_profile: false,
            cloud_native_hdfs_url: String::new(),
            azure_blob_path: String::new(),
            azure_blob_endpoint: String::new(),
            azure_blob_shared_key: String::new(),
            azure_blob_sas_token: String::new(),
            azure_adls2_path: String::new(),
            azure_adls2_endpoint: String::new(),
            azure_adls2_shared_key: String::new(),
            azure_adls2_sas_token: String::new(),
            azure_adls2_oauth2_use_managed_identity: false,
            azure_adls2_oauth2_tenant_id: String::new(),
            azure_adls2_oauth2_client_id: String::new(),
            azure_adls2_oauth2_client_secret: String::new(),
            azure_adls2_oauth2_client_endpoint: String::new(),
            gcp_gcs_path: String::new(),
            gcp_gcs_endpoint: String::new(),
            gcp_gcs_use_compute_engine_service_account: true,
            gcp_gcs_service_account_email: String::new(),
            gcp_gcs_service_account_private_key: String::new(),
            gcp_gcs_service_account_private_key_id: String::new(),
            gcp_gcs_impersonation_service_account: String::new(),
        }
    }
}

impl CloudStorageConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VolumeError::invalid_config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_json(&content).map_err(|e| {
            VolumeError::invalid_config(format!(
                "Failed to parse configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            "Loaded cloud storage configuration from {} (type {})",
            path.display(),
            config.cloud_native_storage_type
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// The configured provider type.
    pub fn storage_type(&self) -> Result<StorageType> {
        self.cloud_native_storage_type.parse().map_err(|_| {
            VolumeError::invalid_config(format!(
                "The configuration item \"cloud_native_storage_type = {}\" is invalid, must be HDFS S3 AZBLOB ADLS2 or GS.",
                self.cloud_native_storage_type
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CloudStorageConfig::default();
        assert!(config.enable_load_volume_from_conf);
        assert_eq!(config.storage_type().unwrap(), StorageType::S3);
        assert!(config.gcp_gcs_use_compute_engine_service_account);
        assert!(!config.aws_s3_use_instance_profile);
    }

    #[test]
    fn test_partial_json_uses_defaults_and_ignores_unknown_keys() {
        let config = CloudStorageConfig::from_json(
            r#"{
                "cloud_native_storage_type": "hdfs",
                "cloud_native_hdfs_url": "hdfs://nn:9000/data",
                "some_unrelated_setting": 42
            }"#,
        )
        .unwrap();

        assert_eq!(config.storage_type().unwrap(), StorageType::Hdfs);
        assert_eq!(config.cloud_native_hdfs_url, "hdfs://nn:9000/data");
        assert!(config.aws_s3_path.is_empty());
    }

    #[test]
    fn test_unknown_storage_type_names_allowed_set() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "oss".to_string(),
            ..Default::default()
        };
        let err = config.storage_type().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cloud_native_storage_type = oss"));
        assert!(message.contains("HDFS S3 AZBLOB ADLS2 or GS"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"aws_s3_path": "bucket/prefix", "aws_s3_region": "us-east-1"}}"#)
            .unwrap();

        let config = CloudStorageConfig::load(file.path()).unwrap();
        assert_eq!(config.aws_s3_path, "bucket/prefix");
        assert_eq!(config.aws_s3_region, "us-east-1");
    }

    #[test]
    fn test_load_missing_file_is_invalid_configuration() {
        let err = CloudStorageConfig::load(Path::new("/nonexistent/strata.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidConfiguration);
    }
}
