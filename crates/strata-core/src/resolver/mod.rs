//! Resolution of process-level cloud storage configuration into a volume
//! creation request.
//!
//! The configured provider is selected once ([`ProviderConfig::from_config`])
//! and every further step dispatches on that closed variant:
//!
//! - [`validate_config`] checks the provider's settings
//! - [`build_locations`] / [`build_params`] produce the directory-agnostic
//!   `(locations, params)` pair
//! - [`builtin_storage_key`] picks the storage key for the builtin volume
//!
//! [`resolve`] runs all of them in order.

pub mod credential;
pub mod keys;
pub mod provider;
pub mod uri;

pub use credential::{derive_credential_type, AwsCredentialType};
pub use provider::{
    AzureOauth2Settings, AzureSettings, GcsSettings, HdfsSettings, ProviderConfig,
    ProviderSettings, S3Settings,
};
pub use uri::normalize_config_path;

use crate::config::CloudStorageConfig;
use crate::error::{Result, VolumeError};
use crate::volume::StorageType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Output of configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVolumeConfig {
    pub storage_type: StorageType,
    pub locations: Vec<String>,
    pub params: BTreeMap<String, String>,
    pub storage_key: String,
}

impl ResolvedVolumeConfig {
    /// Copy of the params with secret values masked.
    pub fn redacted_params(&self) -> BTreeMap<String, String> {
        redact_params(&self.params)
    }
}

/// Copy of volume params with non-empty secret values masked.
pub fn redact_params(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| {
            let value = if keys::is_secret(k) && !v.is_empty() {
                "******".to_string()
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}

/// Validate the configuration of the selected provider.
pub fn validate_config(config: &CloudStorageConfig) -> Result<ProviderConfig> {
    let provider = ProviderConfig::from_config(config)?;
    provider.settings().validate()?;
    Ok(provider)
}

pub fn build_locations(config: &CloudStorageConfig) -> Result<Vec<String>> {
    let provider = ProviderConfig::from_config(config)?;
    Ok(vec![provider.settings().location()?.to_string()])
}

pub fn build_params(config: &CloudStorageConfig) -> Result<BTreeMap<String, String>> {
    let provider = ProviderConfig::from_config(config)?;
    Ok(provider.settings().params())
}

/// Storage key for the builtin volume: the bucket for S3, the raw URL for
/// HDFS, empty for the rest.
pub fn builtin_storage_key(config: &CloudStorageConfig) -> Result<String> {
    let provider = ProviderConfig::from_config(config)?;
    provider.settings().builtin_storage_key()
}

/// Validate and translate the configuration in one pass.
pub fn resolve(config: &CloudStorageConfig) -> Result<ResolvedVolumeConfig> {
    let provider = validate_config(config)?;
    let settings = provider.settings();
    Ok(ResolvedVolumeConfig {
        storage_type: settings.storage_type(),
        locations: vec![settings.location()?.to_string()],
        params: settings.params(),
        storage_key: settings.builtin_storage_key()?,
    })
}

/// Check that a user-supplied location suits the volume type.
pub fn validate_location(storage_type: StorageType, location: &str) -> Result<String> {
    let uri = normalize_config_path(
        location,
        storage_type.default_scheme(),
        "location",
        storage_type.requires_matching_scheme(),
    )?;
    Ok(uri.to_string())
}

/// Check all locations of a volume creation request.
pub fn validate_locations(storage_type: StorageType, locations: &[String]) -> Result<()> {
    if locations.is_empty() {
        return Err(VolumeError::invalid_config(format!(
            "Storage volume of type {} requires at least one location",
            storage_type
        )));
    }
    for location in locations {
        validate_location(storage_type, location)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn s3_config() -> CloudStorageConfig {
        CloudStorageConfig {
            cloud_native_storage_type: "s3".to_string(),
            aws_s3_path: "mybucket/prefix".to_string(),
            aws_s3_region: "us-west-2".to_string(),
            aws_s3_access_key: "ak".to_string(),
            aws_s3_secret_key: "sk".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_s3() {
        let resolved = resolve(&s3_config()).unwrap();
        assert_eq!(resolved.storage_type, StorageType::S3);
        assert_eq!(resolved.locations, vec!["s3://mybucket/prefix".to_string()]);
        assert_eq!(resolved.storage_key, "mybucket");
        assert_eq!(resolved.params.len(), 8);
        assert_eq!(resolved.params[keys::AWS_S3_REGION], "us-west-2");
        assert_eq!(resolved.params[keys::AWS_S3_USE_INSTANCE_PROFILE], "false");
    }

    #[test]
    fn test_s3_requires_region_or_endpoint() {
        let config = CloudStorageConfig {
            aws_s3_region: String::new(),
            ..s3_config()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("aws_s3_region"));

        let config = CloudStorageConfig {
            aws_s3_region: String::new(),
            aws_s3_endpoint: "http://minio:9000".to_string(),
            ..s3_config()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_s3_requires_credentials() {
        let config = CloudStorageConfig {
            aws_s3_access_key: String::new(),
            ..s3_config()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(err.to_string(), "Invalid aws credential configuration.");
    }

    #[test]
    fn test_s3_port_rejected() {
        let config = CloudStorageConfig {
            aws_s3_path: "s3://bucket:1234/x".to_string(),
            ..s3_config()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_hdfs_has_no_params_and_raw_url_key() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "HDFS".to_string(),
            cloud_native_hdfs_url: "webhdfs://nn:50070/warehouse".to_string(),
            ..Default::default()
        };
        let resolved = resolve(&config).unwrap();
        assert!(resolved.params.is_empty());
        assert_eq!(resolved.storage_key, "webhdfs://nn:50070/warehouse");
        assert_eq!(resolved.locations, vec!["webhdfs://nn:50070/warehouse".to_string()]);
    }

    #[test]
    fn test_azblob_requires_endpoint() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "azblob".to_string(),
            azure_blob_path: "container/prefix".to_string(),
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The configuration item \"azure_blob_endpoint\" is empty."
        );

        let config = CloudStorageConfig {
            azure_blob_endpoint: "https://acct.blob.core.windows.net".to_string(),
            ..config
        };
        let resolved = resolve(&config).unwrap();
        assert_eq!(resolved.locations, vec!["azblob://container/prefix".to_string()]);
        assert_eq!(resolved.storage_key, "");
        assert_eq!(resolved.params.len(), 3);
    }

    #[test]
    fn test_adls2_scheme_must_match() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "adls2".to_string(),
            azure_adls2_endpoint: "https://acct.dfs.core.windows.net".to_string(),
            azure_adls2_path: "azblob://container/prefix".to_string(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let config = CloudStorageConfig {
            azure_adls2_path: "adls2://container/prefix".to_string(),
            azure_adls2_oauth2_use_managed_identity: true,
            azure_adls2_oauth2_client_id: "client".to_string(),
            ..config
        };
        let resolved = resolve(&config).unwrap();
        assert_eq!(resolved.params.len(), 8);
        assert_eq!(
            resolved.params[keys::AZURE_ADLS2_OAUTH2_USE_MANAGED_IDENTITY],
            "true"
        );
        assert_eq!(resolved.params[keys::AZURE_ADLS2_OAUTH2_CLIENT_ID], "client");
    }

    #[test]
    fn test_gs_empty_authority() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "gs".to_string(),
            gcp_gcs_path: "gs://".to_string(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let config = CloudStorageConfig {
            gcp_gcs_path: "gs://bucket/data".to_string(),
            ..config
        };
        let resolved = resolve(&config).unwrap();
        assert_eq!(resolved.params.len(), 6);
        assert_eq!(
            resolved.params[keys::GCP_GCS_USE_COMPUTE_ENGINE_SERVICE_ACCOUNT],
            "true"
        );
        assert_eq!(resolved.storage_key, "");
    }

    #[test]
    fn test_unknown_provider() {
        let config = CloudStorageConfig {
            cloud_native_storage_type: "cos".to_string(),
            ..Default::default()
        };
        let err = resolve(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert!(err.to_string().contains("HDFS S3 AZBLOB ADLS2 or GS"));
    }

    #[test]
    fn test_redacted_params_masks_secrets() {
        let resolved = resolve(&s3_config()).unwrap();
        let redacted = resolved.redacted_params();
        assert_eq!(redacted[keys::AWS_S3_SECRET_KEY], "******");
        assert_eq!(redacted[keys::AWS_S3_ACCESS_KEY], "ak");
    }

    #[test]
    fn test_validate_locations() {
        assert!(validate_locations(StorageType::S3, &[]).is_err());
        assert!(validate_locations(StorageType::S3, &["s3://b/p".to_string()]).is_ok());
        assert!(validate_locations(StorageType::S3, &["gs://b/p".to_string()]).is_err());
        assert!(validate_locations(StorageType::Hdfs, &["viewfs://c/p".to_string()]).is_ok());
    }
}
