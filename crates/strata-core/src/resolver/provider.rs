//! Per-provider settings selected from [`CloudStorageConfig`].

use super::credential::derive_credential_type;
use super::keys;
use super::uri::{bucket_and_prefix, normalize_config_path};
use crate::config::CloudStorageConfig;
use crate::error::{Result, VolumeError};
use crate::volume::StorageType;
use std::collections::BTreeMap;
use url::Url;

/// Validation and translation for one provider's settings.
pub trait ProviderSettings {
    fn storage_type(&self) -> StorageType;

    /// Check the settings, failing with an invalid-configuration error.
    fn validate(&self) -> Result<()>;

    /// The normalized storage location.
    fn location(&self) -> Result<Url>;

    /// Provider parameters keyed by the names in [`keys`].
    fn params(&self) -> BTreeMap<String, String>;

    /// Storage key assigned to the builtin volume. Empty means the directory
    /// picks one.
    fn builtin_storage_key(&self) -> Result<String> {
        Ok(String::new())
    }
}

/// Settings of the configured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    S3(S3Settings),
    Hdfs(HdfsSettings),
    AzBlob(AzureSettings),
    Adls2(AzureSettings),
    Gs(GcsSettings),
}

impl ProviderConfig {
    /// Select the provider named by `cloud_native_storage_type`.
    pub fn from_config(config: &CloudStorageConfig) -> Result<Self> {
        let provider = match config.storage_type()? {
            StorageType::S3 => ProviderConfig::S3(S3Settings::from_config(config)),
            StorageType::Hdfs => ProviderConfig::Hdfs(HdfsSettings {
                url: config.cloud_native_hdfs_url.clone(),
            }),
            StorageType::AzBlob => ProviderConfig::AzBlob(AzureSettings::blob(config)),
            StorageType::Adls2 => ProviderConfig::Adls2(AzureSettings::adls2(config)),
            StorageType::Gs => ProviderConfig::Gs(GcsSettings::from_config(config)),
        };
        Ok(provider)
    }

    pub fn settings(&self) -> &dyn ProviderSettings {
        match self {
            ProviderConfig::S3(s) => s,
            ProviderConfig::Hdfs(s) => s,
            ProviderConfig::AzBlob(s) | ProviderConfig::Adls2(s) => s,
            ProviderConfig::Gs(s) => s,
        }
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

/// S3 settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub path: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub external_id: String,
    pub iam_role_arn: String,
    pub use_aws_sdk_default_behavior: bool,
    pub use_instance_profile: bool,
    credential_type: Option<super::AwsCredentialType>,
}

impl S3Settings {
    fn from_config(config: &CloudStorageConfig) -> Self {
        Self {
            path: config.aws_s3_path.clone(),
            region: config.aws_s3_region.clone(),
            endpoint: config.aws_s3_endpoint.clone(),
            access_key: config.aws_s3_access_key.clone(),
            secret_key: config.aws_s3_secret_key.clone(),
            external_id: config.aws_s3_external_id.clone(),
            iam_role_arn: config.aws_s3_iam_role_arn.clone(),
            use_aws_sdk_default_behavior: config.aws_s3_use_aws_sdk_default_behavior,
            use_instance_profile: config.aws_s3_use_instance_profile,
            credential_type: derive_credential_type(config),
        }
    }

    pub fn credential_type(&self) -> Option<super::AwsCredentialType> {
        self.credential_type
    }
}

impl ProviderSettings for S3Settings {
    fn storage_type(&self) -> StorageType {
        StorageType::S3
    }

    fn validate(&self) -> Result<()> {
        self.location()?;
        if self.region.is_empty() && self.endpoint.is_empty() {
            return Err(VolumeError::invalid_config(
                "Both configuration item \"aws_s3_region\" and \"aws_s3_endpoint\" are empty",
            ));
        }
        if self.credential_type.is_none() {
            return Err(VolumeError::invalid_config(
                "Invalid aws credential configuration.",
            ));
        }
        Ok(())
    }

    fn location(&self) -> Result<Url> {
        normalize_config_path(&self.path, "s3", "aws_s3_path", true)
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (keys::AWS_S3_ACCESS_KEY.to_string(), self.access_key.clone()),
            (keys::AWS_S3_SECRET_KEY.to_string(), self.secret_key.clone()),
            (keys::AWS_S3_REGION.to_string(), self.region.clone()),
            (keys::AWS_S3_ENDPOINT.to_string(), self.endpoint.clone()),
            (keys::AWS_S3_EXTERNAL_ID.to_string(), self.external_id.clone()),
            (keys::AWS_S3_IAM_ROLE_ARN.to_string(), self.iam_role_arn.clone()),
            (
                keys::AWS_S3_USE_AWS_SDK_DEFAULT_BEHAVIOR.to_string(),
                flag(self.use_aws_sdk_default_behavior),
            ),
            (
                keys::AWS_S3_USE_INSTANCE_PROFILE.to_string(),
                flag(self.use_instance_profile),
            ),
        ])
    }

    fn builtin_storage_key(&self) -> Result<String> {
        let (bucket, _prefix) = bucket_and_prefix(&self.location()?);
        Ok(bucket)
    }
}

/// HDFS settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdfsSettings {
    pub url: String,
}

impl ProviderSettings for HdfsSettings {
    fn storage_type(&self) -> StorageType {
        StorageType::Hdfs
    }

    fn validate(&self) -> Result<()> {
        self.location().map(|_| ())
    }

    fn location(&self) -> Result<Url> {
        normalize_config_path(&self.url, "hdfs", "cloud_native_hdfs_url", false)
    }

    fn params(&self) -> BTreeMap<String, String> {
        // HDFS connection settings are owned by the HDFS client configuration.
        BTreeMap::new()
    }

    fn builtin_storage_key(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

/// OAuth2 settings, only used by ADLS2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureOauth2Settings {
    pub use_managed_identity: bool,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_endpoint: String,
}

/// Azure Blob / ADLS2 settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSettings {
    pub storage_type: StorageType,
    pub path: String,
    pub endpoint: String,
    pub shared_key: String,
    pub sas_token: String,
    pub oauth2: Option<AzureOauth2Settings>,
}

impl AzureSettings {
    fn blob(config: &CloudStorageConfig) -> Self {
        Self {
            storage_type: StorageType::AzBlob,
            path: config.azure_blob_path.clone(),
            endpoint: config.azure_blob_endpoint.clone(),
            shared_key: config.azure_blob_shared_key.clone(),
            sas_token: config.azure_blob_sas_token.clone(),
            oauth2: None,
        }
    }

    fn adls2(config: &CloudStorageConfig) -> Self {
        Self {
            storage_type: StorageType::Adls2,
            path: config.azure_adls2_path.clone(),
            endpoint: config.azure_adls2_endpoint.clone(),
            shared_key: config.azure_adls2_shared_key.clone(),
            sas_token: config.azure_adls2_sas_token.clone(),
            oauth2: Some(AzureOauth2Settings {
                use_managed_identity: config.azure_adls2_oauth2_use_managed_identity,
                tenant_id: config.azure_adls2_oauth2_tenant_id.clone(),
                client_id: config.azure_adls2_oauth2_client_id.clone(),
                client_secret: config.azure_adls2_oauth2_client_secret.clone(),
                client_endpoint: config.azure_adls2_oauth2_client_endpoint.clone(),
            }),
        }
    }

    fn item_prefix(&self) -> &'static str {
        match self.storage_type {
            StorageType::Adls2 => "azure_adls2",
            _ => "azure_blob",
        }
    }
}

impl ProviderSettings for AzureSettings {
    fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(VolumeError::invalid_config(format!(
                "The configuration item \"{}_endpoint\" is empty.",
                self.item_prefix()
            )));
        }
        self.location().map(|_| ())
    }

    fn location(&self) -> Result<Url> {
        normalize_config_path(
            &self.path,
            self.storage_type.default_scheme(),
            &format!("{}_path", self.item_prefix()),
            true,
        )
    }

    fn params(&self) -> BTreeMap<String, String> {
        match &self.oauth2 {
            None => BTreeMap::from([
                (keys::AZURE_BLOB_SHARED_KEY.to_string(), self.shared_key.clone()),
                (keys::AZURE_BLOB_SAS_TOKEN.to_string(), self.sas_token.clone()),
                (keys::AZURE_BLOB_ENDPOINT.to_string(), self.endpoint.clone()),
            ]),
            Some(oauth2) => BTreeMap::from([
                (keys::AZURE_ADLS2_SHARED_KEY.to_string(), self.shared_key.clone()),
                (keys::AZURE_ADLS2_SAS_TOKEN.to_string(), self.sas_token.clone()),
                (keys::AZURE_ADLS2_ENDPOINT.to_string(), self.endpoint.clone()),
                (
                    keys::AZURE_ADLS2_OAUTH2_USE_MANAGED_IDENTITY.to_string(),
                    flag(oauth2.use_managed_identity),
                ),
                (
                    keys::AZURE_ADLS2_OAUTH2_TENANT_ID.to_string(),
                    oauth2.tenant_id.clone(),
                ),
                (
                    keys::AZURE_ADLS2_OAUTH2_CLIENT_ID.to_string(),
                    oauth2.client_id.clone(),
                ),
                (
                    keys::AZURE_ADLS2_OAUTH2_CLIENT_SECRET.to_string(),
                    oauth2.client_secret.clone(),
                ),
                (
                    keys::AZURE_ADLS2_OAUTH2_CLIENT_ENDPOINT.to_string(),
                    oauth2.client_endpoint.clone(),
                ),
            ]),
        }
    }
}

/// Google Cloud Storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsSettings {
    pub path: String,
    pub endpoint: String,
    pub use_compute_engine_service_account: bool,
    pub service_account_email: String,
    pub service_account_private_key: String,
    pub service_account_private_key_id: String,
    pub impersonation_service_account: String,
}

impl GcsSettings {
    fn from_config(config: &CloudStorageConfig) -> Self {
        Self {
            path: config.gcp_gcs_path.clone(),
            endpoint: config.gcp_gcs_endpoint.clone(),
            use_compute_engine_service_account: config.gcp_gcs_use_compute_engine_service_account,
            service_account_email: config.gcp_gcs_service_account_email.clone(),
            service_account_private_key: config.gcp_gcs_service_account_private_key.clone(),
            service_account_private_key_id: config.gcp_gcs_service_account_private_key_id.clone(),
            impersonation_service_account: config.gcp_gcs_impersonation_service_account.clone(),
        }
    }
}

impl ProviderSettings for GcsSettings {
    fn storage_type(&self) -> StorageType {
        StorageType::Gs
    }

    fn validate(&self) -> Result<()> {
        self.location().map(|_| ())
    }

    fn location(&self) -> Result<Url> {
        normalize_config_path(&self.path, "gs", "gcp_gcs_path", true)
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (keys::GCP_GCS_ENDPOINT.to_string(), self.endpoint.clone()),
            (
                keys::GCP_GCS_USE_COMPUTE_ENGINE_SERVICE_ACCOUNT.to_string(),
                flag(self.use_compute_engine_service_account),
            ),
            (
                keys::GCP_GCS_SERVICE_ACCOUNT_EMAIL.to_string(),
                self.service_account_email.clone(),
            ),
            (
                keys::GCP_GCS_SERVICE_ACCOUNT_PRIVATE_KEY.to_string(),
                self.service_account_private_key.clone(),
            ),
            (
                keys::GCP_GCS_SERVICE_ACCOUNT_PRIVATE_KEY_ID.to_string(),
                self.service_account_private_key_id.clone(),
            ),
            (
                keys::GCP_GCS_IMPERSONATION_SERVICE_ACCOUNT.to_string(),
                self.impersonation_service_account.clone(),
            ),
        ])
    }
}
