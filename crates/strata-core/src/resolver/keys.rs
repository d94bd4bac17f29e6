//! Parameter keys understood by the volume directory.

// AWS S3
pub const AWS_S3_ACCESS_KEY: &str = "aws.s3.access_key";
pub const AWS_S3_SECRET_KEY: &str = "aws.s3.secret_key";
pub const AWS_S3_REGION: &str = "aws.s3.region";
pub const AWS_S3_ENDPOINT: &str = "aws.s3.endpoint";
pub const AWS_S3_EXTERNAL_ID: &str = "aws.s3.external_id";
pub const AWS_S3_IAM_ROLE_ARN: &str = "aws.s3.iam_role_arn";
pub const AWS_S3_USE_AWS_SDK_DEFAULT_BEHAVIOR: &str = "aws.s3.use_aws_sdk_default_behavior";
pub const AWS_S3_USE_INSTANCE_PROFILE: &str = "aws.s3.use_instance_profile";

// Azure Blob
pub const AZURE_BLOB_SHARED_KEY: &str = "azure.blob.shared_key";
pub const AZURE_BLOB_SAS_TOKEN: &str = "azure.blob.sas_token";
pub const AZURE_BLOB_ENDPOINT: &str = "azure.blob.endpoint";

// Azure Data Lake Storage Gen2
pub const AZURE_ADLS2_SHARED_KEY: &str = "azure.adls2.shared_key";
pub const AZURE_ADLS2_SAS_TOKEN: &str = "azure.adls2.sas_token";
pub const AZURE_ADLS2_ENDPOINT: &str = "azure.adls2.endpoint";
pub const AZURE_ADLS2_OAUTH2_USE_MANAGED_IDENTITY: &str = "azure.adls2.oauth2_use_managed_identity";
pub const AZURE_ADLS2_OAUTH2_TENANT_ID: &str = "azure.adls2.oauth2_tenant_id";
pub const AZURE_ADLS2_OAUTH2_CLIENT_ID: &str = "azure.adls2.oauth2_client_id";
pub const AZURE_ADLS2_OAUTH2_CLIENT_SECRET: &str = "azure.adls2.oauth2_client_secret";
pub const AZURE_ADLS2_OAUTH2_CLIENT_ENDPOINT: &str = "azure.adls2.oauth2_client_endpoint";

// Google Cloud Storage
pub const GCP_GCS_ENDPOINT: &str = "gcp.gcs.endpoint";
pub const GCP_GCS_USE_COMPUTE_ENGINE_SERVICE_ACCOUNT: &str =
    "gcp.gcs.use_compute_engine_service_account";
pub const GCP_GCS_SERVICE_ACCOUNT_EMAIL: &str = "gcp.gcs.service_account_email";
pub const GCP_GCS_SERVICE_ACCOUNT_PRIVATE_KEY: &str = "gcp.gcs.service_account_private_key";
pub const GCP_GCS_SERVICE_ACCOUNT_PRIVATE_KEY_ID: &str = "gcp.gcs.service_account_private_key_id";
pub const GCP_GCS_IMPERSONATION_SERVICE_ACCOUNT: &str = "gcp.gcs.impersonation_service_account";

/// Keys whose values are secrets and must not be printed.
pub const SECRET_KEYS: &[&str] = &[
    AWS_S3_SECRET_KEY,
    AZURE_BLOB_SHARED_KEY,
    AZURE_BLOB_SAS_TOKEN,
    AZURE_ADLS2_SHARED_KEY,
    AZURE_ADLS2_SAS_TOKEN,
    AZURE_ADLS2_OAUTH2_CLIENT_SECRET,
    GCP_GCS_SERVICE_ACCOUNT_PRIVATE_KEY,
];

pub fn is_secret(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}
