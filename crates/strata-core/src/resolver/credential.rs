//! AWS credential type derivation.

use crate::config::CloudStorageConfig;
use serde::{Deserialize, Serialize};

/// How an S3 volume authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwsCredentialType {
    /// Defer to the AWS SDK's default provider chain.
    Default,
    /// Instance profile credentials.
    InstanceProfile,
    /// Instance profile credentials used to assume an IAM role.
    AssumeRole,
    /// Static access key / secret key.
    Simple,
}

impl AwsCredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AwsCredentialType::Default => "default",
            AwsCredentialType::InstanceProfile => "instance_profile",
            AwsCredentialType::AssumeRole => "assume_role",
            AwsCredentialType::Simple => "simple",
        }
    }
}

impl std::fmt::Display for AwsCredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the credential type from the S3 settings. First match wins:
///
/// 1. SDK default behavior flag set: `default`.
/// 2. Instance profile flag set: `assume_role` with an IAM role ARN,
///    `instance_profile` without.
/// 3. Access key and secret key set without a role ARN: `simple`.
///
/// A key pair combined with a role ARN is not supported and yields `None`,
/// as does a configuration with no credential material at all.
pub fn derive_credential_type(config: &CloudStorageConfig) -> Option<AwsCredentialType> {
    if config.aws_s3_use_aws_sdk_default_behavior {
        return Some(AwsCredentialType::Default);
    }

    if config.aws_s3_use_instance_profile {
        if config.aws_s3_iam_role_arn.is_empty() {
            return Some(AwsCredentialType::InstanceProfile);
        }
        return Some(AwsCredentialType::AssumeRole);
    }

    if config.aws_s3_access_key.is_empty() || config.aws_s3_secret_key.is_empty() {
        return None;
    }

    if config.aws_s3_iam_role_arn.is_empty() {
        return Some(AwsCredentialType::Simple);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CloudStorageConfig {
        CloudStorageConfig {
            aws_s3_access_key: "ak".to_string(),
            aws_s3_secret_key: "sk".to_string(),
            aws_s3_iam_role_arn: "arn:aws:iam::123:role/r".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sdk_default_wins_over_everything() {
        let config = CloudStorageConfig {
            aws_s3_use_aws_sdk_default_behavior: true,
            aws_s3_use_instance_profile: true,
            ..base()
        };
        assert_eq!(derive_credential_type(&config), Some(AwsCredentialType::Default));
    }

    #[test]
    fn test_instance_profile_with_role_is_assume_role() {
        let config = CloudStorageConfig {
            aws_s3_use_instance_profile: true,
            ..base()
        };
        assert_eq!(derive_credential_type(&config), Some(AwsCredentialType::AssumeRole));
    }

    #[test]
    fn test_instance_profile_without_role() {
        let config = CloudStorageConfig {
            aws_s3_use_instance_profile: true,
            aws_s3_iam_role_arn: String::new(),
            ..base()
        };
        assert_eq!(
            derive_credential_type(&config),
            Some(AwsCredentialType::InstanceProfile)
        );
    }

    #[test]
    fn test_key_pair_without_role_is_simple() {
        let config = CloudStorageConfig {
            aws_s3_iam_role_arn: String::new(),
            ..base()
        };
        assert_eq!(derive_credential_type(&config), Some(AwsCredentialType::Simple));
    }

    #[test]
    fn test_key_pair_with_role_is_unsupported() {
        assert_eq!(derive_credential_type(&base()), None);
    }

    #[test]
    fn test_missing_secret_key() {
        let config = CloudStorageConfig {
            aws_s3_secret_key: String::new(),
            aws_s3_iam_role_arn: String::new(),
            ..base()
        };
        assert_eq!(derive_credential_type(&config), None);
    }
}
