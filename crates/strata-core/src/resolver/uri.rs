//! Normalization of configured storage locations.

use crate::error::{Result, VolumeError};
use url::{ParseError, Url};

/// Parse `value` as an absolute URI, prefixing `default_scheme://` when it
/// has no scheme (so `bucket/prefix` becomes `s3://bucket/prefix`).
///
/// The value must already be a well-formed URI: characters that would need
/// percent-encoding, and `%` not followed by two hex digits, are rejected
/// rather than encoded. The result must have a non-empty authority. An `s3` location may not carry
/// a port, since bucket names cannot contain `:`. When `match_scheme` is set
/// the scheme must equal `default_scheme`.
///
/// Every violation is reported as the same invalid-configuration error
/// naming `item` and the raw value.
pub fn normalize_config_path(
    value: &str,
    default_scheme: &str,
    item: &str,
    match_scheme: bool,
) -> Result<Url> {
    let invalid = || {
        VolumeError::invalid_config(format!(
            "The configuration item \"{} = {}\" is invalid.",
            item, value
        ))
    };

    if !is_uri_text(value) {
        return Err(invalid());
    }

    let uri = match Url::parse(value) {
        Ok(uri) => uri,
        Err(ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("{}://{}", default_scheme, value)).map_err(|_| invalid())?
        }
        Err(_) => return Err(invalid()),
    };

    if uri.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    if uri.port().is_some() && default_scheme == "s3" {
        return Err(invalid());
    }
    if match_scheme && uri.scheme() != default_scheme {
        return Err(invalid());
    }

    Ok(uri)
}

/// Whether `value` only holds RFC 3986 characters with valid `%XX` escapes.
fn is_uri_text(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escaped = bytes.get(i + 1..i + 3);
                if !escaped.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b"-._~:/?#[]@!$&'()*+,;=".contains(&b) => i += 1,
            _ => return false,
        }
    }
    true
}

/// Split a normalized S3 location into bucket and key prefix.
///
/// The leading `/` of the path is dropped.
pub fn bucket_and_prefix(uri: &Url) -> (String, String) {
    let bucket = uri.host_str().unwrap_or_default().to_string();
    let prefix = uri.path().trim_start_matches('/').to_string();
    (bucket, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_bare_bucket_gets_default_scheme() {
        let uri = normalize_config_path("mybucket/prefix", "s3", "aws_s3_path", true).unwrap();
        assert_eq!(uri.as_str(), "s3://mybucket/prefix");
    }

    #[test]
    fn test_absolute_uri_kept() {
        let uri = normalize_config_path("s3://bucket/a/b", "s3", "aws_s3_path", true).unwrap();
        assert_eq!(uri.as_str(), "s3://bucket/a/b");
    }

    #[test]
    fn test_characters_needing_escapes_rejected() {
        for value in ["s3://bucket/my prefix", "bucket/a b", "bucket/a{b}", "bucket/50%", "bucket/%zz"] {
            let err = normalize_config_path(value, "s3", "aws_s3_path", true).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration, "{}", value);
        }
    }

    #[test]
    fn test_valid_escapes_kept() {
        let uri = normalize_config_path("s3://bucket/my%20prefix", "s3", "aws_s3_path", true)
            .unwrap();
        assert_eq!(uri.as_str(), "s3://bucket/my%20prefix");
    }

    #[test]
    fn test_s3_port_rejected() {
        let err = normalize_config_path("s3://bucket:1234/x", "s3", "aws_s3_path", true)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The configuration item \"aws_s3_path = s3://bucket:1234/x\" is invalid."
        );
    }

    #[test]
    fn test_hdfs_port_allowed() {
        let uri = normalize_config_path(
            "hdfs://namenode:9000/warehouse",
            "hdfs",
            "cloud_native_hdfs_url",
            false,
        )
        .unwrap();
        assert_eq!(uri.port(), Some(9000));
    }

    #[test]
    fn test_empty_authority_rejected() {
        assert!(normalize_config_path("gs://", "gs", "gcp_gcs_path", true).is_err());
        assert!(normalize_config_path("s3:///only/path", "s3", "aws_s3_path", true).is_err());
        assert!(normalize_config_path("", "s3", "aws_s3_path", true).is_err());
    }

    #[test]
    fn test_scheme_mismatch() {
        assert!(normalize_config_path("s3://bucket/x", "gs", "gcp_gcs_path", true).is_err());
        // HDFS-compatible schemes are fine when matching is off
        let uri = normalize_config_path(
            "viewfs://cluster/warehouse",
            "hdfs",
            "cloud_native_hdfs_url",
            false,
        )
        .unwrap();
        assert_eq!(uri.scheme(), "viewfs");
    }

    #[test]
    fn test_bucket_and_prefix() {
        let uri = normalize_config_path("bucket/some/prefix", "s3", "aws_s3_path", true).unwrap();
        let (bucket, prefix) = bucket_and_prefix(&uri);
        assert_eq!(bucket, "bucket");
        assert_eq!(prefix, "some/prefix");
    }
}
