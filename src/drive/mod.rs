//! Object storage access for ticket attachments.
//!
//! Talks to any S3-compatible endpoint (MinIO in development). Downloads go
//! through presigned URLs so attachment objects stay private.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, presigning::PresigningConfig, Client as S3Client};
use thiserror::Error;

use crate::config::DriveConfig;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Failed to sign URL: {0}")]
    SignFailed(String),
}

/// Who a signed download link is issued for. Customer links are short-lived;
/// admin links stay valid for a working session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAudience {
    Customer,
    Admin,
}

impl LinkAudience {
    pub fn expiry(&self) -> Duration {
        match self {
            Self::Customer => Duration::from_secs(60),
            Self::Admin => Duration::from_secs(3600),
        }
    }
}

pub async fn init_drive(config: &DriveConfig) -> Result<S3Client, Box<dyn std::error::Error>> {
    let endpoint = if !config.server.ends_with('/') {
        format!("{}/", config.server)
    } else {
        config.server.clone()
    };

    let base_config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region("auto")
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;

    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();

    Ok(S3Client::from_conf(s3_config))
}

pub async fn put_object(
    client: &S3Client,
    bucket: &str,
    key: &str,
    data: Vec<u8>,
    content_type: &str,
) -> Result<(), DriveError> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(content_type)
        .body(data.into())
        .send()
        .await
        .map_err(|e| DriveError::UploadFailed(e.to_string()))?;
    Ok(())
}

/// Presigned GET link for a stored object, expiring per audience.
pub async fn signed_download_url(
    client: &S3Client,
    bucket: &str,
    key: &str,
    audience: LinkAudience,
) -> Result<String, DriveError> {
    let presign = PresigningConfig::expires_in(audience.expiry())
        .map_err(|e| DriveError::SignFailed(e.to_string()))?;
    let request = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presign)
        .await
        .map_err(|e| DriveError::SignFailed(e.to_string()))?;
    Ok(request.uri().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_links_expire_in_a_minute() {
        assert_eq!(LinkAudience::Customer.expiry(), Duration::from_secs(60));
    }

    #[test]
    fn test_admin_links_expire_in_an_hour() {
        assert_eq!(LinkAudience::Admin.expiry(), Duration::from_secs(3600));
    }
}
