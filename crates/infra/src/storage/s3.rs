//! Amazon S3 object storage.
//!
//! Objects are stored flat under the bucket root and published at the
//! virtual-hosted URL `https://{bucket}.s3.{region}.amazonaws.com/{key}`, or at
//! `{endpoint}/{bucket}/{key}` for S3-compatible services.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::{ObjectStorage, StorageError, check_key, strip_base};

pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3ObjectStorage {
    /// Uses default credentials from the environment (AWS_ACCESS_KEY_ID,
    /// AWS_SECRET_ACCESS_KEY, or IAM role).
    pub async fn new(bucket: impl Into<String>, region: Option<&str>) -> Self {
        let bucket = bucket.into();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| "us-east-1".to_string());
        let public_url = format!("https://{bucket}.s3.{region}.amazonaws.com");

        Self {
            client: Client::new(&config),
            bucket,
            public_url,
        }
    }

    /// Create with custom endpoint (for S3-compatible services like MinIO).
    pub async fn with_endpoint(bucket: impl Into<String>, endpoint: &str, region: Option<&str>) -> Self {
        let bucket = bucket.into();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            public_url: format!("{}/{bucket}", endpoint.trim_end_matches('/')),
            bucket,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        check_key(key)?;
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(format!("S3 upload failed: {e}")))?;

        debug!(key, size, bucket = %self.bucket, "stored object in S3");
        Ok(format!("{}/{key}", self.public_url))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(format!("S3 delete failed: {e}")))?;
        Ok(())
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        // Objects uploaded before a region/endpoint change still carry the
        // `amazonaws.com/` host; fall back to the text after it.
        strip_base(&self.public_url, url)
            .or_else(|| url.split_once("amazonaws.com/").map(|(_, key)| key))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}
