use crate::{
    domain::FileStorage,
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{
    primitives::ByteStream,
    Client as S3Client,
};
use tracing;

/// Where public object URLs point.
#[derive(Debug, Clone)]
pub enum PublicUrlBase {
    /// Explicit base such as a CDN or a public bucket website.
    Custom(String),
    /// Path-style URLs against an endpoint override (LocalStack).
    PathStyle(String),
    /// Virtual-hosted AWS URLs for the given region.
    Aws { region: String },
}

impl PublicUrlBase {
    pub fn from_parts(public_base_url: Option<&str>, endpoint: Option<&str>, region: &str) -> Self {
        match (public_base_url, endpoint) {
            (Some(base), _) => PublicUrlBase::Custom(base.trim_end_matches('/').to_string()),
            (None, Some(endpoint)) => PublicUrlBase::PathStyle(endpoint.trim_end_matches('/').to_string()),
            (None, None) => PublicUrlBase::Aws { region: region.to_string() },
        }
    }

    pub fn url_for(&self, bucket: &str, key: &str) -> String {
        match self {
            PublicUrlBase::Custom(base) => format!("{}/{}", base, key),
            PublicUrlBase::PathStyle(endpoint) => format!("{}/{}/{}", endpoint, bucket, key),
            PublicUrlBase::Aws { region } => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
    public_base: PublicUrlBase,
}

impl S3FileStorage {
    pub fn new(client: S3Client, bucket_name: String, public_base: PublicUrlBase) -> Self {
        Self { client, bucket_name, public_base }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject. Sets Content-Type.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, size = data.len(), "S3: Uploading file");

        let body = ByteStream::from(data);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?; // Map to specific upload error

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(())
    }

    /// Downloads file data and its content type from S3 using GetObject.
    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Downloading file");

        let output = self.client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                if sdk_err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    tracing::warn!(s3_key = %key, bucket = %self.bucket_name, "S3: NoSuchKey error downloading file");
                    return StorageError::NotFound(key.to_string());
                }
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error downloading file");
                StorageError::BackendError(anyhow::Error::new(sdk_err).context(format!("S3: Failed to download object with key '{}'", key)))
            })?;

        let content_type = output.content_type().map(|s| s.to_string());

        // Images are small enough to buffer
        let data = output
            .body
            .collect()
            .await
            .context(format!("S3: Failed to read body of object with key '{}'", key))?
            .into_bytes()
            .to_vec();

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, ?content_type, size = data.len(), "S3: Download successful");
        Ok((data, content_type))
    }

    /// Deletes an object from S3 using DeleteObject.
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                // DeleteObject succeeds even if the object doesn't exist,
                // so anything landing here is a backend/permission problem.
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error deleting object");
                StorageError::BackendError(anyhow::Error::new(sdk_err).context(format!("S3: Failed to delete object with key '{}'", key)))
            })?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Delete request successful (object might not have existed)");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.public_base.url_for(&self.bucket_name, key)
    }
}
