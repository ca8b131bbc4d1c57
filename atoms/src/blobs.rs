use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

use crate::error::{GalleryError, GalleryResult};
use crate::store::BlobStore;

/// S3-backed blob store for originals and thumbnails
pub struct S3BlobStore {
    client: S3Client,
}

impl S3BlobStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> GalleryResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| GalleryError::Storage(format!("S3 put_object error: {}", e)))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> GalleryResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GalleryError::Storage(format!("S3 get_object error: {}", e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| GalleryError::Storage(format!("S3 body read error: {}", e)))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, bucket: &str, key: &str) -> GalleryResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GalleryError::Storage(format!("S3 delete_object error: {}", e)))?;
        Ok(())
    }

    async fn signed_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> GalleryResult<String> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(ttl_secs))
            .map_err(|e| GalleryError::Storage(format!("Presigning config error: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| GalleryError::Storage(format!("S3 presign error: {}", e)))?;

        Ok(request.uri().to_string())
    }
}
