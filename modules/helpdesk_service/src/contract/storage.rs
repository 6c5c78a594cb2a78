//! Object storage seam (avatars)

use super::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `bucket/path`, replacing an existing object when `upsert` is set.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError>;

    /// Public URL of an object; no round trip.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
