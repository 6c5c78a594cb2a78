//! Storage API client for public buckets

use crate::config::StorageConfig;
use crate::contract::{ObjectStorage, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

pub struct StorageApiClient {
    config: StorageConfig,
    client: Client,
}

impl StorageApiClient {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl ObjectStorage for StorageApiClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base());
        let size = bytes.len();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.key)
            .header("apikey", &self.config.key)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", upsert.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(bucket, path, size, "object uploaded");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base())
    }
}
