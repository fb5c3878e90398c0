//! Walrus HTTP client implementation.

use async_trait::async_trait;

use client_blockchain_core::{BlobId, BlobStore, BlobStoreError};

use super::types::{BlobResponse, WalrusConfig};

/// Walrus storage client over the public HTTP API.
///
/// Uploads go to the publisher, downloads to the aggregator. Reads are not
/// retried.
#[derive(Clone)]
pub struct WalrusClient {
    config: WalrusConfig,
    http_client: reqwest::Client,
}

impl WalrusClient {
    pub fn new(config: WalrusConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn testnet() -> Self {
        Self::new(WalrusConfig::default())
    }

    pub fn config(&self) -> &WalrusConfig {
        &self.config
    }

    /// Public URL of a blob on the aggregator.
    pub fn blob_url(&self, blob_id: &BlobId) -> String {
        format!("{}/v1/blobs/{}", self.config.aggregator_url, blob_id)
    }
}

impl Default for WalrusClient {
    fn default() -> Self {
        Self::testnet()
    }
}

#[async_trait]
impl BlobStore for WalrusClient {
    async fn store(&self, data: Vec<u8>) -> Result<BlobId, BlobStoreError> {
        let url = format!(
            "{}/v1/blobs?epochs={}",
            self.config.publisher_url, self.config.epochs
        );

        tracing::debug!(
            "Uploading blob to Walrus: {} bytes, {} epochs",
            data.len(),
            self.config.epochs
        );

        let response = self
            .http_client
            .put(&url)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| BlobStoreError::Network(format!("Failed to send upload request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BlobStoreError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BlobStoreError::Network(format!("Failed to read upload response: {}", e)))?;

        let parsed: BlobResponse = serde_json::from_str(&body).map_err(|e| {
            BlobStoreError::InvalidResponse(format!("{} (raw response: {})", e, body))
        })?;

        match &parsed {
            BlobResponse::NewlyCreated(info) => tracing::info!(
                "✓ Blob uploaded to Walrus: {} (size: {} bytes, cost: {} MIST)",
                info.blob_object.blob_id,
                info.blob_object.size,
                info.cost
            ),
            BlobResponse::AlreadyCertified { blob_id, end_epoch } => tracing::info!(
                "✓ Blob already certified in Walrus: {} (expires epoch: {})",
                blob_id,
                end_epoch
            ),
        }

        Ok(BlobId::new(parsed.blob_id()))
    }

    async fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>, BlobStoreError> {
        let url = self.blob_url(blob_id);
        tracing::debug!("Downloading blob from Walrus: {}", blob_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| BlobStoreError::Network(format!("Failed to send download request: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound(blob_id.clone()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BlobStoreError::Download {
                status: status.as_u16(),
                message,
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| BlobStoreError::Network(format!("Failed to read blob data: {}", e)))?
            .to_vec();

        tracing::debug!("✓ Blob downloaded from Walrus: {} bytes", data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_urls_use_aggregator() {
        let client = WalrusClient::testnet();
        assert_eq!(
            client.blob_url(&BlobId::new("abc")),
            "https://aggregator.walrus-testnet.walrus.space/v1/blobs/abc"
        );
    }
}
