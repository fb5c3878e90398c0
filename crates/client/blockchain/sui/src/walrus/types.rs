//! Walrus type definitions.
//!
//! Only `blobId` is required in upload responses; everything else is
//! optional and unknown fields are kept in `extra`, so new publisher fields
//! never break deserialization.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

/// Default storage duration for uploads.
pub const DEFAULT_EPOCHS: u64 = 5;

/// Walrus network presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn publisher_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://publisher.walrus-testnet.walrus.space",
            Network::Mainnet => "https://publisher.walrus-mainnet.walrus.space",
        }
    }

    pub fn aggregator_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://aggregator.walrus-testnet.walrus.space",
            Network::Mainnet => "https://aggregator.walrus-mainnet.walrus.space",
        }
    }
}

/// Blob store endpoints and storage duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalrusConfig {
    pub publisher_url: String,
    pub aggregator_url: String,
    pub epochs: u64,
}

impl WalrusConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            publisher_url: network.publisher_url().to_string(),
            aggregator_url: network.aggregator_url().to_string(),
            epochs: DEFAULT_EPOCHS,
        }
    }

    /// Environment variables:
    /// - `WALRUS_PUBLISHER_URL`
    /// - `WALRUS_AGGREGATOR_URL`
    /// - `WALRUS_EPOCHS` (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            publisher_url: env::var("WALRUS_PUBLISHER_URL").unwrap_or(defaults.publisher_url),
            aggregator_url: env::var("WALRUS_AGGREGATOR_URL").unwrap_or(defaults.aggregator_url),
            epochs: env::var("WALRUS_EPOCHS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.epochs),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for url in [&self.publisher_url, &self.aggregator_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("Invalid Walrus URL: {}", url));
            }
        }
        if self.epochs == 0 {
            return Err("Walrus epochs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for WalrusConfig {
    fn default() -> Self {
        Self::for_network(Network::Testnet)
    }
}

/// Response from storing a blob.
///
/// Both variants are successful uploads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlobResponse {
    NewlyCreated(Box<BlobInfo>),
    #[serde(rename_all = "camelCase")]
    AlreadyCertified {
        blob_id: String,
        #[serde(default)]
        end_epoch: u64,
    },
}

impl BlobResponse {
    pub fn blob_id(&self) -> &str {
        match self {
            BlobResponse::NewlyCreated(info) => &info.blob_object.blob_id,
            BlobResponse::AlreadyCertified { blob_id, .. } => blob_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub blob_object: BlobObject,

    /// Storage cost in MIST
    #[serde(default)]
    pub cost: u64,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// On-chain object referencing the stored blob.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    #[serde(default)]
    pub id: Option<String>,

    pub blob_id: String,

    #[serde(default)]
    pub size: u64,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
