//! Seal threshold key release.
//!
//! Content is encrypted client-side with Seal's identity-based threshold
//! scheme under an identity derived from the creator's service and the post
//! id. Each key server derives the matching user secret key only after
//! dry-running the on-chain `seal_approve` policy for the requesting viewer.
//!
//! ## Modules
//!
//! - [`identity`]: identity bytes for `(service, content_id)`
//! - [`certificate`]: session keys, wallet certificates, request signatures
//! - [`key_server`]: key server trait and the `/v1/fetch_key` HTTP client
//! - [`client`]: encrypt / gather user secret keys / decrypt
//! - [`release`]: [`client_blockchain_core::KeyRelease`] over Sui approvals

pub mod certificate;
pub mod client;
pub mod identity;
pub mod key_server;
pub mod release;

use std::env;

pub use certificate::{Certificate, generate_session_key};
pub use client::SealClient;
pub use identity::{PROFILE_CONTENT_ID, content_identity};
pub use key_server::{FetchKeyRequest, FetchKeyResponse, HttpKeyServer, KeyServer, KeyServerError};
pub use release::SuiKeyRelease;

/// Default number of key servers needed to decrypt.
pub const DEFAULT_THRESHOLD: u8 = 2;

/// Default session credential lifetime in minutes.
pub const DEFAULT_SESSION_TTL_MIN: u64 = 10;

/// One key server: on-chain object id and HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyServerConfig {
    pub object_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealConfig {
    pub key_servers: Vec<KeyServerConfig>,
    pub threshold: u8,
    pub session_ttl_min: u64,
}

impl SealConfig {
    /// Environment variables:
    /// - `SEAL_KEY_SERVERS` - comma separated `object_id=url` pairs
    /// - `SEAL_THRESHOLD` - key servers needed (default: 2)
    /// - `SESSION_TTL_MIN` - session credential lifetime (default: 10)
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let key_servers = match env::var("SEAL_KEY_SERVERS") {
            Ok(raw) if !raw.trim().is_empty() => parse_key_servers(&raw)?,
            _ => defaults.key_servers,
        };

        let threshold = match env::var("SEAL_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| format!("Invalid SEAL_THRESHOLD: {}", raw))?,
            Err(_) => defaults.threshold,
        };

        let session_ttl_min = env::var("SESSION_TTL_MIN")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.session_ttl_min);

        Ok(Self {
            key_servers,
            threshold,
            session_ttl_min,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.threshold == 0 || self.threshold as usize > self.key_servers.len() {
            return Err(format!(
                "Seal threshold {} is invalid for {} key servers",
                self.threshold,
                self.key_servers.len()
            ));
        }
        for server in &self.key_servers {
            if client_blockchain_core::normalize_hex_id(&server.object_id).is_none() {
                return Err(format!("Invalid key server object id: {}", server.object_id));
            }
        }
        if self.session_ttl_min == 0 {
            return Err("SESSION_TTL_MIN must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            key_servers: vec![
                KeyServerConfig {
                    object_id: "0x73d05d62c18d9374e3ea529e8e0ed6161da1a141a94d3f76ae3fe4e99356db75"
                        .to_string(),
                    url: "https://seal-key-server-testnet-1.mystenlabs.com".to_string(),
                },
                KeyServerConfig {
                    object_id: "0xf5d14a81a982144ae441cd7d64b09027f116a468bd36e7eca494f750591623c8"
                        .to_string(),
                    url: "https://seal-key-server-testnet-2.mystenlabs.com".to_string(),
                },
            ],
            threshold: DEFAULT_THRESHOLD,
            session_ttl_min: DEFAULT_SESSION_TTL_MIN,
        }
    }
}

fn parse_key_servers(raw: &str) -> Result<Vec<KeyServerConfig>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (object_id, url) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid SEAL_KEY_SERVERS entry (expected id=url): {}", entry))?;
            Ok(KeyServerConfig {
                object_id: object_id.trim().to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SealConfig::default();
        assert_eq!(config.key_servers.len(), 2);
        assert_eq!(config.threshold, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn key_server_list_parses() {
        let servers = parse_key_servers("0x1=http://a, 0x2=http://b,").unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].url, "http://b");
        assert!(parse_key_servers("0x1").is_err());
    }

    #[test]
    fn threshold_above_servers_is_invalid() {
        let config = SealConfig {
            threshold: 3,
            ..SealConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
