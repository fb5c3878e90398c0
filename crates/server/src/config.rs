//! Relay configuration loaded from the environment.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use client_blockchain_core::{BlockchainConfig, normalize_hex_id};
use client_blockchain_sui::SuiConfig;
use client_blockchain_sui::contracts::suins::{DEFAULT_PARENT_NAME, DEFAULT_PARENT_NFT_ID};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_ENOKI_API_URL: &str = "https://api.enoki.mystenlabs.com/v1";

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    pub sui: SuiConfig,
    pub enoki: EnokiConfig,
    pub suins: SuinsConfig,
}

impl RelayConfig {
    /// Environment variables:
    /// - `RELAY_BIND_ADDR` - listen address (default `0.0.0.0:3001`)
    /// - the [`SuiConfig::from_env`] variables
    /// - the [`EnokiConfig::from_env`] and [`SuinsConfig::from_env`] variables
    pub fn from_env() -> Result<Self> {
        let bind_addr = match env::var("RELAY_BIND_ADDR") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid RELAY_BIND_ADDR {}: {}", raw, e))?,
            Err(_) => default_bind_addr(),
        };

        Ok(Self {
            bind_addr,
            sui: SuiConfig::from_env().map_err(|e| anyhow!(e))?,
            enoki: EnokiConfig::from_env(),
            suins: SuinsConfig::from_env(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.sui.validate().map_err(|e| anyhow!(e))?;
        self.suins.validate().map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            sui: SuiConfig::default(),
            enoki: EnokiConfig::default(),
            suins: SuinsConfig::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

/// Sponsorship API access.
#[derive(Clone, Debug)]
pub struct EnokiConfig {
    /// Private key; sponsorship is refused when unset
    pub api_key: Option<String>,
    pub api_url: String,
}

impl EnokiConfig {
    /// Reads `ENOKI_PRIVATE_API_KEY` and `ENOKI_API_URL`.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("ENOKI_PRIVATE_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            api_url: env::var("ENOKI_API_URL").unwrap_or_else(|_| DEFAULT_ENOKI_API_URL.to_string()),
        }
    }
}

impl Default for EnokiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_ENOKI_API_URL.to_string(),
        }
    }
}

/// Name-service admin settings for leaf subnames.
#[derive(Clone, Debug)]
pub struct SuinsConfig {
    /// Keystore holding the parent-name owner; the Sui CLI keystore when unset
    pub admin_keystore: Option<PathBuf>,
    pub admin_address: Option<String>,
    pub parent_nft_id: String,
    pub parent_name: String,
    /// Shared `SuiNS` object
    pub suins_object_id: Option<String>,
    pub subdomains_package_id: Option<String>,
}

impl SuinsConfig {
    /// Reads `SUINS_ADMIN_KEYSTORE`, `SUINS_ADMIN_ADDRESS`, `SUINS_PARENT_NFT_ID`,
    /// `SUINS_PARENT_NAME`, `SUINS_OBJECT_ID` and `SUINS_SUBDOMAINS_PACKAGE_ID`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            admin_keystore: env::var("SUINS_ADMIN_KEYSTORE").ok().map(PathBuf::from),
            admin_address: env::var("SUINS_ADMIN_ADDRESS").ok(),
            parent_nft_id: env::var("SUINS_PARENT_NFT_ID").unwrap_or(defaults.parent_nft_id),
            parent_name: env::var("SUINS_PARENT_NAME").unwrap_or(defaults.parent_name),
            suins_object_id: env::var("SUINS_OBJECT_ID").ok(),
            subdomains_package_id: env::var("SUINS_SUBDOMAINS_PACKAGE_ID").ok(),
        }
    }

    /// Leaf creation needs both the `SuiNS` object and the subdomains package.
    pub fn is_enabled(&self) -> bool {
        self.suins_object_id.is_some() && self.subdomains_package_id.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.parent_name.trim().is_empty() {
            return Err("SUINS_PARENT_NAME must not be empty".to_string());
        }
        let ids = [
            ("SUINS_PARENT_NFT_ID", Some(&self.parent_nft_id)),
            ("SUINS_OBJECT_ID", self.suins_object_id.as_ref()),
            ("SUINS_SUBDOMAINS_PACKAGE_ID", self.subdomains_package_id.as_ref()),
        ];
        for (key, value) in ids {
            if let Some(value) = value {
                if normalize_hex_id(value).is_none() {
                    return Err(format!("Invalid {}: {}", key, value));
                }
            }
        }
        Ok(())
    }
}

impl Default for SuinsConfig {
    fn default() -> Self {
        Self {
            admin_keystore: None,
            admin_address: None,
            parent_nft_id: DEFAULT_PARENT_NFT_ID.to_string(),
            parent_name: DEFAULT_PARENT_NAME.to_string(),
            suins_object_id: None,
            subdomains_package_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.enoki.api_url, DEFAULT_ENOKI_API_URL);
        assert!(config.enoki.api_key.is_none());
        assert_eq!(config.suins.parent_name, "patreon.sui");
        assert!(!config.suins.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_object_ids_are_rejected() {
        let suins = SuinsConfig {
            suins_object_id: Some("suins".to_string()),
            ..SuinsConfig::default()
        };
        assert!(suins.validate().unwrap_err().contains("SUINS_OBJECT_ID"));
    }
}
