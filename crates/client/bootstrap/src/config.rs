//! Client configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use client_blockchain_sui::{SealConfig, SuiConfig, WalrusConfig};
use client_core::CoreConfig;
use client_blockchain_core::{BlockchainConfig, ObjectId};

/// Everything needed to assemble the platform for a front-end.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub sui: SuiConfig,
    pub walrus: WalrusConfig,
    pub seal: SealConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Construct configuration from process environment variables.
    ///
    /// See [`SuiConfig::from_env`], [`WalrusConfig::from_env`],
    /// [`SealConfig::from_env`] and [`LogConfig::from_env`] for the
    /// variables each section reads.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            sui: SuiConfig::from_env().map_err(|e| anyhow!(e))?,
            walrus: WalrusConfig::from_env(),
            seal: SealConfig::from_env().map_err(|e| anyhow!(e))?,
            logging: LogConfig::from_env(),
        })
    }

    pub fn with_sui(mut self, sui: SuiConfig) -> Self {
        self.sui = sui;
        self
    }

    pub fn with_walrus(mut self, walrus: WalrusConfig) -> Self {
        self.walrus = walrus;
        self
    }

    pub fn with_seal(mut self, seal: SealConfig) -> Self {
        self.seal = seal;
        self
    }

    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.sui.validate().map_err(|e| anyhow!(e))?;
        self.walrus.validate().map_err(|e| anyhow!(e))?;
        self.seal.validate().map_err(|e| anyhow!(e))?;
        Ok(())
    }

    /// Workflow settings shared by discovery, sessions and publishing.
    pub fn core(&self) -> CoreConfig {
        CoreConfig::new(ObjectId::new(self.sui.package_id.clone()))
            .with_session_ttl_min(self.seal.session_ttl_min)
    }
}

/// Where logs go besides stderr.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub log_dir: Option<PathBuf>,
    /// Log to the platform data directory when no `log_dir` is given
    pub log_to_file: bool,
}

impl LogConfig {
    /// Environment variables:
    /// - `LOG_DIR` - Directory for the log file
    /// - `LOG_TO_FILE` - Write a log file in the platform data directory (default: false)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.log_dir = env::var("LOG_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        if let Some(enable) = read_env::<bool>("LOG_TO_FILE") {
            config.log_to_file = enable;
        }

        config
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn file_logging(&self) -> bool {
        self.log_dir.is_some() || self.log_to_file
    }
}

pub(crate) fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_testnet() {
        let config = AppConfig::default();
        assert_eq!(config.sui.network_name(), "sui-testnet");
        assert_eq!(config.seal.threshold, 2);
        assert_eq!(config.walrus.epochs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn core_config_follows_package_and_ttl() {
        let mut config = AppConfig::default();
        config.sui.package_id = "0xabc".to_string();
        config.seal.session_ttl_min = 30;

        let core = config.core();
        assert_eq!(core.package_id, ObjectId::new("0xabc"));
        assert_eq!(core.session_ttl_min, 30);
    }

    #[test]
    fn invalid_threshold_fails_validation() {
        let mut config = AppConfig::default();
        config.seal.threshold = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_dir_enables_file_logging() {
        assert!(!LogConfig::default().file_logging());
        assert!(LogConfig::default().with_log_dir("/tmp/logs").file_logging());
    }
}
