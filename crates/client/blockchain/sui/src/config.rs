//! Sui blockchain configuration.

use std::env;
use std::path::PathBuf;

use client_blockchain_core::BlockchainConfig;

/// Deployed patreon package on testnet.
pub const DEFAULT_PACKAGE_ID: &str =
    "0x50739904d691799acda0acaf38e7bd4f4286000b32aaa3091f3195ddf9f7d94a";

/// Shared `Platform` object created when the package was published.
pub const DEFAULT_PLATFORM_ID: &str =
    "0xf0bcfd13795de886d60f189e210c6eb9beb2837285260ac3fece3c3aebaec9e8";

pub const SERVICE_MODULE: &str = "service";
pub const SUBSCRIPTION_MODULE: &str = "subscription";

/// Sui system clock object.
pub const CLOCK_OBJECT_ID: &str = "0x6";

/// Page size for event queries.
pub const EVENT_PAGE_SIZE: usize = 50;

const DEFAULT_GAS_BUDGET: u64 = 100_000_000; // 0.1 SUI

/// Sui network types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiNetwork {
    Mainnet,
    Testnet,
    Devnet,
    /// Local Sui network
    Local,
}

impl SuiNetwork {
    pub fn default_rpc_url(&self) -> &str {
        match self {
            SuiNetwork::Mainnet => "https://fullnode.mainnet.sui.io:443",
            SuiNetwork::Testnet => "https://fullnode.testnet.sui.io:443",
            SuiNetwork::Devnet => "https://fullnode.devnet.sui.io:443",
            SuiNetwork::Local => "http://127.0.0.1:9000",
        }
    }

    /// Network name as understood by the sponsorship relay.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "mainnet",
            SuiNetwork::Testnet => "testnet",
            SuiNetwork::Devnet => "devnet",
            SuiNetwork::Local => "localnet",
        }
    }

    pub fn parse(name: &str) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "mainnet" => Ok(SuiNetwork::Mainnet),
            "testnet" => Ok(SuiNetwork::Testnet),
            "devnet" => Ok(SuiNetwork::Devnet),
            "local" | "localnet" => Ok(SuiNetwork::Local),
            other => Err(format!(
                "Invalid SUI_NETWORK: {}. Must be mainnet, testnet, devnet, or local",
                other
            )),
        }
    }
}

/// Sui-specific configuration.
#[derive(Debug, Clone)]
pub struct SuiConfig {
    /// Sui network to connect to
    pub network: SuiNetwork,

    /// Custom RPC endpoint URL (overrides network default)
    pub rpc_url: Option<String>,

    /// Package ID of the deployed patreon contract
    pub package_id: String,

    /// Shared platform object ID
    pub platform_id: String,

    /// Gas budget for transactions (in MIST)
    pub gas_budget: u64,

    /// Keystore holding the signing account (defaults to the Sui CLI keystore)
    pub keystore_path: Option<PathBuf>,

    /// Signing address (defaults to the first keystore address)
    pub address: Option<String>,

    /// Sponsorship relay base URL. When unset, the keystore account pays gas.
    pub relay_url: Option<String>,
}

impl SuiConfig {
    /// Create a new Sui configuration.
    pub fn new(network: SuiNetwork) -> Self {
        Self {
            network,
            rpc_url: None,
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            platform_id: DEFAULT_PLATFORM_ID.to_string(),
            gas_budget: DEFAULT_GAS_BUDGET,
            keystore_path: None,
            address: None,
            relay_url: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SUI_NETWORK` - Network name (mainnet, testnet, devnet, local) (default: testnet)
    /// - `SUI_RPC_URL` - Custom RPC endpoint URL
    /// - `PACKAGE_ID` - Deployed patreon package ID
    /// - `PLATFORM_ID` - Shared platform object ID
    /// - `SUI_GAS_BUDGET` - Gas budget in MIST (default: 100000000)
    /// - `SUI_KEYSTORE_PATH` - Keystore file
    /// - `SUI_ADDRESS` - Signing address
    /// - `RELAY_URL` - Sponsorship relay base URL
    pub fn from_env() -> Result<Self, String> {
        let network =
            SuiNetwork::parse(&env::var("SUI_NETWORK").unwrap_or_else(|_| "testnet".to_string()))?;

        let gas_budget = env::var("SUI_GAS_BUDGET")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_GAS_BUDGET);

        Ok(Self {
            network,
            rpc_url: env::var("SUI_RPC_URL").ok(),
            package_id: env::var("PACKAGE_ID").unwrap_or_else(|_| DEFAULT_PACKAGE_ID.to_string()),
            platform_id: env::var("PLATFORM_ID")
                .unwrap_or_else(|_| DEFAULT_PLATFORM_ID.to_string()),
            gas_budget,
            keystore_path: env::var("SUI_KEYSTORE_PATH").ok().map(PathBuf::from),
            address: env::var("SUI_ADDRESS").ok(),
            relay_url: env::var("RELAY_URL").ok().filter(|s| !s.trim().is_empty()),
        })
    }

    /// Set custom RPC URL.
    pub fn with_rpc_url(mut self, url: String) -> Self {
        self.rpc_url = Some(url);
        self
    }

    /// Set package ID.
    pub fn with_package_id(mut self, package_id: String) -> Self {
        self.package_id = package_id;
        self
    }

    pub fn with_platform_id(mut self, platform_id: String) -> Self {
        self.platform_id = platform_id;
        self
    }

    /// Set gas budget.
    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = budget;
        self
    }

    pub fn with_relay_url(mut self, url: String) -> Self {
        self.relay_url = Some(url);
        self
    }

    /// Get the RPC URL (custom or default for network).
    pub fn get_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Fully qualified `service` event type.
    pub fn event_type(&self, name: &str) -> String {
        format!("{}::{}::{}", self.package_id, SERVICE_MODULE, name)
    }

    /// Move call targets the relay is allowed to sponsor.
    pub fn allowed_move_call_targets(&self) -> Vec<String> {
        allowed_move_call_targets(&self.package_id)
    }
}

/// Every `service`/`subscription` entry point the client may ask a sponsor to pay for.
pub fn allowed_move_call_targets(package_id: &str) -> Vec<String> {
    const SERVICE_FUNCTIONS: [&str; 13] = [
        "create_creator_profile",
        "update_creator_profile",
        "add_subscription_tier",
        "remove_subscription_tier",
        "publish_post",
        "update_post",
        "set_post_visibility",
        "delete_post",
        "withdraw_creator_funds",
        "delete_creator_profile",
        "set_suins_name",
        "remove_suins_name",
        "seal_approve",
    ];

    SERVICE_FUNCTIONS
        .iter()
        .map(|f| format!("{}::{}::{}", package_id, SERVICE_MODULE, f))
        .chain(std::iter::once(format!(
            "{}::{}::subscribe",
            package_id, SUBSCRIPTION_MODULE
        )))
        .collect()
}

impl BlockchainConfig for SuiConfig {
    fn network_name(&self) -> &str {
        match self.network {
            SuiNetwork::Mainnet => "sui-mainnet",
            SuiNetwork::Testnet => "sui-testnet",
            SuiNetwork::Devnet => "sui-devnet",
            SuiNetwork::Local => "sui-local",
        }
    }

    fn rpc_url(&self) -> &str {
        self.get_rpc_url()
    }

    fn validate(&self) -> Result<(), String> {
        let url = self.get_rpc_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("Invalid RPC URL format: {}", url));
        }

        if self.gas_budget == 0 {
            return Err("Gas budget must be greater than 0".to_string());
        }

        if client_blockchain_core::normalize_hex_id(&self.package_id).is_none() {
            return Err(format!("Invalid package ID: {}", self.package_id));
        }
        if client_blockchain_core::normalize_hex_id(&self.platform_id).is_none() {
            return Err(format!("Invalid platform ID: {}", self.platform_id));
        }

        if let Some(ref relay) = self.relay_url {
            if !relay.starts_with("http://") && !relay.starts_with("https://") {
                return Err(format!("Invalid relay URL format: {}", relay));
            }
        }

        Ok(())
    }
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self::new(SuiNetwork::Testnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SuiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_rpc_url(), "https://fullnode.testnet.sui.io:443");
    }

    #[test]
    fn zero_gas_budget_is_rejected() {
        let config = SuiConfig::default().with_gas_budget(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn allow_list_covers_every_entry_point() {
        let targets = allowed_move_call_targets("0xabc");
        assert_eq!(targets.len(), 14);
        assert!(targets.contains(&"0xabc::service::seal_approve".to_string()));
        assert!(targets.contains(&"0xabc::subscription::subscribe".to_string()));
    }

    #[test]
    fn network_names_parse() {
        assert_eq!(SuiNetwork::parse("MAINNET"), Ok(SuiNetwork::Mainnet));
        assert_eq!(SuiNetwork::parse("localnet"), Ok(SuiNetwork::Local));
        assert!(SuiNetwork::parse("moon").is_err());
    }

    #[test]
    fn event_types_are_qualified() {
        let config = SuiConfig::default().with_package_id("0x1".into());
        assert_eq!(config.event_type("PostPublished"), "0x1::service::PostPublished");
    }
}
