//! SuiNS subdomain integration.
//!
//! Leaf subnames are created by the parent-name owner (the relay's admin
//! account) and point at the creator's address:
//!
//! ```move
//! public fun new_leaf(
//!     suins: &mut SuiNS,
//!     parent: &SuinsRegistration,
//!     clock: &Clock,
//!     subdomain_name: String,
//!     target: address,
//!     ctx: &mut TxContext,
//! );
//! ```

use anyhow::Context;
use serde::Deserialize;
use sui_types::Identifier;
use sui_types::base_types::{ObjectID, SuiAddress};
use sui_types::programmable_transaction_builder::ProgrammableTransactionBuilder;
use sui_types::transaction::{ObjectArg, ProgrammableTransaction};

use crate::core::error::{Result, SuiError};

/// Default parent name for creator subnames.
pub const DEFAULT_PARENT_NAME: &str = "patreon.sui";

/// Parent registration NFT for [`DEFAULT_PARENT_NAME`] on testnet.
pub const DEFAULT_PARENT_NFT_ID: &str =
    "0x91ea4d5e68745fd48494687c347c87c9088674a795d260c7b7d854d9f8b3f12e";

#[derive(Debug, Clone)]
pub struct SuinsContract {
    /// Package exposing `subdomains::new_leaf`
    pub subdomains_package_id: ObjectID,
}

impl SuinsContract {
    pub fn new(subdomains_package_id: ObjectID) -> Self {
        Self {
            subdomains_package_id,
        }
    }

    /// Create `full_name` (e.g. `alice.patreon.sui`) as a leaf pointing to `target`.
    pub fn new_leaf(
        &self,
        suins: ObjectArg,
        parent_nft: ObjectArg,
        clock: ObjectArg,
        full_name: &str,
        target: SuiAddress,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(suins)?,
            ptb.obj(parent_nft)?,
            ptb.obj(clock)?,
            ptb.pure(full_name.to_string())?,
            ptb.pure(target)?,
        ];

        ptb.programmable_move_call(
            self.subdomains_package_id,
            Identifier::new("subdomains")?,
            Identifier::new("new_leaf")?,
            vec![],
            args,
        );

        Ok(ptb.finish())
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

/// Name-service lookups over the fullnode JSON-RPC API.
#[derive(Clone)]
pub struct NameResolver {
    rpc_url: String,
    http_client: reqwest::Client,
}

impl NameResolver {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Address a name points to, or `None` when no record exists.
    pub async fn resolve(&self, name: &str) -> Result<Option<SuiAddress>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "suix_resolveNameServiceAddress",
            "params": [name],
        });

        let response: RpcResponse = self
            .http_client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .context("Failed to send name lookup")?
            .json()
            .await
            .context("Failed to parse name lookup response")?;

        if let Some(error) = response.error {
            return Err(SuiError::Network(error.message));
        }

        match response.result {
            Some(serde_json::Value::String(address)) => address
                .parse()
                .map(Some)
                .map_err(|e| SuiError::Serialization(format!("Invalid address {}: {}", address, e))),
            _ => Ok(None),
        }
    }

    /// Whether a record exists for `name`. Lookup failures count as absent.
    pub async fn exists(&self, name: &str) -> bool {
        match self.resolve(name).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                tracing::debug!("Name lookup for {} failed: {}", name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::clock_arg;
    use crate::contracts::test_support::{move_calls, object, shared};

    #[test]
    fn new_leaf_call_shape() {
        let contract = SuinsContract::new(object(0x5));
        let pt = contract
            .new_leaf(shared(1), shared(2), clock_arg(), "ada.patreon.sui", SuiAddress::ZERO)
            .unwrap();
        assert_eq!(
            move_calls(&pt),
            vec![("subdomains".to_string(), "new_leaf".to_string(), 5)]
        );
    }

    #[test]
    fn rpc_null_result_parses() {
        let response: RpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result.is_none() || response.result == Some(serde_json::Value::Null));
        assert!(response.error.is_none());
    }
}
