//! Creator subnames under the platform's parent name.
//!
//! The subname is always derived from the on-chain service name, never from
//! the request. The relay only creates the leaf; linking it to the service
//! with `set_suins_name` must be signed by the creator.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use sui_sdk::SuiClient;
use sui_sdk::rpc_types::SuiObjectDataOptions;
use sui_types::transaction::ObjectArg;
use tracing::{debug, info};

use client_blockchain_core::{Address, LedgerTransport, TxDigest, WalletSigner};
use client_blockchain_sui::contracts::suins::NameResolver;
use client_blockchain_sui::contracts::{ObjectArgResolver, SuinsContract, clock_arg};
use client_blockchain_sui::utils::{parse_object_id, to_sui_address};
use client_blockchain_sui::{KeystoreSigner, SuiConfig, TransactionExecutor};
use client_core::{Discovery, ServiceObject};

use crate::config::SuinsConfig;
use crate::error::ApiError;

/// Lowercase, trim, collapse whitespace runs into `-` and drop anything
/// outside `[a-z0-9-]`.
pub fn normalize_subname(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Name-service writes performed with the parent-name owner's key.
#[async_trait]
pub trait LeafRegistrar: Send + Sync {
    /// Whether `full_name` already has a record.
    async fn exists(&self, full_name: &str) -> bool;

    /// Create `full_name` pointing at `target` and wait for finality.
    async fn create_leaf(&self, full_name: &str, target: &Address) -> anyhow::Result<TxDigest>;
}

/// Successful subname response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSubname {
    pub success: bool,
    pub suins_name: String,
    pub normalised_name: String,
    /// `None` when the leaf already existed
    pub tx_digest: Option<TxDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Checks the caller is a live creator and creates their leaf subname.
pub struct SubnameService {
    discovery: Discovery,
    ledger: Arc<dyn LedgerTransport>,
    registrar: Arc<dyn LeafRegistrar>,
    parent_name: String,
}

impl SubnameService {
    pub fn new(
        discovery: Discovery,
        ledger: Arc<dyn LedgerTransport>,
        registrar: Arc<dyn LeafRegistrar>,
        parent_name: impl Into<String>,
    ) -> Self {
        Self {
            discovery,
            ledger,
            registrar,
            parent_name: parent_name.into(),
        }
    }

    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    pub async fn create(&self, creator: &Address) -> Result<CreatedSubname, ApiError> {
        let service_id = self
            .discovery
            .find_active_service_id(creator.as_str())
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| {
                ApiError::Forbidden("No active creator profile found for this address".to_string())
            })?;

        let object = self
            .ledger
            .get_object(&service_id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let service = ServiceObject::from_object(&object)
            .map_err(|_| ApiError::Internal("Failed to read Service object".to_string()))?;

        if Address::parse(&service.creator).as_ref() != Some(creator) {
            return Err(ApiError::Forbidden("Creator address mismatch".to_string()));
        }

        if let Some(existing) = service.suins_name {
            return Err(ApiError::Conflict {
                message: "This creator already has a SuiNS name".to_string(),
                suins_name: existing,
            });
        }

        if service.name.trim().is_empty() {
            return Err(ApiError::Unprocessable("Creator name is empty".to_string()));
        }
        let normalised_name = normalize_subname(&service.name);
        if normalised_name.is_empty() {
            return Err(ApiError::Unprocessable(
                "Creator name results in an empty subname after normalisation".to_string(),
            ));
        }

        let suins_name = format!("{}.{}", normalised_name, self.parent_name);

        // A previous attempt may have created the leaf and then failed to link it.
        if self.registrar.exists(&suins_name).await {
            debug!(name = %suins_name, "Leaf already exists, skipping creation");
            return Ok(CreatedSubname {
                success: true,
                suins_name,
                normalised_name,
                tx_digest: None,
                note: Some(
                    "Subname already exists on SuiNS, skipped creation. Proceed with set_suins_name."
                        .to_string(),
                ),
            });
        }

        let digest = self
            .registrar
            .create_leaf(&suins_name, creator)
            .await
            .map_err(ApiError::from)?;
        info!(name = %suins_name, creator = %creator, digest = %digest, "Created leaf subname");

        Ok(CreatedSubname {
            success: true,
            suins_name,
            normalised_name,
            tx_digest: Some(digest),
            note: None,
        })
    }
}

/// [`LeafRegistrar`] signing with the parent-name owner's keystore.
pub struct SuiLeafRegistrar {
    sui_client: SuiClient,
    executor: TransactionExecutor,
    resolver: NameResolver,
    objects: ObjectArgResolver,
    contract: SuinsContract,
    suins_object_id: sui_types::base_types::ObjectID,
    parent_nft_id: sui_types::base_types::ObjectID,
}

impl SuiLeafRegistrar {
    pub fn new(sui_client: SuiClient, sui: &SuiConfig, suins: &SuinsConfig) -> anyhow::Result<Self> {
        let suins_object_id = suins
            .suins_object_id
            .as_deref()
            .context("SUINS_OBJECT_ID is not set")?;
        let subdomains_package_id = suins
            .subdomains_package_id
            .as_deref()
            .context("SUINS_SUBDOMAINS_PACKAGE_ID is not set")?;

        let keystore = match &suins.admin_keystore {
            Some(path) => path.clone(),
            None => client_blockchain_sui::default_keystore_path()?,
        };
        let admin = load_admin(&keystore, suins.admin_address.as_deref())?;

        Ok(Self {
            executor: TransactionExecutor::new(sui_client.clone(), admin, None, sui.gas_budget),
            sui_client,
            resolver: NameResolver::new(sui.get_rpc_url()),
            objects: ObjectArgResolver::new(),
            contract: SuinsContract::new(parse_object_id(subdomains_package_id)?),
            suins_object_id: parse_object_id(suins_object_id)?,
            parent_nft_id: parse_object_id(&suins.parent_nft_id)?,
        })
    }

    async fn parent_nft_arg(&self) -> anyhow::Result<ObjectArg> {
        let object = self
            .sui_client
            .read_api()
            .get_object_with_options(self.parent_nft_id, SuiObjectDataOptions::new())
            .await
            .context("Failed to fetch parent name NFT")?
            .into_object()
            .map_err(|e| anyhow!("Parent name NFT {} not found: {}", self.parent_nft_id, e))?;
        Ok(ObjectArg::ImmOrOwnedObject(object.object_ref()))
    }
}

fn load_admin(keystore: &Path, address: Option<&str>) -> anyhow::Result<Arc<dyn WalletSigner>> {
    let signer = KeystoreSigner::load(keystore, address)
        .with_context(|| format!("Failed to load admin keystore {}", keystore.display()))?;
    info!(admin = %signer.sui_address(), "Loaded name-service admin");
    Ok(Arc::new(signer))
}

#[async_trait]
impl LeafRegistrar for SuiLeafRegistrar {
    async fn exists(&self, full_name: &str) -> bool {
        self.resolver.exists(full_name).await
    }

    async fn create_leaf(&self, full_name: &str, target: &Address) -> anyhow::Result<TxDigest> {
        let suins = self
            .objects
            .shared(&self.sui_client, self.suins_object_id, true)
            .await?;
        let parent = self.parent_nft_arg().await?;

        let pt = self.contract.new_leaf(
            suins,
            parent,
            clock_arg(),
            full_name,
            to_sui_address(target)?,
        )?;

        let result = self.executor.execute(pt).await?;
        self.executor.wait_for_transaction(&result.digest).await?;
        Ok(result.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalisation() {
        assert_eq!(normalize_subname("  Ada Lovelace "), "ada-lovelace");
        assert_eq!(normalize_subname("Pixel\t\tArt  Studio"), "pixel-art-studio");
        assert_eq!(normalize_subname("Zoë's Café #1"), "zos-caf-1");
        assert_eq!(normalize_subname("already-kebab"), "already-kebab");
        assert_eq!(normalize_subname("日本語"), "");
    }
}
