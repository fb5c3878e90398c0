//! Transaction execution.
//!
//! Two paths produce the same [`ExecutionResult`]:
//! - **Direct**: the signer's own coins pay gas and the transaction goes
//!   straight to the fullnode.
//! - **Sponsored**: only the transaction kind is built locally; the relay
//!   attaches sponsor gas, the wallet signs the full transaction, the relay
//!   executes it and the client waits for finality.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use base64::Engine;
use sui_sdk::SuiClient;
use sui_sdk::rpc_types::{
    ObjectChange, SuiExecutionStatus, SuiTransactionBlockEffectsAPI, SuiTransactionBlockResponse,
    SuiTransactionBlockResponseOptions,
};
use sui_types::base_types::{ObjectID, ObjectRef, SuiAddress};
use sui_types::crypto::{EncodeDecodeBase64, Signature};
use sui_types::transaction::{ProgrammableTransaction, Transaction, TransactionData, TransactionKind};

use client_blockchain_core::{CreatedObject, TxDigest, WalletSigner};

use crate::core::error::{Result, SuiError};
use crate::relay::RelayClient;
use crate::utils::conversion::{
    from_object_id, from_transaction_digest, to_sui_address, to_transaction_digest,
};

const FINALITY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const FINALITY_MAX_ATTEMPTS: u32 = 20;

/// Outcome of an executed transaction.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub digest: TxDigest,
    pub created: Vec<CreatedObject>,
}

impl ExecutionResult {
    /// First created object whose type contains `type_fragment`.
    pub fn find_created(&self, type_fragment: &str) -> Option<&CreatedObject> {
        self.created
            .iter()
            .find(|object| object.object_type.contains(type_fragment))
    }
}

/// Signs and submits programmable transactions for one wallet.
pub struct TransactionExecutor {
    sui_client: SuiClient,
    signer: Arc<dyn WalletSigner>,
    relay: Option<RelayClient>,
    gas_budget: u64,
}

impl TransactionExecutor {
    pub fn new(
        sui_client: SuiClient,
        signer: Arc<dyn WalletSigner>,
        relay: Option<RelayClient>,
        gas_budget: u64,
    ) -> Self {
        Self {
            sui_client,
            signer,
            relay,
            gas_budget,
        }
    }

    pub fn is_sponsored(&self) -> bool {
        self.relay.is_some()
    }

    pub fn sender(&self) -> Result<SuiAddress> {
        let address = self
            .signer
            .address()
            .ok_or_else(|| SuiError::InvalidConfig("No wallet account connected".to_string()))?;
        to_sui_address(&address)
    }

    async fn owned_coins(&self, sender: SuiAddress) -> Result<Vec<ObjectRef>> {
        let coins = self
            .sui_client
            .coin_read_api()
            .get_coins(sender, None, None, None)
            .await
            .context("Failed to get coins")?;

        Ok(coins.data.iter().map(|coin| coin.object_ref()).collect())
    }

    /// SUI coins the sender can spend as transaction inputs.
    ///
    /// Without a sponsor the first coin is held back to pay gas.
    pub async fn payment_coins(&self) -> Result<Vec<ObjectRef>> {
        let coins = self.owned_coins(self.sender()?).await?;
        if self.is_sponsored() {
            Ok(coins)
        } else {
            Ok(coins.into_iter().skip(1).collect())
        }
    }

    /// Execute `pt`, sponsored when a relay is configured.
    pub async fn execute(&self, pt: ProgrammableTransaction) -> Result<ExecutionResult> {
        match &self.relay {
            Some(relay) => self.execute_sponsored(relay, pt).await,
            None => self.execute_direct(pt).await,
        }
    }

    async fn execute_direct(&self, pt: ProgrammableTransaction) -> Result<ExecutionResult> {
        let sender = self.sender()?;

        let gas_price = self
            .sui_client
            .read_api()
            .get_reference_gas_price()
            .await
            .context("Failed to get reference gas price")?;

        let used_as_input: Vec<ObjectID> = pt
            .input_objects()
            .map(|inputs| inputs.iter().map(|input| input.object_id()).collect())
            .unwrap_or_default();

        let gas_coin = self
            .owned_coins(sender)
            .await?
            .into_iter()
            .find(|coin| !used_as_input.contains(&coin.0))
            .ok_or_else(|| SuiError::NoCoins(format!("gas payment by {}", sender)))?;

        let tx_data =
            TransactionData::new_programmable(sender, vec![gas_coin], pt, self.gas_budget, gas_price);

        let signature = self.sign(&tx_data).await?;

        tracing::debug!("Executing transaction from {}", sender);
        let response = self
            .sui_client
            .quorum_driver_api()
            .execute_transaction_block(
                Transaction::from_data(tx_data, vec![signature]),
                SuiTransactionBlockResponseOptions::new()
                    .with_effects()
                    .with_object_changes(),
                None,
            )
            .await
            .context("Failed to execute transaction")?;

        into_result(response)
    }

    async fn execute_sponsored(
        &self,
        relay: &RelayClient,
        pt: ProgrammableTransaction,
    ) -> Result<ExecutionResult> {
        let sender_address = self
            .signer
            .address()
            .ok_or_else(|| SuiError::InvalidConfig("No wallet account connected".to_string()))?;

        let kind_bytes = bcs::to_bytes(&TransactionKind::ProgrammableTransaction(pt))?;
        let kind_b64 = base64::engine::general_purpose::STANDARD.encode(kind_bytes);

        let sponsored = relay
            .sponsor(&kind_b64, &sender_address, &[])
            .await
            .map_err(|e| SuiError::Sponsor(e.to_string()))?;

        let tx_bytes = base64::engine::general_purpose::STANDARD
            .decode(&sponsored.bytes)
            .map_err(|e| SuiError::Serialization(format!("Invalid sponsored bytes: {}", e)))?;

        let signature = self
            .signer
            .sign_transaction(&tx_bytes)
            .await
            .map_err(|e| SuiError::Signer(e.to_string()))?;

        let digest = relay
            .execute(&sponsored.digest, &signature)
            .await
            .map_err(|e| SuiError::Sponsor(e.to_string()))?;

        tracing::debug!("Sponsored transaction {} submitted", digest);

        let response = self.wait_for_transaction(&digest).await?;
        into_result(response)
    }

    async fn sign(&self, tx_data: &TransactionData) -> Result<Signature> {
        let bytes = bcs::to_bytes(tx_data)?;
        let encoded = self
            .signer
            .sign_transaction(&bytes)
            .await
            .map_err(|e| SuiError::Signer(e.to_string()))?;

        Signature::decode_base64(&encoded)
            .map_err(|e| SuiError::Serialization(format!("Invalid signature: {}", e)))
    }

    /// Poll until the fullnode knows the transaction.
    pub async fn wait_for_transaction(&self, digest: &TxDigest) -> Result<SuiTransactionBlockResponse> {
        wait_for_transaction(&self.sui_client, digest).await
    }
}

/// Poll the fullnode for `digest` until it is indexed.
pub async fn wait_for_transaction(
    sui_client: &SuiClient,
    digest: &TxDigest,
) -> Result<SuiTransactionBlockResponse> {
    let tx_digest = to_transaction_digest(digest)?;

    for attempt in 1..=FINALITY_MAX_ATTEMPTS {
        match sui_client
            .read_api()
            .get_transaction_with_options(
                tx_digest,
                SuiTransactionBlockResponseOptions::new()
                    .with_effects()
                    .with_object_changes(),
            )
            .await
        {
            Ok(response) => return Ok(response),
            Err(e) => {
                tracing::debug!("Transaction {} not final yet (attempt {}): {}", digest, attempt, e);
                tokio::time::sleep(FINALITY_POLL_INTERVAL).await;
            }
        }
    }

    Err(SuiError::Other(anyhow!(
        "Timed out waiting for transaction {}",
        digest
    )))
}

/// Check execution status and collect created objects.
fn into_result(response: SuiTransactionBlockResponse) -> Result<ExecutionResult> {
    let digest = from_transaction_digest(response.digest);

    if let Some(effects) = &response.effects {
        if let SuiExecutionStatus::Failure { error } = effects.status() {
            tracing::warn!("Transaction {} failed: {}", digest, error);
            return Err(SuiError::TransactionFailed(error.clone()));
        }
    }

    let created = response
        .object_changes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|change| match change {
            ObjectChange::Created {
                object_id,
                object_type,
                ..
            } => Some(CreatedObject {
                object_id: from_object_id(object_id),
                object_type: object_type.to_canonical_string(true),
            }),
            _ => None,
        })
        .collect();

    tracing::info!("✓ Transaction executed: {}", digest);
    Ok(ExecutionResult { digest, created })
}
