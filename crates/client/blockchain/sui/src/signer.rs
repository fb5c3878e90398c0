//! Keystore-backed wallet signer.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use shared_crypto::intent::{Intent, IntentMessage, PersonalMessage};
use sui_keys::keystore::{AccountKeystore, FileBasedKeystore};
use sui_types::base_types::SuiAddress;
use sui_types::crypto::{EncodeDecodeBase64, Signature};
use sui_types::transaction::{TransactionData, TransactionDataAPI};

use client_blockchain_core::{Address, SignerError, WalletSigner};

use crate::utils::conversion::from_sui_address;

/// Default Sui CLI keystore (`~/.sui/sui_config/sui.keystore`).
pub fn default_keystore_path() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .home_dir()
        .to_path_buf();
    Ok(home.join(".sui").join("sui_config").join("sui.keystore"))
}

/// Signs with a key from a local Sui keystore file.
///
/// Stands in for a browser wallet: signing never prompts, so it never
/// reports [`SignerError::Rejected`].
pub struct KeystoreSigner {
    keystore: FileBasedKeystore,
    address: SuiAddress,
}

impl KeystoreSigner {
    /// Load `path` and select `address`, or the first key when `None`.
    pub fn load(path: &Path, address: Option<&str>) -> anyhow::Result<Self> {
        let keystore = FileBasedKeystore::load_or_create(&path.to_path_buf())
            .with_context(|| format!("Failed to load keystore at {}", path.display()))?;

        let address = match address {
            Some(raw) => raw
                .parse::<SuiAddress>()
                .map_err(|e| anyhow!("Invalid signer address {}: {}", raw, e))?,
            None => keystore
                .addresses()
                .first()
                .copied()
                .ok_or_else(|| anyhow!("Keystore {} has no keys", path.display()))?,
        };

        if !keystore.addresses().contains(&address) {
            return Err(anyhow!("Address {} is not in keystore {}", address, path.display()));
        }

        tracing::debug!("Using keystore signer {}", address);
        Ok(Self { keystore, address })
    }

    pub fn sui_address(&self) -> SuiAddress {
        self.address
    }

    fn sign<T: serde::Serialize>(&self, intent_message: &IntentMessage<T>) -> Result<String, SignerError> {
        let keypair = self
            .keystore
            .export(&self.address)
            .map_err(|e| SignerError::Backend(format!("Failed to export keypair: {}", e)))?;

        Ok(Signature::new_secure(intent_message, keypair).encode_base64())
    }
}

#[async_trait]
impl WalletSigner for KeystoreSigner {
    fn address(&self) -> Option<Address> {
        Some(from_sui_address(self.address))
    }

    async fn sign_personal_message(&self, message: &[u8]) -> Result<String, SignerError> {
        let personal = PersonalMessage {
            message: message.to_vec(),
        };
        self.sign(&IntentMessage::new(Intent::personal_message(), personal))
    }

    async fn sign_transaction(&self, tx_data: &[u8]) -> Result<String, SignerError> {
        let data: TransactionData = bcs::from_bytes(tx_data)
            .map_err(|e| SignerError::Backend(format!("Invalid transaction data: {}", e)))?;

        if data.sender() != self.address {
            tracing::warn!(
                "Signing transaction for sender {} with key {}",
                data.sender(),
                self.address
            );
        }

        self.sign(&IntentMessage::new(Intent::sui_transaction(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keystore_has_no_signer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sui.keystore");
        let err = KeystoreSigner::load(&path, None).err().unwrap();
        assert!(err.to_string().contains("has no keys"));
    }

    #[test]
    fn malformed_address_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sui.keystore");
        let err = KeystoreSigner::load(&path, Some("alice")).err().unwrap();
        assert!(err.to_string().contains("Invalid signer address alice"));
    }

    #[test]
    fn default_path_is_the_cli_keystore() {
        let path = default_keystore_path().unwrap();
        assert!(path.ends_with(".sui/sui_config/sui.keystore"));
    }
}
