//! [`KeyRelease`] backed by Seal key servers and Sui access policy.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sui_sdk::SuiClient;

use client_blockchain_core::{KeyRelease, KeyReleaseError, ObjectId, SessionCredential, SessionKey};

use super::certificate::generate_session_key;
use super::client::SealClient;
use super::identity::content_identity;
use crate::contracts::{ObjectArgResolver, ServiceContract, clock_arg};
use crate::utils::conversion::to_object_id;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct SuiKeyRelease {
    seal: SealClient,
    sui_client: SuiClient,
    service_contract: ServiceContract,
    resolver: Arc<ObjectArgResolver>,
}

impl SuiKeyRelease {
    pub fn new(
        seal: SealClient,
        sui_client: SuiClient,
        service_contract: ServiceContract,
        resolver: Arc<ObjectArgResolver>,
    ) -> Self {
        Self {
            seal,
            sui_client,
            service_contract,
            resolver,
        }
    }

    /// BCS programmable transaction calling `seal_approve(identity, service, clock)`.
    async fn approval_tx(&self, identity: &[u8], service: &ObjectId) -> Result<Vec<u8>, KeyReleaseError> {
        let service_id = to_object_id(service)?;
        let service_arg = self
            .resolver
            .shared(&self.sui_client, service_id, false)
            .await?;

        let pt = self
            .service_contract
            .seal_approve(identity.to_vec(), service_arg, clock_arg())?;

        bcs::to_bytes(&pt).map_err(|e| KeyReleaseError::Transport(e.to_string()))
    }
}

#[async_trait]
impl KeyRelease for SuiKeyRelease {
    async fn encrypt(
        &self,
        service: &ObjectId,
        content_id: u64,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError> {
        let identity = content_identity(service, content_id)?;
        let sealed = self.seal.encrypt(&identity, plaintext).await?;
        tracing::debug!(
            "Encrypted {} bytes for {}/{} ({} bytes sealed)",
            plaintext.len(),
            service,
            content_id,
            sealed.len()
        );
        Ok(sealed)
    }

    fn new_session_key(&self) -> SessionKey {
        generate_session_key()
    }

    async fn decrypt(
        &self,
        credential: &SessionCredential,
        service: &ObjectId,
        content_id: u64,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError> {
        if credential.is_expired(now_ms()) {
            return Err(KeyReleaseError::CredentialExpired);
        }

        let identity = content_identity(service, content_id)?;
        let approval = self.approval_tx(&identity, service).await?;
        self.seal
            .decrypt(credential, &identity, &approval, ciphertext)
            .await
    }
}
