//! Platform abstraction traits.
//!
//! This module defines a layered abstraction over the external systems:
//! - Layer 0: LedgerTransport, BlobStore, WalletSigner (pure infrastructure)
//! - Layer 1: KeyRelease, CreatorActions, SubscriberActions, SubnameRegistrar (platform domain)
//! - Layer 2: PlatformClient (composite trait)

use async_trait::async_trait;

use crate::types::{
    Address, BlobId, CreatedObject, LedgerEvent, NewPost, ObjectData, ObjectId,
    SessionCredential, SessionKey, SubnameRegistration, TierSpec, TxDigest,
};

// ============================================================================
// Error Types
// ============================================================================

/// Ledger transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Blob store errors.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("Blob not found: {0}")]
    NotFound(BlobId),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload failed with status {status}: {message}")]
    Upload { status: u16, message: String },

    #[error("Download failed with status {status}: {message}")]
    Download { status: u16, message: String },

    #[error("Unexpected blob store response: {0}")]
    InvalidResponse(String),
}

/// Threshold key-release errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyReleaseError {
    /// A key server refused to release its share (no sufficient subscription).
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Key server quorum not reached: {responded} of {threshold} required keys")]
    QuorumNotReached { responded: usize, threshold: usize },

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Session credential expired")]
    CredentialExpired,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Key server transport error: {0}")]
    Transport(String),
}

/// Wallet signing errors.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Signature request rejected by user")]
    Rejected,

    #[error("No wallet account connected")]
    NoAccount,

    #[error("Wallet backend error: {0}")]
    Backend(String),
}

/// Errors raised by state-changing platform actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The transaction executed but the contract aborted, or the node rejected it.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("No SUI coins provided for subscription payment")]
    NoCoins,

    #[error("Sponsorship failed: {0}")]
    Sponsor(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
}

// ============================================================================
// Layer 0: Pure Infrastructure
// ============================================================================

/// Read-only ledger access.
///
/// Every method is a single RPC round trip. Callers that need best-effort
/// aggregation swallow per-entity failures themselves.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Query one page of typed events in ledger order.
    async fn query_events(
        &self,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, TransportError>;

    /// Objects created by a transaction (from its object changes).
    async fn created_objects(&self, digest: &TxDigest) -> Result<Vec<CreatedObject>, TransportError>;

    /// Read an object with its content.
    ///
    /// Deleted or wrapped objects are returned with `fields: None`.
    async fn get_object(&self, object_id: &ObjectId) -> Result<ObjectData, TransportError>;

    /// Read several objects, preserving input order.
    async fn multi_get_objects(&self, ids: &[ObjectId]) -> Result<Vec<ObjectData>, TransportError> {
        let mut objects = Vec::with_capacity(ids.len());
        for id in ids {
            objects.push(self.get_object(id).await?);
        }
        Ok(objects)
    }

    /// Read a dynamic field of `parent` keyed by an address. `None` when absent.
    async fn get_dynamic_field(
        &self,
        parent: &ObjectId,
        key: &Address,
    ) -> Result<Option<ObjectData>, TransportError>;

    /// Count the dynamic fields of `parent` (first page).
    async fn count_dynamic_fields(&self, parent: &ObjectId) -> Result<u64, TransportError>;
}

/// Content-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes and return their content address.
    ///
    /// Uploading bytes that are already certified succeeds with the existing id.
    async fn store(&self, data: Vec<u8>) -> Result<BlobId, BlobStoreError>;

    /// Download raw bytes. No retry is performed.
    async fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>, BlobStoreError>;
}

/// The connected user's wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Active account, if any.
    fn address(&self) -> Option<Address>;

    /// Sign a personal message. May suspend until the user answers.
    async fn sign_personal_message(&self, message: &[u8]) -> Result<String, SignerError>;

    /// Sign BCS-encoded transaction data. Returns a serialized signature (base64).
    async fn sign_transaction(&self, tx_data: &[u8]) -> Result<String, SignerError>;
}

// ============================================================================
// Layer 1: Platform Domain Traits
// ============================================================================

/// Threshold identity-based encryption gated by on-chain access policy.
///
/// Content is addressed by `(service, content_id)`: the creator's service
/// object and the post index (0 for profile assets).
#[async_trait]
pub trait KeyRelease: Send + Sync {
    /// Encrypt `plaintext` for the identity `(service, content_id)`.
    async fn encrypt(
        &self,
        service: &ObjectId,
        content_id: u64,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError>;

    /// Fresh ephemeral key for a new session credential.
    fn new_session_key(&self) -> SessionKey;

    /// Request keys from the key servers and decrypt. Each call asks again.
    async fn decrypt(
        &self,
        credential: &SessionCredential,
        service: &ObjectId,
        content_id: u64,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError>;
}

/// Creator-side contract calls.
#[async_trait]
pub trait CreatorActions: Send + Sync {
    /// Register as a creator. Returns the created service object.
    async fn create_profile(&self, name: &str, description: &str) -> Result<ObjectId, ActionError>;

    async fn update_profile(
        &self,
        service: &ObjectId,
        name: &str,
        description: &str,
        avatar_blob_id: Option<&BlobId>,
    ) -> Result<TxDigest, ActionError>;

    async fn add_tier(&self, service: &ObjectId, tier: &TierSpec) -> Result<TxDigest, ActionError>;

    async fn remove_tier(&self, service: &ObjectId, tier_level: u64) -> Result<TxDigest, ActionError>;

    async fn publish_post(&self, service: &ObjectId, post: &NewPost) -> Result<TxDigest, ActionError>;

    async fn update_post(
        &self,
        service: &ObjectId,
        post_id: u64,
        title: &str,
        metadata_blob_id: &BlobId,
        data_blob_id: &BlobId,
    ) -> Result<TxDigest, ActionError>;

    async fn set_post_visibility(
        &self,
        service: &ObjectId,
        post_id: u64,
        required_tier: u64,
    ) -> Result<TxDigest, ActionError>;

    async fn delete_post(&self, service: &ObjectId, post_id: u64) -> Result<TxDigest, ActionError>;

    async fn withdraw_funds(&self, service: &ObjectId) -> Result<TxDigest, ActionError>;

    async fn delete_profile(&self, service: &ObjectId) -> Result<TxDigest, ActionError>;

    async fn set_suins_name(&self, service: &ObjectId, name: &str) -> Result<TxDigest, ActionError>;

    async fn remove_suins_name(&self, service: &ObjectId) -> Result<TxDigest, ActionError>;
}

/// Subscriber-side contract calls.
#[async_trait]
pub trait SubscriberActions: Send + Sync {
    /// Pay `price_mist` from the user's own coins for `tier_level`.
    async fn subscribe(
        &self,
        service: &ObjectId,
        tier_level: u64,
        price_mist: u64,
    ) -> Result<TxDigest, ActionError>;
}

/// Server-signed name-service subname registration.
#[async_trait]
pub trait SubnameRegistrar: Send + Sync {
    async fn create_subname(&self, creator: &Address) -> Result<SubnameRegistration, ActionError>;
}

// ============================================================================
// Layer 2: Composite Trait
// ============================================================================

/// Complete transaction-submitting client.
///
/// All chain backends implement this composite of the action traits.
pub trait PlatformClient: CreatorActions + SubscriberActions + Send + Sync {
    /// Get the blockchain name (e.g., "Sui").
    fn name(&self) -> &str;

    /// Get the network name (e.g., "mainnet", "testnet", "local").
    fn network(&self) -> &str;
}
