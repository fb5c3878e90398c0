//! Platform abstraction layer for the creator subscription client.
//!
//! This crate provides a layered abstraction over the ledger, the blob store,
//! the threshold key-release service and the user's wallet.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: PlatformClient (composite trait)
//!          ├── CreatorActions
//!          └── SubscriberActions
//!
//! Layer 1: Domain Traits (KeyRelease, SubnameRegistrar, actions)
//!
//! Layer 0: LedgerTransport, BlobStore, WalletSigner (pure infrastructure)
//! ```
//!
//! # Design Philosophy
//!
//! - **Layer 0 (Transport)**: Single RPC round trips, no platform knowledge
//! - **Layer 1 (Domain)**: Contract calls and content encryption
//! - **Layer 2 (Composite)**: Complete transaction-submitting client
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_core::{BlobStore, KeyRelease, ObjectId};
//!
//! async fn unlock(store: &dyn BlobStore, seal: &dyn KeyRelease, credential: &SessionCredential) {
//!     let bytes = store.read(&blob_id).await?;
//!     let plain = seal.decrypt(credential, &service, post_id, &bytes).await?;
//! }
//! ```

pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export all traits
pub use traits::{
    ActionError, BlobStore, BlobStoreError, CreatorActions, KeyRelease, KeyReleaseError,
    LedgerTransport, PlatformClient, SignerError, SubnameRegistrar, SubscriberActions,
    TransportError, WalletSigner,
};

// Re-export all types
pub use types::{
    Address, BlobId, BlockchainConfig, CreatedObject, LedgerEvent, NewPost, ObjectData, ObjectId,
    SessionCredential, SessionKey, SponsoredTransaction, SubnameRegistration, TierSpec, TxDigest,
    normalize_hex_id,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{
    MockActions, MockBlobStore, MockKeyRelease, MockLedger, MockSigner, MockSubnames,
};
