//! Sui integration for the creator subscription platform.
//!
//! This crate implements the `client-blockchain-core` traits against Sui and
//! its companion services:
//! - Ledger reads (events, object changes, objects, dynamic fields)
//! - Transaction builders for the `service` and `subscription` modules
//! - Direct and sponsored transaction execution
//! - Walrus blob storage
//! - Seal threshold encryption gated by `seal_approve`
//! - The sponsorship relay HTTP client
//!
//! # Architecture
//!
//! ```text
//! client-core (workflows over traits)
//!        ↓
//! client-blockchain-sui
//!   ├── SuiLedgerClient   → LedgerTransport
//!   ├── SuiPlatformClient → CreatorActions + SubscriberActions
//!   │     └── TransactionExecutor (direct | relay-sponsored)
//!   ├── WalrusClient      → BlobStore
//!   ├── SuiKeyRelease     → KeyRelease
//!   ├── KeystoreSigner    → WalletSigner
//!   └── RelayClient       → SubnameRegistrar
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_sui::{SuiConfig, SuiLedgerClient};
//! use client_blockchain_core::LedgerTransport;
//!
//! let config = SuiConfig::from_env()?;
//! let ledger = SuiLedgerClient::connect(config.clone()).await?;
//! let events = ledger
//!     .query_events(&config.event_type("CreatorRegistered"), 50)
//!     .await?;
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod contracts;
pub mod core;
pub mod executor;
pub mod relay;
pub mod seal;
pub mod signer;
pub mod utils;
pub mod walrus;

pub use actions::{SERVICE_TYPE_FRAGMENT, SuiPlatformClient};
pub use client::SuiLedgerClient;
pub use config::{SuiConfig, SuiNetwork};
pub use crate::core::{Result, SuiError};
pub use executor::{ExecutionResult, TransactionExecutor, wait_for_transaction};
pub use relay::RelayClient;
pub use seal::{SealClient, SealConfig, SuiKeyRelease};
pub use signer::{KeystoreSigner, default_keystore_path};
pub use walrus::{WalrusClient, WalrusConfig};
