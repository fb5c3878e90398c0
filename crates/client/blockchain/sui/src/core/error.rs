//! Error types for Sui blockchain operations.

use client_blockchain_core::{ActionError, KeyReleaseError, TransportError};
use thiserror::Error;

/// Errors that can occur during Sui blockchain operations.
#[derive(Debug, Error)]
pub enum SuiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object {0} is not shared")]
    NotShared(String),

    #[error("No SUI coins available for {0}")]
    NoCoins(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sponsorship failed: {0}")]
    Sponsor(String),

    #[error("Signing failed: {0}")]
    Signer(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SuiError>;

impl From<sui_sdk::error::Error> for SuiError {
    fn from(err: sui_sdk::error::Error) -> Self {
        SuiError::Network(err.to_string())
    }
}

impl From<bcs::Error> for SuiError {
    fn from(err: bcs::Error) -> Self {
        SuiError::Serialization(err.to_string())
    }
}

impl From<SuiError> for TransportError {
    fn from(err: SuiError) -> Self {
        match err {
            SuiError::Network(msg) => TransportError::Network(msg),
            SuiError::TransactionFailed(msg) => TransportError::TransactionFailed(msg),
            SuiError::InvalidConfig(msg) => TransportError::Config(msg),
            SuiError::Serialization(msg) => TransportError::Serialization(msg),
            other => TransportError::Network(other.to_string()),
        }
    }
}

impl From<SuiError> for ActionError {
    fn from(err: SuiError) -> Self {
        match err {
            SuiError::TransactionFailed(msg) => ActionError::Rejected(msg),
            SuiError::NoCoins(_) => ActionError::NoCoins,
            SuiError::InvalidConfig(msg) => ActionError::InvalidInput(msg),
            SuiError::Sponsor(msg) => ActionError::Sponsor(msg),
            SuiError::Signer(msg) => {
                ActionError::Signer(client_blockchain_core::SignerError::Backend(msg))
            }
            other => ActionError::Transport(other.into()),
        }
    }
}

impl From<SuiError> for KeyReleaseError {
    fn from(err: SuiError) -> Self {
        KeyReleaseError::Transport(err.to_string())
    }
}
