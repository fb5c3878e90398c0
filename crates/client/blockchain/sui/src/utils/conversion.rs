//! Type conversion utilities for Sui blockchain.
//!
//! Conversions between the chain-agnostic identifiers in
//! `client-blockchain-core` and the Sui SDK types.

use client_blockchain_core::{Address, ObjectId, TxDigest};
use sui_types::base_types::{ObjectID, SuiAddress};
use sui_types::digests::TransactionDigest;

use crate::core::error::{Result, SuiError};

// ============================================================================
// Object IDs
// ============================================================================

pub fn to_object_id(id: &ObjectId) -> Result<ObjectID> {
    parse_object_id(id.as_str())
}

pub fn parse_object_id(raw: &str) -> Result<ObjectID> {
    let normalized = client_blockchain_core::normalize_hex_id(raw)
        .ok_or_else(|| SuiError::InvalidConfig(format!("Invalid object ID: {}", raw)))?;
    ObjectID::from_hex_literal(&normalized)
        .map_err(|e| SuiError::InvalidConfig(format!("Invalid object ID {}: {}", raw, e)))
}

pub fn from_object_id(id: ObjectID) -> ObjectId {
    ObjectId::new(id.to_hex_literal())
}

// ============================================================================
// Addresses
// ============================================================================

pub fn to_sui_address(address: &Address) -> Result<SuiAddress> {
    let normalized = client_blockchain_core::normalize_hex_id(address.as_str())
        .ok_or_else(|| SuiError::InvalidConfig(format!("Invalid address: {}", address)))?;
    normalized
        .parse()
        .map_err(|e| SuiError::InvalidConfig(format!("Invalid address {}: {}", address, e)))
}

pub fn from_sui_address(address: SuiAddress) -> Address {
    Address::new(address.to_string())
}

/// Convert Sui address bytes to hex string.
pub fn address_to_string(address_bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(address_bytes))
}

// ============================================================================
// Transaction Digests
// ============================================================================

pub fn to_transaction_digest(digest: &TxDigest) -> Result<TransactionDigest> {
    digest
        .as_str()
        .parse()
        .map_err(|e| SuiError::Serialization(format!("Invalid digest {}: {}", digest, e)))
}

pub fn from_transaction_digest(digest: TransactionDigest) -> TxDigest {
    TxDigest::new(digest.to_string())
}
