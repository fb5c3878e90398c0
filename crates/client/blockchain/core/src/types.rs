//! Common types for ledger, blob store and key-release interactions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalise a hex identifier to `0x` followed by 64 lowercase hex digits.
///
/// Short forms such as `0x6` are left-padded, matching how the ledger prints
/// system object ids.
pub fn normalize_hex_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    Some(format!("0x{:0>64}", digits.to_ascii_lowercase()))
}

fn hex_id_bytes(id: &str) -> Option<[u8; 32]> {
    let normalized = normalize_hex_id(id)?;
    let mut out = [0u8; 32];
    hex::decode_to_slice(&normalized[2..], &mut out).ok()?;
    Some(out)
}

// ============================================================================
// Identifiers
// ============================================================================

/// On-chain object identifier (32 bytes, hex encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap an identifier exactly as received from the ledger.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse and normalise a user supplied identifier.
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_hex_id(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32 bytes of the identifier, if it is well formed.
    pub fn to_bytes(&self) -> Option<[u8; 32]> {
        hex_id_bytes(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account address (32 bytes, hex encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        normalize_hex_id(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Option<[u8; 32]> {
        hex_id_bytes(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxDigest(String);

impl TxDigest {
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-addressed blob identifier in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobId(String);

impl BlobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Ledger Reads
// ============================================================================

/// A typed Move event as returned by an event query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Digest of the transaction that emitted the event
    pub tx_digest: TxDigest,

    /// Position of the event inside its transaction
    pub event_seq: u64,

    /// Fully qualified event type (`0x..::module::Name`)
    pub event_type: String,

    /// Transaction sender
    pub sender: Option<Address>,

    /// Event payload as JSON
    pub parsed_json: serde_json::Value,

    /// Checkpoint timestamp, when the node reports one
    pub timestamp_ms: Option<u64>,
}

impl LedgerEvent {
    /// Read a string field from the event payload.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.parsed_json.get(name).and_then(|v| v.as_str())
    }

    /// Read a u64 field that may be encoded as a number or a decimal string.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        let value = self.parsed_json.get(name)?;
        value.as_u64().or_else(|| value.as_str()?.parse().ok())
    }
}

/// Object created by a transaction (from its object changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    pub object_id: ObjectId,
    pub object_type: String,
}

/// Object state as read from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub object_id: ObjectId,

    /// Move type of the object, when known
    pub object_type: Option<String>,

    /// Move struct fields as JSON. `None` when the object has no readable content.
    pub fields: Option<serde_json::Value>,
}

impl ObjectData {
    pub fn has_content(&self) -> bool {
        self.fields.is_some()
    }
}

// ============================================================================
// Key Release
// ============================================================================

/// Short-lived, wallet-signed capability presented to key servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    /// Wallet address that signed the credential
    pub address: Address,

    /// Package whose access policy the credential is scoped to
    pub package_id: ObjectId,

    /// Creation time (unix ms)
    pub created_at_ms: u64,

    /// Lifetime in milliseconds
    pub ttl_ms: u64,

    /// Personal message that was signed
    pub personal_message: String,

    /// Wallet signature over the personal message (base64)
    pub signature: String,

    /// Ephemeral key the wallet signature certifies
    pub session_key: SessionKey,
}

/// Ephemeral Ed25519 key that signs key-server requests for one session.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionKey {
    /// Verifying key (base64), embedded in the signed personal message
    pub public_key: String,

    /// 32-byte signing key seed
    pub secret_key: Vec<u8>,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl SessionCredential {
    pub fn expires_at_ms(&self) -> u64 {
        self.created_at_ms.saturating_add(self.ttl_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms()
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// Sponsor-cosigned transaction waiting for the user's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredTransaction {
    /// Full transaction data (base64 BCS)
    pub bytes: String,
    pub digest: TxDigest,
}

/// Subscription tier definition submitted by a creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    pub tier_level: u64,
    pub name: String,
    pub price_mist: u64,
    pub duration_ms: u64,
}

/// Post reference submitted on-chain after its blobs are uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub metadata_blob_id: BlobId,
    /// Empty when the post carries no images
    pub data_blob_id: BlobId,
    pub required_tier: u64,
}

/// Result of a server-signed subname registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnameRegistration {
    /// Full name, e.g. `alice.patreon.sui`
    pub suins_name: String,
    pub normalised_name: String,
    /// `None` when the leaf already existed and creation was skipped
    pub tx_digest: Option<TxDigest>,
}

/// Blockchain-specific configuration.
pub trait BlockchainConfig: Send + Sync {
    /// Human-readable network name (e.g., "sui-testnet")
    fn network_name(&self) -> &str;

    /// RPC endpoint URL
    fn rpc_url(&self) -> &str;

    /// Validate configuration
    fn validate(&self) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_padded() {
        let clock = ObjectId::parse("0x6").unwrap();
        assert_eq!(clock.as_str().len(), 66);
        assert!(clock.as_str().ends_with("0006"));
        assert_eq!(clock.to_bytes().unwrap()[31], 6);
    }

    #[test]
    fn invalid_ids_are_rejected() {
        assert!(ObjectId::parse("").is_none());
        assert!(ObjectId::parse("0xzz").is_none());
        assert!(Address::parse(&format!("0x{}", "a".repeat(65))).is_none());
    }

    #[test]
    fn credential_expiry() {
        let credential = SessionCredential {
            address: Address::new("0x1"),
            package_id: ObjectId::new("0x2"),
            created_at_ms: 1_000,
            ttl_ms: 600_000,
            personal_message: String::new(),
            signature: String::new(),
            session_key: SessionKey::default(),
        };
        assert!(!credential.is_expired(600_999));
        assert!(credential.is_expired(601_000));
    }

    #[test]
    fn event_fields_accept_strings_and_numbers() {
        let event = LedgerEvent {
            tx_digest: TxDigest::new("d"),
            event_seq: 0,
            event_type: "0x1::service::PostPublished".into(),
            sender: None,
            parsed_json: serde_json::json!({ "creator": "0xabc", "post_id": "7", "n": 3 }),
            timestamp_ms: Some(1),
        };
        assert_eq!(event.str_field("creator"), Some("0xabc"));
        assert_eq!(event.u64_field("post_id"), Some(7));
        assert_eq!(event.u64_field("n"), Some(3));
        assert_eq!(event.u64_field("missing"), None);
    }
}
