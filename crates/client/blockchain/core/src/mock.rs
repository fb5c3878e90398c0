//! In-memory platform backends for testing.
//!
//! Every mock keeps its state behind `Arc<Mutex<..>>` so clones share it and
//! tests can assert on call counters after handing a clone to the code under test.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::traits::{
    ActionError, BlobStore, BlobStoreError, CreatorActions, KeyRelease, KeyReleaseError,
    LedgerTransport, PlatformClient, SignerError, SubnameRegistrar, SubscriberActions,
    TransportError, WalletSigner,
};
use crate::types::{
    Address, BlobId, CreatedObject, LedgerEvent, NewPost, ObjectData, ObjectId,
    SessionCredential, SessionKey, SubnameRegistration, TierSpec, TxDigest,
};

// ============================================================================
// Ledger
// ============================================================================

#[derive(Default)]
struct LedgerState {
    events: Vec<LedgerEvent>,
    created: HashMap<TxDigest, Vec<CreatedObject>>,
    objects: HashMap<ObjectId, ObjectData>,
    dynamic_fields: HashMap<(ObjectId, Address), ObjectData>,
    dynamic_field_counts: HashMap<ObjectId, u64>,
    failing_txs: HashSet<TxDigest>,
    event_queries: usize,
    object_reads: usize,
}

/// Mock ledger holding events, transaction object changes and objects.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event; events are returned in insertion order.
    pub fn push_event(
        &self,
        event_type: &str,
        tx_digest: &str,
        parsed_json: serde_json::Value,
        timestamp_ms: Option<u64>,
    ) {
        let mut state = self.state.lock().unwrap();
        let event_seq = state.events.len() as u64;
        state.events.push(LedgerEvent {
            tx_digest: TxDigest::new(tx_digest),
            event_seq,
            event_type: event_type.to_string(),
            sender: None,
            parsed_json,
            timestamp_ms,
        });
    }

    /// Record an object created by `tx_digest`.
    pub fn insert_created(&self, tx_digest: &str, object_id: &ObjectId, object_type: &str) {
        self.state
            .lock()
            .unwrap()
            .created
            .entry(TxDigest::new(tx_digest))
            .or_default()
            .push(CreatedObject {
                object_id: object_id.clone(),
                object_type: object_type.to_string(),
            });
    }

    /// Insert or replace a live object.
    pub fn insert_object(&self, object_id: &ObjectId, fields: serde_json::Value) {
        self.state.lock().unwrap().objects.insert(
            object_id.clone(),
            ObjectData {
                object_id: object_id.clone(),
                object_type: None,
                fields: Some(fields),
            },
        );
    }

    /// Remove an object, as if it had been deleted on-chain.
    pub fn remove_object(&self, object_id: &ObjectId) {
        self.state.lock().unwrap().objects.remove(object_id);
    }

    pub fn insert_dynamic_field(&self, parent: &ObjectId, key: &Address, fields: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        state.dynamic_fields.insert(
            (parent.clone(), key.clone()),
            ObjectData {
                object_id: ObjectId::new(format!("{}::{}", parent, key)),
                object_type: None,
                fields: Some(fields),
            },
        );
        *state.dynamic_field_counts.entry(parent.clone()).or_default() += 1;
    }

    /// Make `created_objects` fail for one transaction.
    pub fn fail_transaction_lookup(&self, tx_digest: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_txs
            .insert(TxDigest::new(tx_digest));
    }

    pub fn event_queries(&self) -> usize {
        self.state.lock().unwrap().event_queries
    }

    pub fn object_reads(&self) -> usize {
        self.state.lock().unwrap().object_reads
    }
}

#[async_trait]
impl LedgerTransport for MockLedger {
    async fn query_events(
        &self,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.event_queries += 1;
        Ok(state
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn created_objects(&self, digest: &TxDigest) -> Result<Vec<CreatedObject>, TransportError> {
        let state = self.state.lock().unwrap();
        if state.failing_txs.contains(digest) {
            return Err(TransportError::Network(format!("lookup of {} failed", digest)));
        }
        Ok(state.created.get(digest).cloned().unwrap_or_default())
    }

    async fn get_object(&self, object_id: &ObjectId) -> Result<ObjectData, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.object_reads += 1;
        Ok(state.objects.get(object_id).cloned().unwrap_or(ObjectData {
            object_id: object_id.clone(),
            object_type: None,
            fields: None,
        }))
    }

    async fn get_dynamic_field(
        &self,
        parent: &ObjectId,
        key: &Address,
    ) -> Result<Option<ObjectData>, TransportError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .dynamic_fields
            .get(&(parent.clone(), key.clone()))
            .cloned())
    }

    async fn count_dynamic_fields(&self, parent: &ObjectId) -> Result<u64, TransportError> {
        let state = self.state.lock().unwrap();
        Ok(state.dynamic_field_counts.get(parent).copied().unwrap_or(0))
    }
}

// ============================================================================
// Blob Store
// ============================================================================

#[derive(Default)]
struct BlobState {
    blobs: HashMap<BlobId, Vec<u8>>,
    reads: usize,
    writes: usize,
}

/// Mock blob store addressing blobs by a counter.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    state: Arc<Mutex<BlobState>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob under a chosen id.
    pub fn insert(&self, blob_id: &str, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(BlobId::new(blob_id), data);
    }

    pub fn get(&self, blob_id: &BlobId) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blobs.get(blob_id).cloned()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn store(&self, data: Vec<u8>) -> Result<BlobId, BlobStoreError> {
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        let blob_id = BlobId::new(format!("blob-{}", state.writes));
        state.blobs.insert(blob_id.clone(), data);
        Ok(blob_id)
    }

    async fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>, BlobStoreError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        state
            .blobs
            .get(blob_id)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(blob_id.clone()))
    }
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Default)]
struct SignerState {
    personal_signatures: usize,
    transaction_signatures: usize,
    reject: bool,
}

/// Mock wallet that signs instantly, or rejects when told to.
#[derive(Clone)]
pub struct MockSigner {
    address: Option<Address>,
    state: Arc<Mutex<SignerState>>,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address: Some(address),
            state: Arc::default(),
        }
    }

    /// A wallet with no connected account.
    pub fn disconnected() -> Self {
        Self {
            address: None,
            state: Arc::default(),
        }
    }

    pub fn set_reject(&self, reject: bool) {
        self.state.lock().unwrap().reject = reject;
    }

    pub fn personal_signatures(&self) -> usize {
        self.state.lock().unwrap().personal_signatures
    }

    pub fn transaction_signatures(&self) -> usize {
        self.state.lock().unwrap().transaction_signatures
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn address(&self) -> Option<Address> {
        self.address.clone()
    }

    async fn sign_personal_message(&self, message: &[u8]) -> Result<String, SignerError> {
        if self.address.is_none() {
            return Err(SignerError::NoAccount);
        }
        let mut state = self.state.lock().unwrap();
        if state.reject {
            return Err(SignerError::Rejected);
        }
        state.personal_signatures += 1;
        Ok(format!("mock-personal-signature-{}", message.len()))
    }

    async fn sign_transaction(&self, tx_data: &[u8]) -> Result<String, SignerError> {
        if self.address.is_none() {
            return Err(SignerError::NoAccount);
        }
        let mut state = self.state.lock().unwrap();
        if state.reject {
            return Err(SignerError::Rejected);
        }
        state.transaction_signatures += 1;
        Ok(format!("mock-tx-signature-{}", tx_data.len()))
    }
}

// ============================================================================
// Key Release
// ============================================================================

const MOCK_SEAL_MAGIC: &[u8; 8] = b"MOCKSEAL";

#[derive(Default)]
struct KeyReleaseState {
    required_tiers: HashMap<(ObjectId, u64), u64>,
    viewer_tier: u64,
    unavailable: bool,
    encrypt_calls: usize,
    decrypt_calls: usize,
    session_keys: usize,
}

/// Mock key release that enforces a tier check instead of an on-chain policy.
///
/// Content without an explicit required tier needs tier 1. The viewer's tier
/// defaults to 0 (no subscription).
#[derive(Clone, Default)]
pub struct MockKeyRelease {
    state: Arc<Mutex<KeyReleaseState>>,
}

impl MockKeyRelease {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewer_tier(self, tier: u64) -> Self {
        self.state.lock().unwrap().viewer_tier = tier;
        self
    }

    pub fn with_required_tier(self, service: &ObjectId, content_id: u64, tier: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .required_tiers
            .insert((service.clone(), content_id), tier);
        self
    }

    /// Simulate all key servers being down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn encrypt_calls(&self) -> usize {
        self.state.lock().unwrap().encrypt_calls
    }

    pub fn decrypt_calls(&self) -> usize {
        self.state.lock().unwrap().decrypt_calls
    }

    pub fn session_keys_issued(&self) -> usize {
        self.state.lock().unwrap().session_keys
    }

    fn seal(service: &ObjectId, content_id: u64, plaintext: &[u8]) -> Vec<u8> {
        let service = service.as_str().as_bytes();
        let mut out = Vec::with_capacity(8 + 2 + service.len() + 8 + plaintext.len());
        out.extend_from_slice(MOCK_SEAL_MAGIC);
        out.extend_from_slice(&(service.len() as u16).to_le_bytes());
        out.extend_from_slice(service);
        out.extend_from_slice(&content_id.to_le_bytes());
        out.extend_from_slice(plaintext);
        out
    }
}

#[async_trait]
impl KeyRelease for MockKeyRelease {
    async fn encrypt(
        &self,
        service: &ObjectId,
        content_id: u64,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError> {
        self.state.lock().unwrap().encrypt_calls += 1;
        Ok(Self::seal(service, content_id, plaintext))
    }

    fn new_session_key(&self) -> SessionKey {
        let mut state = self.state.lock().unwrap();
        state.session_keys += 1;
        let seed = [state.session_keys as u8; 32];
        SessionKey {
            public_key: format!("mock-session-key-{}", state.session_keys),
            secret_key: seed.to_vec(),
        }
    }

    async fn decrypt(
        &self,
        _credential: &SessionCredential,
        service: &ObjectId,
        content_id: u64,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError> {
        let mut state = self.state.lock().unwrap();
        state.decrypt_calls += 1;

        if state.unavailable {
            return Err(KeyReleaseError::QuorumNotReached {
                responded: 0,
                threshold: 2,
            });
        }

        let header = Self::seal(service, content_id, &[]);
        let body = ciphertext
            .strip_prefix(header.as_slice())
            .ok_or_else(|| KeyReleaseError::MalformedCiphertext("identity mismatch".into()))?;

        let required = state
            .required_tiers
            .get(&(service.clone(), content_id))
            .copied()
            .unwrap_or(1);
        if state.viewer_tier < required {
            return Err(KeyReleaseError::AccessDenied(format!(
                "ENoAccess: tier {} required, viewer holds {}",
                required, state.viewer_tier
            )));
        }

        Ok(body.to_vec())
    }
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Default)]
struct ActionState {
    calls: Vec<String>,
    published: Vec<NewPost>,
    failure: Option<String>,
    created_service: Option<ObjectId>,
    counter: u64,
}

/// Mock action backend recording each call by name.
#[derive(Clone, Default)]
pub struct MockActions {
    state: Arc<Mutex<ActionState>>,
}

impl MockActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service id returned by `create_profile`.
    pub fn with_created_service(self, service: ObjectId) -> Self {
        self.state.lock().unwrap().created_service = Some(service);
        self
    }

    /// Make every subsequent call fail with an on-chain rejection message.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn published(&self) -> Vec<NewPost> {
        self.state.lock().unwrap().published.clone()
    }

    fn record(&self, call: String) -> Result<TxDigest, ActionError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(message) = &state.failure {
            return Err(ActionError::Rejected(message.clone()));
        }
        state.counter += 1;
        Ok(TxDigest::new(format!("mock-digest-{}", state.counter)))
    }
}

#[async_trait]
impl CreatorActions for MockActions {
    async fn create_profile(&self, name: &str, _description: &str) -> Result<ObjectId, ActionError> {
        self.record(format!("create_creator_profile:{}", name))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .created_service
            .clone()
            .unwrap_or_else(|| ObjectId::new("0xservice")))
    }

    async fn update_profile(
        &self,
        service: &ObjectId,
        name: &str,
        _description: &str,
        avatar_blob_id: Option<&BlobId>,
    ) -> Result<TxDigest, ActionError> {
        let avatar = avatar_blob_id.map(|b| b.to_string()).unwrap_or_default();
        self.record(format!("update_creator_profile:{}:{}:{}", service, name, avatar))
    }

    async fn add_tier(&self, service: &ObjectId, tier: &TierSpec) -> Result<TxDigest, ActionError> {
        self.record(format!("add_subscription_tier:{}:{}", service, tier.tier_level))
    }

    async fn remove_tier(&self, service: &ObjectId, tier_level: u64) -> Result<TxDigest, ActionError> {
        self.record(format!("remove_subscription_tier:{}:{}", service, tier_level))
    }

    async fn publish_post(&self, service: &ObjectId, post: &NewPost) -> Result<TxDigest, ActionError> {
        let digest = self.record(format!("publish_post:{}:{}", service, post.required_tier))?;
        self.state.lock().unwrap().published.push(post.clone());
        Ok(digest)
    }

    async fn update_post(
        &self,
        service: &ObjectId,
        post_id: u64,
        _title: &str,
        _metadata_blob_id: &BlobId,
        _data_blob_id: &BlobId,
    ) -> Result<TxDigest, ActionError> {
        self.record(format!("update_post:{}:{}", service, post_id))
    }

    async fn set_post_visibility(
        &self,
        service: &ObjectId,
        post_id: u64,
        required_tier: u64,
    ) -> Result<TxDigest, ActionError> {
        self.record(format!("set_post_visibility:{}:{}:{}", service, post_id, required_tier))
    }

    async fn delete_post(&self, service: &ObjectId, post_id: u64) -> Result<TxDigest, ActionError> {
        self.record(format!("delete_post:{}:{}", service, post_id))
    }

    async fn withdraw_funds(&self, service: &ObjectId) -> Result<TxDigest, ActionError> {
        self.record(format!("withdraw_creator_funds:{}", service))
    }

    async fn delete_profile(&self, service: &ObjectId) -> Result<TxDigest, ActionError> {
        self.record(format!("delete_creator_profile:{}", service))
    }

    async fn set_suins_name(&self, service: &ObjectId, name: &str) -> Result<TxDigest, ActionError> {
        self.record(format!("set_suins_name:{}:{}", service, name))
    }

    async fn remove_suins_name(&self, service: &ObjectId) -> Result<TxDigest, ActionError> {
        self.record(format!("remove_suins_name:{}", service))
    }
}

#[async_trait]
impl SubscriberActions for MockActions {
    async fn subscribe(
        &self,
        service: &ObjectId,
        tier_level: u64,
        price_mist: u64,
    ) -> Result<TxDigest, ActionError> {
        self.record(format!("subscribe:{}:{}:{}", service, tier_level, price_mist))
    }
}

impl PlatformClient for MockActions {
    fn name(&self) -> &str {
        "MockPlatform"
    }

    fn network(&self) -> &str {
        "mock-network"
    }
}

/// Mock subname registrar returning `<name>.patreon.sui` or a fixed failure.
#[derive(Clone, Default)]
pub struct MockSubnames {
    name: Option<String>,
    requests: Arc<Mutex<usize>>,
}

impl MockSubnames {
    /// Registrar that always succeeds with `name`.
    pub fn returning(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            requests: Arc::default(),
        }
    }

    /// Registrar that always fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait]
impl SubnameRegistrar for MockSubnames {
    async fn create_subname(&self, _creator: &Address) -> Result<SubnameRegistration, ActionError> {
        *self.requests.lock().unwrap() += 1;
        let name = self
            .name
            .clone()
            .ok_or_else(|| ActionError::Sponsor("subname service unavailable".into()))?;
        Ok(SubnameRegistration {
            suins_name: format!("{}.patreon.sui", name),
            normalised_name: name,
            tx_digest: Some(TxDigest::new("mock-subname-digest")),
        })
    }
}
