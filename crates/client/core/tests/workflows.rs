//! End-to-end client workflows over the in-memory platform.

use std::sync::Arc;

use client_blockchain_core::{
    Address, BlobId, KeyRelease, KeyReleaseError, MockActions, MockBlobStore, MockKeyRelease,
    MockLedger, MockSigner, ObjectId,
};
use client_core::{
    CachedDiscovery, ContentUnlocker, CoreConfig, Discovery, HandleSlot, HandleStore, ManualClock,
    Mutation, PostDraft, PostMetadata, Publisher, QueryCache, SessionManager, UnlockError,
};
use serde_json::{Value, json};

const ALICE: &str = "0x00000000000000000000000000000000000000000000000000000000000000a1";
const BOB: &str = "0x00000000000000000000000000000000000000000000000000000000000000b0";
const VIEWER: &str = "0x00000000000000000000000000000000000000000000000000000000000000c3";
const ALICE_SERVICE: &str = "0x0000000000000000000000000000000000000000000000000000000000005e01";
const ALICE_OLD_SERVICE: &str = "0x0000000000000000000000000000000000000000000000000000000000005e00";
const BOB_SERVICE: &str = "0x0000000000000000000000000000000000000000000000000000000000005e02";
const ALICE_TABLE: &str = "0x0000000000000000000000000000000000000000000000000000000000007ab1";

const NOW_MS: u64 = 1_700_000_000_000;

struct Platform {
    config: CoreConfig,
    ledger: MockLedger,
    blobs: MockBlobStore,
    seal: MockKeyRelease,
    signer: MockSigner,
    actions: MockActions,
    clock: Arc<ManualClock>,
}

impl Platform {
    fn new(seal: MockKeyRelease) -> Self {
        Self {
            config: CoreConfig::default(),
            ledger: MockLedger::new(),
            blobs: MockBlobStore::new(),
            seal,
            signer: MockSigner::new(Address::new(VIEWER)),
            actions: MockActions::new(),
            clock: Arc::new(ManualClock::new(NOW_MS)),
        }
    }

    fn service_type(&self) -> String {
        format!("{}::service::Service", self.config.package_id)
    }

    fn register(&self, creator: &str, tx: &str, service: &str, timestamp_ms: u64) {
        self.ledger.push_event(
            &self.config.event_type("CreatorRegistered"),
            tx,
            json!({ "creator": creator }),
            Some(timestamp_ms),
        );
        self.ledger
            .insert_created(tx, &ObjectId::new(service), &self.service_type());
    }

    fn delete(&self, creator: &str, tx: &str, service: &str, timestamp_ms: u64) {
        self.ledger.push_event(
            &self.config.event_type("CreatorDeleted"),
            tx,
            json!({ "creator": creator }),
            Some(timestamp_ms),
        );
        self.ledger.remove_object(&ObjectId::new(service));
    }

    fn announce_post(&self, creator: &str, post_id: u64, timestamp_ms: u64) {
        self.ledger.push_event(
            &self.config.event_type("PostPublished"),
            &format!("tx-post-{}-{}", creator, post_id),
            json!({ "creator": creator, "post_id": post_id.to_string() }),
            Some(timestamp_ms),
        );
    }

    fn store_service(&self, service: &str, creator: &str, name: &str, posts: Value, next_post_id: u64) {
        self.ledger.insert_object(
            &ObjectId::new(service),
            json!({
                "id": { "id": service },
                "creator": creator,
                "name": name,
                "description": format!("{} makes things", name),
                "avatar_blob_id": "",
                "tiers": [
                    { "tier_level": "1", "name": "Fan", "price": "1000", "duration_ms": "2592000000" },
                    { "tier_level": "2", "name": "Patron", "price": "5000", "duration_ms": "2592000000" }
                ],
                "posts": posts,
                "next_post_id": next_post_id.to_string(),
                "subscribers": { "id": { "id": ALICE_TABLE }, "size": "1" },
                "revenue": "6000",
                "suins_name": null
            }),
        );
    }

    fn discovery(&self) -> Discovery {
        Discovery::new(Arc::new(self.ledger.clone()), self.config.clone(), self.clock.clone())
    }

    fn unlocker(&self) -> ContentUnlocker {
        let sessions = Arc::new(SessionManager::new(
            Arc::new(self.signer.clone()),
            Arc::new(self.seal.clone()),
            self.config.package_id.clone(),
            self.config.session_ttl_min,
            self.clock.clone(),
        ));
        ContentUnlocker::new(
            Arc::new(self.blobs.clone()),
            Arc::new(self.seal.clone()),
            sessions,
            HandleStore::new(),
        )
    }

    fn publisher(&self) -> Publisher {
        Publisher::new(
            Arc::new(self.ledger.clone()),
            Arc::new(self.blobs.clone()),
            Arc::new(self.seal.clone()),
            Arc::new(self.actions.clone()),
        )
    }
}

fn post_json(post_id: u64, title: &str, metadata: &str, data: &str, tier: u64, created_at_ms: u64) -> Value {
    json!({
        "post_id": post_id.to_string(),
        "title": title,
        "metadata_blob_id": metadata,
        "data_blob_id": data,
        "required_tier": tier.to_string(),
        "created_at_ms": created_at_ms.to_string()
    })
}

#[tokio::test]
async fn public_post_unlocks_without_a_session() {
    let platform = Platform::new(MockKeyRelease::new());
    let service = ObjectId::new(ALICE_SERVICE);
    platform
        .blobs
        .insert("meta-0", PostMetadata::new("hello world", vec![]).to_bytes().unwrap());
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([post_json(0, "Hello", "meta-0", "", 0, 10)]), 1);

    let posts = platform.discovery().creator_posts(&service).await.unwrap();
    let unlocker = platform.unlocker();
    let slot = HandleSlot::new();
    let unlocked = unlocker.load_post(&slot, &service, &posts.posts[0]).await.unwrap();

    assert_eq!(unlocked.metadata.text, "hello world");
    assert!(!unlocked.decrypted);
    assert_eq!(platform.seal.decrypt_calls(), 0);
    assert_eq!(platform.signer.personal_signatures(), 0);
}

#[tokio::test]
async fn public_post_with_unknown_metadata_version_never_prompts() {
    let platform = Platform::new(MockKeyRelease::new().with_viewer_tier(1));
    let service = ObjectId::new(ALICE_SERVICE);
    platform
        .blobs
        .insert("meta-0", br#"{"version":2,"text":"newer format"}"#.to_vec());
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([post_json(0, "Hello", "meta-0", "", 0, 10)]), 1);

    let posts = platform.discovery().creator_posts(&service).await.unwrap();
    let unlocker = platform.unlocker();
    let slot = HandleSlot::new();
    let err = unlocker.load_post(&slot, &service, &posts.posts[0]).await.unwrap_err();

    assert!(matches!(err, UnlockError::Format(_)));
    assert_eq!(platform.signer.personal_signatures(), 0);
    assert_eq!(platform.seal.decrypt_calls(), 0);
    assert!(unlocker.sessions().current().is_none());
    assert!(slot.is_empty());
}

#[tokio::test]
async fn insufficient_tier_is_denied_and_installs_nothing() {
    let service = ObjectId::new(ALICE_SERVICE);
    let seal = MockKeyRelease::new()
        .with_viewer_tier(1)
        .with_required_tier(&service, 3, 2);
    let platform = Platform::new(seal);
    let sealed = platform
        .seal
        .encrypt(&service, 3, &PostMetadata::new("for patrons", vec![]).to_bytes().unwrap())
        .await
        .unwrap();
    platform.blobs.insert("meta-3", sealed);
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([post_json(3, "Gated", "meta-3", "", 2, 10)]), 4);

    let posts = platform.discovery().creator_posts(&service).await.unwrap();
    let unlocker = platform.unlocker();
    let slot = HandleSlot::new();
    let err = unlocker.load_post(&slot, &service, &posts.posts[0]).await.unwrap_err();

    assert!(matches!(err, UnlockError::KeyRelease(KeyReleaseError::AccessDenied(_))));
    assert_eq!(err.user_message(), "You need an active subscription to view this content");
    assert!(slot.is_empty());
    assert_eq!(unlocker.handles().live_count(), 0);
    assert_eq!(platform.signer.personal_signatures(), 1);
}

#[tokio::test]
async fn reregistered_creator_stays_live() {
    let platform = Platform::new(MockKeyRelease::new());
    platform.register(ALICE, "tx-a1", ALICE_OLD_SERVICE, 1);
    platform.store_service(ALICE_OLD_SERVICE, ALICE, "Alice", json!([]), 0);
    platform.delete(ALICE, "tx-d1", ALICE_OLD_SERVICE, 2);
    platform.register(ALICE, "tx-a2", ALICE_SERVICE, 3);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([]), 0);

    let found = platform.discovery().find_active_service_id(ALICE).await.unwrap();

    assert_eq!(found, Some(ObjectId::new(ALICE_SERVICE)));
}

#[tokio::test]
async fn deleted_creator_disappears() {
    let platform = Platform::new(MockKeyRelease::new());
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([]), 0);
    platform.register(BOB, "tx-b", BOB_SERVICE, 2);
    platform.store_service(BOB_SERVICE, BOB, "Bob", json!([]), 0);
    platform.delete(ALICE, "tx-d", ALICE_SERVICE, 3);

    let discovery = platform.discovery();
    assert_eq!(discovery.find_active_service_id(ALICE).await.unwrap(), None);

    let creators = discovery.fetch_all_creators().await.unwrap();
    assert_eq!(creators.len(), 1);
    assert_eq!(creators[0].name, "Bob");
}

#[tokio::test]
async fn published_post_round_trips_through_the_ledger() {
    let service = ObjectId::new(ALICE_SERVICE);
    let platform = Platform::new(MockKeyRelease::new().with_viewer_tier(2));
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([]), 0);

    let draft = PostDraft::new("Members only", "secret sketches").with_required_tier(2);
    let post_id = platform.publisher().publish(&service, &draft).await.unwrap();
    assert_eq!(post_id, 0);

    let published = platform.actions.published();
    let post = &published[0];
    assert!(
        platform
            .blobs
            .get(&post.metadata_blob_id)
            .unwrap()
            .starts_with(b"MOCKSEAL")
    );
    platform.store_service(
        ALICE_SERVICE,
        ALICE,
        "Alice",
        json!([post_json(0, &post.title, post.metadata_blob_id.as_str(), post.data_blob_id.as_str(), 2, 50)]),
        1,
    );
    platform.announce_post(ALICE, 0, 50);

    let latest = platform.discovery().latest_posts(12, false).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].creator_name, "Alice");
    assert_eq!(latest[0].post.data_blob_id, BlobId::new(""));

    let slot = HandleSlot::new();
    let unlocked = platform
        .unlocker()
        .load_post(&slot, &service, &latest[0].post)
        .await
        .unwrap();
    assert!(unlocked.decrypted);
    assert_eq!(unlocked.metadata.text, "secret sketches");

    let public_only = platform.discovery().latest_posts(12, true).await.unwrap();
    assert!(public_only.is_empty());
}

#[tokio::test]
async fn search_ignores_case_and_accents() {
    let platform = Platform::new(MockKeyRelease::new());
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(
        ALICE_SERVICE,
        ALICE,
        "Zoë",
        json!([post_json(0, "Café sketches", "m0", "", 0, 10)]),
        1,
    );
    platform.register(BOB, "tx-b", BOB_SERVICE, 2);
    platform.store_service(BOB_SERVICE, BOB, "Bob", json!([]), 0);
    platform.announce_post(ALICE, 0, 10);

    let results = platform.discovery().search("ZOE").await.unwrap();
    assert_eq!(results.creators.len(), 1);
    assert_eq!(results.creators[0].name, "Zoë");
    assert_eq!(results.posts.len(), 1);

    let results = platform.discovery().search("cafe").await.unwrap();
    assert!(results.creators.is_empty());
    assert_eq!(results.posts[0].post.title, "Café sketches");

    let everything = platform.discovery().search("  ").await.unwrap();
    assert_eq!(everything.creators.len(), 2);
}

#[tokio::test]
async fn active_subscription_is_listed() {
    let platform = Platform::new(MockKeyRelease::new());
    let service = ObjectId::new(ALICE_SERVICE);
    let viewer = Address::new(VIEWER);
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([]), 0);
    platform.ledger.insert_dynamic_field(
        &ObjectId::new(ALICE_TABLE),
        &viewer,
        json!({ "name": VIEWER, "value": { "tier": "2", "expires_at_ms": (NOW_MS + 1_000).to_string() } }),
    );

    let discovery = platform.discovery();
    let status = discovery.subscription_status(&service, &viewer).await;
    assert!(status.is_subscribed);
    assert_eq!(status.tier_level, 2);

    let mine = discovery.my_subscriptions(&viewer).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].creator.name, "Alice");

    platform.clock.advance(2_000);
    assert!(!discovery.subscription_status(&service, &viewer).await.is_subscribed);
    assert!(discovery.my_subscriptions(&viewer).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cached_reads_are_refreshed_after_mutations() {
    let platform = Platform::new(MockKeyRelease::new());
    platform.register(ALICE, "tx-a", ALICE_SERVICE, 1);
    platform.store_service(ALICE_SERVICE, ALICE, "Alice", json!([]), 0);
    let cache = Arc::new(QueryCache::new());
    let cached = CachedDiscovery::new(platform.discovery(), cache.clone());

    assert_eq!(cached.all_creators().await.unwrap().len(), 1);
    let queries = platform.ledger.event_queries();
    assert_eq!(cached.all_creators().await.unwrap().len(), 1);
    assert_eq!(platform.ledger.event_queries(), queries);

    platform.register(BOB, "tx-b", BOB_SERVICE, 2);
    platform.store_service(BOB_SERVICE, BOB, "Bob", json!([]), 0);
    assert_eq!(cached.all_creators().await.unwrap().len(), 1);

    cache.apply(Mutation::CreateProfile);
    assert_eq!(cached.all_creators().await.unwrap().len(), 2);
}
