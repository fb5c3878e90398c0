//! Publish pipeline: validate, pack, encrypt, upload, publish.
//!
//! Progress is broadcast on a `watch` channel so any number of observers
//! can follow the pipeline without polling it.
use std::fmt;
use std::sync::Arc;

use client_blockchain_core::{
    ActionError, BlobId, BlobStore, BlobStoreError, CreatorActions, KeyRelease, KeyReleaseError,
    LedgerTransport, NewPost, ObjectId, TransportError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::format::{FormatError, ImageUpload, PostMetadata, pack_images};
use super::validate::{ValidationError, validate_post};
use crate::model::{DecodeError, ServiceObject};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishStep {
    Idle,
    Validating,
    ReadingImages,
    EncryptingMetadata,
    UploadingMetadata,
    EncryptingData,
    UploadingData,
    PublishingTx,
    Done,
    Error,
}

impl PublishStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::ReadingImages => "reading-images",
            Self::EncryptingMetadata => "encrypting-metadata",
            Self::UploadingMetadata => "uploading-metadata",
            Self::EncryptingData => "encrypting-data",
            Self::UploadingData => "uploading-data",
            Self::PublishingTx => "publishing-tx",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishProgress {
    pub step: PublishStep,
    pub percent: u8,
    pub message: String,
}

impl PublishProgress {
    fn new(step: PublishStep, percent: u8, message: impl Into<String>) -> Self {
        Self {
            step,
            percent,
            message: message.into(),
        }
    }

    pub fn idle() -> Self {
        Self::new(PublishStep::Idle, 0, "")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Service object not found on chain")]
    ServiceNotFound,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encryption(#[from] KeyReleaseError),

    #[error(transparent)]
    Upload(#[from] BlobStoreError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// A post as written by its creator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub images: Vec<ImageUpload>,
    /// 0 publishes in the clear
    pub required_tier: u64,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_required_tier(mut self, tier: u64) -> Self {
        self.required_tier = tier;
        self
    }
}

pub struct Publisher {
    ledger: Arc<dyn LedgerTransport>,
    blobs: Arc<dyn BlobStore>,
    key_release: Arc<dyn KeyRelease>,
    actions: Arc<dyn CreatorActions>,
    progress: watch::Sender<PublishProgress>,
}

impl Publisher {
    pub fn new(
        ledger: Arc<dyn LedgerTransport>,
        blobs: Arc<dyn BlobStore>,
        key_release: Arc<dyn KeyRelease>,
        actions: Arc<dyn CreatorActions>,
    ) -> Self {
        let (progress, _) = watch::channel(PublishProgress::idle());
        Self {
            ledger,
            blobs,
            key_release,
            actions,
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PublishProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> PublishProgress {
        self.progress.borrow().clone()
    }

    pub fn reset(&self) {
        self.progress.send_replace(PublishProgress::idle());
    }

    fn report(&self, step: PublishStep, percent: u8, message: &str) {
        debug!("Publish step {} ({}%)", step, percent);
        self.progress
            .send_replace(PublishProgress::new(step, percent, message));
    }

    /// Run the pipeline and return the new post id.
    pub async fn publish(&self, service: &ObjectId, draft: &PostDraft) -> Result<u64, PublishError> {
        match self.run(service, draft).await {
            Ok(post_id) => {
                self.report(PublishStep::Done, 100, "Post published!");
                info!("Published post {} on {}", post_id, service);
                Ok(post_id)
            }
            Err(e) => {
                warn!("Publishing on {} failed: {}", service, e);
                self.report(PublishStep::Error, 0, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run(&self, service: &ObjectId, draft: &PostDraft) -> Result<u64, PublishError> {
        self.report(PublishStep::Validating, 5, "Validating post...");
        validate_post(&draft.title, &draft.text, &draft.images)?;

        self.report(PublishStep::ReadingImages, 15, "Processing images...");
        let (image_metas, data_blob) = pack_images(&draft.images)?;

        let object = self.ledger.get_object(service).await?;
        if !object.has_content() {
            return Err(PublishError::ServiceNotFound);
        }
        let post_id = ServiceObject::from_object(&object)?.next_post_id;

        self.report(PublishStep::EncryptingMetadata, 30, "Encrypting content...");
        let metadata = PostMetadata::new(draft.text.clone(), image_metas).to_bytes()?;

        let (metadata_blob_id, data_blob_id) = if draft.required_tier == 0 {
            self.report(PublishStep::UploadingMetadata, 50, "Uploading content...");
            let metadata_blob_id = self.blobs.store(metadata).await?;

            let data_blob_id = if data_blob.is_empty() {
                BlobId::new("")
            } else {
                self.report(PublishStep::UploadingData, 65, "Uploading images...");
                self.blobs.store(data_blob).await?
            };
            (metadata_blob_id, data_blob_id)
        } else {
            let sealed = self.key_release.encrypt(service, post_id, &metadata).await?;
            self.report(PublishStep::UploadingMetadata, 45, "Uploading encrypted content...");
            let metadata_blob_id = self.blobs.store(sealed).await?;

            let data_blob_id = if data_blob.is_empty() {
                BlobId::new("")
            } else {
                self.report(PublishStep::EncryptingData, 55, "Encrypting images...");
                let sealed = self.key_release.encrypt(service, post_id, &data_blob).await?;
                self.report(PublishStep::UploadingData, 70, "Uploading encrypted images...");
                self.blobs.store(sealed).await?
            };
            (metadata_blob_id, data_blob_id)
        };

        self.report(PublishStep::PublishingTx, 85, "Publishing on-chain...");
        let post = NewPost {
            title: draft.title.clone(),
            metadata_blob_id,
            data_blob_id,
            required_tier: draft.required_tier,
        };
        self.actions.publish_post(service, &post).await?;
        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::{MockActions, MockBlobStore, MockKeyRelease, MockLedger};
    use serde_json::json;

    struct Fixture {
        ledger: MockLedger,
        blobs: MockBlobStore,
        seal: MockKeyRelease,
        actions: MockActions,
        service: ObjectId,
    }

    impl Fixture {
        fn new() -> Self {
            let service = ObjectId::new("0x5e");
            let ledger = MockLedger::new();
            ledger.insert_object(
                &service,
                json!({ "creator": "0xa1", "name": "Alice", "tiers": [], "posts": [], "next_post_id": "4" }),
            );
            Self {
                ledger,
                blobs: MockBlobStore::new(),
                seal: MockKeyRelease::new(),
                actions: MockActions::new(),
                service,
            }
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

    #[tokio::test]
    async fn public_post_is_uploaded_in_the_clear() {
        let fixture = Fixture::new();
        let publisher = fixture.publisher();
        let draft = PostDraft::new("Hello", "world");

        let post_id = publisher.publish(&fixture.service, &draft).await.unwrap();

        assert_eq!(post_id, 4);
        assert_eq!(fixture.seal.encrypt_calls(), 0);
        assert_eq!(fixture.blobs.writes(), 1);
        let published = fixture.actions.published();
        assert_eq!(published[0].data_blob_id, BlobId::new(""));

        let stored = fixture.blobs.get(&published[0].metadata_blob_id).unwrap();
        assert_eq!(PostMetadata::from_bytes(&stored).unwrap().text, "world");
        assert_eq!(publisher.progress().step, PublishStep::Done);
        assert_eq!(publisher.progress().percent, 100);
    }

    #[tokio::test]
    async fn gated_post_encrypts_both_blobs_under_next_post_id() {
        let fixture = Fixture::new();
        let publisher = fixture.publisher();
        let draft = PostDraft::new("Sketches", "")
            .with_image(ImageUpload::new("a.png", "image/png", vec![0x89, b'P', b'N', b'G']))
            .with_required_tier(2);

        publisher.publish(&fixture.service, &draft).await.unwrap();

        assert_eq!(fixture.seal.encrypt_calls(), 2);
        assert_eq!(fixture.blobs.writes(), 2);
        let post = &fixture.actions.published()[0];
        assert_eq!(post.required_tier, 2);
        let sealed = fixture.blobs.get(&post.data_blob_id).unwrap();
        assert!(sealed.starts_with(b"MOCKSEAL"));
        assert_eq!(fixture.actions.calls(), vec!["publish_post:0x5e:2"]);
    }

    #[tokio::test]
    async fn progress_is_observable() {
        let fixture = Fixture::new();
        let publisher = fixture.publisher();
        let mut rx = publisher.subscribe();

        publisher
            .publish(&fixture.service, &PostDraft::new("t", "x"))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().step, PublishStep::Done);
    }

    #[tokio::test]
    async fn validation_failure_stops_before_any_upload() {
        let fixture = Fixture::new();
        let publisher = fixture.publisher();

        let err = publisher
            .publish(&fixture.service, &PostDraft::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Validation(_)));
        assert_eq!(fixture.blobs.writes(), 0);
        let progress = publisher.progress();
        assert_eq!(progress.step, PublishStep::Error);
        assert_eq!(progress.percent, 0);
        assert_eq!(
            progress.message,
            "Title is required. Post must contain text or at least one image"
        );
    }

    #[tokio::test]
    async fn missing_service_is_reported() {
        let fixture = Fixture::new();
        fixture.ledger.remove_object(&fixture.service);
        let err = fixture
            .publisher()
            .publish(&fixture.service, &PostDraft::new("t", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Service object not found on chain");
    }

    #[tokio::test]
    async fn rejected_transaction_surfaces_as_error() {
        let fixture = Fixture::new();
        fixture.actions.fail_with("MoveAbort: ENotCreator");
        let publisher = fixture.publisher();

        let err = publisher
            .publish(&fixture.service, &PostDraft::new("t", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Action(ActionError::Rejected(_))));
        assert_eq!(publisher.progress().step, PublishStep::Error);
    }
}
