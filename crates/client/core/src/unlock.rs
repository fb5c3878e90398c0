//! Turning stored locators into renderable local handles.
//!
//! Every load runs against a [`HandleSlot`]: starting a load releases what
//! the slot held, and a load that was superseded while it was in flight
//! releases its own result instead of installing it. Decryption is only
//! attempted when the downloaded bytes are not already plaintext, so public
//! content never prompts for a session signature.
use std::sync::Arc;

use client_blockchain_core::{BlobId, BlobStore, BlobStoreError, KeyRelease, KeyReleaseError, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::handle::{Generation, HandleSlot, HandleStore, LocalHandle};
use crate::locator::Locator;
use crate::model::OnChainPost;
use crate::post::{FormatError, PostImage, PostMetadata, unpack_images};
use crate::remap;
use crate::session::{SessionError, SessionManager};
use crate::sniff::sniff_image;

/// Content sub-identifier of profile assets (avatar, banner).
pub const PROFILE_CONTENT_ID: u64 = 0;

/// MIME type assumed for decrypted profile images that do not sniff.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    #[error(transparent)]
    Download(#[from] BlobStoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    KeyRelease(#[from] KeyReleaseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Load superseded by a newer request")]
    Superseded,
}

impl UnlockError {
    /// Message shown next to the content.
    pub fn user_message(&self) -> String {
        match self {
            UnlockError::KeyRelease(KeyReleaseError::AccessDenied(_)) => remap::NO_ACCESS_MESSAGE.to_string(),
            other => remap::decrypt_error_message(&other.to_string()),
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, UnlockError::KeyRelease(KeyReleaseError::AccessDenied(_)))
    }
}

/// Result of resolving a profile image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileImage {
    /// No image set.
    None,
    /// Renderable as-is.
    Url(String),
    /// Bytes registered locally.
    Local { handle_id: u64, uri: String, mime_type: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedImage {
    pub meta: PostImage,
    pub handle_id: u64,
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedPost {
    pub metadata: PostMetadata,
    pub images: Vec<UnlockedImage>,
    /// Whether key release was needed
    pub decrypted: bool,
}

pub struct ContentUnlocker {
    blobs: Arc<dyn BlobStore>,
    key_release: Arc<dyn KeyRelease>,
    sessions: Arc<SessionManager>,
    handles: HandleStore,
}

impl ContentUnlocker {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        key_release: Arc<dyn KeyRelease>,
        sessions: Arc<SessionManager>,
        handles: HandleStore,
    ) -> Self {
        Self {
            blobs,
            key_release,
            sessions,
            handles,
        }
    }

    pub fn handles(&self) -> &HandleStore {
        &self.handles
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    async fn decrypt(&self, service: &ObjectId, content_id: u64, ciphertext: &[u8]) -> Result<Vec<u8>, UnlockError> {
        let credential = self.sessions.credential().await?;
        let plaintext = self
            .key_release
            .decrypt(&credential, service, content_id, ciphertext)
            .await?;
        Ok(plaintext)
    }

    fn install(&self, slot: &HandleSlot, generation: Generation, handles: Vec<LocalHandle>) -> Result<(), UnlockError> {
        if slot.install(generation, handles) {
            Ok(())
        } else {
            debug!("Discarding superseded load");
            Err(UnlockError::Superseded)
        }
    }

    /// Resolve an avatar or banner locator.
    ///
    /// Plaintext images are registered directly; anything else is decrypted
    /// as profile content of `service`. Without a service a blob cannot be
    /// decrypted and resolves to [`ProfileImage::None`].
    pub async fn load_profile_image(
        &self,
        slot: &HandleSlot,
        locator: Option<&str>,
        service: Option<&ObjectId>,
    ) -> Result<ProfileImage, UnlockError> {
        let generation = slot.begin();
        let blob_id = match Locator::classify(locator) {
            Locator::Empty => return Ok(ProfileImage::None),
            Locator::Url(url) => return Ok(ProfileImage::Url(url)),
            Locator::Blob(blob_id) => blob_id,
        };
        let Some(service) = service else {
            return Ok(ProfileImage::None);
        };

        let bytes = self.blobs.read(&blob_id).await?;
        let (bytes, mime_type) = match sniff_image(&bytes) {
            Some(kind) => (bytes, kind.mime_type()),
            None => {
                debug!("Profile blob {} is encrypted", blob_id);
                let plain = self.decrypt(service, PROFILE_CONTENT_ID, &bytes).await?;
                let mime_type = sniff_image(&plain).map_or(FALLBACK_IMAGE_MIME, |kind| kind.mime_type());
                (plain, mime_type)
            }
        };

        let handle = self.handles.create(bytes, mime_type);
        let image = ProfileImage::Local {
            handle_id: handle.id(),
            uri: handle.uri(),
            mime_type: mime_type.to_string(),
        };
        self.install(slot, generation, vec![handle])?;
        Ok(image)
    }

    /// Download and, when needed, decrypt a post.
    ///
    /// Metadata that already parses as an envelope is plaintext, whatever
    /// tier the post now requires; its image blob is then plaintext too.
    /// Public posts never go through key release: unreadable metadata is a
    /// format error.
    pub async fn load_post(
        &self,
        slot: &HandleSlot,
        service: &ObjectId,
        post: &OnChainPost,
    ) -> Result<UnlockedPost, UnlockError> {
        let generation = slot.begin();
        match self.read_post(slot, generation, service, post).await {
            Ok(unlocked) => Ok(unlocked),
            Err(e) => {
                warn!("Unlocking post {} of {} failed: {}", post.post_id, service, e);
                Err(e)
            }
        }
    }

    async fn read_post(
        &self,
        slot: &HandleSlot,
        generation: Generation,
        service: &ObjectId,
        post: &OnChainPost,
    ) -> Result<UnlockedPost, UnlockError> {
        let raw_metadata = self.blobs.read(&post.metadata_blob_id).await?;
        let (metadata, decrypted) = match PostMetadata::from_bytes(&raw_metadata) {
            Ok(metadata) => (metadata, false),
            // Public posts are stored in the clear and never go through key release.
            Err(e) if post.is_public() => return Err(e.into()),
            Err(_) => {
                let plain = self.decrypt(service, post.post_id, &raw_metadata).await?;
                (PostMetadata::from_bytes(&plain)?, true)
            }
        };

        let packed = if post.has_images() {
            let raw = self.read_blob(&post.data_blob_id).await?;
            let data = if decrypted {
                self.decrypt(service, post.post_id, &raw).await?
            } else {
                raw
            };
            unpack_images(&data)?
        } else {
            Vec::new()
        };

        let handles: Vec<LocalHandle> = packed
            .iter()
            .map(|image| self.handles.create(image.data.clone(), &image.meta.mime_type))
            .collect();
        let images = packed
            .into_iter()
            .zip(&handles)
            .map(|(image, handle)| UnlockedImage {
                meta: image.meta,
                handle_id: handle.id(),
                uri: handle.uri(),
            })
            .collect();
        self.install(slot, generation, handles)?;

        Ok(UnlockedPost {
            metadata,
            images,
            decrypted,
        })
    }

    async fn read_blob(&self, blob_id: &BlobId) -> Result<Vec<u8>, UnlockError> {
        Ok(self.blobs.read(blob_id).await?)
    }
}
