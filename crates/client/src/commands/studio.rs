//! State-changing commands.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use client_blockchain_core::{BlobId, TierSpec};
use client_bootstrap::Platform;
use client_core::format::mist_to_sui;
use client_core::{ImageUpload, PostDraft, ProfileUpdate, sniff_image};

use super::parse_service;

const DAY_MS: u64 = 86_400_000;

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = sniff_image(&bytes).map_or("application/octet-stream", |kind| kind.mime_type());
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageUpload::new(file_name, mime_type, bytes))
}

#[derive(Parser)]
pub struct Register {
    #[arg(value_name = "NAME")]
    name: String,

    #[arg(value_name = "DESCRIPTION", default_value = "")]
    description: String,
}

impl Register {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let registration = platform
            .actions
            .create_profile(&self.name, &self.description)
            .await?;
        if registration.existing {
            println!("Already registered: {}", registration.service_id);
        } else {
            println!("Registered: {}", registration.service_id);
        }
        if let Some(name) = registration.suins_name {
            println!("Name: {}", name);
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct UpdateProfile {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    description: String,

    /// New avatar image, stored unencrypted
    #[arg(long, value_name = "FILE")]
    avatar: Option<PathBuf>,
}

impl UpdateProfile {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        let mut update = ProfileUpdate::new(self.name, self.description);
        if let Some(path) = &self.avatar {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            update = update.with_avatar(bytes);
        }
        let digest = platform.actions.update_profile(&service, update).await?;
        println!("Profile updated ({})", digest);
        Ok(())
    }
}

#[derive(Parser)]
pub struct AddTier {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "LEVEL")]
    tier_level: u64,

    #[arg(value_name = "NAME")]
    name: String,

    /// Price in MIST
    #[arg(value_name = "PRICE")]
    price_mist: u64,

    /// Subscription period in days
    #[arg(long, default_value_t = 30)]
    days: u64,
}

impl AddTier {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        let tier = TierSpec {
            tier_level: self.tier_level,
            name: self.name,
            price_mist: self.price_mist,
            duration_ms: self.days * DAY_MS,
        };
        platform.actions.add_tier(&service, &tier).await?;
        println!("Added tier {} at {} SUI", tier.tier_level, mist_to_sui(tier.price_mist));
        Ok(())
    }
}

#[derive(Parser)]
pub struct RemoveTier {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "LEVEL")]
    tier_level: u64,
}

impl RemoveTier {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        platform.actions.remove_tier(&service, self.tier_level).await?;
        println!("Removed tier {}", self.tier_level);
        Ok(())
    }
}

#[derive(Parser)]
pub struct Subscribe {
    /// Creator address or service object id
    #[arg(value_name = "CREATOR")]
    creator: String,

    #[arg(value_name = "LEVEL")]
    tier_level: u64,
}

impl Subscribe {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let creator = platform
            .reads
            .creator(&self.creator)
            .await?
            .with_context(|| format!("No live creator found for {}", self.creator))?;
        let tier = creator
            .tier(self.tier_level)
            .with_context(|| format!("{} has no tier {}", creator.name, self.tier_level))?;

        platform
            .actions
            .subscribe(&creator.service_id, tier.tier_level, tier.price_mist)
            .await?;
        println!(
            "Subscribed to {} ({}) for {} SUI",
            creator.name,
            tier.name,
            mist_to_sui(tier.price_mist)
        );
        Ok(())
    }
}

#[derive(Parser)]
pub struct Publish {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    text: String,

    /// Required tier, 0 for a public post
    #[arg(long, default_value_t = 0)]
    tier: u64,

    /// Attach an image (repeatable)
    #[arg(long = "image", value_name = "FILE")]
    images: Vec<PathBuf>,
}

impl Publish {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        let mut draft = PostDraft::new(self.title, self.text).with_required_tier(self.tier);
        for path in &self.images {
            draft = draft.with_image(read_image(path)?);
        }

        let mut progress = platform.actions.publish_progress();
        let reporter = tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let update = progress.borrow_and_update().clone();
                eprintln!("[{:>3}%] {}", update.percent, update.message);
            }
        });

        let result = platform.actions.publish_post(&service, &draft).await;
        reporter.abort();

        let post_id = result?;
        println!("Published post #{}", post_id);
        Ok(())
    }
}

#[derive(Parser)]
pub struct SetVisibility {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "POST_ID")]
    post_id: u64,

    /// Required tier, 0 for public
    #[arg(value_name = "TIER")]
    tier: u64,
}

impl SetVisibility {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        platform
            .actions
            .set_post_visibility(&service, self.post_id, self.tier)
            .await?;
        println!("Post #{} now requires tier {}", self.post_id, self.tier);
        Ok(())
    }
}

#[derive(Parser)]
pub struct DeletePost {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "POST_ID")]
    post_id: u64,
}

impl DeletePost {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        platform.actions.delete_post(&service, self.post_id).await?;
        println!("Deleted post #{}", self.post_id);
        Ok(())
    }
}

/// Re-points a post at blobs uploaded separately.
#[derive(Parser)]
pub struct UpdatePost {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "POST_ID")]
    post_id: u64,

    #[arg(long)]
    title: String,

    #[arg(long, value_name = "BLOB_ID")]
    metadata_blob: String,

    /// Omit for posts without images
    #[arg(long, value_name = "BLOB_ID", default_value = "")]
    data_blob: String,
}

impl UpdatePost {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        platform
            .actions
            .update_post(
                &service,
                self.post_id,
                &self.title,
                &BlobId::new(self.metadata_blob),
                &BlobId::new(self.data_blob),
            )
            .await?;
        println!("Updated post #{}", self.post_id);
        Ok(())
    }
}

#[derive(Parser)]
pub struct Withdraw {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,
}

impl Withdraw {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        let revenue = platform.reads.creator_revenue(&service).await;
        platform.actions.withdraw_funds(&service).await?;
        println!("Withdrew {} SUI", mist_to_sui(revenue));
        Ok(())
    }
}

#[derive(Parser)]
pub struct DeleteProfile {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,
}

impl DeleteProfile {
    pub async fn execute(self, platform: &Platform) -> Result<()> {
        let service = parse_service(&self.service)?;
        platform.actions.delete_profile(&service).await?;
        println!("Profile deleted");
        Ok(())
    }
}
