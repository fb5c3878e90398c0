//! Commands that download and unlock stored content.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use client_bootstrap::Platform;
use client_core::{HandleSlot, ProfileImage, UnlockError};

use super::{parse_service, print_json};

fn write_handle(platform: &Platform, handle_id: u64, path: &Path) -> Result<()> {
    let bytes = platform
        .unlocker
        .handles()
        .resolve(handle_id)
        .context("Content handle was released")?;
    std::fs::write(path, &bytes[..]).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Surface the display wording of unlock failures.
fn unlock_failed(e: UnlockError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

#[derive(Parser)]
pub struct ReadPost {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    #[arg(value_name = "POST_ID")]
    post_id: u64,

    /// Directory to write images to
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,
}

impl ReadPost {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let service = parse_service(&self.service)?;
        let posts = platform.reads.creator_posts(&service).await?;
        let post = posts
            .posts
            .iter()
            .find(|post| post.post_id == self.post_id)
            .with_context(|| format!("Post {} not found on {}", self.post_id, service))?;

        let slot = HandleSlot::new();
        let unlocked = platform
            .unlocker
            .load_post(&slot, &service, post)
            .await
            .map_err(unlock_failed)?;

        if let Some(dir) = &self.out {
            std::fs::create_dir_all(dir)?;
            for image in &unlocked.images {
                let path = dir.join(format!("{}-{}", image.meta.index, image.meta.file_name));
                write_handle(platform, image.handle_id, &path)?;
                tracing::info!("Wrote {}", path.display());
            }
        }

        if json {
            print_json(&unlocked)?;
        } else {
            println!("{}\n", post.title);
            println!("{}", unlocked.metadata.text);
            if !unlocked.images.is_empty() && self.out.is_none() {
                println!("\n{} images (use --out to save them)", unlocked.images.len());
            }
        }
        slot.close();
        Ok(())
    }
}

#[derive(Parser)]
pub struct Avatar {
    /// Creator address or service object id
    #[arg(value_name = "CREATOR")]
    creator: String,

    /// File to write the image to
    #[arg(short, long, value_name = "FILE")]
    out: PathBuf,
}

impl Avatar {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let creator = platform
            .reads
            .creator(&self.creator)
            .await?
            .with_context(|| format!("No live creator found for {}", self.creator))?;

        let slot = HandleSlot::new();
        let image = platform
            .unlocker
            .load_profile_image(&slot, creator.avatar_blob_id.as_deref(), Some(&creator.service_id))
            .await
            .map_err(unlock_failed)?;

        match &image {
            ProfileImage::None => bail!("{} has no avatar", creator.name),
            ProfileImage::Url(url) => println!("{}", url),
            ProfileImage::Local { handle_id, mime_type, .. } => {
                write_handle(platform, *handle_id, &self.out)?;
                if !json {
                    println!("Wrote {} ({})", self.out.display(), mime_type);
                }
            }
        }
        if json {
            print_json(&image)?;
        }
        slot.close();
        Ok(())
    }
}
