//! Subcommands of the `patreon` binary.
mod browse;
mod content;
mod studio;

use anyhow::{Context, Result};
use clap::Parser;
use client_blockchain_core::{Address, ObjectId};
use client_bootstrap::Platform;
use serde::Serialize;

pub use browse::{Creators, Latest, MySubscriptions, Posts, Revenue, Search, ShowCreator, Status};
pub use content::{Avatar, ReadPost};
pub use studio::{
    AddTier, DeletePost, DeleteProfile, Publish, Register, RemoveTier, SetVisibility, Subscribe,
    UpdatePost, UpdateProfile, Withdraw,
};

#[derive(Parser)]
pub enum Command {
    /// List every live creator
    Creators(Creators),

    /// Show one creator by address or service id
    Creator(ShowCreator),

    /// List a creator's posts
    Posts(Posts),

    /// Latest posts across all creators
    Latest(Latest),

    /// Search creators and posts
    Search(Search),

    /// Subscription status with a creator
    Status(Status),

    /// Active subscriptions of an address
    Subscriptions(MySubscriptions),

    /// Withdrawable revenue of a service
    Revenue(Revenue),

    /// Download and unlock a post
    Read(ReadPost),

    /// Download a creator's avatar
    Avatar(Avatar),

    /// Register as a creator
    Register(Register),

    /// Update profile name, bio and avatar
    UpdateProfile(UpdateProfile),

    /// Add a subscription tier
    AddTier(AddTier),

    /// Remove a subscription tier
    RemoveTier(RemoveTier),

    /// Subscribe to a creator's tier
    Subscribe(Subscribe),

    /// Publish a post
    Publish(Publish),

    /// Point a post at new blobs
    UpdatePost(UpdatePost),

    /// Change the tier a post requires
    SetVisibility(SetVisibility),

    /// Delete a post
    DeletePost(DeletePost),

    /// Withdraw subscription revenue
    Withdraw(Withdraw),

    /// Delete the creator profile
    DeleteProfile(DeleteProfile),
}

impl Command {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        match self {
            Command::Creators(cmd) => cmd.execute(platform, json).await,
            Command::Creator(cmd) => cmd.execute(platform, json).await,
            Command::Posts(cmd) => cmd.execute(platform, json).await,
            Command::Latest(cmd) => cmd.execute(platform, json).await,
            Command::Search(cmd) => cmd.execute(platform, json).await,
            Command::Status(cmd) => cmd.execute(platform, json).await,
            Command::Subscriptions(cmd) => cmd.execute(platform, json).await,
            Command::Revenue(cmd) => cmd.execute(platform, json).await,
            Command::Read(cmd) => cmd.execute(platform, json).await,
            Command::Avatar(cmd) => cmd.execute(platform, json).await,
            Command::Register(cmd) => cmd.execute(platform).await,
            Command::UpdateProfile(cmd) => cmd.execute(platform).await,
            Command::AddTier(cmd) => cmd.execute(platform).await,
            Command::RemoveTier(cmd) => cmd.execute(platform).await,
            Command::Subscribe(cmd) => cmd.execute(platform).await,
            Command::Publish(cmd) => cmd.execute(platform).await,
            Command::UpdatePost(cmd) => cmd.execute(platform).await,
            Command::SetVisibility(cmd) => cmd.execute(platform).await,
            Command::DeletePost(cmd) => cmd.execute(platform).await,
            Command::Withdraw(cmd) => cmd.execute(platform).await,
            Command::DeleteProfile(cmd) => cmd.execute(platform).await,
        }
    }
}

pub(crate) fn parse_service(raw: &str) -> Result<ObjectId> {
    ObjectId::parse(raw).with_context(|| format!("Invalid service id: {}", raw))
}

pub(crate) fn parse_address(raw: &str) -> Result<Address> {
    Address::parse(raw).with_context(|| format!("Invalid address: {}", raw))
}

/// The given address, or the signer's.
pub(crate) fn address_or_signer(platform: &Platform, raw: Option<&str>) -> Result<Address> {
    match raw {
        Some(raw) => parse_address(raw),
        None => platform
            .signer
            .address()
            .context("No address given and no wallet account configured"),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
