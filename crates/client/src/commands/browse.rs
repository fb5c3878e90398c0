//! Read-only commands over cached discovery.
use anyhow::{Context, Result};
use clap::Parser;
use client_bootstrap::Platform;
use client_core::format::{format_date, format_duration, mist_to_sui, short_address};
use client_core::{Creator, LatestPost};

use super::{address_or_signer, parse_service, print_json};

fn print_creator_line(creator: &Creator) {
    let name = creator.suins_name.as_deref().unwrap_or(&creator.name);
    println!(
        "{:<24} {}  {} subscribers, {} posts  [{}]",
        name,
        short_address(&creator.address),
        creator.total_subscribers,
        creator.total_content,
        creator.service_id
    );
}

fn print_latest_line(latest: &LatestPost) {
    let gate = if latest.post.is_public() {
        "public".to_string()
    } else {
        format!("tier {}", latest.post.required_tier)
    };
    println!(
        "#{:<4} {:<40} by {:<20} {:<8} {}",
        latest.post.post_id,
        latest.post.title,
        latest.creator_name,
        gate,
        format_date(latest.post.created_at_ms)
    );
}

#[derive(Parser)]
pub struct Creators {}

impl Creators {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let creators = platform.reads.all_creators().await?;
        if json {
            return print_json(&creators);
        }
        if creators.is_empty() {
            println!("No creators yet");
        }
        creators.iter().for_each(print_creator_line);
        Ok(())
    }
}

#[derive(Parser)]
pub struct ShowCreator {
    /// Creator address or service object id
    #[arg(value_name = "CREATOR")]
    creator: String,
}

impl ShowCreator {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let creator = platform
            .reads
            .creator(&self.creator)
            .await?
            .with_context(|| format!("No live creator found for {}", self.creator))?;
        if json {
            return print_json(&creator);
        }

        print_creator_line(&creator);
        if !creator.bio.is_empty() {
            println!("\n{}\n", creator.bio);
        }
        for tier in &creator.tiers {
            println!(
                "  tier {}  {:<16} {} SUI / {}",
                tier.tier_level,
                tier.name,
                mist_to_sui(tier.price_mist),
                format_duration(tier.duration_ms)
            );
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct Posts {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,
}

impl Posts {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let service = parse_service(&self.service)?;
        let posts = platform.reads.creator_posts(&service).await?;
        if json {
            return print_json(&posts);
        }
        for post in &posts.posts {
            println!(
                "#{:<4} {:<40} tier {:<3} {}",
                post.post_id,
                post.title,
                post.required_tier,
                format_date(post.created_at_ms)
            );
        }
        println!("next post id: {}", posts.next_post_id);
        Ok(())
    }
}

#[derive(Parser)]
pub struct Latest {
    /// Number of posts
    #[arg(short, long, default_value_t = 12)]
    limit: usize,

    /// Include gated posts
    #[arg(short, long)]
    all: bool,
}

impl Latest {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let posts = platform.reads.latest_posts(self.limit, !self.all).await?;
        if json {
            return print_json(&posts);
        }
        posts.iter().for_each(print_latest_line);
        Ok(())
    }
}

#[derive(Parser)]
pub struct Search {
    #[arg(value_name = "QUERY")]
    query: String,
}

impl Search {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let results = platform.reads.search(&self.query).await?;
        if json {
            return print_json(&results);
        }
        println!("Creators ({})", results.creators.len());
        results.creators.iter().for_each(print_creator_line);
        println!("\nPosts ({})", results.posts.len());
        results.posts.iter().for_each(print_latest_line);
        Ok(())
    }
}

#[derive(Parser)]
pub struct Status {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,

    /// Subscriber address (defaults to the signer)
    #[arg(short, long)]
    address: Option<String>,
}

impl Status {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let service = parse_service(&self.service)?;
        let subscriber = address_or_signer(platform, self.address.as_deref())?;
        let status = platform.reads.subscription_status(&service, &subscriber).await;
        if json {
            return print_json(&status);
        }
        if status.is_subscribed {
            println!(
                "Subscribed at tier {} until {}",
                status.tier_level,
                format_date(status.expires_at_ms)
            );
        } else {
            println!("Not subscribed");
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct MySubscriptions {
    /// Subscriber address (defaults to the signer)
    #[arg(short, long)]
    address: Option<String>,
}

impl MySubscriptions {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let subscriber = address_or_signer(platform, self.address.as_deref())?;
        let subscriptions = platform.reads.my_subscriptions(&subscriber).await?;
        if json {
            return print_json(&subscriptions);
        }
        for subscription in &subscriptions {
            println!(
                "{:<24} tier {}  until {}",
                subscription.creator.name,
                subscription.tier_level,
                format_date(subscription.expires_at_ms)
            );
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct Revenue {
    /// Service object id
    #[arg(value_name = "SERVICE")]
    service: String,
}

impl Revenue {
    pub async fn execute(self, platform: &Platform, json: bool) -> Result<()> {
        let service = parse_service(&self.service)?;
        let revenue = platform.reads.creator_revenue(&service).await;
        if json {
            return print_json(&revenue);
        }
        println!("{} SUI", mist_to_sui(revenue));
        Ok(())
    }
}
