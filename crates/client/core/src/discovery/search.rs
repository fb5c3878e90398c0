//! Substring search over creators and recent posts.
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::{Discovery, DiscoveryError, SEARCH_POST_LIMIT};
use crate::model::{Creator, LatestPost};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub creators: Vec<Creator>,
    pub posts: Vec<LatestPost>,
}

/// Lowercase and strip diacritics, so `Élodie` matches `elodie`.
pub fn normalize_search_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn matches(text: Option<&str>, needle: &str) -> bool {
    match text {
        Some(text) if !text.is_empty() => normalize_search_text(text).contains(needle),
        _ => false,
    }
}

impl SearchResults {
    /// Filter already loaded creators and posts. An empty query keeps everything.
    ///
    /// Creators match on name, bio or name-service name; posts on title or
    /// creator name.
    pub fn filter(query: &str, creators: Vec<Creator>, posts: Vec<LatestPost>) -> Self {
        let query = query.trim();
        if query.is_empty() {
            return Self { creators, posts };
        }
        let needle = normalize_search_text(query);

        let creators = creators
            .into_iter()
            .filter(|c| {
                matches(Some(&c.name), &needle)
                    || matches(Some(&c.bio), &needle)
                    || matches(c.suins_name.as_deref(), &needle)
            })
            .collect();
        let posts = posts
            .into_iter()
            .filter(|p| matches(Some(&p.post.title), &needle) || matches(Some(&p.creator_name), &needle))
            .collect();

        Self { creators, posts }
    }
}

impl Discovery {
    /// Search creators and the latest posts of every tier.
    pub async fn search(&self, query: &str) -> Result<SearchResults, DiscoveryError> {
        let (creators, posts) = tokio::try_join!(
            self.fetch_all_creators(),
            self.latest_posts(SEARCH_POST_LIMIT, false),
        )?;
        Ok(SearchResults::filter(query, creators, posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::{BlobId, ObjectId};

    use crate::model::OnChainPost;

    fn creator(name: &str, bio: &str, suins: Option<&str>) -> Creator {
        Creator {
            address: "0xa".into(),
            service_id: ObjectId::new("0x1"),
            name: name.into(),
            bio: bio.into(),
            avatar_blob_id: None,
            banner_blob_id: None,
            suins_name: suins.map(str::to_string),
            total_subscribers: 0,
            total_content: 0,
            tiers: Vec::new(),
        }
    }

    fn post(title: &str, creator_name: &str) -> LatestPost {
        LatestPost {
            creator_address: "0xa".into(),
            creator_name: creator_name.into(),
            service_id: ObjectId::new("0x1"),
            post: OnChainPost {
                post_id: 0,
                title: title.into(),
                metadata_blob_id: BlobId::new("m"),
                data_blob_id: BlobId::new(""),
                required_tier: 0,
                created_at_ms: 0,
            },
        }
    }

    #[test]
    fn normalization_strips_case_and_accents() {
        assert_eq!(normalize_search_text("Élodie Café"), "elodie cafe");
        assert_eq!(normalize_search_text("ÅNGSTRÖM"), "angstrom");
    }

    #[test]
    fn empty_query_returns_everything() {
        let results = SearchResults::filter("   ", vec![creator("A", "", None)], vec![post("t", "A")]);
        assert_eq!(results.creators.len(), 1);
        assert_eq!(results.posts.len(), 1);
    }

    #[test]
    fn creators_match_name_bio_and_suins() {
        let creators = vec![
            creator("Élodie", "painter", None),
            creator("Bob", "Writes about cafés", None),
            creator("Carol", "", Some("carol.patreon.sui")),
            creator("Dan", "", None),
        ];

        let by_name = SearchResults::filter("elodie", creators.clone(), Vec::new());
        assert_eq!(by_name.creators[0].name, "Élodie");

        let by_bio = SearchResults::filter("CAFE", creators.clone(), Vec::new());
        assert_eq!(by_bio.creators.len(), 1);
        assert_eq!(by_bio.creators[0].name, "Bob");

        let by_suins = SearchResults::filter("patreon.sui", creators, Vec::new());
        assert_eq!(by_suins.creators.len(), 1);
        assert_eq!(by_suins.creators[0].name, "Carol");
    }

    #[test]
    fn posts_match_title_or_creator_name() {
        let posts = vec![post("Winter sketches", "Alice"), post("Notes", "Zoë")];
        let results = SearchResults::filter("zoe", Vec::new(), posts.clone());
        assert_eq!(results.posts.len(), 1);
        assert_eq!(results.posts[0].post.title, "Notes");

        let results = SearchResults::filter("sketch", Vec::new(), posts);
        assert_eq!(results.posts[0].creator_name, "Alice");
    }
}
