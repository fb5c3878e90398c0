//! Typed view of the on-chain `Service` object.
use client_blockchain_core::{BlobId, ObjectData, ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode::{
    DecodeError, array, as_u64, balance, optional_string, required, string, struct_fields, u64_field,
    u64_or_default, uid,
};

/// Subscription tier offered by a creator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub tier_level: u64,
    pub name: String,
    pub price_mist: u64,
    pub duration_ms: u64,
}

/// Post reference as stored in the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainPost {
    pub post_id: u64,
    pub title: String,
    pub metadata_blob_id: BlobId,
    /// Empty when the post has no images
    pub data_blob_id: BlobId,
    /// 0 = public
    pub required_tier: u64,
    pub created_at_ms: u64,
}

impl OnChainPost {
    pub fn is_public(&self) -> bool {
        self.required_tier == 0
    }

    pub fn has_images(&self) -> bool {
        !self.data_blob_id.is_empty()
    }
}

/// The `subscribers: Table<address, Subscription>` handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribersTable {
    pub table_id: ObjectId,
    /// Entry count, when the node reports it
    pub size: Option<u64>,
}

/// A creator's service object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceObject {
    pub id: ObjectId,
    pub creator: String,
    pub name: String,
    pub description: String,
    pub avatar_blob_id: Option<String>,
    pub banner_blob_id: Option<String>,
    pub tiers: Vec<Tier>,
    pub posts: Vec<OnChainPost>,
    pub next_post_id: u64,
    pub subscribers: Option<SubscribersTable>,
    pub revenue_mist: u64,
    pub suins_name: Option<String>,
}

impl ServiceObject {
    /// Decode from a ledger read. Objects without content are rejected.
    pub fn from_object(object: &ObjectData) -> Result<Self, DecodeError> {
        let fields = object
            .fields
            .as_ref()
            .ok_or_else(|| DecodeError::NoContent(object.object_id.to_string()))?;
        Self::from_json(object.object_id.clone(), fields)
    }

    pub fn from_json(id: ObjectId, value: &Value) -> Result<Self, DecodeError> {
        let fields = struct_fields(value, "Service")?;

        let tiers = array(fields, "tiers")?
            .iter()
            .map(decode_tier)
            .collect::<Result<Vec<_>, _>>()?;

        let posts = array(fields, "posts")?
            .iter()
            .map(decode_post)
            .collect::<Result<Vec<_>, _>>()?;

        let subscribers = match fields.get("subscribers") {
            None | Some(Value::Null) => None,
            Some(table) => Some(decode_table(table)?),
        };

        let revenue_mist = match fields.get("revenue") {
            None | Some(Value::Null) => 0,
            Some(value) => balance(value, "revenue")?,
        };

        Ok(Self {
            id,
            creator: string(fields, "creator")?,
            name: string(fields, "name")?,
            description: optional_string(fields, "description")?.unwrap_or_default(),
            avatar_blob_id: optional_string(fields, "avatar_blob_id")?.filter(|s| !s.is_empty()),
            banner_blob_id: optional_string(fields, "banner_blob_id")?.filter(|s| !s.is_empty()),
            tiers,
            posts,
            next_post_id: u64_or_default(fields, "next_post_id")?,
            subscribers,
            revenue_mist,
            suins_name: optional_string(fields, "suins_name")?.filter(|s| !s.is_empty()),
        })
    }

    pub fn post(&self, post_id: u64) -> Option<&OnChainPost> {
        self.posts.iter().find(|post| post.post_id == post_id)
    }

    pub fn tier(&self, tier_level: u64) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.tier_level == tier_level)
    }

    /// Posts newest first.
    pub fn posts_newest_first(&self) -> Vec<OnChainPost> {
        let mut posts = self.posts.clone();
        posts.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        posts
    }
}

fn decode_tier(value: &Value) -> Result<Tier, DecodeError> {
    let fields = struct_fields(value, "tiers")?;
    Ok(Tier {
        tier_level: u64_field(fields, "tier_level")?,
        name: optional_string(fields, "name")?.unwrap_or_default(),
        price_mist: u64_or_default(fields, "price")?,
        duration_ms: u64_or_default(fields, "duration_ms")?,
    })
}

fn decode_post(value: &Value) -> Result<OnChainPost, DecodeError> {
    let fields = struct_fields(value, "posts")?;
    Ok(OnChainPost {
        post_id: u64_field(fields, "post_id")?,
        title: optional_string(fields, "title")?.unwrap_or_default(),
        metadata_blob_id: BlobId::new(string(fields, "metadata_blob_id")?),
        data_blob_id: BlobId::new(optional_string(fields, "data_blob_id")?.unwrap_or_default()),
        required_tier: u64_or_default(fields, "required_tier")?,
        created_at_ms: u64_or_default(fields, "created_at_ms")?,
    })
}

fn decode_table(value: &Value) -> Result<SubscribersTable, DecodeError> {
    let fields = struct_fields(value, "subscribers")?;
    let size = match fields.get("size") {
        None | Some(Value::Null) => None,
        Some(size) => Some(as_u64(size, "size")?),
    };
    Ok(SubscribersTable {
        table_id: ObjectId::new(uid(required(fields, "id")?, "subscribers.id")?),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested_service() -> Value {
        json!({
            "type": "0xpkg::service::Service",
            "fields": {
                "id": { "id": "0x5e" },
                "creator": "0xa1",
                "name": "Alice",
                "description": "Watercolours",
                "avatar_blob_id": "avatar-blob",
                "tiers": [
                    { "type": "0xpkg::service::Tier", "fields": { "tier_level": "1", "name": "Fan", "price": "1000", "duration_ms": "2592000000" } },
                    { "tier_level": 2, "name": "Patron", "price": 5000, "duration_ms": 2592000000u64 }
                ],
                "posts": [
                    { "fields": { "post_id": "0", "title": "Hello", "metadata_blob_id": "m0", "data_blob_id": "", "required_tier": "0", "created_at_ms": "100" } },
                    { "fields": { "post_id": "1", "title": "Sketches", "metadata_blob_id": "m1", "data_blob_id": "d1", "required_tier": "2", "created_at_ms": "200" } }
                ],
                "next_post_id": "2",
                "subscribers": { "type": "0x2::table::Table", "fields": { "id": { "id": "0x7ab" }, "size": "3" } },
                "revenue": "15000",
                "suins_name": { "vec": ["alice.patreon.sui"] }
            }
        })
    }

    #[test]
    fn decodes_nested_rendering() {
        let service = ServiceObject::from_json(ObjectId::new("0x5e"), &nested_service()).unwrap();

        assert_eq!(service.creator, "0xa1");
        assert_eq!(service.tiers.len(), 2);
        assert_eq!(service.tier(2).unwrap().price_mist, 5000);
        assert_eq!(service.next_post_id, 2);
        assert_eq!(service.revenue_mist, 15_000);
        assert_eq!(service.suins_name.as_deref(), Some("alice.patreon.sui"));
        assert_eq!(
            service.subscribers,
            Some(SubscribersTable {
                table_id: ObjectId::new("0x7ab"),
                size: Some(3)
            })
        );
        assert!(!service.post(0).unwrap().has_images());
        assert_eq!(service.posts_newest_first()[0].post_id, 1);
    }

    #[test]
    fn decodes_flat_rendering_with_defaults() {
        let flat = json!({
            "creator": "0xb2",
            "name": "Bob",
            "tiers": [],
            "posts": [],
            "revenue": { "value": "0" },
            "suins_name": null
        });
        let service = ServiceObject::from_json(ObjectId::new("0x6f"), &flat).unwrap();
        assert_eq!(service.description, "");
        assert_eq!(service.avatar_blob_id, None);
        assert_eq!(service.subscribers, None);
        assert_eq!(service.suins_name, None);
    }

    #[test]
    fn shape_mismatch_fails_fast() {
        let bad = json!({ "creator": "0xb2", "name": "Bob", "tiers": "nope" });
        assert_eq!(
            ServiceObject::from_json(ObjectId::new("0x6f"), &bad).unwrap_err(),
            DecodeError::InvalidField {
                field: "tiers".into(),
                expected: "an array"
            }
        );

        let no_name = json!({ "creator": "0xb2" });
        assert_eq!(
            ServiceObject::from_json(ObjectId::new("0x6f"), &no_name).unwrap_err(),
            DecodeError::MissingField("name".into())
        );
    }

    #[test]
    fn deleted_object_has_no_content() {
        let object = ObjectData {
            object_id: ObjectId::new("0x6f"),
            object_type: None,
            fields: None,
        };
        assert!(matches!(
            ServiceObject::from_object(&object),
            Err(DecodeError::NoContent(_))
        ));
    }
}
