//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardRecord {
    pub id: Uuid,
    pub tag: String,
    pub name: String,
    pub description: String,
    pub locked: bool,
    pub topic_count: i64,
    pub display_order: i32,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A discussion thread, optionally attached to an external object (`ref_id`).
///
/// `version` advances on every observable mutation of the thread: new or
/// deleted replies, edits and lock changes. Read caches embed it in their keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRecord {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub ref_type: String,
    pub ref_id: Option<String>,
    pub name: String,
    pub tags: String,
    pub content: String,
    pub locked: bool,
    pub reply_count: i64,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl TopicRecord {
    /// The external reference this topic hangs off, ignoring blank values.
    pub fn reference(&self) -> Option<&str> {
        self.ref_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyRecord {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub deleted: bool,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Public profile attached to authored entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
}

/// Entities carrying an author that can be hydrated with a [`UserProfile`].
pub trait Authored {
    fn author_id(&self) -> Uuid;

    fn attach_author(&mut self, profile: UserProfile);
}

impl Authored for TopicRecord {
    fn author_id(&self) -> Uuid {
        self.user_id
    }

    fn attach_author(&mut self, profile: UserProfile) {
        self.user = Some(profile);
    }
}

impl Authored for ReplyRecord {
    fn author_id(&self) -> Uuid {
        self.user_id
    }

    fn attach_author(&mut self, profile: UserProfile) {
        self.user = Some(profile);
    }
}
