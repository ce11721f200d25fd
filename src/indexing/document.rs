use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::domain::entities::{ReplyRecord, TopicRecord};

pub const DOCUMENT_TYPE: &str = "discuss";

/// Document submitted to the search engine for a topic or a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    #[serde(rename = "type")]
    pub doc_type: &'static str,
    pub id: Uuid,
    pub tags: String,
    pub name: String,
    pub description: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub url: String,
    pub upvotes: u32,
}

impl IndexDocument {
    /// `text` is the topic content with markup stripped.
    pub fn for_topic(topic: &TopicRecord, text: String) -> Self {
        Self {
            doc_type: DOCUMENT_TYPE,
            id: topic.id,
            tags: topic.tags.clone(),
            name: topic.name.clone(),
            description: String::new(),
            content: text,
            created_at: timestamp(topic.created_at),
            updated_at: timestamp(topic.updated_at),
            url: format!("/discuss/{}/{}", topic.board_id, topic.id),
            upvotes: 0,
        }
    }

    /// Replies are indexed under their topic's name, prefixed with `Re:`.
    pub fn for_reply(reply: &ReplyRecord, topic: &TopicRecord, text: String) -> Self {
        Self {
            doc_type: DOCUMENT_TYPE,
            id: reply.id,
            tags: String::new(),
            name: format!("Re:{}", topic.name),
            description: String::new(),
            content: text,
            created_at: timestamp(reply.created_at),
            updated_at: timestamp(reply.updated_at),
            url: format!("/discuss/topics/{}/find/{}", reply.topic_id, reply.id),
            upvotes: 0,
        }
    }
}

fn timestamp(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}
