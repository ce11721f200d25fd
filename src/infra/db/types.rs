use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{BoardRecord, ReplyRecord, TopicRecord, UserProfile};

pub(super) const BOARD_COLUMNS: &str = "id, tag, name, description, locked, topic_count, \
    display_order, version, created_at, updated_at";

pub(super) const TOPIC_COLUMNS: &str = "id, board_id, user_id, ref_type, ref_id, name, tags, \
    content, locked, reply_count, version, created_at, updated_at";

pub(super) const REPLY_COLUMNS: &str =
    "id, topic_id, user_id, content, deleted, version, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(super) struct BoardRow {
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

impl From<BoardRow> for BoardRecord {
    fn from(row: BoardRow) -> Self {
        Self {
            id: row.id,
            tag: row.tag,
            name: row.name,
            description: row.description,
            locked: row.locked,
            topic_count: row.topic_count,
            display_order: row.display_order,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct TopicRow {
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
}

impl From<TopicRow> for TopicRecord {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            board_id: row.board_id,
            user_id: row.user_id,
            ref_type: row.ref_type,
            ref_id: row.ref_id,
            name: row.name,
            tags: row.tags,
            content: row.content,
            locked: row.locked,
            reply_count: row.reply_count,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: None,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ReplyRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub deleted: bool,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ReplyRow> for ReplyRecord {
    fn from(row: ReplyRow) -> Self {
        Self {
            id: row.id,
            topic_id: row.topic_id,
            user_id: row.user_id,
            content: row.content,
            deleted: row.deleted,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: None,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
        }
    }
}
