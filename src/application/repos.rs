//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::Window;
use crate::domain::entities::{BoardRecord, ReplyRecord, TopicRecord, UserProfile};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which topics a count or listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicScope {
    /// Every topic, newest first.
    All,
    /// Topics of one board, most recently active first.
    Board(Uuid),
    /// Topics attached to an external reference, most recently active first.
    Ref(String),
}

/// Which replies a count or listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyScope {
    /// Every reply, newest first.
    All,
    /// Replies of one topic in thread order (oldest first).
    Topic(Uuid),
}

#[derive(Debug, Clone)]
pub struct CreateBoardParams {
    pub tag: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBoardParams {
    pub id: Uuid,
    pub tag: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTopicParams {
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub ref_type: String,
    pub ref_id: Option<String>,
    pub name: String,
    pub tags: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTopicParams {
    pub id: Uuid,
    pub name: String,
    pub tags: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CreateReplyParams {
    pub topic_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// Result of inserting a reply: the reply and its topic after the counter bump.
#[derive(Debug, Clone)]
pub struct CreatedReply {
    pub reply: ReplyRecord,
    pub topic: TopicRecord,
}

/// Result of a logical reply delete: the reply and its topic after the version bump.
#[derive(Debug, Clone)]
pub struct DeletedReply {
    pub reply: ReplyRecord,
    pub topic: TopicRecord,
}

/// Result of removing a topic together with its replies.
#[derive(Debug, Clone)]
pub struct DeletedTopic {
    pub topic: TopicRecord,
    pub reply_ids: Vec<Uuid>,
}

#[async_trait]
pub trait BoardsRepo: Send + Sync {
    async fn find_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RepoError>;

    /// All boards ordered by `display_order`.
    async fn list_boards(&self) -> Result<Vec<BoardRecord>, RepoError>;
}

#[async_trait]
pub trait BoardsWriteRepo: Send + Sync {
    /// Insert a board at the end of the display order.
    async fn create_board(&self, params: CreateBoardParams) -> Result<BoardRecord, RepoError>;

    async fn update_board(&self, params: UpdateBoardParams) -> Result<BoardRecord, RepoError>;

    async fn set_board_locked(&self, id: Uuid, locked: bool) -> Result<BoardRecord, RepoError>;

    /// Assign `display_order` from the position of each id in `ordered_ids`.
    async fn reorder_boards(&self, ordered_ids: &[Uuid]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TopicsRepo: Send + Sync {
    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError>;

    async fn count_topics(&self, scope: &TopicScope) -> Result<u64, RepoError>;

    async fn list_topics(
        &self,
        scope: &TopicScope,
        window: Window,
    ) -> Result<Vec<TopicRecord>, RepoError>;
}

#[async_trait]
pub trait TopicsWriteRepo: Send + Sync {
    /// Insert the topic and bump the board's topic counter in one transaction.
    async fn create_topic(&self, params: CreateTopicParams) -> Result<TopicRecord, RepoError>;

    /// Update name, tags and content, advancing the topic version.
    async fn update_topic(&self, params: UpdateTopicParams) -> Result<TopicRecord, RepoError>;

    /// Change the lock flag, advancing the topic version.
    async fn set_topic_locked(&self, id: Uuid, locked: bool) -> Result<TopicRecord, RepoError>;

    /// Remove the topic and its replies and decrement the board's topic counter.
    async fn delete_topic(&self, id: Uuid) -> Result<DeletedTopic, RepoError>;
}

#[async_trait]
pub trait RepliesRepo: Send + Sync {
    async fn find_reply(&self, id: Uuid) -> Result<Option<ReplyRecord>, RepoError>;

    async fn count_replies(&self, scope: ReplyScope) -> Result<u64, RepoError>;

    async fn list_replies(
        &self,
        scope: ReplyScope,
        window: Window,
    ) -> Result<Vec<ReplyRecord>, RepoError>;

    /// Number of replies preceding `reply_id` in its topic's thread order.
    async fn count_replies_before(&self, topic_id: Uuid, reply_id: Uuid)
    -> Result<u64, RepoError>;
}

#[async_trait]
pub trait RepliesWriteRepo: Send + Sync {
    /// Bump the topic's reply counter and version and insert the reply in one
    /// transaction. A missing topic yields `NotFound`.
    async fn create_reply(&self, params: CreateReplyParams) -> Result<CreatedReply, RepoError>;

    /// Flag the reply as deleted and advance the parent topic's version.
    async fn mark_reply_deleted(&self, id: Uuid) -> Result<DeletedReply, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, RepoError>;
}
