use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::application::render::RenderError;
use crate::application::repos::RepoError;
use crate::domain::entities::{ReplyRecord, TopicRecord};
use crate::domain::error::DomainError;

const DEFAULT_FIRST_REPLIES: u32 = 10;
const DEFAULT_REF_TOPICS_PAGE_SIZE: u32 = 10;
const DEFAULT_REPLY_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum DiscussError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DiscussError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::Domain(DomainError::not_found(entity))
    }

    pub fn conflict(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Domain(DomainError::conflict(entity, message))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }

    /// Translate a storage error raised while touching `entity`.
    pub fn from_repo(entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found(entity),
            RepoError::Duplicate { constraint } => {
                Self::conflict(entity, format!("duplicate value for `{constraint}`"))
            }
            RepoError::InvalidInput { message } => Self::validation(message),
            other => Self::Repo(other),
        }
    }
}

impl From<RepoError> for DiscussError {
    fn from(err: RepoError) -> Self {
        Self::Repo(err)
    }
}

/// Sizes used by the discussion read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscussOptions {
    /// Replies kept in a topic's cached thread preview.
    pub first_replies: u32,
    /// Topics per page of a reference listing.
    pub ref_topics_page_size: u32,
    /// Items per page of a reply listing, topic included.
    pub reply_page_size: u32,
}

impl Default for DiscussOptions {
    fn default() -> Self {
        Self {
            first_replies: DEFAULT_FIRST_REPLIES,
            ref_topics_page_size: DEFAULT_REF_TOPICS_PAGE_SIZE,
            reply_page_size: DEFAULT_REPLY_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::DiscussSettings> for DiscussOptions {
    fn from(settings: &crate::config::DiscussSettings) -> Self {
        Self {
            first_replies: settings.first_replies.get(),
            ref_topics_page_size: settings.ref_topics_page_size.get(),
            reply_page_size: settings.reply_page_size.get(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBoardCommand {
    pub tag: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBoardCommand {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// External object a topic is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRef {
    pub ref_type: String,
    pub ref_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateTopicCommand {
    pub name: String,
    pub tags: String,
    /// Markdown source.
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTopicCommand {
    pub name: String,
    pub tags: String,
    /// Markdown source.
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CreateReplyCommand {
    /// Markdown source.
    pub content: String,
}

/// A topic of a reference listing together with its reply preview.
#[derive(Debug, Clone, Serialize)]
pub struct RefTopic {
    #[serde(flatten)]
    pub topic: TopicRecord,
    pub replies: Arc<Vec<ReplyRecord>>,
}

/// One page of topics attached to a reference.
#[derive(Debug, Clone, Serialize)]
pub struct RefTopicsPage {
    pub page: Page,
    pub topics: Vec<RefTopic>,
}

/// Acknowledgement of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Documents resubmitted by a full reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub topics: u64,
    pub replies: u64,
    pub skipped: u64,
}

pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DiscussError> {
    if value.trim().is_empty() {
        return Err(DiscussError::validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}
