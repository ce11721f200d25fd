use std::sync::Arc;

use tracing::warn;

use crate::application::render::ContentRenderer;
use crate::application::repos::{
    BoardsRepo, BoardsWriteRepo, RepliesRepo, RepliesWriteRepo, TopicsRepo, TopicsWriteRepo,
    UsersRepo,
};
use crate::application::users::UserBinder;
use crate::cache::DiscussCache;
use crate::domain::entities::{ReplyRecord, TopicRecord};
use crate::indexing::{IndexDocument, IndexSyncPipeline};

use super::types::DiscussOptions;

/// Storage adapters needed by [`DiscussService`].
#[derive(Clone)]
pub struct DiscussRepos {
    pub boards: Arc<dyn BoardsRepo>,
    pub boards_writer: Arc<dyn BoardsWriteRepo>,
    pub topics: Arc<dyn TopicsRepo>,
    pub topics_writer: Arc<dyn TopicsWriteRepo>,
    pub replies: Arc<dyn RepliesRepo>,
    pub replies_writer: Arc<dyn RepliesWriteRepo>,
    pub users: Arc<dyn UsersRepo>,
}

/// Boards, topics and replies with cached reads and deferred indexing.
///
/// Every mutation persists first, then submits (un)index work and finally
/// evicts the reference listing of the affected topic, if any.
#[derive(Clone)]
pub struct DiscussService {
    pub(crate) boards: Arc<dyn BoardsRepo>,
    pub(crate) boards_writer: Arc<dyn BoardsWriteRepo>,
    pub(crate) topics: Arc<dyn TopicsRepo>,
    pub(crate) topics_writer: Arc<dyn TopicsWriteRepo>,
    pub(crate) replies: Arc<dyn RepliesRepo>,
    pub(crate) replies_writer: Arc<dyn RepliesWriteRepo>,
    pub(crate) users: UserBinder,
    pub(crate) renderer: Arc<dyn ContentRenderer>,
    pub(crate) cache: Arc<DiscussCache>,
    pub(crate) index: IndexSyncPipeline,
    pub(crate) options: DiscussOptions,
}

impl DiscussService {
    pub fn new(
        repos: DiscussRepos,
        renderer: Arc<dyn ContentRenderer>,
        cache: Arc<DiscussCache>,
        index: IndexSyncPipeline,
        options: DiscussOptions,
    ) -> Self {
        Self {
            boards: repos.boards,
            boards_writer: repos.boards_writer,
            topics: repos.topics,
            topics_writer: repos.topics_writer,
            replies: repos.replies,
            replies_writer: repos.replies_writer,
            users: UserBinder::new(repos.users),
            renderer,
            cache,
            index,
            options,
        }
    }

    pub fn options(&self) -> DiscussOptions {
        self.options
    }

    pub(crate) fn topic_document(&self, topic: &TopicRecord) -> Option<IndexDocument> {
        match self.renderer.html_to_text(&topic.content) {
            Ok(text) => Some(IndexDocument::for_topic(topic, text)),
            Err(err) => {
                warn!(topic_id = %topic.id, error = %err, "Skipping topic indexing");
                None
            }
        }
    }

    pub(crate) fn reply_document(
        &self,
        reply: &ReplyRecord,
        topic: &TopicRecord,
    ) -> Option<IndexDocument> {
        match self.renderer.html_to_text(&reply.content) {
            Ok(text) => Some(IndexDocument::for_reply(reply, topic, text)),
            Err(err) => {
                warn!(reply_id = %reply.id, error = %err, "Skipping reply indexing");
                None
            }
        }
    }

    pub(crate) fn index_topic(&self, topic: &TopicRecord) {
        if let Some(document) = self.topic_document(topic) {
            self.index.submit_index(document);
        }
    }

    pub(crate) fn index_reply(&self, reply: &ReplyRecord, topic: &TopicRecord) {
        if let Some(document) = self.reply_document(reply, topic) {
            self.index.submit_index(document);
        }
    }

    /// Evict the reference listing `topic` appears in.
    pub(crate) fn ref_changed(&self, topic: &TopicRecord) {
        if let Some(ref_id) = topic.reference() {
            self.cache.ref_changed(ref_id);
        }
    }
}
