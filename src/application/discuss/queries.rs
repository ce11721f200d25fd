use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::{Listing, Page, PageQuery, Window, reply_page_index};
use crate::application::repos::{ReplyScope, TopicScope};
use crate::cache::{RefTopicsKey, ReplyThreadKey};
use crate::domain::entities::{BoardRecord, ReplyRecord, TopicRecord};

use super::service::DiscussService;
use super::types::{DiscussError, RefTopic, RefTopicsPage};

impl DiscussService {
    pub async fn get_board(&self, id: Uuid) -> Result<BoardRecord, DiscussError> {
        self.boards
            .find_board(id)
            .await?
            .ok_or_else(|| DiscussError::not_found("board"))
    }

    pub async fn board_by_tag(&self, tag: &str) -> Result<BoardRecord, DiscussError> {
        let tag = tag.trim();
        self.boards
            .list_boards()
            .await?
            .into_iter()
            .find(|board| board.tag == tag)
            .ok_or_else(|| DiscussError::not_found("board"))
    }

    pub async fn list_boards(&self) -> Result<Vec<BoardRecord>, DiscussError> {
        Ok(self.boards.list_boards().await?)
    }

    pub async fn get_topic(&self, id: Uuid) -> Result<TopicRecord, DiscussError> {
        self.topics
            .find_topic(id)
            .await?
            .ok_or_else(|| DiscussError::not_found("topic"))
    }

    pub async fn get_reply(&self, id: Uuid) -> Result<ReplyRecord, DiscussError> {
        self.replies
            .find_reply(id)
            .await?
            .ok_or_else(|| DiscussError::not_found("reply"))
    }

    /// Every topic, newest first.
    pub async fn list_topics(&self, query: PageQuery) -> Result<Listing<TopicRecord>, DiscussError> {
        self.load_topics(&TopicScope::All, query.into_page()).await
    }

    /// Topics of a board, most recently active first.
    pub async fn list_board_topics(
        &self,
        board_id: Uuid,
        query: PageQuery,
    ) -> Result<Listing<TopicRecord>, DiscussError> {
        let board = self.get_board(board_id).await?;
        self.load_topics(&TopicScope::Board(board.id), query.into_page())
            .await
    }

    /// Topics attached to `ref_id`, each with its reply preview.
    ///
    /// Only page 1 is cached. The entry is keyed by the reference alone and
    /// is evicted by every write under that reference.
    pub async fn list_ref_topics(
        &self,
        ref_id: &str,
        page_index: u32,
    ) -> Result<Arc<RefTopicsPage>, DiscussError> {
        let page = Page::new(page_index, self.options.ref_topics_page_size);
        if page.index != 1 {
            return self.load_ref_topics(ref_id, page).await.map(Arc::new);
        }

        self.cache
            .ref_topics()
            .get_or_compute(RefTopicsKey::new(ref_id), || async move {
                self.load_ref_topics(ref_id, page).await.map(Arc::new)
            })
            .await
    }

    /// The first replies of `topic`, cached under its current version.
    pub async fn reply_thread(
        &self,
        topic: &TopicRecord,
    ) -> Result<Arc<Vec<ReplyRecord>>, DiscussError> {
        let key = ReplyThreadKey::new(topic.id, topic.version);
        let limit = self.options.first_replies;
        self.cache
            .reply_threads()
            .get_or_compute(key, || async move {
                let mut replies = self
                    .replies
                    .list_replies(ReplyScope::Topic(key.topic_id), Window::head(limit))
                    .await?;
                self.users.bind(&mut replies).await?;
                Ok::<_, DiscussError>(Arc::new(replies))
            })
            .await
    }

    /// One page of a topic's thread. The topic itself is item 1, so page 1
    /// holds one reply fewer than the page size.
    pub async fn list_replies(
        &self,
        topic_id: Uuid,
        query: PageQuery,
    ) -> Result<Listing<ReplyRecord>, DiscussError> {
        let topic = self.get_topic(topic_id).await?;
        let scope = ReplyScope::Topic(topic.id);

        let mut page = query.into_page();
        let replies = self.replies.count_replies(scope).await?;
        page.set_total(replies + 1);

        let Some(window) = page.reply_window() else {
            return Ok(Listing::empty(page));
        };

        let mut items = self.replies.list_replies(scope, window).await?;
        self.users.bind(&mut items).await?;
        Ok(Listing::new(page, items))
    }

    /// Every reply across all topics, newest first.
    pub async fn list_all_replies(
        &self,
        query: PageQuery,
    ) -> Result<Listing<ReplyRecord>, DiscussError> {
        let mut page = query.into_page();
        page.set_total(self.replies.count_replies(ReplyScope::All).await?);

        let Some(window) = page.window() else {
            return Ok(Listing::empty(page));
        };

        let mut items = self.replies.list_replies(ReplyScope::All, window).await?;
        self.users.bind(&mut items).await?;
        Ok(Listing::new(page, items))
    }

    /// Page of the topic thread on which `reply_id` is shown.
    pub async fn locate_reply(&self, topic_id: Uuid, reply_id: Uuid) -> Result<u32, DiscussError> {
        let reply = self.get_reply(reply_id).await?;
        if reply.topic_id != topic_id {
            return Err(DiscussError::not_found("reply"));
        }

        let before = self
            .replies
            .count_replies_before(topic_id, reply_id)
            .await?;
        Ok(reply_page_index(before, self.options.reply_page_size))
    }

    async fn load_topics(
        &self,
        scope: &TopicScope,
        mut page: Page,
    ) -> Result<Listing<TopicRecord>, DiscussError> {
        page.set_total(self.topics.count_topics(scope).await?);

        let Some(window) = page.window() else {
            return Ok(Listing::empty(page));
        };

        let mut items = self.topics.list_topics(scope, window).await?;
        self.users.bind(&mut items).await?;
        Ok(Listing::new(page, items))
    }

    async fn load_ref_topics(
        &self,
        ref_id: &str,
        page: Page,
    ) -> Result<RefTopicsPage, DiscussError> {
        let scope = TopicScope::Ref(ref_id.to_string());
        let Listing { page, items } = self.load_topics(&scope, page).await?;
        debug!(ref_id, page = page.index, topics = items.len(), "Loaded reference topics");

        let mut topics = Vec::with_capacity(items.len());
        for topic in items {
            let replies = self.reply_thread(&topic).await?;
            topics.push(RefTopic { topic, replies });
        }

        Ok(RefTopicsPage { page, topics })
    }
}
