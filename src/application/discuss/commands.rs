use std::collections::{BTreeSet, HashMap};

use tracing::info;
use uuid::Uuid;

use crate::application::pagination::Window;
use crate::application::repos::{
    CreateBoardParams, CreateReplyParams, CreateTopicParams, ReplyScope, TopicScope,
    UpdateBoardParams, UpdateTopicParams,
};
use crate::domain::entities::{BoardRecord, ReplyRecord, TopicRecord};

use super::service::DiscussService;
use super::types::{
    CreateBoardCommand, CreateReplyCommand, CreateTopicCommand, Deleted, DiscussError,
    ReindexSummary, TopicRef, UpdateBoardCommand, UpdateTopicCommand, ensure_non_empty,
};

const REINDEX_BATCH: u32 = 100;

impl DiscussService {
    pub async fn create_board(&self, command: CreateBoardCommand) -> Result<BoardRecord, DiscussError> {
        ensure_non_empty(&command.tag, "tag")?;
        ensure_non_empty(&command.name, "name")?;

        let params = CreateBoardParams {
            tag: command.tag.trim().to_string(),
            name: command.name.trim().to_string(),
            description: command.description.trim().to_string(),
        };

        let board = self
            .boards_writer
            .create_board(params)
            .await
            .map_err(|err| DiscussError::from_repo("board", err))?;
        info!(board_id = %board.id, tag = %board.tag, "Board created");
        Ok(board)
    }

    pub async fn update_board(
        &self,
        id: Uuid,
        command: UpdateBoardCommand,
    ) -> Result<BoardRecord, DiscussError> {
        if let Some(tag) = &command.tag {
            ensure_non_empty(tag, "tag")?;
        }
        if let Some(name) = &command.name {
            ensure_non_empty(name, "name")?;
        }

        let params = UpdateBoardParams {
            id,
            tag: command.tag.map(|value| value.trim().to_string()),
            name: command.name.map(|value| value.trim().to_string()),
            description: command.description.map(|value| value.trim().to_string()),
        };

        self.boards_writer
            .update_board(params)
            .await
            .map_err(|err| DiscussError::from_repo("board", err))
    }

    pub async fn set_board_locked(&self, id: Uuid, locked: bool) -> Result<BoardRecord, DiscussError> {
        let board = self.get_board(id).await?;
        if board.locked == locked {
            return Ok(board);
        }

        self.boards_writer
            .set_board_locked(id, locked)
            .await
            .map_err(|err| DiscussError::from_repo("board", err))
    }

    /// Reorder boards; `ordered_ids` must name every board exactly once.
    pub async fn sort_boards(&self, ordered_ids: &[Uuid]) -> Result<Vec<BoardRecord>, DiscussError> {
        let existing: BTreeSet<Uuid> = self
            .boards
            .list_boards()
            .await?
            .into_iter()
            .map(|board| board.id)
            .collect();
        let requested: BTreeSet<Uuid> = ordered_ids.iter().copied().collect();

        if requested.len() != ordered_ids.len() {
            return Err(DiscussError::validation("board ids must be unique"));
        }
        if requested != existing {
            return Err(DiscussError::validation(
                "board ids must list every board exactly once",
            ));
        }

        self.boards_writer
            .reorder_boards(ordered_ids)
            .await
            .map_err(|err| DiscussError::from_repo("board", err))?;
        self.list_boards().await
    }

    /// Open a topic on `board_id`, optionally attached to an external object.
    pub async fn create_topic(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        topic_ref: Option<TopicRef>,
        command: CreateTopicCommand,
    ) -> Result<TopicRecord, DiscussError> {
        ensure_non_empty(&command.name, "name")?;
        ensure_non_empty(&command.content, "content")?;

        let board = self.get_board(board_id).await?;
        if board.locked {
            return Err(DiscussError::conflict("board", "board is locked"));
        }

        let content = self.renderer.markdown_to_html(&command.content)?;
        let (ref_type, ref_id) = match topic_ref {
            Some(TopicRef { ref_type, ref_id }) => (ref_type, Some(ref_id)),
            None => (String::new(), None),
        };

        let topic = self
            .topics_writer
            .create_topic(CreateTopicParams {
                board_id: board.id,
                user_id,
                ref_type,
                ref_id,
                name: command.name.trim().to_string(),
                tags: command.tags.trim().to_string(),
                content,
            })
            .await
            .map_err(|err| DiscussError::from_repo("topic", err))?;

        self.index_topic(&topic);
        self.ref_changed(&topic);
        info!(topic_id = %topic.id, board_id = %board.id, "Topic created");
        Ok(topic)
    }

    pub async fn update_topic(
        &self,
        id: Uuid,
        command: UpdateTopicCommand,
    ) -> Result<TopicRecord, DiscussError> {
        ensure_non_empty(&command.name, "name")?;
        ensure_non_empty(&command.content, "content")?;

        let content = self.renderer.markdown_to_html(&command.content)?;
        let topic = self
            .topics_writer
            .update_topic(UpdateTopicParams {
                id,
                name: command.name.trim().to_string(),
                tags: command.tags.trim().to_string(),
                content,
            })
            .await
            .map_err(|err| DiscussError::from_repo("topic", err))?;

        self.index_topic(&topic);
        self.ref_changed(&topic);
        Ok(topic)
    }

    pub async fn set_topic_locked(&self, id: Uuid, locked: bool) -> Result<TopicRecord, DiscussError> {
        let topic = self.get_topic(id).await?;
        if topic.locked == locked {
            return Ok(topic);
        }

        let topic = self
            .topics_writer
            .set_topic_locked(id, locked)
            .await
            .map_err(|err| DiscussError::from_repo("topic", err))?;

        self.ref_changed(&topic);
        Ok(topic)
    }

    /// Remove a topic and all of its replies from storage and the index.
    pub async fn delete_topic(&self, id: Uuid) -> Result<Deleted, DiscussError> {
        let deleted = self
            .topics_writer
            .delete_topic(id)
            .await
            .map_err(|err| DiscussError::from_repo("topic", err))?;

        self.index.submit_unindex(deleted.topic.id);
        self.index.submit_bulk_unindex(deleted.reply_ids.clone());
        self.ref_changed(&deleted.topic);

        info!(
            topic_id = %deleted.topic.id,
            replies = deleted.reply_ids.len(),
            "Topic deleted"
        );
        Ok(Deleted { id })
    }

    pub async fn create_reply(
        &self,
        user_id: Uuid,
        topic_id: Uuid,
        command: CreateReplyCommand,
    ) -> Result<ReplyRecord, DiscussError> {
        ensure_non_empty(&command.content, "content")?;

        let topic = self.get_topic(topic_id).await?;
        if topic.locked {
            return Err(DiscussError::conflict("topic", "topic is locked"));
        }

        let content = self.renderer.markdown_to_html(&command.content)?;
        let created = self
            .replies_writer
            .create_reply(CreateReplyParams {
                topic_id: topic.id,
                user_id,
                content,
            })
            .await
            .map_err(|err| DiscussError::from_repo("topic", err))?;

        self.index_reply(&created.reply, &created.topic);
        self.ref_changed(&created.topic);
        Ok(created.reply)
    }

    /// Flag a reply as deleted. The row stays so thread positions are stable.
    pub async fn delete_reply(&self, id: Uuid) -> Result<Deleted, DiscussError> {
        let deleted = self
            .replies_writer
            .mark_reply_deleted(id)
            .await
            .map_err(|err| DiscussError::from_repo("reply", err))?;

        self.index.submit_unindex(deleted.reply.id);
        self.ref_changed(&deleted.topic);
        Ok(Deleted { id })
    }

    /// Resubmit every topic and live reply to the search index.
    ///
    /// Unlike request-path submissions this waits for queue capacity, so a
    /// large rebuild is never dropped.
    pub async fn reindex_all(&self) -> Result<ReindexSummary, DiscussError> {
        let mut summary = ReindexSummary::default();
        let mut topics: HashMap<Uuid, TopicRecord> = HashMap::new();

        let total = self.topics.count_topics(&TopicScope::All).await?;
        let mut offset = 0_u64;
        while offset < total {
            let batch = self
                .topics
                .list_topics(&TopicScope::All, Window::new(offset, REINDEX_BATCH))
                .await?;
            if batch.is_empty() {
                break;
            }
            offset += batch.len() as u64;

            for topic in batch {
                let submitted = match self.topic_document(&topic) {
                    Some(document) => self.index.send_index(document).await,
                    None => false,
                };
                if submitted {
                    summary.topics += 1;
                } else {
                    summary.skipped += 1;
                }
                topics.insert(topic.id, topic);
            }
        }

        let total = self.replies.count_replies(ReplyScope::All).await?;
        let mut offset = 0_u64;
        while offset < total {
            let batch = self
                .replies
                .list_replies(ReplyScope::All, Window::new(offset, REINDEX_BATCH))
                .await?;
            if batch.is_empty() {
                break;
            }
            offset += batch.len() as u64;

            for reply in batch {
                if reply.deleted {
                    summary.skipped += 1;
                    continue;
                }
                if !topics.contains_key(&reply.topic_id) {
                    // Topic created after the topic pass started.
                    match self.topics.find_topic(reply.topic_id).await? {
                        Some(topic) => {
                            topics.insert(topic.id, topic);
                        }
                        None => {
                            summary.skipped += 1;
                            continue;
                        }
                    }
                }
                let submitted = match topics
                    .get(&reply.topic_id)
                    .and_then(|topic| self.reply_document(&reply, topic))
                {
                    Some(document) => self.index.send_index(document).await,
                    None => false,
                };
                if submitted {
                    summary.replies += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }

        info!(
            topics = summary.topics,
            replies = summary.replies,
            skipped = summary.skipped,
            "Reindex submitted"
        );
        Ok(summary)
    }
}
