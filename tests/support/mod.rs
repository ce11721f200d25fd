//! In-memory repositories and a recording search index for service tests.
#![allow(dead_code)]

use std::cmp::Reverse;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use discuss::application::discuss::{DiscussOptions, DiscussRepos, DiscussService};
use discuss::application::pagination::Window;
use discuss::application::render::MarkdownRenderer;
use discuss::application::repos::{
    BoardsRepo, BoardsWriteRepo, CreateBoardParams, CreateReplyParams, CreateTopicParams,
    CreatedReply, DeletedReply, DeletedTopic, RepliesRepo, RepliesWriteRepo, RepoError,
    ReplyScope, TopicScope, TopicsRepo, TopicsWriteRepo, UpdateBoardParams, UpdateTopicParams,
    UsersRepo,
};
use discuss::cache::{CacheConfig, DiscussCache};
use discuss::domain::entities::{BoardRecord, ReplyRecord, TopicRecord, UserProfile};
use discuss::indexing::{
    IndexConfig, IndexDocument, IndexSyncPipeline, IndexWorker, SearchError, SearchIndex,
};
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::time::Instant;
use uuid::Uuid;

const EPOCH: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

#[derive(Default)]
struct State {
    tick: i64,
    boards: Vec<BoardRecord>,
    topics: Vec<TopicRecord>,
    replies: Vec<ReplyRecord>,
    users: Vec<UserProfile>,
}

impl State {
    /// Strictly increasing timestamps keep orderings deterministic.
    fn now(&mut self) -> OffsetDateTime {
        self.tick += 1;
        EPOCH + Duration::seconds(self.tick)
    }

    fn board_mut(&mut self, id: Uuid) -> Result<&mut BoardRecord, RepoError> {
        self.boards
            .iter_mut()
            .find(|board| board.id == id)
            .ok_or(RepoError::NotFound)
    }

    fn topic_mut(&mut self, id: Uuid) -> Result<&mut TopicRecord, RepoError> {
        self.topics
            .iter_mut()
            .find(|topic| topic.id == id)
            .ok_or(RepoError::NotFound)
    }

    fn ensure_unique_tag(&self, tag: &str, except: Option<Uuid>) -> Result<(), RepoError> {
        let taken = self
            .boards
            .iter()
            .any(|board| board.tag == tag && Some(board.id) != except);
        if taken {
            return Err(RepoError::Duplicate {
                constraint: "boards_tag_key".to_string(),
            });
        }
        Ok(())
    }

    fn scoped_topics(&self, scope: &TopicScope) -> Vec<TopicRecord> {
        let mut topics: Vec<_> = self
            .topics
            .iter()
            .filter(|topic| match scope {
                TopicScope::All => true,
                TopicScope::Board(board_id) => topic.board_id == *board_id,
                TopicScope::Ref(ref_id) => topic.ref_id.as_deref() == Some(ref_id.as_str()),
            })
            .cloned()
            .collect();
        match scope {
            TopicScope::All => topics.sort_by_key(|topic| Reverse((topic.created_at, topic.id))),
            TopicScope::Board(_) | TopicScope::Ref(_) => {
                topics.sort_by_key(|topic| Reverse((topic.updated_at, topic.id)))
            }
        }
        topics
    }

    fn scoped_replies(&self, scope: ReplyScope) -> Vec<ReplyRecord> {
        let mut replies: Vec<_> = self
            .replies
            .iter()
            .filter(|reply| match scope {
                ReplyScope::All => true,
                ReplyScope::Topic(topic_id) => reply.topic_id == topic_id,
            })
            .cloned()
            .collect();
        match scope {
            ReplyScope::All => replies.sort_by_key(|reply| Reverse((reply.created_at, reply.id))),
            ReplyScope::Topic(_) => replies.sort_by_key(|reply| (reply.created_at, reply.id)),
        }
        replies
    }
}

fn window_of<T>(items: Vec<T>, window: Window) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
        .take(window.limit as usize)
        .collect()
}

/// Every repository trait over one shared in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock")
    }

    pub fn add_user(&self, name: &str) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image_url: format!("/avatars/{name}.png"),
        };
        self.state().users.push(profile.clone());
        profile
    }

    pub fn topic(&self, id: Uuid) -> Option<TopicRecord> {
        self.state().topics.iter().find(|topic| topic.id == id).cloned()
    }

    pub fn reply_count(&self) -> usize {
        self.state().replies.len()
    }

    pub fn repos(self: &Arc<Self>) -> DiscussRepos {
        DiscussRepos {
            boards: self.clone(),
            boards_writer: self.clone(),
            topics: self.clone(),
            topics_writer: self.clone(),
            replies: self.clone(),
            replies_writer: self.clone(),
            users: self.clone(),
        }
    }
}

#[async_trait]
impl BoardsRepo for MemoryStore {
    async fn find_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RepoError> {
        Ok(self.state().boards.iter().find(|board| board.id == id).cloned())
    }

    async fn list_boards(&self) -> Result<Vec<BoardRecord>, RepoError> {
        let mut boards = self.state().boards.clone();
        boards.sort_by_key(|board| (board.display_order, board.created_at));
        Ok(boards)
    }
}

#[async_trait]
impl BoardsWriteRepo for MemoryStore {
    async fn create_board(&self, params: CreateBoardParams) -> Result<BoardRecord, RepoError> {
        let mut state = self.state();
        state.ensure_unique_tag(&params.tag, None)?;
        let display_order = state
            .boards
            .iter()
            .map(|board| board.display_order)
            .max()
            .unwrap_or(0)
            + 1;
        let now = state.now();
        let board = BoardRecord {
            id: Uuid::new_v4(),
            tag: params.tag,
            name: params.name,
            description: params.description,
            locked: false,
            topic_count: 0,
            display_order,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.boards.push(board.clone());
        Ok(board)
    }

    async fn update_board(&self, params: UpdateBoardParams) -> Result<BoardRecord, RepoError> {
        let mut state = self.state();
        if let Some(tag) = params.tag.as_deref() {
            state.ensure_unique_tag(tag, Some(params.id))?;
        }
        let now = state.now();
        let board = state.board_mut(params.id)?;
        if let Some(tag) = params.tag {
            board.tag = tag;
        }
        if let Some(name) = params.name {
            board.name = name;
        }
        if let Some(description) = params.description {
            board.description = description;
        }
        board.version += 1;
        board.updated_at = now;
        Ok(board.clone())
    }

    async fn set_board_locked(&self, id: Uuid, locked: bool) -> Result<BoardRecord, RepoError> {
        let mut state = self.state();
        let board = state.board_mut(id)?;
        board.locked = locked;
        board.version += 1;
        Ok(board.clone())
    }

    async fn reorder_boards(&self, ordered_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut state = self.state();
        for (position, id) in ordered_ids.iter().enumerate() {
            let board = state.board_mut(*id)?;
            board.display_order = i32::try_from(position).unwrap_or(i32::MAX) + 1;
        }
        Ok(())
    }
}

#[async_trait]
impl TopicsRepo for MemoryStore {
    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError> {
        Ok(self.topic(id))
    }

    async fn count_topics(&self, scope: &TopicScope) -> Result<u64, RepoError> {
        Ok(self.state().scoped_topics(scope).len() as u64)
    }

    async fn list_topics(
        &self,
        scope: &TopicScope,
        window: Window,
    ) -> Result<Vec<TopicRecord>, RepoError> {
        Ok(window_of(self.state().scoped_topics(scope), window))
    }
}

#[async_trait]
impl TopicsWriteRepo for MemoryStore {
    async fn create_topic(&self, params: CreateTopicParams) -> Result<TopicRecord, RepoError> {
        let mut state = self.state();
        let now = state.now();
        let board = state.board_mut(params.board_id)?;
        board.topic_count += 1;
        board.version += 1;

        let topic = TopicRecord {
            id: Uuid::new_v4(),
            board_id: params.board_id,
            user_id: params.user_id,
            ref_type: params.ref_type,
            ref_id: params.ref_id,
            name: params.name,
            tags: params.tags,
            content: params.content,
            locked: false,
            reply_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            user: None,
        };
        state.topics.push(topic.clone());
        Ok(topic)
    }

    async fn update_topic(&self, params: UpdateTopicParams) -> Result<TopicRecord, RepoError> {
        let mut state = self.state();
        let now = state.now();
        let topic = state.topic_mut(params.id)?;
        topic.name = params.name;
        topic.tags = params.tags;
        topic.content = params.content;
        topic.version += 1;
        topic.updated_at = now;
        Ok(topic.clone())
    }

    async fn set_topic_locked(&self, id: Uuid, locked: bool) -> Result<TopicRecord, RepoError> {
        let mut state = self.state();
        let topic = state.topic_mut(id)?;
        topic.locked = locked;
        topic.version += 1;
        Ok(topic.clone())
    }

    async fn delete_topic(&self, id: Uuid) -> Result<DeletedTopic, RepoError> {
        let mut state = self.state();
        let position = state
            .topics
            .iter()
            .position(|topic| topic.id == id)
            .ok_or(RepoError::NotFound)?;
        let topic = state.topics.remove(position);

        let reply_ids = state
            .scoped_replies(ReplyScope::Topic(id))
            .into_iter()
            .map(|reply| reply.id)
            .collect();
        state.replies.retain(|reply| reply.topic_id != id);

        if let Ok(board) = state.board_mut(topic.board_id) {
            board.topic_count = (board.topic_count - 1).max(0);
            board.version += 1;
        }

        Ok(DeletedTopic { topic, reply_ids })
    }
}

#[async_trait]
impl RepliesRepo for MemoryStore {
    async fn find_reply(&self, id: Uuid) -> Result<Option<ReplyRecord>, RepoError> {
        Ok(self.state().replies.iter().find(|reply| reply.id == id).cloned())
    }

    async fn count_replies(&self, scope: ReplyScope) -> Result<u64, RepoError> {
        Ok(self.state().scoped_replies(scope).len() as u64)
    }

    async fn list_replies(
        &self,
        scope: ReplyScope,
        window: Window,
    ) -> Result<Vec<ReplyRecord>, RepoError> {
        Ok(window_of(self.state().scoped_replies(scope), window))
    }

    async fn count_replies_before(
        &self,
        topic_id: Uuid,
        reply_id: Uuid,
    ) -> Result<u64, RepoError> {
        let thread = self.state().scoped_replies(ReplyScope::Topic(topic_id));
        let before = thread
            .iter()
            .position(|reply| reply.id == reply_id)
            .unwrap_or(0);
        Ok(before as u64)
    }
}

#[async_trait]
impl RepliesWriteRepo for MemoryStore {
    async fn create_reply(&self, params: CreateReplyParams) -> Result<CreatedReply, RepoError> {
        let mut state = self.state();
        let now = state.now();
        let topic = state.topic_mut(params.topic_id)?;
        topic.reply_count += 1;
        topic.version += 1;
        topic.updated_at = now;
        let topic = topic.clone();

        let reply = ReplyRecord {
            id: Uuid::new_v4(),
            topic_id: params.topic_id,
            user_id: params.user_id,
            content: params.content,
            deleted: false,
            version: 0,
            created_at: now,
            updated_at: now,
            user: None,
        };
        state.replies.push(reply.clone());
        Ok(CreatedReply { reply, topic })
    }

    async fn mark_reply_deleted(&self, id: Uuid) -> Result<DeletedReply, RepoError> {
        let mut state = self.state();
        let now = state.now();
        let reply = state
            .replies
            .iter_mut()
            .find(|reply| reply.id == id)
            .ok_or(RepoError::NotFound)?;
        reply.deleted = true;
        reply.version += 1;
        reply.updated_at = now;
        let reply = reply.clone();

        let topic = state.topic_mut(reply.topic_id)?;
        topic.version += 1;
        let topic = topic.clone();
        Ok(DeletedReply { reply, topic })
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, RepoError> {
        Ok(self
            .state()
            .users
            .iter()
            .filter(|profile| ids.contains(&profile.id))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCall {
    Index(Uuid),
    Unindex(Vec<Uuid>),
}

/// Search engine fake that records every call with the instant it arrived.
#[derive(Default)]
pub struct RecordingSearchIndex {
    calls: Mutex<Vec<(Instant, SearchCall)>>,
}

impl RecordingSearchIndex {
    pub fn calls(&self) -> Vec<SearchCall> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, SearchCall)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn indexed(&self) -> Vec<Uuid> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SearchCall::Index(id) => Some(id),
                SearchCall::Unindex(_) => None,
            })
            .collect()
    }

    pub fn unindexed(&self) -> Vec<Vec<Uuid>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SearchCall::Unindex(ids) => Some(ids),
                SearchCall::Index(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl SearchIndex for RecordingSearchIndex {
    async fn index(&self, document: IndexDocument) -> Result<(), SearchError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((Instant::now(), SearchCall::Index(document.id)));
        Ok(())
    }

    async fn unindex(&self, ids: Vec<Uuid>) -> Result<(), SearchError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((Instant::now(), SearchCall::Unindex(ids)));
        Ok(())
    }
}

/// A service wired to in-memory storage and a recording search index.
pub struct Harness {
    pub service: DiscussService,
    pub store: Arc<MemoryStore>,
    pub search: Arc<RecordingSearchIndex>,
    pub cache: Arc<DiscussCache>,
    worker: IndexWorker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(DiscussOptions::default())
    }

    pub fn with_options(options: DiscussOptions) -> Self {
        let store = Arc::new(MemoryStore::default());
        let search = Arc::new(RecordingSearchIndex::default());
        let cache = Arc::new(DiscussCache::new(&CacheConfig::default()));
        let (pipeline, worker) = IndexSyncPipeline::spawn(IndexConfig::default(), search.clone());
        let service = DiscussService::new(
            store.repos(),
            Arc::new(MarkdownRenderer::new()),
            cache.clone(),
            pipeline,
            options,
        );

        Self {
            service,
            store,
            search,
            cache,
            worker,
        }
    }

    /// Drop the service and wait for every queued index call to finish.
    pub async fn drain(self) -> Arc<RecordingSearchIndex> {
        let Self {
            service,
            search,
            worker,
            ..
        } = self;
        drop(service);
        worker.join().await;
        search
    }
}
