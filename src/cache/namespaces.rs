//! The two cache namespaces used by discussions.

use std::sync::Arc;

use tracing::debug;

use crate::application::discuss::RefTopicsPage;
use crate::domain::entities::ReplyRecord;

use super::config::CacheConfig;
use super::keys::{RefTopicsKey, ReplyThreadKey};
use super::loader::CacheAsideLoader;

pub const REPLY_THREADS: &str = "reply_threads";
pub const REF_TOPICS: &str = "ref_topics";

pub type ReplyThreadCache = CacheAsideLoader<ReplyThreadKey, Arc<Vec<ReplyRecord>>>;
pub type RefTopicsCache = CacheAsideLoader<RefTopicsKey, Arc<RefTopicsPage>>;

/// Cache state shared by every discussion request.
///
/// `reply_threads` never needs invalidation because its keys carry the topic
/// version. `ref_topics` is keyed by reference only and must be evicted through
/// [`DiscussCache::ref_changed`] whenever anything under that reference changes.
pub struct DiscussCache {
    reply_threads: ReplyThreadCache,
    ref_topics: RefTopicsCache,
}

impl DiscussCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            reply_threads: CacheAsideLoader::new(
                REPLY_THREADS,
                config.reply_thread_limit_non_zero(),
                config.ttl(),
            ),
            ref_topics: CacheAsideLoader::new(
                REF_TOPICS,
                config.ref_topics_limit_non_zero(),
                config.ttl(),
            ),
        }
    }

    pub fn reply_threads(&self) -> &ReplyThreadCache {
        &self.reply_threads
    }

    pub fn ref_topics(&self) -> &RefTopicsCache {
        &self.ref_topics
    }

    /// Evict the cached first page of topics for `ref_id`.
    pub fn ref_changed(&self, ref_id: &str) {
        debug!(ref_id, "Evicting reference topic listing");
        self.ref_topics.remove(&RefTopicsKey::new(ref_id));
    }
}

impl Default for DiscussCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
