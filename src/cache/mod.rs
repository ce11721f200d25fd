//! Discussion read caches.
//!
//! Two namespaces sit in front of storage:
//!
//! - **`reply_threads`**: a topic's first replies, keyed by topic id and
//!   version. Writes bump the version, so stale entries are never read again.
//! - **`ref_topics`**: the first page of topics attached to an external
//!   reference, keyed by the reference alone and evicted explicitly.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! reply_thread_limit = 2000
//! ref_topics_limit = 500
//! ttl_seconds = 0
//! ```

mod config;
mod keys;
mod loader;
mod lock;
mod namespaces;

pub use config::CacheConfig;
pub use keys::{RefTopicsKey, ReplyThreadKey};
pub use loader::CacheAsideLoader;
pub use namespaces::{DiscussCache, REF_TOPICS, REPLY_THREADS, RefTopicsCache, ReplyThreadCache};
