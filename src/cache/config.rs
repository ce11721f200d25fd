//! Cache configuration.
//!
//! Sizes the two discussion cache namespaces via the `[cache]` settings
//! section.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_REPLY_THREAD_LIMIT: usize = 2_000;
const DEFAULT_REF_TOPICS_LIMIT: usize = 500;
const DEFAULT_TTL_SECONDS: u64 = 0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum reply threads held in the `reply_threads` namespace.
    pub reply_thread_limit: usize,
    /// Maximum reference listings held in the `ref_topics` namespace.
    pub ref_topics_limit: usize,
    /// Entry lifetime in seconds; 0 keeps entries until evicted.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reply_thread_limit: DEFAULT_REPLY_THREAD_LIMIT,
            ref_topics_limit: DEFAULT_REF_TOPICS_LIMIT,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            reply_thread_limit: settings.reply_thread_limit,
            ref_topics_limit: settings.ref_topics_limit,
            ttl_seconds: settings.ttl_seconds,
        }
    }
}

impl CacheConfig {
    /// Returns the reply thread limit as NonZeroUsize, clamping to 1 if zero.
    pub fn reply_thread_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.reply_thread_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the reference listing limit as NonZeroUsize, clamping to 1 if zero.
    pub fn ref_topics_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.ref_topics_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }
}
