//! Cache key definitions.

use std::fmt;

use uuid::Uuid;

/// Key of a topic's cached first replies.
///
/// Embeds the topic version: a mutation bumps the version, so later reads
/// build a different key and the old entry ages out of the LRU unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyThreadKey {
    pub topic_id: Uuid,
    pub version: i64,
}

impl ReplyThreadKey {
    pub fn new(topic_id: Uuid, version: i64) -> Self {
        Self { topic_id, version }
    }
}

impl fmt::Display for ReplyThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replies:{}:{}", self.topic_id, self.version)
    }
}

/// Key of the first page of topics attached to an external reference.
///
/// Carries no version; entries must be evicted explicitly on change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefTopicsKey {
    pub ref_id: String,
}

impl RefTopicsKey {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
        }
    }
}

impl fmt::Display for RefTopicsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref-topics:{}", self.ref_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_part_of_thread_identity() {
        let id = Uuid::new_v4();
        assert_ne!(ReplyThreadKey::new(id, 1), ReplyThreadKey::new(id, 2));
        assert_eq!(ReplyThreadKey::new(id, 2), ReplyThreadKey::new(id, 2));
    }

    #[test]
    fn keys_render_for_logs() {
        let id = Uuid::nil();
        assert_eq!(
            ReplyThreadKey::new(id, 7).to_string(),
            "replies:00000000-0000-0000-0000-000000000000:7"
        );
        assert_eq!(RefTopicsKey::new("post-42").to_string(), "ref-topics:post-42");
    }
}
