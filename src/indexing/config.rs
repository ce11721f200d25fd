use std::time::Duration;

const DEFAULT_QUEUE_CAPACITY: usize = 1_024;
const DEFAULT_BULK_CHUNK_SIZE: usize = 10;
const DEFAULT_BULK_DELAY: Duration = Duration::from_millis(500);

/// Tuning for the index pipeline.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Submissions buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Ids per `unindex` call when draining a bulk delete.
    pub bulk_chunk_size: usize,
    /// Pause between two chunks of the same bulk delete.
    pub bulk_delay: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bulk_chunk_size: DEFAULT_BULK_CHUNK_SIZE,
            bulk_delay: DEFAULT_BULK_DELAY,
        }
    }
}

impl From<&crate::config::IndexingSettings> for IndexConfig {
    fn from(settings: &crate::config::IndexingSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity.get(),
            bulk_chunk_size: settings.bulk_chunk_size.get(),
            bulk_delay: Duration::from_millis(settings.bulk_delay_ms),
        }
    }
}
