//! Search index synchronisation.
//!
//! Discussion writes never wait on the search engine. They hand documents and
//! ids to an [`IndexSyncPipeline`], which forwards them to a [`SearchIndex`]
//! from a background task. Large deletes are unindexed in throttled chunks.
//! Failed calls are logged and dropped: the index is derived data and can be
//! rebuilt with `discuss reindex`.

mod config;
mod document;
mod pipeline;

pub use config::IndexConfig;
pub use document::{DOCUMENT_TYPE, IndexDocument};
pub use pipeline::{IndexSyncPipeline, IndexWorker, PendingUnindexBatch};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search engine unreachable: {message}")]
    Unavailable { message: String },
    #[error("search engine rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Search engine collaborator. Both operations must be idempotent.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index(&self, document: IndexDocument) -> Result<(), SearchError>;

    async fn unindex(&self, ids: Vec<Uuid>) -> Result<(), SearchError>;
}
