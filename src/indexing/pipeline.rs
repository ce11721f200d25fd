use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{IndexConfig, IndexDocument, SearchIndex};

const METRIC_INDEX_SUBMITTED: &str = "discuss_index_submitted_total";
const METRIC_INDEX_DROPPED: &str = "discuss_index_dropped_total";
const METRIC_INDEX_FAILED: &str = "discuss_index_failed_total";
const METRIC_INDEX_PENDING: &str = "discuss_index_pending_unindex";
const METRIC_INDEX_CALL_MS: &str = "discuss_index_call_ms";

enum IndexJob {
    Index(IndexDocument),
    Unindex(Uuid),
    BulkUnindex(PendingUnindexBatch),
}

impl IndexJob {
    fn op(&self) -> &'static str {
        match self {
            Self::Index(_) => "index",
            Self::Unindex(_) => "unindex",
            Self::BulkUnindex(_) => "bulk_unindex",
        }
    }
}

/// Ids of one bulk delete that have not been handed to the search engine yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnindexBatch {
    ids: Vec<Uuid>,
}

impl PendingUnindexBatch {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Take up to `size` ids from the back of the batch, preserving their order.
    pub fn next_chunk(&mut self, size: usize) -> Option<Vec<Uuid>> {
        if self.ids.is_empty() {
            return None;
        }
        let at = self.ids.len().saturating_sub(size.max(1));
        Some(self.ids.split_off(at))
    }
}

/// Submission handle. Cheap to clone; every method returns immediately.
#[derive(Clone)]
pub struct IndexSyncPipeline {
    sender: mpsc::Sender<IndexJob>,
    pending: Arc<AtomicUsize>,
}

/// Background side of the pipeline.
pub struct IndexWorker {
    handle: JoinHandle<()>,
}

impl IndexWorker {
    /// Wait until every pipeline handle is dropped and all queued work,
    /// including throttled batches, has been handed to the search engine.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Index worker terminated abnormally");
        }
    }
}

impl IndexSyncPipeline {
    /// Start the worker task on the current runtime.
    pub fn spawn(config: IndexConfig, index: Arc<dyn SearchIndex>) -> (Self, IndexWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn(run_worker(receiver, index, config, Arc::clone(&pending)));

        (Self { sender, pending }, IndexWorker { handle })
    }

    pub fn submit_index(&self, document: IndexDocument) {
        self.submit(IndexJob::Index(document));
    }

    pub fn submit_unindex(&self, id: Uuid) {
        self.submit(IndexJob::Unindex(id));
    }

    pub fn submit_bulk_unindex(&self, ids: Vec<Uuid>) {
        if ids.is_empty() {
            return;
        }
        let count = ids.len();
        // Counted before sending so the worker never decrements first.
        self.pending.fetch_add(count, Ordering::AcqRel);
        if !self.submit(IndexJob::BulkUnindex(PendingUnindexBatch::new(ids))) {
            self.pending.fetch_sub(count, Ordering::AcqRel);
        }
        gauge!(METRIC_INDEX_PENDING).set(self.pending_unindex() as f64);
    }

    /// Queue a document, waiting for capacity instead of dropping it.
    /// Returns `false` once the worker has stopped.
    pub async fn send_index(&self, document: IndexDocument) -> bool {
        match self.sender.send(IndexJob::Index(document)).await {
            Ok(()) => {
                counter!(METRIC_INDEX_SUBMITTED, "op" => "index").increment(1);
                true
            }
            Err(_) => {
                warn!(op = "index", reason = "worker_stopped", "Dropping index request");
                counter!(METRIC_INDEX_DROPPED, "op" => "index").increment(1);
                false
            }
        }
    }

    /// Ids accepted for bulk unindexing but not yet handed to the search engine.
    pub fn pending_unindex(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn submit(&self, job: IndexJob) -> bool {
        let op = job.op();
        match self.sender.try_send(job) {
            Ok(()) => {
                counter!(METRIC_INDEX_SUBMITTED, "op" => op).increment(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(op, reason = "queue_full", "Dropping index request");
                counter!(METRIC_INDEX_DROPPED, "op" => op).increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(op, reason = "worker_stopped", "Dropping index request");
                counter!(METRIC_INDEX_DROPPED, "op" => op).increment(1);
                false
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<IndexJob>,
    index: Arc<dyn SearchIndex>,
    config: IndexConfig,
    pending: Arc<AtomicUsize>,
) {
    let mut batches = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        while batches.try_join_next().is_some() {}

        match job {
            IndexJob::Index(document) => {
                let id = document.id;
                let started = Instant::now();
                let result = index.index(document).await;
                record_call("index", started);
                if let Err(err) = result {
                    warn!(%id, error = %err, "Failed to index discussion document");
                    counter!(METRIC_INDEX_FAILED, "op" => "index").increment(1);
                }
            }
            IndexJob::Unindex(id) => {
                let started = Instant::now();
                let result = index.unindex(vec![id]).await;
                record_call("unindex", started);
                if let Err(err) = result {
                    warn!(%id, error = %err, "Failed to unindex discussion document");
                    counter!(METRIC_INDEX_FAILED, "op" => "unindex").increment(1);
                }
            }
            IndexJob::BulkUnindex(batch) => {
                batches.spawn(drain_batch(
                    batch,
                    Arc::clone(&index),
                    config.bulk_chunk_size,
                    config.bulk_delay,
                    Arc::clone(&pending),
                ));
            }
        }
    }

    let running = batches.len();
    if running > 0 {
        debug!(running, "Waiting for bulk unindex batches");
    }
    while batches.join_next().await.is_some() {}
    info!("Index worker stopped");
}

async fn drain_batch(
    mut batch: PendingUnindexBatch,
    index: Arc<dyn SearchIndex>,
    chunk_size: usize,
    delay: Duration,
    pending: Arc<AtomicUsize>,
) {
    let total = batch.len();
    debug!(total, chunk_size, "Draining bulk unindex batch");

    while let Some(chunk) = batch.next_chunk(chunk_size) {
        let size = chunk.len();
        let remaining = pending.fetch_sub(size, Ordering::AcqRel) - size;
        gauge!(METRIC_INDEX_PENDING).set(remaining as f64);

        let started = Instant::now();
        let result = index.unindex(chunk).await;
        record_call("bulk_unindex", started);
        if let Err(err) = result {
            warn!(size, error = %err, "Failed to unindex discussion chunk");
            counter!(METRIC_INDEX_FAILED, "op" => "bulk_unindex").increment(1);
        }

        if batch.is_empty() {
            break;
        }
        tokio::time::sleep(delay).await;
    }
}

fn record_call(op: &'static str, started: Instant) {
    histogram!(METRIC_INDEX_CALL_MS, "op" => op).record(started.elapsed().as_secs_f64() * 1000.0);
}
