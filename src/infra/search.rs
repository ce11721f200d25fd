//! HTTP adapter for the external search engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::SearchSettings;
use crate::indexing::{IndexDocument, SearchError, SearchIndex};

use super::error::InfraError;

const DOCUMENTS_PATH: &str = "documents";
const DELETE_PATH: &str = "documents/delete";

/// Pick the search adapter for the configured endpoint.
pub fn search_index(settings: &SearchSettings) -> Result<Arc<dyn SearchIndex>, InfraError> {
    match settings.endpoint.as_ref() {
        Some(endpoint) => Ok(Arc::new(HttpSearchIndex::new(
            endpoint.clone(),
            settings.timeout,
        )?)),
        None => Ok(Arc::new(DisabledSearchIndex)),
    }
}

/// Posts documents as JSON to `{endpoint}/documents` and deletes them via
/// `{endpoint}/documents/delete`.
#[derive(Debug, Clone)]
pub struct HttpSearchIndex {
    client: Client,
    documents: Url,
    delete: Url,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [Uuid],
}

impl HttpSearchIndex {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::search_client(err.to_string()))?;

        Ok(Self {
            client,
            documents: endpoint_url(&endpoint, DOCUMENTS_PATH)?,
            delete: endpoint_url(&endpoint, DELETE_PATH)?,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("discuss/", env!("CARGO_PKG_VERSION"))
    }

    async fn check(response: Response) -> Result<(), SearchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(SearchError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn index(&self, document: IndexDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .post(self.documents.clone())
            .json(&document)
            .send()
            .await
            .map_err(unavailable)?;

        Self::check(response).await
    }

    async fn unindex(&self, ids: Vec<Uuid>) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.delete.clone())
            .json(&DeleteRequest { ids: &ids })
            .send()
            .await
            .map_err(unavailable)?;

        Self::check(response).await
    }
}

/// Used when no endpoint is configured. Every call succeeds without effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearchIndex;

#[async_trait]
impl SearchIndex for DisabledSearchIndex {
    async fn index(&self, document: IndexDocument) -> Result<(), SearchError> {
        debug!(id = %document.id, "search disabled; skipping index");
        Ok(())
    }

    async fn unindex(&self, ids: Vec<Uuid>) -> Result<(), SearchError> {
        debug!(count = ids.len(), "search disabled; skipping unindex");
        Ok(())
    }
}

fn unavailable(err: reqwest::Error) -> SearchError {
    SearchError::Unavailable {
        message: err.to_string(),
    }
}

/// Resolve `path` below `base`, treating the base path as a directory.
fn endpoint_url(base: &Url, path: &str) -> Result<Url, InfraError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }

    base.join(path)
        .map_err(|err| InfraError::configuration(format!("search endpoint: {err}")))
}
