//! Content rendering used by discussion writes and search indexing.
//!
//! Topics and replies are authored in markdown and stored as sanitised HTML.
//! The search index receives plain text extracted from that HTML. Both
//! conversions are pure; callers own persistence and indexing.

mod markdown;

pub use markdown::MarkdownRenderer;

use thiserror::Error;

/// Structured errors surfaced by the renderer.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Rendering collaborator. Implementations must be deterministic: the same
/// input yields the same output or error.
pub trait ContentRenderer: Send + Sync {
    /// Render user markdown into sanitised HTML.
    fn markdown_to_html(&self, markdown: &str) -> Result<String, RenderError>;

    /// Strip markup from stored HTML, keeping readable text only.
    fn html_to_text(&self, html: &str) -> Result<String, RenderError>;
}
