//! Browser capability interface.
//!
//! The crawl only talks to these traits; `chrome` provides the real driver and
//! the test suite an in-memory one.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("script `{script}` failed: {reason}")]
    Script { script: String, reason: String },

    #[error("no element matches `{0}`")]
    NoMatch(String),

    #[error("browser task failed: {0}")]
    Task(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Which of several matching elements an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nth {
    First,
    Last,
}

/// One browsing session owning any number of pages.
#[async_trait]
pub trait Browser: Send + Sync {
    type Page: Page;

    async fn open_page(&self) -> BrowserResult<Self::Page>;

    async fn close(&self) -> BrowserResult<()>;
}

/// A single tab/page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the base document, bounded by `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Best-effort wait for network activity to settle. Never fails.
    async fn wait_for_idle(&self, quiet: Duration);

    /// Serialized DOM of the current document.
    async fn content(&self) -> BrowserResult<String>;

    async fn count(&self, selector: &str) -> BrowserResult<usize>;

    async fn click(&self, selector: &str, nth: Nth) -> BrowserResult<()>;

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value>;

    async fn close(&self) -> BrowserResult<()>;
}

/// Escape a value for embedding in a script as a JS string literal.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
