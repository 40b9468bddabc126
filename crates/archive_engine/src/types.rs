use std::fmt;
use std::path::PathBuf;

use archive_core::BreadcrumbPath;
use thiserror::Error;

/// Failure reported by a UI-view binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// An element the action needs is not on the page.
    #[error("missing control: {0}")]
    MissingControl(String),
    /// The UI state could not be read.
    #[error("read failed: {0}")]
    Read(String),
    /// An action was rejected by the UI.
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// The automation session is gone; nothing further can succeed.
    #[error("session lost: {0}")]
    SessionLost(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("automation session lost: {0}")]
    SessionLost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Progress notifications emitted while crawling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    NodeEntered { breadcrumbs: BreadcrumbPath },
    /// The node carries a directory marker from an earlier run.
    NodeSkipped { directory: PathBuf },
    NodeCompleted { directory: PathBuf },
    /// Some branch below the node failed; no directory marker was written.
    NodeIncomplete { directory: PathBuf },
    PageSaved { file_id: String, page: u32, path: PathBuf },
    FileCompleted { file_id: String, pages: u32 },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<CrawlEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<CrawlEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event);
    }
}

pub(crate) struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: CrawlEvent) {}
}
