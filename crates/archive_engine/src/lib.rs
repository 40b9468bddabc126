//! Archive engine: UI synchronization, resumable downloads and tree traversal.
mod config;
mod crawler;
mod download;
mod fetch;
mod ledger;
mod pagination;
mod persist;
mod poll;
mod types;
mod view;

pub use config::{ConfigError, CrawlConfig};
pub use crawler::{CrawlReport, Crawler, StopHandle};
pub use download::{
    image_extension, page_stem, DownloadReport, FileDownloader, PageOutcome,
    DEFAULT_MAX_DOCUMENT_PAGES,
};
pub use fetch::{FetchSettings, PageRequest, PageResponse, PageSource, ReqwestPageSource};
pub use ledger::{MarkerFileLedger, ResumeLedger, DIRECTORY_MARKER};
pub use pagination::PaginationWalker;
pub use persist::{build_directory, ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{observe, wait_for_change, Observed, PollSettings};
pub use types::{
    ChannelProgressSink, CrawlError, CrawlEvent, FailureKind, FetchError, ProgressSink, ViewError,
};
pub use view::{ArchiveView, CookieJar, SessionCookie, ViewSnapshot};
