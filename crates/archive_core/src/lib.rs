//! Archive core: pure hierarchy model, path normalization and page sequencing.
mod pagination;
mod path;
mod types;

pub use pagination::{needs_page_turn, PageCursor};
pub use path::{directory_for, normalize_segment, MAX_SEGMENT_CHARS};
pub use types::{BreadcrumbPath, FileRecord, NodeRef, Snapshot, MULTI_PAGE_TAG};
