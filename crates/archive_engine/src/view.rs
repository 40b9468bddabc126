use std::sync::{Arc, RwLock};

use archive_core::{BreadcrumbPath, FileRecord, NodeRef, Snapshot};
use futures_util::future::BoxFuture;

use crate::ViewError;

/// The interactive archive UI, as seen by the crawler.
///
/// Reads take `&self` and may be repeated freely while polling. Actions take
/// `&mut self`: the UI has one global view, so only one action is in flight.
#[async_trait::async_trait]
pub trait ArchiveView: Send + Sync {
    async fn breadcrumbs(&self) -> Result<BreadcrumbPath, ViewError>;
    async fn node_refs(&self) -> Result<Vec<NodeRef>, ViewError>;
    async fn file_records(&self) -> Result<Vec<FileRecord>, ViewError>;
    /// 1-based index of the page currently shown.
    async fn current_page(&self) -> Result<u32, ViewError>;
    async fn total_pages(&self) -> Result<u32, ViewError>;
    /// Ids of the "view file list" controls on the current page.
    async fn file_list_views(&self) -> Result<Vec<String>, ViewError>;

    async fn descend_into(&mut self, node_id: &str) -> Result<(), ViewError>;
    /// Click the last breadcrumb link.
    async fn ascend_one_level(&mut self) -> Result<(), ViewError>;
    async fn set_page(&mut self, page: u32) -> Result<(), ViewError>;
    async fn open_file_list_view(&mut self, view_id: &str) -> Result<(), ViewError>;
}

/// A snapshot type that can be read from the view.
pub trait ViewSnapshot: Snapshot + Send + Sync {
    fn read<'a, V: ArchiveView + ?Sized>(view: &'a V) -> BoxFuture<'a, Result<Self, ViewError>>;
}

impl ViewSnapshot for BreadcrumbPath {
    fn read<'a, V: ArchiveView + ?Sized>(view: &'a V) -> BoxFuture<'a, Result<Self, ViewError>> {
        view.breadcrumbs()
    }
}

impl ViewSnapshot for Vec<NodeRef> {
    fn read<'a, V: ArchiveView + ?Sized>(view: &'a V) -> BoxFuture<'a, Result<Self, ViewError>> {
        view.node_refs()
    }
}

impl ViewSnapshot for Vec<FileRecord> {
    fn read<'a, V: ArchiveView + ?Sized>(view: &'a V) -> BoxFuture<'a, Result<Self, ViewError>> {
        view.file_records()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cookies of the authenticated browser session.
///
/// The view binding replaces the set after navigation; every download attempt
/// takes its own copy. A stale copy only costs that attempt.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Arc<RwLock<Vec<SessionCookie>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, cookies: Vec<SessionCookie>) {
        let mut guard = match self.cookies.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = cookies;
    }

    pub fn snapshot(&self) -> Vec<SessionCookie> {
        match self.cookies.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// `Cookie` request header value, or `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        let cookies = self.snapshot();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
