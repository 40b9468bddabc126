#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use archive_core::{BreadcrumbPath, FileRecord, NodeRef};
use archive_engine::{
    ArchiveView, CrawlEvent, FetchError, PageRequest, PageResponse, PageSource, ProgressSink,
    StopHandle, ViewError,
};

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub name: String,
    pub children: Vec<FakeNode>,
    pub files: Vec<FileRecord>,
}

pub fn node(name: &str, children: Vec<FakeNode>) -> FakeNode {
    FakeNode {
        name: name.to_string(),
        children,
        files: Vec::new(),
    }
}

pub fn with_files(name: &str, files: Vec<FileRecord>) -> FakeNode {
    FakeNode {
        name: name.to_string(),
        children: Vec::new(),
        files,
    }
}

pub fn link_id(name: &str) -> String {
    format!("lnk-{name}")
}

pub fn view_id(name: &str) -> String {
    format!("view-{name}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Descend(String),
    Ascend,
    SetPage(u32),
    OpenFiles(String),
}

#[derive(Debug, Clone)]
struct UiState {
    path: Vec<usize>,
    showing_files: bool,
    page: u32,
}

/// In-memory archive UI. Navigation takes effect immediately; returning to a
/// node always resets it to page 1.
pub struct FakeArchive {
    root: FakeNode,
    page_size: usize,
    state: Mutex<UiState>,
    pub actions: Vec<Action>,
    failing_links: HashSet<String>,
    session_lost_on: Option<String>,
}

impl FakeArchive {
    pub fn new(root: FakeNode, page_size: usize) -> Self {
        Self {
            root,
            page_size,
            state: Mutex::new(UiState {
                path: Vec::new(),
                showing_files: false,
                page: 1,
            }),
            actions: Vec::new(),
            failing_links: HashSet::new(),
            session_lost_on: None,
        }
    }

    /// Start with the root's file list open.
    pub fn showing_files(root: FakeNode, page_size: usize) -> Self {
        let archive = Self::new(root, page_size);
        archive.state.lock().unwrap().showing_files = true;
        archive
    }

    /// Clicking this link fails with a missing control.
    pub fn break_link(mut self, name: &str) -> Self {
        self.failing_links.insert(link_id(name));
        self
    }

    pub fn lose_session_on(mut self, name: &str) -> Self {
        self.session_lost_on = Some(link_id(name));
        self
    }

    fn node_at(&self, path: &[usize]) -> &FakeNode {
        path.iter()
            .fold(&self.root, |node, &index| &node.children[index])
    }

    fn snapshot(&self) -> UiState {
        self.state.lock().unwrap().clone()
    }

    fn item_count(&self, state: &UiState) -> usize {
        let node = self.node_at(&state.path);
        if state.showing_files {
            node.files.len()
        } else {
            node.children.len()
        }
    }

    fn page_range(&self, state: &UiState, len: usize) -> std::ops::Range<usize> {
        let start = (state.page as usize - 1) * self.page_size;
        start.min(len)..(start + self.page_size).min(len)
    }

    fn visible_children(&self, state: &UiState) -> Vec<(usize, &FakeNode)> {
        if state.showing_files {
            return Vec::new();
        }
        let node = self.node_at(&state.path);
        let range = self.page_range(state, node.children.len());
        range.map(|index| (index, &node.children[index])).collect()
    }
}

#[async_trait::async_trait]
impl ArchiveView for FakeArchive {
    async fn breadcrumbs(&self) -> Result<BreadcrumbPath, ViewError> {
        let state = self.snapshot();
        let mut names = vec![self.root.name.clone()];
        let mut node = &self.root;
        for &index in &state.path {
            node = &node.children[index];
            names.push(node.name.clone());
        }
        Ok(BreadcrumbPath::new(names))
    }

    async fn node_refs(&self) -> Result<Vec<NodeRef>, ViewError> {
        let state = self.snapshot();
        Ok(self
            .visible_children(&state)
            .into_iter()
            .map(|(_, child)| NodeRef::new(child.name.clone(), link_id(&child.name)))
            .collect())
    }

    async fn file_records(&self) -> Result<Vec<FileRecord>, ViewError> {
        let state = self.snapshot();
        if !state.showing_files {
            return Ok(Vec::new());
        }
        let node = self.node_at(&state.path);
        Ok(node.files[self.page_range(&state, node.files.len())].to_vec())
    }

    async fn current_page(&self) -> Result<u32, ViewError> {
        Ok(self.snapshot().page)
    }

    async fn total_pages(&self) -> Result<u32, ViewError> {
        let state = self.snapshot();
        let count = self.item_count(&state);
        Ok(count.div_ceil(self.page_size).max(1) as u32)
    }

    async fn file_list_views(&self) -> Result<Vec<String>, ViewError> {
        let state = self.snapshot();
        Ok(self
            .visible_children(&state)
            .into_iter()
            .filter(|(_, child)| !child.files.is_empty())
            .map(|(_, child)| view_id(&child.name))
            .collect())
    }

    async fn descend_into(&mut self, node_id: &str) -> Result<(), ViewError> {
        self.actions.push(Action::Descend(node_id.to_string()));
        if self.session_lost_on.as_deref() == Some(node_id) {
            return Err(ViewError::SessionLost("browser closed".into()));
        }
        if self.failing_links.contains(node_id) {
            return Err(ViewError::MissingControl(node_id.to_string()));
        }
        let state = self.snapshot();
        let target = self
            .visible_children(&state)
            .into_iter()
            .find(|(_, child)| link_id(&child.name) == node_id)
            .map(|(index, _)| index)
            .ok_or_else(|| ViewError::MissingControl(node_id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.path.push(target);
        state.page = 1;
        Ok(())
    }

    async fn ascend_one_level(&mut self) -> Result<(), ViewError> {
        self.actions.push(Action::Ascend);
        let mut state = self.state.lock().unwrap();
        if state.path.pop().is_none() {
            return Err(ViewError::MissingControl("breadcrumb link".into()));
        }
        state.showing_files = false;
        state.page = 1;
        Ok(())
    }

    async fn set_page(&mut self, page: u32) -> Result<(), ViewError> {
        self.actions.push(Action::SetPage(page));
        let total = self.total_pages().await?;
        if page == 0 || page > total {
            return Err(ViewError::Navigation(format!("no page {page}")));
        }
        self.state.lock().unwrap().page = page;
        Ok(())
    }

    async fn open_file_list_view(&mut self, view: &str) -> Result<(), ViewError> {
        self.actions.push(Action::OpenFiles(view.to_string()));
        let state = self.snapshot();
        let target = self
            .visible_children(&state)
            .into_iter()
            .find(|(_, child)| view_id(&child.name) == view)
            .map(|(index, _)| index)
            .ok_or_else(|| ViewError::MissingControl(view.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.path.push(target);
        state.showing_files = true;
        state.page = 1;
        Ok(())
    }
}

pub const PAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0page";

/// Serves `pages` pages per file id as JPEG; everything else is a 404.
#[derive(Clone, Default)]
pub struct FakePageSource {
    pages: Arc<HashMap<String, u32>>,
    overrides: Arc<Mutex<HashMap<(String, u32), Result<PageResponse, FetchError>>>>,
    requests: Arc<Mutex<Vec<(String, u32)>>>,
}

impl FakePageSource {
    pub fn new(pages: &[(&str, u32)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(id, count)| (id.to_string(), *count))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn respond(&self, file_id: &str, page: u32, result: Result<PageResponse, FetchError>) {
        self.overrides
            .lock()
            .unwrap()
            .insert((file_id.to_string(), page), result);
    }

    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn image_response(content_type: &str) -> PageResponse {
    PageResponse {
        status: 200,
        content_type: Some(content_type.to_string()),
        declared_length: Some(PAGE_BYTES.len() as u64),
        bytes: PAGE_BYTES.to_vec(),
    }
}

pub fn not_found() -> PageResponse {
    PageResponse {
        status: 404,
        content_type: Some("text/html".to_string()),
        declared_length: None,
        bytes: b"not found".to_vec(),
    }
}

#[async_trait::async_trait]
impl PageSource for FakePageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.file_id.clone(), request.page));
        let key = (request.file_id.clone(), request.page);
        if let Some(result) = self.overrides.lock().unwrap().get(&key) {
            return result.clone();
        }
        match self.pages.get(&request.file_id) {
            Some(&count) if request.page < count => Ok(image_response("image/jpeg")),
            _ => Ok(not_found()),
        }
    }
}

#[derive(Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<CrawlEvent>>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: CrawlEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Raises the stop flag as soon as the first file is completed.
pub struct StopAfterFirstFile(pub StopHandle);

impl ProgressSink for StopAfterFirstFile {
    fn emit(&self, event: CrawlEvent) {
        if matches!(event, CrawlEvent::FileCompleted { .. }) {
            self.0.stop();
        }
    }
}
