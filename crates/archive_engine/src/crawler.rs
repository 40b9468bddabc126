//! Depth-first traversal of the archive hierarchy.
//!
//! The UI shows one node at a time, so descent and backtracking are real
//! navigation: click a child link to go down, click the last breadcrumb to go
//! up. The traversal keeps an explicit stack of [`NodeFrame`]s instead of
//! recursing; each frame remembers which page of its node is being processed
//! and which children on that page are still to be visited.
//!
//! Per page the order is fixed: every file list reachable from the page is
//! drained first, then the child nodes are visited in list order. A node's
//! directory marker is written only after all of its pages are processed and
//! nothing below it failed.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use archive_core::{BreadcrumbPath, FileRecord, NodeRef};
use crawl_logging::{crawl_error, crawl_info, crawl_warn};

use crate::types::NoopSink;
use crate::{
    build_directory, observe, ArchiveView, CookieJar, CrawlConfig, CrawlError, CrawlEvent,
    DownloadReport, FileDownloader, MarkerFileLedger, PageSource, PaginationWalker, PollSettings,
    ProgressSink, ReqwestPageSource, ResumeLedger, ViewError, DIRECTORY_MARKER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlReport {
    pub nodes_completed: u32,
    /// Nodes skipped because an earlier run finished them.
    pub nodes_skipped: u32,
    pub nodes_incomplete: u32,
    pub branches_abandoned: u32,
    pub downloads: DownloadReport,
    pub stopped: bool,
}

/// Asks a running crawl to stop issuing navigation and downloads.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct NodeFrame {
    breadcrumbs: BreadcrumbPath,
    directory: PathBuf,
    pages: PaginationWalker,
    /// Latest node-list snapshot, used to confirm navigation.
    refs: Vec<NodeRef>,
    /// Children of the current page not yet visited.
    pending: VecDeque<NodeRef>,
    incomplete: bool,
}

enum Entry {
    Entered(NodeFrame),
    Skipped,
    Abandoned,
}

pub struct Crawler<V, S> {
    view: V,
    downloader: FileDownloader<S>,
    ledger: Arc<dyn ResumeLedger>,
    output_root: PathBuf,
    poll: PollSettings,
    sink: Arc<dyn ProgressSink>,
    stop: Arc<AtomicBool>,
    report: CrawlReport,
}

impl<V: ArchiveView> Crawler<V, ReqwestPageSource> {
    /// Crawler writing marker files and fetching pages over HTTP.
    pub fn from_config(view: V, cookies: CookieJar, config: &CrawlConfig) -> Self {
        let source = ReqwestPageSource::new(config.fetch_settings(), cookies);
        let downloader = FileDownloader::new(source, Arc::new(MarkerFileLedger))
            .with_max_document_pages(config.max_document_pages);
        Self::new(
            view,
            downloader,
            config.output_dir.clone(),
            config.poll_settings(),
        )
    }
}

impl<V: ArchiveView, S: PageSource> Crawler<V, S> {
    pub fn new(
        view: V,
        downloader: FileDownloader<S>,
        output_root: impl Into<PathBuf>,
        poll: PollSettings,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let ledger = downloader.ledger().clone();
        Self {
            view,
            downloader: downloader.with_stop_flag(stop.clone()),
            ledger,
            output_root: output_root.into(),
            poll,
            sink: Arc::new(NoopSink),
            stop,
            report: CrawlReport::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.downloader = self.downloader.with_sink(sink.clone());
        self.sink = sink;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Process everything below the position the UI currently shows.
    ///
    /// A view that already lists files is walked as a file list; otherwise the
    /// node hierarchy is traversed. Only loss of the session is an error.
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlError> {
        self.report = CrawlReport::default();

        crawl_info!("Detecting page type");
        let start = observe(&self.view, &BreadcrumbPath::default(), &self.poll)
            .await
            .into_inner();
        crawl_info!("Starting at {}", start);

        let files = tolerate(self.view.file_records().await, "read file records")?
            .unwrap_or_default();
        if files.is_empty() {
            crawl_info!("Browse node list");
            self.crawl_nodes().await?;
        } else {
            crawl_info!("Browse file list");
            self.walk_file_list().await?;
        }

        self.report.stopped = self.stopped();
        let report = std::mem::take(&mut self.report);
        crawl_info!(
            "Crawl finished: {} nodes completed, {} skipped, {} incomplete, {} files downloaded",
            report.nodes_completed,
            report.nodes_skipped,
            report.nodes_incomplete,
            report.downloads.files_completed
        );
        Ok(report)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn abandon(&mut self) {
        self.report.branches_abandoned += 1;
    }

    async fn crawl_nodes(&mut self) -> Result<(), CrawlError> {
        let mut stack = match self.enter_node().await? {
            Entry::Entered(frame) => vec![frame],
            Entry::Skipped | Entry::Abandoned => return Ok(()),
        };

        while let Some(frame) = stack.last_mut() {
            if self.stopped() {
                crawl_info!("Stop requested; {} nodes left unfinished", stack.len());
                return Ok(());
            }

            if let Some(node) = frame.pending.pop_front() {
                match self.descend(frame, &node).await? {
                    Some(Entry::Entered(child)) => stack.push(child),
                    Some(Entry::Skipped) => self.return_to_parent(frame).await?,
                    Some(Entry::Abandoned) => {
                        frame.incomplete = true;
                        self.return_to_parent(frame).await?;
                    }
                    None => frame.incomplete = true,
                }
                continue;
            }

            if let Some(page) = frame.pages.next_page() {
                self.process_page(frame, page).await?;
                continue;
            }

            let Some(finished) = stack.pop() else { break };
            self.finish_node(&finished);
            if let Some(parent) = stack.last_mut() {
                if finished.incomplete {
                    crawl_warn!(
                        "{} stays unmarked until {} completes",
                        parent.breadcrumbs,
                        finished.breadcrumbs
                    );
                }
                parent.incomplete |= finished.incomplete;
                self.return_to_parent(parent).await?;
            }
        }
        Ok(())
    }

    /// Read the node the UI shows and open a frame for it.
    async fn enter_node(&mut self) -> Result<Entry, CrawlError> {
        let Some(breadcrumbs) = tolerate(self.view.breadcrumbs().await, "read breadcrumbs")?
        else {
            self.abandon();
            return Ok(Entry::Abandoned);
        };
        let directory = match build_directory(&self.output_root, &breadcrumbs) {
            Ok(directory) => directory,
            Err(err) => {
                crawl_error!("Failed to create directory for {}: {}", breadcrumbs, err);
                self.abandon();
                return Ok(Entry::Abandoned);
            }
        };

        if self.ledger.is_done(&directory, DIRECTORY_MARKER) {
            crawl_info!("Dir already processed: {:?}", directory);
            self.report.nodes_skipped += 1;
            self.sink.emit(CrawlEvent::NodeSkipped { directory });
            return Ok(Entry::Skipped);
        }

        let Some(total) = tolerate(self.view.total_pages().await, "read total pages")? else {
            self.abandon();
            return Ok(Entry::Abandoned);
        };
        let (refs, incomplete) = match tolerate(self.view.node_refs().await, "read node refs")? {
            Some(refs) => (refs, false),
            None => {
                self.abandon();
                (Vec::new(), true)
            }
        };

        crawl_info!("Iterate within node: {}", breadcrumbs);
        self.sink.emit(CrawlEvent::NodeEntered {
            breadcrumbs: breadcrumbs.clone(),
        });
        Ok(Entry::Entered(NodeFrame {
            breadcrumbs,
            directory,
            pages: PaginationWalker::new(total),
            refs,
            pending: VecDeque::new(),
            incomplete,
        }))
    }

    async fn process_page(&mut self, frame: &mut NodeFrame, page: u32) -> Result<(), CrawlError> {
        crawl_info!("Process page: {}", page);
        let turned = frame
            .pages
            .turn_to(&mut self.view, page, &mut frame.refs, &self.poll)
            .await;
        if tolerate(turned, "turn page")?.is_none() {
            frame.incomplete = true;
            self.abandon();
            return Ok(());
        }

        if frame.refs.is_empty() {
            crawl_info!("No nodes.");
        } else {
            let names: Vec<&str> = frame.refs.iter().map(|r| r.name.as_str()).collect();
            crawl_info!("Found nodes: {}", names.join(", "));
        }

        let views = match tolerate(self.view.file_list_views().await, "find file list views")? {
            Some(views) => views,
            None => {
                frame.incomplete = true;
                self.abandon();
                Vec::new()
            }
        };
        crawl_info!("Found {} file views", views.len());
        for view_id in views {
            if self.stopped() {
                return Ok(());
            }
            self.drain_file_view(frame, &view_id).await?;
        }

        frame.pending = frame.refs.iter().cloned().collect();
        Ok(())
    }

    /// Open a file list from the current page, download it, and come back.
    async fn drain_file_view(
        &mut self,
        frame: &mut NodeFrame,
        view_id: &str,
    ) -> Result<(), CrawlError> {
        crawl_info!("Open file list {}", view_id);
        let opened = self.view.open_file_list_view(view_id).await;
        if tolerate(opened, "open file list")?.is_none() {
            frame.incomplete = true;
            self.abandon();
            return Ok(());
        }
        let list_breadcrumbs = observe(&self.view, &frame.breadcrumbs, &self.poll)
            .await
            .into_inner();

        if !self.walk_file_list().await? {
            frame.incomplete = true;
        }

        if !self.ascend().await? {
            frame.incomplete = true;
        }
        observe(&self.view, &list_breadcrumbs, &self.poll).await;
        frame.refs = observe(&self.view, &Vec::new(), &self.poll)
            .await
            .into_inner();
        self.reassert_page(frame).await
    }

    /// Download every page of the file list the UI shows.
    ///
    /// Returns whether the whole list was processed.
    async fn walk_file_list(&mut self) -> Result<bool, CrawlError> {
        let Some(breadcrumbs) = tolerate(self.view.breadcrumbs().await, "read breadcrumbs")?
        else {
            self.abandon();
            return Ok(false);
        };
        let directory = match build_directory(&self.output_root, &breadcrumbs) {
            Ok(directory) => directory,
            Err(err) => {
                crawl_error!("Failed to create directory for {}: {}", breadcrumbs, err);
                self.abandon();
                return Ok(false);
            }
        };
        let Some(total) = tolerate(self.view.total_pages().await, "read total pages")? else {
            self.abandon();
            return Ok(false);
        };

        crawl_info!("File list {} into {:?}", breadcrumbs, directory);
        let mut records: Vec<FileRecord> = observe(&self.view, &Vec::new(), &self.poll)
            .await
            .into_inner();
        let mut pages = PaginationWalker::new(total);
        let mut complete = true;

        while let Some(page) = pages.next_page() {
            if self.stopped() {
                return Ok(false);
            }
            let turned = pages
                .turn_to(&mut self.view, page, &mut records, &self.poll)
                .await;
            if tolerate(turned, "turn file list page")?.is_none() {
                complete = false;
                self.abandon();
                continue;
            }
            crawl_info!("File list page {}: {} files", page, records.len());
            let report = self.downloader.download_all(&records, &directory).await;
            self.report.downloads.merge(report);
        }

        Ok(complete && !self.stopped())
    }

    async fn descend(
        &mut self,
        frame: &NodeFrame,
        node: &NodeRef,
    ) -> Result<Option<Entry>, CrawlError> {
        crawl_info!("Click down {}", node);
        if tolerate(self.view.descend_into(&node.id).await, "descend")?.is_none() {
            self.abandon();
            return Ok(None);
        }
        observe(&self.view, &frame.breadcrumbs, &self.poll).await;
        observe(&self.view, &frame.refs, &self.poll).await;
        self.enter_node().await.map(Some)
    }

    /// Leave the child the UI shows and restore `parent`'s page.
    async fn return_to_parent(&mut self, parent: &mut NodeFrame) -> Result<(), CrawlError> {
        let child_breadcrumbs = tolerate(self.view.breadcrumbs().await, "read breadcrumbs")?
            .unwrap_or_default();
        let child_refs = tolerate(self.view.node_refs().await, "read node refs")?
            .unwrap_or_default();

        if !self.ascend().await? {
            parent.incomplete = true;
        }
        observe(&self.view, &child_breadcrumbs, &self.poll).await;
        parent.refs = observe(&self.view, &child_refs, &self.poll)
            .await
            .into_inner();
        self.reassert_page(parent).await
    }

    async fn ascend(&mut self) -> Result<bool, CrawlError> {
        crawl_info!("Click up");
        let ascended = tolerate(self.view.ascend_one_level().await, "ascend")?.is_some();
        if !ascended {
            self.abandon();
        }
        Ok(ascended)
    }

    /// Returning to a node may reset its pagination; go back to the current page.
    async fn reassert_page(&mut self, frame: &mut NodeFrame) -> Result<(), CrawlError> {
        let Some(page) = frame.pages.current() else {
            return Ok(());
        };
        let turned = frame
            .pages
            .turn_to(&mut self.view, page, &mut frame.refs, &self.poll)
            .await;
        if tolerate(turned, "restore page")?.is_none() {
            frame.incomplete = true;
            self.abandon();
        }
        Ok(())
    }

    fn finish_node(&mut self, frame: &NodeFrame) {
        let directory = frame.directory.clone();
        if frame.incomplete {
            crawl_warn!(
                "Node {} incomplete; leaving it for the next run",
                frame.breadcrumbs
            );
            self.report.nodes_incomplete += 1;
            self.sink.emit(CrawlEvent::NodeIncomplete { directory });
            return;
        }

        if let Err(err) = self.ledger.mark_done(&directory, DIRECTORY_MARKER) {
            crawl_error!("Failed to mark {:?} as processed: {}", directory, err);
        }
        self.report.nodes_completed += 1;
        self.sink.emit(CrawlEvent::NodeCompleted { directory });
    }
}

/// Log a non-fatal view failure and turn it into `None`.
fn tolerate<T>(result: Result<T, ViewError>, action: &str) -> Result<Option<T>, CrawlError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ViewError::SessionLost(message)) => {
            crawl_error!("Session lost while trying to {}: {}", action, message);
            Err(CrawlError::SessionLost(message))
        }
        Err(err) => {
            crawl_warn!("Failed to {}: {}", action, err);
            Ok(None)
        }
    }
}
