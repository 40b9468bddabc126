use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use archive_core::FileRecord;
use crawl_logging::{crawl_debug, crawl_error, crawl_info, crawl_warn};

use crate::types::NoopSink;
use crate::{
    AtomicFileWriter, CrawlEvent, PageRequest, PageResponse, PageSource, ProgressSink,
    ResumeLedger,
};

/// Upper bound on pages tried for one multi-page document.
pub const DEFAULT_MAX_DOCUMENT_PAGES: u32 = 3000;

/// File name of a page without its extension: `id-{id}-page-{page}`.
pub fn page_stem(file_id: &str, page: u32) -> String {
    format!("id-{file_id}-page-{page}")
}

/// Map a declared content type to a file extension; unknown types are `jpg`.
pub fn image_extension(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("jpeg") || content_type.contains("jpg") {
        "jpg"
    } else if content_type.contains("png") {
        "png"
    } else if content_type.contains("gif") {
        "gif"
    } else {
        "jpg"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A file with the page's stem already exists; nothing was fetched.
    AlreadyPresent(PathBuf),
    Saved(PathBuf),
    /// A response arrived but was not a usable page.
    Rejected { status: u16, declared_length: Option<u64> },
    /// No response after all attempts, or the page could not be written.
    Failed,
}

impl PageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PageOutcome::AlreadyPresent(_) | PageOutcome::Saved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadReport {
    pub files_completed: u32,
    /// Records skipped because their marker already existed.
    pub files_skipped: u32,
    /// Completed records for which not a single page succeeded.
    pub files_without_pages: u32,
    pub pages_saved: u32,
    pub pages_present: u32,
}

impl DownloadReport {
    pub fn merge(&mut self, other: DownloadReport) {
        self.files_completed += other.files_completed;
        self.files_skipped += other.files_skipped;
        self.files_without_pages += other.files_without_pages;
        self.pages_saved += other.pages_saved;
        self.pages_present += other.pages_present;
    }
}

/// Downloads the pages of file records, skipping what earlier runs finished.
pub struct FileDownloader<S> {
    source: S,
    ledger: Arc<dyn ResumeLedger>,
    max_document_pages: u32,
    sink: Arc<dyn ProgressSink>,
    stop: Arc<AtomicBool>,
}

impl<S: PageSource> FileDownloader<S> {
    pub fn new(source: S, ledger: Arc<dyn ResumeLedger>) -> Self {
        Self {
            source,
            ledger,
            max_document_pages: DEFAULT_MAX_DOCUMENT_PAGES,
            sink: Arc::new(NoopSink),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_document_pages(mut self, max_document_pages: u32) -> Self {
        self.max_document_pages = max_document_pages;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub(crate) fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn ResumeLedger> {
        &self.ledger
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Download every record not yet marked complete in `directory`.
    ///
    /// A record is marked complete once its pages are exhausted, even if none
    /// of them succeeded. A stop request leaves the current record unmarked.
    pub async fn download_all(&self, records: &[FileRecord], directory: &Path) -> DownloadReport {
        let mut report = DownloadReport::default();
        let existing = ExistingPages::scan(directory);

        for record in records {
            if self.ledger.is_done(directory, &record.id) {
                crawl_debug!("Skip processed file {} in {:?}", record.id, directory);
                report.files_skipped += 1;
                continue;
            }

            let page_limit = if record.is_multi_page() {
                self.max_document_pages
            } else {
                1
            };

            let mut pages = 0;
            for page in 0..page_limit {
                if self.stopped() {
                    crawl_info!("Stop requested; file {} left unmarked", record.id);
                    return report;
                }
                match self
                    .fetch_missing(&record.id, page, directory, &existing)
                    .await
                {
                    PageOutcome::Saved(_) => report.pages_saved += 1,
                    PageOutcome::AlreadyPresent(_) => report.pages_present += 1,
                    PageOutcome::Rejected { .. } | PageOutcome::Failed => break,
                }
                pages += 1;
            }

            if pages == 0 {
                crawl_warn!(
                    "No pages downloaded for file {}; marking it complete anyway",
                    record.id
                );
                report.files_without_pages += 1;
            }
            if let Err(err) = self.ledger.mark_done(directory, &record.id) {
                crawl_error!("Failed to mark file {} in {:?}: {}", record.id, directory, err);
            }
            report.files_completed += 1;
            self.sink.emit(CrawlEvent::FileCompleted {
                file_id: record.id.clone(),
                pages,
            });
        }

        report
    }

    /// Fetch one page into `directory` unless a file for it already exists.
    pub async fn download_page(&self, file_id: &str, page: u32, directory: &Path) -> PageOutcome {
        let existing = ExistingPages::scan(directory);
        self.fetch_missing(file_id, page, directory, &existing).await
    }

    async fn fetch_missing(
        &self,
        file_id: &str,
        page: u32,
        directory: &Path,
        existing: &ExistingPages,
    ) -> PageOutcome {
        let stem = page_stem(file_id, page);
        if let Some(path) = existing.get(&stem) {
            crawl_debug!("File {} already downloaded. Skip.", stem);
            return PageOutcome::AlreadyPresent(path.to_path_buf());
        }

        crawl_info!("Download file {} page {} into {:?}", file_id, page, directory);
        let response = match self.source.fetch_page(&PageRequest::new(file_id, page)).await {
            Ok(response) => response,
            Err(err) => {
                crawl_warn!("Giving up on file {} page {}: {}", file_id, page, err);
                return PageOutcome::Failed;
            }
        };

        self.store(file_id, page, &stem, response, directory)
    }

    fn store(
        &self,
        file_id: &str,
        page: u32,
        stem: &str,
        response: PageResponse,
        directory: &Path,
    ) -> PageOutcome {
        let declared = response.declared_length.unwrap_or(0);
        crawl_debug!(
            "File: {} length: {} content-type: {:?}",
            stem,
            declared,
            response.content_type
        );
        if response.status != 200 || declared == 0 {
            return PageOutcome::Rejected {
                status: response.status,
                declared_length: response.declared_length,
            };
        }

        let filename = format!(
            "{stem}.{}",
            image_extension(response.content_type.as_deref())
        );
        let writer = AtomicFileWriter::new(directory.to_path_buf());
        match writer.write(&filename, &response.bytes) {
            Ok(path) => {
                self.sink.emit(CrawlEvent::PageSaved {
                    file_id: file_id.to_string(),
                    page,
                    path: path.clone(),
                });
                PageOutcome::Saved(path)
            }
            Err(err) => {
                crawl_error!("Failed to write {} into {:?}: {}", filename, directory, err);
                PageOutcome::Failed
            }
        }
    }
}

/// Page files present in a directory, keyed by exact file stem.
struct ExistingPages(HashMap<String, PathBuf>);

impl ExistingPages {
    fn scan(directory: &Path) -> Self {
        let mut pages = HashMap::new();
        let Ok(entries) = fs::read_dir(directory) else {
            return Self(pages);
        };
        for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                pages.entry(stem.to_string()).or_insert_with(|| path.clone());
            }
        }
        Self(pages)
    }

    fn get(&self, stem: &str) -> Option<&Path> {
        self.0.get(stem).map(PathBuf::as_path)
    }
}
