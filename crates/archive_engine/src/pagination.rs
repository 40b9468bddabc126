use archive_core::{needs_page_turn, PageCursor};
use crawl_logging::{crawl_info, crawl_warn};

use crate::{observe, ArchiveView, PollSettings, ViewError, ViewSnapshot};

/// Drives a paginated view page by page.
///
/// The caller pulls pages with [`next_page`](Self::next_page), brings the UI
/// there with [`turn_to`](Self::turn_to) and then processes the page. Work done
/// between turns may navigate away, as long as it returns to the same view.
#[derive(Debug, Clone)]
pub struct PaginationWalker {
    cursor: PageCursor,
}

impl PaginationWalker {
    pub fn new(total_pages: u32) -> Self {
        crawl_info!("Total pages: {}", total_pages);
        Self {
            cursor: PageCursor::new(total_pages),
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.cursor.total()
    }

    pub fn next_page(&mut self) -> Option<u32> {
        self.cursor.next()
    }

    /// Page most recently handed out by `next_page`.
    pub fn current(&self) -> Option<u32> {
        self.cursor.current()
    }

    /// Make the UI show `page`, refreshing `content` once the page has loaded.
    pub async fn turn_to<V, T>(
        &self,
        view: &mut V,
        page: u32,
        content: &mut T,
        poll: &PollSettings,
    ) -> Result<(), ViewError>
    where
        V: ArchiveView + ?Sized,
        T: ViewSnapshot,
    {
        let current = view.current_page().await?;
        if !needs_page_turn(self.total_pages(), current, page) {
            return Ok(());
        }

        crawl_info!("Set page {} of {}", page, self.total_pages());
        view.set_page(page).await?;
        let observed = observe(&*view, content, poll).await;
        if !observed.is_changed() {
            crawl_warn!("page {} content did not change after turning", page);
        }
        *content = observed.into_inner();
        Ok(())
    }
}
