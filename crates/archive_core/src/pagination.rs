/// Yields page numbers `1..=total` exactly once each, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    total: u32,
    next: u64,
}

impl PageCursor {
    pub fn new(total: u32) -> Self {
        Self { total, next: 1 }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Last page handed out, or `None` before the first.
    pub fn current(&self) -> Option<u32> {
        (self.next > 1).then(|| (self.next - 1) as u32)
    }
}

impl Iterator for PageCursor {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > u64::from(self.total) {
            return None;
        }
        let page = self.next as u32;
        self.next += 1;
        Some(page)
    }

    fn nth(&mut self, n: usize) -> Option<u32> {
        self.next = self
            .next
            .saturating_add(n as u64)
            .min(u64::from(self.total) + 1);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (u64::from(self.total) + 1 - self.next) as usize;
        (left, Some(left))
    }
}

/// A single-page view never needs a turn; otherwise turn when the UI is elsewhere.
pub fn needs_page_turn(total: u32, current: u32, target: u32) -> bool {
    total > 1 && current != target
}
