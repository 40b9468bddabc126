//! Bounded polling for UI state changes.
//!
//! After every navigation action the UI updates asynchronously. The crawler
//! re-reads the affected snapshot until it differs from the value seen before
//! the action, then continues with whatever it read last.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use archive_core::Snapshot;
use crawl_logging::{crawl_debug, crawl_trace, crawl_warn};
use tokio::time::{sleep, Instant};

use crate::{ArchiveView, ViewSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(1),
        }
    }
}

/// Result of a poll. Both variants carry the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    Changed(T),
    /// No change within the timeout; the value is the last successful read,
    /// or the empty snapshot if no read succeeded.
    TimedOut(T),
}

impl<T> Observed<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Observed::Changed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Observed::Changed(value) | Observed::TimedOut(value) => value,
        }
    }
}

/// Call `extract` until its result differs from `previous` or the timeout elapses.
///
/// Read errors are logged and retried. An empty first read is treated as a
/// transitional state and polled once more before it can count as a change.
pub async fn wait_for_change<T, E, F, Fut>(
    previous: &T,
    mut extract: F,
    settings: &PollSettings,
) -> Observed<T>
where
    T: Snapshot,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let mut latest: Option<T> = None;
    let mut first_read = true;

    while started.elapsed() < settings.timeout {
        match extract().await {
            Ok(snapshot) => {
                let transitional = first_read && snapshot.is_empty();
                first_read = false;
                if transitional {
                    crawl_debug!("empty snapshot, retry once");
                } else if snapshot != *previous {
                    crawl_debug!("snapshot updated: {:?} -> {:?}", previous, snapshot);
                    return Observed::Changed(snapshot);
                } else {
                    crawl_trace!("snapshot still the same: {:?}", snapshot);
                }
                latest = Some(snapshot);
            }
            Err(err) => crawl_debug!("failed to read snapshot, retry: {}", err),
        }
        sleep(settings.interval).await;
    }

    crawl_warn!(
        "no change observed within {:?}: {:?} -> {:?}",
        settings.timeout,
        previous,
        latest
    );
    Observed::TimedOut(latest.unwrap_or_default())
}

/// Wait until the view's `T` snapshot moves away from `previous`.
pub async fn observe<V, T>(view: &V, previous: &T, settings: &PollSettings) -> Observed<T>
where
    V: ArchiveView + ?Sized,
    T: ViewSnapshot,
{
    wait_for_change(previous, move || T::read(view), settings).await
}
