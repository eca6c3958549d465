//! Fetch gating
//!
//! This module keeps paginated fetches well-behaved under rapid UI triggers:
//! - at most one fetch in flight per cursor
//! - no fetch once the cursor is exhausted
//! - trailing-edge debounce for scroll-driven triggers
//! - stale pages (fetched before a reset) never move the cursor

use crate::{cursor::PageCursor, Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

/// Offset/limit pair handed to a fetch function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of items to skip
    pub offset: u32,
    /// Maximum number of items to return
    pub limit: u32,
    generation: u64,
}

impl PageRequest {
    /// Build a request outside of any gate (generation 0).
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit,
            generation: 0,
        }
    }
}

/// What happened to a trigger.
#[derive(Debug)]
pub enum Trigger {
    /// The fetch ran and returned `count` items
    Fetched {
        /// Raw page length returned by the fetch
        count: usize,
        /// Cursor exhaustion after the page was recorded
        exhausted: bool,
    },
    /// The fetch ran and failed; the cursor is untouched
    Failed(Error),
    /// Another fetch for this cursor is already in flight
    Busy,
    /// The cursor has no more pages
    Exhausted,
    /// A later debounced trigger replaced this one
    Superseded,
}

impl Trigger {
    /// Whether the underlying fetch function was invoked.
    pub fn did_fetch(&self) -> bool {
        matches!(self, Trigger::Fetched { .. } | Trigger::Failed(_))
    }
}

/// Trailing-edge debounce timer.
///
/// Every call cancels the timer of the previous call, so only the most
/// recent call in a quiescence window settles.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    supersede: Notify,
}

impl Debouncer {
    /// Create a debouncer with the given quiescence window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            supersede: Notify::new(),
        }
    }

    /// Wait out the window. Returns `false` if a newer call arrived first.
    pub async fn settle(&self) -> bool {
        self.supersede.notify_waiters();
        // Created after notify_waiters so this call only sees later callers.
        let superseded = self.supersede.notified();
        tokio::select! {
            _ = tokio::time::sleep(self.window) => true,
            _ = superseded => false,
        }
    }
}

/// Clears the in-flight flag on every exit path, including cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serializes fetches for one [`PageCursor`].
///
/// # Example
/// ```rust,no_run
/// use skylight_sync::gate::{FetchGate, Trigger};
///
/// # async fn example() {
/// let gate = FetchGate::new(12);
/// let outcome = gate
///     .trigger(|page| async move {
///         // call the server with page.offset / page.limit
///         Ok(page.limit as usize)
///     })
///     .await;
/// assert!(matches!(outcome, Trigger::Fetched { count: 12, exhausted: false }));
/// # }
/// ```
#[derive(Debug)]
pub struct FetchGate {
    cursor: Mutex<PageCursor>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    debouncer: Debouncer,
}

impl FetchGate {
    /// Default debounce window for scroll-driven triggers
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

    /// Create a gate over a fresh cursor with the default debounce window.
    pub fn new(limit: u32) -> Self {
        Self::with_debounce(limit, Self::DEFAULT_DEBOUNCE)
    }

    /// Create a gate with a custom debounce window.
    pub fn with_debounce(limit: u32, window: Duration) -> Self {
        Self {
            cursor: Mutex::new(PageCursor::new(limit)),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            debouncer: Debouncer::new(window),
        }
    }

    /// Snapshot of the cursor.
    pub async fn cursor(&self) -> PageCursor {
        *self.cursor.lock().await
    }

    /// Whether a fetch is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether `page` was issued since the last reset.
    pub fn is_current(&self, page: &PageRequest) -> bool {
        self.generation.load(Ordering::Acquire) == page.generation
    }

    /// Rewind the cursor and invalidate any page still in flight.
    pub async fn reset(&self) {
        let mut cursor = self.cursor.lock().await;
        cursor.reset();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Fetch the next page unless busy or exhausted.
    pub async fn trigger<F, Fut>(&self, fetch: F) -> Trigger
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        self.run(false, fetch).await
    }

    /// Rewind the cursor and fetch the first page, unless busy.
    pub async fn trigger_reset<F, Fut>(&self, fetch: F) -> Trigger
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        self.run(true, fetch).await
    }

    /// Debounced [`trigger`](Self::trigger): fires only if no newer debounced
    /// trigger arrives within the window.
    pub async fn trigger_debounced<F, Fut>(&self, fetch: F) -> Trigger
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        if !self.debouncer.settle().await {
            return Trigger::Superseded;
        }
        self.run(false, fetch).await
    }

    async fn run<F, Fut>(&self, reset: bool, fetch: F) -> Trigger
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Fetch already in flight, ignoring trigger");
            return Trigger::Busy;
        };

        let page = {
            let mut cursor = self.cursor.lock().await;
            if reset {
                cursor.reset();
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            if cursor.exhausted {
                debug!("Cursor exhausted at offset {}", cursor.offset);
                return Trigger::Exhausted;
            }
            PageRequest {
                offset: cursor.offset,
                limit: cursor.limit,
                generation: self.generation.load(Ordering::Acquire),
            }
        };

        match fetch(page).await {
            Ok(count) => {
                let mut cursor = self.cursor.lock().await;
                if self.is_current(&page) {
                    cursor.advance(count);
                } else {
                    debug!("Discarding cursor advance for a page fetched before reset");
                }
                Trigger::Fetched {
                    count,
                    exhausted: cursor.exhausted,
                }
            }
            Err(e) => {
                warn!("Fetch at offset {} failed: {}", page.offset, e);
                Trigger::Failed(e)
            }
        }
    }
}
