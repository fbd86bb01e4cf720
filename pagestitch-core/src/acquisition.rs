//! The page acquisition loop
//!
//! Viewer endpoints do not say how many pages a document has. The loop walks
//! the counter upward from the first page and decides after every response
//! whether to keep going:
//!
//! - a transport failure or non-2xx status ends the run,
//! - a body carrying an error marker burns one retry and moves on to the next
//!   counter; once the budget is spent the run ends normally,
//! - a body that is not a decodable image ends the run,
//! - counters listed in `skip_pages` are never requested,
//! - nothing above `page_ceiling` is ever requested.
//!
//! Whatever was collected before the run ended is kept.

use crate::codec::{CompressedPage, PageEncoder};
use crate::config::AcquisitionOptions;
use crate::error::{FetchError, PageCodecError};
use crate::source::PageSource;
use crate::template::UrlTemplate;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Why an acquisition run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Network failure or non-2xx status
    Transport { counter: u64, message: String },
    /// The body could not be decoded or re-encoded
    Image { counter: u64, message: String },
    /// An error-content response arrived with no retries left
    RetriesExhausted { counter: u64 },
    /// The counter went past the configured ceiling
    CeilingReached { counter: u64 },
    /// The cancellation flag was raised
    Cancelled { counter: u64 },
}

impl StopReason {
    /// Counter value the loop was at when it stopped
    pub fn counter(&self) -> u64 {
        match self {
            StopReason::Transport { counter, .. }
            | StopReason::Image { counter, .. }
            | StopReason::RetriesExhausted { counter }
            | StopReason::CeilingReached { counter }
            | StopReason::Cancelled { counter } => *counter,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StopReason::Cancelled { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Transport { counter, message } => {
                write!(f, "transport error on page {counter}: {message}")
            }
            StopReason::Image { counter, message } => {
                write!(f, "image error on page {counter}: {message}")
            }
            StopReason::RetriesExhausted { counter } => {
                write!(f, "retry budget exhausted at page {counter}")
            }
            StopReason::CeilingReached { counter } => {
                write!(f, "page ceiling reached at page {counter}")
            }
            StopReason::Cancelled { counter } => write!(f, "cancelled before page {counter}"),
        }
    }
}

/// Result of one acquisition run
#[derive(Debug, Clone)]
pub struct AcquisitionOutcome {
    /// Pages in ascending counter order
    pub pages: Vec<CompressedPage>,
    pub stop: StopReason,
    /// Number of GET requests issued
    pub requests: u32,
}

impl AcquisitionOutcome {
    pub fn counters(&self) -> Vec<u64> {
        self.pages.iter().map(|p| p.counter).collect()
    }
}

/// Receives every decision the loop makes.
///
/// All methods have empty defaults so observers only implement what they
/// care about.
pub trait AcquisitionObserver: Send + Sync {
    fn page_processed(&self, _page: &CompressedPage, _url: &str) {}
    fn page_skipped(&self, _counter: u64) {}
    fn error_content(&self, _counter: u64, _marker: &str, _retries_left: u32) {}
    fn fetch_failed(&self, _counter: u64, _error: &FetchError) {}
    fn image_failed(&self, _counter: u64, _error: &PageCodecError) {}
    fn finished(&self, _stop: &StopReason, _pages: usize) {}
}

/// Default observer writing one `tracing` line per event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AcquisitionObserver for TracingObserver {
    fn page_processed(&self, page: &CompressedPage, url: &str) {
        info!(
            "Processed page {} ({}x{}, {} bytes) from {}",
            page.counter,
            page.width,
            page.height,
            page.len(),
            url
        );
    }

    fn page_skipped(&self, counter: u64) {
        info!("Skipping page {}", counter);
    }

    fn error_content(&self, counter: u64, marker: &str, retries_left: u32) {
        warn!(
            "Page {} returned error content ({:?}), moving on ({} retries left)",
            counter, marker, retries_left
        );
    }

    fn fetch_failed(&self, counter: u64, error: &FetchError) {
        warn!("Error on page {}: {}", counter, error);
    }

    fn image_failed(&self, counter: u64, error: &PageCodecError) {
        warn!("Page {} is not a usable image: {}", counter, error);
    }

    fn finished(&self, stop: &StopReason, pages: usize) {
        match stop {
            StopReason::RetriesExhausted { .. } => info!("Downloaded all pages ({} collected)", pages),
            other => info!("Acquisition stopped: {} ({} pages collected)", other, pages),
        }
    }
}

/// Cooperative cancellation shared between the loop and whoever drives it
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs the acquisition loop against a [`PageSource`]
pub struct PageAcquisition<'a, S: PageSource + ?Sized> {
    source: &'a S,
    encoder: PageEncoder,
    options: AcquisitionOptions,
    observer: Arc<dyn AcquisitionObserver>,
    cancel: CancellationFlag,
}

impl<'a, S: PageSource + ?Sized> PageAcquisition<'a, S> {
    pub fn new(source: &'a S, options: AcquisitionOptions, encoder: PageEncoder) -> Self {
        Self {
            source,
            encoder,
            options,
            observer: Arc::new(TracingObserver),
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AcquisitionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, template: &UrlTemplate) -> AcquisitionOutcome {
        let mut counter = self.options.first_page;
        let mut retries_left = self.options.retry_budget;
        let mut pages = Vec::new();
        let mut requests = 0u32;

        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled { counter };
            }
            if counter > self.options.page_ceiling {
                break StopReason::CeilingReached { counter };
            }
            if self.options.skip_pages.contains(&counter) {
                self.observer.page_skipped(counter);
                counter += 1;
                continue;
            }

            let url = template.render(counter);
            requests += 1;
            let body = match self.source.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    self.observer.fetch_failed(counter, &e);
                    break StopReason::Transport {
                        counter,
                        message: e.to_string(),
                    };
                }
            };

            if let Some(marker) = self.options.error_marker_in(&body) {
                if retries_left == 0 {
                    break StopReason::RetriesExhausted { counter };
                }
                retries_left -= 1;
                self.observer.error_content(counter, marker, retries_left);
                counter += 1;
                continue;
            }

            match self.encoder.encode_in_background(counter, body).await {
                Ok(page) => {
                    self.observer.page_processed(&page, &url);
                    pages.push(page);
                    counter += 1;
                }
                Err(e) => {
                    self.observer.image_failed(counter, &e);
                    break StopReason::Image {
                        counter,
                        message: e.to_string(),
                    };
                }
            }
        };

        self.observer.finished(&stop, pages.len());
        AcquisitionOutcome {
            pages,
            stop,
            requests,
        }
    }
}
