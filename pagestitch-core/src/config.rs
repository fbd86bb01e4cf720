//! Tunables for fetching, encoding, assembling and streaming
//!
//! Every knob defaults to the behavior the viewer scraper has always had;
//! the only exception is certificate validation, which is on unless
//! [`HttpOptions::accept_invalid_certs`] is set.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Body fragments that mark a "page could not be converted" response
pub const DEFAULT_ERROR_MARKERS: [&str; 2] = ["Error converting document", "errors"];

/// Options for the page acquisition loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionOptions {
    /// Counter value of the first page requested
    pub first_page: u64,
    /// Number of error-content responses tolerated before the loop stops
    pub retry_budget: u32,
    /// Counters that are never requested
    pub skip_pages: BTreeSet<u64>,
    /// Highest counter ever requested
    pub page_ceiling: u64,
    /// Substrings that classify a response body as a conversion error
    pub error_markers: Vec<String>,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self {
            first_page: 1,
            retry_budget: 3,
            skip_pages: BTreeSet::from([43]),
            page_ceiling: 500,
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl AcquisitionOptions {
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_page_ceiling(mut self, ceiling: u64) -> Self {
        self.page_ceiling = ceiling;
        self
    }

    pub fn with_skip_pages(mut self, pages: impl IntoIterator<Item = u64>) -> Self {
        self.skip_pages = pages.into_iter().collect();
        self
    }

    pub fn with_first_page(mut self, first: u64) -> Self {
        self.first_page = first;
        self
    }

    pub fn with_error_markers<S: Into<String>>(mut self, markers: impl IntoIterator<Item = S>) -> Self {
        self.error_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the first configured marker found in `body`
    pub fn error_marker_in(&self, body: &[u8]) -> Option<&str> {
        self.error_markers
            .iter()
            .find(|marker| contains_bytes(body, marker.as_bytes()))
            .map(String::as_str)
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// How each page is re-encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Scale applied to both dimensions; 1.0 leaves the image untouched
    pub resize_factor: f32,
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            resize_factor: 1.0,
            jpeg_quality: 30,
        }
    }
}

impl EncodeOptions {
    pub fn with_resize_factor(mut self, factor: f32) -> Self {
        self.resize_factor = factor;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

/// PDF assembly options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Resolution used to turn pixels into page points
    pub dpi: f64,
    pub title: Option<String>,
    pub creator: String,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            title: None,
            creator: format!("pagestitch {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AssemblyOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }
}

/// HTTP client options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// Skip TLS certificate validation. Only for viewers with broken
    /// certificates whose traffic you are willing to expose.
    pub accept_invalid_certs: bool,
    /// Per-request timeout in seconds; `None` waits forever
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            timeout_secs: None,
            user_agent: format!("pagestitch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpOptions {
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Where transient documents live and how they are read back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    pub chunk_size: usize,
    pub temp_dir: PathBuf,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl StreamOptions {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }
}

/// Everything a [`crate::Stitcher`] run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    pub acquisition: AcquisitionOptions,
    pub encode: EncodeOptions,
    pub assembly: AssemblyOptions,
    pub http: HttpOptions,
    pub stream: StreamOptions,
}

impl StitchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encode.jpeg_quality) {
            return Err(ConfigError::Quality(self.encode.jpeg_quality));
        }
        let factor = self.encode.resize_factor;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::ResizeFactor(factor));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::ChunkSize);
        }
        if self.acquisition.first_page == 0 {
            return Err(ConfigError::FirstPage);
        }
        let dpi = self.assembly.dpi;
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(ConfigError::Dpi(dpi));
        }
        Ok(())
    }
}
