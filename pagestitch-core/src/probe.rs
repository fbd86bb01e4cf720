//! Single-URL check for viewer error pages
//!
//! Useful when tuning error markers for a new viewer: fetch one page and
//! see whether the loop would treat it as a conversion error.

use crate::config::AcquisitionOptions;
use crate::error::FetchError;
use crate::source::PageSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReport {
    /// The body contains this error marker
    ErrorContent { marker: String, body_len: usize },
    /// No marker found
    Clean { body_len: usize },
}

impl ProbeReport {
    pub fn is_error(&self) -> bool {
        matches!(self, ProbeReport::ErrorContent { .. })
    }
}

pub async fn probe<S: PageSource + ?Sized>(
    source: &S,
    url: &str,
    options: &AcquisitionOptions,
) -> Result<ProbeReport, FetchError> {
    let body = source.fetch(url).await?;
    Ok(match options.error_marker_in(&body) {
        Some(marker) => ProbeReport::ErrorContent {
            marker: marker.to_string(),
            body_len: body.len(),
        },
        None => ProbeReport::Clean {
            body_len: body.len(),
        },
    })
}
