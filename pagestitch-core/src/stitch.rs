//! End-to-end pipeline: acquire pages, then assemble them

use crate::acquisition::{
    AcquisitionObserver, CancellationFlag, PageAcquisition, StopReason, TracingObserver,
};
use crate::assemble::DocumentAssembler;
use crate::codec::PageEncoder;
use crate::config::StitchConfig;
use crate::error::{Result, StitchError};
use crate::source::PageSource;
use crate::template::UrlTemplate;
use std::sync::Arc;
use tracing::info;

/// An assembled document together with how it came to be
#[derive(Debug, Clone)]
pub struct StitchedDocument {
    pub bytes: Vec<u8>,
    /// Counter of every page, in document order
    pub page_counters: Vec<u64>,
    pub stop: StopReason,
    pub requests: u32,
}

impl StitchedDocument {
    pub fn page_count(&self) -> usize {
        self.page_counters.len()
    }
}

/// Runs acquisition and assembly with one configuration
pub struct Stitcher<S> {
    source: S,
    config: StitchConfig,
    observer: Arc<dyn AcquisitionObserver>,
}

impl<S: PageSource> Stitcher<S> {
    pub fn new(source: S, config: StitchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AcquisitionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every available page behind `template` and assemble them.
    ///
    /// # Errors
    ///
    /// [`StitchError::Cancelled`] if `cancel` was raised during acquisition,
    /// [`StitchError::NoPagesProcessed`] if nothing usable was fetched, and
    /// assembly errors otherwise.
    pub async fn stitch(
        &self,
        template: &UrlTemplate,
        cancel: &CancellationFlag,
    ) -> Result<StitchedDocument> {
        info!("Stitching pages from {}", template);

        let encoder = PageEncoder::new(self.config.encode.clone());
        let outcome = PageAcquisition::new(&self.source, self.config.acquisition.clone(), encoder)
            .with_observer(self.observer.clone())
            .with_cancellation(cancel.clone())
            .run(template)
            .await;

        if outcome.stop.is_cancelled() {
            return Err(StitchError::Cancelled);
        }
        if outcome.pages.is_empty() {
            return Err(StitchError::NoPagesProcessed);
        }

        let page_counters = outcome.counters();
        let assembler = DocumentAssembler::new(self.config.assembly.clone());
        let pages = outcome.pages;
        let bytes = tokio::task::spawn_blocking(move || assembler.assemble(&pages))
            .await
            .map_err(|e| StitchError::Worker(e.to_string()))??;

        Ok(StitchedDocument {
            bytes,
            page_counters,
            stop: outcome.stop,
            requests: outcome.requests,
        })
    }
}
