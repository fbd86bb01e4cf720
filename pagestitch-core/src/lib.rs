//! # pagestitch-core
//!
//! Rebuild a PDF from a document viewer that only serves one page image at a
//! time.
//!
//! ## Features
//!
//! - **URL templates**: `{counter}` placeholders substituted per page
//! - **Acquisition loop**: walks the page counter, retrying past viewer error
//!   pages and stopping on transport errors, undecodable bodies or a ceiling
//! - **Re-encoding**: every page normalized to RGB and written as JPEG
//! - **Assembly**: one PDF page per image, JPEG embedded as an image XObject
//! - **Transient files**: randomly named, deleted when the reader goes away
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagestitch_core::{CancellationFlag, HttpPageSource, StitchConfig, Stitcher, UrlTemplate};
//!
//! # async fn run() -> pagestitch_core::Result<()> {
//! let config = StitchConfig::default();
//! let source = HttpPageSource::new(&config.http)?;
//! let stitcher = Stitcher::new(source, config)?;
//!
//! let template = UrlTemplate::parse("https://viewer.example/view.php?page={counter}")?;
//! let doc = stitcher.stitch(&template, &CancellationFlag::new()).await?;
//! std::fs::write("book.pdf", &doc.bytes)?;
//! println!("{} pages", doc.page_count());
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod assemble;
pub mod codec;
pub mod config;
pub mod error;
pub mod probe;
pub mod source;
pub mod stitch;
pub mod template;
pub mod transient;

pub use acquisition::{
    AcquisitionObserver, AcquisitionOutcome, CancellationFlag, PageAcquisition, StopReason,
    TracingObserver,
};
pub use assemble::DocumentAssembler;
pub use codec::{CompressedPage, PageEncoder};
pub use config::{
    AcquisitionOptions, AssemblyOptions, EncodeOptions, HttpOptions, StitchConfig, StreamOptions,
    DEFAULT_ERROR_MARKERS,
};
pub use error::{ConfigError, FetchError, PageCodecError, Result, StitchError};
pub use probe::{probe, ProbeReport};
pub use source::{HttpPageSource, PageSource};
pub use stitch::{StitchedDocument, Stitcher};
pub use template::UrlTemplate;
pub use transient::{remove_if_exists, ChunkedDocument, TransientFile};

/// Current version of pagestitch-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
