use thiserror::Error;

/// Document-level failures.
///
/// Per-page problems never show up here: the acquisition loop turns them into
/// a [`crate::StopReason`] and keeps whatever it already collected.
#[derive(Error, Debug)]
pub enum StitchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No pages were processed")]
    NoPagesProcessed,

    #[error("Cannot assemble a document without pages")]
    EmptyDocument,

    #[error("Page {counter} is not a JPEG")]
    InvalidPage { counter: u64 },

    #[error("Document assembly failed: {0}")]
    Assembly(String),

    #[error("Background task failed: {0}")]
    Worker(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, StitchError>;

impl From<lopdf::Error> for StitchError {
    fn from(err: lopdf::Error) -> Self {
        StitchError::Assembly(err.to_string())
    }
}

/// Failure to retrieve one page body.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. } | FetchError::Status { url, .. } => url,
        }
    }
}

/// Failure to turn a fetched body into a compressed page.
#[derive(Error, Debug)]
pub enum PageCodecError {
    #[error("cannot decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("cannot encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("encoder task failed: {0}")]
    Worker(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("JPEG quality must be within 1..=100, got {0}")]
    Quality(u8),

    #[error("resize factor must be finite and positive, got {0}")]
    ResizeFactor(f32),

    #[error("chunk size must be greater than zero")]
    ChunkSize,

    #[error("first page must be at least 1")]
    FirstPage,

    #[error("page DPI must be finite and positive, got {0}")]
    Dpi(f64),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}
