use crate::disposition::content_disposition;
use axum::{
    body::{Body, Bytes},
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pagestitch_core::{
    CancellationFlag, ChunkedDocument, HttpPageSource, PageSource, StitchConfig, StitchError,
    Stitcher, TransientFile, UrlTemplate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Request payload for the PDF creation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePdfRequest {
    /// Page URL with a `{counter}` placeholder
    pub url_template: String,
    /// Name offered to the client in `Content-Disposition`
    pub output_filename: String,
}

impl CreatePdfRequest {
    /// Parse a raw request body.
    ///
    /// Anything that is not a JSON object is invalid JSON; absent, empty or
    /// non-string fields count as missing.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| AppError::InvalidJson)?;
        let object = value.as_object().ok_or(AppError::InvalidJson)?;

        let field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (field("url_template"), field("output_filename")) {
            (Some(url_template), Some(output_filename)) => Ok(Self {
                url_template,
                output_filename,
            }),
            _ => Err(AppError::MissingParameters),
        }
    }
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// Application-specific error types for the API
#[derive(Debug)]
pub enum AppError {
    /// Body is not a JSON object
    InvalidJson,
    /// `url_template` or `output_filename` absent or empty
    MissingParameters,
    /// `url_template` does not parse
    InvalidTemplate(String),
    /// The acquisition loop collected nothing
    NoPagesProcessed,
    /// Anything else; the detail is logged, never returned
    Unexpected(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message returned to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::InvalidJson => "Invalid JSON data",
            AppError::MissingParameters => "Missing required parameters",
            AppError::InvalidTemplate(_) => "Invalid url_template",
            AppError::NoPagesProcessed => "No pages were processed",
            AppError::Unexpected(_) => "An unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unexpected(detail) => error!("Unexpected error: {}", detail),
            AppError::InvalidTemplate(detail) => info!("Rejected url_template: {}", detail),
            _ => {}
        }

        let error_response = ErrorResponse {
            error: self.public_message().to_string(),
        };

        (self.status(), Json(error_response)).into_response()
    }
}

impl From<StitchError> for AppError {
    fn from(err: StitchError) -> Self {
        match err {
            StitchError::NoPagesProcessed => AppError::NoPagesProcessed,
            StitchError::InvalidTemplate(detail) => AppError::InvalidTemplate(detail),
            other => AppError::Unexpected(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Unexpected(err.to_string())
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    stitcher: Arc<Stitcher<Arc<dyn PageSource>>>,
}

impl AppState {
    /// State backed by a real HTTP client built from `config.http`
    pub fn new(config: StitchConfig) -> Result<Self, StitchError> {
        let source = HttpPageSource::new(&config.http)?;
        Self::with_source(Arc::new(source), config)
    }

    pub fn with_source(
        source: Arc<dyn PageSource>,
        config: StitchConfig,
    ) -> Result<Self, StitchError> {
        Ok(Self {
            stitcher: Arc::new(Stitcher::new(source, config)?),
        })
    }

    pub fn config(&self) -> &StitchConfig {
        self.stitcher.config()
    }
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/create-pdf", post(create_pdf))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn index() -> &'static str {
    "Hello, World!"
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pagestitch API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fetch every page behind `url_template` and stream back the assembled PDF.
///
/// The PDF goes through a randomly named transient file that is deleted as
/// soon as the response body is finished or dropped.
pub async fn create_pdf(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request = CreatePdfRequest::from_body(&body)?;
    info!(
        "Received request with url_template={} and output_filename={}",
        request.url_template, request.output_filename
    );

    let template = UrlTemplate::parse(&request.url_template)?;
    let document = state
        .stitcher
        .stitch(&template, &CancellationFlag::new())
        .await?;
    info!(
        "Stitched {} pages ({} bytes) for {}",
        document.page_count(),
        document.bytes.len(),
        request.output_filename
    );

    let stream_options = &state.config().stream;
    let file =
        TransientFile::write_in_background(stream_options.temp_dir.clone(), document.bytes).await?;
    let reader = ChunkedDocument::open(file, stream_options.chunk_size).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&request.output_filename),
        )
        .body(Body::from_stream(reader.into_stream()))
        .map_err(|e| AppError::Unexpected(e.to_string()))
}
