//! # pagestitch-api
//!
//! HTTP front end for pagestitch: `POST /create-pdf` walks a page viewer and
//! streams back the stitched PDF.
//!

mod api;
pub mod config;
pub mod disposition;

pub use api::{
    app, create_pdf, health_check, index, AppError, AppState, CreatePdfRequest, ErrorResponse,
};
pub use config::{ServiceConfig, ServiceConfigError};
