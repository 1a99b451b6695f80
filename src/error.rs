//! Error types for the export pipeline
//!
//! Provides unified error handling using thiserror. Only validation and
//! render failures ever reach a caller; cache and asset problems are
//! absorbed where they happen.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::{ErrorResponse, ProgressStage};

// == Render Error ==
/// Failure inside the render state machine, stamped with the stage it hit.
///
/// Cloneable so that every caller awaiting the same in-flight render
/// receives the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage}: {message}")]
pub struct RenderError {
    pub stage: ProgressStage,
    pub message: String,
}

impl RenderError {
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

// == Export Error ==
/// Error returned by the export entry point.
#[derive(Error, Debug, Clone)]
pub enum ExportError {
    /// Missing or unsupported input; nothing was rendered
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The renderer failed; nothing was cached
    #[error("Render failed at {0}")]
    Render(#[from] RenderError),
}

// == Cache Error ==
/// Reasons an artifact was not stored. Never surfaced to export callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Artifact of {size} bytes exceeds cache limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Cache is configured with zero capacity")]
    ZeroCapacity,

    #[error("Artifact size {declared} does not match blob length {actual}")]
    InconsistentSize { declared: usize, actual: usize },
}

// == Asset Embed Error ==
/// Failure to inline a remote image. Logged and degraded, never propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetEmbedError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Response is not an image (content type {0})")]
    NotAnImage(String),

    #[error("Response body is empty")]
    EmptyBody,
}

// == IntoResponse Implementation ==
impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ExportError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ExportError::Render(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Export failed").with_details(err.to_string()),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the export pipeline.
pub type Result<T> = std::result::Result<T, ExportError>;
