//! Domain models and HTTP DTOs
//!
//! Presentation data and export types are shared by the renderers and the
//! orchestrator; the request/response modules only serve the HTTP layer.

pub mod export;
pub mod presentation;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use export::{
    ExportFormat, ExportMetadata, ExportOptions, ExportProgress, ExportQuality, ExportRequest,
    ExportResult, ProgressStage,
};
pub use presentation::{
    GeneratedPresentation, Issue, PresentationMetadata, PresentationSlide, SlideContent,
    SlideType, SprintMetrics,
};
pub use requests::{CacheOperation, CacheOperationRequest, ExportBody};
pub use responses::{CacheOperationResponse, CacheStatsPayload, ErrorResponse, HealthResponse};
