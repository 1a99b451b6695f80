//! API Handlers
//!
//! HTTP request handlers for the export, cache-management and health
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::ArtifactCache;
use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::export::{AssetFetcher, ExportOrchestrator, HttpAssetFetcher, ProgressReporter};
use crate::models::{
    CacheOperation, CacheOperationRequest, CacheOperationResponse, CacheStatsPayload, ExportBody,
    ExportFormat, HealthResponse,
};
use crate::models::responses::TOP_ENTRIES;
use crate::render::RendererRegistry;

pub const CACHE_STATUS_HEADER: &str = "x-export-cache";
pub const FINGERPRINT_HEADER: &str = "x-export-fingerprint";

/// Application state shared across all handlers.
///
/// The orchestrator owns the artifact cache; handlers reach the cache
/// through it so that exports and cache operations see the same store.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ExportOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: ExportOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Builds the cache, the renderer registry and the orchestrator from
    /// configuration, fetching remote images over HTTP.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(HttpAssetFetcher::new(Duration::from_millis(
            config.asset_fetch_timeout_ms,
        )));
        Self::with_fetcher(config, fetcher)
    }

    /// Same as [`AppState::from_config`] with a caller-supplied image source.
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn AssetFetcher>) -> Self {
        let cache = Arc::new(RwLock::new(ArtifactCache::init(config.cache_config())));
        let registry = RendererRegistry::with_defaults(fetcher);
        Self::new(ExportOrchestrator::new(cache, registry))
    }

    pub fn cache(&self) -> &Arc<RwLock<ArtifactCache>> {
        self.orchestrator.cache()
    }
}

/// Handler for POST /api/export/:format
///
/// Renders the presentation in the requested format, or serves it from the
/// cache, and answers with the artifact bytes as a download.
pub async fn export_handler(
    State(state): State<AppState>,
    Path(format): Path<String>,
    body: std::result::Result<Json<ExportBody>, JsonRejection>,
) -> Result<Response> {
    let format: ExportFormat = format.parse()?;
    let Json(body) = body.map_err(|rejection| ExportError::Validation(rejection.body_text()))?;
    let request = body.into_request(format)?;

    let progress = ProgressReporter::new(|progress| {
        debug!(
            stage = %progress.stage,
            current = progress.current,
            total = progress.total,
            percentage = progress.percentage,
            "{}",
            progress.message
        );
    });
    let outcome = state
        .orchestrator
        .export_with_progress(request, progress)
        .await?;

    let result = outcome.result;
    let headers = [
        (header::CONTENT_TYPE, result.format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.file_name),
        ),
        (header::CONTENT_LENGTH, result.file_size.to_string()),
        (
            HeaderName::from_static(CACHE_STATUS_HEADER),
            outcome.cache_status.as_str().to_string(),
        ),
        (HeaderName::from_static(FINGERPRINT_HEADER), outcome.fingerprint),
    ];

    Ok((headers, result.blob).into_response())
}

/// Handler for POST /api/export/cache
///
/// Reports statistics, clears the cache or sweeps expired artifacts.
pub async fn cache_operation_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<CacheOperationRequest>, JsonRejection>,
) -> Result<Json<CacheOperationResponse>> {
    let Json(req) = body.map_err(|rejection| ExportError::Validation(rejection.body_text()))?;

    let response = match req.operation()? {
        CacheOperation::GetStats => {
            let cache = state.cache().read().await;
            CacheOperationResponse::stats(CacheStatsPayload {
                stats: cache.get_stats(),
                health: cache.is_healthy(),
                config: cache.get_config(),
                most_accessed: cache.get_most_accessed_entries(TOP_ENTRIES),
                largest: cache.get_largest_entries(TOP_ENTRIES),
            })
        }
        CacheOperation::Clear => {
            let removed = state.cache().write().await.clear();
            CacheOperationResponse::cleared(removed)
        }
        CacheOperation::Cleanup => {
            let removed = state.cache().write().await.cleanup();
            CacheOperationResponse::cleaned(removed)
        }
    };

    Ok(Json(response))
}

/// Handler for GET /health
///
/// Always answers 200; an unhealthy cache is reported as "degraded".
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.cache().read().await.is_healthy();
    Json(HealthResponse::from_report(report))
}
