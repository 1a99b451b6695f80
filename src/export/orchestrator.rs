//! Export Orchestrator
//!
//! Entry point of the pipeline: fingerprint the request, serve it from the
//! artifact cache when possible, otherwise render it once and cache it.
//!
//! Renders run in their own task. A caller that gives up does not cancel
//! the render, and concurrent callers with the same fingerprint await the
//! same task through the in-flight map.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::ArtifactCache;
use crate::error::{ExportError, RenderError, Result};
use crate::export::{fingerprint, ProgressReporter};
use crate::models::{ExportRequest, ExportResult, ProgressStage};
use crate::render::{Renderer, RendererRegistry};

type SharedRender = Shared<BoxFuture<'static, std::result::Result<Rendered, RenderError>>>;
type InFlightMap = Arc<Mutex<HashMap<String, SharedRender>>>;

// == Cache Status ==
/// How an export was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the artifact cache
    Hit,
    /// Rendered by this call
    Miss,
    /// Awaited a render another call had already started
    Joined,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Joined => "joined",
        }
    }
}

// == Export Outcome ==
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub result: ExportResult,
    pub fingerprint: String,
    pub cache_status: CacheStatus,
}

/// Output of a render task. `from_cache` is set when another task stored
/// the artifact between the caller's lookup and this task starting.
#[derive(Debug, Clone)]
struct Rendered {
    result: ExportResult,
    from_cache: bool,
}

// == Export Orchestrator ==
#[derive(Clone)]
pub struct ExportOrchestrator {
    cache: Arc<RwLock<ArtifactCache>>,
    registry: Arc<RendererRegistry>,
    in_flight: InFlightMap,
}

impl ExportOrchestrator {
    pub fn new(cache: Arc<RwLock<ArtifactCache>>, registry: RendererRegistry) -> Self {
        Self {
            cache,
            registry: Arc::new(registry),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Arc<RwLock<ArtifactCache>> {
        &self.cache
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    /// Number of renders currently running.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    // == Export ==
    /// Produces the artifact for `request` without progress reporting.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportResult> {
        self.export_with_progress(request, ProgressReporter::none())
            .await
            .map(|outcome| outcome.result)
    }

    /// Produces the artifact for `request`.
    ///
    /// Validation errors return before any work starts. Render errors are
    /// returned as-is and nothing is cached. Progress is only reported to
    /// the caller that starts the render; joiners and cache hits see none.
    pub async fn export_with_progress(
        &self,
        request: ExportRequest,
        progress: ProgressReporter,
    ) -> Result<ExportOutcome> {
        request.validate()?;
        let format = request.format();
        let renderer = self.registry.get(format).ok_or_else(|| {
            ExportError::Validation(format!("No renderer registered for format {format}"))
        })?;

        let key = fingerprint(&request);

        if let Some(result) = self.lookup(&key).await {
            info!(fingerprint = %key, format = %format, bytes = result.file_size, "Export served from cache");
            return Ok(ExportOutcome {
                result,
                fingerprint: key,
                cache_status: CacheStatus::Hit,
            });
        }

        let (pending, cache_status) = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(pending) => (pending.clone(), CacheStatus::Joined),
                None => {
                    let pending = self.spawn_render(key.clone(), renderer, request, progress);
                    in_flight.insert(key.clone(), pending.clone());
                    (pending, CacheStatus::Miss)
                }
            }
        };

        if cache_status == CacheStatus::Joined {
            debug!(fingerprint = %key, "Joining in-flight render");
        }

        let rendered = pending.await?;
        let cache_status = match cache_status {
            CacheStatus::Miss if rendered.from_cache => CacheStatus::Hit,
            status => status,
        };
        Ok(ExportOutcome {
            result: rendered.result,
            fingerprint: key,
            cache_status,
        })
    }

    async fn lookup(&self, key: &str) -> Option<ExportResult> {
        let mut cache = self.cache.write().await;
        cache.get(key).map(|entry| entry.result.clone())
    }

    fn spawn_render(
        &self,
        key: String,
        renderer: Arc<dyn Renderer>,
        request: ExportRequest,
        progress: ProgressReporter,
    ) -> SharedRender {
        let cache = self.cache.clone();
        let guard = InFlightGuard {
            map: self.in_flight.clone(),
            key: key.clone(),
        };

        let handle = tokio::spawn(async move {
            // Dropped last: the entry leaves the in-flight map only after the
            // cache write, or during unwinding if the renderer panics.
            let _guard = guard;
            let format = renderer.format();

            // A render finishing after our lookup has already cleared the
            // in-flight map; its artifact is in the cache by then.
            let cached = cache.write().await.get(&key).map(|entry| entry.result.clone());
            if let Some(result) = cached {
                debug!(fingerprint = %key, format = %format, "Artifact cached while scheduling, skipping render");
                return Ok(Rendered {
                    result,
                    from_cache: true,
                });
            }

            let started_at = Instant::now();
            info!(fingerprint = %key, format = %format, "Cache miss, rendering artifact");

            let outcome = renderer.render(&request, &progress).await;
            match &outcome {
                Ok(result) => {
                    info!(
                        fingerprint = %key,
                        format = %format,
                        bytes = result.file_size,
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "Artifact rendered"
                    );
                    store(&cache, &key, result.clone()).await;
                }
                Err(err) => {
                    error!(
                        fingerprint = %key,
                        format = %format,
                        stage = %err.stage,
                        error = %err.message,
                        "Render failed"
                    );
                }
            }
            outcome.map(|result| Rendered {
                result,
                from_cache: false,
            })
        });

        async move {
            handle.await.unwrap_or_else(|err| {
                Err(RenderError::new(
                    ProgressStage::Rendering,
                    format!("render task did not complete: {err}"),
                ))
            })
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("formats", &self.registry.formats())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

/// Writes a fresh artifact to the cache. Failures only cost the next caller
/// a re-render, so they are logged and dropped.
async fn store(cache: &RwLock<ArtifactCache>, key: &str, result: ExportResult) {
    let mut cache = cache.write().await;
    match cache.set(key.to_string(), result) {
        Ok(outcome) if outcome.evicted > 0 => {
            debug!(fingerprint = %key, evicted = outcome.evicted, "Cached artifact after eviction");
        }
        Ok(_) => {}
        Err(err) => {
            warn!(fingerprint = %key, error = %err, "Artifact not cached");
        }
    }
}

/// Removes its key from the in-flight map when dropped.
struct InFlightGuard {
    map: InFlightMap,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.map).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
