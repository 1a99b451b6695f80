//! Sprint Export - presentation export server
//!
//! Renders generated sprint presentations as HTML, PDF, Markdown, an
//! executive summary or an advanced digest, caching every artifact by
//! request fingerprint with TTL expiry and LRU eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod render;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{ExportError, RenderError};
pub use export::{ExportOrchestrator, ProgressReporter};
pub use render::{Renderer, RendererRegistry};
pub use tasks::spawn_cleanup_task;
