//! Export Module
//!
//! The orchestrator and the per-render collaborators it hands to renderers.

pub mod assets;
mod fingerprint;
mod orchestrator;
mod progress;

pub use assets::{
    AssetEmbedder, AssetFetcher, EmbeddedImage, FetchedAsset, HttpAssetFetcher,
    StaticAssetFetcher,
};
pub use fingerprint::fingerprint;
pub use orchestrator::{CacheStatus, ExportOrchestrator, ExportOutcome};
pub use progress::ProgressReporter;
