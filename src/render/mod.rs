//! Render Module
//!
//! One [`Renderer`] per export format, looked up through the
//! [`RendererRegistry`]. Renderers are pure functions of the request apart
//! from remote image fetches, which go through an [`AssetEmbedder`] scoped
//! to a single render.
//!
//! [`AssetEmbedder`]: crate::export::AssetEmbedder

pub mod common;
mod digest;
mod executive;
#[cfg(test)]
mod fixtures;
mod html;
mod markdown;
mod pdf;
mod session;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::export::{AssetFetcher, ProgressReporter};
use crate::models::{ExportFormat, ExportRequest, ExportResult};

pub use digest::DigestRenderer;
pub use executive::ExecutiveRenderer;
pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;
pub use pdf::PdfRenderer;
pub use session::RenderSession;

// == Renderer ==
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Format this renderer produces.
    fn format(&self) -> ExportFormat;

    /// Renders `request` into a finished artifact, reporting progress as it
    /// goes. Progress is monotone and reaches 100% exactly once, on success.
    async fn render(
        &self,
        request: &ExportRequest,
        progress: &ProgressReporter,
    ) -> Result<ExportResult, RenderError>;
}

// == Renderer Registry ==
/// Maps each format to its renderer.
#[derive(Default, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<ExportFormat, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in renderer for every format.
    pub fn with_defaults(fetcher: Arc<dyn AssetFetcher>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HtmlRenderer::new(fetcher.clone())));
        registry.register(Arc::new(PdfRenderer::new(fetcher)));
        registry.register(Arc::new(MarkdownRenderer));
        registry.register(Arc::new(ExecutiveRenderer));
        registry.register(Arc::new(DigestRenderer));
        registry
    }

    /// Registers `renderer` under its format, replacing any previous one.
    pub fn register(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(renderer.format(), renderer);
    }

    pub fn get(&self, format: ExportFormat) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(&format).cloned()
    }

    /// Registered formats in canonical order.
    pub fn formats(&self) -> Vec<ExportFormat> {
        ExportFormat::ALL
            .into_iter()
            .filter(|format| self.renderers.contains_key(format))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::StaticAssetFetcher;

    #[test]
    fn test_defaults_cover_every_format() {
        let registry = RendererRegistry::with_defaults(Arc::new(StaticAssetFetcher::new()));

        assert_eq!(registry.formats(), ExportFormat::ALL.to_vec());
        for format in ExportFormat::ALL {
            let renderer = registry.get(format).unwrap();
            assert_eq!(renderer.format(), format);
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = RendererRegistry::new();
        assert!(registry.get(ExportFormat::Html).is_none());
        assert!(registry.formats().is_empty());
    }
}
