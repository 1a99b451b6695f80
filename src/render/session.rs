//! Progress state machine shared by every renderer.
//!
//! A render moves `preparing -> rendering (one step per slide) ->
//! finalizing`. Progress is counted out of `slides + 1`: preparing reports
//! 0, slide `i` reports `i`, and finalizing reports the total, so the
//! total is reached exactly once, on the last snapshot.

use std::fmt;
use std::time::Instant;

use crate::error::RenderError;
use crate::export::ProgressReporter;
use crate::models::{
    ExportFormat, ExportMetadata, ExportProgress, ExportRequest, ExportResult, ProgressStage,
};
use crate::render::common::file_name;

pub struct RenderSession<'a> {
    format: ExportFormat,
    progress: &'a ProgressReporter,
    stage: ProgressStage,
    current: usize,
    total: usize,
    slide_count: usize,
    started_at: Instant,
}

impl<'a> RenderSession<'a> {
    /// Enters `preparing` and reports it.
    pub fn start(format: ExportFormat, slide_count: usize, progress: &'a ProgressReporter) -> Self {
        let session = Self {
            format,
            progress,
            stage: ProgressStage::Preparing,
            current: 0,
            total: slide_count + 1,
            slide_count,
            started_at: Instant::now(),
        };
        session.emit(format!("Preparing {} export", format));
        session
    }

    /// Enters `rendering` for the 1-based slide `index` and reports it.
    pub fn slide(&mut self, index: usize, title: &str) {
        self.stage = ProgressStage::Rendering;
        self.current = index.min(self.slide_count).max(self.current);
        self.emit(format!(
            "Rendering slide {} of {}: {}",
            self.current, self.slide_count, title
        ));
    }

    /// Enters `finalizing` and reports completion.
    pub fn finalizing(&mut self) {
        self.stage = ProgressStage::Finalizing;
        self.current = self.total;
        self.emit(format!("Finalizing {} export", self.format));
    }

    pub fn stage(&self) -> ProgressStage {
        self.stage
    }

    /// Error stamped with the current stage.
    pub fn fail(&self, reason: impl fmt::Display) -> RenderError {
        RenderError::new(self.stage, reason.to_string())
    }

    /// Wraps the finished bytes into an [`ExportResult`].
    pub fn complete(self, request: &ExportRequest, blob: Vec<u8>) -> ExportResult {
        ExportResult::new(
            blob,
            file_name(self.format, &request.presentation),
            self.format,
            ExportMetadata {
                slide_count: self.slide_count,
                processing_time_ms: self.started_at.elapsed().as_millis() as u64,
                quality: request.options.quality,
            },
        )
    }

    /// Reports `finalizing` and wraps `blob` in one step, for renderers
    /// whose last steps can still fail.
    pub fn finish(mut self, request: &ExportRequest, blob: Vec<u8>) -> ExportResult {
        self.finalizing();
        self.complete(request, blob)
    }

    fn emit(&self, message: String) {
        self.progress.report(&ExportProgress::new(
            self.current,
            self.total,
            self.stage,
            message,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting() -> (ProgressReporter, Arc<Mutex<Vec<ExportProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(move |p| sink.lock().unwrap().push(p.clone()));
        (reporter, seen)
    }

    #[test]
    fn test_full_sequence() {
        let (reporter, seen) = collecting();
        let mut session = RenderSession::start(ExportFormat::Html, 2, &reporter);
        session.slide(1, "One");
        session.slide(2, "Two");
        session.finalizing();

        let seen = seen.lock().unwrap();
        let currents: Vec<usize> = seen.iter().map(|p| p.current).collect();
        let stages: Vec<ProgressStage> = seen.iter().map(|p| p.stage).collect();
        assert_eq!(currents, vec![0, 1, 2, 3]);
        assert_eq!(
            stages,
            vec![
                ProgressStage::Preparing,
                ProgressStage::Rendering,
                ProgressStage::Rendering,
                ProgressStage::Finalizing
            ]
        );
        assert!(seen.iter().all(|p| p.total == 3));
        assert_eq!(seen.iter().filter(|p| p.current == p.total).count(), 1);
        assert_eq!(seen.last().unwrap().percentage, 100);
    }

    #[test]
    fn test_empty_presentation() {
        let (reporter, seen) = collecting();
        let mut session = RenderSession::start(ExportFormat::Markdown, 0, &reporter);
        session.finalizing();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].current, 1);
        assert_eq!(seen[1].percentage, 100);
    }

    #[test]
    fn test_finish_reports_completion_with_result() {
        let (reporter, seen) = collecting();
        let mut session = RenderSession::start(ExportFormat::Pdf, 1, &reporter);
        session.slide(1, "Only");
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .all(|p| p.stage != ProgressStage::Finalizing));

        let request: ExportRequest = serde_json::from_value(serde_json::json!({
            "presentation": {
                "id": "p",
                "title": "Sprint 5",
                "createdAt": "2024-02-02T00:00:00Z",
                "slides": []
            },
            "options": {"format": "pdf"}
        }))
        .unwrap();
        let result = session.finish(&request, b"%PDF".to_vec());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().unwrap().stage, ProgressStage::Finalizing);
        assert_eq!(seen.last().unwrap().percentage, 100);
        assert_eq!(result.file_size, 4);
    }

    #[test]
    fn test_fail_carries_stage() {
        let reporter = ProgressReporter::none();
        let mut session = RenderSession::start(ExportFormat::Pdf, 1, &reporter);
        assert_eq!(session.fail("early").stage, ProgressStage::Preparing);

        session.slide(1, "x");
        let err = session.fail("bad content");
        assert_eq!(err.stage, ProgressStage::Rendering);
        assert_eq!(err.message, "bad content");
    }

    #[test]
    fn test_slide_index_never_moves_backwards() {
        let (reporter, seen) = collecting();
        let mut session = RenderSession::start(ExportFormat::Html, 3, &reporter);
        session.slide(2, "b");
        session.slide(1, "a");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[2].current, 2);
    }
}
