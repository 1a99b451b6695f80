//! Export request, result and progress types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::models::{GeneratedPresentation, Issue, SprintMetrics};

// == Export Format ==
/// Artifact format; each one is backed by exactly one renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Html,
    Pdf,
    Markdown,
    Executive,
    AdvancedDigest,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Html,
        ExportFormat::Pdf,
        ExportFormat::Markdown,
        ExportFormat::Executive,
        ExportFormat::AdvancedDigest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Executive => "executive",
            ExportFormat::AdvancedDigest => "advanced-digest",
        }
    }

    /// Leading component of generated file names.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ExportFormat::Html | ExportFormat::Pdf | ExportFormat::Markdown => {
                "Sprint_Presentation"
            }
            ExportFormat::Executive => "Executive_Summary",
            ExportFormat::AdvancedDigest => "Sprint_Digest",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html | ExportFormat::Executive | ExportFormat::AdvancedDigest => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Html | ExportFormat::Executive | ExportFormat::AdvancedDigest => {
                "text/html; charset=utf-8"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        ExportFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ExportError::Validation(format!("Unsupported export format: {s}")))
    }
}

// == Export Quality ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ExportQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportQuality::Low => "low",
            ExportQuality::Medium => "medium",
            ExportQuality::High => "high",
        }
    }

    /// Whether remote images should be inlined at this quality.
    pub fn embeds_images(&self) -> bool {
        !matches!(self, ExportQuality::Low)
    }

    /// Whether the issue appendix is included.
    pub fn includes_appendix(&self) -> bool {
        matches!(self, ExportQuality::High)
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportQuality {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(ExportQuality::Low),
            "medium" => Ok(ExportQuality::Medium),
            "high" => Ok(ExportQuality::High),
            other => Err(ExportError::Validation(format!(
                "Unsupported export quality: {other}"
            ))),
        }
    }
}

// == Export Options ==
/// Recognized export options. Unknown keys are dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    #[serde(default)]
    pub quality: ExportQuality,
    /// Opaque data passed through to renderers (e.g. screenshots keyed by story id).
    #[serde(default)]
    pub additional_data: serde_json::Map<String, serde_json::Value>,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            quality: ExportQuality::default(),
            additional_data: serde_json::Map::new(),
        }
    }

    pub fn with_quality(mut self, quality: ExportQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Screenshot data URI supplied for a story, if any.
    pub fn screenshot_for(&self, story_id: &str) -> Option<&str> {
        self.additional_data
            .get("screenshots")?
            .get(story_id)?
            .as_str()
            .filter(|uri| uri.starts_with("data:image/"))
    }
}

// == Export Request ==
/// Immutable input to one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub presentation: GeneratedPresentation,
    #[serde(default)]
    pub all_issues: Vec<Issue>,
    #[serde(default)]
    pub upcoming_issues: Vec<Issue>,
    #[serde(default)]
    pub sprint_metrics: Option<SprintMetrics>,
    pub options: ExportOptions,
}

impl ExportRequest {
    pub fn new(presentation: GeneratedPresentation, options: ExportOptions) -> Self {
        Self {
            presentation,
            all_issues: Vec::new(),
            upcoming_issues: Vec::new(),
            sprint_metrics: None,
            options,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.options.format
    }

    /// Rejects requests whose slides share an `order` value.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for slide in &self.presentation.slides {
            if !seen.insert(slide.order) {
                return Err(ExportError::Validation(format!(
                    "Duplicate slide order {} in presentation {}",
                    slide.order, self.presentation.id
                )));
            }
        }
        Ok(())
    }

    /// Looks an issue up by id or tracker identifier across both issue lists.
    pub fn find_issue(&self, key: &str) -> Option<&Issue> {
        self.all_issues
            .iter()
            .chain(self.upcoming_issues.iter())
            .find(|issue| issue.id == key || issue.identifier == key)
    }
}

// == Export Result ==
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub slide_count: usize,
    pub processing_time_ms: u64,
    pub quality: ExportQuality,
}

/// A finished artifact. `file_size` always equals `blob.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub blob: Vec<u8>,
    pub file_name: String,
    pub file_size: usize,
    pub format: ExportFormat,
    pub metadata: ExportMetadata,
}

impl ExportResult {
    pub fn new(
        blob: Vec<u8>,
        file_name: String,
        format: ExportFormat,
        metadata: ExportMetadata,
    ) -> Self {
        let file_size = blob.len();
        Self {
            blob,
            file_name,
            file_size,
            format,
            metadata,
        }
    }
}

// == Export Progress ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Preparing,
    Rendering,
    Finalizing,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressStage::Preparing => "preparing",
            ProgressStage::Rendering => "rendering",
            ProgressStage::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Snapshot emitted while a render advances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub stage: ProgressStage,
    pub message: String,
    pub percentage: u8,
}

impl ExportProgress {
    pub fn new(
        current: usize,
        total: usize,
        stage: ProgressStage,
        message: impl Into<String>,
    ) -> Self {
        let current = current.min(total);
        let percentage = if total == 0 {
            100
        } else {
            ((current as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            current,
            total,
            stage,
            message: message.into(),
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn presentation_with_orders(orders: &[i64]) -> GeneratedPresentation {
        let slides: Vec<serde_json::Value> = orders
            .iter()
            .map(|order| {
                json!({"id": format!("s{order}"), "title": "T", "content": "", "type": "custom", "order": order})
            })
            .collect();
        serde_json::from_value(json!({
            "id": "p1",
            "title": "Sprint 1",
            "createdAt": "2024-05-02T08:00:00Z",
            "slides": slides
        }))
        .unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "advanced-digest".parse::<ExportFormat>().unwrap(),
            ExportFormat::AdvancedDigest
        );
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(ExportError::Validation(_))
        ));
    }

    #[test]
    fn test_options_ignore_unknown_keys() {
        let options: ExportOptions = serde_json::from_value(json!({
            "format": "pdf",
            "theme": "dark",
            "includeNotes": true
        }))
        .unwrap();

        assert_eq!(options.format, ExportFormat::Pdf);
        assert_eq!(options.quality, ExportQuality::Medium);
        assert!(options.additional_data.is_empty());
    }

    #[test]
    fn test_screenshot_lookup() {
        let options: ExportOptions = serde_json::from_value(json!({
            "format": "html",
            "additionalData": {"screenshots": {
                "ENG-1": "data:image/png;base64,AAAA",
                "ENG-2": "javascript:alert(1)"
            }}
        }))
        .unwrap();

        assert_eq!(options.screenshot_for("ENG-1"), Some("data:image/png;base64,AAAA"));
        assert_eq!(options.screenshot_for("ENG-2"), None);
        assert_eq!(options.screenshot_for("ENG-3"), None);
    }

    #[test]
    fn test_validate_rejects_duplicate_orders() {
        let request = ExportRequest::new(
            presentation_with_orders(&[1, 2, 2]),
            ExportOptions::new(ExportFormat::Html),
        );
        assert!(matches!(request.validate(), Err(ExportError::Validation(_))));

        let request = ExportRequest::new(
            presentation_with_orders(&[3, 1, 2]),
            ExportOptions::new(ExportFormat::Html),
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_result_file_size_matches_blob() {
        let result = ExportResult::new(
            b"hello".to_vec(),
            "x.md".to_string(),
            ExportFormat::Markdown,
            ExportMetadata {
                slide_count: 1,
                processing_time_ms: 3,
                quality: ExportQuality::Low,
            },
        );
        assert_eq!(result.file_size, 5);
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(ExportProgress::new(1, 3, ProgressStage::Rendering, "").percentage, 33);
        assert_eq!(ExportProgress::new(2, 3, ProgressStage::Rendering, "").percentage, 67);
        assert_eq!(ExportProgress::new(3, 3, ProgressStage::Finalizing, "").percentage, 100);
        assert_eq!(ExportProgress::new(0, 4, ProgressStage::Preparing, "").percentage, 0);
    }
}
