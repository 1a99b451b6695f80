//! Request DTOs for the export server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ExportError, Result};
use crate::models::{
    ExportFormat, ExportOptions, ExportQuality, ExportRequest, GeneratedPresentation, Issue,
    SprintMetrics,
};

/// Options as they arrive over HTTP, before validation.
///
/// Every field is optional so that a bad value produces a 400 with a useful
/// message instead of a generic deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExportOptions {
    pub format: Option<String>,
    pub quality: Option<String>,
    pub additional_data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Request body for `POST /api/export/{format}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBody {
    #[serde(default)]
    pub presentation: Option<GeneratedPresentation>,
    #[serde(default)]
    pub all_issues: Vec<Issue>,
    #[serde(default)]
    pub upcoming_issues: Vec<Issue>,
    #[serde(default)]
    pub sprint_metrics: Option<SprintMetrics>,
    #[serde(default)]
    pub options: RawExportOptions,
}

impl ExportBody {
    /// Builds a validated request. The route decides the format; a
    /// `format` inside the options is ignored.
    pub fn into_request(self, format: ExportFormat) -> Result<ExportRequest> {
        let presentation = self
            .presentation
            .ok_or_else(|| ExportError::Validation("Presentation data is required".to_string()))?;

        let quality = match self.options.quality.as_deref() {
            Some(quality) => ExportQuality::from_str(quality)?,
            None => ExportQuality::default(),
        };

        let options = ExportOptions {
            format,
            quality,
            additional_data: self.options.additional_data.unwrap_or_default(),
        };

        let request = ExportRequest {
            presentation,
            all_issues: self.all_issues,
            upcoming_issues: self.upcoming_issues,
            sprint_metrics: self.sprint_metrics,
            options,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Cache-management operations accepted by `POST /api/export/cache`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    GetStats,
    Clear,
    Cleanup,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::GetStats => "get-cache-stats",
            CacheOperation::Clear => "clear-cache",
            CacheOperation::Cleanup => "cleanup-cache",
        }
    }
}

impl FromStr for CacheOperation {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get-cache-stats" => Ok(CacheOperation::GetStats),
            "clear-cache" => Ok(CacheOperation::Clear),
            "cleanup-cache" => Ok(CacheOperation::Cleanup),
            other => Err(ExportError::Validation(format!(
                "Unknown cache operation: {other}"
            ))),
        }
    }
}

/// Request body for the cache-management endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CacheOperationRequest {
    #[serde(default)]
    pub operation: String,
}

impl CacheOperationRequest {
    pub fn operation(&self) -> Result<CacheOperation> {
        self.operation.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> ExportBody {
        serde_json::from_value(value).unwrap()
    }

    fn presentation_json() -> serde_json::Value {
        json!({
            "id": "p1",
            "title": "Sprint 4",
            "createdAt": "2024-06-10T09:30:00Z",
            "slides": [{"id": "s1", "title": "Hello", "content": "Hi", "type": "title", "order": 1}]
        })
    }

    #[test]
    fn test_missing_presentation_is_rejected() {
        let result = body(json!({"allIssues": []})).into_request(ExportFormat::Html);
        assert!(matches!(result, Err(ExportError::Validation(_))));
    }

    #[test]
    fn test_route_format_wins_over_options() {
        let request = body(json!({
            "presentation": presentation_json(),
            "options": {"format": "pdf", "quality": "high", "unknownFlag": 1}
        }))
        .into_request(ExportFormat::Markdown)
        .unwrap();

        assert_eq!(request.options.format, ExportFormat::Markdown);
        assert_eq!(request.options.quality, ExportQuality::High);
    }

    #[test]
    fn test_invalid_quality_is_rejected() {
        let result = body(json!({
            "presentation": presentation_json(),
            "options": {"quality": "ultra"}
        }))
        .into_request(ExportFormat::Html);
        assert!(matches!(result, Err(ExportError::Validation(_))));
    }

    #[test]
    fn test_cache_operation_parse() {
        let req: CacheOperationRequest =
            serde_json::from_value(json!({"operation": "cleanup-cache"})).unwrap();
        assert_eq!(req.operation().unwrap(), CacheOperation::Cleanup);

        let req: CacheOperationRequest =
            serde_json::from_value(json!({"operation": "drop-everything"})).unwrap();
        assert!(req.operation().is_err());
    }
}
