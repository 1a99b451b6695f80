//! Request fingerprints used as artifact cache keys.
//!
//! The fingerprint is a SHA-256 over a canonical JSON form of the request:
//! slides in presentation order, issues sorted by id and every object's keys
//! sorted, so equal requests hash identically regardless of input ordering.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::models::{ExportRequest, Issue};

/// Cache key for `request`, prefixed with the format for readable logs.
pub fn fingerprint(request: &ExportRequest) -> String {
    let canonical = canonicalize(normalized(request));
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{}:{}", request.format(), hex::encode(hasher.finalize()))
}

fn normalized(request: &ExportRequest) -> Value {
    let presentation = &request.presentation;

    json!({
        "presentation": {
            "id": presentation.id,
            "title": presentation.title,
            "createdAt": presentation.created_at,
            "metadata": presentation.metadata,
            "slides": presentation.ordered_slides(),
        },
        "allIssues": sorted_issues(&request.all_issues),
        "upcomingIssues": sorted_issues(&request.upcoming_issues),
        "sprintMetrics": request.sprint_metrics,
        "options": {
            "format": request.options.format,
            "quality": request.options.quality,
            "additionalData": request.options.additional_data,
        },
    })
}

fn sorted_issues(issues: &[Issue]) -> Vec<&Issue> {
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id).then(a.identifier.cmp(&b.identifier)));
    sorted
}

/// Rebuilds every object with keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, item) in entries {
                sorted.insert(key, canonicalize(item));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportFormat, ExportOptions, ExportQuality, SprintMetrics};
    use serde_json::json;

    fn request() -> ExportRequest {
        serde_json::from_value(json!({
            "presentation": {
                "id": "p1",
                "title": "Sprint 9",
                "createdAt": "2024-02-02T12:00:00Z",
                "slides": [
                    {"id": "a", "title": "Intro", "content": "Hi", "type": "title", "order": 1},
                    {"id": "b", "title": "Wins", "content": "- shipped", "type": "summary", "order": 2}
                ]
            },
            "allIssues": [
                {"id": "2", "identifier": "ENG-2", "title": "B", "status": "Done"},
                {"id": "1", "identifier": "ENG-1", "title": "A", "status": "Todo"}
            ],
            "options": {"format": "html"}
        }))
        .unwrap()
    }

    #[test]
    fn test_equal_requests_fingerprint_identically() {
        assert_eq!(fingerprint(&request()), fingerprint(&request()));
    }

    #[test]
    fn test_input_ordering_does_not_matter() {
        let base = request();
        let mut shuffled = request();
        shuffled.presentation.slides.reverse();
        shuffled.all_issues.reverse();

        assert_eq!(fingerprint(&base), fingerprint(&shuffled));
    }

    #[test]
    fn test_relevant_changes_change_fingerprint() {
        let base = fingerprint(&request());

        let mut other_format = request();
        other_format.options = ExportOptions::new(ExportFormat::Pdf);
        assert_ne!(base, fingerprint(&other_format));

        let mut other_quality = request();
        other_quality.options = other_quality.options.with_quality(ExportQuality::High);
        assert_ne!(base, fingerprint(&other_quality));

        let mut fewer_slides = request();
        fewer_slides.presentation.slides.pop();
        assert_ne!(base, fingerprint(&fewer_slides));

        let mut with_metrics = request();
        with_metrics.sprint_metrics = Some(SprintMetrics {
            completed_issues: 4,
            ..SprintMetrics::default()
        });
        assert_ne!(base, fingerprint(&with_metrics));

        let mut with_screenshot = request();
        with_screenshot
            .options
            .additional_data
            .insert("screenshots".to_string(), json!({"ENG-1": "data:image/png;base64,AA"}));
        assert_ne!(base, fingerprint(&with_screenshot));
    }

    #[test]
    fn test_fingerprint_shape() {
        let key = fingerprint(&request());
        let (format, digest) = key.split_once(':').unwrap();
        assert_eq!(format, "html");
        assert_eq!(digest.len(), 64);
    }
}
