//! Presentation and issue-tracker data consumed by the renderers.
//!
//! These types mirror the JSON shapes produced by the presentation
//! generator and the issue-tracker client (camelCase on the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Slide Type ==
/// Tag deciding how a slide is rendered.
///
/// Tags this build does not know deserialize to `Unknown` so that a newer
/// generator never breaks an export; renderers fall back to raw content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideType {
    Title,
    Summary,
    Metrics,
    DemoStory,
    Custom,
    Corporate,
    Qa,
    #[serde(other)]
    Unknown,
}

impl SlideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideType::Title => "title",
            SlideType::Summary => "summary",
            SlideType::Metrics => "metrics",
            SlideType::DemoStory => "demo-story",
            SlideType::Custom => "custom",
            SlideType::Corporate => "corporate",
            SlideType::Qa => "qa",
            SlideType::Unknown => "unknown",
        }
    }
}

// == Slide Content ==
/// Slide body: either Markdown text or an arbitrary structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlideContent {
    Text(String),
    Structured(serde_json::Value),
}

impl Default for SlideContent {
    fn default() -> Self {
        SlideContent::Text(String::new())
    }
}

impl SlideContent {
    /// Flattens the content into display lines.
    ///
    /// Text is split on newlines. Structured content is walked: strings
    /// become lines, arrays contribute one line per element and objects
    /// contribute `key: value` lines in key order.
    pub fn lines(&self) -> Vec<String> {
        match self {
            SlideContent::Text(text) => text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            SlideContent::Structured(value) => {
                let mut lines = Vec::new();
                flatten_value(None, value, &mut lines);
                lines
            }
        }
    }

    /// Returns the raw text form, used by fallback rendering.
    pub fn raw(&self) -> String {
        match self {
            SlideContent::Text(text) => text.clone(),
            SlideContent::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

fn flatten_value(label: Option<&str>, value: &serde_json::Value, out: &mut Vec<String>) {
    use serde_json::Value;

    match value {
        Value::Null => {}
        Value::String(s) => match label {
            Some(label) => out.push(format!("{label}: {s}")),
            None => out.push(s.clone()),
        },
        Value::Bool(_) | Value::Number(_) => match label {
            Some(label) => out.push(format!("{label}: {value}")),
            None => out.push(value.to_string()),
        },
        Value::Array(items) => {
            for item in items {
                flatten_value(label, item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_value(Some(key), item, out);
            }
        }
    }
}

// == Presentation Slide ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSlide {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: SlideContent,
    #[serde(rename = "type")]
    pub slide_type: SlideType,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_slide_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

// == Presentation Metadata ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationMetadata {
    pub sprint_name: String,
    pub total_slides: usize,
    pub has_metrics: bool,
    pub demo_stories_count: usize,
    pub custom_slides_count: usize,
}

// == Generated Presentation ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPresentation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slides: Vec<PresentationSlide>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: PresentationMetadata,
}

impl GeneratedPresentation {
    /// Slides in presentation order, independent of their position in the
    /// source vector.
    pub fn ordered_slides(&self) -> Vec<&PresentationSlide> {
        let mut slides: Vec<&PresentationSlide> = self.slides.iter().collect();
        slides.sort_by_key(|slide| slide.order);
        slides
    }

    /// Sprint name used in titles and file names; falls back to the
    /// presentation title when the generator left it blank.
    pub fn sprint_name(&self) -> &str {
        if self.metadata.sprint_name.trim().is_empty() {
            &self.title
        } else {
            &self.metadata.sprint_name
        }
    }
}

// == Issue ==
/// One issue as returned by the issue-tracker client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "state")]
    pub status: String,
    /// 0 = none, 1 = urgent, 2 = high, 3 = medium, 4 = low
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Issue {
    pub fn priority_label(&self) -> &'static str {
        match self.priority {
            1 => "Urgent",
            2 => "High",
            3 => "Medium",
            4 => "Low",
            _ => "No priority",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "done" | "completed" | "closed" | "released"
        )
    }

    /// Identifier when the tracker supplied one, id otherwise.
    pub fn display_key(&self) -> &str {
        if self.identifier.is_empty() {
            &self.id
        } else {
            &self.identifier
        }
    }
}

// == Sprint Metrics ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SprintMetrics {
    pub total_issues: u32,
    pub completed_issues: u32,
    pub in_progress_issues: u32,
    pub todo_issues: u32,
    pub total_story_points: f64,
    pub completed_story_points: f64,
    pub velocity: f64,
    /// Percentage, 0-100
    pub completion_rate: f64,
}

impl SprintMetrics {
    /// Label/value pairs in display order.
    pub fn rows(&self) -> Vec<(String, String)> {
        vec![
            ("Total issues".to_string(), self.total_issues.to_string()),
            ("Completed".to_string(), self.completed_issues.to_string()),
            ("In progress".to_string(), self.in_progress_issues.to_string()),
            ("To do".to_string(), self.todo_issues.to_string()),
            (
                "Story points".to_string(),
                format!(
                    "{} / {}",
                    trim_float(self.completed_story_points),
                    trim_float(self.total_story_points)
                ),
            ),
            ("Velocity".to_string(), trim_float(self.velocity)),
            (
                "Completion rate".to_string(),
                format!("{}%", trim_float(self.completion_rate)),
            ),
        ]
    }
}

/// Formats a float without a trailing `.0` for whole numbers.
pub fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slide_deserialize_known_type() {
        let slide: PresentationSlide = serde_json::from_value(json!({
            "id": "s1",
            "title": "Demo",
            "content": "First line\nSecond line",
            "type": "demo-story",
            "order": 3,
            "storyId": "ISS-1"
        }))
        .unwrap();

        assert_eq!(slide.slide_type, SlideType::DemoStory);
        assert_eq!(slide.story_id.as_deref(), Some("ISS-1"));
        assert_eq!(slide.content.lines(), vec!["First line", "Second line"]);
    }

    #[test]
    fn test_slide_deserialize_unknown_type() {
        let slide: PresentationSlide = serde_json::from_value(json!({
            "id": "s1",
            "title": "Poll",
            "content": {"question": "Ship it?"},
            "type": "poll",
            "order": 1
        }))
        .unwrap();

        assert_eq!(slide.slide_type, SlideType::Unknown);
        assert_eq!(slide.content.lines(), vec!["question: Ship it?"]);
    }

    #[test]
    fn test_structured_content_flattening() {
        let content = SlideContent::Structured(json!({
            "points": ["Shipped search", "Fixed login"],
            "owner": "Team A",
            "score": 7
        }));

        assert_eq!(
            content.lines(),
            vec!["owner: Team A", "points: Shipped search", "points: Fixed login", "score: 7"]
        );
    }

    #[test]
    fn test_ordered_slides_sorts_by_order() {
        let presentation: GeneratedPresentation = serde_json::from_value(json!({
            "id": "p1",
            "title": "Sprint 12",
            "createdAt": "2024-03-01T10:00:00Z",
            "slides": [
                {"id": "b", "title": "B", "content": "", "type": "custom", "order": 2},
                {"id": "a", "title": "A", "content": "", "type": "title", "order": 1}
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = presentation
            .ordered_slides()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(presentation.sprint_name(), "Sprint 12");
    }

    #[test]
    fn test_issue_state_alias_and_helpers() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "1",
            "identifier": "ENG-7",
            "title": "Fix login",
            "state": "Done",
            "priority": 2
        }))
        .unwrap();

        assert!(issue.is_completed());
        assert_eq!(issue.priority_label(), "High");
        assert_eq!(issue.display_key(), "ENG-7");
    }

    #[test]
    fn test_trim_float() {
        assert_eq!(trim_float(12.0), "12");
        assert_eq!(trim_float(12.5), "12.5");
    }
}
