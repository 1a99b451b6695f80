//! Helpers shared by the renderers: naming, escaping, metrics resolution
//! and issue grouping.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{
    presentation::trim_float, ExportFormat, ExportRequest, GeneratedPresentation, Issue,
    PresentationSlide, SlideContent, SprintMetrics,
};

// == Malformed Slide ==
/// Slide content a renderer cannot interpret.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("slide {slide_id} has malformed content: {reason}")]
pub struct MalformedSlide {
    pub slide_id: String,
    pub reason: String,
}

impl MalformedSlide {
    pub fn new(slide: &PresentationSlide, reason: impl Into<String>) -> Self {
        Self {
            slide_id: slide.id.clone(),
            reason: reason.into(),
        }
    }
}

// == File Naming ==
/// `<Prefix>_<SprintName>_<YYYY-MM-DD>.<ext>`, dated by the presentation.
pub fn file_name(format: ExportFormat, presentation: &GeneratedPresentation) -> String {
    format!(
        "{}_{}_{}.{}",
        format.file_prefix(),
        sanitize_file_component(presentation.sprint_name()),
        presentation.created_at.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Replaces every non-alphanumeric character with `_`.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

// == HTML ==
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Self-contained HTML page with inline style and an optional inline script.
pub fn html_document(title: &str, style: &str, body: &str, script: Option<&str>) -> String {
    let mut html = String::with_capacity(style.len() + body.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    );
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html.push_str("<style>\n");
    html.push_str(style);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str(body);
    if let Some(script) = script {
        html.push_str("<script>\n");
        html.push_str(script);
        html.push_str("</script>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Renders Markdown to HTML. Raw HTML in the source is not passed through.
pub fn markdown_to_html(markdown: &str) -> String {
    comrak::markdown_to_html(markdown, &comrak::Options::default())
}

/// One Markdown line as plain text. Heading markers, emphasis and code
/// ticks are dropped; list markers become bullets.
pub fn plain_line(line: &str) -> String {
    let body = line.trim().trim_start_matches('#').trim_start();
    let body = match body.strip_prefix("- ").or_else(|| body.strip_prefix("* ")) {
        Some(item) => format!("\u{2022} {item}"),
        None => body.to_string(),
    };
    body.replace("**", "").replace('`', "")
}

/// HTML for slide content: Markdown for text, a list for structured data.
pub fn content_html(content: &SlideContent) -> String {
    match content {
        SlideContent::Text(text) => markdown_to_html(text),
        SlideContent::Structured(_) => list_html(&content.lines()),
    }
}

pub fn list_html(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul>\n");
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", escape_html(item)));
    }
    html.push_str("</ul>\n");
    html
}

pub fn key_value_table_html(rows: &[(String, String)]) -> String {
    let mut html = String::from("<table class=\"kv\">\n<tbody>\n");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

pub fn issue_table_html(issues: &[&Issue]) -> String {
    let mut html = String::from(
        "<table class=\"issues\">\n<thead><tr><th>Key</th><th>Title</th><th>Status</th>\
         <th>Assignee</th><th>Priority</th><th>Estimate</th></tr></thead>\n<tbody>\n",
    );
    for issue in issues {
        let key = match &issue.url {
            Some(url) => format!(
                "<a href=\"{}\">{}</a>",
                escape_html(url),
                escape_html(issue.display_key())
            ),
            None => escape_html(issue.display_key()),
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            key,
            escape_html(&issue.title),
            escape_html(&issue.status),
            escape_html(issue.assignee.as_deref().unwrap_or("Unassigned")),
            issue.priority_label(),
            issue.estimate.map(trim_float).unwrap_or_else(|| "-".to_string()),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

// == Metrics ==
/// What a metrics slide shows.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsView {
    pub rows: Vec<(String, String)>,
    pub notes: Vec<String>,
}

/// Resolves a metrics slide.
///
/// Object content becomes label/value rows and arrays may hold
/// `{label, value}` objects or plain strings. Text content is kept as notes
/// under the sprint metrics. A bare scalar is malformed.
pub fn metrics_view(
    slide: &PresentationSlide,
    metrics: Option<&SprintMetrics>,
) -> Result<MetricsView, MalformedSlide> {
    use serde_json::Value;

    match &slide.content {
        SlideContent::Text(text) => Ok(MetricsView {
            rows: metrics.map(SprintMetrics::rows).unwrap_or_default(),
            notes: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }),
        SlideContent::Structured(Value::Object(map)) => Ok(MetricsView {
            rows: map
                .iter()
                .map(|(label, value)| (humanize_label(label), display_value(value)))
                .collect(),
            notes: Vec::new(),
        }),
        SlideContent::Structured(Value::Array(items)) => {
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(map) => {
                        let label = map.get("label").and_then(Value::as_str).ok_or_else(|| {
                            MalformedSlide::new(slide, "metric entry without a label")
                        })?;
                        let value = map.get("value").map(display_value).unwrap_or_default();
                        rows.push((label.to_string(), value));
                    }
                    Value::String(label) => rows.push((label.clone(), String::new())),
                    other => {
                        return Err(MalformedSlide::new(
                            slide,
                            format!("unsupported metric entry {other}"),
                        ))
                    }
                }
            }
            Ok(MetricsView {
                rows,
                notes: Vec::new(),
            })
        }
        SlideContent::Structured(other) => Err(MalformedSlide::new(
            slide,
            format!("expected an object or list of metrics, got {other}"),
        )),
    }
}

/// `completedIssues` -> `Completed issues`, `story_points` -> `Story points`.
pub fn humanize_label(label: &str) -> String {
    let mut words = String::with_capacity(label.len() + 4);
    for (i, c) in label.chars().enumerate() {
        if c == '_' || c == '-' {
            words.push(' ');
        } else if c.is_ascii_uppercase() && i > 0 {
            words.push(' ');
            words.push(c.to_ascii_lowercase());
        } else if i == 0 {
            words.push(c.to_ascii_uppercase());
        } else {
            words.push(c);
        }
    }
    words
}

fn display_value(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_f64()
            .map(trim_float)
            .unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => if *b { "Yes" } else { "No" }.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Sprint metrics from the request, or derived from the issues when the
/// caller supplied none.
pub fn effective_metrics(request: &ExportRequest) -> SprintMetrics {
    request
        .sprint_metrics
        .clone()
        .unwrap_or_else(|| derive_metrics(&request.all_issues))
}

pub fn derive_metrics(issues: &[Issue]) -> SprintMetrics {
    let total_issues = issues.len() as u32;
    let completed: Vec<&Issue> = issues.iter().filter(|i| i.is_completed()).collect();
    let in_progress_issues = issues
        .iter()
        .filter(|i| !i.is_completed() && is_in_progress(i))
        .count() as u32;
    let completed_issues = completed.len() as u32;

    let total_story_points: f64 = issues.iter().filter_map(|i| i.estimate).sum();
    let completed_story_points: f64 = completed.iter().filter_map(|i| i.estimate).sum();
    let completion_rate = if total_issues == 0 {
        0.0
    } else {
        (completed_issues as f64 / total_issues as f64 * 100.0).round()
    };

    SprintMetrics {
        total_issues,
        completed_issues,
        in_progress_issues,
        todo_issues: total_issues - completed_issues - in_progress_issues,
        total_story_points,
        completed_story_points,
        velocity: completed_story_points,
        completion_rate,
    }
}

fn is_in_progress(issue: &Issue) -> bool {
    let status = issue.status.to_ascii_lowercase();
    status.contains("progress") || status.contains("review")
}

// == Issue Grouping ==
/// Issues grouped by status name; blank statuses land under "No status".
pub fn issues_by_status(issues: &[Issue]) -> BTreeMap<String, Vec<&Issue>> {
    let mut groups: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
    for issue in issues {
        let status = if issue.status.trim().is_empty() {
            "No status".to_string()
        } else {
            issue.status.clone()
        };
        groups.entry(status).or_default().push(issue);
    }
    groups
}

/// Urgent first, unprioritized last; ties keep input order.
pub fn by_priority(issues: &[Issue]) -> Vec<&Issue> {
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by_key(|issue| if issue.priority == 0 { u8::MAX } else { issue.priority });
    sorted
}
