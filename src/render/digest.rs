//! Advanced sprint digest in HTML.
//!
//! A long-form reading document: every slide in order, then the sprint's
//! issues grouped by status, per-assignee workload and the upcoming queue.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::export::ProgressReporter;
use crate::models::{
    presentation::trim_float, ExportFormat, ExportRequest, ExportResult, Issue, PresentationSlide,
    SlideType, SprintMetrics,
};
use crate::render::common::{
    by_priority, content_html, effective_metrics, escape_html, html_document, issue_table_html,
    issues_by_status, key_value_table_html, list_html, metrics_view, MalformedSlide,
};
use crate::render::{RenderSession, Renderer};

const STYLE: &str = r#"body { margin: 0; font-family: Georgia, "Times New Roman", serif; color: #111827; background: #ffffff; line-height: 1.55; }
.digest { max-width: 880px; margin: 0 auto; padding: 48px 24px; }
h1 { font-size: 2.2rem; margin-bottom: 4px; }
.meta { color: #6b7280; font-family: Helvetica, Arial, sans-serif; }
nav ol { columns: 2; }
article { border-top: 1px solid #e5e7eb; padding-top: 16px; margin-top: 24px; }
article .type { font-family: Helvetica, Arial, sans-serif; font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.08em; color: #6b7280; }
table { border-collapse: collapse; width: 100%; font-family: Helvetica, Arial, sans-serif; font-size: 0.9rem; margin: 8px 0 16px; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #e5e7eb; }
pre.raw { background: #f3f4f6; padding: 12px; white-space: pre-wrap; }
a { color: #1d4ed8; }
"#;

/// Open issues, completed issues and story points owned by one person.
#[derive(Debug, Default, Clone, PartialEq)]
struct Workload {
    open: usize,
    done: usize,
    points: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DigestRenderer;

impl DigestRenderer {
    fn article(
        index: usize,
        slide: &PresentationSlide,
        request: &ExportRequest,
        metrics: &SprintMetrics,
    ) -> Result<String, MalformedSlide> {
        let body = match slide.slide_type {
            SlideType::Metrics => {
                let view = metrics_view(slide, Some(metrics))?;
                let mut html = key_value_table_html(&view.rows);
                html.push_str(&list_html(&view.notes));
                html
            }
            SlideType::DemoStory => {
                let mut html = String::new();
                if let Some(issue) = slide.story_id.as_deref().and_then(|id| request.find_issue(id))
                {
                    html.push_str(&issue_table_html(&[issue]));
                }
                html.push_str(&content_html(&slide.content));
                html
            }
            SlideType::Corporate => {
                let mut html = String::new();
                if let Some(url) = slide.corporate_slide_url.as_deref() {
                    html.push_str(&format!(
                        "<p><a href=\"{}\">Corporate slide image</a></p>\n",
                        escape_html(url)
                    ));
                }
                html.push_str(&content_html(&slide.content));
                html
            }
            SlideType::Title | SlideType::Summary | SlideType::Custom | SlideType::Qa => {
                content_html(&slide.content)
            }
            SlideType::Unknown => format!(
                "<pre class=\"raw\">{}</pre>\n",
                escape_html(&slide.content.raw())
            ),
        };

        Ok(format!(
            "<article id=\"slide-{}\">\n<div class=\"type\">{}</div>\n<h2>{}</h2>\n{}</article>\n",
            index,
            slide.slide_type.as_str(),
            escape_html(&slide.title),
            body
        ))
    }
}

#[async_trait]
impl Renderer for DigestRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::AdvancedDigest
    }

    async fn render(
        &self,
        request: &ExportRequest,
        progress: &ProgressReporter,
    ) -> Result<ExportResult, RenderError> {
        let presentation = &request.presentation;
        let slides = presentation.ordered_slides();
        let mut session = RenderSession::start(self.format(), slides.len(), progress);
        let metrics = effective_metrics(request);

        let mut articles = String::new();
        for (index, slide) in slides.iter().enumerate() {
            session.slide(index + 1, &slide.title);
            let article = Self::article(index + 1, slide, request, &metrics)
                .map_err(|err| session.fail(err))?;
            articles.push_str(&article);
        }

        session.finalizing();
        let mut body = String::from("<div class=\"digest\">\n");
        body.push_str(&format!(
            "<h1>{}</h1>\n<p class=\"meta\">{} &middot; {} &middot; {} slides</p>\n",
            escape_html(&presentation.title),
            escape_html(presentation.sprint_name()),
            presentation.created_at.format("%B %-d, %Y"),
            slides.len()
        ));

        body.push_str("<nav>\n<h2>Contents</h2>\n<ol>\n");
        for (index, slide) in slides.iter().enumerate() {
            body.push_str(&format!(
                "<li><a href=\"#slide-{}\">{}</a></li>\n",
                index + 1,
                escape_html(&slide.title)
            ));
        }
        body.push_str("</ol>\n</nav>\n");

        body.push_str("<section class=\"metrics\">\n<h2>Sprint metrics</h2>\n");
        body.push_str(&key_value_table_html(&metrics.rows()));
        body.push_str("</section>\n");

        body.push_str(&articles);
        body.push_str(&status_section(&request.all_issues));
        body.push_str(&workload_section(&request.all_issues));
        if !request.upcoming_issues.is_empty() {
            body.push_str("<section class=\"upcoming\">\n<h2>Upcoming by priority</h2>\n");
            body.push_str(&issue_table_html(&by_priority(&request.upcoming_issues)));
            body.push_str("</section>\n");
        }
        body.push_str("</div>\n");

        let title = format!("Sprint Digest: {}", presentation.sprint_name());
        let html = html_document(&title, STYLE, &body, None);
        Ok(session.complete(request, html.into_bytes()))
    }
}

fn status_section(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut html = String::from("<section class=\"by-status\">\n<h2>Issues by status</h2>\n");
    for (status, group) in issues_by_status(issues) {
        html.push_str(&format!(
            "<h3>{} ({})</h3>\n",
            escape_html(&status),
            group.len()
        ));
        html.push_str(&issue_table_html(&group));
    }
    html.push_str("</section>\n");
    html
}

fn workloads(issues: &[Issue]) -> BTreeMap<&str, Workload> {
    let mut loads: BTreeMap<&str, Workload> = BTreeMap::new();
    for issue in issues {
        let load = loads
            .entry(issue.assignee.as_deref().unwrap_or("Unassigned"))
            .or_default();
        if issue.is_completed() {
            load.done += 1;
        } else {
            load.open += 1;
        }
        load.points += issue.estimate.unwrap_or(0.0);
    }
    loads
}

fn workload_section(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut html = String::from(
        "<section class=\"workload\">\n<h2>Assignee workload</h2>\n<table>\n\
         <thead><tr><th>Assignee</th><th>Done</th><th>Open</th><th>Points</th></tr></thead>\n<tbody>\n",
    );
    for (assignee, load) in workloads(issues) {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(assignee),
            load.done,
            load.open,
            trim_float(load.points)
        ));
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProgressStage, SlideContent};
    use crate::render::fixtures::*;
    use serde_json::json;

    async fn render(request: &ExportRequest) -> String {
        let result = DigestRenderer
            .render(request, &ProgressReporter::none())
            .await
            .unwrap();
        assert_eq!(result.file_name, "Sprint_Digest_Sprint_42_2024-06-14.html");
        text(&result.blob)
    }

    #[tokio::test]
    async fn test_every_slide_in_order() {
        let html = render(&sprint_request(ExportFormat::AdvancedDigest)).await;

        let positions: Vec<usize> = (1..=5)
            .map(|i| html.find(&format!("<article id=\"slide-{i}\">")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(html.contains("<a href=\"#slide-4\">Search demo</a>"));
        assert!(html.contains(&format!("<a href=\"{LOGO_URL}\">")));
    }

    #[tokio::test]
    async fn test_issue_sections() {
        let html = render(&sprint_request(ExportFormat::AdvancedDigest)).await;

        assert!(html.contains("<h3>Done (2)</h3>"));
        assert!(html.contains("<h3>In Progress (1)</h3>"));
        assert!(html.contains("<tr><td>Ada</td><td>1</td><td>1</td><td>13</td></tr>"));
        assert!(html.contains("<tr><td>Grace</td><td>1</td><td>0</td><td>3</td></tr>"));
        let upcoming = &html[html.find("Upcoming by priority").unwrap()..];
        assert!(upcoming.find("ENG-111").unwrap() < upcoming.find("ENG-110").unwrap());
    }

    #[test]
    fn test_workloads_group_unassigned() {
        let issues = vec![
            Issue {
                id: "1".into(),
                status: "Todo".into(),
                estimate: Some(2.0),
                ..Issue::default()
            },
            Issue {
                id: "2".into(),
                status: "Done".into(),
                ..Issue::default()
            },
        ];
        let loads = workloads(&issues);
        assert_eq!(
            loads["Unassigned"],
            Workload {
                open: 1,
                done: 1,
                points: 2.0
            }
        );
    }

    #[tokio::test]
    async fn test_progress_and_malformed_metrics() {
        let (reporter, seen) = collecting_reporter();
        DigestRenderer
            .render(&sprint_request(ExportFormat::AdvancedDigest), &reporter)
            .await
            .unwrap();
        assert_progress_contract(&seen.lock().unwrap(), 5);

        let mut request = sprint_request(ExportFormat::AdvancedDigest);
        request.presentation.slides[0].content = SlideContent::Structured(json!(false));
        let err = DigestRenderer
            .render(&request, &ProgressReporter::none())
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProgressStage::Rendering);
        assert!(err.to_string().starts_with("rendering: slide s3"));
    }
}
