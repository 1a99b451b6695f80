//! One-page executive summary in HTML.
//!
//! Headline numbers, highlights drawn from the summary and demo slides,
//! the work completed, what is still open and what comes next.

use async_trait::async_trait;

use crate::error::RenderError;
use crate::export::ProgressReporter;
use crate::models::{
    presentation::trim_float, ExportFormat, ExportRequest, ExportResult, Issue, PresentationSlide,
    SlideType, SprintMetrics,
};
use crate::render::common::{
    by_priority, effective_metrics, escape_html, html_document, key_value_table_html, list_html,
    metrics_view, plain_line, MalformedSlide,
};
use crate::render::{RenderSession, Renderer};

const STYLE: &str = r#"body { margin: 0; font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; color: #0f172a; background: #f8fafc; }
.page { max-width: 960px; margin: 0 auto; padding: 40px 32px; }
header { border-bottom: 4px solid #1d4ed8; margin-bottom: 24px; }
header h1 { margin: 0 0 4px; font-size: 2rem; }
header p { margin: 0 0 12px; color: #475569; }
.kpis { display: grid; grid-template-columns: repeat(4, 1fr); gap: 16px; margin-bottom: 28px; }
.kpi { background: #ffffff; border-radius: 10px; padding: 16px; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08); }
.kpi .value { font-size: 1.8rem; font-weight: 700; color: #1d4ed8; }
.kpi .label { color: #64748b; font-size: 0.85rem; text-transform: uppercase; letter-spacing: 0.04em; }
.progress { height: 10px; background: #e2e8f0; border-radius: 999px; overflow: hidden; margin-bottom: 28px; }
.progress div { height: 100%; background: #22c55e; }
section { margin-bottom: 24px; }
h2 { font-size: 1.2rem; color: #1e293b; margin-bottom: 8px; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #e2e8f0; }
ol.agenda { color: #475569; }
"#;

/// What the summary collects while walking the slides.
#[derive(Debug, Default)]
struct SummaryNotes {
    highlights: Vec<String>,
    key_figures: Vec<(String, String)>,
    agenda: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutiveRenderer;

impl ExecutiveRenderer {
    fn collect(
        slide: &PresentationSlide,
        request: &ExportRequest,
        notes: &mut SummaryNotes,
    ) -> Result<(), MalformedSlide> {
        notes.agenda.push(slide.title.clone());
        match slide.slide_type {
            SlideType::Summary => notes.highlights.extend(
                slide
                    .content
                    .lines()
                    .iter()
                    .map(|line| plain_line(line).trim_start_matches('\u{2022}').trim().to_string())
                    .filter(|line| !line.is_empty()),
            ),
            SlideType::Metrics => {
                let view = metrics_view(slide, None)?;
                notes.key_figures.extend(view.rows);
                notes.highlights.extend(view.notes);
            }
            SlideType::DemoStory => {
                let story = slide
                    .story_id
                    .as_deref()
                    .map(|id| request.find_issue(id).map(Issue::display_key).unwrap_or(id));
                notes.highlights.push(match story {
                    Some(key) => format!("Demo: {} ({})", slide.title, key),
                    None => format!("Demo: {}", slide.title),
                });
            }
            SlideType::Title
            | SlideType::Custom
            | SlideType::Corporate
            | SlideType::Qa
            | SlideType::Unknown => {}
        }
        Ok(())
    }
}

#[async_trait]
impl Renderer for ExecutiveRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Executive
    }

    async fn render(
        &self,
        request: &ExportRequest,
        progress: &ProgressReporter,
    ) -> Result<ExportResult, RenderError> {
        let presentation = &request.presentation;
        let slides = presentation.ordered_slides();
        let mut session = RenderSession::start(self.format(), slides.len(), progress);

        let mut notes = SummaryNotes::default();
        for (index, slide) in slides.iter().enumerate() {
            session.slide(index + 1, &slide.title);
            Self::collect(slide, request, &mut notes).map_err(|err| session.fail(err))?;
        }

        session.finalizing();
        let metrics = effective_metrics(request);
        let mut body = String::from("<div class=\"page\">\n");
        body.push_str(&format!(
            "<header>\n<h1>Executive Summary: {}</h1>\n<p>{} &middot; {}</p>\n</header>\n",
            escape_html(presentation.sprint_name()),
            escape_html(&presentation.title),
            presentation.created_at.format("%B %-d, %Y")
        ));
        body.push_str(&kpi_html(&metrics));

        if !notes.highlights.is_empty() {
            body.push_str("<section class=\"highlights\">\n<h2>Highlights</h2>\n");
            body.push_str(&list_html(&notes.highlights));
            body.push_str("</section>\n");
        }
        if !notes.key_figures.is_empty() {
            body.push_str("<section class=\"figures\">\n<h2>Key figures</h2>\n");
            body.push_str(&key_value_table_html(&notes.key_figures));
            body.push_str("</section>\n");
        }

        let (completed, open): (Vec<&Issue>, Vec<&Issue>) =
            request.all_issues.iter().partition(|issue| issue.is_completed());
        body.push_str(&issue_list_section("Completed work", "completed", &completed));
        body.push_str(&issue_list_section("Still in flight", "open", &open));
        body.push_str(&issue_list_section(
            "Coming next",
            "upcoming",
            &by_priority(&request.upcoming_issues),
        ));

        if !notes.agenda.is_empty() {
            body.push_str("<section>\n<h2>Presentation agenda</h2>\n<ol class=\"agenda\">\n");
            for title in &notes.agenda {
                body.push_str(&format!("<li>{}</li>\n", escape_html(title)));
            }
            body.push_str("</ol>\n</section>\n");
        }
        body.push_str("</div>\n");

        let title = format!("Executive Summary: {}", presentation.sprint_name());
        let html = html_document(&title, STYLE, &body, None);
        Ok(session.complete(request, html.into_bytes()))
    }
}

fn kpi_html(metrics: &SprintMetrics) -> String {
    let kpis = [
        (format!("{}%", trim_float(metrics.completion_rate)), "Completion"),
        (
            format!("{} / {}", metrics.completed_issues, metrics.total_issues),
            "Issues done",
        ),
        (
            format!(
                "{} / {}",
                trim_float(metrics.completed_story_points),
                trim_float(metrics.total_story_points)
            ),
            "Story points",
        ),
        (trim_float(metrics.velocity), "Velocity"),
    ];

    let mut html = String::from("<div class=\"kpis\">\n");
    for (value, label) in kpis {
        html.push_str(&format!(
            "<div class=\"kpi\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>\n",
            escape_html(&value),
            label
        ));
    }
    html.push_str("</div>\n");
    html.push_str(&format!(
        "<div class=\"progress\"><div style=\"width: {}%\"></div></div>\n",
        metrics.completion_rate.clamp(0.0, 100.0).round()
    ));
    html
}

fn issue_list_section(heading: &str, class: &str, issues: &[&Issue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let items: Vec<String> = issues
        .iter()
        .map(|issue| match issue.assignee.as_deref() {
            Some(assignee) => format!("{} {} ({})", issue.display_key(), issue.title, assignee),
            None => format!("{} {}", issue.display_key(), issue.title),
        })
        .collect();
    format!(
        "<section class=\"{class}\">\n<h2>{}</h2>\n{}</section>\n",
        escape_html(heading),
        list_html(&items)
    )
}
