//! Markdown export: one section per slide, separated by horizontal rules.

use async_trait::async_trait;

use crate::error::RenderError;
use crate::export::ProgressReporter;
use crate::models::{
    ExportFormat, ExportRequest, ExportResult, PresentationSlide, SlideContent, SlideType,
    SprintMetrics,
};
use crate::render::common::{effective_metrics, metrics_view, MalformedSlide};
use crate::render::{RenderSession, Renderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

#[async_trait]
impl Renderer for MarkdownRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
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

        let mut sections = Vec::with_capacity(slides.len() + 1);
        sections.push(format!(
            "# {}\n\n**Sprint:** {}  \n**Date:** {}\n",
            presentation.title,
            presentation.sprint_name(),
            presentation.created_at.format("%B %-d, %Y")
        ));

        for (index, slide) in slides.iter().enumerate() {
            session.slide(index + 1, &slide.title);
            let section =
                slide_markdown(slide, request, &metrics).map_err(|err| session.fail(err))?;
            sections.push(section);
        }

        session.finalizing();
        let mut markdown = sections.join("\n---\n\n");
        markdown.push_str(&format!(
            "\n---\n\n_Generated {} · {} slides_\n",
            presentation.created_at.format("%Y-%m-%d %H:%M UTC"),
            slides.len()
        ));

        Ok(session.complete(request, markdown.into_bytes()))
    }
}

fn slide_markdown(
    slide: &PresentationSlide,
    request: &ExportRequest,
    metrics: &SprintMetrics,
) -> Result<String, MalformedSlide> {
    let mut md = match slide.slide_type {
        SlideType::Title => format!("# {}\n\n", slide.title),
        _ => format!("## {}\n\n", slide.title),
    };

    match slide.slide_type {
        SlideType::Title | SlideType::Summary | SlideType::Custom | SlideType::Qa => {
            md.push_str(&body_markdown(&slide.content));
        }
        SlideType::Metrics => {
            let view = metrics_view(slide, Some(metrics))?;
            md.push_str("| Metric | Value |\n| --- | --- |\n");
            for (label, value) in &view.rows {
                md.push_str(&format!("| {} | {} |\n", table_cell(label), table_cell(value)));
            }
            for note in &view.notes {
                md.push_str(&format!("\n{note}\n"));
            }
        }
        SlideType::DemoStory => {
            if let Some(story_id) = slide.story_id.as_deref() {
                match request.find_issue(story_id) {
                    Some(issue) => md.push_str(&format!(
                        "**Story:** {} · {} · {}\n\n",
                        issue.display_key(),
                        issue.status,
                        issue.assignee.as_deref().unwrap_or("Unassigned")
                    )),
                    None => md.push_str(&format!("**Story:** {story_id}\n\n")),
                }
            }
            md.push_str(&body_markdown(&slide.content));
            if let Some(screenshot) = slide
                .story_id
                .as_deref()
                .and_then(|id| request.options.screenshot_for(id))
            {
                md.push_str(&format!("\n![{}]({})\n", slide.title, screenshot));
            }
        }
        SlideType::Corporate => {
            if let Some(url) = slide.corporate_slide_url.as_deref() {
                md.push_str(&format!("![{}]({})\n\n", slide.title, url));
            }
            md.push_str(&body_markdown(&slide.content));
        }
        SlideType::Unknown => {
            md.push_str(&format!("```\n{}\n```\n", slide.content.raw()));
        }
    }
    Ok(md)
}

fn body_markdown(content: &SlideContent) -> String {
    match content {
        SlideContent::Text(text) if text.trim().is_empty() => String::new(),
        SlideContent::Text(text) => format!("{}\n", text.trim_end()),
        SlideContent::Structured(_) => content
            .lines()
            .iter()
            .map(|line| format!("- {line}\n"))
            .collect(),
    }
}

fn table_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgressStage;
    use crate::render::fixtures::*;
    use serde_json::json;

    async fn render(request: &ExportRequest) -> String {
        let result = MarkdownRenderer
            .render(request, &ProgressReporter::none())
            .await
            .unwrap();
        assert_eq!(result.file_name, "Sprint_Presentation_Sprint_42_2024-06-14.md");
        text(&result.blob)
    }

    #[tokio::test]
    async fn test_sections_follow_slide_order() {
        let md = render(&sprint_request(ExportFormat::Markdown)).await;

        let headings: Vec<&str> = md
            .lines()
            .filter(|line| line.starts_with("## ") || line.starts_with("# "))
            .collect();
        assert_eq!(
            headings,
            vec![
                "# Sprint 42 Review",
                "# Sprint 42 Review",
                "## Highlights",
                "## Numbers",
                "## Search demo",
                "## Company Update"
            ]
        );
        assert_eq!(md.matches("\n---\n").count(), 6);
    }

    #[tokio::test]
    async fn test_slide_bodies() {
        let md = render(&sprint_request(ExportFormat::Markdown)).await;

        assert!(md.contains("| Completed issues | 8 |"));
        assert!(md.contains("**Story:** ENG-101 · Done · Ada"));
        assert!(md.contains(&format!("![Company Update]({LOGO_URL})")));
        assert!(md.contains("- Shipped **search**"));
    }

    #[tokio::test]
    async fn test_text_metrics_use_sprint_metrics() {
        let mut request = sprint_request(ExportFormat::Markdown);
        request.presentation.slides[0].content = SlideContent::Text("Best sprint yet".to_string());

        let md = render(&request).await;
        assert!(md.contains("| Completed | 2 |"));
        assert!(md.contains("| In progress | 1 |"));
        assert!(md.contains("\nBest sprint yet\n"));
    }

    #[tokio::test]
    async fn test_progress_contract() {
        let (reporter, seen) = collecting_reporter();
        MarkdownRenderer
            .render(&sprint_request(ExportFormat::Markdown), &reporter)
            .await
            .unwrap();
        assert_progress_contract(&seen.lock().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_malformed_metrics() {
        let mut request = sprint_request(ExportFormat::Markdown);
        request.presentation.slides[0].content = SlideContent::Structured(json!(true));

        let err = MarkdownRenderer
            .render(&request, &ProgressReporter::none())
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProgressStage::Rendering);
    }

    #[tokio::test]
    async fn test_pipes_are_escaped_in_tables() {
        let mut request = sprint_request(ExportFormat::Markdown);
        request.presentation.slides[0].content =
            SlideContent::Structured(json!({"a|b": "c|d"}));

        let md = render(&request).await;
        assert!(md.contains("| A\\|b | c\\|d |"));
    }
}
