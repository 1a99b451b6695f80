//! Self-contained HTML slide deck.
//!
//! Styles and navigation script are inlined and corporate images are
//! embedded as data URIs, so the file works offline. An image that cannot
//! be embedded keeps its original URL.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::export::{AssetEmbedder, AssetFetcher, ProgressReporter};
use crate::models::{
    ExportFormat, ExportRequest, ExportResult, PresentationSlide, SlideType, SprintMetrics,
};
use crate::render::common::{
    by_priority, content_html, effective_metrics, escape_html, html_document, issue_table_html,
    key_value_table_html, list_html, metrics_view, MalformedSlide,
};
use crate::render::{RenderSession, Renderer};

const STYLE: &str = r#"* { box-sizing: border-box; }
body { margin: 0; font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; background: #0f172a; color: #0f172a; }
.deck { height: 100vh; display: flex; align-items: center; justify-content: center; }
.slide { display: none; width: min(1100px, 94vw); min-height: 70vh; padding: 48px 56px; background: #ffffff; border-radius: 12px; box-shadow: 0 20px 50px rgba(0, 0, 0, 0.35); overflow: auto; }
.slide.active { display: block; }
.slide h1 { font-size: 2.8rem; margin: 0 0 16px; color: #1d4ed8; }
.slide h2 { font-size: 2rem; margin: 0 0 24px; color: #1e293b; border-bottom: 3px solid #3b82f6; padding-bottom: 8px; }
.slide-title { text-align: center; padding-top: 18vh; }
.subtitle { font-size: 1.3rem; color: #475569; }
table { border-collapse: collapse; width: 100%; margin: 12px 0; }
th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid #e2e8f0; }
table.kv th { width: 40%; color: #475569; font-weight: 600; }
.story { display: flex; gap: 12px; flex-wrap: wrap; margin-bottom: 16px; }
.story span { background: #eff6ff; color: #1d4ed8; border-radius: 999px; padding: 4px 12px; font-size: 0.9rem; }
img.corporate, img.screenshot { max-width: 100%; max-height: 60vh; display: block; margin: 16px auto; border-radius: 8px; }
pre.raw { background: #f1f5f9; padding: 16px; border-radius: 8px; white-space: pre-wrap; }
.notes { color: #475569; }
#slide-counter { position: fixed; bottom: 16px; right: 24px; color: #e2e8f0; font-size: 0.9rem; }
@media print { .slide { display: block; page-break-after: always; box-shadow: none; } #slide-counter { display: none; } }
"#;

const SCRIPT: &str = r#"(function () {
  var slides = document.querySelectorAll('.slide');
  var counter = document.getElementById('slide-counter');
  var current = 0;
  function show(index) {
    if (slides.length === 0) { return; }
    current = Math.max(0, Math.min(index, slides.length - 1));
    for (var i = 0; i < slides.length; i++) {
      slides[i].classList.toggle('active', i === current);
    }
    counter.textContent = (current + 1) + ' / ' + slides.length;
  }
  document.addEventListener('keydown', function (event) {
    switch (event.key) {
      case 'ArrowRight':
      case ' ':
        event.preventDefault();
        show(current + 1);
        break;
      case 'ArrowLeft':
        show(current - 1);
        break;
      case 'Home':
        show(0);
        break;
      case 'End':
        show(slides.length - 1);
        break;
    }
  });
  show(0);
})();
"#;

// == HTML Renderer ==
pub struct HtmlRenderer {
    fetcher: Arc<dyn AssetFetcher>,
}

impl HtmlRenderer {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }

    async fn slide_body(
        &self,
        slide: &PresentationSlide,
        request: &ExportRequest,
        metrics: &SprintMetrics,
        embedder: &AssetEmbedder,
    ) -> Result<String, MalformedSlide> {
        let body = match slide.slide_type {
            SlideType::Title => format!(
                "<div class=\"subtitle\">{}</div>\n<p class=\"subtitle\">{} &middot; {}</p>\n",
                content_html(&slide.content),
                escape_html(request.presentation.sprint_name()),
                request.presentation.created_at.format("%B %-d, %Y"),
            ),
            SlideType::Summary | SlideType::Custom | SlideType::Qa => {
                content_html(&slide.content)
            }
            SlideType::Metrics => {
                let view = metrics_view(slide, Some(metrics))?;
                let mut html = key_value_table_html(&view.rows);
                if !view.notes.is_empty() {
                    html.push_str("<div class=\"notes\">");
                    html.push_str(&list_html(&view.notes));
                    html.push_str("</div>\n");
                }
                html
            }
            SlideType::DemoStory => demo_story_html(slide, request),
            SlideType::Corporate => {
                let mut html = String::new();
                if let Some(url) = slide.corporate_slide_url.as_deref() {
                    let src = if request.options.quality.embeds_images() {
                        embedder.embed_data_uri(url).await
                    } else {
                        None
                    };
                    html.push_str(&format!(
                        "<img class=\"corporate\" src=\"{}\" alt=\"{}\">\n",
                        escape_html(src.as_deref().unwrap_or(url)),
                        escape_html(&slide.title)
                    ));
                }
                html.push_str(&content_html(&slide.content));
                html
            }
            SlideType::Unknown => format!(
                "<pre class=\"raw\">{}</pre>\n",
                escape_html(&slide.content.raw())
            ),
        };
        Ok(body)
    }
}

impl fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    async fn render(
        &self,
        request: &ExportRequest,
        progress: &ProgressReporter,
    ) -> Result<ExportResult, RenderError> {
        let slides = request.presentation.ordered_slides();
        let mut session = RenderSession::start(self.format(), slides.len(), progress);
        let embedder = AssetEmbedder::new(self.fetcher.clone());
        let metrics = effective_metrics(request);

        let mut deck = String::from("<main class=\"deck\">\n");
        for (index, slide) in slides.iter().enumerate() {
            session.slide(index + 1, &slide.title);
            let body = self
                .slide_body(slide, request, &metrics, &embedder)
                .await
                .map_err(|err| session.fail(err))?;

            let heading = if slide.slide_type == SlideType::Title {
                "h1"
            } else {
                "h2"
            };
            deck.push_str(&format!(
                "<section class=\"slide slide-{}\" id=\"slide-{}\">\n<{heading}>{}</{heading}>\n{}</section>\n",
                slide.slide_type.as_str(),
                index + 1,
                escape_html(&slide.title),
                body
            ));
        }

        session.finalizing();
        if request.options.quality.includes_appendix() {
            deck.push_str(&appendix_html(request));
        }
        deck.push_str("</main>\n<div id=\"slide-counter\"></div>\n");

        let html = html_document(&request.presentation.title, STYLE, &deck, Some(SCRIPT));
        Ok(session.complete(request, html.into_bytes()))
    }
}

fn demo_story_html(slide: &PresentationSlide, request: &ExportRequest) -> String {
    let mut html = String::new();
    if let Some(story_id) = slide.story_id.as_deref() {
        html.push_str("<div class=\"story\">");
        match request.find_issue(story_id) {
            Some(issue) => {
                html.push_str(&format!(
                    "<span>{}</span><span>{}</span><span>{}</span>",
                    escape_html(issue.display_key()),
                    escape_html(&issue.status),
                    escape_html(issue.assignee.as_deref().unwrap_or("Unassigned"))
                ));
            }
            None => html.push_str(&format!("<span>{}</span>", escape_html(story_id))),
        }
        html.push_str("</div>\n");
    }
    html.push_str(&content_html(&slide.content));
    if let Some(screenshot) = slide
        .story_id
        .as_deref()
        .and_then(|id| request.options.screenshot_for(id))
    {
        html.push_str(&format!(
            "<img class=\"screenshot\" src=\"{}\" alt=\"{}\">\n",
            escape_html(screenshot),
            escape_html(&slide.title)
        ));
    }
    html
}

fn appendix_html(request: &ExportRequest) -> String {
    let mut html = String::from("<section class=\"slide slide-appendix\" id=\"appendix\">\n<h2>Appendix: Issues</h2>\n");
    if !request.all_issues.is_empty() {
        html.push_str("<h3>Sprint issues</h3>\n");
        html.push_str(&issue_table_html(&by_priority(&request.all_issues)));
    }
    if !request.upcoming_issues.is_empty() {
        html.push_str("<h3>Upcoming</h3>\n");
        html.push_str(&issue_table_html(&by_priority(&request.upcoming_issues)));
    }
    html.push_str("</section>\n");
    html
}
