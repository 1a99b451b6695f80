//! PDF export.
//!
//! A small PDF 1.4 writer lays each slide out on one or more landscape
//! letter pages using the built-in Helvetica fonts. JPEG images are
//! embedded as DCTDecode XObjects; anything else is referenced by URL.
//!
//! - `content`: content stream operators and WinAnsi text encoding
//! - `layout`: slide blocks flowed onto pages
//! - `writer`: object numbering, streams, xref and trailer

mod content;
mod layout;
mod writer;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::RenderError;
use crate::export::{AssetEmbedder, AssetFetcher, ProgressReporter};
use crate::models::{
    presentation::trim_float, ExportFormat, ExportRequest, ExportResult, PresentationSlide,
    ProgressStage, SlideContent, SlideType, SprintMetrics,
};
use crate::render::common::{
    by_priority, effective_metrics, metrics_view, plain_line, MalformedSlide,
};
use crate::render::{RenderSession, Renderer};

use content::Font;
use layout::{Block, JpegImage, Layout};
use writer::{ObjectId, PdfWriter};

pub use writer::PdfError;

// == PDF Renderer ==
pub struct PdfRenderer {
    fetcher: Arc<dyn AssetFetcher>,
}

impl PdfRenderer {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }

    async fn slide_blocks(
        &self,
        slide: &PresentationSlide,
        request: &ExportRequest,
        metrics: &SprintMetrics,
        embedder: &AssetEmbedder,
    ) -> Result<Vec<Block>, MalformedSlide> {
        let mut blocks = Vec::new();
        match slide.slide_type {
            SlideType::Title => {
                blocks.push(Block::Spacer(80.0));
                blocks.extend(text_blocks(&slide.content, Font::Bold, 20.0));
                blocks.push(Block::Spacer(12.0));
                blocks.push(Block::Muted(format!(
                    "{} | {}",
                    request.presentation.sprint_name(),
                    request.presentation.created_at.format("%B %-d, %Y")
                )));
            }
            SlideType::Summary | SlideType::Custom | SlideType::Qa => {
                blocks.extend(text_blocks(&slide.content, Font::Regular, 14.0));
            }
            SlideType::Metrics => {
                let view = metrics_view(slide, Some(metrics))?;
                blocks.extend(view.rows.into_iter().map(|(label, value)| Block::Row(label, value)));
                if !view.notes.is_empty() {
                    blocks.push(Block::Spacer(10.0));
                    blocks.extend(
                        view.notes
                            .into_iter()
                            .map(|note| Block::Paragraph(note, Font::Regular, 13.0)),
                    );
                }
            }
            SlideType::DemoStory => {
                if let Some(story_id) = slide.story_id.as_deref() {
                    let label = match request.find_issue(story_id) {
                        Some(issue) => format!(
                            "{} | {} | {}",
                            issue.display_key(),
                            issue.status,
                            issue.assignee.as_deref().unwrap_or("Unassigned")
                        ),
                        None => story_id.to_string(),
                    };
                    blocks.push(Block::Paragraph(label, Font::Bold, 13.0));
                    blocks.push(Block::Spacer(6.0));
                }
                blocks.extend(text_blocks(&slide.content, Font::Regular, 14.0));
                if let Some(image) = slide
                    .story_id
                    .as_deref()
                    .and_then(|id| request.options.screenshot_for(id))
                    .and_then(decode_data_uri)
                    .and_then(JpegImage::parse)
                {
                    blocks.push(Block::Image(image));
                }
            }
            SlideType::Corporate => {
                if let Some(url) = slide.corporate_slide_url.as_deref() {
                    blocks.push(self.corporate_image(url, request, embedder).await);
                }
                blocks.extend(text_blocks(&slide.content, Font::Regular, 14.0));
            }
            SlideType::Unknown => {
                blocks.extend(
                    slide
                        .content
                        .raw()
                        .lines()
                        .map(|line| Block::Paragraph(line.to_string(), Font::Regular, 11.0)),
                );
            }
        }
        Ok(blocks)
    }

    async fn corporate_image(
        &self,
        url: &str,
        request: &ExportRequest,
        embedder: &AssetEmbedder,
    ) -> Block {
        if request.options.quality.embeds_images() {
            if let Some(embedded) = embedder.embedded(url).await {
                match JpegImage::parse(embedded.bytes.to_vec()) {
                    Some(image) => return Block::Image(image),
                    None => {
                        debug!(url, mime = %embedded.mime, "Image is not a JPEG, referencing by URL")
                    }
                }
            }
        }
        Block::Muted(format!("Image: {url}"))
    }
}

impl fmt::Debug for PdfRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfRenderer")
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

#[async_trait]
impl Renderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
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

        let mut writer = PdfWriter::new();
        let mut layout = Layout::new();
        for (index, slide) in slides.iter().enumerate() {
            session.slide(index + 1, &slide.title);
            let blocks = self
                .slide_blocks(slide, request, &metrics, &embedder)
                .await
                .map_err(|err| session.fail(err))?;
            layout
                .add_slide(&slide.title, blocks, &mut writer)
                .map_err(|err| session.fail(err))?;
        }

        // Completion is reported only once the document bytes exist
        let finalize_error =
            |err: PdfError| RenderError::new(ProgressStage::Finalizing, err.to_string());
        if request.options.quality.includes_appendix() {
            layout
                .add_slide("Appendix: Issues", appendix_blocks(request), &mut writer)
                .map_err(finalize_error)?;
        }

        let blob = write_document(writer, layout, request).map_err(finalize_error)?;
        Ok(session.finish(request, blob))
    }
}

/// Writes the page tree, fonts, catalog and info dictionary.
fn write_document(
    mut writer: PdfWriter,
    layout: Layout,
    request: &ExportRequest,
) -> Result<Vec<u8>, PdfError> {
    let catalog = writer.reserve();
    let page_tree = writer.reserve();
    let regular = writer.reserve();
    let bold = writer.reserve();
    let info = writer.reserve();

    let footer = request.presentation.sprint_name().to_string();
    let pages = layout.finish(&footer);
    let mut kids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page in pages {
        let contents = writer.reserve();
        writer.write_stream(contents, "", &page.content)?;

        let xobjects: String = page
            .images
            .iter()
            .map(|(name, id)| format!(" /{name} {id}"))
            .collect();
        let page_id = writer.reserve();
        writer.write_object(
            page_id,
            &format!(
                "<< /Type /Page /Parent {} /MediaBox [0 0 {} {}] /Resources << /Font << /{} {} /{} {} >> /XObject <<{} >> >> /Contents {} >>",
                page_tree,
                layout::PAGE_WIDTH,
                layout::PAGE_HEIGHT,
                Font::Regular.resource_name(),
                regular,
                Font::Bold.resource_name(),
                bold,
                xobjects,
                contents
            ),
        )?;
        kids.push(page_id);
    }

    let kid_refs: Vec<String> = kids.iter().map(ObjectId::to_string).collect();
    writer.write_object(
        page_tree,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kid_refs.join(" "),
            kids.len()
        ),
    )?;
    for (id, font) in [(regular, Font::Regular), (bold, Font::Bold)] {
        writer.write_object(
            id,
            &format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ),
        )?;
    }
    writer.write_object(
        catalog,
        &format!("<< /Type /Catalog /Pages {} >>", page_tree),
    )?;
    writer.write_object(
        info,
        &format!(
            "<< /Title {} /Producer (sprint_export) /CreationDate (D:{}Z) >>",
            content::encode_text(&request.presentation.title),
            request.presentation.created_at.format("%Y%m%d%H%M%S")
        ),
    )?;

    writer.finish(catalog, info)
}

fn text_blocks(content: &SlideContent, font: Font, size: f32) -> Vec<Block> {
    content
        .lines()
        .into_iter()
        .map(|line| Block::Paragraph(plain_line(&line), font, size))
        .collect()
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (_, payload) = uri.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}

fn appendix_blocks(request: &ExportRequest) -> Vec<Block> {
    let mut blocks = Vec::new();
    for (heading, issues) in [
        ("Sprint issues", &request.all_issues),
        ("Upcoming", &request.upcoming_issues),
    ] {
        if issues.is_empty() {
            continue;
        }
        blocks.push(Block::Paragraph(heading.to_string(), Font::Bold, 14.0));
        for issue in by_priority(issues) {
            blocks.push(Block::Row(
                format!("{} {}", issue.display_key(), issue.title),
                format!(
                    "{} | {} | {}",
                    issue.status,
                    issue.priority_label(),
                    issue.estimate.map(trim_float).unwrap_or_else(|| "-".to_string())
                ),
            ));
        }
        blocks.push(Block::Spacer(12.0));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportQuality, ProgressStage};
    use crate::render::fixtures::*;
    use serde_json::json;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    fn page_count(blob: &[u8]) -> usize {
        let text = String::from_utf8_lossy(blob);
        let start = text.find("/Type /Pages").unwrap();
        let count = &text[start..];
        let count = &count[count.find("/Count ").unwrap() + 7..];
        count[..count.find(' ').unwrap()].parse().unwrap()
    }

    fn with_corporate_url(mut request: ExportRequest, url: &str) -> ExportRequest {
        for slide in &mut request.presentation.slides {
            if slide.slide_type == SlideType::Corporate {
                slide.corporate_slide_url = Some(url.to_string());
            }
        }
        request
    }

    async fn render(renderer: &PdfRenderer, request: &ExportRequest) -> ExportResult {
        renderer
            .render(request, &ProgressReporter::none())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_document_structure() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let result = render(&renderer, &sprint_request(ExportFormat::Pdf)).await;

        assert_eq!(result.file_name, "Sprint_Presentation_Sprint_42_2024-06-14.pdf");
        assert_eq!(result.file_size, result.blob.len());
        assert!(result.blob.starts_with(b"%PDF-1.4\n"));
        assert!(result.blob.ends_with(b"%%EOF\n"));
        assert_eq!(page_count(&result.blob), 5);
        assert!(contains(&result.blob, "/BaseFont /Helvetica-Bold"));
        assert!(contains(&result.blob, "/CreationDate (D:20240614163000Z)"));
        assert!(contains(&result.blob, "(Highlights) Tj"));
        assert!(contains(&result.blob, "(\\225 Shipped search) Tj"));
        assert!(contains(&result.blob, "(Completed issues) Tj"));
    }

    #[tokio::test]
    async fn test_output_is_deterministic() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let request = sprint_request(ExportFormat::Pdf);

        let first = render(&renderer, &request).await;
        let second = render(&renderer, &request).await;
        assert_eq!(first.blob, second.blob);
    }

    #[tokio::test]
    async fn test_non_jpeg_image_is_referenced_by_url() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let result = render(&renderer, &sprint_request(ExportFormat::Pdf)).await;

        assert!(!contains(&result.blob, "/DCTDecode"));
        assert!(contains(&result.blob, &format!("(Image: {LOGO_URL}) Tj")));
    }

    #[tokio::test]
    async fn test_jpeg_image_is_embedded() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let request = with_corporate_url(sprint_request(ExportFormat::Pdf), PHOTO_URL);
        let result = render(&renderer, &request).await;

        assert!(contains(&result.blob, "/Subtype /Image /Width 32 /Height 16"));
        assert!(contains(&result.blob, "/Filter /DCTDecode"));
        assert!(contains(&result.blob, "/XObject << /Im1 "));
        assert!(contains(&result.blob, "/Im1 Do"));
    }

    #[tokio::test]
    async fn test_low_quality_does_not_fetch() {
        let fetcher = asset_fetcher();
        let renderer = PdfRenderer::new(fetcher.clone());
        let request = with_quality(
            with_corporate_url(sprint_request(ExportFormat::Pdf), PHOTO_URL),
            ExportQuality::Low,
        );
        let result = render(&renderer, &request).await;

        assert_eq!(fetcher.fetch_count(), 0);
        assert!(!contains(&result.blob, "/DCTDecode"));
        assert!(contains(&result.blob, &format!("(Image: {PHOTO_URL}) Tj")));
    }

    #[tokio::test]
    async fn test_high_quality_appendix_adds_page() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let request = with_quality(sprint_request(ExportFormat::Pdf), ExportQuality::High);
        let result = render(&renderer, &request).await;

        assert_eq!(page_count(&result.blob), 6);
        assert!(contains(&result.blob, "(Appendix: Issues) Tj"));
        assert!(contains(&result.blob, "(ENG-111 Audit log) Tj"));
    }

    #[tokio::test]
    async fn test_long_slide_overflows_onto_more_pages() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let mut request = sprint_request(ExportFormat::Pdf);
        let long: Vec<String> = (1..=80).map(|i| format!("- Item number {i}")).collect();
        request.presentation.slides[3].content = SlideContent::Text(long.join("\n"));

        let result = render(&renderer, &request).await;
        assert!(page_count(&result.blob) > 5);
        assert!(contains(&result.blob, "(\\225 Item number 80) Tj"));
        assert!(contains(&result.blob, "\\(cont.\\)"));
    }

    #[tokio::test]
    async fn test_progress_and_malformed_metrics() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let (reporter, seen) = collecting_reporter();
        renderer
            .render(&sprint_request(ExportFormat::Pdf), &reporter)
            .await
            .unwrap();
        assert_progress_contract(&seen.lock().unwrap(), 5);

        let mut request = sprint_request(ExportFormat::Pdf);
        request.presentation.slides[0].content = SlideContent::Structured(json!(null));
        let err = renderer
            .render(&request, &ProgressReporter::none())
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProgressStage::Rendering);
    }

    #[tokio::test]
    async fn test_completion_reported_after_document_is_written() {
        let renderer = PdfRenderer::new(asset_fetcher());
        let (reporter, seen) = collecting_reporter();
        let request = with_quality(sprint_request(ExportFormat::Pdf), ExportQuality::High);
        let result = renderer.render(&request, &reporter).await.unwrap();
        assert!(contains(&result.blob, "(Appendix: Issues) Tj"));
        assert_progress_contract(&seen.lock().unwrap(), 5);

        let (reporter, seen) = collecting_reporter();
        let mut request = sprint_request(ExportFormat::Pdf);
        request.presentation.slides[4].content = SlideContent::Structured(json!(true));
        request.presentation.slides[4].slide_type = SlideType::Metrics;
        renderer.render(&request, &reporter).await.unwrap_err();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|p| p.stage != ProgressStage::Finalizing));
        assert!(seen.iter().all(|p| p.percentage < 100));
    }
}
