//! Flows slide blocks onto fixed-size pages.
//!
//! Every slide starts a page with a coloured title band. Content that does
//! not fit continues on a new page titled `<slide> (cont.)`. Footers are
//! added once the page count is known.

use super::content::{text_width, wrap, Color, ContentStream, Font};
use super::writer::{ObjectId, PdfError, PdfWriter};

/// US letter, landscape.
pub const PAGE_WIDTH: f32 = 792.0;
pub const PAGE_HEIGHT: f32 = 612.0;

const MARGIN: f32 = 54.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const HEADER_HEIGHT: f32 = 72.0;
const CONTENT_TOP: f32 = PAGE_HEIGHT - HEADER_HEIGHT - 30.0;
const CONTENT_BOTTOM: f32 = MARGIN + 18.0;
const LABEL_WIDTH: f32 = 300.0;
const COLUMN_GAP: f32 = 20.0;
const MAX_IMAGE_HEIGHT: f32 = 360.0;
const MIN_IMAGE_HEIGHT: f32 = 120.0;

// == Blocks ==
/// One unit of slide content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(String, Font, f32),
    /// Secondary text in a lighter colour
    Muted(String),
    /// Label and value in two columns
    Row(String, String),
    Image(JpegImage),
    Spacer(f32),
}

/// A JPEG that can be passed through as a DCTDecode stream.
#[derive(Debug, Clone, PartialEq)]
pub struct JpegImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    components: u8,
}

impl JpegImage {
    /// Accepts `bytes` only if they are a JPEG with readable dimensions.
    pub fn parse(bytes: Vec<u8>) -> Option<Self> {
        if !matches!(imagesize::image_type(&bytes), Ok(imagesize::ImageType::Jpeg)) {
            return None;
        }
        let size = imagesize::blob_size(&bytes).ok()?;
        if size.width == 0 || size.height == 0 {
            return None;
        }
        let components = jpeg_components(&bytes).unwrap_or(3);
        Some(Self {
            width: size.width as u32,
            height: size.height as u32,
            components,
            bytes,
        })
    }

    fn color_space(&self) -> &'static str {
        match self.components {
            1 => "/DeviceGray",
            4 => "/DeviceCMYK",
            _ => "/DeviceRGB",
        }
    }

    fn dictionary(&self) -> String {
        format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode",
            self.width,
            self.height,
            self.color_space()
        )
    }
}

/// Component count from the first start-of-frame segment.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut offset = 2;
    while offset + 4 <= bytes.len() {
        if bytes[offset] != 0xFF {
            return None;
        }
        let marker = bytes[offset + 1];
        let length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return bytes.get(offset + 9).copied();
        }
        offset += 2 + length;
    }
    None
}

// == Pages ==
/// A finished page ready to be written.
pub struct Page {
    pub content: Vec<u8>,
    /// XObject resource names and the objects they refer to
    pub images: Vec<(String, ObjectId)>,
}

#[derive(Default)]
struct PendingPage {
    content: ContentStream,
    images: Vec<(String, ObjectId)>,
}

pub struct Layout {
    done: Vec<PendingPage>,
    page: PendingPage,
    started: bool,
    title: String,
    cursor: f32,
    image_count: usize,
}

impl Layout {
    pub fn new() -> Self {
        Self {
            done: Vec::new(),
            page: PendingPage::default(),
            started: false,
            title: String::new(),
            cursor: CONTENT_TOP,
            image_count: 0,
        }
    }

    /// Lays out one slide starting on a fresh page. Images are written to
    /// `writer` as they are placed.
    pub fn add_slide(
        &mut self,
        title: &str,
        blocks: Vec<Block>,
        writer: &mut PdfWriter,
    ) -> Result<(), PdfError> {
        self.title = title.to_string();
        self.start_page(title);

        for block in blocks {
            match block {
                Block::Paragraph(text, font, size) => {
                    self.paragraph(&text, font, size, Color::INK)
                }
                Block::Muted(text) => self.paragraph(&text, Font::Regular, 12.0, Color::MUTED),
                Block::Row(label, value) => self.row(&label, &value),
                Block::Image(image) => self.image(image, writer)?,
                Block::Spacer(height) => self.cursor -= height,
            }
        }
        Ok(())
    }

    /// Closes the last page and stamps every page with its footer.
    pub fn finish(mut self, footer: &str) -> Vec<Page> {
        if self.started {
            self.done.push(std::mem::take(&mut self.page));
        } else {
            self.done.push(PendingPage::default());
        }

        let total = self.done.len();
        self.done
            .into_iter()
            .enumerate()
            .map(|(index, mut page)| {
                page.content
                    .text(Font::Regular, 10.0, Color::MUTED, MARGIN, 30.0, footer);
                let number = format!("Page {} of {}", index + 1, total);
                let x = PAGE_WIDTH - MARGIN - text_width(&number, Font::Regular, 10.0);
                page.content
                    .text(Font::Regular, 10.0, Color::MUTED, x, 30.0, &number);
                Page {
                    content: page.content.into_bytes(),
                    images: page.images,
                }
            })
            .collect()
    }

    fn start_page(&mut self, title: &str) {
        if self.started {
            let finished = std::mem::take(&mut self.page);
            self.done.push(finished);
        }
        self.started = true;
        self.cursor = CONTENT_TOP;

        self.page.content.fill_rect(
            Color::ACCENT,
            0.0,
            PAGE_HEIGHT - HEADER_HEIGHT,
            PAGE_WIDTH,
            HEADER_HEIGHT,
        );
        let heading = fit_line(title, Font::Bold, 24.0, CONTENT_WIDTH);
        self.page
            .content
            .text(Font::Bold, 24.0, Color::WHITE, MARGIN, PAGE_HEIGHT - 46.0, &heading);
    }

    /// Moves to a continuation page unless `height` still fits.
    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < CONTENT_BOTTOM {
            let title = format!("{} (cont.)", self.title);
            self.start_page(&title);
        }
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32, color: Color) {
        let leading = size * 1.4;
        let lines = wrap(text, font, size, CONTENT_WIDTH);
        if lines.is_empty() {
            self.cursor -= leading / 2.0;
            return;
        }
        for line in lines {
            self.ensure_space(leading);
            self.cursor -= leading;
            self.page
                .content
                .text(font, size, color, MARGIN, self.cursor, &line);
        }
    }

    fn row(&mut self, label: &str, value: &str) {
        let size = 13.0;
        let leading = size * 1.4;
        let value_width = CONTENT_WIDTH - LABEL_WIDTH - COLUMN_GAP;
        let labels = wrap(label, Font::Bold, size, LABEL_WIDTH);
        let values = wrap(value, Font::Regular, size, value_width);
        let line_count = labels.len().max(values.len()).max(1);
        let height = line_count as f32 * leading;

        // A row that fits on one page is kept together; taller rows are
        // split line by line across continuation pages.
        if height <= CONTENT_TOP - CONTENT_BOTTOM {
            self.ensure_space(height);
        }
        let value_x = MARGIN + LABEL_WIDTH + COLUMN_GAP;
        for i in 0..line_count {
            self.ensure_space(leading);
            self.cursor -= leading;
            if let Some(line) = labels.get(i) {
                self.page
                    .content
                    .text(Font::Bold, size, Color::INK, MARGIN, self.cursor, line);
            }
            if let Some(line) = values.get(i) {
                self.page
                    .content
                    .text(Font::Regular, size, Color::INK, value_x, self.cursor, line);
            }
        }
    }

    fn image(&mut self, image: JpegImage, writer: &mut PdfWriter) -> Result<(), PdfError> {
        if self.cursor - CONTENT_BOTTOM < MIN_IMAGE_HEIGHT {
            let title = format!("{} (cont.)", self.title);
            self.start_page(&title);
        }

        let id = writer.reserve();
        writer.write_stream(id, &image.dictionary(), &image.bytes)?;
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let max_height = (self.cursor - CONTENT_BOTTOM).min(MAX_IMAGE_HEIGHT);
        let scale = (CONTENT_WIDTH / image.width as f32).min(max_height / image.height as f32);
        let width = image.width as f32 * scale;
        let height = image.height as f32 * scale;
        let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
        let y = self.cursor - height - 6.0;

        self.page.content.image(&name, x, y, width, height);
        self.page.images.push((name, id));
        self.cursor = y - 12.0;
        Ok(())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

/// First wrapped line of `text`, with an ellipsis when the rest is cut.
fn fit_line(text: &str, font: Font, size: f32, width: f32) -> String {
    let mut lines = wrap(text, font, size, width).into_iter();
    match (lines.next(), lines.next()) {
        (Some(first), Some(_)) => format!("{first}\u{2026}"),
        (Some(first), None) => first,
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures::TINY_JPEG;

    fn ops(page: &Page) -> String {
        String::from_utf8(page.content.clone()).unwrap()
    }

    #[test]
    fn test_parse_jpeg() {
        let image = JpegImage::parse(TINY_JPEG.to_vec()).unwrap();
        assert_eq!((image.width, image.height, image.components), (32, 16, 3));
        assert_eq!(image.color_space(), "/DeviceRGB");

        assert!(JpegImage::parse(vec![0x89, b'P', b'N', b'G']).is_none());
        assert!(JpegImage::parse(Vec::new()).is_none());
    }

    #[test]
    fn test_each_slide_starts_a_page() {
        let mut writer = PdfWriter::new();
        let mut layout = Layout::new();
        layout
            .add_slide("One", vec![Block::Paragraph("a".into(), Font::Regular, 14.0)], &mut writer)
            .unwrap();
        layout
            .add_slide("Two", vec![Block::Row("Label".into(), "Value".into())], &mut writer)
            .unwrap();

        let pages = layout.finish("Sprint 1");
        assert_eq!(pages.len(), 2);
        assert!(ops(&pages[0]).contains("(One) Tj"));
        assert!(ops(&pages[1]).contains("(Label) Tj"));
        assert!(ops(&pages[1]).contains("(Page 2 of 2) Tj"));
        assert!(ops(&pages[0]).contains("(Sprint 1) Tj"));
    }

    #[test]
    fn test_overflow_continues_with_title() {
        let mut writer = PdfWriter::new();
        let mut layout = Layout::new();
        let blocks = (0..60)
            .map(|i| Block::Paragraph(format!("line {i}"), Font::Regular, 14.0))
            .collect();
        layout.add_slide("Long", blocks, &mut writer).unwrap();

        let pages = layout.finish("f");
        assert!(pages.len() >= 3);
        assert!(ops(&pages[1]).contains(r"(Long \(cont.\)) Tj"));
        assert!(ops(pages.last().unwrap()).contains("(line 59) Tj"));
    }

    #[test]
    fn test_tall_row_splits_across_pages() {
        let mut writer = PdfWriter::new();
        let mut layout = Layout::new();
        let value = format!("{}final", "word ".repeat(2000));
        layout
            .add_slide("Notes", vec![Block::Row("Details".into(), value)], &mut writer)
            .unwrap();

        let pages = layout.finish("f");
        assert!(pages.len() >= 3);
        assert!(ops(pages.last().unwrap()).contains("final) Tj"));
        for page in &pages {
            for op in ops(page).lines().filter(|op| op.contains(" 13 Tf ")) {
                let parts: Vec<&str> = op.split_whitespace().collect();
                let td = parts.iter().position(|part| *part == "Td").unwrap();
                let y: f32 = parts[td - 1].parse().unwrap();
                assert!(y >= CONTENT_BOTTOM, "row line drawn at {y}: {op}");
            }
        }
    }

    #[test]
    fn test_image_registers_xobject() {
        let mut writer = PdfWriter::new();
        let mut layout = Layout::new();
        let image = JpegImage::parse(TINY_JPEG.to_vec()).unwrap();
        layout
            .add_slide("Pic", vec![Block::Image(image)], &mut writer)
            .unwrap();

        let pages = layout.finish("f");
        assert_eq!(pages[0].images.len(), 1);
        assert_eq!(pages[0].images[0].0, "Im1");
        assert!(ops(&pages[0]).contains("/Im1 Do"));
    }

    #[test]
    fn test_empty_layout_has_one_page() {
        let pages = Layout::new().finish("f");
        assert_eq!(pages.len(), 1);
        assert!(ops(&pages[0]).contains("(Page 1 of 1) Tj"));
    }

    #[test]
    fn test_fit_line_truncates() {
        assert_eq!(fit_line("short", Font::Bold, 24.0, 684.0), "short");
        let long = "word ".repeat(100);
        assert!(fit_line(&long, Font::Bold, 24.0, 684.0).ends_with('\u{2026}'));
    }
}
