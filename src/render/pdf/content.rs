//! Page content streams and text encoding for the standard Helvetica fonts.

use std::fmt::Write;

/// Standard 14 fonts registered on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    /// Average glyph advance as a fraction of the font size.
    fn average_advance(&self) -> f32 {
        match self {
            Font::Regular => 0.5,
            Font::Bold => 0.55,
        }
    }
}

/// RGB fill colour with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const INK: Color = Color(0.12, 0.16, 0.23);
    pub const MUTED: Color = Color(0.4, 0.45, 0.53);
    pub const ACCENT: Color = Color(0.11, 0.31, 0.85);
    pub const WHITE: Color = Color(1.0, 1.0, 1.0);
}

#[derive(Debug, Default)]
pub struct ContentStream {
    ops: String,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, font: Font, size: f32, color: Color, x: f32, y: f32, text: &str) {
        // Writing into a String cannot fail.
        let _ = writeln!(
            self.ops,
            "BT {} rg /{} {} Tf {} {} Td {} Tj ET",
            rgb(color),
            font.resource_name(),
            num(size),
            num(x),
            num(y),
            encode_text(text)
        );
    }

    pub fn fill_rect(&mut self, color: Color, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(
            self.ops,
            "{} rg {} {} {} {} re f",
            rgb(color),
            num(x),
            num(y),
            num(width),
            num(height)
        );
    }

    /// Draws the XObject `name` scaled into the given box.
    pub fn image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(
            self.ops,
            "q {} 0 0 {} {} {} cm /{} Do Q",
            num(width),
            num(height),
            num(x),
            num(y),
            name
        );
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.ops.into_bytes()
    }
}

fn rgb(color: Color) -> String {
    format!("{} {} {}", num(color.0), num(color.1), num(color.2))
}

/// Compact number form: two decimals at most, no trailing zeros.
fn num(value: f32) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// PDF literal string in WinAnsi encoding. Characters outside the
/// encoding become `?`.
pub fn encode_text(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len() + 2);
    encoded.push('(');
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                encoded.push('\\');
                encoded.push(c);
            }
            ' '..='~' => encoded.push(c),
            '\t' => encoded.push(' '),
            _ => {
                let byte = win_ansi_byte(c).unwrap_or(b'?');
                if byte.is_ascii() {
                    encoded.push(byte as char);
                } else {
                    let _ = write!(encoded, "\\{:03o}", byte);
                }
            }
        }
    }
    encoded.push(')');
    encoded
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        '\u{20AC}' => Some(0x80),
        '\u{2026}' => Some(0x85),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        _ => None,
    }
}

/// Approximate rendered width of `text`.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().count() as f32 * size * font.average_advance()
}

/// Greedy word wrap to `max_width`; words longer than a line are split.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * font.average_advance())).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
