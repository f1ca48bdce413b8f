use serde::Serialize;

use super::color::Color;
use super::font::{Font, TextMetrics, is_cjk};
use super::provider::FontProvider;
use super::{ThumbnailConfig, VerticalAlign, WrapPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutLine {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub color: Color,
    pub x: i32,
    pub y: i32,
    pub baseline: i32,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub font: Font,
    pub lines: Vec<LayoutLine>,
}

impl Layout {
    pub fn font_size(&self) -> u32 {
        self.font.size()
    }
}

/// Splits `text` into positioned lines for the configured canvas.
///
/// Blank input lays out the placeholder as a single line. The result never
/// holds more than `max_lines` lines; anything past that is dropped.
pub fn layout(text: &str, fonts: &dyn FontProvider, config: &ThumbnailConfig) -> Layout {
    let max_lines = config.max_lines.max(1);
    let (font, texts) = if text.trim().is_empty() {
        (
            fonts.get_font(config.font_size_for(1)),
            vec![config.placeholder.clone()],
        )
    } else {
        match config.wrap {
            WrapPolicy::SplitWhitespace => {
                let texts = split_by_whitespace(text, max_lines);
                (fonts.get_font(config.font_size_for(texts.len())), texts)
            }
            WrapPolicy::Width { max_width_px } => {
                let (font, mut texts) = wrap_with_size_steps(text, fonts, config, max_width_px);
                texts.truncate(max_lines);
                (font, texts)
            }
        }
    };
    let lines = place_lines(&texts, &font, config);
    Layout { font, lines }
}

pub fn split_by_whitespace(text: &str, max_lines: usize) -> Vec<String> {
    text.split_whitespace()
        .take(max_lines)
        .map(str::to_string)
        .collect()
}

/// Greedy word wrap against measured pixel widths. A word wider than
/// `max_width_px` gets a line of its own and is not broken.
pub fn wrap_to_width(text: &str, font: &Font, max_width_px: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in tokenize_words(text) {
        if current.is_empty() {
            current = word.text;
            continue;
        }
        let mut candidate = current.clone();
        if word.space_before {
            candidate.push(' ');
        }
        candidate.push_str(&word.text);
        if font.measure(&candidate).width <= max_width_px {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.text));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// Tries the size for 1 line, then 2, .. and keeps the first wrap that fits
// its own line budget; otherwise the smallest size is used.
fn wrap_with_size_steps(
    text: &str,
    fonts: &dyn FontProvider,
    config: &ThumbnailConfig,
    max_width_px: u32,
) -> (Font, Vec<String>) {
    let max_lines = config.max_lines.max(1);
    let mut last = None;
    for count in 1..=max_lines {
        let font = fonts.get_font(config.font_size_for(count));
        let lines = wrap_to_width(text, &font, max_width_px);
        if lines.len() <= count {
            return (font, lines);
        }
        last = Some((font, lines));
    }
    last.unwrap_or_else(|| {
        let font = fonts.get_font(config.font_size_for(max_lines));
        let lines = wrap_to_width(text, &font, max_width_px);
        (font, lines)
    })
}

struct Word {
    text: String,
    space_before: bool,
}

// Whitespace separates words; every CJK character is a word of its own and
// joins its neighbours without a space.
fn tokenize_words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut gap = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            flush_word(&mut words, &mut current, &mut gap);
            gap = true;
            continue;
        }
        if is_cjk(ch) {
            flush_word(&mut words, &mut current, &mut gap);
            words.push(Word {
                text: ch.to_string(),
                space_before: gap,
            });
            gap = false;
            continue;
        }
        current.push(ch);
    }
    flush_word(&mut words, &mut current, &mut gap);
    words
}

fn flush_word(words: &mut Vec<Word>, current: &mut String, gap: &mut bool) {
    if current.is_empty() {
        return;
    }
    words.push(Word {
        text: std::mem::take(current),
        space_before: *gap,
    });
    *gap = false;
}

fn place_lines(texts: &[String], font: &Font, config: &ThumbnailConfig) -> Vec<LayoutLine> {
    let metrics: Vec<TextMetrics> = texts.iter().map(|text| font.measure(text)).collect();
    let gaps = config.line_spacing * (texts.len() as i32 - 1).max(0);
    let total_height: i32 = metrics.iter().map(|m| m.height() as i32).sum::<i32>() + gaps;
    let canvas_w = config.canvas.width as i32;
    let canvas_h = config.canvas.height as i32;
    let mut y = match config.vertical {
        VerticalAlign::Top { offset } => offset,
        VerticalAlign::Center => (canvas_h - total_height).div_euclid(2),
    };

    let mut lines = Vec::with_capacity(texts.len());
    for (index, (text, metric)) in texts.iter().zip(metrics.iter()).enumerate() {
        lines.push(LayoutLine {
            text: text.clone(),
            width: metric.width,
            height: metric.height(),
            color: config.line_color(index),
            x: (canvas_w - i32::try_from(metric.width).unwrap_or(i32::MAX)).div_euclid(2),
            y,
            baseline: y + metric.ascent as i32,
        });
        y += metric.height() as i32 + config.line_spacing;
    }
    lines
}
