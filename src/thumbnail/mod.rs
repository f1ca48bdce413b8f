mod color;
mod encode;
mod font;
mod layout;
mod provider;
mod render;

use thiserror::Error;

pub use color::{Color, ColorError, ParseResult, format_color, parse_color};
pub use encode::{encode_base64, encode_png};
pub use font::{
    Font, FontFace, TextMetrics, load_font_face, load_font_face_from_data,
    load_font_face_from_family,
};
pub use layout::{Layout, LayoutLine, layout, split_by_whitespace, wrap_to_width};
pub use provider::{
    BuiltinFontProvider, BundledFontProvider, FONT_FETCH_TIMEOUT, FontCache, FontProvider,
    RemoteFontProvider, SystemFontProvider,
};
pub use render::{BadgeBox, Composition, compose, gradient_at, paint_gradient, render_canvas};

pub const DEFAULT_BG_COLOR1: &str = "#667eea";
pub const DEFAULT_BG_COLOR2: &str = "#764ba2";
pub const DEFAULT_TITLE: &str = "タイトルなし";
pub const DEFAULT_KEYWORD: &str = "キーワードなし";

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidColor(#[from] ColorError),
    #[error("failed to allocate {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("failed to encode png: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapPolicy {
    /// Greedy fill up to `max_width_px` measured pixels per line.
    Width { max_width_px: u32 },
    /// One whitespace-separated token per line.
    SplitWhitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEffect {
    Plain,
    /// Text stamped in `color` at every offset within `width` px before the
    /// fill is drawn.
    Outline { width: i32, color: Color },
    Shadow { dx: i32, dy: i32, color: Color },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top { offset: i32 },
    Center,
}

/// Which request field feeds the main text block. The other one, when the
/// config has a badge, becomes the badge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Title,
    Keyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeStyle {
    pub top: i32,
    pub font_size: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub radius: f32,
    pub fill: Color,
    pub text_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailConfig {
    pub canvas: CanvasSize,
    pub wrap: WrapPolicy,
    pub effect: TextEffect,
    pub max_lines: usize,
    /// Font size for 1, 2, .. lines; counts past the end use the last entry.
    pub font_sizes: Vec<u32>,
    pub line_spacing: i32,
    pub vertical: VerticalAlign,
    pub line_colors: Vec<Color>,
    pub placeholder: String,
    pub text_source: TextSource,
    pub badge: Option<BadgeStyle>,
}

pub const FALLBACK_FONT_SIZE: u32 = 64;

impl ThumbnailConfig {
    /// 1080x1080, one keyword per line with a thick black outline.
    pub fn square_keyword() -> Self {
        Self {
            canvas: CanvasSize {
                width: 1080,
                height: 1080,
            },
            wrap: WrapPolicy::SplitWhitespace,
            effect: TextEffect::Outline {
                width: 15,
                color: Color::BLACK,
            },
            max_lines: 4,
            font_sizes: vec![320, 260, 210, 170],
            line_spacing: 60,
            vertical: VerticalAlign::Center,
            line_colors: vec![
                Color::rgb(0xff, 0xf3, 0x71),
                Color::rgb(0x62, 0xff, 0x00),
                Color::rgb(0xff, 0x00, 0xa2),
                Color::rgb(0xff, 0x00, 0xa2),
            ],
            placeholder: DEFAULT_KEYWORD.to_string(),
            text_source: TextSource::Keyword,
            badge: None,
        }
    }

    /// 1200x630 link preview: wrapped title with a drop shadow and the
    /// keyword badge underneath.
    pub fn og_title() -> Self {
        Self {
            canvas: CanvasSize {
                width: 1200,
                height: 630,
            },
            wrap: WrapPolicy::Width { max_width_px: 1000 },
            effect: TextEffect::Shadow {
                dx: 3,
                dy: 3,
                color: Color::BLACK,
            },
            max_lines: 3,
            font_sizes: vec![72, 64, 56],
            line_spacing: 20,
            vertical: VerticalAlign::Top { offset: 120 },
            line_colors: vec![Color::WHITE],
            placeholder: DEFAULT_TITLE.to_string(),
            text_source: TextSource::Title,
            badge: Some(BadgeStyle {
                top: 480,
                font_size: 36,
                padding_x: 30,
                padding_y: 14,
                radius: 24.0,
                fill: Color::rgb(0xff, 0x47, 0x57),
                text_color: Color::WHITE,
            }),
        }
    }

    /// 1080x1080 wrapped title with outline and keyword badge.
    pub fn square_title() -> Self {
        Self {
            canvas: CanvasSize {
                width: 1080,
                height: 1080,
            },
            wrap: WrapPolicy::Width { max_width_px: 960 },
            effect: TextEffect::Outline {
                width: 8,
                color: Color::BLACK,
            },
            max_lines: 3,
            font_sizes: vec![140, 110, 90],
            line_spacing: 40,
            vertical: VerticalAlign::Center,
            line_colors: vec![Color::WHITE],
            placeholder: DEFAULT_TITLE.to_string(),
            text_source: TextSource::Title,
            badge: Some(BadgeStyle {
                top: 880,
                font_size: 48,
                padding_x: 36,
                padding_y: 16,
                radius: 28.0,
                fill: Color::rgb(0xff, 0xf3, 0x71),
                text_color: Color::rgb(0x22, 0x22, 0x22),
            }),
        }
    }

    pub fn font_size_for(&self, line_count: usize) -> u32 {
        if self.font_sizes.is_empty() {
            return FALLBACK_FONT_SIZE;
        }
        let index = line_count.clamp(1, self.font_sizes.len()) - 1;
        self.font_sizes[index]
    }

    pub fn line_color(&self, index: usize) -> Color {
        match self.line_colors.len() {
            0 => Color::WHITE,
            len => self.line_colors[index.min(len - 1)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Square,
    Og,
    SquareTitle,
}

impl Variant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "square" | "square-keyword" | "1:1" => Some(Variant::Square),
            "og" | "wide" | "1200x630" => Some(Variant::Og),
            "square-title" => Some(Variant::SquareTitle),
            _ => None,
        }
    }

    pub fn config(self) -> ThumbnailConfig {
        match self {
            Variant::Square => ThumbnailConfig::square_keyword(),
            Variant::Og => ThumbnailConfig::og_title(),
            Variant::SquareTitle => ThumbnailConfig::square_title(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub title: Option<String>,
    pub keyword: Option<String>,
    pub bg_color1: String,
    pub bg_color2: String,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            title: None,
            keyword: None,
            bg_color1: DEFAULT_BG_COLOR1.to_string(),
            bg_color2: DEFAULT_BG_COLOR2.to_string(),
        }
    }
}

impl RenderRequest {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn main_text(&self, config: &ThumbnailConfig) -> &str {
        let text = match config.text_source {
            TextSource::Title => self.title.as_deref(),
            TextSource::Keyword => self.keyword.as_deref(),
        };
        text.unwrap_or("")
    }

    /// Label for the badge; `None` when the config has no badge or the text
    /// is blank.
    pub fn badge_text(&self, config: &ThumbnailConfig) -> Option<&str> {
        config.badge.as_ref()?;
        let text = match config.text_source {
            TextSource::Title => self.keyword.as_deref(),
            TextSource::Keyword => self.title.as_deref(),
        };
        text.map(str::trim).filter(|label| !label.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Binary,
    Base64,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binary" | "png" | "raw" => Some(OutputFormat::Binary),
            "base64" | "json" => Some(OutputFormat::Base64),
            _ => None,
        }
    }
}

/// Renders the request to PNG bytes.
pub fn render(
    request: &RenderRequest,
    config: &ThumbnailConfig,
    fonts: &dyn FontProvider,
) -> RenderResult<Vec<u8>> {
    let composition = compose(request, config, fonts)?;
    encode_png(&composition.canvas)
}

pub fn render_base64(
    request: &RenderRequest,
    config: &ThumbnailConfig,
    fonts: &dyn FontProvider,
) -> RenderResult<String> {
    render(request, config, fonts).map(|bytes| encode_base64(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_steps_down_with_line_count() {
        let config = ThumbnailConfig::square_keyword();
        assert_eq!(config.font_size_for(0), 320);
        assert_eq!(config.font_size_for(1), 320);
        assert_eq!(config.font_size_for(2), 260);
        assert_eq!(config.font_size_for(3), 210);
        assert_eq!(config.font_size_for(4), 170);
        assert_eq!(config.font_size_for(9), 170);
    }

    #[test]
    fn line_color_repeats_last_entry() {
        let config = ThumbnailConfig::og_title();
        assert_eq!(config.line_color(0), Color::WHITE);
        assert_eq!(config.line_color(2), Color::WHITE);
        let square = ThumbnailConfig::square_keyword();
        assert_eq!(square.line_color(7), Color::rgb(0xff, 0x00, 0xa2));
    }

    #[test]
    fn variant_names() {
        assert_eq!(Variant::parse("Square"), Some(Variant::Square));
        assert_eq!(Variant::parse("og"), Some(Variant::Og));
        assert_eq!(Variant::parse("square-title"), Some(Variant::SquareTitle));
        assert_eq!(Variant::parse("poster"), None);
        assert_eq!(Variant::Og.config().canvas.height, 630);
    }

    #[test]
    fn badge_text_comes_from_the_other_field() {
        let config = ThumbnailConfig::og_title();
        let mut request = RenderRequest::title("桜の名所");
        assert_eq!(request.main_text(&config), "桜の名所");
        assert_eq!(request.badge_text(&config), None);
        request.keyword = Some("  桜  ".to_string());
        assert_eq!(request.badge_text(&config), Some("桜"));
        request.keyword = Some("   ".to_string());
        assert_eq!(request.badge_text(&config), None);

        let square = ThumbnailConfig::square_keyword();
        let request = RenderRequest {
            title: Some("ignored".to_string()),
            ..RenderRequest::keyword("桜")
        };
        assert_eq!(request.badge_text(&square), None);
    }

    #[test]
    fn output_format_names() {
        assert_eq!(OutputFormat::parse("base64"), Some(OutputFormat::Base64));
        assert_eq!(OutputFormat::parse("PNG"), Some(OutputFormat::Binary));
        assert_eq!(OutputFormat::parse("gif"), None);
    }
}
