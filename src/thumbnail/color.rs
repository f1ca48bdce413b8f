use serde::{Serialize, Serializer};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ColorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid color '{value}': expected 6 hex digits (#RRGGBB)")]
    InvalidLength { value: String },
    #[error("invalid color '{value}': '{digit}' is not a hex digit")]
    InvalidDigit { value: String, digit: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, 255)
    }
}

impl std::str::FromStr for Color {
    type Err = ColorError;

    fn from_str(value: &str) -> ParseResult<Self> {
        parse_color(value)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses `#RRGGBB` (the `#` is optional). Anything other than exactly six
/// hex digits is rejected.
pub fn parse_color(value: &str) -> ParseResult<Color> {
    let trimmed = value.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.chars().count() != 6 {
        return Err(ColorError::InvalidLength {
            value: value.to_string(),
        });
    }
    if let Some(digit) = hex.chars().find(|ch| !ch.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidDigit {
            value: value.to_string(),
            digit,
        });
    }
    let channel = |start: usize| {
        u8::from_str_radix(&hex[start..start + 2], 16).map_err(|_| ColorError::InvalidLength {
            value: value.to_string(),
        })
    };
    Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
}

pub fn format_color(color: Color) -> String {
    color.to_string()
}
