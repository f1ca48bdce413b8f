use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{PathBuilder, Rect};
use ttf_parser::{Face, OutlineBuilder, name_id};
use usvg::fontdb;

/// Parsed font file plus the vertical metrics needed for layout.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
    family: Option<String>,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontFace {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn parse(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }

    fn scale(&self, size: u32) -> f32 {
        size as f32 / self.units_per_em.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub width: u32,
    pub ascent: u32,
    pub descent: u32,
}

impl TextMetrics {
    pub fn height(&self) -> u32 {
        self.ascent + self.descent
    }
}

/// A font resolved at one pixel size.
///
/// `Builtin` needs no font file: every visible character is drawn as a solid
/// block with estimated advances, so layout keeps working when no real font
/// could be loaded.
#[derive(Debug, Clone)]
pub enum Font {
    Outline { face: Arc<FontFace>, size: u32 },
    Builtin { size: u32 },
}

impl Font {
    pub fn builtin(size: u32) -> Self {
        Font::Builtin { size: size.max(1) }
    }

    pub fn outline(face: Arc<FontFace>, size: u32) -> Self {
        Font::Outline {
            face,
            size: size.max(1),
        }
    }

    /// Outline font for a loaded face, the built-in font otherwise.
    pub fn from_face(face: Option<Arc<FontFace>>, size: u32) -> Self {
        match face {
            Some(face) => Font::outline(face, size),
            None => Font::builtin(size),
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            Font::Outline { size, .. } | Font::Builtin { size } => *size,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Font::Builtin { .. })
    }

    pub fn measure(&self, text: &str) -> TextMetrics {
        match self {
            Font::Outline { face, size } => match face.parse() {
                Some(parsed) => {
                    let scale = face.scale(*size);
                    let advance = outline_advance_units(face, &parsed, text);
                    TextMetrics {
                        width: (advance as f32 * scale).ceil() as u32,
                        ascent: (face.ascender.max(0) as f32 * scale).ceil() as u32,
                        descent: ((-face.descender).max(0) as f32 * scale).ceil() as u32,
                    }
                }
                None => builtin_metrics(text, *size),
            },
            Font::Builtin { size } => builtin_metrics(text, *size),
        }
    }

    /// Builds the fill path of `text` with its left edge at `x` and its
    /// baseline at `baseline`. `None` when nothing visible would be drawn.
    pub(crate) fn text_path(&self, text: &str, x: f32, baseline: f32) -> Option<tiny_skia::Path> {
        match self {
            Font::Outline { face, size } => match face.parse() {
                Some(parsed) => outline_text_path(face, &parsed, *size, text, x, baseline),
                None => builtin_text_path(text, *size, x, baseline),
            },
            Font::Builtin { size } => builtin_text_path(text, *size, x, baseline),
        }
    }
}

fn outline_advance_units(face: &FontFace, parsed: &Face<'_>, text: &str) -> u32 {
    let mut advance = 0u32;
    for ch in text.chars() {
        if ch == '\n' {
            continue;
        }
        advance = advance.saturating_add(glyph_advance(face, parsed, ch) as u32);
    }
    advance
}

fn glyph_advance(face: &FontFace, parsed: &Face<'_>, ch: char) -> u16 {
    if ch == ' ' {
        return face.space_advance;
    }
    parsed
        .glyph_index(ch)
        .and_then(|glyph| parsed.glyph_hor_advance(glyph))
        .unwrap_or(face.space_advance)
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn outline_text_path(
    face: &FontFace,
    parsed: &Face<'_>,
    size: u32,
    text: &str,
    x: f32,
    baseline: f32,
) -> Option<tiny_skia::Path> {
    let scale = face.scale(size);
    let mut glyphs = GlyphPathBuilder {
        builder: PathBuilder::new(),
        origin_x: x,
        origin_y: baseline,
        scale,
    };
    for ch in text.chars() {
        if ch == '\n' {
            continue;
        }
        if !ch.is_whitespace() {
            if let Some(glyph) = parsed.glyph_index(ch) {
                parsed.outline_glyph(glyph, &mut glyphs);
            }
        }
        glyphs.origin_x += glyph_advance(face, parsed, ch) as f32 * scale;
    }
    glyphs.builder.finish()
}

/// Advance of a built-in glyph in thousandths of an em.
fn builtin_char_units(ch: char) -> u32 {
    if ch.is_whitespace() {
        250
    } else if ch.is_ascii_alphanumeric() {
        550
    } else if ch.is_ascii() {
        350
    } else if is_cjk(ch) {
        1000
    } else {
        900
    }
}

pub(crate) fn is_cjk(ch: char) -> bool {
    matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    )
}

fn builtin_ascent(size: u32) -> u32 {
    (size as f32 * 0.8).round() as u32
}

fn builtin_metrics(text: &str, size: u32) -> TextMetrics {
    let units: u64 = text
        .chars()
        .filter(|ch| *ch != '\n')
        .map(|ch| builtin_char_units(ch) as u64)
        .sum();
    let width = units.saturating_mul(size as u64).div_ceil(1000);
    let ascent = builtin_ascent(size);
    TextMetrics {
        width: u32::try_from(width).unwrap_or(u32::MAX),
        ascent,
        descent: size.saturating_sub(ascent),
    }
}

fn builtin_text_path(text: &str, size: u32, x: f32, baseline: f32) -> Option<tiny_skia::Path> {
    let size_px = size as f32;
    let block_h = builtin_ascent(size) as f32 * 0.85;
    let mut builder = PathBuilder::new();
    let mut pen = x;
    for ch in text.chars() {
        if ch == '\n' {
            continue;
        }
        let advance = builtin_char_units(ch) as f32 / 1000.0 * size_px;
        if !ch.is_whitespace() {
            if let Some(rect) =
                Rect::from_xywh(pen + advance * 0.1, baseline - block_h, advance * 0.8, block_h)
            {
                builder.push_rect(rect);
            }
        }
        pen += advance;
    }
    builder.finish()
}

pub fn load_font_face(path: &Path) -> Result<FontFace> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_face_from_data(data, None)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

pub fn load_font_face_from_data(data: Vec<u8>, preferred_family: Option<&str>) -> Result<FontFace> {
    let data = Arc::new(data);
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    for index in 0..count {
        if let Some(face) = font_face_at(&data, index) {
            if let (Some(preferred), Some(found)) = (preferred_family, face.family()) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(face);
                }
            }
            if fallback.is_none() {
                fallback = Some(face);
            }
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn font_face_at(data: &Arc<Vec<u8>>, index: u32) -> Option<FontFace> {
    let face = Face::parse(data, index).ok()?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Some(FontFace {
        data: data.clone(),
        face_index: index,
        units_per_em,
        ascender: face.ascender(),
        descender: face.descender(),
        space_advance,
        family: extract_family_name(&face),
    })
}

pub fn load_font_face_from_family(db: &fontdb::Database, family: &str) -> Result<FontFace> {
    let is_sans = family.eq_ignore_ascii_case("sans-serif");
    let families = if is_sans {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    font_face_at(&Arc::new(data), face_index)
        .ok_or_else(|| anyhow!("failed to parse font data: {}", family))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
