use tiny_skia::{FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Transform};
use tracing::debug;

use super::color::{Color, parse_color};
use super::font::Font;
use super::layout::{Layout, LayoutLine, layout};
use super::provider::FontProvider;
use super::{
    BadgeStyle, CanvasSize, RenderError, RenderRequest, RenderResult, TextEffect, ThumbnailConfig,
};

pub struct Composition {
    pub canvas: Pixmap,
    pub layout: Layout,
    pub badge: Option<BadgeBox>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeBox {
    pub label: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Parses the colors, lays out the text and paints everything onto a fresh
/// canvas.
pub fn compose(
    request: &RenderRequest,
    config: &ThumbnailConfig,
    fonts: &dyn FontProvider,
) -> RenderResult<Composition> {
    let top = parse_color(&request.bg_color1)?;
    let bottom = parse_color(&request.bg_color2)?;
    let layout = layout(request.main_text(config), fonts, config);
    let badge_text = request.badge_text(config);
    let (canvas, badge) = paint(config, top, bottom, &layout, badge_text, fonts)?;
    debug!(
        "composed {}x{} thumbnail: {} lines at {}px{}",
        config.canvas.width,
        config.canvas.height,
        layout.lines.len(),
        layout.font_size(),
        if badge.is_some() { " with badge" } else { "" }
    );
    Ok(Composition {
        canvas,
        layout,
        badge,
    })
}

/// Paints gradient, positioned lines and the optional badge.
pub fn render_canvas(
    config: &ThumbnailConfig,
    top: Color,
    bottom: Color,
    layout: &Layout,
    badge_text: Option<&str>,
    fonts: &dyn FontProvider,
) -> RenderResult<Pixmap> {
    paint(config, top, bottom, layout, badge_text, fonts).map(|(canvas, _)| canvas)
}

fn paint(
    config: &ThumbnailConfig,
    top: Color,
    bottom: Color,
    layout: &Layout,
    badge_text: Option<&str>,
    fonts: &dyn FontProvider,
) -> RenderResult<(Pixmap, Option<BadgeBox>)> {
    let mut canvas = new_canvas(config.canvas)?;
    paint_gradient(&mut canvas, top, bottom);
    for line in &layout.lines {
        draw_line(&mut canvas, &layout.font, line, config.effect);
    }
    let badge = match (config.badge.as_ref(), badge_text) {
        (Some(style), Some(label)) if !label.trim().is_empty() => {
            draw_badge(&mut canvas, label.trim(), style, fonts)
        }
        _ => None,
    };
    Ok((canvas, badge))
}

fn new_canvas(size: CanvasSize) -> RenderResult<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or(RenderError::Canvas {
        width: size.width,
        height: size.height,
    })
}

/// Color of scanline `y`: each channel is interpolated linearly and truncated.
pub fn gradient_at(top: Color, bottom: Color, y: u32, height: u32) -> Color {
    let ratio = y as f64 / height.max(1) as f64;
    let channel = |a: u8, b: u8| {
        let value = a as f64 + (b as f64 - a as f64) * ratio;
        value.clamp(0.0, 255.0) as u8
    };
    Color::rgb(
        channel(top.r, bottom.r),
        channel(top.g, bottom.g),
        channel(top.b, bottom.b),
    )
}

pub fn paint_gradient(canvas: &mut Pixmap, top: Color, bottom: Color) {
    let width = canvas.width() as usize;
    let height = canvas.height();
    let data = canvas.data_mut();
    for y in 0..height {
        let color = gradient_at(top, bottom, y, height);
        let pixel = [color.r, color.g, color.b, 255];
        let start = y as usize * width * 4;
        for chunk in data[start..start + width * 4].chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }
}

fn draw_line(canvas: &mut Pixmap, font: &Font, line: &LayoutLine, effect: TextEffect) {
    let Some(path) = font.text_path(&line.text, line.x as f32, line.baseline as f32) else {
        return;
    };
    match effect {
        TextEffect::Plain => {}
        TextEffect::Outline { width, color } => paint_outline(canvas, &path, width, color),
        TextEffect::Shadow { dx, dy, color } => fill_path(
            canvas,
            &path,
            color,
            Transform::from_translate(dx as f32, dy as f32),
        ),
    }
    fill_path(canvas, &path, line.color, Transform::identity());
}

fn fill_path(canvas: &mut Pixmap, path: &Path, color: Color, transform: Transform) {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    canvas.fill_path(path, &paint, FillRule::Winding, transform, None);
}

// Paints the text once per offset in [-radius, radius]^2 except (0, 0). The
// stamps are merged into one coverage mask (max per pixel) and filled once.
fn paint_outline(canvas: &mut Pixmap, path: &Path, radius: i32, color: Color) {
    if radius <= 0 {
        return;
    }
    let width = canvas.width();
    let height = canvas.height();
    let Some(mut glyphs) = Mask::new(width, height) else {
        return;
    };
    glyphs.fill_path(path, FillRule::Winding, true, Transform::identity());

    let bounds = path.bounds();
    let pad = radius + 1;
    let x0 = (bounds.left().floor() as i32 - pad).clamp(0, width as i32) as usize;
    let y0 = (bounds.top().floor() as i32 - pad).clamp(0, height as i32) as usize;
    let x1 = (bounds.right().ceil() as i32 + pad).clamp(0, width as i32) as usize;
    let y1 = (bounds.bottom().ceil() as i32 + pad).clamp(0, height as i32) as usize;
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let region_w = x1 - x0;
    let region_h = y1 - y0;
    let stride = width as usize;
    let mut region = vec![0u8; region_w * region_h];
    for row in 0..region_h {
        let src = (y0 + row) * stride + x0;
        region[row * region_w..(row + 1) * region_w]
            .copy_from_slice(&glyphs.data()[src..src + region_w]);
    }
    let stamped = stamp_offsets(&region, region_w, region_h, radius as usize);

    let Some(mut outline) = Mask::new(width, height) else {
        return;
    };
    let data = outline.data_mut();
    for row in 0..region_h {
        let dst = (y0 + row) * stride + x0;
        data[dst..dst + region_w].copy_from_slice(&stamped[row * region_w..(row + 1) * region_w]);
    }

    let Some(rect) = Rect::from_xywh(0.0, 0.0, width as f32, height as f32) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    canvas.fill_rect(rect, &paint, Transform::identity(), Some(&outline));
}

/// Max of `src` over every offset in the `(2r+1)^2` window around each pixel,
/// the center excluded. Row pass first, then column pass.
fn stamp_offsets(src: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    let mut row_full = vec![0u8; width * height];
    let mut row_ring = vec![0u8; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let left = row[lo..x].iter().copied().max().unwrap_or(0);
            let right = row[x + 1..=hi].iter().copied().max().unwrap_or(0);
            let ring = left.max(right);
            row_ring[y * width + x] = ring;
            row_full[y * width + x] = ring.max(row[x]);
        }
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(height - 1);
        for x in 0..width {
            let mut value = row_ring[y * width + x];
            for ny in (lo..=hi).filter(|ny| *ny != y) {
                value = value.max(row_full[ny * width + x]);
            }
            out[y * width + x] = value;
        }
    }
    out
}

fn draw_badge(
    canvas: &mut Pixmap,
    label: &str,
    style: &BadgeStyle,
    fonts: &dyn FontProvider,
) -> Option<BadgeBox> {
    let font = fonts.get_font(style.font_size);
    let metrics = font.measure(label);
    let width = metrics.width + style.padding_x * 2;
    let height = metrics.height() + style.padding_y * 2;
    let x = (canvas.width() as i32 - width as i32).div_euclid(2);
    let y = style.top;

    let rect = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32)?;
    let shape = rounded_rect(rect, style.radius)?;
    fill_path(canvas, &shape, style.fill, Transform::identity());

    let text_x = x + style.padding_x as i32;
    let baseline = y + style.padding_y as i32 + metrics.ascent as i32;
    if let Some(path) = font.text_path(label, text_x as f32, baseline as f32) {
        fill_path(canvas, &path, style.text_color, Transform::identity());
    }
    Some(BadgeBox {
        label: label.to_string(),
        x,
        y,
        width,
        height,
    })
}

fn rounded_rect(rect: Rect, radius: f32) -> Option<Path> {
    let r = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
    if r <= 0.0 {
        return Some(PathBuilder::from_rect(rect));
    }
    // Cubic approximation of a quarter circle.
    let k = r * 0.552_284_8;
    let (left, top, right, bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let mut builder = PathBuilder::new();
    builder.move_to(left + r, top);
    builder.line_to(right - r, top);
    builder.cubic_to(right - r + k, top, right, top + r - k, right, top + r);
    builder.line_to(right, bottom - r);
    builder.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    builder.line_to(left + r, bottom);
    builder.cubic_to(left + r - k, bottom, left, bottom - r + k, left, bottom - r);
    builder.line_to(left, top + r);
    builder.cubic_to(left, top + r - k, left + r - k, top, left + r, top);
    builder.close();
    builder.finish()
}
