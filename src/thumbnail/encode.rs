use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;
use tiny_skia::Pixmap;

use super::{RenderError, RenderResult};

/// Encodes the canvas as an opaque RGB PNG. Only the image data chunks are
/// written, so equal canvases always give equal bytes.
pub fn encode_png(canvas: &Pixmap) -> RenderResult<Vec<u8>> {
    let (width, height) = (canvas.width(), canvas.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in canvas.pixels() {
        let color = pixel.demultiply();
        rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    let image = image::RgbImage::from_raw(width, height, rgb)
        .ok_or(RenderError::Canvas { width, height })?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgb8(image).write_to(&mut cursor, image::ImageFormat::Png)?;
    Ok(bytes)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trips_pixels() {
        let mut canvas = Pixmap::new(3, 2).unwrap();
        canvas.fill(tiny_skia::Color::from_rgba8(0x66, 0x7e, 0xea, 255));
        let bytes = encode_png(&canvas).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [0x66, 0x7e, 0xea]);
    }

    #[test]
    fn png_has_no_timestamp_chunk() {
        let canvas = Pixmap::new(4, 4).unwrap();
        let bytes = encode_png(&canvas).unwrap();
        assert!(!bytes.windows(4).any(|chunk| chunk == b"tIME"));
        assert_eq!(bytes, encode_png(&canvas).unwrap());
    }

    #[test]
    fn base64_uses_standard_alphabet() {
        assert_eq!(encode_base64(b"\x89PNG"), "iVBORw==");
    }
}
