use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;
use thumbnail_rust::thumbnail::{
    BuiltinFontProvider, RenderRequest, ThumbnailConfig, Variant, compose, render, render_base64,
};

fn decode(bytes: &[u8]) -> RgbImage {
    image::load_from_memory(bytes).expect("png").to_rgb8()
}

#[test]
fn square_keywords_get_one_color_per_line() {
    let config = ThumbnailConfig::square_keyword();
    let request = RenderRequest::keyword("桜 富士 紅葉 東京");
    let image = decode(&render(&request, &config, &BuiltinFontProvider).unwrap());
    assert_eq!(image.dimensions(), (1080, 1080));

    // Centers of the first glyph box on each line.
    assert_eq!(image.get_pixel(540, 190).0, [0xff, 0xf3, 0x71]);
    assert_eq!(image.get_pixel(455, 420).0, [0x62, 0xff, 0x00]);
    assert_eq!(image.get_pixel(455, 650).0, [0xff, 0x00, 0xa2]);
    assert_eq!(image.get_pixel(455, 880).0, [0xff, 0x00, 0xa2]);

    // Just above the first glyph, inside the 15px outline.
    assert_eq!(image.get_pixel(540, 124).0, [0, 0, 0]);
}

#[test]
fn gradient_starts_at_first_color() {
    let config = ThumbnailConfig::square_keyword();
    let request = RenderRequest {
        bg_color1: "#FF0000".to_string(),
        bg_color2: "#0000ff".to_string(),
        ..RenderRequest::keyword("桜")
    };
    let image = decode(&render(&request, &config, &BuiltinFontProvider).unwrap());
    for x in [0, 300, 1079] {
        assert_eq!(image.get_pixel(x, 0).0, [255, 0, 0]);
    }
    let bottom = image.get_pixel(0, 1079).0;
    assert!(bottom[0] <= 1 && bottom[1] == 0 && bottom[2] >= 254);
}

#[test]
fn rendering_is_deterministic() {
    let config = Variant::Og.config();
    let request = RenderRequest {
        keyword: Some("桜".to_string()),
        ..RenderRequest::title("日本の美しい桜スポット10選")
    };
    let first = render(&request, &config, &BuiltinFontProvider).unwrap();
    let second = render(&request, &config, &BuiltinFontProvider).unwrap();
    assert_eq!(first, second);

    let encoded = render_base64(&request, &config, &BuiltinFontProvider).unwrap();
    assert_eq!(BASE64.decode(encoded).unwrap(), first);
}

#[test]
fn blank_label_leaves_badge_out() {
    let with_badge = ThumbnailConfig::square_title();
    let mut without_badge = with_badge.clone();
    without_badge.badge = None;

    for keyword in ["", "   "] {
        let request = RenderRequest {
            keyword: Some(keyword.to_string()),
            ..RenderRequest::title("週末の京都さんぽ")
        };
        let composition = compose(&request, &with_badge, &BuiltinFontProvider).unwrap();
        assert!(composition.badge.is_none(), "badge drawn for {keyword:?}");
        assert_eq!(
            render(&request, &with_badge, &BuiltinFontProvider).unwrap(),
            render(&request, &without_badge, &BuiltinFontProvider).unwrap()
        );
    }
}

#[test]
fn oversized_keyword_still_renders() {
    let config = ThumbnailConfig::square_keyword();
    let request = RenderRequest::keyword("한".repeat(15_000));
    let composition = compose(&request, &config, &BuiltinFontProvider).unwrap();
    assert_eq!(composition.layout.lines.len(), 1);
    assert!(composition.layout.lines[0].x < 0);
    assert_eq!(
        (composition.canvas.width(), composition.canvas.height()),
        (1080, 1080)
    );
}

#[test]
fn og_layout_fits_inside_the_canvas() {
    let config = Variant::Og.config();
    let request = RenderRequest {
        keyword: Some("旅行".to_string()),
        ..RenderRequest::title("あ".repeat(80))
    };
    let composition = compose(&request, &config, &BuiltinFontProvider).unwrap();
    let layout = &composition.layout;
    assert!(layout.lines.len() <= 3);
    assert_eq!(layout.font_size(), 56);
    for line in &layout.lines {
        assert!(line.x >= 0);
        assert!(line.width <= 1000 || line.text.chars().count() == 1);
    }
    let badge = composition.badge.expect("badge");
    assert_eq!(badge.label, "旅行");
    assert_eq!(badge.y, 480);
    assert_eq!(badge.x, (1200 - badge.width as i32) / 2);
}
