use thumbnail_rust::thumbnail::{BuiltinFontProvider, ThumbnailConfig, layout};

#[test]
fn square_keyword_layout() {
    let config = ThumbnailConfig::square_keyword();
    let lines = layout("桜 富士 紅葉 東京", &BuiltinFontProvider, &config).lines;
    insta::assert_json_snapshot!("square_keyword_layout", lines);
}
