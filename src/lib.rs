use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub mod logging;
mod server;
pub mod settings;
pub mod thumbnail;

pub use server::run_server;
pub use thumbnail::{
    BuiltinFontProvider, BundledFontProvider, FontProvider, OutputFormat, RemoteFontProvider,
    RenderError, RenderRequest, SystemFontProvider, ThumbnailConfig, Variant, render,
    render_base64,
};

/// Picks the first font source that yields a real face: the configured
/// font file, then installed families, then the remote download. Falls back
/// to the built-in block font when none of them work.
pub async fn build_font_provider(settings: &settings::Settings) -> Arc<dyn FontProvider> {
    if let Some(path) = settings.font_path.as_deref() {
        if Path::new(path).exists() {
            let provider = BundledFontProvider::new(path);
            if !provider.get_font(thumbnail::FALLBACK_FONT_SIZE).is_builtin() {
                info!("using font file {}", path);
                return Arc::new(provider);
            }
        } else {
            warn!("font file not found: {}", path);
        }
    }

    if settings.font_family.is_some() || !settings.font_fallback_families.is_empty() {
        let provider = SystemFontProvider::new(
            settings.font_family.as_deref(),
            &settings.font_fallback_families,
        );
        if !provider.get_font(thumbnail::FALLBACK_FONT_SIZE).is_builtin() {
            return Arc::new(provider);
        }
    }

    if !settings.font_urls.is_empty() {
        let provider = RemoteFontProvider::new(settings.font_urls.clone());
        if provider.prefetch().await {
            return Arc::new(provider);
        }
    }

    warn!("no usable font found; rendering with the built-in font");
    Arc::new(BuiltinFontProvider)
}

/// Renders one thumbnail using file/settings defaults for anything the
/// request leaves out.
pub fn render_with_settings(
    settings: &settings::Settings,
    fonts: &dyn FontProvider,
    variant: Option<Variant>,
    mut request: RenderRequest,
) -> Result<Vec<u8>> {
    let variant = variant.unwrap_or(settings.default_variant);
    let config = settings.thumbnail_config(variant);
    if request.bg_color1.trim().is_empty() {
        request.bg_color1 = settings.bg_color1.clone();
    }
    if request.bg_color2.trim().is_empty() {
        request.bg_color2 = settings.bg_color2.clone();
    }
    render(&request, &config, fonts)
        .with_context(|| format!("failed to render {:?} thumbnail", variant))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_colors_take_settings_defaults() {
        let mut settings = settings::Settings::default();
        settings.bg_color1 = "#000000".to_string();
        settings.bg_color2 = "#000000".to_string();
        let request = RenderRequest {
            bg_color1: String::new(),
            bg_color2: " ".to_string(),
            ..RenderRequest::keyword("桜")
        };
        let bytes =
            render_with_settings(&settings, &BuiltinFontProvider, None, request).unwrap();
        let image = ::image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (1080, 1080));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn render_errors_carry_context() {
        let request = RenderRequest {
            bg_color1: "#12".to_string(),
            ..RenderRequest::keyword("桜")
        };
        let err = render_with_settings(
            &settings::Settings::default(),
            &BuiltinFontProvider,
            Some(Variant::Og),
            request,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Og"));
        assert!(format!("{:#}", err).contains("invalid color"));
    }

    #[tokio::test]
    async fn empty_font_settings_use_builtin() {
        let settings = settings::Settings::default();
        let fonts = build_font_provider(&settings).await;
        assert!(fonts.get_font(100).is_builtin());
    }
}
