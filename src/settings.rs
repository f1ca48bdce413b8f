use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::thumbnail::{
    DEFAULT_BG_COLOR1, DEFAULT_BG_COLOR2, TextSource, ThumbnailConfig, Variant, parse_color,
};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub font_path: Option<String>,
    pub font_family: Option<String>,
    pub font_fallback_families: Vec<String>,
    pub font_urls: Vec<String>,
    pub default_variant: Variant,
    pub default_title: Option<String>,
    pub default_keyword: Option<String>,
    pub bg_color1: String,
    pub bg_color2: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            font_path: None,
            font_family: None,
            font_fallback_families: Vec::new(),
            font_urls: Vec::new(),
            default_variant: Variant::Square,
            default_title: None,
            default_keyword: None,
            bg_color1: DEFAULT_BG_COLOR1.to_string(),
            bg_color2: DEFAULT_BG_COLOR2.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    font: Option<FontSettings>,
    defaults: Option<DefaultSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    path: Option<String>,
    family: Option<String>,
    fallback_families: Option<Vec<String>>,
    urls: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultSettings {
    variant: Option<String>,
    title: Option<String>,
    keyword: Option<String>,
    bg_color1: Option<String>,
    bg_color2: Option<String>,
}

/// Loads the embedded defaults, then `settings.toml` and
/// `settings.local.toml` from the working directory, then `extra_path`.
/// Later files override earlier ones key by key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let embedded: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(embedded)?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
        }
        if let Some(font) = incoming.font {
            if let Some(path) = non_empty(font.path) {
                self.font_path = Some(path);
            }
            if let Some(family) = non_empty(font.family) {
                self.font_family = Some(family);
            }
            if let Some(families) = font.fallback_families {
                self.font_fallback_families = families;
            }
            if let Some(urls) = font.urls {
                self.font_urls = urls;
            }
        }
        if let Some(defaults) = incoming.defaults {
            if let Some(variant) = non_empty(defaults.variant) {
                self.default_variant = Variant::parse(&variant)
                    .ok_or_else(|| anyhow!("unknown thumbnail variant '{}'", variant))?;
            }
            if let Some(title) = non_empty(defaults.title) {
                self.default_title = Some(title);
            }
            if let Some(keyword) = non_empty(defaults.keyword) {
                self.default_keyword = Some(keyword);
            }
            if let Some(color) = non_empty(defaults.bg_color1) {
                parse_color(&color)?;
                self.bg_color1 = color;
            }
            if let Some(color) = non_empty(defaults.bg_color2) {
                parse_color(&color)?;
                self.bg_color2 = color;
            }
        }
        Ok(())
    }

    /// Preset for `variant` with the configured placeholder text applied.
    pub fn thumbnail_config(&self, variant: Variant) -> ThumbnailConfig {
        let mut config = variant.config();
        let placeholder = match config.text_source {
            TextSource::Title => self.default_title.as_ref(),
            TextSource::Keyword => self.default_keyword.as_ref(),
        };
        if let Some(text) = placeholder {
            config.placeholder = text.clone();
        }
        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
