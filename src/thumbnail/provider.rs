use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};
use usvg::fontdb;

use super::font::{Font, FontFace, load_font_face, load_font_face_from_data, load_font_face_from_family};

pub const FONT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves a renderable font at a pixel size.
///
/// Implementations never fail: when their source is unavailable they hand out
/// [`Font::Builtin`].
pub trait FontProvider: Send + Sync {
    fn get_font(&self, pixel_size: u32) -> Font;
}

/// Load-once slot for a parsed font face.
///
/// The first load decides the content for the rest of the process lifetime,
/// including a failed load, which is remembered as `None`.
#[derive(Default)]
pub struct FontCache {
    slot: OnceLock<Option<Arc<FontFace>>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<F>(&self, source: &str, load: F) -> Option<Arc<FontFace>>
    where
        F: FnOnce() -> Result<FontFace>,
    {
        self.slot
            .get_or_init(|| match load() {
                Ok(face) => {
                    info!(
                        "loaded font from {} ({})",
                        source,
                        face.family().unwrap_or("unknown family")
                    );
                    Some(Arc::new(face))
                }
                Err(err) => {
                    warn!("font unavailable from {}: {:#}; using built-in font", source, err);
                    None
                }
            })
            .clone()
    }

    pub fn get(&self) -> Option<Arc<FontFace>> {
        self.slot.get().cloned().flatten()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFontProvider;

impl FontProvider for BuiltinFontProvider {
    fn get_font(&self, pixel_size: u32) -> Font {
        Font::builtin(pixel_size)
    }
}

/// Font file shipped next to the binary.
pub struct BundledFontProvider {
    path: PathBuf,
    cache: FontCache,
}

impl BundledFontProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: FontCache::new(),
        }
    }
}

impl FontProvider for BundledFontProvider {
    fn get_font(&self, pixel_size: u32) -> Font {
        let source = self.path.display().to_string();
        let face = self.cache.get_or_load(&source, || load_font_face(&self.path));
        Font::from_face(face, pixel_size)
    }
}

/// Installed font looked up by family name, trying `fallback` families in
/// order when the preferred one is missing.
pub struct SystemFontProvider {
    families: Vec<String>,
    cache: FontCache,
}

impl SystemFontProvider {
    pub fn new(family: Option<&str>, fallback: &[String]) -> Self {
        let mut families = Vec::new();
        if let Some(family) = family.map(str::trim).filter(|name| !name.is_empty()) {
            families.push(family.to_string());
        }
        families.extend(fallback.iter().cloned());
        Self {
            families,
            cache: FontCache::new(),
        }
    }

    fn load(&self) -> Result<FontFace> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for family in &self.families {
            if let Ok(face) = load_font_face_from_family(&db, family) {
                return Ok(face);
            }
        }
        Err(anyhow!("no font found for families [{}]", self.families.join(", ")))
    }
}

impl FontProvider for SystemFontProvider {
    fn get_font(&self, pixel_size: u32) -> Font {
        let face = self.cache.get_or_load("system fonts", || self.load());
        Font::from_face(face, pixel_size)
    }
}

/// Font downloaded over HTTP. [`RemoteFontProvider::prefetch`] must run once
/// (at startup) before the face is used; until then, and after a failed
/// download, `get_font` returns the built-in font.
pub struct RemoteFontProvider {
    urls: Vec<String>,
    cache: FontCache,
}

impl RemoteFontProvider {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            cache: FontCache::new(),
        }
    }

    pub async fn prefetch(&self) -> bool {
        if self.cache.is_loaded() {
            return self.cache.get().is_some();
        }
        let result = self.download().await;
        self.cache
            .get_or_load("remote font", move || result)
            .is_some()
    }

    async fn download(&self) -> Result<FontFace> {
        let client = reqwest::Client::builder()
            .timeout(FONT_FETCH_TIMEOUT)
            .build()
            .with_context(|| "failed to build font http client")?;
        let mut last_error = anyhow!("no font urls configured");
        for url in &self.urls {
            match fetch_font(&client, url).await {
                Ok(face) => return Ok(face),
                Err(err) => {
                    warn!("font download failed: {:#}", err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

async fn fetch_font(client: &reqwest::Client, url: &str) -> Result<FontFace> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to request font: {}", url))?
        .error_for_status()
        .with_context(|| format!("font request rejected: {}", url))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read font body: {}", url))?;
    load_font_face_from_data(bytes.to_vec(), None)
        .with_context(|| format!("failed to parse downloaded font: {}", url))
}

impl FontProvider for RemoteFontProvider {
    fn get_font(&self, pixel_size: u32) -> Font {
        Font::from_face(self.cache.get(), pixel_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builtin_provider_returns_requested_size() {
        let font = BuiltinFontProvider.get_font(170);
        assert!(font.is_builtin());
        assert_eq!(font.size(), 170);
    }

    #[test]
    fn missing_bundled_font_falls_back_to_builtin() {
        let provider = BundledFontProvider::new("/nonexistent/NotoSansCJKjp-Bold.otf");
        let font = provider.get_font(60);
        assert!(font.is_builtin());
        assert_eq!(font.size(), 60);
    }

    #[test]
    fn cache_loads_once_and_remembers_failure() {
        let cache = FontCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let face = cache.get_or_load("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("boom"))
            });
            assert!(face.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded());
        assert!(cache.get().is_none());
    }

    #[test]
    fn remote_provider_is_builtin_before_prefetch() {
        let provider = RemoteFontProvider::new(vec!["http://127.0.0.1:9/font.otf".to_string()]);
        assert!(provider.get_font(40).is_builtin());
    }

    #[tokio::test]
    async fn remote_provider_without_urls_falls_back() {
        let provider = RemoteFontProvider::new(Vec::new());
        assert!(!provider.prefetch().await);
        assert!(provider.get_font(40).is_builtin());
        assert!(!provider.prefetch().await);
    }

    #[test]
    fn system_provider_with_unknown_family_never_fails() {
        let provider = SystemFontProvider::new(Some("No Such Family 12345"), &[]);
        assert_eq!(provider.get_font(32).size(), 32);
    }
}
