use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use thumbnail_rust::{RenderRequest, Variant, settings, thumbnail};

#[derive(Parser, Debug)]
#[command(
    name = "thumbnail-rust",
    version,
    about = "Render gradient text thumbnails as PNG"
)]
struct Cli {
    /// Run the HTTP server (optional address, default from settings [server])
    #[arg(long = "server", num_args = 0..=1, default_missing_value = "")]
    server: Option<String>,

    /// Title text (main text for og/square-title, badge for square)
    #[arg(short = 't', long = "title")]
    title: Option<String>,

    /// Keyword text (main text for square, badge for og/square-title)
    #[arg(short = 'k', long = "keyword")]
    keyword: Option<String>,

    /// Gradient top color (#rrggbb)
    #[arg(long = "bg-color1")]
    bg_color1: Option<String>,

    /// Gradient bottom color (#rrggbb)
    #[arg(long = "bg-color2")]
    bg_color2: Option<String>,

    /// Layout variant (square, og, square-title)
    #[arg(short = 'v', long = "variant")]
    variant: Option<String>,

    /// Output file (writes to stdout when omitted)
    #[arg(short = 'o', long = "out")]
    out: Option<String>,

    /// Emit base64 text instead of PNG bytes
    #[arg(long = "base64")]
    base64: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    thumbnail_rust::logging::init(cli.verbose)?;

    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let fonts = thumbnail_rust::build_font_provider(&settings).await;

    if let Some(addr) = cli.server {
        let addr = if addr.trim().is_empty() {
            settings.server_addr.clone()
        } else {
            addr
        };
        return thumbnail_rust::run_server(settings, fonts, addr).await;
    }

    let variant = match cli.variant.as_deref() {
        Some(value) => {
            Some(Variant::parse(value).ok_or_else(|| anyhow!("unknown variant '{}'", value))?)
        }
        None => None,
    };
    let request = RenderRequest {
        title: cli.title,
        keyword: cli.keyword,
        bg_color1: cli.bg_color1.unwrap_or_default(),
        bg_color2: cli.bg_color2.unwrap_or_default(),
    };
    let bytes = thumbnail_rust::render_with_settings(&settings, fonts.as_ref(), variant, request)?;

    let output = if cli.base64 {
        thumbnail::encode_base64(&bytes).into_bytes()
    } else {
        bytes
    };
    match cli.out {
        Some(path) => {
            fs::write(&path, &output).with_context(|| format!("failed to write {}", path))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&output)?;
            if cli.base64 {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
        }
    }
    Ok(())
}
