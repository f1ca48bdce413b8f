use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::thumbnail::{self, OutputFormat, RenderError, RenderRequest, Variant};

use super::models::{ErrorResponse, ImageResponse, ThumbnailRequest};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<RenderError> for ServerError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidColor(_) => ServerError::bad_request(err.to_string()),
            other => ServerError::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub(crate) enum ThumbnailOutput {
    Png(Vec<u8>),
    Base64(String),
}

impl IntoResponse for ThumbnailOutput {
    fn into_response(self) -> Response {
        match self {
            ThumbnailOutput::Png(bytes) => {
                ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
            }
            ThumbnailOutput::Base64(image) => Json(ImageResponse {
                success: true,
                image,
            })
            .into_response(),
        }
    }
}

pub(crate) fn thumbnail_request(
    state: &ServerState,
    body: &[u8],
) -> Result<ThumbnailOutput, ServerError> {
    let request: ThumbnailRequest = serde_json::from_slice(body)
        .map_err(|err| ServerError::bad_request(format!("invalid request body: {}", err)))?;

    let variant = match request.variant.as_deref() {
        Some(value) => Variant::parse(value)
            .ok_or_else(|| ServerError::bad_request(format!("unknown variant '{}'", value)))?,
        None => state.settings.default_variant,
    };
    let format = match request.format.as_deref() {
        Some(value) => OutputFormat::parse(value)
            .ok_or_else(|| ServerError::bad_request(format!("unknown format '{}'", value)))?,
        None => OutputFormat::Binary,
    };
    let config = state.settings.thumbnail_config(variant);
    let render_request = RenderRequest {
        title: request.title,
        keyword: request.keyword,
        bg_color1: request
            .bg_color1
            .unwrap_or_else(|| state.settings.bg_color1.clone()),
        bg_color2: request
            .bg_color2
            .unwrap_or_else(|| state.settings.bg_color2.clone()),
    };

    let bytes = thumbnail::render(&render_request, &config, state.fonts.as_ref()).map_err(
        |err| {
            warn!("thumbnail render failed: {}", err);
            ServerError::from(err)
        },
    )?;
    info!(
        "rendered {:?} thumbnail ({} bytes, {:?})",
        variant,
        bytes.len(),
        format
    );
    Ok(match format {
        OutputFormat::Binary => ThumbnailOutput::Png(bytes),
        OutputFormat::Base64 => ThumbnailOutput::Base64(thumbnail::encode_base64(&bytes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::thumbnail::BuiltinFontProvider;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use std::sync::Arc;

    fn build_state() -> ServerState {
        ServerState {
            settings: Settings::default(),
            fonts: Arc::new(BuiltinFontProvider),
        }
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn binary_is_the_default_format() {
        let body = r#"{"keyword": "桜 富士 紅葉 東京"}"#.as_bytes();
        let output = thumbnail_request(&build_state(), body).expect("render");
        let ThumbnailOutput::Png(bytes) = output else {
            panic!("expected png output");
        };
        assert!(bytes.starts_with(PNG_MAGIC));
    }

    #[test]
    fn base64_format_wraps_png() {
        let body = r#"{"title": "日本の美しい桜スポット10選", "keyword": "桜", "variant": "og", "format": "base64"}"#
            .as_bytes();
        let output = thumbnail_request(&build_state(), body).expect("render");
        let ThumbnailOutput::Base64(image) = output else {
            panic!("expected base64 output");
        };
        let bytes = BASE64.decode(image).expect("decode");
        assert!(bytes.starts_with(PNG_MAGIC));
        let decoded = image::load_from_memory(&bytes).expect("png").to_rgb8();
        assert_eq!(decoded.dimensions(), (1200, 630));
    }

    #[test]
    fn invalid_color_is_a_bad_request() {
        let body = r##"{"keyword": "桜", "bg_color1": "#abc"}"##.as_bytes();
        let err = thumbnail_request(&build_state(), body).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("invalid color"));
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let err = thumbnail_request(&build_state(), b"{not json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("invalid request body"));
    }

    #[test]
    fn unknown_variant_and_format_are_rejected() {
        let err = thumbnail_request(&build_state(), br#"{"variant": "poster"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = thumbnail_request(&build_state(), br#"{"format": "gif"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn canvas_failure_is_internal() {
        let err = ServerError::from(RenderError::Canvas {
            width: 0,
            height: 0,
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_response_body_shape() {
        let body = serde_json::to_value(ErrorResponse {
            success: false,
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "success": false, "error": "boom" }));
    }
}
