use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::settings;
use crate::thumbnail::FontProvider;

use super::state::ServerState;
use super::thumbnail::{ServerError, thumbnail_request};

pub async fn run_server(
    settings: settings::Settings,
    fonts: Arc<dyn FontProvider>,
    addr: String,
) -> Result<()> {
    let state = Arc::new(ServerState { settings, fonts });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/thumbnail", post(thumbnail))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
}

async fn thumbnail(State(state): State<Arc<ServerState>>, body: Bytes) -> axum::response::Response {
    let result = tokio::task::spawn_blocking(move || thumbnail_request(state.as_ref(), &body)).await;
    match result {
        Ok(Ok(output)) => output.into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(err) => ServerError::internal(format!("render task failed: {}", err)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::BuiltinFontProvider;
    use axum::http::header;

    fn build_state() -> Arc<ServerState> {
        Arc::new(ServerState {
            settings: settings::Settings::default(),
            fonts: Arc::new(BuiltinFontProvider),
        })
    }

    #[test]
    fn cors_headers_are_applied() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers);
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    }

    #[tokio::test]
    async fn thumbnail_handler_returns_png() {
        let body = Bytes::from(r#"{"keyword": "桜 富士"}"#);
        let response = thumbnail(State(build_state()), body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn thumbnail_handler_reports_errors_as_json() {
        let body = Bytes::from(r##"{"bg_color2": "#nothex"}"##);
        let response = thumbnail(State(build_state()), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn router_builds() {
        let _ = router(build_state());
    }
}
