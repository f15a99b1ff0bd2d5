//! HTTP Server for the tripstar API.
//!
//! Lets an orchestrator hand a trip CSV over the network and receive the star
//! schema back.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/transform`  | Upload a trip CSV, get the 8 tables  |
//! | GET    | `/api/logs`       | SSE stream of progress logs          |

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, TransformResponse};
use crate::error::{ServerError, ServerResult};
use crate::transform::pipeline::{transform_bytes, TransformOptions};

type ApiError = (StatusCode, Json<Value>);

/// Build the router
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> ServerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info(format!("🚀 Tripstar server running on http://localhost:{}", port));
    log_info("   POST /api/transform - Upload trip CSV");
    log_info("   GET  /api/logs      - SSE log stream");
    log_info("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    axum::serve(listener, router())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tripstar",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transform": "POST /api/transform",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn reject(status: StatusCode, err: ServerError) -> ApiError {
    log_error(err.to_string());
    (status, Json(error_response(&err.to_string())))
}

/// Parse a `delimiter` form field: one character, or `\t`/`tab`.
fn parse_delimiter(raw: &str) -> Result<char, ServerError> {
    match raw {
        "\\t" | "tab" | "TAB" => Ok('\t'),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(ServerError::BadRequest(format!("invalid delimiter '{}'", raw))),
            }
        }
    }
}

/// Upload endpoint: multipart field `file`, optional field `delimiter`.
async fn transform_upload(mut multipart: Multipart) -> Result<Json<TransformResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = TransformOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(StatusCode::BAD_REQUEST, ServerError::BadRequest(format!("multipart error: {}", e)))
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    reject(StatusCode::BAD_REQUEST, ServerError::BadRequest(format!("read error: {}", e)))
                })?;
                file_data = Some(bytes.to_vec());
            }
            "delimiter" => {
                let text = field.text().await.map_err(|e| {
                    reject(StatusCode::BAD_REQUEST, ServerError::BadRequest(format!("read error: {}", e)))
                })?;
                options.delimiter =
                    Some(parse_delimiter(text.trim()).map_err(|e| reject(StatusCode::BAD_REQUEST, e))?);
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| {
        reject(StatusCode::BAD_REQUEST, ServerError::BadRequest("no file provided".to_string()))
    })?;

    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let output = tokio::task::spawn_blocking(move || transform_bytes(&bytes, options))
        .await
        .map_err(|e| reject(StatusCode::INTERNAL_SERVER_ERROR, ServerError::Internal(e.to_string())))?
        .map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, ServerError::Pipeline(e)))?;

    Ok(Json(TransformResponse::from(output)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert_eq!(parse_delimiter("tab").unwrap(), '\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[tokio::test]
    async fn test_health_payload() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "tripstar");
    }
}
