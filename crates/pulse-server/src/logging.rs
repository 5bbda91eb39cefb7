use crate::api::{ApiError, JsonApiError};
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use rand::Rng;
use std::fmt::Write;
use std::time::{Duration, Instant};

pub const TRACE_HEADER: &str = "x-trace-id";

/// Per-request trace id, available to handlers as an extension.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// 16 hex chars from 8 random bytes.
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut id = String::with_capacity(16);
    for b in bytes {
        let _ = write!(id, "{b:02x}");
    }
    id
}

const MAX_BODY_LOG_CHARS: usize = 200;
const MAX_REQUEST_BODY: usize = 4 * 1024 * 1024;

/// At most `max` bytes of `bytes`, cut on a char boundary.
fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1000 {
        format!("{micros}µs")
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1000)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

fn snippet(bytes: &Bytes) -> String {
    if bytes.is_empty() {
        String::new()
    } else {
        truncate_body(bytes, MAX_BODY_LOG_CHARS)
    }
}

/// 413 when the body hit the size limit, 400 for anything else (a broken
/// gzip stream, a dropped connection).
fn unreadable_body(err: &axum::Error) -> ApiError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return ApiError::BodyTooLarge(MAX_REQUEST_BODY);
        }
        source = e.source();
    }
    ApiError::Malformed(format!("unreadable body: {err}"))
}

/// Buffers a JSON request body so it can be logged. Non-JSON requests pass
/// through untouched.
async fn buffer_request(req: Request) -> Result<(Request, String), Response> {
    if !is_json(req.headers()) {
        return Ok((req, String::new()));
    }
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| JsonApiError(unreadable_body(&e)).into_response())?;
    let logged = snippet(&bytes);
    Ok((Request::from_parts(parts, Body::from(bytes)), logged))
}

/// Logs every request and response, tagging both with a fresh trace id that
/// is echoed back in `X-Trace-Id`.
///
/// JSON bodies are buffered so they can be logged; the request body has
/// already been decompressed and the response body is not yet compressed.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = match buffer_request(req).await {
        Ok((req, body)) => {
            if body.is_empty() {
                tracing::info!(trace_id = %trace_id, method = %method, path = %path, "--> request");
            } else {
                tracing::info!(
                    trace_id = %trace_id,
                    method = %method,
                    path = %path,
                    body = %body,
                    "--> request"
                );
            }
            next.run(req).await
        }
        Err(rejection) => {
            tracing::info!(trace_id = %trace_id, method = %method, path = %path, "--> request");
            rejection
        }
    };
    let elapsed = format_elapsed(start.elapsed());

    let (mut parts, body) = response.into_parts();
    let (body, logged) = if is_json(&parts.headers) {
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                let logged = snippet(&bytes);
                (Body::from(bytes), logged)
            }
            Err(e) => {
                tracing::error!(trace_id = %trace_id, error = %e, "Failed to read response body");
                parts.status = StatusCode::INTERNAL_SERVER_ERROR;
                parts.headers.remove(header::CONTENT_LENGTH);
                let fallback = r#"{"error":"failed to render response"}"#;
                (Body::from(fallback), fallback.to_string())
            }
        }
    } else {
        (body, String::new())
    };

    log_response(&trace_id, parts.status, &elapsed, &logged);

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        parts.headers.insert(TRACE_HEADER, value);
    }
    Response::from_parts(parts, body)
}

fn log_response(trace_id: &str, status: StatusCode, elapsed: &str, body: &str) {
    let status_code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(trace_id, status = status_code, elapsed, body, "<-- response");
    } else if status.is_client_error() {
        tracing::warn!(trace_id, status = status_code, elapsed, body, "<-- response");
    } else if body.is_empty() {
        tracing::info!(trace_id, status = status_code, elapsed, "<-- response");
    } else {
        tracing::info!(trace_id, status = status_code, elapsed, body, "<-- response");
    }
}
