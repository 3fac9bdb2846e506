//! HTTP response building module
//!
//! Builders for the responses the server emits, decoupled from the handlers.

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{
    ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
    X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::ResponseBody;

/// Wrap a complete buffer as a response body
pub fn full<T: Into<Bytes>>(chunk: T) -> ResponseBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            log_build_error("JSON", &e);
            return fallback(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"detail":"Internal Server Error"}"#,
            );
        }
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, json.len())
        .body(full(json))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback(status, "")
        })
}

/// Build an error response carrying `{"detail": ...}`
pub fn build_error_response(
    status: StatusCode,
    detail: &str,
    allow: Option<&'static str>,
) -> Response<ResponseBody> {
    let mut response = json_response(status, &serde_json::json!({ "detail": detail }));
    if let Some(methods) = allow {
        response
            .headers_mut()
            .insert(ALLOW, hyper::header::HeaderValue::from_static(methods));
    }
    response
}

/// Build 200 response whose body is streamed as it is produced
pub fn build_stream_response(body: ResponseBody) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CACHE_CONTROL, "no-cache")
        .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("stream", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR, "")
        })
}

/// Build 200 response for a repository file
pub fn build_file_response(
    data: Vec<u8>,
    content_type: &str,
    etag: &str,
    last_modified: Option<&str>,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, data.len())
        .header(ETAG, etag);
    if let Some(modified) = last_modified {
        builder = builder.header(LAST_MODIFIED, modified);
    }

    builder.body(full(data)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR, "")
    })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .body(full(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback(StatusCode::NOT_MODIFIED, "")
        })
}

fn fallback(status: StatusCode, body: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(full(body));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(what: &str, error: &impl std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}
