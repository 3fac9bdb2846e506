//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body limits, route matching,
//! dispatch, error rendering and access logging.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{chat, files};
use crate::config::AppState;
use crate::error::ApiError;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
///
/// Generic over the request body so it can be driven without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    remote_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let access_entry = state
        .access_log_enabled()
        .then(|| AccessLogEntry::from_request(&parts, remote_addr));

    let result = match (parts.uri.path(), &parts.method) {
        ("/chat", &Method::POST) => {
            match read_body(&parts.headers, body, state.config.http.max_body_size).await {
                Ok(bytes) => chat::handle_chat(&bytes, &state).await,
                Err(e) => Err(e),
            }
        }
        ("/file", &Method::GET) => {
            let if_none_match = parts
                .headers
                .get(IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok());
            files::handle_get_file(parts.uri.query(), if_none_match, &state).await
        }
        ("/chat", _) => Err(ApiError::MethodNotAllowed { allow: "POST" }),
        ("/file", _) => Err(ApiError::MethodNotAllowed { allow: "GET" }),
        _ => Err(ApiError::NotFound("Not Found".to_string())),
    };

    let mut response = result.unwrap_or_else(ApiError::into_response);
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }

    if let Some(mut entry) = access_entry {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.complete(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Read the whole request body, refusing anything over `max_body_size`
async fn read_body<B>(headers: &HeaderMap, body: B, max_body_size: u64) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let too_large = ApiError::PayloadTooLarge {
        limit: max_body_size,
    };

    // Reject early on a declared length
    if let Some(size) = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        if size > max_body_size {
            return Err(too_large);
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(too_large),
        Err(e) => Err(ApiError::BadRequest(format!("Failed to read request body: {e}"))),
    }
}
