//! Chat endpoint
//!
//! `POST /chat` with `{"message": ..., "stream": bool}`. Streamed replies go
//! through the streaming adapter; complete replies come back as
//! `{"content": ...}`.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::stream;
use crate::config::AppState;
use crate::error::ApiError;
use crate::http::{self, ResponseBody};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_stream() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
}

pub async fn handle_chat(
    body: &Bytes,
    state: &Arc<AppState>,
) -> Result<Response<ResponseBody>, ApiError> {
    let request: ChatRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid chat request: {e}")))?;

    let guard = state.acquire_coder().await;
    let coder = Arc::clone(&state.coder);

    if request.stream {
        let body = stream::stream_reply(
            coder,
            request.message,
            state.config.coder.stream_buffer,
            guard,
        )
        .await?;
        return Ok(http::build_stream_response(body));
    }

    let content = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        coder.run(&request.message)
    })
    .await
    .map_err(|e| anyhow::anyhow!("coder task failed: {e}"))??;

    Ok(http::json_response(StatusCode::OK, &ChatResponse { content }))
}
