//! HTTP protocol layer module
//!
//! Response builders, body helpers and header utilities, independent of the
//! coder-facing handlers.

pub mod cache;
pub mod mime;
pub mod query;
pub mod response;

use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Bytes;

/// Error carried by a response body; ends a streamed reply early
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every response: a complete buffer or a chunk stream
pub type ResponseBody = UnsyncBoxBody<Bytes, BodyError>;

// Re-export commonly used items
pub use response::{
    build_304_response, build_error_response, build_file_response, build_stream_response,
    full, json_response,
};
