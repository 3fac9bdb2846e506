//! HTTP front end for an interactive coding assistant.
//!
//! - `POST /chat` runs a message through the coder and returns the reply,
//!   streamed as plain text or as `{"content": ...}`
//! - `GET /file?file_path=...` serves files from the coder's repository

pub mod coder;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use coder::{ChunkStream, Coder, CommandCoder};
pub use config::{AppState, Config};
pub use error::ApiError;
