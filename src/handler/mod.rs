//! Request handler module
//!
//! Routes requests to the chat and repository file endpoints and adapts the
//! coder's blocking calls to async responses.

pub mod chat;
pub mod files;
pub mod router;
pub mod stream;

// Re-export main entry point
pub use router::handle_request;
