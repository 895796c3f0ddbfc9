//! ragline-client: wire layer for RAG query servers
//!
//! This crate provides the message types, the sanitizer every piece of
//! untrusted data passes through, the stream URL derivation and an HTTP
//! backend speaking both the JSON query and the server-sent event protocol.

pub mod backend;
pub mod error;
pub mod sanitize;
pub mod stream;
pub mod stream_url;
pub mod types;

pub use backend::{Backend, HttpBackend};
pub use error::{Error, Result};
pub use sanitize::Sanitizer;
pub use stream::{BoxedEventChannel, EventChannel, SseEvent, StreamPayload};
pub use stream_url::build_stream_url;
pub use types::*;
