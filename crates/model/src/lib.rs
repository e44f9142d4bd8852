//! Model invocation for ask.
//!
//! [`ModelClient`] is the seam the chat pipeline talks to. [`AnthropicClient`]
//! streams replies from the Messages API over server-sent events;
//! [`ScriptedClient`] replays canned chunks for tests.

mod anthropic;
mod client;
mod error;
mod models;
mod scripted;
pub mod sse;

pub use anthropic::{
    AnthropicClient, AnthropicConfig, API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL,
};
pub use client::{ChunkSink, ModelClient, StreamSummary};
pub use error::{ModelError, Result};
pub use models::{resolve_model, supports_1m_context, DEFAULT_MODEL, MODEL_ALIASES};
pub use scripted::ScriptedClient;
