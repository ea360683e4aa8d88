//! Local inference gateway: accepts OpenAI-compatible chat completion
//! requests over HTTP and forwards them to an in-process model runtime,
//! returning a JSON response or a server-sent-event stream. When no model is
//! loaded the gateway stays up and serves deterministic mock completions.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod sse;
