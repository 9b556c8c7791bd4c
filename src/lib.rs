//! Ragdeck: terminal admin console for local-first RAG pipelines.

#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(elided_lifetimes_in_paths)]
#![warn(missing_copy_implementations)]
#![deny(unused_must_use)]
#![deny(unsafe_op_in_unsafe_fn)]

/// HTTP/SSE adapter for the backend admin API.
pub mod api;
/// Streaming chat session controller.
pub mod chat;
/// Crawl configuration model, normalization, and validation domain.
pub mod core;
/// Pipeline health and cross-system data checks.
pub mod health;
/// Job lifecycle, log streams, and ingest progress tracking.
pub mod jobs;
/// Terminal UI (ratatui).
pub mod tui;
/// Shared utilities (paths, log cleanup).
pub mod utils;
