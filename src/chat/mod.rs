//! Streaming chat sessions: conversation lifecycle, the SSE message
//! pipeline, and coalesced token rendering.

/// Conversation lifecycle and message pipeline.
pub mod controller;
/// Buffered token rendering.
pub mod stream;

pub use controller::{ChatController, ChatEvent, ChatEventKind, StreamingShell, UNTITLED};
pub use stream::{REPAINT_INTERVAL, TokenStreamRenderer};
