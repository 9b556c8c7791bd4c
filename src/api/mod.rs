/// Attachment downloads (filename negotiation, disk writes).
pub mod download;
/// HTTP request wrapper and typed errors.
pub mod http;
/// SSE framing and stream consumption.
pub mod sse;
/// Wire DTOs for the admin API.
pub mod types;

pub use download::{filename_from_content_disposition, save_attachment, save_attachment_to};
pub use http::{ApiClient, ApiError, ApiResult, DEFAULT_API_URL, resolve_base_url};
pub use sse::{SseEvent, SseFrameDecoder, SseRead, SseStream};
