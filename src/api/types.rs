use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::rules::TypeFlags;

/// A background job row as returned by the jobs endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDto {
    /// Server-assigned job identifier.
    pub job_id: String,

    /// Kind of job (`crawl` or `ingest`).
    pub job_type: JobType,

    /// Current status string (`queued`, `running`, `done`, `error`, ...).
    #[serde(default)]
    pub status: String,

    /// When the job started (ISO 8601).
    #[serde(default)]
    pub started_at: Option<String>,

    /// When the job ended, if it has (ISO 8601).
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// Job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Crawler run.
    Crawl,
    /// Ingest run.
    Ingest,
}

impl JobType {
    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
        }
    }
}

/// Response wrapper for the job list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListResponse {
    /// All known jobs, newest first.
    #[serde(default)]
    pub jobs: Vec<JobDto>,
}

/// Response from enqueueing a crawl or ingest job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Identifier of the enqueued job.
    pub job_id: String,
}

/// Crawl summary as sent by the server.
///
/// Newer servers nest skip and error breakdowns; older ones emit the same
/// counters as flat top-level fields. Both shapes deserialize here and are
/// reconciled by [`crate::core::summary::CrawlSummary::from_wire`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSummaryDto {
    /// Pages captured.
    #[serde(default)]
    pub captured: Option<u64>,

    /// Total error count.
    #[serde(default)]
    pub errors: Option<u64>,

    /// Nested skip breakdown (current servers).
    #[serde(default)]
    pub skipped: Option<SkippedCountsDto>,

    /// Nested error breakdown by class (current servers).
    #[serde(default)]
    pub errors_by_class: Option<ErrorsByClassDto>,

    /// Per-URL error detail rows.
    #[serde(default)]
    pub error_details: Vec<ErrorDetailDto>,

    // Legacy flat skip counters.
    #[serde(default)]
    pub already_processed: Option<u64>,
    #[serde(default)]
    pub depth_exceeded: Option<u64>,
    #[serde(default)]
    pub not_allowed: Option<u64>,
    #[serde(default)]
    pub auth_required: Option<u64>,
    #[serde(default)]
    pub non_html: Option<u64>,
}

/// Skip counters grouped by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCountsDto {
    /// URL was crawled in a previous run.
    #[serde(default)]
    pub already_processed: u64,
    /// Link was beyond the configured depth.
    #[serde(default)]
    pub depth_exceeded: u64,
    /// URL matched no allow rule.
    #[serde(default)]
    pub not_allowed: u64,
    /// Page demanded authentication with no usable profile.
    #[serde(default)]
    pub auth_required: u64,
    /// Response was not an ingestible document type.
    #[serde(default)]
    pub non_html: u64,
}

/// Error counters grouped by class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorsByClassDto {
    /// HTTP 4xx responses.
    #[serde(default, rename = "4xx")]
    pub client: u64,
    /// HTTP 5xx responses.
    #[serde(default, rename = "5xx")]
    pub server: u64,
    /// Connect/read timeouts and DNS failures.
    #[serde(default)]
    pub network_timeout: u64,
    /// Everything else.
    #[serde(default)]
    pub other: u64,
}

/// One failed URL in the crawl summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetailDto {
    /// The URL that failed.
    #[serde(default)]
    pub url: Option<String>,
    /// Error class label.
    #[serde(default)]
    pub class: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// A discovered URL suggested for the allow list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationDto {
    /// The candidate URL.
    pub suggested_url: String,

    /// How many times the crawler saw links into it.
    #[serde(default)]
    pub count: u64,

    /// Document types observed under this prefix.
    #[serde(default)]
    pub seen_types: TypeFlags,
}

/// Response wrapper for the recommendations endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    /// Candidate URLs, ranked by observation count.
    #[serde(default)]
    pub items: Vec<RecommendationDto>,
}

/// Per-rule auth test verdict used by the config view overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum UiAuthStatus {
    /// Profile tested and working.
    Valid,
    /// Profile tested and failing.
    Invalid,
    /// Page needs auth but the rule has no profile.
    NeedsProfile,
    /// Testing is impossible (playwright unavailable).
    CannotTest,
    /// No verdict yet; unrecognized strings land here too.
    #[default]
    Unknown,
}

impl From<String> for UiAuthStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "valid" => Self::Valid,
            "invalid" => Self::Invalid,
            "needs_profile" => Self::NeedsProfile,
            "cannot_test" => Self::CannotTest,
            _ => Self::Unknown,
        }
    }
}

/// Overlay entry for one allow rule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleAuthStatusDto {
    /// Rendered verdict for the row's auth icon.
    #[serde(default)]
    pub ui_status: UiAuthStatus,
}

/// Auth-status overlay for the allow-rule table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthStatusOverlayDto {
    /// Whether the backend can run playwright auth tests at all.
    #[serde(default)]
    pub playwright_available: bool,

    /// Verdicts keyed by server rule id.
    #[serde(default)]
    pub by_rule_id: HashMap<String, RuleAuthStatusDto>,

    /// Verdicts keyed by pattern, for rules that have no id yet.
    #[serde(default)]
    pub by_pattern: HashMap<String, RuleAuthStatusDto>,
}

/// Result of testing one auth profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileAuthStatusDto {
    /// Whether the stored state still reaches authenticated content.
    #[serde(default)]
    pub ok: bool,
    /// When the profile was last tested (ISO 8601).
    #[serde(default)]
    pub checked_at: Option<String>,
    /// Failure reason when `ok` is false.
    #[serde(default)]
    pub error_reason: Option<String>,
    /// URL the test browser ended up on.
    #[serde(default)]
    pub final_url: Option<String>,
}

/// Response from POST `/api/crawl/test-auth`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestAuthResponse {
    /// Per-profile test results.
    #[serde(default)]
    pub results: serde_json::Value,
}

/// A conversation row in the sidebar list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummaryDto {
    /// Conversation identifier.
    pub id: String,

    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Last activity (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Whether the title was generated automatically.
    #[serde(default)]
    pub auto_titled: bool,
}

/// Response wrapper for the conversation list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatListResponse {
    /// Conversations, most recently updated first.
    #[serde(default)]
    pub conversations: Vec<ConversationSummaryDto>,
}

/// A full conversation with transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDto {
    /// Conversation identifier.
    pub id: String,

    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Whether the title was generated automatically.
    #[serde(default)]
    pub auto_titled: bool,

    /// Ordered transcript.
    #[serde(default)]
    pub messages: Vec<MessageDto>,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    /// `user` or `assistant`.
    pub role: String,

    /// Plain text for user turns; a structured payload for assistant turns.
    pub content: MessageContent,

    /// When the message was recorded (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Message content: user turns are plain strings, assistant turns carry a
/// structured object with optional pipeline and citation payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Structured assistant content.
    Rich(AssistantContent),
}

impl MessageContent {
    /// Best-effort plain text of the message body.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(t) => t,
            Self::Rich(rich) => rich.text.as_deref().unwrap_or(""),
        }
    }
}

/// Structured assistant message payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantContent {
    /// Final answer text.
    #[serde(default)]
    pub text: Option<String>,

    /// Intermediate pipeline outputs, when the server kept them.
    #[serde(default)]
    pub pipeline: Option<PipelineDto>,

    /// Citations attached to the answer.
    #[serde(default)]
    pub citations: Vec<serde_json::Value>,

    /// Source documents consulted.
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
}

/// Per-stage pipeline outputs on an assistant message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDto {
    /// Intent-detection stage output.
    #[serde(default)]
    pub intent: Option<serde_json::Value>,
    /// Research stage output.
    #[serde(default)]
    pub research: Option<serde_json::Value>,
    /// Synthesis stage output.
    #[serde(default)]
    pub synthesis: Option<serde_json::Value>,
    /// Validation stage output.
    #[serde(default)]
    pub validation: Option<serde_json::Value>,
}

/// Response from POST `/api/chat/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStartResponse {
    /// Identifier of the new conversation.
    pub conversation_id: String,
}

/// One event on the chat message stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatStreamEvent {
    /// Pipeline stage transition.
    Status {
        /// Stage name: `intent`, `research`, `synthesis`, or `validation`.
        #[serde(default)]
        stage: Option<String>,
        /// Optional human-readable detail.
        #[serde(default)]
        message: Option<String>,
    },
    /// An answer text fragment.
    Token {
        /// Fragment text, appended in arrival order.
        text: String,
    },
    /// The answer is complete.
    Done,
    /// Unknown event kinds are ignored.
    #[serde(other)]
    Unknown,
}

/// Snapshot of an ingest job from GET `/api/ingest/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStatusDto {
    /// Job identifier.
    #[serde(default)]
    pub job_id: Option<String>,

    /// Current status (`queued`, `running`, `done`, `error`, `cancelled`).
    #[serde(default)]
    pub status: String,

    /// Artifacts fully processed so far.
    #[serde(default)]
    pub done_artifacts: u64,

    /// Total artifacts in this run.
    #[serde(default)]
    pub total_artifacts: u64,

    /// Artifact currently in flight.
    #[serde(default)]
    pub current_artifact: Option<String>,

    /// Error count, server-authoritative.
    #[serde(default)]
    pub errors: u64,
}

impl IngestStatusDto {
    /// Whether the job can make no further progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "done" | "error" | "cancelled")
    }
}

/// One event on the ingest event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEventDto {
    /// The worker picked the job up.
    Start {
        /// Total artifacts in this run, when known up front.
        #[serde(default, alias = "total")]
        total_artifacts: Option<u64>,
    },
    /// Progress on one artifact boundary.
    ArtifactProgress {
        /// Artifacts done.
        #[serde(default, alias = "done_artifacts")]
        done: u64,
        /// Artifacts total.
        #[serde(default, alias = "total_artifacts")]
        total: u64,
        /// Artifact currently in flight.
        #[serde(default)]
        current_artifact: Option<String>,
        /// Server-authoritative error count.
        #[serde(default)]
        errors: Option<u64>,
    },
    /// A log line from the worker.
    Log {
        /// Log text.
        #[serde(default)]
        message: String,
    },
    /// The run finished.
    Complete {
        /// Final totals.
        #[serde(default)]
        summary: Option<IngestStatusDto>,
    },
    /// An artifact failed.
    Error {
        /// Failure detail.
        #[serde(default)]
        message: Option<String>,
    },
    /// Stream handshake acknowledgement.
    Connected,
    /// Unknown event kinds are ignored.
    #[serde(other)]
    Unknown,
}

/// Ingest worker liveness from GET `/api/ingest/worker/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStatusDto {
    /// Seconds since the worker last checked in.
    #[serde(default)]
    pub age_seconds: Option<f64>,

    /// Jobs waiting in the queue.
    #[serde(default)]
    pub queue_depth: Option<u64>,

    /// Worker process info.
    #[serde(default)]
    pub worker: Option<WorkerProcDto>,
}

/// Worker process descriptor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkerProcDto {
    /// OS process id, when running.
    #[serde(default)]
    pub pid: Option<u64>,
}

/// Pipeline health tree from GET `/api/admin/data/health`.
///
/// Subtrees are kept loosely typed: the card grid renders whatever is
/// present and shows `unknown` for the rest, so absent or novel keys must
/// never fail deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthTreeDto {
    /// Artifact store stats.
    #[serde(default)]
    pub artifacts: Option<serde_json::Value>,
    /// Crawl pipeline state.
    #[serde(default)]
    pub crawl: Option<serde_json::Value>,
    /// Ingest pipeline state.
    #[serde(default)]
    pub ingest: Option<serde_json::Value>,
    /// Vector store state.
    #[serde(default)]
    pub qdrant: Option<serde_json::Value>,
    /// Host/system state.
    #[serde(default)]
    pub system: Option<serde_json::Value>,
}

/// Service-level health from GET `/api/health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiHealthDto {
    /// API process status.
    #[serde(default)]
    pub api: Option<String>,
    /// LLM runtime status.
    #[serde(default)]
    pub ollama: Option<String>,
    /// Vector store status.
    #[serde(default)]
    pub qdrant: Option<String>,
    /// Loaded model name.
    #[serde(default)]
    pub model: Option<String>,
}

/// Cross-system lookup result for one URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckUrlReportDto {
    /// Artifact-store record, if any.
    #[serde(default)]
    pub artifact: Option<serde_json::Value>,
    /// Validation verdicts, if any.
    #[serde(default)]
    pub validation: Option<serde_json::Value>,
    /// Ingest record, if any.
    #[serde(default)]
    pub ingest: Option<serde_json::Value>,
    /// Vector-store points, if any.
    #[serde(default)]
    pub qdrant: Option<serde_json::Value>,
}

/// Text/vector search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponseDto {
    /// Artifact full-text matches.
    #[serde(default)]
    pub artifacts: Vec<serde_json::Value>,
    /// Vector-store matches.
    #[serde(default, alias = "qdrant")]
    pub qdrant_matches: Vec<serde_json::Value>,
}

/// Validation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Must be looked at.
    High,
    /// Worth a look.
    Medium,
    /// Informational.
    Low,
    /// Unrecognized severity strings sort with low.
    Unknown,
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingDto {
    /// Artifact identifier, used for quarantine.
    pub id: String,

    /// Offending URL, when known.
    #[serde(default)]
    pub url: Option<String>,

    /// Artifact title, when known.
    #[serde(default)]
    pub title: Option<String>,

    /// Severity bucket.
    pub severity: Severity,

    /// Why the artifact was flagged.
    #[serde(default)]
    pub reason: String,
}

/// Validation summary with findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummaryDto {
    /// Artifacts checked.
    #[serde(default)]
    pub checked: Option<u64>,
    /// Artifacts that passed.
    #[serde(default)]
    pub passed: Option<u64>,
    /// Artifacts that failed at least one check.
    #[serde(default)]
    pub failed: Option<u64>,
    /// When the validation last ran (ISO 8601).
    #[serde(default)]
    pub last_run: Option<String>,
    /// Individual findings.
    #[serde(default)]
    pub findings: Vec<FindingDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_summary_accepts_legacy_flat_fields() {
        let dto: CrawlSummaryDto = serde_json::from_str(
            r#"{"captured": 5, "errors": 0, "already_processed": 2}"#,
        )
        .unwrap();
        assert_eq!(dto.captured, Some(5));
        assert_eq!(dto.already_processed, Some(2));
        assert!(dto.skipped.is_none());
    }

    #[test]
    fn errors_by_class_uses_wire_names() {
        let dto: ErrorsByClassDto =
            serde_json::from_str(r#"{"4xx": 3, "5xx": 1, "network_timeout": 2}"#).unwrap();
        assert_eq!(dto.client, 3);
        assert_eq!(dto.server, 1);
        assert_eq!(dto.network_timeout, 2);
        assert_eq!(dto.other, 0);
    }

    #[test]
    fn chat_stream_event_parses_known_and_unknown() {
        let ev: ChatStreamEvent =
            serde_json::from_str(r#"{"type": "status", "stage": "intent"}"#).unwrap();
        assert!(matches!(ev, ChatStreamEvent::Status { ref stage, .. } if stage.as_deref() == Some("intent")));

        let ev: ChatStreamEvent = serde_json::from_str(r#"{"type": "token", "text": "hi"}"#).unwrap();
        assert!(matches!(ev, ChatStreamEvent::Token { ref text } if text == "hi"));

        let ev: ChatStreamEvent = serde_json::from_str(r#"{"type": "heartbeat"}"#).unwrap();
        assert!(matches!(ev, ChatStreamEvent::Unknown));
    }

    #[test]
    fn message_content_accepts_string_and_object() {
        let msg: MessageDto = serde_json::from_str(
            r#"{"role": "user", "content": "hello", "timestamp": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.content.text(), "hello");

        let msg: MessageDto = serde_json::from_str(
            r#"{"role": "assistant", "content": {"text": "answer", "citations": [{"n": 1}]}}"#,
        )
        .unwrap();
        assert_eq!(msg.content.text(), "answer");
        match msg.content {
            MessageContent::Rich(rich) => assert_eq!(rich.citations.len(), 1),
            MessageContent::Text(_) => panic!("expected rich content"),
        }
    }

    #[test]
    fn ingest_event_accepts_field_aliases() {
        let ev: IngestEventDto = serde_json::from_str(
            r#"{"type": "artifact_progress", "done_artifacts": 4, "total_artifacts": 10}"#,
        )
        .unwrap();
        match ev {
            IngestEventDto::ArtifactProgress { done, total, .. } => {
                assert_eq!(done, 4);
                assert_eq!(total, 10);
            }
            _ => panic!("expected artifact_progress"),
        }
    }

    #[test]
    fn severity_tolerates_unknown_strings() {
        let finding: FindingDto = serde_json::from_str(
            r#"{"id": "a1", "severity": "critical", "reason": "x"}"#,
        )
        .unwrap();
        assert_eq!(finding.severity, Severity::Unknown);
    }
}
