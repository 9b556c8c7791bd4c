//! Conversation lifecycle and the chat message pipeline.
//!
//! The controller owns the sidebar list, the loaded transcript, and the
//! streaming shell for an in-flight answer. Streaming runs in a spawned
//! task that reports over a channel; every event carries the stream
//! generation, so events from a cancelled stream are dropped instead of
//! mutating the transcript.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::{
    ChatListResponse, ChatStartResponse, ChatStreamEvent, ConversationDto,
    ConversationSummaryDto, MessageContent, MessageDto,
};
use crate::api::{ApiClient, ApiError, SseRead};
use crate::chat::stream::TokenStreamRenderer;

/// Placeholder title the server assigns to fresh conversations.
pub const UNTITLED: &str = "New Conversation";

/// How long transient chat status lines stay up.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Event from the streaming task to the UI loop.
#[derive(Debug)]
pub struct ChatEvent {
    /// Stream generation this event belongs to.
    pub generation: u64,
    /// What happened.
    pub kind: ChatEventKind,
}

/// The kinds of streaming events.
#[derive(Debug)]
pub enum ChatEventKind {
    /// Pipeline stage update for the assistant status line.
    Status {
        /// Stage name (`intent`, `research`, `synthesis`, `validation`).
        stage: Option<String>,
        /// Optional human-readable detail.
        message: Option<String>,
    },
    /// Coalesced repaint of the streamed answer so far.
    Repaint {
        /// Full content accumulated to this point.
        content: String,
    },
    /// The stream completed normally.
    Done,
    /// The stream failed or closed before completing.
    Failed {
        /// One-line banner text.
        message: String,
    },
}

/// The in-progress assistant bubble.
#[derive(Debug, Default)]
pub struct StreamingShell {
    /// Status line above the content (stage updates).
    pub status: Option<String>,
    /// Streamed content rendered so far.
    pub content: String,
}

/// Chat session controller.
#[derive(Debug, Default)]
pub struct ChatController {
    /// Sidebar conversation list.
    pub conversations: Vec<ConversationSummaryDto>,
    /// The loaded conversation, if any.
    pub current: Option<ConversationDto>,
    /// The in-flight assistant bubble, if a stream is active.
    pub shell: Option<StreamingShell>,
    /// Sticky error banner (network/stream failures).
    pub banner: Option<String>,
    auto_title_requested: HashSet<String>,
    status_message: Option<(String, Instant)>,
    stream_generation: u64,
    stream_task: Option<JoinHandle<()>>,
}

impl ChatController {
    /// Create an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an answer is currently streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shell.is_some()
    }

    /// The transient status line, if still fresh.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message
            .as_ref()
            .filter(|(_, since)| since.elapsed() < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }

    /// Show a transient status line (auto-clears after ~3 s).
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status_message = Some((text.into(), Instant::now()));
    }

    /// Drop the status line once its time is up. Called from the UI tick.
    pub fn prune_status(&mut self) {
        if self
            .status_message
            .as_ref()
            .is_some_and(|(_, since)| since.elapsed() >= STATUS_TTL)
        {
            self.status_message = None;
        }
    }

    // ------------------------------------------------------------------
    // Conversation lifecycle

    /// Refresh the sidebar list.
    ///
    /// # Errors
    ///
    /// Propagates the API error for the caller's banner.
    pub async fn refresh_conversations(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let resp: ChatListResponse = client.get_json("/api/chat/list").await?;
        self.conversations = resp.conversations;
        Ok(())
    }

    /// Start a fresh conversation and make it current.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn start_conversation(&mut self, client: &ApiClient) -> Result<String, ApiError> {
        self.cancel_stream();
        let resp: ChatStartResponse = client
            .post_json("/api/chat/start", &serde_json::json!({}))
            .await?;
        self.current = Some(ConversationDto {
            id: resp.conversation_id.clone(),
            title: UNTITLED.to_owned(),
            auto_titled: false,
            messages: Vec::new(),
        });
        self.refresh_conversations(client).await.ok();
        Ok(resp.conversation_id)
    }

    /// Load a conversation and run the auto-title check.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn load_conversation(
        &mut self,
        client: &ApiClient,
        id: &str,
    ) -> Result<(), ApiError> {
        self.cancel_stream();
        let convo: ConversationDto = client.get_json(&format!("/api/chat/{id}")).await?;
        self.current = Some(convo);
        self.maybe_auto_title(client).await;
        Ok(())
    }

    /// Drop the current conversation and any in-flight stream.
    pub fn start_new_conversation(&mut self) {
        self.cancel_stream();
        self.current = None;
        self.banner = None;
    }

    /// Rename the current conversation.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn rename_conversation(
        &mut self,
        client: &ApiClient,
        id: &str,
        title: &str,
    ) -> Result<(), ApiError> {
        client
            .put_json(&format!("/api/chat/{id}"), &serde_json::json!({ "title": title }))
            .await?;
        if let Some(current) = &mut self.current {
            if current.id == id {
                current.title = title.to_owned();
            }
        }
        self.refresh_conversations(client).await.ok();
        Ok(())
    }

    /// Delete a conversation; clears it locally when current.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn delete_conversation(
        &mut self,
        client: &ApiClient,
        id: &str,
    ) -> Result<(), ApiError> {
        client.delete(&format!("/api/chat/{id}")).await?;
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.start_new_conversation();
        }
        self.refresh_conversations(client).await.ok();
        Ok(())
    }

    /// Export a conversation transcript to the downloads directory.
    ///
    /// # Errors
    ///
    /// Propagates request and filesystem errors.
    pub async fn export_conversation(
        &self,
        client: &ApiClient,
        id: &str,
    ) -> anyhow::Result<std::path::PathBuf> {
        let response = client.get_response(&format!("/api/chat/{id}/export")).await?;
        crate::api::save_attachment(response, &format!("conversation-{id}.json")).await
    }

    // ------------------------------------------------------------------
    // Message pipeline

    /// Send a message on the current conversation.
    ///
    /// Appends the user bubble and an empty assistant shell optimistically,
    /// then spawns the SSE consumer task. A non-2xx on the POST itself
    /// arrives as a `Failed` event and finalizes the shell.
    pub fn send_message(
        &mut self,
        client: &ApiClient,
        tx: &mpsc::UnboundedSender<ChatEvent>,
        text: &str,
    ) {
        let Some(current) = &mut self.current else {
            return;
        };
        let convo_id = current.id.clone();

        current.messages.push(MessageDto {
            role: "user".to_owned(),
            content: MessageContent::Text(text.to_owned()),
            timestamp: None,
        });
        self.shell = Some(StreamingShell::default());
        self.banner = None;

        self.cancel_stream_task();
        self.stream_generation += 1;
        let generation = self.stream_generation;
        self.stream_task = Some(spawn_message_stream(
            client.clone(),
            convo_id,
            text.to_owned(),
            generation,
            tx.clone(),
        ));
    }

    /// Apply one streaming event. Stale generations are dropped wholesale.
    ///
    /// Returns `true` when the stream finished (done or failed) and the
    /// caller should run [`Self::finish_stream`].
    pub fn handle_event(&mut self, event: ChatEvent) -> bool {
        if event.generation != self.stream_generation {
            return false;
        }
        let Some(shell) = &mut self.shell else {
            return false;
        };

        match event.kind {
            ChatEventKind::Status { stage, message } => {
                shell.status = Some(match (stage, message) {
                    (Some(stage), Some(message)) => format!("{stage}: {message}"),
                    (Some(stage), None) => stage,
                    (None, Some(message)) => message,
                    (None, None) => String::new(),
                });
                false
            }
            ChatEventKind::Repaint { content } => {
                shell.content = content;
                false
            }
            ChatEventKind::Done => {
                shell.status = None;
                true
            }
            ChatEventKind::Failed { message } => {
                self.banner = Some(message);
                true
            }
        }
    }

    /// Finalize a finished stream: re-fetch the conversation so the
    /// optimistic bubble is replaced by the server-authoritative message
    /// (citations, pipeline payload), then run the auto-title check.
    pub async fn finish_stream(&mut self, client: &ApiClient) {
        self.stream_task = None;
        let Some(id) = self.current.as_ref().map(|c| c.id.clone()) else {
            self.shell = None;
            return;
        };

        match client.get_json::<ConversationDto>(&format!("/api/chat/{id}")).await {
            Ok(convo) => {
                self.current = Some(convo);
                self.shell = None;
                self.maybe_auto_title(client).await;
                // The sidebar reorders on activity
                self.refresh_conversations(client).await.ok();
            }
            Err(e) => {
                // Keep the streamed content in place rather than dropping it
                tracing::warn!(error = %e, "conversation refetch failed after stream end");
                if let (Some(current), Some(shell)) = (&mut self.current, self.shell.take()) {
                    if !shell.content.is_empty() {
                        current.messages.push(MessageDto {
                            role: "assistant".to_owned(),
                            content: MessageContent::Text(shell.content),
                            timestamp: None,
                        });
                    }
                }
            }
        }
    }

    /// Cancel the active stream: the task is aborted and the generation
    /// bump turns any in-flight events into no-ops.
    pub fn cancel_stream(&mut self) {
        self.cancel_stream_task();
        self.stream_generation += 1;
        self.shell = None;
    }

    fn cancel_stream_task(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }

    // ------------------------------------------------------------------
    // Auto-title

    /// Request an automatic title at most once per conversation per
    /// process run, and only when the transcript supports one.
    ///
    /// The request may fail silently; success refreshes the sidebar.
    pub async fn maybe_auto_title(&mut self, client: &ApiClient) {
        let Some(convo) = &self.current else {
            return;
        };

        let title_is_placeholder = convo.title.trim().is_empty() || convo.title == UNTITLED;
        if !title_is_placeholder || convo.auto_titled {
            return;
        }
        let has_user = convo.messages.iter().any(|m| m.role == "user");
        let has_assistant = convo.messages.iter().any(|m| m.role == "assistant");
        if !has_user || !has_assistant {
            return;
        }
        if !self.auto_title_requested.insert(convo.id.clone()) {
            return;
        }

        let id = convo.id.clone();
        match client.post_empty(&format!("/api/chat/{id}/title/auto")).await {
            Ok(()) => {
                if let Ok(updated) = client.get_json::<ConversationDto>(&format!("/api/chat/{id}")).await
                {
                    self.current = Some(updated);
                }
                self.refresh_conversations(client).await.ok();
            }
            Err(e) => tracing::debug!(error = %e, "auto-title request failed"),
        }
    }

    /// Whether auto-title was already requested for a conversation.
    #[must_use]
    pub fn auto_title_requested(&self, id: &str) -> bool {
        self.auto_title_requested.contains(id)
    }
}

/// Consume the message SSE stream, reporting coalesced events.
fn spawn_message_stream(
    client: ApiClient,
    convo_id: String,
    text: String,
    generation: u64,
    tx: mpsc::UnboundedSender<ChatEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let send = |kind: ChatEventKind| {
            let _ = tx.send(ChatEvent { generation, kind });
        };

        let mut stream = match client
            .sse_post(
                &format!("/api/chat/{convo_id}/message"),
                &serde_json::json!({ "text": text }),
            )
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                send(ChatEventKind::Failed { message: e.panel_text() });
                return;
            }
        };

        let mut renderer = TokenStreamRenderer::new();
        loop {
            match stream.next().await {
                SseRead::Event(event) => {
                    let Some(parsed) = stream.json_or_skip::<ChatStreamEvent>(&event) else {
                        continue;
                    };
                    match parsed {
                        ChatStreamEvent::Status { stage, message } => {
                            send(ChatEventKind::Status { stage, message });
                        }
                        ChatStreamEvent::Token { text } => {
                            renderer.push(&text);
                            if let Some(content) = renderer.take_if_due() {
                                send(ChatEventKind::Repaint { content });
                            }
                        }
                        ChatStreamEvent::Done => {
                            send(ChatEventKind::Repaint { content: renderer.flush() });
                            send(ChatEventKind::Done);
                            return;
                        }
                        ChatStreamEvent::Unknown => {}
                    }
                }
                SseRead::Closed => {
                    send(ChatEventKind::Repaint { content: renderer.flush() });
                    send(ChatEventKind::Failed {
                        message: "answer stream closed before completion".to_owned(),
                    });
                    return;
                }
                SseRead::Failed(message) => {
                    send(ChatEventKind::Repaint { content: renderer.flush() });
                    send(ChatEventKind::Failed { message });
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_with_stream() -> ChatController {
        let mut controller = ChatController::new();
        controller.current = Some(ConversationDto {
            id: "c1".to_owned(),
            title: UNTITLED.to_owned(),
            auto_titled: false,
            messages: Vec::new(),
        });
        controller.shell = Some(StreamingShell::default());
        controller.stream_generation = 3;
        controller
    }

    fn event(generation: u64, kind: ChatEventKind) -> ChatEvent {
        ChatEvent { generation, kind }
    }

    #[test]
    fn stale_generation_events_are_dropped() {
        let mut controller = controller_with_stream();
        let finished = controller.handle_event(event(
            2,
            ChatEventKind::Repaint { content: "old stream".to_owned() },
        ));
        assert!(!finished);
        assert_eq!(controller.shell.as_ref().unwrap().content, "");
    }

    #[test]
    fn status_and_repaint_update_the_shell() {
        let mut controller = controller_with_stream();
        controller.handle_event(event(
            3,
            ChatEventKind::Status {
                stage: Some("intent".to_owned()),
                message: Some("classifying".to_owned()),
            },
        ));
        assert_eq!(
            controller.shell.as_ref().unwrap().status.as_deref(),
            Some("intent: classifying")
        );

        controller.handle_event(event(3, ChatEventKind::Repaint { content: "Hi".to_owned() }));
        assert_eq!(controller.shell.as_ref().unwrap().content, "Hi");
    }

    #[test]
    fn done_clears_status_and_signals_finish() {
        let mut controller = controller_with_stream();
        controller.handle_event(event(
            3,
            ChatEventKind::Status { stage: Some("synthesis".to_owned()), message: None },
        ));
        let finished = controller.handle_event(event(3, ChatEventKind::Done));
        assert!(finished);
        assert!(controller.shell.as_ref().unwrap().status.is_none());
    }

    #[test]
    fn failure_sets_the_banner() {
        let mut controller = controller_with_stream();
        let finished = controller.handle_event(event(
            3,
            ChatEventKind::Failed { message: "stream broke".to_owned() },
        ));
        assert!(finished);
        assert_eq!(controller.banner.as_deref(), Some("stream broke"));
    }

    #[test]
    fn cancel_stream_invalidates_generation() {
        let mut controller = controller_with_stream();
        controller.cancel_stream();
        assert!(controller.shell.is_none());
        let finished = controller.handle_event(event(
            3,
            ChatEventKind::Repaint { content: "zombie".to_owned() },
        ));
        assert!(!finished, "events from the cancelled stream are no-ops");
    }

    #[test]
    fn transient_status_expires() {
        let mut controller = ChatController::new();
        controller.set_status("saved");
        assert_eq!(controller.status_message(), Some("saved"));
        controller.status_message = Some((
            "old".to_owned(),
            Instant::now() - Duration::from_secs(4),
        ));
        assert_eq!(controller.status_message(), None);
        controller.prune_status();
        assert!(controller.status_message.is_none());
    }
}
