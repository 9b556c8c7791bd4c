/// Streaming chat transcript view.
pub mod chat_view;
/// Crawl configuration editor panel.
pub mod config_panel;
/// Delete/reset confirmation dialog.
pub mod confirm_dialog;
/// Pipeline health cards and check-data tiles.
pub mod health_panel;
/// Ingest progress pane.
pub mod ingest_panel;
/// Job table rendering.
pub mod job_table;
/// Log pane rendering.
pub mod log_pane;
/// Conversation sidebar.
pub mod sidebar;
/// Status bar rendering.
pub mod status_bar;
/// Validation findings panel.
pub mod validation_panel;

/// Spinner animation frames for UI indicators
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
