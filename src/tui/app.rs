use tokio::sync::mpsc;

use crate::api::types::JobDto;
use crate::api::{ApiClient, ApiError};
use crate::chat::{ChatController, ChatEvent};
use crate::core::store::{CrawlConfigStore, EditKind};
use crate::core::validation::ValidationWorkspace;
use crate::health::{HealthController, HealthEvent};
use crate::jobs::{
    IngestController, IngestUpdate, JobAction, JobManager, LogChannel, LogEvent,
};

use super::preferences::PreferencesStore;

/// Top-level tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Streaming chat sessions.
    #[default]
    Chat,
    /// Crawl configuration editor.
    Config,
    /// Job table and log panes.
    Jobs,
    /// Validation workspace and pipeline health.
    Data,
}

impl Tab {
    /// All tabs in display order.
    pub const ALL: [Self; 4] = [Self::Chat, Self::Config, Self::Jobs, Self::Data];

    /// Tab title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Chat => "Chat",
            Self::Config => "Crawl Config",
            Self::Jobs => "Jobs",
            Self::Data => "Data",
        }
    }

    /// The next tab rightwards, wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Chat => Self::Config,
            Self::Config => Self::Jobs,
            Self::Jobs => Self::Data,
            Self::Data => Self::Chat,
        }
    }
}

/// What the bottom input line is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputContext {
    /// Admin token for unlock.
    AdminToken,
    /// A chat message.
    ChatMessage,
    /// New title for a conversation.
    RenameConversation {
        /// Conversation being renamed.
        id: String,
    },
    /// New seed URL.
    AddSeed,
    /// New blocked domain.
    AddBlocked,
    /// New allow-rule pattern.
    AddAllowRule,
    /// Replacement pattern for an existing rule.
    EditAllowPattern {
        /// Rule row index.
        index: usize,
    },
    /// Name for a new auth profile.
    ProfileName,
    /// Storage-state path for a profile.
    ProfileStoragePath {
        /// Profile name.
        name: String,
    },
    /// URL for the cross-system lookup.
    CheckUrl,
    /// Query for the text search.
    SearchQuery,
}

impl InputContext {
    /// Prompt shown next to the input line.
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::AdminToken => "Admin token",
            Self::ChatMessage => "Message",
            Self::RenameConversation { .. } => "New title",
            Self::AddSeed => "Seed URL",
            Self::AddBlocked => "Blocked domain",
            Self::AddAllowRule => "Allow pattern",
            Self::EditAllowPattern { .. } => "Pattern",
            Self::ProfileName => "Profile name",
            Self::ProfileStoragePath { .. } => "Storage state path",
            Self::CheckUrl => "URL to check",
            Self::SearchQuery => "Search",
        }
    }
}

/// What a pending confirmation would destroy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// A job and its logs.
    Job(String),
    /// A conversation.
    Conversation(String),
    /// An allow rule row.
    AllowRule(usize),
    /// A seed row.
    Seed(usize),
    /// A blocked-domain row.
    Blocked(usize),
    /// An auth profile.
    AuthProfile(String),
    /// Destructive reset of crawled artifacts.
    ResetArtifacts,
    /// Destructive reset of the vector store.
    ResetQdrant,
    /// Destructive reset of everything.
    ResetAll,
    /// Destructive reset of ingest state.
    ResetIngest,
}

impl DeleteTarget {
    /// Whether confirmation demands the literal word `DELETE` typed.
    #[must_use]
    pub fn requires_typed_delete(&self) -> bool {
        matches!(
            self,
            Self::ResetArtifacts | Self::ResetQdrant | Self::ResetAll | Self::ResetIngest
        )
    }

    /// Human description for the dialog.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Job(id) => format!("Delete job {id} and its logs?"),
            Self::Conversation(id) => format!("Delete conversation {id}?"),
            Self::AllowRule(_) => "Delete this allow rule?".to_owned(),
            Self::Seed(_) => "Delete this seed?".to_owned(),
            Self::Blocked(_) => "Delete this blocked domain?".to_owned(),
            Self::AuthProfile(name) => format!("Delete auth profile \"{name}\"?"),
            Self::ResetArtifacts => "Reset ALL crawled artifacts?".to_owned(),
            Self::ResetQdrant => "Reset the ENTIRE vector store?".to_owned(),
            Self::ResetAll => "Reset EVERYTHING (artifacts + vectors)?".to_owned(),
            Self::ResetIngest => "Reset ingest state?".to_owned(),
        }
    }
}

/// UI mode: what keys mean right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Browsing the active tab.
    #[default]
    Normal,
    /// Collecting a line of input.
    Input(InputContext),
    /// Waiting on a delete confirmation.
    ConfirmDelete(DeleteTarget),
    /// Help overlay.
    Help,
}

/// Single-line input state.
#[derive(Debug, Default)]
pub struct InputState {
    /// The buffer as typed.
    pub buffer: String,
    /// Cursor byte position.
    pub cursor: usize,
}

impl InputState {
    /// Reset for a new prompt.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }
}

/// Sections of the crawl config tab, cycled with Tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigSection {
    /// Seed list.
    #[default]
    Seeds,
    /// Blocked domains.
    Blocked,
    /// Allow rules.
    AllowRules,
    /// Discovery recommendations.
    Recommendations,
    /// Auth profiles.
    Profiles,
}

impl ConfigSection {
    /// The next section, wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Seeds => Self::Blocked,
            Self::Blocked => Self::AllowRules,
            Self::AllowRules => Self::Recommendations,
            Self::Recommendations => Self::Profiles,
            Self::Profiles => Self::Seeds,
        }
    }

    /// Section heading.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Seeds => "Seeds",
            Self::Blocked => "Blocked domains",
            Self::AllowRules => "Allow rules",
            Self::Recommendations => "Recommendations",
            Self::Profiles => "Auth profiles",
        }
    }
}

/// Which validation workspace the data tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationKind {
    /// Crawl artifact validation.
    #[default]
    Crawl,
    /// Ingest validation.
    Ingest,
}

impl ValidationKind {
    /// Path segment for the validate endpoints.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
        }
    }
}

/// Channel receivers owned by the main loop.
#[derive(Debug)]
pub struct Receivers {
    /// Chat streaming events.
    pub chat: mpsc::UnboundedReceiver<ChatEvent>,
    /// Log channel events.
    pub logs: mpsc::UnboundedReceiver<LogEvent>,
    /// Ingest tracking updates.
    pub ingest: mpsc::UnboundedReceiver<IngestUpdate>,
    /// Worker-status poll results.
    pub health: mpsc::UnboundedReceiver<HealthEvent>,
}

/// The application.
#[derive(Debug)]
pub struct App {
    /// API client with the resolved base URL.
    pub client: ApiClient,
    /// Persisted UI preferences.
    pub prefs: PreferencesStore,
    /// Active tab.
    pub tab: Tab,
    /// Current mode.
    pub mode: AppMode,
    /// Whether the admin surface is unlocked.
    pub admin_unlocked: bool,
    /// Chat controller.
    pub chat: ChatController,
    /// Crawl config store.
    pub config: CrawlConfigStore,
    /// Job and log manager.
    pub jobs: JobManager,
    /// Ingest progress controller.
    pub ingest: IngestController,
    /// Health controller.
    pub health: HealthController,
    /// Crawl validation workspace.
    pub crawl_validation: ValidationWorkspace,
    /// Ingest validation workspace.
    pub ingest_validation: ValidationWorkspace,
    /// Which workspace the data tab shows.
    pub validation_kind: ValidationKind,
    /// Sticky error banner (network failures, dead streams).
    pub banner: Option<String>,
    /// One-line status message in the status bar.
    pub status_message: Option<String>,
    /// Quit flag.
    pub should_quit: bool,
    /// Animation tick counter.
    pub spinner_tick: usize,
    /// Input line state.
    pub input: InputState,

    /// Selected conversation row in the sidebar.
    pub sidebar_selected: usize,
    /// Active config section.
    pub config_section: ConfigSection,
    /// Selected row within the active config section.
    pub config_row: usize,
    /// Selected job row.
    pub jobs_selected: usize,
    /// Which log pane the jobs tab shows.
    pub log_view_channel: LogChannel,
    /// Selected row among the rendered validation rows.
    pub validation_selected: usize,
    /// Chat transcript scroll offset from the bottom.
    pub chat_scroll: usize,

    chat_tx: mpsc::UnboundedSender<ChatEvent>,
    ingest_tx: mpsc::UnboundedSender<IngestUpdate>,
    health_tx: mpsc::UnboundedSender<HealthEvent>,
}

impl App {
    /// Build the app and the channel receivers for the main loop.
    #[must_use]
    pub fn new(client: ApiClient, prefs: PreferencesStore) -> (Self, Receivers) {
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = mpsc::unbounded_channel();

        let crawl_validation = ValidationWorkspace::with_ui_state(
            prefs.prefs.lower_priority.expanded,
            prefs.prefs.lower_priority_page_size(),
        );

        let app = Self {
            client,
            prefs,
            tab: Tab::Chat,
            mode: AppMode::Normal,
            admin_unlocked: false,
            chat: ChatController::new(),
            config: CrawlConfigStore::new(),
            jobs: JobManager::new(log_tx),
            ingest: IngestController::new(),
            health: HealthController::new(),
            crawl_validation,
            ingest_validation: ValidationWorkspace::default(),
            validation_kind: ValidationKind::Crawl,
            banner: None,
            status_message: None,
            should_quit: false,
            spinner_tick: 0,
            input: InputState::default(),
            sidebar_selected: 0,
            config_section: ConfigSection::Seeds,
            config_row: 0,
            jobs_selected: 0,
            log_view_channel: LogChannel::Crawl,
            validation_selected: 0,
            chat_scroll: 0,
            chat_tx,
            ingest_tx,
            health_tx,
        };
        let receivers = Receivers {
            chat: chat_rx,
            logs: log_rx,
            ingest: ingest_rx,
            health: health_rx,
        };
        (app, receivers)
    }

    /// The active validation workspace.
    #[must_use]
    pub fn validation(&self) -> &ValidationWorkspace {
        match self.validation_kind {
            ValidationKind::Crawl => &self.crawl_validation,
            ValidationKind::Ingest => &self.ingest_validation,
        }
    }

    /// Mutable access to the active validation workspace.
    pub fn validation_mut(&mut self) -> &mut ValidationWorkspace {
        match self.validation_kind {
            ValidationKind::Crawl => &mut self.crawl_validation,
            ValidationKind::Ingest => &mut self.ingest_validation,
        }
    }

    /// Animation and housekeeping tick.
    pub fn tick(&mut self) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
        self.config.prune_row_status();
        self.chat.prune_status();
    }

    /// Record an API failure: network errors raise the sticky banner,
    /// everything else lands in the status line.
    pub fn report_error(&mut self, context: &str, error: &ApiError) {
        if error.is_network() {
            self.banner = Some(format!("Backend unreachable ({error})"));
        } else {
            self.status_message = Some(format!("{context}: {}", error.panel_text()));
        }
    }

    // ------------------------------------------------------------------
    // Startup and unlock

    /// Initial data loads that need no admin token.
    pub async fn connect(&mut self) {
        if let Err(e) = self.chat.refresh_conversations(&self.client).await {
            self.report_error("conversation list", &e);
        }
        if let Err(e) = self.health.refresh(&self.client).await {
            self.report_error("health", &e);
        }
    }

    /// Present the admin token; on success load the admin workspace.
    pub async fn unlock(&mut self, token: &str) {
        let body = serde_json::json!({ "token": token });
        match self.client.post_json::<_, serde_json::Value>("/api/admin/unlock", &body).await {
            Ok(_) => {
                self.client.set_admin_token(token);
                self.admin_unlocked = true;
                self.prefs.prefs.admin_unlocked = true;
                self.prefs.save_best_effort().await;
                self.status_message = Some("Admin unlocked".to_owned());
                self.load_admin_workspace().await;
            }
            Err(e) => {
                self.report_error("unlock", &e);
            }
        }
    }

    /// Load everything behind the admin surface.
    pub async fn load_admin_workspace(&mut self) {
        for failure in self.config.load_all(&self.client).await {
            self.report_error(failure.what, &failure.error);
        }
        if let Err(e) = self.jobs.refresh_jobs(&self.client).await {
            self.report_error("jobs", &e);
        }
        self.refresh_validation(ValidationKind::Crawl).await;
        self.refresh_validation(ValidationKind::Ingest).await;
        self.health.start_worker_poll(&self.client, &self.health_tx);
    }

    /// Close all streams, zero job references, clear panes and status.
    pub async fn reset_admin_session(&mut self) {
        self.jobs.reset_admin_session();
        self.ingest.reset();
        self.health.stop_worker_poll();
        self.banner = None;
        self.status_message = Some("Admin session reset".to_owned());
    }

    // ------------------------------------------------------------------
    // Chat

    /// Send the composed message on the current conversation, starting
    /// one first when none is loaded.
    pub async fn send_chat_message(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        if self.chat.current.is_none() {
            if let Err(e) = self.chat.start_conversation(&self.client).await {
                self.report_error("start conversation", &e);
                return;
            }
        }
        self.chat.send_message(&self.client, &self.chat_tx, &text);
        self.chat_scroll = 0;
    }

    /// Apply one chat streaming event; finishing events trigger the
    /// server-authoritative refetch.
    pub async fn on_chat_event(&mut self, event: ChatEvent) {
        if self.chat.handle_event(event) {
            self.chat.finish_stream(&self.client).await;
        }
    }

    /// Open the conversation selected in the sidebar.
    pub async fn open_selected_conversation(&mut self) {
        let Some(convo) = self.chat.conversations.get(self.sidebar_selected) else {
            return;
        };
        let id = convo.id.clone();
        if let Err(e) = self.chat.load_conversation(&self.client, &id).await {
            self.report_error("load conversation", &e);
        }
        self.chat_scroll = 0;
    }

    // ------------------------------------------------------------------
    // Log and job events

    /// Apply one log event and run any follow-up it demands.
    pub async fn on_log_event(&mut self, event: LogEvent) {
        match self.jobs.handle_event(event) {
            Some(JobAction::FetchSummary(job_id)) => {
                if let Err(e) = self.jobs.fetch_summary(&self.client, &job_id).await {
                    self.report_error("crawl summary", &e);
                }
            }
            Some(JobAction::Banner(text)) => {
                self.banner = Some(text);
            }
            None => {}
        }
    }

    /// Apply one ingest tracking update.
    pub fn on_ingest_update(&mut self, update: IngestUpdate) {
        self.ingest.handle_update(update);
        if self.ingest.finished {
            self.status_message = Some(self.ingest.headline());
        }
    }

    /// Apply one worker-poll result.
    pub fn on_health_event(&mut self, event: HealthEvent) {
        self.health.handle_event(event);
    }

    /// Start a crawl job.
    pub async fn start_crawl(&mut self) {
        match self.jobs.start_crawl(&self.client).await {
            Ok(job_id) => {
                self.status_message = Some(format!("Crawl {job_id} started"));
                self.log_view_channel = LogChannel::Crawl;
            }
            Err(e) => self.report_error("start crawl", &e),
        }
    }

    /// Start an ingest run with dual tracking.
    pub async fn start_ingest(&mut self) {
        match self.ingest.start(&self.client, &self.ingest_tx).await {
            Ok(job_id) => {
                self.status_message = Some(format!("Ingest {job_id} started"));
            }
            Err(e) => self.report_error("start ingest", &e),
        }
    }

    /// View the selected job's log on the `jobs` channel.
    pub fn view_selected_job_log(&mut self) {
        let Some(job) = self.jobs.jobs.get(self.jobs_selected).cloned() else {
            return;
        };
        self.jobs.view_log(&self.client, &job);
        self.log_view_channel = LogChannel::Jobs;
    }

    /// Export the selected job's log.
    pub async fn export_selected_job_log(&mut self) {
        let Some(job) = self.jobs.jobs.get(self.jobs_selected).cloned() else {
            return;
        };
        match self.jobs.export_log(&self.client, &job.job_id).await {
            Ok(path) => {
                self.status_message = Some(format!("Exported to {}", path.display()));
            }
            Err(e) => self.status_message = Some(format!("export failed: {e}")),
        }
    }

    /// The selected job, if any.
    #[must_use]
    pub fn selected_job(&self) -> Option<&JobDto> {
        self.jobs.jobs.get(self.jobs_selected)
    }

    // ------------------------------------------------------------------
    // Validation

    /// Re-fetch a validation summary.
    pub async fn refresh_validation(&mut self, kind: ValidationKind) {
        let path = format!("/api/admin/validate/{}/summary", kind.path());
        match self.client.get_json(&path).await {
            Ok(summary) => {
                let workspace = match kind {
                    ValidationKind::Crawl => &mut self.crawl_validation,
                    ValidationKind::Ingest => &mut self.ingest_validation,
                };
                workspace.set_summary(summary);
            }
            Err(e) => self.report_error("validation summary", &e),
        }
    }

    /// Run a validation pass, then re-fetch its summary.
    pub async fn run_validation(&mut self) {
        let kind = self.validation_kind;
        let path = format!("/api/admin/validate/{}", kind.path());
        if let Err(e) = self.client.post_empty(&path).await {
            self.report_error("run validation", &e);
            return;
        }
        self.refresh_validation(kind).await;
    }

    /// Quarantine the selected findings, mark them, and reload.
    pub async fn quarantine_selected(&mut self) {
        let ids = self.validation().selected_ids();
        if ids.is_empty() {
            self.status_message = Some("nothing selected".to_owned());
            return;
        }
        let body = serde_json::json!({ "ids": ids });
        match self
            .client
            .post_json::<_, serde_json::Value>("/api/admin/quarantine", &body)
            .await
        {
            Ok(_) => {
                self.validation_mut().mark_quarantined(&ids);
                self.status_message = Some(format!("Quarantined {} artifacts", ids.len()));
                let kind = self.validation_kind;
                self.refresh_validation(kind).await;
            }
            Err(e) => self.report_error("quarantine", &e),
        }
    }

    /// Toggle the lower-priority section, persisting the state.
    pub async fn toggle_lower_priority(&mut self) {
        let workspace = self.validation_mut();
        workspace.expanded = !workspace.expanded;
        let expanded = workspace.expanded;
        if self.validation_kind == ValidationKind::Crawl {
            self.prefs.prefs.lower_priority.expanded = expanded;
            self.prefs.save_best_effort().await;
        }
    }

    /// Cycle the lower-priority page size, persisting it.
    pub async fn cycle_validation_page_size(&mut self) {
        let workspace = self.validation_mut();
        workspace.cycle_page_size();
        let page_size = workspace.page_size;
        if self.validation_kind == ValidationKind::Crawl {
            self.prefs.prefs.lower_priority.page_size = page_size;
            self.prefs.save_best_effort().await;
        }
    }

    // ------------------------------------------------------------------
    // Confirmed deletions and resets

    /// Run a confirmed delete.
    pub async fn execute_delete(&mut self, target: DeleteTarget) {
        match target {
            DeleteTarget::Job(id) => {
                if let Err(e) = self.jobs.delete_job(&self.client, &id).await {
                    self.report_error("delete job", &e);
                } else {
                    self.status_message = Some(format!("Deleted job {id}"));
                }
            }
            DeleteTarget::Conversation(id) => {
                if let Err(e) = self.chat.delete_conversation(&self.client, &id).await {
                    self.report_error("delete conversation", &e);
                }
            }
            DeleteTarget::AllowRule(index) => {
                if let Err(e) = self.config.delete_allow_rule(&self.client, index).await {
                    self.report_error("delete rule", &e);
                } else if let Err(e) = self.config.save_allow_block(&self.client).await {
                    self.report_error("save config", &e);
                }
            }
            DeleteTarget::Seed(index) => {
                self.config.remove_seed(index);
                if let Err(e) = self.config.save_allow_block(&self.client).await {
                    self.report_error("save config", &e);
                }
            }
            DeleteTarget::Blocked(index) => {
                self.config.remove_blocked(index);
                if let Err(e) = self.config.save_allow_block(&self.client).await {
                    self.report_error("save config", &e);
                }
            }
            DeleteTarget::AuthProfile(name) => {
                if let Err(e) = self.config.delete_profile(&self.client, &name).await {
                    self.report_error("delete profile", &e);
                } else {
                    self.config.refresh_overlay(&self.client).await;
                }
            }
            DeleteTarget::ResetArtifacts => self.run_reset("/api/admin/reset/artifacts").await,
            DeleteTarget::ResetQdrant => self.run_reset("/api/admin/reset/qdrant").await,
            DeleteTarget::ResetAll => self.run_reset("/api/admin/reset/all").await,
            DeleteTarget::ResetIngest => self.run_reset("/api/admin/reset_ingest").await,
        }
    }

    async fn run_reset(&mut self, path: &str) {
        match self.client.post_empty(path).await {
            Ok(()) => {
                self.status_message = Some("Reset complete".to_owned());
                self.reset_admin_session().await;
                if self.admin_unlocked {
                    self.load_admin_workspace().await;
                }
            }
            Err(e) => self.report_error("reset", &e),
        }
    }

    // ------------------------------------------------------------------
    // Config actions

    /// Save the allow-rule draft on the given row.
    pub async fn save_allow_rule(&mut self, index: usize) {
        match self.config.save_allow_draft(&self.client, index).await {
            Ok(()) => {
                // Reload so the row adopts server state
                for failure in self.config.load_all(&self.client).await {
                    self.report_error(failure.what, &failure.error);
                }
            }
            Err(e) => {
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Add a recommendation as a new allow rule and persist it per-row.
    pub async fn accept_recommendation(&mut self, suggested_url: &str) {
        let Some(rec) = self
            .config
            .recommendations
            .iter()
            .find(|r| r.suggested_url == suggested_url)
            .cloned()
        else {
            return;
        };
        let rule = CrawlConfigStore::rule_from_recommendation(&rec);
        let index = self.config.allow_rules.len();
        self.config.allow_rules.push(rule.clone());
        self.config.allow_draft = Some(rule);
        self.config.edit.allow = Some(index);
        self.save_allow_rule(index).await;
    }

    /// Run the legacy-profile migration.
    pub async fn migrate_legacy_profile(&mut self) {
        if let Err(e) = self.config.migrate_legacy_profile(&self.client).await {
            self.report_error("migrate profile", &e);
        } else {
            self.status_message = Some("Legacy profile migrated".to_owned());
            for failure in self.config.load_all(&self.client).await {
                self.report_error(failure.what, &failure.error);
            }
        }
    }

    /// Test an auth profile and refresh the overlays.
    pub async fn test_auth_profile(&mut self, name: &str) {
        match self.config.test_auth_profile(&self.client, name).await {
            Ok(()) => self.status_message = Some(format!("Tested profile \"{name}\"")),
            Err(e) => self.report_error("test auth", &e),
        }
    }

    // ------------------------------------------------------------------
    // Input handling

    /// Open the input line for a context.
    pub fn open_input(&mut self, context: InputContext) {
        self.input.clear();
        if let InputContext::EditAllowPattern { index } = &context {
            self.config.begin_edit(EditKind::Allow, *index);
            if let Some(draft) = &self.config.allow_draft {
                self.input.buffer = draft.pattern.clone();
                self.input.cursor = self.input.buffer.len();
            }
        }
        self.mode = AppMode::Input(context);
    }

    /// Submit the input line for its context.
    pub async fn submit_input(&mut self) {
        let AppMode::Input(context) = std::mem::take(&mut self.mode) else {
            return;
        };
        let text = self.input.buffer.clone();
        self.input.clear();

        match context {
            InputContext::AdminToken => self.unlock(text.trim()).await,
            InputContext::ChatMessage => self.send_chat_message(text).await,
            InputContext::RenameConversation { id } => {
                if let Err(e) = self.chat.rename_conversation(&self.client, &id, text.trim()).await
                {
                    self.report_error("rename", &e);
                }
            }
            InputContext::AddSeed => {
                match self.config.add_seed(&text, false) {
                    Ok(()) => {
                        if let Err(e) = self.config.save_allow_block(&self.client).await {
                            self.report_error("save config", &e);
                        }
                    }
                    Err(rejection) => {
                        // Blocking alert; the input is retained for correction
                        self.status_message = Some(rejection.to_string());
                        self.input.buffer = text;
                        self.input.cursor = self.input.buffer.len();
                        self.mode = AppMode::Input(InputContext::AddSeed);
                    }
                }
            }
            InputContext::AddBlocked => {
                self.config.add_blocked(&text);
                if let Err(e) = self.config.save_allow_block(&self.client).await {
                    self.report_error("save config", &e);
                }
            }
            InputContext::AddAllowRule => match crate::core::normalize_url_row(&text, false) {
                Ok(pattern) => {
                    let rule = crate::core::AllowRule::new(pattern);
                    let index = self.config.allow_rules.len();
                    self.config.allow_rules.push(rule.clone());
                    self.config.allow_draft = Some(rule);
                    self.config.edit.allow = Some(index);
                    self.save_allow_rule(index).await;
                }
                Err(rejection) => {
                    self.status_message = Some(rejection.to_string());
                    self.input.buffer = text;
                    self.input.cursor = self.input.buffer.len();
                    self.mode = AppMode::Input(InputContext::AddAllowRule);
                }
            },
            InputContext::EditAllowPattern { index } => {
                if let Some(draft) = &mut self.config.allow_draft {
                    draft.pattern = text;
                }
                self.save_allow_rule(index).await;
            }
            InputContext::ProfileName => {
                let name = text.trim().to_owned();
                if !name.is_empty() {
                    self.open_input(InputContext::ProfileStoragePath { name });
                }
            }
            InputContext::ProfileStoragePath { name } => {
                self.config.begin_edit_profile(&name);
                if let Some((_, body)) = &mut self.config.profile_draft {
                    body.storage_state_path = text.trim().to_owned();
                }
                if let Err(e) = self.config.save_profile_draft(&self.client).await {
                    self.report_error("save profile", &e);
                } else {
                    self.status_message = Some(format!("Saved profile \"{name}\""));
                }
            }
            InputContext::CheckUrl => {
                if let Err(e) = self.health.check_url(&self.client, text.trim()).await {
                    self.report_error("check url", &e);
                }
            }
            InputContext::SearchQuery => {
                if let Err(e) = self.health.search(&self.client, text.trim()).await {
                    self.report_error("search", &e);
                }
            }
        }
    }
}
