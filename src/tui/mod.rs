// Allow missing documentation for TUI implementation details
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    reason = "TUI implementation details do not need public API documentation"
)]

/// Application state, tabs, and dialog models.
pub mod app;
/// Reusable UI components (panels, dialogs, status bar).
pub mod components;
/// Keyboard and terminal event handling.
pub mod events;
/// Persisted UI preferences.
pub mod preferences;
/// Single-line text input helpers.
pub mod text_input;
/// UI rendering functions for each tab and mode.
pub mod ui;

pub use app::App;

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::api::{ApiClient, resolve_base_url};

use self::app::Receivers;
use self::preferences::PreferencesStore;

/// Run the TUI application.
///
/// `api_url_override` beats both the environment variable and the stored
/// preference when set (the `--api-url` flag).
///
/// # Errors
///
/// Returns an error if terminal initialization fails or if there's an error
/// during the main event loop.
pub async fn run(api_url_override: Option<String>) -> anyhow::Result<()> {
    let prefs = PreferencesStore::load().await;
    let base_url = api_url_override
        .map(|url| url.trim_end_matches('/').to_owned())
        .unwrap_or_else(|| resolve_base_url(prefs.prefs.api_url.as_deref()));
    let client = ApiClient::new(base_url);
    let (mut app, receivers) = App::new(client, prefs);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.connect().await;
    // A token in the environment unlocks without a prompt
    if let Ok(token) = std::env::var("RAGDECK_ADMIN_TOKEN") {
        if !token.is_empty() {
            app.unlock(&token).await;
        }
    }

    // Main loop
    let result = run_main_loop(&mut terminal, &mut app, receivers).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_main_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut receivers: Receivers,
) -> anyhow::Result<()> {
    let mut event_stream = events::create_event_stream();

    // Tick interval for animations and timer housekeeping
    let mut tick_interval = tokio::time::interval(Duration::from_millis(80));

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            // Terminal events
            event_result = event_stream.next() => {
                let Some(event_result) = event_result else {
                    break;
                };
                match event_result? {
                    Event::Key(key) => {
                        events::handle_key_event(app, key).await?;
                    }
                    Event::Paste(text) => {
                        events::handle_paste_event(app, &text);
                    }
                    Event::Resize(..) => {}
                    _ => {}
                }
            }

            // Chat streaming events
            Some(event) = receivers.chat.recv() => {
                app.on_chat_event(event).await;
            }

            // Log channel events
            Some(event) = receivers.logs.recv() => {
                app.on_log_event(event).await;
            }

            // Ingest tracking updates
            Some(update) = receivers.ingest.recv() => {
                app.on_ingest_update(update);
            }

            // Worker-status poll results
            Some(event) = receivers.health.recv() => {
                app.on_health_event(event);
            }

            // Animations and timer housekeeping
            _ = tick_interval.tick() => {
                app.tick();
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Stop background pumps before handing the terminal back
    app.jobs.reset_admin_session();
    app.ingest.stop();
    app.health.stop_worker_poll();
    app.chat.cancel_stream();

    Ok(())
}
