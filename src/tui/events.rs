use crossterm::event::{EventStream, KeyCode, KeyEvent};

use crate::core::store::EditKind;
use crate::jobs::LogChannel;

use super::app::{App, AppMode, ConfigSection, DeleteTarget, InputContext, Tab, ValidationKind};
use super::preferences::SIDEBAR_RESIZE_STEP;
use super::text_input;

/// Create a new async event stream for terminal events.
#[must_use]
pub fn create_event_stream() -> EventStream {
    EventStream::new()
}

/// Handle a paste event: pasted text lands in the input line when one is
/// open, and is ignored otherwise.
pub fn handle_paste_event(app: &mut App, text: &str) {
    if matches!(app.mode, AppMode::Input(_) | AppMode::ConfirmDelete(_)) {
        for ch in text.chars().filter(|c| !c.is_control()) {
            app.input.cursor =
                text_input::insert_char_at_cursor(&mut app.input.buffer, app.input.cursor, ch);
        }
    }
}

/// Handle one key event.
///
/// # Errors
///
/// Returns an error only for unrecoverable terminal failures; API errors
/// surface through the status line and banner instead.
pub async fn handle_key_event(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    match app.mode.clone() {
        AppMode::Input(context) => handle_input_key(app, &context, key).await,
        AppMode::ConfirmDelete(target) => handle_confirm_key(app, target, key).await,
        AppMode::Help => {
            app.mode = AppMode::Normal;
            Ok(())
        }
        AppMode::Normal => handle_normal_key(app, key).await,
    }
}

async fn handle_input_key(
    app: &mut App,
    context: &InputContext,
    key: KeyEvent,
) -> anyhow::Result<()> {
    match key.code {
        KeyCode::Esc => {
            if let InputContext::EditAllowPattern { .. } = context {
                app.config.cancel_edit(EditKind::Allow);
            }
            app.input.clear();
            app.mode = AppMode::Normal;
        }
        KeyCode::Enter => app.submit_input().await,
        KeyCode::Backspace => {
            app.input.cursor =
                text_input::delete_char_before_cursor(&mut app.input.buffer, app.input.cursor);
        }
        KeyCode::Delete => {
            app.input.cursor =
                text_input::delete_char_at_cursor(&mut app.input.buffer, app.input.cursor);
        }
        KeyCode::Left => {
            app.input.cursor = text_input::move_cursor_left(&app.input.buffer, app.input.cursor);
        }
        KeyCode::Right => {
            app.input.cursor = text_input::move_cursor_right(&app.input.buffer, app.input.cursor);
        }
        KeyCode::Home => app.input.cursor = 0,
        KeyCode::End => app.input.cursor = app.input.buffer.len(),
        KeyCode::Char(ch) => {
            app.input.cursor =
                text_input::insert_char_at_cursor(&mut app.input.buffer, app.input.cursor, ch);
        }
        _ => {}
    }
    Ok(())
}

async fn handle_confirm_key(
    app: &mut App,
    target: DeleteTarget,
    key: KeyEvent,
) -> anyhow::Result<()> {
    if target.requires_typed_delete() {
        match key.code {
            KeyCode::Esc => {
                app.input.clear();
                app.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                let confirmed = app.input.buffer.trim() == "DELETE";
                app.input.clear();
                app.mode = AppMode::Normal;
                if confirmed {
                    app.execute_delete(target).await;
                } else {
                    app.status_message = Some("Reset cancelled".to_owned());
                }
            }
            KeyCode::Backspace => {
                app.input.cursor =
                    text_input::delete_char_before_cursor(&mut app.input.buffer, app.input.cursor);
            }
            KeyCode::Char(ch) => {
                app.input.cursor =
                    text_input::insert_char_at_cursor(&mut app.input.buffer, app.input.cursor, ch);
            }
            _ => {}
        }
    } else {
        match key.code {
            KeyCode::Char('y') => {
                app.mode = AppMode::Normal;
                app.execute_delete(target).await;
            }
            KeyCode::Esc | KeyCode::Char('n') => {
                app.mode = AppMode::Normal;
            }
            _ => {}
        }
    }
    Ok(())
}

async fn handle_normal_key(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    // Keys shared by every tab
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return Ok(());
        }
        KeyCode::Char('?') => {
            app.mode = AppMode::Help;
            return Ok(());
        }
        KeyCode::Tab => {
            if app.tab == Tab::Config {
                app.config_section = app.config_section.next();
                app.config_row = 0;
            } else {
                app.tab = app.tab.next();
            }
            return Ok(());
        }
        KeyCode::BackTab => {
            app.tab = app.tab.next();
            return Ok(());
        }
        KeyCode::Char('U') => {
            app.open_input(InputContext::AdminToken);
            return Ok(());
        }
        KeyCode::Char('B') => {
            app.prefs.prefs.sidebar.collapsed = !app.prefs.prefs.sidebar.collapsed;
            app.prefs.save_best_effort().await;
            return Ok(());
        }
        KeyCode::Char('<') => {
            app.prefs.prefs.resize_sidebar(-i32::from(SIDEBAR_RESIZE_STEP));
            app.prefs.save_best_effort().await;
            return Ok(());
        }
        KeyCode::Char('>') => {
            app.prefs.prefs.resize_sidebar(i32::from(SIDEBAR_RESIZE_STEP));
            app.prefs.save_best_effort().await;
            return Ok(());
        }
        KeyCode::Esc => {
            app.banner = None;
            app.status_message = None;
            return Ok(());
        }
        _ => {}
    }

    match app.tab {
        Tab::Chat => handle_chat_key(app, key).await,
        Tab::Config => handle_config_key(app, key).await,
        Tab::Jobs => handle_jobs_key(app, key).await,
        Tab::Data => handle_data_key(app, key).await,
    }
}

async fn handle_chat_key(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let len = app.chat.conversations.len();
            if len > 0 && app.sidebar_selected + 1 < len {
                app.sidebar_selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.sidebar_selected = app.sidebar_selected.saturating_sub(1);
        }
        KeyCode::Enter => app.open_selected_conversation().await,
        KeyCode::Char('m') => app.open_input(InputContext::ChatMessage),
        KeyCode::Char('n') => app.chat.start_new_conversation(),
        KeyCode::Char('r') => {
            if let Some(convo) = app.chat.conversations.get(app.sidebar_selected) {
                let id = convo.id.clone();
                app.open_input(InputContext::RenameConversation { id });
            }
        }
        KeyCode::Char('e') => {
            if let Some(convo) = app.chat.conversations.get(app.sidebar_selected) {
                let id = convo.id.clone();
                match app.chat.export_conversation(&app.client, &id).await {
                    Ok(path) => {
                        app.status_message = Some(format!("Exported to {}", path.display()));
                    }
                    Err(e) => app.status_message = Some(format!("export failed: {e}")),
                }
            }
        }
        KeyCode::Char('x') => {
            if let Some(convo) = app.chat.conversations.get(app.sidebar_selected) {
                app.mode = AppMode::ConfirmDelete(DeleteTarget::Conversation(convo.id.clone()));
            }
        }
        KeyCode::PageUp => app.chat_scroll += 10,
        KeyCode::PageDown => app.chat_scroll = app.chat_scroll.saturating_sub(10),
        _ => {}
    }
    Ok(())
}

fn config_section_len(app: &App) -> usize {
    match app.config_section {
        ConfigSection::Seeds => app.config.seeds.len(),
        ConfigSection::Blocked => app.config.blocked.len(),
        ConfigSection::AllowRules => app.config.allow_rules.len(),
        ConfigSection::Recommendations => app.config.visible_recommendations().0.len(),
        ConfigSection::Profiles => app.config.crawler.playwright.auth_profiles.len(),
    }
}

/// Map the display-ordered cursor row back to the store index.
fn config_store_index(app: &App) -> Option<usize> {
    use crate::core::store::CrawlConfigStore;
    let row = app.config_row;
    match app.config_section {
        ConfigSection::Seeds => {
            CrawlConfigStore::display_order(&app.config.seeds, |s| s.url.as_str())
                .get(row)
                .copied()
        }
        ConfigSection::Blocked => {
            CrawlConfigStore::display_order(&app.config.blocked, |d| d.as_str())
                .get(row)
                .copied()
        }
        ConfigSection::AllowRules => {
            CrawlConfigStore::display_order(&app.config.allow_rules, |r| r.pattern.as_str())
                .get(row)
                .copied()
        }
        ConfigSection::Recommendations | ConfigSection::Profiles => Some(row),
    }
}

async fn handle_config_key(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    if !app.admin_unlocked {
        app.status_message = Some("Unlock the admin surface first (U)".to_owned());
        return Ok(());
    }

    // Movement first
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let len = config_section_len(app);
            if len > 0 && app.config_row + 1 < len {
                app.config_row += 1;
            }
            return Ok(());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.config_row = app.config_row.saturating_sub(1);
            return Ok(());
        }
        KeyCode::Char('w') => {
            app.config_section = app.config_section.next();
            app.config_row = 0;
            return Ok(());
        }
        KeyCode::Char('g') => {
            if app.config.shows_legacy_banner() {
                app.migrate_legacy_profile().await;
            }
            return Ok(());
        }
        _ => {}
    }

    match app.config_section {
        ConfigSection::Seeds => match key.code {
            KeyCode::Char('a') => app.open_input(InputContext::AddSeed),
            KeyCode::Char('x') => {
                if let Some(index) = config_store_index(app) {
                    app.mode = AppMode::ConfirmDelete(DeleteTarget::Seed(index));
                }
            }
            KeyCode::Char('s') => {
                if let Err(e) = app.config.save_allow_block(&app.client).await {
                    app.report_error("save config", &e);
                } else {
                    app.status_message = Some("Config saved".to_owned());
                }
            }
            _ => {}
        },
        ConfigSection::Blocked => match key.code {
            KeyCode::Char('a') => app.open_input(InputContext::AddBlocked),
            KeyCode::Char('x') => {
                if let Some(index) = config_store_index(app) {
                    app.mode = AppMode::ConfirmDelete(DeleteTarget::Blocked(index));
                }
            }
            KeyCode::Char('s') => {
                if let Err(e) = app.config.save_allow_block(&app.client).await {
                    app.report_error("save config", &e);
                }
            }
            _ => {}
        },
        ConfigSection::AllowRules => {
            handle_allow_rule_key(app, key).await;
        }
        ConfigSection::Recommendations => match key.code {
            KeyCode::Enter => {
                let (visible, _) = app.config.visible_recommendations();
                if let Some(rec) = visible.get(app.config_row) {
                    let url = rec.suggested_url.clone();
                    app.accept_recommendation(&url).await;
                }
            }
            KeyCode::Char('v') => {
                app.config.recommendations_expanded = !app.config.recommendations_expanded;
            }
            KeyCode::Char('P') => {
                if let Err(e) = app.config.purge_candidates(&app.client).await {
                    app.report_error("purge", &e);
                } else {
                    app.status_message = Some("Discovery cache purged".to_owned());
                }
            }
            _ => {}
        },
        ConfigSection::Profiles => match key.code {
            KeyCode::Char('a') => app.open_input(InputContext::ProfileName),
            KeyCode::Char('x') => {
                if let Some(name) = selected_profile_name(app) {
                    app.mode = AppMode::ConfirmDelete(DeleteTarget::AuthProfile(name));
                }
            }
            KeyCode::Char('t') => {
                if let Some(name) = selected_profile_name(app) {
                    app.test_auth_profile(&name).await;
                }
            }
            _ => {}
        },
    }
    Ok(())
}

fn selected_profile_name(app: &App) -> Option<String> {
    app.config
        .crawler
        .playwright
        .auth_profiles
        .keys()
        .nth(app.config_row)
        .cloned()
}

async fn handle_allow_rule_key(app: &mut App, key: KeyEvent) {
    let Some(index) = config_store_index(app) else {
        if key.code == KeyCode::Char('a') {
            app.open_input(InputContext::AddAllowRule);
        }
        return;
    };

    match key.code {
        KeyCode::Char('a') => app.open_input(InputContext::AddAllowRule),
        KeyCode::Char('e') => app.open_input(InputContext::EditAllowPattern { index }),
        KeyCode::Char('x') => {
            app.mode = AppMode::ConfirmDelete(DeleteTarget::AllowRule(index));
        }
        KeyCode::Char('h') => {
            app.config.begin_edit(EditKind::Allow, index);
            app.config.toggle_draft_allow_http();
            app.save_allow_rule(index).await;
        }
        KeyCode::Char('m') => {
            app.config.begin_edit(EditKind::Allow, index);
            if let Some(draft) = &mut app.config.allow_draft {
                draft.match_mode = match draft.match_mode {
                    crate::core::MatchMode::Prefix => crate::core::MatchMode::Exact,
                    crate::core::MatchMode::Exact => crate::core::MatchMode::Prefix,
                };
            }
            app.save_allow_rule(index).await;
        }
        KeyCode::Char('p') => {
            let names: Vec<String> = app
                .config
                .crawler
                .playwright
                .auth_profiles
                .keys()
                .cloned()
                .collect();
            app.config.begin_edit(EditKind::Allow, index);
            if let Some(draft) = &mut app.config.allow_draft {
                draft.auth_profile = next_profile(names, draft.auth_profile.take());
            }
            app.save_allow_rule(index).await;
        }
        KeyCode::Char(digit @ '1'..='5') => {
            app.config.begin_edit(EditKind::Allow, index);
            if let Some(draft) = &mut app.config.allow_draft {
                match digit {
                    '1' => draft.types.web = !draft.types.web,
                    '2' => draft.types.pdf = !draft.types.pdf,
                    '3' => draft.types.docx = !draft.types.docx,
                    '4' => draft.types.xlsx = !draft.types.xlsx,
                    _ => draft.types.pptx = !draft.types.pptx,
                }
            }
            app.save_allow_rule(index).await;
        }
        _ => {}
    }
}

/// Cycle None → first profile → … → last profile → None.
fn next_profile(names: Vec<String>, current: Option<String>) -> Option<String> {
    match current {
        None => names.first().cloned(),
        Some(current) => {
            let idx = names.iter().position(|n| n == &current)?;
            names.get(idx + 1).cloned()
        }
    }
}

async fn handle_jobs_key(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    if !app.admin_unlocked {
        app.status_message = Some("Unlock the admin surface first (U)".to_owned());
        return Ok(());
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let len = app.jobs.jobs.len();
            if len > 0 && app.jobs_selected + 1 < len {
                app.jobs_selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.jobs_selected = app.jobs_selected.saturating_sub(1);
        }
        KeyCode::Char('c') => app.start_crawl().await,
        KeyCode::Char('i') => app.start_ingest().await,
        KeyCode::Char('I') => {
            match app.jobs.start_ingest(&app.client).await {
                Ok(job_id) => {
                    app.status_message = Some(format!("Ingest job {job_id} enqueued"));
                    app.log_view_channel = LogChannel::Ingest;
                }
                Err(e) => app.report_error("enqueue ingest", &e),
            }
        }
        KeyCode::Enter => app.view_selected_job_log(),
        KeyCode::Char('o') => app.export_selected_job_log().await,
        KeyCode::Char('x') => {
            if let Some(job) = app.selected_job() {
                app.mode = AppMode::ConfirmDelete(DeleteTarget::Job(job.job_id.clone()));
            }
        }
        KeyCode::Char('l') => {
            app.log_view_channel = match app.log_view_channel {
                LogChannel::Crawl => LogChannel::Ingest,
                LogChannel::Ingest => LogChannel::Jobs,
                LogChannel::Jobs => LogChannel::Crawl,
            };
        }
        KeyCode::Char('R') => app.reset_admin_session().await,
        KeyCode::Char('7') => {
            app.input.clear();
            app.mode = AppMode::ConfirmDelete(DeleteTarget::ResetIngest);
        }
        KeyCode::Char('8') => {
            app.input.clear();
            app.mode = AppMode::ConfirmDelete(DeleteTarget::ResetArtifacts);
        }
        KeyCode::Char('9') => {
            app.input.clear();
            app.mode = AppMode::ConfirmDelete(DeleteTarget::ResetQdrant);
        }
        KeyCode::Char('0') => {
            app.input.clear();
            app.mode = AppMode::ConfirmDelete(DeleteTarget::ResetAll);
        }
        KeyCode::PageUp => {
            let channel = app.log_view_channel;
            app.jobs.pane_mut(channel).scroll_from_bottom += 10;
        }
        KeyCode::PageDown => {
            let channel = app.log_view_channel;
            let pane = app.jobs.pane_mut(channel);
            pane.scroll_from_bottom = pane.scroll_from_bottom.saturating_sub(10);
        }
        _ => {}
    }
    Ok(())
}

async fn handle_data_key(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    if !app.admin_unlocked {
        app.status_message = Some("Unlock the admin surface first (U)".to_owned());
        return Ok(());
    }

    match key.code {
        KeyCode::Down => {
            let rendered = app.validation().rendered_ids().len();
            if rendered > 0 && app.validation_selected + 1 < rendered {
                app.validation_selected += 1;
            }
        }
        KeyCode::Up => {
            app.validation_selected = app.validation_selected.saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            let ids = app.validation().rendered_ids();
            if let Some(id) = ids.get(app.validation_selected) {
                let id = id.clone();
                app.validation_mut().toggle_selected(&id);
            }
        }
        KeyCode::Char('A') => app.validation_mut().toggle_select_all_rendered(),
        KeyCode::Char('Q') => app.quarantine_selected().await,
        KeyCode::Char('V') => app.run_validation().await,
        KeyCode::Char('L') => app.toggle_lower_priority().await,
        KeyCode::Char('f') => {
            let workspace = app.validation_mut();
            workspace.filter = workspace.filter.cycle_next();
        }
        KeyCode::Char('z') => app.cycle_validation_page_size().await,
        KeyCode::Char('b') => {
            app.validation_kind = match app.validation_kind {
                ValidationKind::Crawl => ValidationKind::Ingest,
                ValidationKind::Ingest => ValidationKind::Crawl,
            };
            app.validation_selected = 0;
        }
        KeyCode::Char('u') => app.open_input(InputContext::CheckUrl),
        KeyCode::Char('/') => app.open_input(InputContext::SearchQuery),
        KeyCode::Char('H') => {
            if let Err(e) = app.health.refresh(&app.client).await {
                app.report_error("health", &e);
            }
            let kind = app.validation_kind;
            app.refresh_validation(kind).await;
        }
        _ => {}
    }
    Ok(())
}
