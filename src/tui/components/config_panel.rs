use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::core::rules::MatchMode;
use crate::core::store::{AuthIcon, CrawlConfigStore, RowStatus};
use crate::tui::app::{App, ConfigSection};
use crate::tui::components::SPINNER_FRAMES;

/// Render the crawl configuration editor.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut constraints = vec![Constraint::Length(1)];
    if app.config.shows_legacy_banner() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    let chunks = Layout::vertical(constraints).split(area);

    render_section_tabs(frame, app, chunks[0]);
    let mut body_idx = 1;
    if app.config.shows_legacy_banner() {
        render_legacy_banner(frame, chunks[1]);
        body_idx = 2;
    }

    match app.config_section {
        ConfigSection::Seeds => render_seeds(frame, app, chunks[body_idx]),
        ConfigSection::Blocked => render_blocked(frame, app, chunks[body_idx]),
        ConfigSection::AllowRules => render_allow_rules(frame, app, chunks[body_idx]),
        ConfigSection::Recommendations => render_recommendations(frame, app, chunks[body_idx]),
        ConfigSection::Profiles => render_profiles(frame, app, chunks[body_idx]),
    }
}

fn render_section_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for section in [
        ConfigSection::Seeds,
        ConfigSection::Blocked,
        ConfigSection::AllowRules,
        ConfigSection::Recommendations,
        ConfigSection::Profiles,
    ] {
        let style = if section == app.config_section {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", section.title()), style));
        spans.push(Span::raw("│"));
    }
    spans.pop();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_legacy_banner(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled("⚠ ", Style::default().fg(Color::Yellow)),
        Span::raw("Legacy auth settings detected - press "),
        Span::styled("g", Style::default().fg(Color::Green)),
        Span::raw(" to migrate them to a named profile"),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        area,
    );
}

fn selected_list_state(app: &App, len: usize) -> ListState {
    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(app.config_row.min(len - 1)));
    }
    state
}

fn render_seeds(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Seeds ")
        .title_bottom(" [a]dd  [x]delete  [s]ave all ")
        .borders(Borders::ALL);

    let order = CrawlConfigStore::display_order(&app.config.seeds, |s| s.url.as_str());
    let items: Vec<ListItem<'_>> = order
        .iter()
        .map(|&i| {
            let seed = &app.config.seeds[i];
            let http_flag = if seed.allow_http {
                Span::styled(" http-ok", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("")
            };
            ListItem::new(Line::from(vec![Span::raw(seed.url.clone()), http_flag]))
        })
        .collect();

    let len = items.len();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = selected_list_state(app, len);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_blocked(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Blocked domains ")
        .title_bottom(" [a]dd  [x]delete  [s]ave all ")
        .borders(Borders::ALL);

    let order = CrawlConfigStore::display_order(&app.config.blocked, |d| d.as_str());
    let items: Vec<ListItem<'_>> = order
        .iter()
        .map(|&i| ListItem::new(Line::from(Span::raw(app.config.blocked[i].clone()))))
        .collect();

    let len = items.len();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = selected_list_state(app, len);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_allow_rules(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Allow rules ")
        .title_bottom(" [a]dd  [e]dit  [x]delete  [h]ttp toggle  [t]ypes  [p]rofile ")
        .borders(Borders::ALL);

    let order = CrawlConfigStore::display_order(&app.config.allow_rules, |r| r.pattern.as_str());
    let items: Vec<ListItem<'_>> = order
        .iter()
        .map(|&i| {
            let rule = &app.config.allow_rules[i];
            let key = CrawlConfigStore::rule_key(rule);

            let icon = app.config.auth_icon(rule);
            let icon_span = match icon {
                AuthIcon::Valid => Span::styled("✓", Style::default().fg(Color::Green)),
                AuthIcon::Invalid => Span::styled("✗", Style::default().fg(Color::Red)),
                AuthIcon::CannotTest => Span::styled("⚠", Style::default().fg(Color::Yellow)),
                AuthIcon::NeedsProfile => Span::styled("🔒", Style::default().fg(Color::Yellow)),
                AuthIcon::Pending => Span::styled("⏳", Style::default().fg(Color::DarkGray)),
                AuthIcon::NotApplicable => Span::styled("—", Style::default().fg(Color::DarkGray)),
            };

            let match_label = match rule.match_mode {
                MatchMode::Prefix => "prefix",
                MatchMode::Exact => "exact ",
            };

            let mut types = String::new();
            for (flag, label) in [
                (rule.types.web, "web"),
                (rule.types.pdf, "pdf"),
                (rule.types.docx, "docx"),
                (rule.types.xlsx, "xlsx"),
                (rule.types.pptx, "pptx"),
            ] {
                if flag {
                    if !types.is_empty() {
                        types.push(',');
                    }
                    types.push_str(label);
                }
            }

            let status_span = match app.config.row_status(&key) {
                Some(RowStatus::Saving) => {
                    let spinner = SPINNER_FRAMES[app.spinner_tick % SPINNER_FRAMES.len()];
                    Span::styled(format!(" {spinner}"), Style::default().fg(Color::Yellow))
                }
                Some(RowStatus::Saved) => Span::styled(" ✓", Style::default().fg(Color::Green)),
                Some(RowStatus::Error(detail)) => Span::styled(
                    format!(" ✗ {detail}"),
                    Style::default().fg(Color::Red),
                ),
                None => Span::raw(""),
            };

            let profile = rule.auth_profile.as_deref().unwrap_or("-");
            let http = if rule.allow_http { "http" } else { "    " };

            ListItem::new(Line::from(vec![
                icon_span,
                Span::raw(" "),
                Span::styled(format!("{:42}", rule.pattern), Style::default()),
                Span::styled(format!("{match_label} "), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{types:20} "), Style::default().fg(Color::Blue)),
                Span::styled(format!("{http} "), Style::default().fg(Color::Yellow)),
                Span::styled(format!("{profile:12}"), Style::default().fg(Color::Magenta)),
                status_span,
            ]))
        })
        .collect();

    let len = items.len();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = selected_list_state(app, len);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_recommendations(frame: &mut Frame, app: &App, area: Rect) {
    let (visible, hidden) = app.config.visible_recommendations();
    let expand_hint = if hidden > 0 {
        format!(" [v] show {hidden} more ")
    } else if app.config.recommendations_expanded {
        " [v] collapse ".to_owned()
    } else {
        String::new()
    };

    let block = Block::default()
        .title(" Recommendations ")
        .title_bottom(format!(" [Enter] accept {expand_hint} [P]urge cache "))
        .borders(Borders::ALL);

    if visible.is_empty() {
        let empty = Paragraph::new("No uncovered candidates.").block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem<'_>> = visible
        .iter()
        .map(|rec| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:50}", rec.suggested_url)),
                Span::styled(
                    format!("seen {:4}", rec.count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let len = items.len();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = selected_list_state(app, len);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_profiles(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Auth profiles ")
        .title_bottom(" [a]dd  [x]delete  [t]est ")
        .borders(Borders::ALL);

    let profiles = &app.config.crawler.playwright.auth_profiles;
    if profiles.is_empty() {
        let empty = Paragraph::new("No auth profiles configured.").block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem<'_>> = profiles
        .iter()
        .map(|(name, profile)| {
            let status = app.config.profile_status.get(name);
            let verdict = match status {
                Some(s) if s.ok => Span::styled("✓", Style::default().fg(Color::Green)),
                Some(s) => Span::styled(
                    format!("✗ {}", s.error_reason.as_deref().unwrap_or("failed")),
                    Style::default().fg(Color::Red),
                ),
                None => Span::styled("—", Style::default().fg(Color::DarkGray)),
            };
            let checked = status
                .and_then(|s| s.checked_at.as_deref())
                .unwrap_or("never");
            ListItem::new(Line::from(vec![
                Span::styled(format!("{name:20}"), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("{:40}", profile.storage_state_path)),
                verdict,
                Span::styled(format!("  checked {checked}"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let len = items.len();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = selected_list_state(app, len);
    frame.render_stateful_widget(list, area, &mut state);
}
