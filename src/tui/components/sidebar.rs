use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use crate::tui::app::App;
use crate::tui::preferences::{SIDEBAR_MAX_WIDTH, SIDEBAR_MIN_WIDTH};

/// Width in terminal columns when collapsed.
pub const COLLAPSED_COLUMNS: u16 = 4;

/// Project the persisted pixel-range width onto terminal columns.
///
/// The stored preference keeps its [240, 520] range so it round-trips with
/// other frontends; the TUI maps it linearly onto 24–52 columns.
#[must_use]
pub fn columns_for(app: &App) -> u16 {
    if app.prefs.prefs.sidebar.collapsed {
        return COLLAPSED_COLUMNS;
    }
    let width = app.prefs.prefs.sidebar_width();
    // 240..=520 → 24..=52
    (width / 10).clamp(SIDEBAR_MIN_WIDTH / 10, SIDEBAR_MAX_WIDTH / 10)
}

/// Render the conversation sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Conversations ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if app.prefs.prefs.sidebar.collapsed {
        let paragraph = Paragraph::new("»").block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    if app.chat.conversations.is_empty() {
        let empty = Line::from(vec![
            Span::raw("No conversations. Press "),
            Span::styled("n", Style::default().fg(Color::Green)),
            Span::raw(" to start one."),
        ]);
        frame.render_widget(Paragraph::new(empty).block(block), area);
        return;
    }

    let items: Vec<ListItem<'_>> = app
        .chat
        .conversations
        .iter()
        .map(|convo| {
            let current = app
                .chat
                .current
                .as_ref()
                .is_some_and(|c| c.id == convo.id);
            let marker = if current { "● " } else { "  " };
            let title = if convo.title.trim().is_empty() {
                crate::chat::UNTITLED
            } else {
                convo.title.as_str()
            };
            let max_title = usize::from(area.width.saturating_sub(6));
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::raw(truncate_to_width(title, max_title)),
            ];
            if let Some(updated) = &convo.updated_at {
                spans.push(Span::styled(
                    format!("  {updated}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(Some(app.sidebar_selected.min(
        app.chat.conversations.len().saturating_sub(1),
    )));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Cut a string to a display width, appending an ellipsis when truncated.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|ch| ch.width().unwrap_or(0)).sum();
    if total <= max_width {
        return text.to_owned();
    }
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}
