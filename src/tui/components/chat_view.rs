use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::api::types::MessageContent;
use crate::tui::app::App;
use crate::tui::components::SPINNER_FRAMES;

/// Render the chat transcript and any streaming shell.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .chat
        .current
        .as_ref()
        .map_or_else(|| " Chat ".to_owned(), |c| format!(" {} ", c.title));

    let block = Block::default()
        .title(title)
        .title_bottom(" [m]essage  [n]ew  [r]ename  [e]xport  [x]delete ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line<'_>> = Vec::new();

    if let Some(banner) = &app.chat.banner {
        lines.push(Line::from(Span::styled(
            format!("⚠ {banner}"),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::default());
    }

    if let Some(convo) = &app.chat.current {
        for message in &convo.messages {
            render_message(&mut lines, &message.role, &message.content);
        }
    } else {
        lines.push(Line::from(Span::styled(
            "Press m to send a message; a conversation starts automatically.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    if let Some(shell) = &app.chat.shell {
        lines.push(Line::from(Span::styled(
            "assistant",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        if let Some(status) = &shell.status {
            let spinner = SPINNER_FRAMES[app.spinner_tick % SPINNER_FRAMES.len()];
            lines.push(Line::from(Span::styled(
                format!("{spinner} {status}"),
                Style::default().fg(Color::Yellow),
            )));
        }
        lines.extend(markdown_lines(&shell.content));
        lines.push(Line::default());
    }

    // Pin to the bottom unless the user scrolled up
    let inner_height = area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let bottom_start = total.saturating_sub(inner_height);
    let offset = bottom_start.saturating_sub(app.chat_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, area);
}

fn render_message(lines: &mut Vec<Line<'_>>, role: &str, content: &MessageContent) {
    let (label, color) = if role == "user" {
        ("you", Color::Cyan)
    } else {
        ("assistant", Color::Magenta)
    };
    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));

    match content {
        MessageContent::Text(text) => lines.extend(markdown_lines(text)),
        MessageContent::Rich(rich) => {
            lines.extend(markdown_lines(rich.text.as_deref().unwrap_or("")));
            if !rich.citations.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("[{} citations]", rich.citations.len()),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            if !rich.sources.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("[{} sources]", rich.sources.len()),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
    lines.push(Line::default());
}

/// Best-effort markdown styling: headings, bullets, and code fences get a
/// visual treatment; everything else renders as plain line-broken text.
fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw in text.lines() {
        if raw.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            lines.push(Line::from(Span::styled(
                raw.to_owned(),
                Style::default().fg(Color::DarkGray),
            )));
            continue;
        }
        if in_code_block {
            lines.push(Line::from(Span::styled(
                raw.to_owned(),
                Style::default().fg(Color::Green),
            )));
        } else if raw.starts_with('#') {
            lines.push(Line::from(Span::styled(
                raw.trim_start_matches('#').trim_start().to_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
        } else if raw.trim_start().starts_with("- ") || raw.trim_start().starts_with("* ") {
            lines.push(Line::from(vec![
                Span::styled("  • ", Style::default().fg(Color::Cyan)),
                Span::raw(raw.trim_start()[2..].to_owned()),
            ]));
        } else {
            lines.push(Line::from(Span::raw(raw.to_owned())));
        }
    }
    if text.ends_with('\n') || lines.is_empty() {
        lines.push(Line::default());
    }
    lines
}
