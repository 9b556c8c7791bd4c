use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::tui::app::{App, AppMode};

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.mode {
        AppMode::Input(context) => render_input_line(app, context.prompt()),
        _ => render_normal_status(app),
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_input_line(app: &App, prompt: &str) -> Line<'static> {
    let (before, after) =
        crate::tui::text_input::split_at_char_boundary(&app.input.buffer, app.input.cursor);
    Line::from(vec![
        Span::raw(" "),
        Span::styled(format!("{prompt}: "), Style::default().fg(Color::Cyan)),
        Span::raw(before.to_owned()),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::raw(after.to_owned()),
    ])
}

fn render_normal_status(app: &App) -> Line<'static> {
    let lock_indicator = if app.admin_unlocked {
        Span::styled("●", Style::default().fg(Color::Green))
    } else {
        Span::styled("●", Style::default().fg(Color::Red))
    };
    let lock_text = if app.admin_unlocked {
        " admin"
    } else {
        " locked (press U to unlock)"
    };

    let status_text = app
        .banner
        .clone()
        .or_else(|| app.status_message.clone())
        .or_else(|| app.chat.status_message().map(ToOwned::to_owned))
        .unwrap_or_default();

    let status_style = if app.banner.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(" "),
        lock_indicator,
        Span::raw(lock_text),
        Span::raw(" │ "),
        Span::styled(status_text, status_style),
    ])
}
