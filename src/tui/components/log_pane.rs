use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use crate::jobs::LogChannel;
use crate::tui::app::App;

/// Render one channel's log pane, auto-scrolled to the bottom.
pub fn render(frame: &mut Frame, app: &App, channel: LogChannel, area: Rect) {
    let streaming = app.jobs.logs.is_open(channel);
    let job = app.jobs.logs.job_for(channel).unwrap_or("-");
    let title = format!(" {} log ({job}) ", channel.name());

    let border = if streaming {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border);

    let Some(pane) = app.jobs.pane(channel) else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let inner_height = area.height.saturating_sub(2) as usize;
    let total = pane.lines.len();
    let bottom_start = total.saturating_sub(inner_height);
    let start = bottom_start.saturating_sub(pane.scroll_from_bottom);

    let lines: Vec<Line<'_>> = pane
        .lines
        .iter()
        .skip(start)
        .take(inner_height)
        .map(|l| Line::raw(l.as_str()))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
