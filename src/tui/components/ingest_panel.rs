use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::tui::app::App;

/// Render the ingest progress pane and summary card.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Ingest ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(1), // headline
        Constraint::Length(1), // gauge
        Constraint::Length(1), // current artifact
        Constraint::Length(1), // errors + eta
        Constraint::Min(0),    // log tail / summary card
    ])
    .split(inner);

    let ingest = &app.ingest;

    let headline_style = if ingest.finished {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(ingest.headline(), headline_style))),
        chunks[0],
    );

    let percent = ingest.percent().unwrap_or(0);
    let gauge = Gauge::default()
        .ratio(f64::from(percent) / 100.0)
        .label(format!(
            "{} / {}",
            ingest.status.done_artifacts, ingest.status.total_artifacts
        ))
        .gauge_style(Style::default().fg(Color::Cyan));
    frame.render_widget(gauge, chunks[1]);

    let current = ingest
        .status
        .current_artifact
        .as_deref()
        .unwrap_or("-");
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("current: ", Style::default().fg(Color::DarkGray)),
            Span::raw(current.to_owned()),
        ])),
        chunks[2],
    );

    let sse_note = if ingest.sse_attached || !ingest.is_active() {
        String::new()
    } else {
        "  (events detached, polling)".to_owned()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("errors: {}", ingest.errors),
                if ingest.errors > 0 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            ),
            Span::raw("   "),
            Span::styled(
                format!("ETA: {}", ingest.eta_display().label()),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(sse_note, Style::default().fg(Color::DarkGray)),
        ])),
        chunks[3],
    );

    if let Some(summary) = &ingest.summary {
        let lines = vec![
            Line::from(Span::styled(
                "Summary",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "  processed: {} / {}",
                summary.done_artifacts, summary.total_artifacts
            )),
            Line::from(format!("  errors:    {}", app.ingest.errors)),
            Line::from(format!("  status:    {}", summary.status)),
        ];
        frame.render_widget(Paragraph::new(lines), chunks[4]);
    } else {
        let tail_height = chunks[4].height as usize;
        let start = app.ingest.log_lines.len().saturating_sub(tail_height);
        let lines: Vec<Line<'_>> = app.ingest.log_lines[start..]
            .iter()
            .map(|l| Line::raw(l.as_str()))
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[4]);
    }
}
