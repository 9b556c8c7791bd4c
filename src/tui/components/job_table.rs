use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::tui::app::App;

/// Render the job table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Jobs ")
        .title_bottom(" [c]rawl  [i]ngest  [Enter]view log  [o]export  [x]delete  [R]eset session ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.jobs.jobs.is_empty() {
        let empty = Line::from(vec![
            Span::raw("No jobs. Press "),
            Span::styled("c", Style::default().fg(Color::Green)),
            Span::raw(" to start a crawl or "),
            Span::styled("i", Style::default().fg(Color::Green)),
            Span::raw(" to start an ingest."),
        ]);
        frame.render_widget(Paragraph::new(empty).block(block), area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).split(inner);

    let header = Line::from(vec![
        Span::styled("  ", Style::default()),
        Span::styled(format!("{:24}", "Job"), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:8}", "Type"), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:10}", "Status"), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:22}", "Started"), Style::default().fg(Color::DarkGray)),
        Span::styled("Ended", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let items: Vec<ListItem<'_>> = app
        .jobs
        .jobs
        .iter()
        .map(|job| {
            let status_style = match job.status.as_str() {
                "running" | "queued" => Style::default().fg(Color::Yellow),
                "done" | "completed" => Style::default().fg(Color::Green),
                "error" | "failed" => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::DarkGray),
            };
            let current = app.jobs.current_crawl_job.as_deref() == Some(job.job_id.as_str())
                || app.jobs.current_ingest_job.as_deref() == Some(job.job_id.as_str());
            let marker = if current { "● " } else { "  " };

            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::styled(
                    format!("{:24}", job.job_id),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{:8}", job.job_type.label())),
                Span::styled(format!("{:10}", job.status), status_style),
                Span::raw(format!(
                    "{:22}",
                    job.started_at.as_deref().unwrap_or("-")
                )),
                Span::raw(job.ended_at.clone().unwrap_or_else(|| "-".to_owned())),
            ]))
        })
        .collect();

    let len = items.len();
    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(app.jobs_selected.min(len - 1)));
    }
    frame.render_stateful_widget(list, chunks[1], &mut state);
}
