use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::api::types::FindingDto;
use crate::core::validation::ValidationWorkspace;
use crate::tui::app::{App, ValidationKind};

/// Render the validation workspace for the active kind.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let workspace = app.validation();
    let kind_label = match app.validation_kind {
        ValidationKind::Crawl => "crawl",
        ValidationKind::Ingest => "ingest",
    };

    let block = Block::default()
        .title(format!(" Validation ({kind_label}) "))
        .title_bottom(" [V]run  [k]ind  [space]select  [A]ll  [Q]uarantine  [L]ower  [f]ilter  [z]page size ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line<'_>> = Vec::new();

    if let Some(summary) = &workspace.summary {
        let mut header = vec![Span::styled(
            "checked ",
            Style::default().fg(Color::DarkGray),
        )];
        header.push(Span::raw(
            summary.checked.map_or_else(|| "—".to_owned(), |n| n.to_string()),
        ));
        header.push(Span::styled("  passed ", Style::default().fg(Color::DarkGray)));
        header.push(Span::styled(
            summary.passed.map_or_else(|| "—".to_owned(), |n| n.to_string()),
            Style::default().fg(Color::Green),
        ));
        header.push(Span::styled("  failed ", Style::default().fg(Color::DarkGray)));
        header.push(Span::styled(
            summary.failed.map_or_else(|| "—".to_owned(), |n| n.to_string()),
            Style::default().fg(Color::Red),
        ));
        if let Some(last_run) = &summary.last_run {
            header.push(Span::styled(
                format!("  last run {last_run}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));
    } else {
        lines.push(Line::from(Span::styled(
            "No validation summary yet. Press V to run one.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::default());

    // Rendered rows carry a running index so the selection cursor and the
    // master toggle agree on what is visible.
    let mut row_index = 0usize;

    let high = workspace.high_priority();
    lines.push(Line::from(Span::styled(
        format!("High priority ({})", high.len()),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )));
    for finding in high {
        lines.push(finding_line(app, workspace, finding, row_index));
        row_index += 1;
    }
    lines.push(Line::default());

    let lower = workspace.lower_priority();
    let marker = if workspace.expanded { "▾" } else { "▸" };
    lines.push(Line::from(vec![
        Span::styled(
            format!("{marker} Lower priority ({})", lower.len()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "  filter: {}  page: {}",
                workspace.filter.display_name(),
                workspace.page_size
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    if workspace.expanded {
        let page = workspace.lower_page();
        for finding in &page.rows {
            lines.push(finding_line(app, workspace, finding, row_index));
            row_index += 1;
        }
        if let Some(label) = page.truncation_label() {
            lines.push(Line::from(Span::styled(
                format!("  {label}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn finding_line<'a>(
    app: &App,
    workspace: &ValidationWorkspace,
    finding: &'a FindingDto,
    row_index: usize,
) -> Line<'a> {
    let selected_cursor = app.validation_selected == row_index;
    let checked = workspace.selected.contains(&finding.id);
    let quarantined = workspace.quarantined.contains(&finding.id);

    let checkbox = if checked { "[x]" } else { "[ ]" };
    let cursor = if selected_cursor { "▶" } else { " " };

    let severity_span = match finding.severity {
        crate::api::types::Severity::High => {
            Span::styled("high  ", Style::default().fg(Color::Red))
        }
        crate::api::types::Severity::Medium => {
            Span::styled("medium", Style::default().fg(Color::Yellow))
        }
        crate::api::types::Severity::Low => {
            Span::styled("low   ", Style::default().fg(Color::Blue))
        }
        crate::api::types::Severity::Unknown => {
            Span::styled("?     ", Style::default().fg(Color::DarkGray))
        }
    };

    let label = finding
        .title
        .as_deref()
        .or(finding.url.as_deref())
        .unwrap_or(finding.id.as_str());

    let base = if quarantined {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::raw(format!("{cursor} {checkbox} ")),
        severity_span,
        Span::styled(format!(" {label}"), base),
        Span::styled(
            format!("  {}", finding.reason),
            base.fg(Color::DarkGray),
        ),
    ];
    if quarantined {
        spans.push(Span::styled(
            "  [Quarantined]",
            Style::default().fg(Color::Magenta),
        ));
    }
    Line::from(spans)
}
