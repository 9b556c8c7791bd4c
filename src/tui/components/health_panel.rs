use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::health::{CardTone, check_url_tiles};
use crate::tui::app::App;

/// Render the health cards, the check-url tiles, and search results.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Pipeline health ")
        .title_bottom(" [u]check url  [/]search  [H]refresh ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(7), // card grid
        Constraint::Min(0),    // check-url / search results
    ])
    .split(inner);

    render_cards(frame, app, chunks[0]);
    render_lookups(frame, app, chunks[1]);
}

fn tone_color(tone: CardTone) -> Color {
    match tone {
        CardTone::Ok => Color::Green,
        CardTone::Warn => Color::Yellow,
        CardTone::Bad => Color::Red,
        CardTone::Unknown => Color::DarkGray,
    }
}

fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let cards = app.health.cards();
    let columns = Layout::horizontal(vec![
        Constraint::Ratio(1, u32::try_from(cards.len()).unwrap_or(1));
        cards.len()
    ])
    .split(area);

    for (card, column) in cards.iter().zip(columns.iter()) {
        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", card.title),
                Style::default().fg(tone_color(card.tone)).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(tone_color(card.tone)));

        let lines: Vec<Line<'_>> = card
            .rows
            .iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
                    Span::raw(value.clone()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), *column);
    }
}

fn render_lookups(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line<'_>> = Vec::new();

    if let (Some(url), Some(report)) = (&app.health.checked_url, &app.health.check_report) {
        lines.push(Line::from(Span::styled(
            format!("Check URL: {url}"),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (name, present, detail) in check_url_tiles(report) {
            let marker = if present {
                Span::styled("●", Style::default().fg(Color::Green))
            } else {
                Span::styled("○", Style::default().fg(Color::DarkGray))
            };
            lines.push(Line::from(vec![
                Span::raw("  "),
                marker,
                Span::raw(format!(" {name:12}")),
                Span::styled(detail, Style::default().fg(Color::DarkGray)),
            ]));
        }
        lines.push(Line::default());
    }

    if let (Some(query), Some(results)) = (&app.health.search_query, &app.health.search_results) {
        lines.push(Line::from(Span::styled(
            format!("Search: {query}"),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("  artifacts ({})", results.artifacts.len()),
            Style::default().fg(Color::Cyan),
        )));
        for hit in &results.artifacts {
            lines.push(hit_line(hit));
        }
        lines.push(Line::from(Span::styled(
            format!("  qdrant ({})", results.qdrant_matches.len()),
            Style::default().fg(Color::Cyan),
        )));
        for hit in &results.qdrant_matches {
            lines.push(hit_line(hit));
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Press u to look a URL up across the pipeline, or / to search.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

/// One search hit. Values are rendered as inert text spans: user-provided
/// strings never become markup.
fn hit_line(hit: &serde_json::Value) -> Line<'static> {
    let label = hit
        .get("title")
        .or_else(|| hit.get("url"))
        .or_else(|| hit.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or("(unlabeled)");
    let score = hit
        .get("score")
        .and_then(serde_json::Value::as_f64)
        .map(|s| format!("  {s:.3}"))
        .unwrap_or_default();
    Line::from(vec![
        Span::raw(format!("    {label}")),
        Span::styled(score, Style::default().fg(Color::DarkGray)),
    ])
}
