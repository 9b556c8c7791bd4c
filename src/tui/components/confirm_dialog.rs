use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::tui::app::{App, DeleteTarget};

/// Render the delete/reset confirmation dialog.
///
/// Destructive resets demand the literal word `DELETE` typed in full;
/// ordinary row deletions confirm with `y`.
pub fn render(frame: &mut Frame, app: &App, target: &DeleteTarget, area: Rect) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let mut lines = vec![
        Line::from(Span::styled(
            target.describe(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];

    if target.requires_typed_delete() {
        lines.push(Line::from(vec![
            Span::raw("Type "),
            Span::styled("DELETE", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" and press Enter to confirm:"),
        ]));
        lines.push(Line::from(vec![
            Span::raw("> "),
            Span::styled(app.input.buffer.clone(), Style::default().fg(Color::Yellow)),
            Span::styled("▏", Style::default().fg(Color::DarkGray)),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Green)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().fg(Color::Cyan)),
            Span::raw(" cancel"),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
