use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::app::{App, AppMode, Tab};
use super::components::{
    chat_view, config_panel, confirm_dialog, health_panel, ingest_panel, job_table, log_pane,
    sidebar, status_bar,
};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_tab_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    status_bar::render(frame, app, chunks[2]);

    match &app.mode {
        AppMode::Help => {
            let dialog_area = centered_rect(60, 70, frame.area());
            frame.render_widget(Clear, dialog_area);
            render_help(frame, dialog_area);
        }
        AppMode::ConfirmDelete(target) => {
            let dialog_area = centered_rect(50, 30, frame.area());
            confirm_dialog::render(frame, app, target, dialog_area);
        }
        AppMode::Normal | AppMode::Input(_) => {}
    }
}

fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " ragdeck ",
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    )];
    for tab in Tab::ALL {
        let style = if tab == app.tab {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("  {}  ", tab.title()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.tab {
        Tab::Chat => {
            let columns = Layout::horizontal([
                Constraint::Length(sidebar::columns_for(app)),
                Constraint::Min(0),
            ])
            .split(area);
            sidebar::render(frame, app, columns[0]);
            chat_view::render(frame, app, columns[1]);
        }
        Tab::Config => {
            if app.admin_unlocked {
                config_panel::render(frame, app, area);
            } else {
                render_locked(frame, area);
            }
        }
        Tab::Jobs => {
            if app.admin_unlocked {
                render_jobs_tab(frame, app, area);
            } else {
                render_locked(frame, area);
            }
        }
        Tab::Data => {
            if app.admin_unlocked {
                let columns =
                    Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                        .split(area);
                crate::tui::components::validation_panel::render(frame, app, columns[0]);
                health_panel::render(frame, app, columns[1]);
            } else {
                render_locked(frame, area);
            }
        }
    }
}

fn render_jobs_tab(frame: &mut Frame, app: &App, area: Rect) {
    let show_ingest = app.ingest.job_id.is_some();
    let constraints = if show_ingest {
        vec![
            Constraint::Percentage(35),
            Constraint::Min(0),
            Constraint::Length(10),
        ]
    } else {
        vec![Constraint::Percentage(35), Constraint::Min(0)]
    };
    let chunks = Layout::vertical(constraints).split(area);

    job_table::render(frame, app, chunks[0]);

    if let Some(summary) = &app.jobs.summary {
        let columns =
            Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)])
                .split(chunks[1]);
        log_pane::render(frame, app, app.log_view_channel, columns[0]);
        render_crawl_summary(frame, summary, columns[1]);
    } else {
        log_pane::render(frame, app, app.log_view_channel, chunks[1]);
    }

    if show_ingest {
        ingest_panel::render(frame, app, chunks[2]);
    }
}

fn render_crawl_summary(
    frame: &mut Frame,
    summary: &crate::core::summary::CrawlSummary,
    area: Rect,
) {
    let block = Block::default()
        .title(" Crawl summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let mut pill_spans = Vec::new();
    for (label, value) in summary.pills() {
        pill_spans.push(Span::styled(
            format!(" {label}: {value} "),
            Style::default().bg(Color::DarkGray),
        ));
        pill_spans.push(Span::raw(" "));
    }

    let mut lines = vec![Line::from(pill_spans), Line::default()];

    let skips = summary.skip_rows();
    if !skips.is_empty() {
        lines.push(Line::from(Span::styled(
            "Skipped",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (label, count) in skips {
            lines.push(Line::from(format!("  {label}: {count}")));
        }
    }

    let errors = summary.error_rows();
    if !errors.is_empty() {
        lines.push(Line::from(Span::styled(
            "Errors",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        for (label, count) in errors {
            lines.push(Line::from(format!("  {label}: {count}")));
        }
    }

    for detail in summary.error_details.iter().take(5) {
        let url = detail.url.as_deref().unwrap_or("?");
        let message = detail.message.as_deref().unwrap_or("");
        lines.push(Line::from(Span::styled(
            format!("  {url} {message}"),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn render_locked(frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "  Admin surface locked.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("  Press "),
            Span::styled("U", Style::default().fg(Color::Green)),
            Span::raw(" and enter the admin token to unlock."),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = "\
Global
  Tab        next tab (in Crawl Config: next section, w also works)
  U          unlock admin surface
  B  < >     sidebar collapse / resize
  ?          this help    q  quit    Esc  clear banner

Chat
  j/k Enter  pick + open conversation
  m          compose message    n  new conversation
  r          rename    e  export    x  delete

Crawl Config
  j/k        move    a  add row    x  delete row    s  save seeds/blocked
  e          edit pattern    h  toggle http    m  match mode
  1-5        toggle web/pdf/docx/xlsx/pptx    p  cycle auth profile
  Enter      accept recommendation    v  expand    P  purge cache
  t          test profile    g  migrate legacy auth settings

Jobs
  c          start crawl    i  start ingest    I  enqueue ingest job
  Enter      view log    o  export log    x  delete job    l  cycle pane
  R          reset admin session
  7/8/9/0    reset ingest / artifacts / qdrant / everything

Data
  arrows     move    space  select    A  select rendered    Q  quarantine
  V          run validation    b  crawl/ingest    L  expand lower section
  f          severity filter    z  page size    u  check URL    /  search
  H          refresh";

    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Helper to create a centered rect using a percentage of the available area.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
