//! UI Rendering Module
//!
//! Handles drawing the TUI interface using ratatui.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use agentic_sim_core::logger::{self, Level};
use agentic_sim_core::view::{SceneView, Tone};
use agentic_sim_core::SimKind;

use crate::tui::app::App;

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Neutral => Style::default().fg(Color::White),
        Tone::Active => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Tone::Success => Style::default().fg(Color::Green),
        Tone::Muted => Style::default().fg(Color::DarkGray),
        Tone::Warning => Style::default().fg(Color::Yellow),
        Tone::Danger => Style::default().fg(Color::Red),
    }
}

/// Draw the complete UI
pub fn draw_ui(f: &mut Frame, app: &App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(size);

    draw_tabs(f, app, chunks[0]);

    let scene = app.scene();
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    draw_scene_panel(f, &scene, body[0]);
    draw_log_panel(f, &scene, body[1]);

    draw_status_line(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = SimKind::ALL
        .iter()
        .map(|kind| {
            let marker = if app.is_running(*kind) { " *" } else { "" };
            Line::from(format!("{}{}", kind.title(), marker))
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" agentic-sim "))
        .select(app.selected_index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn draw_scene_panel(f: &mut Frame, scene: &SceneView, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", scene.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(scene.status.clone(), tone_style(scene.status_tone).add_modifier(Modifier::BOLD))),
        Line::from(""),
    ];

    for badge in &scene.badges {
        let bullet = match badge.tone {
            Tone::Success => "✓",
            Tone::Active | Tone::Warning => "●",
            Tone::Danger => "✗",
            Tone::Neutral | Tone::Muted => "○",
        };
        lines.push(Line::from(Span::styled(
            format!(" {} {}", bullet, badge.label),
            tone_style(badge.tone),
        )));
    }

    if !scene.detail.is_empty() {
        lines.push(Line::from(""));
        for detail in &scene.detail {
            lines.push(Line::from(Span::styled(detail.clone(), Style::default().fg(Color::Gray))));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_log_panel(f: &mut Frame, scene: &SceneView, area: Rect) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    // Keep the newest lines in view
    let visible = area.height.saturating_sub(2) as usize;
    let start = scene.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = scene.logs[start..]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(Color::Green))))
        .collect();

    let paragraph = Paragraph::new(Text::from(lines)).block(block);
    f.render_widget(paragraph, area);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let (status_text, status_style) = if let Some(notice) = &app.notice {
        (notice.clone(), Style::default().fg(Color::Red))
    } else if app.selected() == SimKind::Governance && app.awaiting_decision() {
        ("Approve refund? (y/n)".to_string(), Style::default().fg(Color::Yellow))
    } else {
        (
            "Tab/←→ switch | Enter start | r reset | y/n decide | q quit".to_string(),
            Style::default().fg(Color::Gray),
        )
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let status_line = Paragraph::new(status_text)
        .style(status_style)
        .alignment(Alignment::Left);
    f.render_widget(status_line, chunks[0]);

    // Most recent debug log entry worth showing
    if let Some(entry) = logger::latest_at_least(Level::Info) {
        let style = match entry.level {
            Level::Warn | Level::Error => Style::default().fg(Color::Yellow),
            Level::Debug | Level::Info => Style::default().fg(Color::DarkGray),
        };
        let latest = Paragraph::new(entry.message)
            .style(style)
            .alignment(Alignment::Right);
        f.render_widget(latest, chunks[1]);
    }
}
