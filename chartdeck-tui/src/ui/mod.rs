//! Ratatui rendering. Every `render_*` function draws one panel into the area it is given.

pub mod chart;
pub mod error;
pub mod kpi;
pub mod sidebar;

use crate::app::{App, Focus};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

pub(crate) const C_BG: Color = Color::Rgb(18, 18, 28);
pub(crate) const C_BORDER: Color = Color::Rgb(70, 70, 90);
pub(crate) const C_ACCENT: Color = Color::Rgb(100, 180, 220);
pub(crate) const C_TITLE: Color = Color::Rgb(255, 215, 0);
pub(crate) const C_DIM: Color = Color::Rgb(120, 120, 120);
pub(crate) const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
pub(crate) const C_UP: Color = Color::Rgb(100, 220, 100);
pub(crate) const C_DOWN: Color = Color::Rgb(220, 100, 100);
pub(crate) const C_NEUTRAL: Color = Color::Rgb(180, 180, 100);

/// Width of the settings sidebar in cells.
const SIDEBAR_WIDTH: u16 = 38;

/// Draw the whole dashboard and record KPI card positions on `app`.
pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    render_status_bar(f, rows[0], app);

    if app.fullscreen {
        chart::render_chart_panel(f, rows[1], app.chart(), app.settings(), true);
        app.set_card_hits(Vec::new());
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(rows[1]);

        sidebar::render_sidebar(f, columns[0], app.sidebar(), app.focus() == Focus::Sidebar);

        let content = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);

        chart::render_chart_panel(f, content[0], app.chart(), app.settings(), false);

        let hits = kpi::render_kpis(f, content[1], app);
        app.set_card_hits(hits);

        if app.show_kpi_settings {
            kpi::render_kpi_settings(f, content[1], app);
        }
    }

    render_help(f, rows[2], app);
    kpi::render_tooltip(f, app);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let view = app.chart();
    let (symbol, color, text) = if view.is_loading() {
        ("◌", C_NEUTRAL, "LOADING")
    } else if view.error().is_some() {
        ("○", C_DOWN, "ERROR")
    } else if view.displayed().is_some() {
        ("●", C_UP, "LIVE")
    } else {
        ("○", C_DIM, "IDLE")
    };

    let settings = app.settings();
    let mut spans = vec![
        Span::styled(
            format!(" {} {} ", symbol, text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " {} · {}d · {} ",
                settings.ticker(),
                settings.days_of_history(),
                settings.interval()
            ),
            Style::default().fg(C_BRIGHT),
        ),
        Span::styled(
            " ◆ CHARTDECK ◆ ",
            Style::default().fg(C_TITLE).add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(updated) = app.last_update {
        spans.push(Span::styled(
            format!(" ⏱  {} ", updated.format("%H:%M:%S")),
            Style::default().fg(C_ACCENT),
        ));
    }
    if let Some(timestamp) = view.kpis().and_then(|data| data.timestamp) {
        spans.push(Span::styled(
            format!(" as of {} ", timestamp.format("%Y-%m-%d %H:%M UTC")),
            Style::default().fg(C_DIM),
        ));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {} ", status), Style::default().fg(C_NEUTRAL)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(C_BORDER))
        .style(Style::default().bg(C_BG));

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let hints: &[(&str, &str)] = if app.sidebar().is_editing() {
        &[("Enter", "commit"), ("Esc", "cancel")]
    } else if app.show_kpi_settings {
        &[
            ("↑↓", "group"),
            ("Space", "show/hide"),
            ("e", "expand"),
            ("[ ]", "reorder"),
            ("v", "view"),
            ("Esc", "close"),
        ]
    } else {
        match app.focus() {
            Focus::Sidebar => &[
                ("Tab", "KPIs"),
                ("↑↓", "field"),
                ("Enter", "edit"),
                ("Space", "select"),
                ("p", "panel"),
                ("a", "apply"),
                ("d", "discard"),
                ("f", "full screen"),
                ("q", "quit"),
            ],
            Focus::Kpis => &[
                ("Tab", "settings"),
                ("←→", "card"),
                ("Enter", "details"),
                ("v", "view"),
                ("s", "groups"),
                ("f", "full screen"),
                ("q", "quit"),
            ],
        }
    };

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" [{}] ", key), Style::default().fg(C_ACCENT)),
                Span::styled(action.to_string(), Style::default().fg(C_DIM)),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Terminal cell rectangle as placement geometry.
pub fn to_geometry(area: Rect) -> chartdeck::Rect {
    chartdeck::Rect::new(
        area.y as f64,
        area.x as f64,
        area.width as f64,
        area.height as f64,
    )
}

/// Placement geometry snapped to terminal cells and clipped to `bounds`.
pub fn to_cells(rect: chartdeck::Rect, bounds: Rect) -> Rect {
    let x = rect.left.round().max(0.0) as u16;
    let y = rect.top.round().max(0.0) as u16;
    let width = rect.width.round().max(0.0) as u16;
    let height = rect.height.round().max(0.0) as u16;
    Rect::new(x, y, width, height).intersection(bounds)
}

/// A `width` x `height` rectangle centred in `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Greedy word wrap to at most `width` columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
