use super::{C_ACCENT, C_BORDER, C_BRIGHT, C_DIM, C_DOWN, C_NEUTRAL, C_UP};
use crate::sidebar::{format_param, EditTarget, Field, Sidebar};
use chartdeck::indicator::CATALOG;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

const LABEL_WIDTH: usize = 9;

/// Settings form: one row per field, then the indicator catalog with parameters of the
/// highlighted indicator expanded below it.
pub fn render_sidebar(f: &mut Frame, area: Rect, sidebar: &Sidebar, focused: bool) {
    let draft = sidebar.draft();
    let settings = draft.draft();

    let mut title = vec![Span::styled(
        " Settings ",
        Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
    )];
    if draft.is_dirty() {
        title.push(Span::styled("• unsaved ", Style::default().fg(C_NEUTRAL)));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { C_ACCENT } else { C_BORDER }));

    let editing = |target: &EditTarget| {
        sidebar
            .input()
            .filter(|input| &input.target == target)
            .map(|input| format!("{}▏", input.buffer))
    };

    let mut lines = vec![
        field_line(
            sidebar,
            Field::Ticker,
            "Ticker",
            editing(&EditTarget::Ticker).unwrap_or_else(|| settings.ticker().to_string()),
        ),
        field_line(
            sidebar,
            Field::Days,
            "Days",
            editing(&EditTarget::Days).unwrap_or_else(|| settings.days_of_history().to_string()),
        ),
        field_line(sidebar, Field::Interval, "Interval", format!("◂ {} ▸", settings.interval())),
        field_line(sidebar, Field::ChartType, "Chart", format!("◂ {} ▸", settings.chart_type())),
        Line::from(""),
        Line::from(Span::styled(
            "Indicators",
            Style::default().fg(if sidebar.field() == Field::Indicators {
                C_ACCENT
            } else {
                C_DIM
            }),
        )),
    ];

    let in_catalog = focused && sidebar.field() == Field::Indicators;
    for (index, spec) in CATALOG.iter().enumerate() {
        let selected = settings.is_selected(spec.name);
        let under_cursor = in_catalog && index == sidebar.cursor();

        let marker = if under_cursor { "›" } else { " " };
        let check = if selected { "[x]" } else { "[ ]" };
        let name_style = if under_cursor {
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default().fg(C_UP)
        } else {
            Style::default().fg(C_DIM)
        };

        let mut spans = vec![
            Span::styled(format!("{} {} ", marker, check), Style::default().fg(C_ACCENT)),
            Span::styled(format!("{:<16}", spec.name), name_style),
        ];
        if selected {
            spans.push(Span::styled(
                settings.panel(spec.name).to_string(),
                Style::default().fg(C_NEUTRAL),
            ));
        }
        lines.push(Line::from(spans));

        if under_cursor && selected {
            for (param_index, &(param, _)) in spec.params.iter().enumerate() {
                let target = EditTarget::Param {
                    indicator: spec.name.into(),
                    param: param.into(),
                };
                let value = editing(&target).unwrap_or_else(|| {
                    sidebar
                        .param_value(spec.name, param)
                        .map(format_param)
                        .unwrap_or_default()
                });
                let style = if param_index == sidebar.param_cursor() {
                    Style::default().fg(C_BRIGHT).add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default().fg(C_DIM)
                };
                lines.push(Line::from(vec![
                    Span::raw("      "),
                    Span::styled(format!("{} = {}", param, value), style),
                ]));
            }
        }
    }

    if let Some(message) = sidebar.message() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(message.to_string(), Style::default().fg(C_DOWN))));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_line<'a>(sidebar: &Sidebar, field: Field, label: &'a str, value: String) -> Line<'a> {
    let active = sidebar.field() == field;
    Line::from(vec![
        Span::styled(
            format!("{} {:<width$}", if active { "›" } else { " " }, label, width = LABEL_WIDTH),
            Style::default().fg(if active { C_ACCENT } else { C_DIM }),
        ),
        Span::styled(
            value,
            Style::default().fg(C_BRIGHT).add_modifier(if active {
                Modifier::BOLD
            } else {
                Modifier::empty()
            }),
        ),
    ])
}
