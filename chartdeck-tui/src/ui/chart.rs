use super::{error::render_error, C_ACCENT, C_BORDER, C_DIM, C_NEUTRAL, C_TITLE};
use chartdeck::{fetch::Series, refresh::ChartView, Settings};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Chart, Clear, Dataset, GraphType, LegendPosition, Paragraph},
    Frame,
};

const SERIES_COLORS: [Color; 6] = [
    Color::Rgb(100, 180, 220),
    Color::Rgb(255, 165, 0),
    Color::Rgb(180, 120, 255),
    Color::Rgb(100, 220, 100),
    Color::Rgb(220, 100, 100),
    Color::Rgb(240, 230, 140),
];

/// Chart panel: the error view if the last fetch failed, otherwise the plot. While a refresh
/// is loading the previous chart is drawn dimmed.
pub fn render_chart_panel(
    f: &mut Frame,
    area: Rect,
    view: &ChartView,
    settings: &Settings,
    fullscreen: bool,
) {
    if fullscreen {
        f.render_widget(Clear, area);
    }

    if let Some(error) = view.error() {
        render_error(f, area, error);
        return;
    }

    let mut title = vec![Span::styled(
        format!(
            " {} · {} · {} ",
            settings.ticker(),
            settings.interval(),
            settings.chart_type()
        ),
        Style::default().fg(C_TITLE).add_modifier(Modifier::BOLD),
    )];
    if view.is_loading() {
        title.push(Span::styled(" ⟳ loading ", Style::default().fg(C_NEUTRAL)));
    }
    if fullscreen {
        title.push(Span::styled(" [f] exit full screen ", Style::default().fg(C_DIM)));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_type(if fullscreen {
            BorderType::Double
        } else {
            BorderType::Rounded
        })
        .border_style(Style::default().fg(C_BORDER));

    let Some(response) = view.displayed() else {
        let message = if view.is_loading() {
            "Loading chart..."
        } else {
            "No chart data"
        };
        let placeholder = Paragraph::new(Line::from(Span::styled(message, Style::default().fg(C_DIM))))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(placeholder, area);
        return;
    };

    let series = response.chart.series();
    if series.is_empty() {
        let placeholder = Paragraph::new(Line::from(Span::styled(
            "Chart has no numeric series",
            Style::default().fg(C_DIM),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let dimmed = view.is_showing_previous();
    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(index, series)| {
            let color = if dimmed {
                C_DIM
            } else {
                SERIES_COLORS[index % SERIES_COLORS.len()]
            };
            Dataset::default()
                .name(series.name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(&series.points)
        })
        .collect();

    let bounds = Bounds::of(&series);
    let chart = Chart::new(datasets)
        .block(block)
        .legend_position(Some(LegendPosition::TopLeft))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(C_DIM))
                .bounds([bounds.x_min, bounds.x_max])
                .labels(vec![
                    Span::raw(format!("{:.0}", bounds.x_min)),
                    Span::raw(format!("{:.0}", bounds.x_max)),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(C_DIM))
                .bounds([bounds.y_min, bounds.y_max])
                .labels(vec![
                    Span::styled(format!("{:.2}", bounds.y_min), Style::default().fg(C_ACCENT)),
                    Span::raw(format!("{:.2}", (bounds.y_min + bounds.y_max) / 2.0)),
                    Span::styled(format!("{:.2}", bounds.y_max), Style::default().fg(C_ACCENT)),
                ]),
        );

    f.render_widget(chart, area);
}

/// Axis bounds covering every point, padded so flat series stay visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn of(series: &[Series]) -> Self {
        let points = || series.iter().flat_map(|series| series.points.iter());

        let x_max = points().map(|(x, _)| *x).fold(0.0_f64, f64::max);
        let y_min = points().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
        let y_max = points().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

        let (y_min, y_max) = if !y_min.is_finite() || !y_max.is_finite() {
            (0.0, 1.0)
        } else if y_min == y_max {
            (y_min - 1.0, y_max + 1.0)
        } else {
            let pad = (y_max - y_min) * 0.05;
            (y_min - pad, y_max + pad)
        };

        Self {
            x_min: 0.0,
            x_max: x_max.max(1.0),
            y_min,
            y_max,
        }
    }
}
