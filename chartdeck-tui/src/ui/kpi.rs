//! KPI cards, groups, the group settings popup and the card tooltip.

use super::{
    centered, to_cells, to_geometry, wrap_text, C_ACCENT, C_BG, C_BORDER, C_BRIGHT, C_DIM, C_DOWN,
    C_NEUTRAL, C_UP,
};
use crate::app::{close_button, App, CardHit, Focus};
use chartdeck::{
    kpi::{group_kpis, KpiGroupView, KpiRecord, Tone},
    preferences::ActiveView,
    tooltip::{AnchorId, TooltipPhase},
    Size,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

pub const CARD_WIDTH: u16 = 24;
pub const TOOLTIP_MAX_WIDTH: u16 = 40;

fn card_height(view: ActiveView) -> u16 {
    match view {
        ActiveView::Compact => 3,
        ActiveView::Detailed => 5,
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Positive => C_UP,
        Tone::Negative => C_DOWN,
        Tone::Neutral => C_BRIGHT,
    }
}

/// One positioned element of the KPI dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<'a> {
    Header {
        area: Rect,
        name: &'a str,
        count: usize,
        expanded: bool,
    },
    Card {
        area: Rect,
        anchor: AnchorId,
        record: &'a KpiRecord,
    },
}

/// Lay groups out top to bottom: a one line header per group, then its cards in rows of as many
/// as fit. Collapsed groups only get the header. Elements scrolled above `scroll` or cut off at
/// the bottom are left out; anchors number every expanded card whether on screen or not.
pub fn layout_groups<'a>(
    area: Rect,
    groups: &'a [KpiGroupView<'a>],
    view: ActiveView,
    scroll: u16,
) -> Vec<Slot<'a>> {
    let per_row = (area.width / CARD_WIDTH).max(1) as usize;
    let height = card_height(view);
    let visible = |y: u16, h: u16| y >= scroll && y - scroll + h <= area.height;

    let mut slots = Vec::new();
    let mut y: u16 = 0;
    let mut anchor = 0;

    for group in groups {
        if visible(y, 1) {
            slots.push(Slot::Header {
                area: Rect::new(area.x, area.y + y - scroll, area.width, 1),
                name: group.name.as_str(),
                count: group.kpis.len(),
                expanded: group.expanded,
            });
        }
        y = y.saturating_add(1);

        if !group.expanded {
            continue;
        }

        for (index, &record) in group.kpis.iter().enumerate() {
            let row = (index / per_row) as u16;
            let column = (index % per_row) as u16;
            let card_y = y.saturating_add(row * height);
            if visible(card_y, height) {
                slots.push(Slot::Card {
                    area: Rect::new(
                        area.x + column * CARD_WIDTH,
                        area.y + card_y - scroll,
                        CARD_WIDTH.min(area.width),
                        height,
                    ),
                    anchor: AnchorId(anchor),
                    record,
                });
            }
            anchor += 1;
        }

        let rows = group.kpis.len().div_ceil(per_row) as u16;
        y = y.saturating_add(rows * height);
    }

    slots
}

/// KPI dashboard. Returns where each on-screen card was drawn.
pub fn render_kpis(f: &mut Frame, area: Rect, app: &App) -> Vec<CardHit> {
    let focused = app.focus() == Focus::Kpis;
    let view = app.prefs().active_view;

    let block = Block::default()
        .title(Line::from(vec![
            Span::styled(" KPIs ", Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)),
            Span::styled(format!("· {} ", view), Style::default().fg(C_DIM)),
        ]))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { C_ACCENT } else { C_BORDER }));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(data) = app.chart().kpis() else {
        let message = if app.chart().is_loading() {
            "Loading KPIs..."
        } else {
            "No KPI data"
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, Style::default().fg(C_DIM))),
            inner,
        );
        return Vec::new();
    };

    let groups = group_kpis(&data.kpis, app.prefs());
    let mut hits = Vec::new();

    for slot in layout_groups(inner, &groups, view, app.kpi_scroll) {
        match slot {
            Slot::Header {
                area,
                name,
                count,
                expanded,
            } => {
                let line = Line::from(vec![
                    Span::styled(
                        if expanded { "▾ " } else { "▸ " },
                        Style::default().fg(C_ACCENT),
                    ),
                    Span::styled(
                        name.to_uppercase(),
                        Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" ({})", count), Style::default().fg(C_DIM)),
                ]);
                f.render_widget(Paragraph::new(line), area);
            }
            Slot::Card {
                area,
                anchor,
                record,
            } => {
                let selected = focused && anchor.0 == app.selected_card;
                let open = app.tooltip().anchor() == Some(anchor);
                render_card(f, area, record, view, selected || open);
                hits.push(CardHit {
                    anchor,
                    rect: to_geometry(area),
                });
            }
        }
    }

    hits
}

/// A single KPI card.
pub fn render_card(f: &mut Frame, area: Rect, record: &KpiRecord, view: ActiveView, highlight: bool) {
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", record.name),
            Style::default().fg(if highlight { C_ACCENT } else { C_DIM }),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if highlight { C_ACCENT } else { C_BORDER }));

    let mut value = vec![Span::styled(
        record.value.display(),
        Style::default()
            .fg(tone_color(record.value.tone()))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(trend) = record.trend {
        value.push(Span::styled(
            format!(" {}", trend.arrow()),
            Style::default().fg(tone_color(trend.tone())),
        ));
    }

    let mut lines = vec![Line::from(value)];
    if view == ActiveView::Detailed {
        lines.push(Line::from(Span::styled(
            record.trend_label.clone().unwrap_or_default(),
            Style::default().fg(C_DIM),
        )));
        lines.push(Line::from(Span::styled(
            record.secondary().unwrap_or_default(),
            Style::default().fg(C_NEUTRAL),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Group visibility/expansion/order popup over the KPI area.
pub fn render_kpi_settings(f: &mut Frame, area: Rect, app: &App) {
    let groups = app.ordered_groups();
    let prefs = app.prefs();

    let height = (groups.len() as u16).saturating_add(4);
    let popup = centered(area, 36, height);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(
            " KPI groups ",
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(C_ACCENT))
        .style(Style::default().bg(C_BG));

    let mut lines: Vec<Line> = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let cursor = index == app.settings_cursor;
            Line::from(vec![
                Span::styled(if cursor { "› " } else { "  " }, Style::default().fg(C_ACCENT)),
                Span::styled(
                    if prefs.is_visible(group) { "[x] " } else { "[ ] " },
                    Style::default().fg(C_ACCENT),
                ),
                Span::styled(
                    if prefs.is_expanded(group) { "▾ " } else { "▸ " },
                    Style::default().fg(C_DIM),
                ),
                Span::styled(
                    group.to_string(),
                    if cursor {
                        Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(C_DIM)
                    },
                ),
            ])
        })
        .collect();

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("view: ", Style::default().fg(C_DIM)),
        Span::styled(prefs.active_view.to_string(), Style::default().fg(C_NEUTRAL)),
    ]));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Tooltip body lines for `record`, wrapped to `width` columns.
pub fn tooltip_lines(record: &KpiRecord, width: usize) -> Vec<Line<'static>> {
    let mut value = vec![Span::styled(
        record.value.display(),
        Style::default()
            .fg(tone_color(record.value.tone()))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(trend) = record.trend {
        value.push(Span::styled(
            format!(" {}", trend.arrow()),
            Style::default().fg(tone_color(trend.tone())),
        ));
    }

    let mut lines = vec![Line::from(value)];
    if let Some(label) = &record.trend_label {
        lines.extend(
            wrap_text(label, width)
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().fg(C_DIM)))),
        );
    }
    if let Some(secondary) = record.secondary() {
        lines.extend(
            wrap_text(&secondary, width)
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().fg(C_NEUTRAL)))),
        );
    }
    if let Some(description) = &record.description {
        lines.push(Line::from(""));
        lines.extend(
            wrap_text(description, width)
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().fg(C_BRIGHT)))),
        );
    }
    lines
}

/// Outer size of the tooltip for `record` in a `viewport` sized terminal.
pub fn tooltip_size(record: &KpiRecord, viewport: Rect) -> (Size, Vec<Line<'static>>) {
    let max_width = TOOLTIP_MAX_WIDTH.min(viewport.width.saturating_sub(2)).max(8);
    let inner_width = (max_width - 2) as usize;

    let lines = tooltip_lines(record, inner_width);
    let title_width = record.name.chars().count() + 6;
    let content_width = lines
        .iter()
        .map(|line| line.width())
        .chain(std::iter::once(title_width))
        .max()
        .unwrap_or(0)
        .min(inner_width);

    let size = Size::new((content_width + 2) as f64, (lines.len() + 2) as f64);
    (size, lines)
}

/// Draw the tooltip on top of everything. The first frame after opening measures it and computes
/// the position, so it appears in the same frame. Later frames re-measure when the size changes.
pub fn render_tooltip(f: &mut Frame, app: &mut App) {
    let screen = f.area();
    let Some((size, lines, name)) = app
        .tooltip()
        .content()
        .map(|record| {
            let (size, lines) = tooltip_size(record, screen);
            (size, lines, record.name.clone())
        })
    else {
        return;
    };

    // Content wraps to the terminal width, so a resize can change the size
    if app.tooltip().phase() == TooltipPhase::Positioning || app.tooltip().size() != Some(size) {
        let viewport = Size::new(screen.width as f64, screen.height as f64);
        app.tooltip.measure(size, viewport);
    }

    let Some(rect) = app.tooltip().rect() else {
        return;
    };
    let area = to_cells(rect, screen);
    if area.width < 4 || area.height < 3 {
        return;
    }

    let close = to_cells(close_button(rect), screen);
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", name),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(C_ACCENT))
        .style(Style::default().bg(C_BG));

    f.render_widget(Paragraph::new(lines).block(block), area);
    f.render_widget(
        Paragraph::new(Span::styled("[x]", Style::default().fg(C_DOWN))),
        close,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdeck::kpi::{KpiValue, Trend};
    use smol_str::SmolStr;

    fn record(name: &str, group: &str) -> KpiRecord {
        KpiRecord {
            name: name.to_string(),
            value: KpiValue::Number(1.0),
            description: None,
            trend: None,
            trend_label: None,
            secondary_value: None,
            secondary_label: None,
            group: SmolStr::new(group),
        }
    }

    fn group<'a>(name: &str, kpis: &'a [KpiRecord], expanded: bool) -> KpiGroupView<'a> {
        KpiGroupView {
            name: SmolStr::new(name),
            kpis: kpis.iter().collect(),
            expanded,
        }
    }

    fn card_areas(slots: &[Slot]) -> Vec<(usize, Rect)> {
        slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Card { area, anchor, .. } => Some((anchor.0, *area)),
                Slot::Header { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_layout_wraps_cards_into_rows() {
        let price = vec![record("a", "price"), record("b", "price"), record("c", "price")];
        let volume = vec![record("d", "volume")];
        let groups = vec![group("price", &price, true), group("volume", &volume, true)];

        // Two cards per row
        let area = Rect::new(10, 5, 50, 40);
        let slots = layout_groups(area, &groups, ActiveView::Compact, 0);

        assert_eq!(
            card_areas(&slots),
            vec![
                (0, Rect::new(10, 6, 24, 3)),
                (1, Rect::new(34, 6, 24, 3)),
                (2, Rect::new(10, 9, 24, 3)),
                (3, Rect::new(10, 13, 24, 3)),
            ]
        );
        assert!(matches!(
            slots[0],
            Slot::Header { name: "price", count: 3, expanded: true, .. }
        ));
    }

    #[test]
    fn test_layout_collapsed_scrolled_and_clipped() {
        let price = vec![record("a", "price"), record("b", "price")];
        let volume = vec![record("c", "volume")];
        let groups = vec![group("price", &price, false), group("volume", &volume, true)];

        // Collapsed group contributes only its header, anchors skip it
        let slots = layout_groups(Rect::new(0, 0, 24, 40), &groups, ActiveView::Detailed, 0);
        assert_eq!(card_areas(&slots), vec![(0, Rect::new(0, 2, 24, 5))]);

        // Scrolled by one row the first header is gone
        let slots = layout_groups(Rect::new(0, 0, 24, 40), &groups, ActiveView::Detailed, 1);
        assert_eq!(slots.len(), 2);
        assert_eq!(card_areas(&slots), vec![(0, Rect::new(0, 1, 24, 5))]);

        // Cards that do not fit entirely are left out
        let slots = layout_groups(Rect::new(0, 0, 24, 6), &groups, ActiveView::Detailed, 0);
        assert!(card_areas(&slots).is_empty());
    }

    #[test]
    fn test_tooltip_size() {
        let mut record = record("ATR", "volatility");
        record.trend = Some(Trend::Up);
        record.description = Some("Average true range, 14 sessions".to_string());

        let (size, lines) = tooltip_size(&record, Rect::new(0, 0, 120, 40));
        // value, blank, one description line
        assert_eq!(lines.len(), 3);
        assert_eq!(size, Size::new(33.0, 5.0));

        let (size, lines) = tooltip_size(&record, Rect::new(0, 0, 20, 40));
        assert!(size.width <= 18.0);
        assert!(lines.len() > 3);
    }
}
