use super::{wrap_text, C_BRIGHT, C_DIM, C_DOWN};
use chartdeck::ChartError;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

/// Classified error message with remediation suggestions.
pub fn render_error(f: &mut Frame, area: Rect, error: &ChartError) {
    let message = error.user_message();
    let width = area.width.saturating_sub(4) as usize;

    let block = Block::default()
        .title(Span::styled(
            format!(" ⚠ {} ", message.title),
            Style::default().fg(C_DOWN).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(C_DOWN));

    let mut lines: Vec<Line> = wrap_text(&message.detail, width)
        .into_iter()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(C_BRIGHT))))
        .collect();

    if !message.suggestions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Suggestions:", Style::default().fg(C_DIM))));
        for suggestion in &message.suggestions {
            for (index, line) in wrap_text(suggestion, width.saturating_sub(2)).into_iter().enumerate() {
                let bullet = if index == 0 { "• " } else { "  " };
                lines.push(Line::from(vec![
                    Span::styled(bullet, Style::default().fg(C_DIM)),
                    Span::raw(line),
                ]));
            }
        }
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}
