use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::fmt;
use crate::models::CellValue;
use crate::wizard::{ImportWizard, ALL_STAGES};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const REQUIRED_STYLE: Style = Style::new().fg(Color::Red);

/// Format a cell as a Span; numeric cells are colored by sign.
pub fn cell_span(value: &CellValue) -> Span<'static> {
    let text = fmt::cell(value);
    match value.as_f64() {
        Some(v) if v < 0.0 => Span::styled(text, AMOUNT_NEG_STYLE),
        Some(_) if matches!(value, CellValue::Currency(_)) => Span::styled(text, AMOUNT_POS_STYLE),
        _ => Span::raw(text),
    }
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

/// One-line step indicator: active step highlighted, finished steps ticked.
pub fn stepper_line(wizard: &ImportWizard<'_>) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for (i, stage) in ALL_STAGES.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" \u{2500}\u{2500} ", FOOTER_STYLE));
        }
        let (marker, style) = if *stage == wizard.stage() {
            ("\u{25cf}", HEADER_STYLE)
        } else if wizard.stage_completed(*stage) {
            ("\u{2713}", AMOUNT_POS_STYLE)
        } else {
            ("\u{25cb}", FOOTER_STYLE)
        };
        spans.push(Span::styled(
            format!("{marker} {}. {}", i + 1, stage.title()),
            style,
        ));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        let (wrapped, lines) = wrap_text("Assets convertible to cash within 1 year", 12);
        assert!(lines > 1);
        assert!(wrapped.lines().all(|l| l.len() <= 12));
        assert_eq!(wrap_text("x", 0), ("x".to_string(), 1));
    }

    #[test]
    fn test_cell_span_styles() {
        assert_eq!(cell_span(&CellValue::Currency(-5.0)).style, AMOUNT_NEG_STYLE);
        assert_eq!(cell_span(&CellValue::Currency(5.0)).style, AMOUNT_POS_STYLE);
        assert_eq!(cell_span(&CellValue::Text("a".into())).style, Style::default());
    }
}
