//! UI module: View components for the TUI.

pub mod patient;
pub mod results;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::MedicalTheme;

pub fn render_header(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![
            Span::styled(" Clinical Decision Support System ", MedicalTheme::header()),
        ]),
        Line::from(vec![Span::styled(
            "Predicts the risk of kidney failure with gradient-boosted models and explains each prediction with SHAP values.",
            MedicalTheme::text_secondary(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "DISCLAIMER: This tool provides indicative estimates and does not replace professional medical evaluation.",
            MedicalTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Force plots are in log-odds units: red features raise the risk, blue features lower it.",
            MedicalTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
