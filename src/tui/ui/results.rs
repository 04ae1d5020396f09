//! Predicted results: one headline and force plot per horizon.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::{HorizonOutcome, RenderOutcome};
use crate::domain::{Cell, ForcePlot, ForceSegment, PredictionResult};
use crate::tui::styles::MedicalTheme;

/// Rows used by one horizon panel, borders included.
const PANEL_HEIGHT: u16 = 7;

/// Render the predicted results panel
pub fn render_results(f: &mut Frame, area: Rect, outcome: Option<&RenderOutcome>, rendering: bool) {
    let block = Block::default()
        .title(Span::styled(" Predicted Results ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    if rendering {
        render_message(f, inner, "Computing predictions...", MedicalTheme::focused());
        return;
    }

    match outcome {
        None => render_message(
            f,
            inner,
            "Set the patient characteristics and press PREDICT",
            MedicalTheme::text_muted(),
        ),
        Some(RenderOutcome::Aborted { error, .. }) => {
            render_message(f, inner, &format!("Error: {error}"), MedicalTheme::danger());
        }
        Some(RenderOutcome::Panels(panels)) => {
            let constraints: Vec<Constraint> = panels
                .iter()
                .map(|_| Constraint::Length(PANEL_HEIGHT))
                .chain(std::iter::once(Constraint::Min(0)))
                .collect();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(inner);

            for (panel, chunk) in panels.iter().zip(chunks.iter()) {
                render_panel(f, *chunk, panel);
            }
        }
    }
}

fn render_message(f: &mut Frame, area: Rect, message: &str, style: Style) {
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style)),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn render_panel(f: &mut Frame, area: Rect, panel: &HorizonOutcome) {
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", panel.horizon.window_text()),
            MedicalTheme::text_secondary(),
        ))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let width = usize::from(block.inner(area).width);

    let lines = match (&panel.result, panel.error_banner()) {
        (Ok(result), _) => result_lines(result, width),
        (Err(_), Some(banner)) => vec![Line::from(Span::styled(banner, MedicalTheme::danger()))],
        (Err(e), None) => vec![Line::from(Span::styled(e.to_string(), MedicalTheme::danger()))],
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn result_lines(result: &PredictionResult, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Probability of kidney failure {}: ", result.horizon.window_text()),
            MedicalTheme::text(),
        ),
        Span::styled(result.percentage(), MedicalTheme::title()),
    ])];
    let plot = ForcePlot::new(&result.attribution, &result.row);
    lines.extend(force_plot_lines(&plot, width));
    lines
}

/// Place `text` centred on `col`, shifted to fit. Skips if it would overwrite.
fn place(row: &mut [char], col: usize, text: &str, overwrite: bool) {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > row.len() {
        return;
    }
    let start = col
        .saturating_sub(chars.len() / 2)
        .min(row.len() - chars.len());
    let target = &mut row[start..start + chars.len()];
    if !overwrite && target.iter().any(|c| *c != ' ') {
        return;
    }
    target.copy_from_slice(&chars);
}

fn join_labels<'a>(segments: impl Iterator<Item = &'a ForceSegment>) -> String {
    segments.map(ForceSegment::label).collect::<Vec<_>>().join(", ")
}

/// Marker row, bar row and the two label rows of a force plot.
pub fn force_plot_lines(plot: &ForcePlot, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return Vec::new();
    }
    let out_col = plot.column(plot.output, width);
    let base_col = plot.column(plot.base_value, width);

    let mut markers = vec![' '; width];
    place(&mut markers, out_col, &format!("f(x) = {:.2}", plot.output), true);
    place(
        &mut markers,
        base_col,
        &format!("base value = {:.2}", plot.base_value),
        false,
    );

    let mut bar: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = MedicalTheme::text_muted();
    for (i, cell) in plot.cells(width).into_iter().enumerate() {
        let (ch, style) = if i == out_col {
            ('┃', MedicalTheme::title())
        } else if i == base_col {
            ('┊', MedicalTheme::text_secondary())
        } else {
            match cell {
                Cell::Increase => ('█', MedicalTheme::increase()),
                Cell::Decrease => ('█', MedicalTheme::decrease()),
                Cell::Empty => ('─', MedicalTheme::text_muted()),
            }
        };
        if style != run_style && !run.is_empty() {
            bar.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push(ch);
    }
    if !run.is_empty() {
        bar.push(Span::styled(run, run_style));
    }

    let higher = join_labels(plot.labelled().filter(|s| s.contribution > 0.0));
    let lower = join_labels(plot.labelled().filter(|s| s.contribution < 0.0));

    vec![
        Line::from(Span::styled(
            markers.into_iter().collect::<String>(),
            MedicalTheme::text_secondary(),
        )),
        Line::from(bar),
        Line::from(vec![
            Span::styled("higher ▶ ", MedicalTheme::increase()),
            Span::styled(higher, MedicalTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("◀ lower  ", MedicalTheme::decrease()),
            Span::styled(lower, MedicalTheme::text()),
        ]),
    ]
}
