//! Patient characteristics form.
//!
//! Every widget is bound to a closed domain: the age input clamps into
//! `[AGE_MIN, AGE_MAX]` and selectors only cycle through their options, so
//! the form can never hold a value the encoder cannot map.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{
    AgeYears, Categorical, Feature, RawInputs, AGE_MAX, AGE_MIN, FEATURE_COUNT,
};
use crate::tui::styles::MedicalTheme;

/// Arrow-key increment of the age input.
pub const AGE_STEP: f64 = 0.5;

/// Widgets per form column.
const COLUMN_LEN: usize = FEATURE_COUNT / 2;

/// Focus position: one of the 12 widgets or the PREDICT control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(Feature),
    Predict,
}

impl Focus {
    fn slot(self) -> usize {
        match self {
            Self::Field(feature) => feature.index(),
            Self::Predict => FEATURE_COUNT,
        }
    }

    fn from_slot(slot: usize) -> Self {
        Feature::ALL
            .get(slot)
            .map_or(Self::Predict, |feature| Self::Field(*feature))
    }
}

/// Form state
#[derive(Debug, Clone)]
pub struct PatientFormState {
    inputs: RawInputs,
    focus: Focus,
    /// Digits typed into the age input, not yet committed.
    age_buffer: Option<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self {
            inputs: RawInputs::default(),
            focus: Focus::Field(Feature::AgeFirstDiagnose),
            age_buffer: None,
        }
    }
}

fn step<C: Categorical>(value: &mut C, forward: bool) {
    *value = if forward { value.next() } else { value.prev() };
}

impl PatientFormState {
    /// Snapshot of the current widget values, with any typed age committed.
    #[must_use]
    pub fn snapshot(&self) -> RawInputs {
        let mut inputs = self.inputs;
        if let Some(age) = self.typed_age() {
            inputs.age_first_diagnose = age;
        }
        inputs
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    fn typed_age(&self) -> Option<AgeYears> {
        let buffer = self.age_buffer.as_deref()?;
        buffer.parse::<f64>().ok().map(AgeYears::clamped)
    }

    /// Fold the typed digits into the age value.
    pub fn commit_age(&mut self) {
        if let Some(age) = self.typed_age() {
            self.inputs.age_first_diagnose = age;
        }
        self.age_buffer = None;
    }

    pub fn next_focus(&mut self) {
        self.commit_age();
        self.focus = Focus::from_slot((self.focus.slot() + 1) % (FEATURE_COUNT + 1));
    }

    pub fn prev_focus(&mut self) {
        self.commit_age();
        let slot = self.focus.slot();
        self.focus = Focus::from_slot(if slot == 0 { FEATURE_COUNT } else { slot - 1 });
    }

    /// Jump between the two widget columns, keeping the row.
    pub fn switch_column(&mut self) {
        self.commit_age();
        if let Focus::Field(feature) = self.focus {
            let i = feature.index();
            let target = if i < COLUMN_LEN { i + COLUMN_LEN } else { i - COLUMN_LEN };
            self.focus = Focus::from_slot(target);
        }
    }

    /// Left/Right on the focused widget. Returns whether a value changed.
    pub fn adjust(&mut self, forward: bool) -> bool {
        let Focus::Field(feature) = self.focus else {
            return false;
        };
        let before = self.snapshot();
        self.commit_age();

        let inputs = &mut self.inputs;
        match feature {
            Feature::AgeFirstDiagnose => {
                let delta = if forward { AGE_STEP } else { -AGE_STEP };
                inputs.age_first_diagnose =
                    AgeYears::clamped(inputs.age_first_diagnose.get() + delta);
            }
            Feature::Gender => step(&mut inputs.gender, forward),
            Feature::FamilyHistory => step(&mut inputs.family_history, forward),
            Feature::CkdStageFirstDiagnose => step(&mut inputs.ckd_stage_first_diagnose, forward),
            Feature::ShortStature => step(&mut inputs.short_stature, forward),
            Feature::CakutSubphenotype => step(&mut inputs.cakut_subphenotype, forward),
            Feature::Pax2 => step(&mut inputs.pax2, forward),
            Feature::PrenatalPhenotype => step(&mut inputs.prenatal_phenotype, forward),
            Feature::CongenitalHeartDisease => step(&mut inputs.congenital_heart_disease, forward),
            Feature::Ocular => step(&mut inputs.ocular, forward),
            Feature::PretermBirth => step(&mut inputs.preterm_birth, forward),
            Feature::BehavioralCognitiveAbnormalities => {
                step(&mut inputs.behavioral_cognitive_abnormalities, forward);
            }
        }

        self.inputs != before
    }

    /// Type into the age input. Returns whether the effective value changed.
    pub fn input_char(&mut self, c: char) -> bool {
        if self.focus != Focus::Field(Feature::AgeFirstDiagnose) {
            return false;
        }
        if !(c.is_ascii_digit() || c == '.') {
            return false;
        }
        let before = self.snapshot();
        let buffer = self.age_buffer.get_or_insert_with(String::new);
        if c == '.' && buffer.contains('.') {
            return false;
        }
        buffer.push(c);
        self.snapshot() != before
    }

    /// Backspace in the age input. Returns whether the effective value changed.
    pub fn delete_char(&mut self) -> bool {
        if self.focus != Focus::Field(Feature::AgeFirstDiagnose) {
            return false;
        }
        let before = self.snapshot();
        match self.age_buffer.as_mut() {
            Some(buffer) => {
                buffer.pop();
            }
            None => {
                let mut text = format_age(self.inputs.age_first_diagnose);
                text.pop();
                self.age_buffer = Some(text);
            }
        }
        self.snapshot() != before
    }

    /// Text shown for one widget.
    #[must_use]
    pub fn display(&self, feature: Feature) -> String {
        let inputs = &self.inputs;
        match feature {
            Feature::AgeFirstDiagnose => match &self.age_buffer {
                Some(buffer) => buffer.clone(),
                None => format_age(inputs.age_first_diagnose),
            },
            Feature::Gender => inputs.gender.label().to_string(),
            Feature::FamilyHistory => inputs.family_history.label().to_string(),
            Feature::CkdStageFirstDiagnose => inputs.ckd_stage_first_diagnose.label().to_string(),
            Feature::ShortStature => inputs.short_stature.label().to_string(),
            Feature::CakutSubphenotype => inputs.cakut_subphenotype.label().to_string(),
            Feature::Pax2 => inputs.pax2.label().to_string(),
            Feature::PrenatalPhenotype => inputs.prenatal_phenotype.label().to_string(),
            Feature::CongenitalHeartDisease => inputs.congenital_heart_disease.label().to_string(),
            Feature::Ocular => inputs.ocular.label().to_string(),
            Feature::PretermBirth => inputs.preterm_birth.label().to_string(),
            Feature::BehavioralCognitiveAbnormalities => {
                inputs.behavioral_cognitive_abnormalities.label().to_string()
            }
        }
    }
}

fn format_age(age: AgeYears) -> String {
    format!("{:.2}", age.get())
}

/// Render the patient characteristics panel
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let block = Block::default()
        .title(Span::styled(" Patient Characteristics ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Widgets
            Constraint::Length(3), // PREDICT
            Constraint::Length(2), // Key hints
        ])
        .split(inner);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(chunks[0]);

    let (left, right) = Feature::ALL.split_at(COLUMN_LEN);
    render_field_column(f, columns[0], left, state);
    render_field_column(f, columns[1], right, state);

    render_predict_button(f, chunks[1], state.focus == Focus::Predict);
    render_form_hints(f, chunks[2]);
}

fn render_field_column(f: &mut Frame, area: Rect, features: &[Feature], state: &PatientFormState) {
    let field_height = 3;
    let constraints: Vec<Constraint> = features
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, feature) in features.iter().enumerate() {
        let is_selected = state.focus == Focus::Field(*feature);
        let (border_style, title_style) = if is_selected {
            (MedicalTheme::border_focused(), MedicalTheme::focused())
        } else {
            (MedicalTheme::border(), MedicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", feature.label()), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value = state.display(*feature);
        let line = if *feature == Feature::AgeFirstDiagnose {
            Line::from(vec![
                Span::raw(" "),
                Span::styled(value, MedicalTheme::text()),
                Span::styled(
                    format!("  ({AGE_MIN:.0}-{AGE_MAX:.0})"),
                    MedicalTheme::text_muted(),
                ),
            ])
        } else if is_selected {
            Line::from(vec![
                Span::styled(" ◀ ", MedicalTheme::key_hint()),
                Span::styled(value, MedicalTheme::text()),
                Span::styled(" ▶", MedicalTheme::key_hint()),
            ])
        } else {
            Line::from(vec![Span::raw("   "), Span::styled(value, MedicalTheme::text())])
        };

        f.render_widget(Paragraph::new(line).block(block), chunks[i]);
    }
}

fn render_predict_button(f: &mut Frame, area: Rect, focused: bool) {
    let style = if focused {
        MedicalTheme::selected()
    } else {
        MedicalTheme::focused()
    };
    let button = Paragraph::new(Line::from(Span::styled(" PREDICT ", style)))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if focused {
                    MedicalTheme::border_focused()
                } else {
                    MedicalTheme::border()
                }),
        );
    f.render_widget(button, area);
}

fn render_form_hints(f: &mut Frame, area: Rect) {
    let hints = Paragraph::new(Line::from(vec![
        Span::styled("[↑↓/Tab] ", MedicalTheme::key_hint()),
        Span::styled("Navigate ", MedicalTheme::key_desc()),
        Span::styled("[←→] ", MedicalTheme::key_hint()),
        Span::styled("Change ", MedicalTheme::key_desc()),
        Span::styled("[C] ", MedicalTheme::key_hint()),
        Span::styled("Column ", MedicalTheme::key_desc()),
        Span::styled("[Enter/P] ", MedicalTheme::key_hint()),
        Span::styled("Predict ", MedicalTheme::key_desc()),
        Span::styled("[Q] ", MedicalTheme::key_hint()),
        Span::styled("Quit", MedicalTheme::key_desc()),
    ]))
    .block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(hints, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{encode, CakutSubphenotype, CkdStage, Gender, YesNo};

    fn focus_on(state: &mut PatientFormState, feature: Feature) {
        while state.focus() != Focus::Field(feature) {
            state.next_focus();
        }
    }

    #[test]
    fn test_defaults_are_first_options() {
        let state = PatientFormState::default();
        let raw = state.snapshot();
        assert_eq!(raw.age_first_diagnose.get(), 0.0);
        assert_eq!(raw.gender, Gender::Female);
        assert_eq!(raw.ckd_stage_first_diagnose, CkdStage::Stage1);
        assert_eq!(
            raw.cakut_subphenotype,
            CakutSubphenotype::RenalHypodysplasiaWithPuv
        );
        assert_eq!(raw.pax2, YesNo::No);
    }

    #[test]
    fn test_focus_cycles_through_predict() {
        let mut state = PatientFormState::default();
        for _ in 0..FEATURE_COUNT {
            state.next_focus();
        }
        assert_eq!(state.focus(), Focus::Predict);
        state.next_focus();
        assert_eq!(state.focus(), Focus::Field(Feature::AgeFirstDiagnose));
        state.prev_focus();
        assert_eq!(state.focus(), Focus::Predict);
    }

    #[test]
    fn test_switch_column_keeps_row() {
        let mut state = PatientFormState::default();
        focus_on(&mut state, Feature::Gender);
        state.switch_column();
        assert_eq!(state.focus(), Focus::Field(Feature::PrenatalPhenotype));
        state.switch_column();
        assert_eq!(state.focus(), Focus::Field(Feature::Gender));
    }

    #[test]
    fn test_age_arrows_step_and_clamp() {
        let mut state = PatientFormState::default();
        assert!(!state.adjust(false));
        assert!(state.adjust(true));
        assert_eq!(state.snapshot().age_first_diagnose.get(), 0.5);
        for _ in 0..100 {
            state.adjust(true);
        }
        assert_eq!(state.snapshot().age_first_diagnose.get(), AGE_MAX);
    }

    #[test]
    fn test_typed_age_is_clamped() {
        let mut state = PatientFormState::default();
        for c in "25".chars() {
            state.input_char(c);
        }
        assert_eq!(state.display(Feature::AgeFirstDiagnose), "25");
        assert_eq!(state.snapshot().age_first_diagnose.get(), AGE_MAX);
        state.commit_age();
        assert_eq!(state.display(Feature::AgeFirstDiagnose), "18.00");
        assert!(!state.input_char('x'));
    }

    #[test]
    fn test_selectors_cycle_both_ways() {
        let mut state = PatientFormState::default();
        focus_on(&mut state, Feature::CkdStageFirstDiagnose);
        assert!(state.adjust(false));
        assert_eq!(state.snapshot().ckd_stage_first_diagnose, CkdStage::Stage5);
        state.adjust(true);
        state.adjust(true);
        assert_eq!(state.display(Feature::CkdStageFirstDiagnose), "2");
    }

    #[test]
    fn test_worked_example_via_keys() {
        let mut state = PatientFormState::default();
        for c in "5".chars() {
            state.input_char(c);
        }
        focus_on(&mut state, Feature::Gender);
        state.adjust(true);
        focus_on(&mut state, Feature::CkdStageFirstDiagnose);
        state.adjust(true);
        focus_on(&mut state, Feature::CakutSubphenotype);
        state.adjust(true);

        let row = encode(&state.snapshot());
        let mut expected = [0.0; FEATURE_COUNT];
        expected[Feature::AgeFirstDiagnose.index()] = 5.0;
        expected[Feature::Gender.index()] = 1.0;
        expected[Feature::CkdStageFirstDiagnose.index()] = 2.0;
        expected[Feature::CakutSubphenotype.index()] = 2.0;
        assert_eq!(row.as_slice(), &expected);
    }

    #[test]
    fn test_predict_focus_ignores_edits() {
        let mut state = PatientFormState::default();
        state.prev_focus();
        assert_eq!(state.focus(), Focus::Predict);
        assert!(!state.adjust(true));
        assert!(!state.input_char('3'));
    }
}
