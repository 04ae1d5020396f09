//! Main TUI application state machine.
//!
//! Handles:
//! - Input event handling
//! - The `Idle -> Rendering -> Idle` predict cycle
//! - Drawing the form and the results side by side

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::application::{PredictionService, RenderOutcome};
use crate::domain::encode;

use super::ui::{
    patient::{render_patient_form, Focus, PatientFormState},
    render_disclaimer, render_header,
    results::render_results,
};

/// Where the predict cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pipeline {
    /// Form accepts edits; nothing runs.
    #[default]
    Idle,
    /// A predict action is pending and runs after the next frame.
    Rendering,
}

/// Main application state
pub struct App {
    service: PredictionService,

    form: PatientFormState,

    pipeline: Pipeline,

    /// Outcome of the last predict action, cleared by any edit
    results: Option<RenderOutcome>,

    should_quit: bool,
}

impl App {
    /// Create application with an injected prediction service.
    pub fn new(service: PredictionService) -> Self {
        Self {
            service,
            form: PatientFormState::default(),
            pipeline: Pipeline::Idle,
            results: None,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    #[must_use]
    pub fn results(&self) -> Option<&RenderOutcome> {
        self.results.as_ref()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.step(terminal)?;

            if self.pipeline == Pipeline::Idle && event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Draw one frame, then run a pending predict action.
    ///
    /// The `Rendering` frame is drawn before the models run so the user sees
    /// the action was accepted.
    ///
    /// # Errors
    /// Returns error if drawing fails.
    pub fn step<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|f| self.draw(f))?;

        if self.pipeline == Pipeline::Rendering {
            self.run_prediction();
            terminal.draw(|f| self.draw(f))?;
        }

        Ok(())
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(f.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);

        render_header(f, chunks[0]);
        render_patient_form(f, columns[0], &self.form);
        render_results(
            f,
            columns[1],
            self.results.as_ref(),
            self.pipeline == Pipeline::Rendering,
        );
        render_disclaimer(f, chunks[2]);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let edited = match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                false
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.form.prev_focus();
                false
            }
            KeyCode::Down | KeyCode::Tab => {
                self.form.next_focus();
                false
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.form.switch_column();
                false
            }
            KeyCode::Left => self.form.adjust(false),
            KeyCode::Right => self.form.adjust(true),
            KeyCode::Backspace => self.form.delete_char(),
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.request_prediction();
                false
            }
            KeyCode::Enter => {
                if self.form.focus() == Focus::Predict {
                    tracing::debug!("PREDICT activated");
                }
                self.request_prediction();
                false
            }
            KeyCode::Char(c) => self.form.input_char(c),
            _ => false,
        };

        if edited && self.results.take().is_some() {
            tracing::debug!("Form edited; cleared previous results");
        }
    }

    /// `Idle -> Rendering`. Ignored while a render is pending.
    pub fn request_prediction(&mut self) {
        if self.pipeline == Pipeline::Idle {
            self.pipeline = Pipeline::Rendering;
        }
    }

    /// `Rendering -> Idle`: encode the current form and render all horizons.
    fn run_prediction(&mut self) {
        self.form.commit_age();
        let row = encode(&self.form.snapshot());
        self.results = Some(self.service.predict_all(&row));
        self.pipeline = Pipeline::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ModelStore;
    use crate::application::FailurePolicy;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let models = ModelStore::new("models", false)
            .load_all()
            .expect("Models should load for tests");
        App::new(PredictionService::new(models, FailurePolicy::Isolated))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_smoke() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(200, 60)).expect("terminal");

        app.step(&mut terminal).expect("draw");
        let idle = screen(&terminal);
        assert!(idle.contains("Patient Characteristics"));
        assert!(idle.contains("Predicted Results"));
        assert!(idle.contains("CAKUT Subphenotype"));
        assert!(idle.contains("PREDICT"));
        assert!(idle.contains("DISCLAIMER"));

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.pipeline(), Pipeline::Rendering);
        app.step(&mut terminal).expect("draw");
        assert_eq!(app.pipeline(), Pipeline::Idle);

        let done = screen(&terminal);
        assert!(done.contains("Probability of kidney failure within 1 year"));
        assert!(done.contains("Probability of kidney failure within 3 years"));
        assert!(done.contains("Probability of kidney failure within 5 years"));
        assert!(done.contains("f(x) ="));
    }

    #[test]
    fn test_edit_clears_results() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(200, 60)).expect("terminal");

        press(&mut app, KeyCode::Enter);
        app.step(&mut terminal).expect("draw");
        assert_eq!(app.results().map(|r| r.results().count()), Some(3));

        // Focus moves do not clear.
        press(&mut app, KeyCode::Down);
        assert!(app.results().is_some());

        press(&mut app, KeyCode::Right);
        assert!(app.results().is_none());
    }

    #[test]
    fn test_quit_keys() {
        let mut first = app();
        assert!(!first.should_quit());
        first.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(first.should_quit());

        let mut second = app();
        press(&mut second, KeyCode::Char('q'));
        assert!(second.should_quit());
    }
}
