//! TUI module: Terminal User Interface using Ratatui.
//!
//! A single page mirroring the clinical form:
//! - Patient characteristics on the left
//! - Predicted results with force plots on the right

mod app;
mod styles;
mod ui;

pub use app::{App, Pipeline};
pub use styles::MedicalTheme;
