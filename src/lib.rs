//! # RenalSight
//!
//! Kidney-failure risk estimates for children with CAKUT, with per-feature
//! explanations.
//!
//! This crate provides:
//! - A closed, typed encoding of the 12-field patient form
//! - Native evaluation of gradient-boosted tree models for 1, 3 and 5 years
//! - Exact TreeSHAP attributions rendered as force plots
//! - Terminal UI for local-only deployment
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core clinical types (patient inputs, feature row, predictions)
//! - `ports`: Trait definitions for risk models
//! - `adapters`: Concrete implementations (tree ensembles, model store)
//! - `application`: The predict action orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use config::AppConfig;
pub use domain::{encode, FeatureRow, PredictionResult, RawInputs};

/// Result type for RenalSight operations
pub type Result<T> = std::result::Result<T, RenalsightError>;

/// Main error type for RenalSight
#[derive(Debug, thiserror::Error)]
pub enum RenalsightError {
    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
