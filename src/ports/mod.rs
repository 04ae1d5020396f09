//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the application and the model implementation.

mod risk_model;

pub use risk_model::{logistic, ModelError, RiskModel};
