//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the predict action of the form.

mod prediction;

pub use prediction::{
    render, FailurePolicy, HorizonOutcome, PredictionService, RenderOutcome, ADDITIVITY_TOLERANCE,
};
