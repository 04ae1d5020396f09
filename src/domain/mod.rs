//! Domain layer: Core clinical types and pure logic.
//!
//! Nothing in here performs I/O. Types are plain data, serializable, and
//! closed over their valid domains.

pub mod forceplot;
mod patient;
mod prediction;

pub use forceplot::{Cell, ForcePlot, ForceSegment};
pub use patient::{
    encode, AgeYears, CakutSubphenotype, Categorical, CkdStage, Feature, FeatureRow, Gender,
    RawInputs, YesNo, AGE_MAX, AGE_MIN, FEATURE_COUNT,
};
pub use prediction::{format_percentage, Attribution, Horizon, PredictionResult};
