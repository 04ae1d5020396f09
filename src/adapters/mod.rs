//! Adapters layer: Concrete implementations of ports.
//!
//! - `gbm`: native gradient-boosted tree evaluation and TreeSHAP
//! - `store`: artifact discovery and SHA-256 manifest verification

pub mod gbm;
pub mod store;

pub use gbm::GbmModel;
pub use store::{HorizonModels, ModelManifest, ModelStore};
