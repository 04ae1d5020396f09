//! Gradient-boosted tree adapter: Implementation of RiskModel.
//!
//! Loads a tree ensemble exported from the training pipeline as JSON and
//! evaluates it natively. Explanations use exact TreeSHAP, never sampling.
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "feature_names": ["PAX2", "age_first_diagnose", "..."],
//!   "init_score": -2.9,
//!   "learning_rate": 0.1,
//!   "trees": [ { "nodes": [
//!     { "feature": 1, "threshold": 6.0, "left": 1, "right": 2, "cover": 120.0 },
//!     { "value": -0.3, "cover": 80.0 },
//!     { "value": 0.4, "cover": 40.0 }
//!   ] } ]
//! }
//! ```
//!
//! `feature` indexes `feature_names`, i.e. the model's own column order. The
//! loader remaps every split onto the schema order of `FeatureRow`.

mod tree;
mod treeshap;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Attribution, Feature, FeatureRow, FEATURE_COUNT};
use crate::ports::{ModelError, RiskModel};

use tree::{Node, Tree};

/// Ensemble as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmArtifact {
    pub feature_names: Vec<String>,
    /// Prior log-odds added to every prediction.
    pub init_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeArtifact {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

/// Map the artifact's column order onto the schema.
///
/// `columns[j]` is the schema feature for model column `j`.
fn resolve_columns(names: &[String]) -> Result<Vec<Feature>, ModelError> {
    if names.len() != FEATURE_COUNT {
        return Err(ModelError::SchemaMismatch(format!(
            "expected {FEATURE_COUNT} feature columns, got {}",
            names.len()
        )));
    }

    let mut seen = [false; FEATURE_COUNT];
    let mut columns = Vec::with_capacity(FEATURE_COUNT);
    for name in names {
        let feature = Feature::from_column_name(name)
            .ok_or_else(|| ModelError::SchemaMismatch(format!("unknown column {name:?}")))?;
        if std::mem::replace(&mut seen[feature.index()], true) {
            return Err(ModelError::SchemaMismatch(format!(
                "column {name:?} maps to {feature}, which is already bound"
            )));
        }
        columns.push(feature);
    }

    Ok(columns)
}

/// A loaded gradient-boosted classifier.
///
/// Immutable after construction; leaf values are pre-multiplied by the
/// learning rate so raw output is `init_score + Σ tree(x)`.
#[derive(Debug, Clone)]
pub struct GbmModel {
    init_score: f64,
    trees: Vec<Tree>,
    base_value: f64,
}

impl GbmModel {
    /// Build from a parsed artifact.
    ///
    /// # Errors
    /// Returns `ModelError::SchemaMismatch` if the columns do not cover the
    /// schema exactly, or `ModelError::Format` for structural defects.
    pub fn from_artifact(artifact: GbmArtifact) -> Result<Self, ModelError> {
        let columns = resolve_columns(&artifact.feature_names)?;

        if !artifact.init_score.is_finite() {
            return Err(ModelError::Format("init_score is not finite".into()));
        }
        if !artifact.learning_rate.is_finite() || artifact.learning_rate <= 0.0 {
            return Err(ModelError::Format(format!(
                "learning_rate must be positive, got {}",
                artifact.learning_rate
            )));
        }
        if artifact.trees.is_empty() {
            return Err(ModelError::Format("ensemble has no trees".into()));
        }

        let mut trees = Vec::with_capacity(artifact.trees.len());
        for (t, tree) in artifact.trees.into_iter().enumerate() {
            let mut nodes = Vec::with_capacity(tree.nodes.len());
            for node in tree.nodes {
                nodes.push(match node {
                    NodeArtifact::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        cover,
                    } => {
                        let column = columns.get(feature).ok_or_else(|| {
                            ModelError::Format(format!(
                                "tree {t}: split column {feature} out of range"
                            ))
                        })?;
                        Node::Split {
                            feature: column.index(),
                            threshold,
                            left,
                            right,
                            cover,
                        }
                    }
                    NodeArtifact::Leaf { value, cover } => Node::Leaf { value, cover },
                });
            }
            let mut compiled = Tree::new(nodes, FEATURE_COUNT)
                .map_err(|e| ModelError::Format(format!("tree {t}: {e}")))?;
            compiled.scale_leaves(artifact.learning_rate);
            trees.push(compiled);
        }

        let base_value = artifact.init_score + trees.iter().map(Tree::expected_value).sum::<f64>();

        Ok(Self {
            init_score: artifact.init_score,
            trees,
            base_value,
        })
    }

    /// Read and validate an artifact file.
    ///
    /// # Errors
    /// Returns `ModelError::Io` if the file cannot be read and
    /// `ModelError::Format` if it is not a valid artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Io(format!("{}: {e}", path.display())))?;
        let artifact: GbmArtifact = serde_json::from_str(&content)
            .map_err(|e| ModelError::Format(format!("{}: {e}", path.display())))?;
        let model = Self::from_artifact(artifact)?;

        tracing::info!(
            "Loaded model from {:?} (trees={}, nodes={}, max_depth={}, base_value={:.4})",
            path,
            model.trees.len(),
            model.trees.iter().map(Tree::len).sum::<usize>(),
            model.trees.iter().map(Tree::max_depth).max().unwrap_or(0),
            model.base_value
        );

        Ok(model)
    }

    /// Expected raw output over the training distribution.
    #[must_use]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn checked_values(row: &FeatureRow) -> Result<&[f64], ModelError> {
        if let Some((feature, _)) = row.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::NonFinite(feature));
        }
        Ok(row.as_slice())
    }
}

impl RiskModel for GbmModel {
    fn raw_output(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let x = Self::checked_values(row)?;
        let raw = self.init_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>();
        if !raw.is_finite() {
            return Err(ModelError::Numeric("raw output is not finite".into()));
        }
        Ok(raw)
    }

    fn explain(&self, row: &FeatureRow) -> Result<Attribution, ModelError> {
        let x = Self::checked_values(row)?;
        let mut values = [0.0; FEATURE_COUNT];
        for tree in &self.trees {
            treeshap::accumulate(tree, x, &mut values);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Numeric("attribution is not finite".into()));
        }
        Ok(Attribution {
            base_value: self.base_value,
            values,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Training column order of the exported models.
    pub(crate) const TRAINING_COLUMNS: [&str; FEATURE_COUNT] = [
        "PAX2",
        "age_first_diagnose",
        "behavioral_cognitive_abnormalities (1/0)",
        "cakut_subphenotype",
        "ckd_stage_first_diagnose",
        "congenital_heart_disease (1/0)",
        "family_history (1/0)",
        "gender (1/0)",
        "ocular (1/0)",
        "prenatal_phenotype (1/0)",
        "preterm_birth (1/0)",
        "short_stature (1/0)",
    ];

    fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> NodeArtifact {
        NodeArtifact::Split {
            feature,
            threshold,
            left,
            right,
            cover,
        }
    }

    fn leaf(value: f64, cover: f64) -> NodeArtifact {
        NodeArtifact::Leaf { value, cover }
    }

    /// Three small trees over stage, age, CAKUT sub-phenotype and PAX2,
    /// using training-column indices.
    pub(crate) fn small_artifact() -> GbmArtifact {
        GbmArtifact {
            feature_names: TRAINING_COLUMNS.iter().map(|s| s.to_string()).collect(),
            init_score: -2.0,
            learning_rate: 0.5,
            trees: vec![
                TreeArtifact {
                    nodes: vec![
                        split(4, 2.5, 1, 4, 200.0),
                        split(1, 6.0, 2, 3, 140.0),
                        leaf(-0.6, 60.0),
                        leaf(-0.2, 80.0),
                        split(3, 1.5, 5, 6, 60.0),
                        leaf(1.4, 20.0),
                        leaf(0.8, 40.0),
                    ],
                },
                TreeArtifact {
                    nodes: vec![
                        split(3, 2.5, 1, 2, 200.0),
                        leaf(-0.3, 90.0),
                        split(0, 0.5, 3, 4, 110.0),
                        leaf(0.1, 95.0),
                        leaf(0.9, 15.0),
                    ],
                },
                TreeArtifact {
                    nodes: vec![
                        split(1, 2.0, 1, 2, 200.0),
                        leaf(0.5, 30.0),
                        split(4, 3.5, 3, 4, 170.0),
                        leaf(-0.25, 130.0),
                        leaf(0.6, 40.0),
                    ],
                },
            ],
        }
    }
}
