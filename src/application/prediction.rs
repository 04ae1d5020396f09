//! Prediction service: renders one encoded row through every horizon model.
//!
//! Each render computes:
//! 1. The probability via the model's logistic link
//! 2. The exact additive attribution of the raw output
//! 3. An additivity check tying the two together

use std::sync::Arc;

use crate::adapters::HorizonModels;
use crate::domain::{FeatureRow, Horizon, PredictionResult};
use crate::ports::{ModelError, RiskModel};

/// Relative tolerance for `base_value + Σφ == raw_output`.
pub const ADDITIVITY_TOLERANCE: f64 = 1e-6;

/// What a failure in one horizon does to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Each horizon succeeds or fails on its own.
    #[default]
    Isolated,
    /// The first failure discards every result of the action.
    AllOrNothing,
}

impl FailurePolicy {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
            Self::AllOrNothing => "all-or-nothing",
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolated" | "per-horizon" => Ok(Self::Isolated),
            "all-or-nothing" | "all_or_nothing" | "shared" => Ok(Self::AllOrNothing),
            other => Err(format!(
                "unknown failure policy {other:?} (expected isolated or all-or-nothing)"
            )),
        }
    }
}

/// Result of one horizon's render.
#[derive(Debug, Clone)]
pub struct HorizonOutcome {
    pub horizon: Horizon,
    pub result: Result<PredictionResult, ModelError>,
}

impl HorizonOutcome {
    /// Inline banner text for a failed horizon.
    #[must_use]
    pub fn error_banner(&self) -> Option<String> {
        self.result
            .as_ref()
            .err()
            .map(|e| format!("Prediction failed ({}): {e}", self.horizon.window_text()))
    }
}

/// Everything one predict action produced.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// One outcome per horizon in `Horizon::ALL` order.
    Panels(Vec<HorizonOutcome>),
    /// A horizon failed under `FailurePolicy::AllOrNothing`; nothing is shown.
    Aborted { horizon: Horizon, error: ModelError },
}

impl RenderOutcome {
    /// Successful results, in horizon order.
    pub fn results(&self) -> impl Iterator<Item = &PredictionResult> {
        let panels: &[HorizonOutcome] = match self {
            Self::Panels(panels) => panels,
            Self::Aborted { .. } => &[],
        };
        panels.iter().filter_map(|o| o.result.as_ref().ok())
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Render one horizon: probability, attribution and additivity check.
///
/// # Errors
/// Propagates model errors and returns `ModelError::Numeric` if the
/// probability leaves `[0, 1]` or the attribution does not add up.
pub fn render(
    model: &dyn RiskModel,
    row: &FeatureRow,
    horizon: Horizon,
) -> Result<PredictionResult, ModelError> {
    let raw_output = model.raw_output(row)?;
    let probability = model.predict_probability(row)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ModelError::Numeric(format!(
            "probability {probability} outside [0, 1]"
        )));
    }

    let attribution = model.explain(row)?;

    let result = PredictionResult {
        horizon,
        probability,
        raw_output,
        attribution,
        row: *row,
        computed_at: chrono::Utc::now(),
    };

    let residual = result.additivity_residual();
    tracing::debug!(
        "Rendered {} horizon: additivity residual {:.3e}",
        horizon,
        residual
    );
    if !residual.is_finite() || residual.abs() > ADDITIVITY_TOLERANCE * raw_output.abs().max(1.0) {
        return Err(ModelError::Numeric(format!(
            "attribution does not add up to the model output (residual {residual:.3e})"
        )));
    }

    Ok(result)
}

/// Service holding the three horizon models for the process lifetime.
pub struct PredictionService {
    models: HorizonModels,
    policy: FailurePolicy,
}

impl PredictionService {
    /// Create a new prediction service.
    pub fn new(models: HorizonModels, policy: FailurePolicy) -> Self {
        Self { models, policy }
    }

    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn model(&self, horizon: Horizon) -> Result<&Arc<dyn RiskModel>, ModelError> {
        self.models
            .get(&horizon)
            .ok_or_else(|| ModelError::Io(format!("no model loaded for {horizon}")))
    }

    /// Render `row` through the 1yr, 3yr and 5yr models in that order.
    ///
    /// The same row is passed to every model.
    pub fn predict_all(&self, row: &FeatureRow) -> RenderOutcome {
        tracing::info!(
            "Starting prediction for {} horizons (policy={})",
            Horizon::ALL.len(),
            self.policy.key()
        );

        let mut panels = Vec::with_capacity(Horizon::ALL.len());
        for horizon in Horizon::ALL {
            let result = self
                .model(horizon)
                .and_then(|model| render(model.as_ref(), row, horizon));

            match &result {
                Ok(r) => tracing::info!(
                    "Prediction complete: horizon={}, probability={:.2}%",
                    horizon,
                    r.probability * 100.0
                ),
                Err(e) => {
                    tracing::warn!("Prediction failed: horizon={}, error={}", horizon, e);
                    if self.policy == FailurePolicy::AllOrNothing {
                        return RenderOutcome::Aborted {
                            horizon,
                            error: e.clone(),
                        };
                    }
                }
            }

            panels.push(HorizonOutcome { horizon, result });
        }

        RenderOutcome::Panels(panels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ModelStore;
    use crate::domain::{
        encode, AgeYears, Attribution, CakutSubphenotype, CkdStage, Feature, Gender, RawInputs,
        FEATURE_COUNT,
    };
    use std::collections::BTreeMap;

    /// `bias + Σ w_i x_i`, explained exactly by `w_i x_i`.
    #[derive(Debug)]
    struct LinearModel {
        bias: f64,
        weights: [f64; FEATURE_COUNT],
    }

    impl RiskModel for LinearModel {
        fn raw_output(&self, row: &FeatureRow) -> Result<f64, ModelError> {
            Ok(self.bias + self.weights.iter().zip(row.as_slice()).map(|(w, x)| w * x).sum::<f64>())
        }

        fn explain(&self, row: &FeatureRow) -> Result<Attribution, ModelError> {
            let mut values = [0.0; FEATURE_COUNT];
            for (v, (w, x)) in values.iter_mut().zip(self.weights.iter().zip(row.as_slice())) {
                *v = w * x;
            }
            Ok(Attribution {
                base_value: self.bias,
                values,
            })
        }
    }

    #[derive(Debug)]
    struct FailingExplainer;

    impl RiskModel for FailingExplainer {
        fn raw_output(&self, _row: &FeatureRow) -> Result<f64, ModelError> {
            Ok(0.0)
        }

        fn explain(&self, _row: &FeatureRow) -> Result<Attribution, ModelError> {
            Err(ModelError::Numeric("explainer exploded".into()))
        }
    }

    /// Attribution that is off by a constant.
    #[derive(Debug)]
    struct NonAdditive;

    impl RiskModel for NonAdditive {
        fn raw_output(&self, _row: &FeatureRow) -> Result<f64, ModelError> {
            Ok(1.0)
        }

        fn explain(&self, _row: &FeatureRow) -> Result<Attribution, ModelError> {
            Ok(Attribution {
                base_value: 0.0,
                values: [0.0; FEATURE_COUNT],
            })
        }
    }

    fn worked_example_row() -> FeatureRow {
        encode(&RawInputs {
            age_first_diagnose: AgeYears::new(5.0).expect("in range"),
            gender: Gender::Male,
            ckd_stage_first_diagnose: CkdStage::Stage2,
            cakut_subphenotype: CakutSubphenotype::SolitaryKidney,
            ..RawInputs::default()
        })
    }

    fn linear(bias: f64) -> Arc<dyn RiskModel> {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[Feature::CkdStageFirstDiagnose.index()] = 0.4;
        weights[Feature::AgeFirstDiagnose.index()] = 0.05;
        Arc::new(LinearModel { bias, weights })
    }

    fn service_with_failing_3yr(policy: FailurePolicy) -> PredictionService {
        let mut models: HorizonModels = BTreeMap::new();
        models.insert(Horizon::OneYear, linear(-3.0));
        models.insert(Horizon::ThreeYear, Arc::new(FailingExplainer));
        models.insert(Horizon::FiveYear, linear(-1.5));
        PredictionService::new(models, policy)
    }

    #[test]
    fn test_end_to_end_with_checked_in_models() {
        let models = ModelStore::new("models", false)
            .load_all()
            .expect("Models should load for tests");
        let service = PredictionService::new(models, FailurePolicy::Isolated);
        let row = worked_example_row();

        let outcome = service.predict_all(&row);
        let results: Vec<&PredictionResult> = outcome.results().collect();
        assert_eq!(results.len(), 3);

        for (result, horizon) in results.iter().zip(Horizon::ALL) {
            assert_eq!(result.horizon, horizon);
            assert_eq!(result.row, row);
            assert!((0.0..=1.0).contains(&result.probability));
            assert_eq!(result.attribution.values.len(), FEATURE_COUNT);
            assert!(
                result.additivity_residual().abs()
                    <= ADDITIVITY_TOLERANCE * result.raw_output.abs().max(1.0)
            );
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let model = ModelStore::new("models", false)
            .load(Horizon::FiveYear)
            .expect("Model should load for tests");
        let row = worked_example_row();

        let a = render(&model, &row, Horizon::FiveYear).expect("render");
        let b = render(&model, &row, Horizon::FiveYear).expect("render");
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
        assert_eq!(
            a.attribution.values.map(f64::to_bits),
            b.attribution.values.map(f64::to_bits)
        );
    }

    #[test]
    fn test_isolated_policy_keeps_other_horizons() {
        let service = service_with_failing_3yr(FailurePolicy::Isolated);
        let outcome = service.predict_all(&worked_example_row());

        let RenderOutcome::Panels(panels) = &outcome else {
            panic!("isolated policy never aborts");
        };
        assert_eq!(panels.len(), 3);
        assert!(panels[0].result.is_ok());
        assert!(panels[1].result.is_err());
        assert!(panels[2].result.is_ok());
        assert_eq!(
            panels[1].error_banner().as_deref(),
            Some("Prediction failed (within 3 years): Numeric error: explainer exploded")
        );
        assert_eq!(outcome.results().count(), 2);
    }

    #[test]
    fn test_all_or_nothing_policy_shows_nothing() {
        let service = service_with_failing_3yr(FailurePolicy::AllOrNothing);
        let outcome = service.predict_all(&worked_example_row());

        assert!(outcome.is_aborted());
        assert_eq!(outcome.results().count(), 0);
        match outcome {
            RenderOutcome::Aborted { horizon, .. } => assert_eq!(horizon, Horizon::ThreeYear),
            RenderOutcome::Panels(_) => panic!("expected abort"),
        }
    }

    #[test]
    fn test_missing_model_is_a_horizon_failure() {
        let mut models: HorizonModels = BTreeMap::new();
        models.insert(Horizon::OneYear, linear(-3.0));
        let service = PredictionService::new(models, FailurePolicy::Isolated);

        let outcome = service.predict_all(&worked_example_row());
        assert_eq!(outcome.results().count(), 1);
    }

    #[test]
    fn test_non_additive_explainer_is_rejected() {
        let err = render(&NonAdditive, &worked_example_row(), Horizon::OneYear)
            .expect_err("residual of 1.0");
        assert!(err.to_string().contains("residual"));
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("isolated".parse::<FailurePolicy>(), Ok(FailurePolicy::Isolated));
        assert_eq!(
            " All-Or-Nothing ".parse::<FailurePolicy>(),
            Ok(FailurePolicy::AllOrNothing)
        );
        assert!("sometimes".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Isolated);
    }
}
