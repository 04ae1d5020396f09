//! Prediction result types.
//!
//! Represents the output of one horizon's model for one encoded row.

use serde::{Deserialize, Serialize};

use super::patient::{Feature, FeatureRow, FEATURE_COUNT};

/// Prediction window, one per trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    OneYear,
    ThreeYear,
    FiveYear,
}

impl Horizon {
    /// Rendering order.
    pub const ALL: [Self; 3] = [Self::OneYear, Self::ThreeYear, Self::FiveYear];

    /// Short key used in artifact names and logs.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::OneYear => "1yr",
            Self::ThreeYear => "3yr",
            Self::FiveYear => "5yr",
        }
    }

    #[must_use]
    pub fn years(self) -> u8 {
        match self {
            Self::OneYear => 1,
            Self::ThreeYear => 3,
            Self::FiveYear => 5,
        }
    }

    /// File name of this horizon's model artifact.
    #[must_use]
    pub fn artifact_name(self) -> String {
        format!("gbm_{}.json", self.key())
    }

    /// "within 1 year", "within 3 years", ...
    #[must_use]
    pub fn window_text(self) -> String {
        match self.years() {
            1 => "within 1 year".to_string(),
            n => format!("within {n} years"),
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Additive feature attribution for one row, in the model's raw (log-odds) space.
///
/// `base_value + values.iter().sum() == raw output` up to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attribution {
    /// Expected raw output over the training distribution.
    pub base_value: f64,
    /// One contribution per feature, schema order.
    pub values: [f64; FEATURE_COUNT],
}

impl Attribution {
    /// Sum of per-feature contributions.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Raw output reconstructed from the attribution.
    #[must_use]
    pub fn output(&self) -> f64 {
        self.base_value + self.total()
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// `(feature, contribution)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(|f| (*f, self.values[f.index()]))
    }
}

/// Output of rendering one horizon.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub horizon: Horizon,

    /// Probability of kidney failure within the horizon (0.0 to 1.0)
    pub probability: f64,

    /// Raw model output (log-odds) the attribution decomposes
    pub raw_output: f64,

    pub attribution: Attribution,

    /// The row that was scored, kept for plot labels
    pub row: FeatureRow,

    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionResult {
    /// Probability as a percentage with two decimals, e.g. `"12.34%"`.
    #[must_use]
    pub fn percentage(&self) -> String {
        format_percentage(self.probability)
    }

    /// The sentence shown above the plot.
    #[must_use]
    pub fn headline(&self) -> String {
        format!(
            "Probability of kidney failure {}: {}",
            self.horizon.window_text(),
            self.percentage()
        )
    }

    /// `base + Σφ - raw_output`; zero for an exact explainer.
    #[must_use]
    pub fn additivity_residual(&self) -> f64 {
        self.attribution.output() - self.raw_output
    }
}

/// Format a probability as a percentage with two decimals.
#[must_use]
pub fn format_percentage(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_keys_and_order() {
        let keys: Vec<&str> = Horizon::ALL.iter().map(|h| h.key()).collect();
        assert_eq!(keys, vec!["1yr", "3yr", "5yr"]);
        assert_eq!(Horizon::ThreeYear.artifact_name(), "gbm_3yr.json");
        assert_eq!(Horizon::OneYear.window_text(), "within 1 year");
        assert_eq!(Horizon::FiveYear.window_text(), "within 5 years");
    }

    #[test]
    fn test_percentage_two_decimals() {
        assert_eq!(format_percentage(0.123456), "12.35%");
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
    }

    #[test]
    fn test_attribution_output() {
        let mut values = [0.0; FEATURE_COUNT];
        values[Feature::Gender.index()] = 0.5;
        values[Feature::Ocular.index()] = -0.25;
        let a = Attribution {
            base_value: -1.0,
            values,
        };
        assert!((a.total() - 0.25).abs() < 1e-12);
        assert!((a.output() + 0.75).abs() < 1e-12);
        assert_eq!(a.get(Feature::Gender), 0.5);
    }

    #[test]
    fn test_headline() {
        let result = PredictionResult {
            horizon: Horizon::ThreeYear,
            probability: 0.0421,
            raw_output: -3.1,
            attribution: Attribution {
                base_value: -3.1,
                values: [0.0; FEATURE_COUNT],
            },
            row: FeatureRow::from_values([0.0; FEATURE_COUNT]),
            computed_at: chrono::Utc::now(),
        };
        assert_eq!(
            result.headline(),
            "Probability of kidney failure within 3 years: 4.21%"
        );
        assert_eq!(result.additivity_residual(), 0.0);
    }
}
