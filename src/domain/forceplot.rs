//! Additive force-plot layout.
//!
//! Positive contributions push the output up from the left of `f(x)`,
//! negative ones push it down from the right; the largest contribution on
//! each side sits next to `f(x)`. This module only computes geometry. The
//! TUI turns it into coloured cells.

use super::patient::{Feature, FeatureRow};
use super::prediction::Attribution;

/// Share of the total plot width a contribution needs before it is labelled.
pub const LABEL_THRESHOLD: f64 = 0.05;

/// Fraction of the span added on both sides of the axis.
const AXIS_PADDING: f64 = 0.05;

/// One feature's bar on the force axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceSegment {
    pub feature: Feature,
    /// Encoded input value
    pub value: f64,
    pub contribution: f64,
    pub start: f64,
    pub end: f64,
}

impl ForceSegment {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// `"age_first_diagnose = 5"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} = {}", self.feature.name(), format_value(self.value))
    }
}

/// What a single terminal column of the bar shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForcePlot {
    pub base_value: f64,
    pub output: f64,
    /// Risk-increasing segments, largest first.
    pub increasing: Vec<ForceSegment>,
    /// Risk-decreasing segments, largest first.
    pub decreasing: Vec<ForceSegment>,
    pub axis_min: f64,
    pub axis_max: f64,
}

impl ForcePlot {
    /// Lay out an attribution. Zero contributions are dropped.
    #[must_use]
    pub fn new(attribution: &Attribution, row: &FeatureRow) -> Self {
        let output = attribution.output();

        let mut pos: Vec<(Feature, f64)> = attribution.iter().filter(|(_, c)| *c > 0.0).collect();
        let mut neg: Vec<(Feature, f64)> = attribution.iter().filter(|(_, c)| *c < 0.0).collect();
        pos.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neg.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut increasing = Vec::with_capacity(pos.len());
        let mut cursor = output;
        for (feature, c) in pos {
            increasing.push(ForceSegment {
                feature,
                value: row.get(feature),
                contribution: c,
                start: cursor - c,
                end: cursor,
            });
            cursor -= c;
        }
        let low = cursor;

        let mut decreasing = Vec::with_capacity(neg.len());
        let mut cursor = output;
        for (feature, c) in neg {
            decreasing.push(ForceSegment {
                feature,
                value: row.get(feature),
                contribution: c,
                start: cursor,
                end: cursor - c,
            });
            cursor -= c;
        }
        let high = cursor;

        let lo = low.min(attribution.base_value);
        let hi = high.max(attribution.base_value);
        let span = hi - lo;
        let pad = if span > 0.0 { span * AXIS_PADDING } else { 0.5 };

        Self {
            base_value: attribution.base_value,
            output,
            increasing,
            decreasing,
            axis_min: lo - pad,
            axis_max: hi + pad,
        }
    }

    /// Sum of all segment widths.
    #[must_use]
    pub fn total_width(&self) -> f64 {
        self.increasing
            .iter()
            .chain(self.decreasing.iter())
            .map(ForceSegment::width)
            .sum()
    }

    /// Segments large enough to carry a text label.
    pub fn labelled(&self) -> impl Iterator<Item = &ForceSegment> {
        let min = self.total_width() * LABEL_THRESHOLD;
        self.increasing
            .iter()
            .chain(self.decreasing.iter())
            .filter(move |s| s.width() >= min && s.width() > 0.0)
    }

    /// Map an axis value to a column in `0..width`.
    #[must_use]
    pub fn column(&self, x: f64, width: usize) -> usize {
        if width == 0 {
            return 0;
        }
        let span = self.axis_max - self.axis_min;
        if span <= 0.0 {
            return 0;
        }
        let t = ((x - self.axis_min) / span).clamp(0.0, 1.0);
        ((t * width as f64) as usize).min(width - 1)
    }

    /// Rasterise the bar into `width` cells.
    #[must_use]
    pub fn cells(&self, width: usize) -> Vec<Cell> {
        let mut cells = vec![Cell::Empty; width];
        if width == 0 {
            return cells;
        }
        let span = self.axis_max - self.axis_min;
        if span <= 0.0 {
            return cells;
        }
        for (i, cell) in cells.iter_mut().enumerate() {
            let mid = self.axis_min + span * (i as f64 + 0.5) / width as f64;
            if self.increasing.iter().any(|s| mid >= s.start && mid < s.end) {
                *cell = Cell::Increase;
            } else if self.decreasing.iter().any(|s| mid >= s.start && mid < s.end) {
                *cell = Cell::Decrease;
            }
        }
        cells
    }
}

/// Integers without decimals, everything else with one.
#[must_use]
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::FEATURE_COUNT;

    fn sample() -> (Attribution, FeatureRow) {
        let mut values = [0.0; FEATURE_COUNT];
        values[Feature::CkdStageFirstDiagnose.index()] = 0.8;
        values[Feature::AgeFirstDiagnose.index()] = 0.2;
        values[Feature::CakutSubphenotype.index()] = -0.5;
        values[Feature::Gender.index()] = -0.01;
        let attribution = Attribution {
            base_value: -2.0,
            values,
        };
        let mut row = [0.0; FEATURE_COUNT];
        row[Feature::AgeFirstDiagnose.index()] = 5.0;
        row[Feature::CkdStageFirstDiagnose.index()] = 2.0;
        row[Feature::CakutSubphenotype.index()] = 2.0;
        row[Feature::Gender.index()] = 1.0;
        (attribution, FeatureRow::from_values(row))
    }

    #[test]
    fn test_segments_are_ordered_and_stacked() {
        let (attribution, row) = sample();
        let plot = ForcePlot::new(&attribution, &row);

        assert!((plot.output - (-1.51)).abs() < 1e-12);
        assert_eq!(plot.increasing[0].feature, Feature::CkdStageFirstDiagnose);
        assert_eq!(plot.increasing[1].feature, Feature::AgeFirstDiagnose);
        assert_eq!(plot.decreasing[0].feature, Feature::CakutSubphenotype);

        assert!((plot.increasing[0].end - plot.output).abs() < 1e-12);
        assert!((plot.increasing[1].end - plot.increasing[0].start).abs() < 1e-12);
        assert!((plot.decreasing[0].start - plot.output).abs() < 1e-12);
        assert!((plot.decreasing[1].start - plot.decreasing[0].end).abs() < 1e-12);
    }

    #[test]
    fn test_widths_sum_to_absolute_contributions() {
        let (attribution, row) = sample();
        let plot = ForcePlot::new(&attribution, &row);
        let expected: f64 = attribution.values.iter().map(|v| v.abs()).sum();
        assert!((plot.total_width() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_axis_spans_base_and_output() {
        let (attribution, row) = sample();
        let plot = ForcePlot::new(&attribution, &row);
        assert!(plot.axis_min < plot.base_value && plot.base_value < plot.axis_max);
        assert!(plot.axis_min < plot.output && plot.output < plot.axis_max);
    }

    #[test]
    fn test_small_contributions_are_not_labelled() {
        let (attribution, row) = sample();
        let plot = ForcePlot::new(&attribution, &row);
        let labels: Vec<String> = plot.labelled().map(ForceSegment::label).collect();
        assert!(labels.contains(&"ckd_stage_first_diagnose = 2".to_string()));
        assert!(labels.contains(&"age_first_diagnose = 5".to_string()));
        assert!(!labels.iter().any(|l| l.starts_with("gender")));
    }

    #[test]
    fn test_cells_cover_both_directions() {
        let (attribution, row) = sample();
        let plot = ForcePlot::new(&attribution, &row);
        let cells = plot.cells(60);
        assert_eq!(cells.len(), 60);
        let out_col = plot.column(plot.output, 60);
        assert!(cells[..out_col].contains(&Cell::Increase));
        assert!(cells[out_col..].contains(&Cell::Decrease));
        assert!(plot.cells(0).is_empty());
    }

    #[test]
    fn test_zero_attribution_has_nonempty_axis() {
        let attribution = Attribution {
            base_value: 0.3,
            values: [0.0; FEATURE_COUNT],
        };
        let plot = ForcePlot::new(&attribution, &FeatureRow::from_values([0.0; FEATURE_COUNT]));
        assert!(plot.increasing.is_empty() && plot.decreasing.is_empty());
        assert!(plot.axis_max > plot.axis_min);
        assert!(plot.cells(10).iter().all(|c| *c == Cell::Empty));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(5.0), "5");
        assert_eq!(format_value(2.5), "2.5");
    }
}
