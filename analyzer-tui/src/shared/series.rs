//! Chart series derivation and the per-panel chart ownership rule.
//!
//! Series are rebuilt from scratch before every redraw and replaced
//! wholesale: a [`ChartBinding`] owns at most one set of series per
//! panel, and rebinding always releases the prior set before the new
//! one is installed. There is no in-place chart mutation.

use analyzer_client::IndicatorRecord;
use chrono::{DateTime, Utc};

/// Ordered `(label, value)` pairs for one plotted metric.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub metric: String,
    pub points: Vec<(String, Option<f64>)>,
}

impl ChartSeries {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            points: Vec::new(),
        }
    }

    /// Build a series by extracting one metric from each record, in
    /// record order (callers pass oldest-first sequences).
    pub fn from_records<F>(
        metric: impl Into<String>,
        records: &[IndicatorRecord],
        extract: F,
    ) -> Self
    where
        F: Fn(&IndicatorRecord) -> Option<f64>,
    {
        Self {
            metric: metric.into(),
            points: records
                .iter()
                .map(|record| (axis_label(record.timestamp), extract(record)))
                .collect(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: Option<f64>) {
        self.points.push((label.into(), value));
    }

    /// Present values only, gaps dropped.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|(_, v)| *v).collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|(_, v)| *v)
    }

    /// Normalize present values into 1..=100 for a sparkline. A flat
    /// series renders mid-scale; gaps are dropped, not zeroed.
    pub fn sparkline_data(&self) -> Vec<u64> {
        let values = self.values();
        let (Some(min), Some(max)) = (
            values.iter().cloned().reduce(f64::min),
            values.iter().cloned().reduce(f64::max),
        ) else {
            return Vec::new();
        };

        let span = max - min;
        values
            .iter()
            .map(|v| {
                if span <= f64::EPSILON {
                    50
                } else {
                    (((v - min) / span) * 99.0) as u64 + 1
                }
            })
            .collect()
    }
}

/// Single-owner slot for the chart content of one panel.
///
/// Exactly one set of series may be bound at a time; [`bind`] releases
/// the previous set before installing its replacement, so a panel can
/// never accumulate stale chart data across reloads.
///
/// [`bind`]: ChartBinding::bind
#[derive(Debug, Default)]
pub struct ChartBinding {
    series: Vec<ChartSeries>,
    generation: u64,
}

impl ChartBinding {
    /// Replace the bound series. The prior set is dropped first.
    pub fn bind(&mut self, series: Vec<ChartSeries>) {
        self.release();
        self.series = series;
        self.generation += 1;
    }

    /// Drop the bound series without installing a replacement.
    pub fn release(&mut self) {
        self.series.clear();
    }

    pub fn series(&self) -> &[ChartSeries] {
        &self.series
    }

    pub fn is_bound(&self) -> bool {
        !self.series.is_empty()
    }

    /// Monotonic rebind counter; one increment per completed load.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn axis_label(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%b %-d %H:%M").to_string()
}
