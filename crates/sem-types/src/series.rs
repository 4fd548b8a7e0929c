//! Scalar series storage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Training step (epoch or iteration index) a value was recorded at.
pub type Step = i64;

/// One recorded observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step: Step,
    pub value: f64,
}

/// Append-only history of one metric.
///
/// Steps are kept in append order; they are neither sorted nor deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step, value: f64) {
        self.samples.push(Sample { step, value });
    }

    /// Most recently appended sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Value recorded last at `step`, if any.
    pub fn value_at(&self, step: Step) -> Option<f64> {
        self.samples
            .iter()
            .rev()
            .find(|s| s.step == step)
            .map(|s| s.value)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Named series keyed by metric name, remembering first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    names: Vec<String>,
    index: HashMap<String, usize>,
    series: Vec<Series>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `(step, value)` to `name`. Returns `true` when the series is new.
    pub fn record(&mut self, step: Step, name: &str, value: f64) -> bool {
        match self.index.get(name) {
            Some(&idx) => {
                self.series[idx].push(step, value);
                false
            }
            None => {
                let mut series = Series::new();
                series.push(step, value);
                self.index.insert(name.to_string(), self.names.len());
                self.names.push(name.to_string());
                self.series.push(series);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.index.get(name).map(|&idx| &self.series[idx])
    }

    /// Metric names in first-insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, series)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.series.iter())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
