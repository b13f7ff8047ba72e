use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::matrix::Matrix;

// ---------------------------------------------------------------------------
// DataProvider – time-indexed source of matrix-valued features
// ---------------------------------------------------------------------------

/// A time-stepped source of named, matrix-valued measurements.
///
/// Reads always refer to the *currently selected* time step; when nothing
/// has been selected the earliest step is used. Unknown features and absent
/// times are reported as `None`, never as a panic.
pub trait DataProvider: fmt::Debug + Send + Sync {
    /// Every feature name present at any time step.
    fn feature_names(&self) -> Vec<String>;

    fn time_step_count(&self) -> usize;

    /// All time values in ascending order.
    fn times(&self) -> Vec<f64>;

    /// Index of the time step exactly equal to `time`.
    fn time_step_index(&self, time: f64) -> Option<usize> {
        self.times().iter().position(|&t| t == time)
    }

    /// Index of the time step closest to `time`; ties go to the earlier step.
    fn nearest_time_step(&self, time: f64) -> Option<usize> {
        let times = self.times();
        let mut best: Option<(usize, f64)> = None;
        for (i, t) in times.iter().enumerate() {
            let d = (t - time).abs();
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Select the step at exactly `time`. Returns `false` (and keeps the
    /// previous selection) when no such step exists.
    fn select_time(&self, time: f64) -> bool;

    /// Time value of the selected step (earliest when unset).
    fn current_time(&self) -> Option<f64>;

    /// Matrices for `feature` at the selected time step.
    fn data_at(&self, feature: &str) -> Option<Vec<Matrix>>;

    fn source_description(&self) -> String;
}

/// Providers are shared read-only between the document and its strategies.
pub type SharedProvider = Arc<dyn DataProvider>;

// ---------------------------------------------------------------------------
// TimeStep – all features recorded at one time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimeStep {
    pub time: f64,
    /// feature name → matrices, each list in insertion order.
    pub features: BTreeMap<String, Vec<Matrix>>,
}

// ---------------------------------------------------------------------------
// TimeSeriesProvider – in-memory DataProvider
// ---------------------------------------------------------------------------

const UNSELECTED: usize = usize::MAX;

/// In-memory [`DataProvider`] holding matrices per feature per time step.
#[derive(Debug)]
pub struct TimeSeriesProvider {
    source: String,
    /// Sorted ascending by `time`.
    steps: Vec<TimeStep>,
    current: AtomicUsize,
}

impl TimeSeriesProvider {
    pub fn new(source: impl Into<String>) -> Self {
        TimeSeriesProvider {
            source: source.into(),
            steps: Vec::new(),
            current: AtomicUsize::new(UNSELECTED),
        }
    }

    /// Append `matrices` to `feature` at `time`, creating the step if needed.
    pub fn add_series(&mut self, time: f64, feature: &str, matrices: Vec<Matrix>) {
        let step = match self.steps.iter().position(|s| s.time == time) {
            Some(i) => &mut self.steps[i],
            None => {
                let at = self.steps.partition_point(|s| s.time < time);
                self.steps.insert(
                    at,
                    TimeStep {
                        time,
                        features: BTreeMap::new(),
                    },
                );
                // Inserting shifts indices, so the selection is reset.
                self.current.store(UNSELECTED, Ordering::Relaxed);
                &mut self.steps[at]
            }
        };
        step.features
            .entry(feature.to_string())
            .or_default()
            .extend(matrices);
    }

    /// Builder-style [`TimeSeriesProvider::add_series`].
    pub fn with_series(mut self, time: f64, feature: &str, matrices: Vec<Matrix>) -> Self {
        self.add_series(time, feature, matrices);
        self
    }

    /// Select by step index rather than time value.
    pub fn select_step(&self, index: usize) -> bool {
        if index < self.steps.len() {
            self.current.store(index, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Times at which `feature` has data.
    pub fn times_for_feature(&self, feature: &str) -> Vec<f64> {
        self.steps
            .iter()
            .filter(|s| s.features.contains_key(feature))
            .map(|s| s.time)
            .collect()
    }

    pub fn steps(&self) -> &[TimeStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn current_step(&self) -> Option<&TimeStep> {
        match self.current.load(Ordering::Relaxed) {
            UNSELECTED => self.steps.first(),
            i => self.steps.get(i),
        }
    }
}

impl DataProvider for TimeSeriesProvider {
    fn feature_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.steps.iter().flat_map(|s| s.features.keys()).collect();
        names.into_iter().cloned().collect()
    }

    fn time_step_count(&self) -> usize {
        self.steps.len()
    }

    fn times(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.time).collect()
    }

    fn select_time(&self, time: f64) -> bool {
        match self.time_step_index(time) {
            Some(i) => self.select_step(i),
            None => false,
        }
    }

    fn current_time(&self) -> Option<f64> {
        self.current_step().map(|s| s.time)
    }

    fn data_at(&self, feature: &str) -> Option<Vec<Matrix>> {
        self.current_step()
            .and_then(|s| s.features.get(feature))
            .filter(|m| !m.is_empty())
            .cloned()
    }

    fn source_description(&self) -> String {
        self.source.clone()
    }
}
