//! Pluggable analysis of time-indexed reactor simulation data.
//!
//! Load one or two [`DataProvider`]s into an [`AnalysisDocument`], pick from
//! the strategies its [`StrategyRegistry`] reports as available, and create
//! [`Asset`]s: plain-text reports plus the statistics computed for them.

pub mod config;
pub mod data;
pub mod error;
pub mod kdd;

pub use data::matrix::Matrix;
pub use data::model::{DataProvider, SharedProvider, TimeSeriesProvider};
pub use kdd::artifact::ArtifactStore;
pub use kdd::document::{AnalysisDocument, DocumentState};
pub use kdd::pin_power::{PinPowerAnalysis, PinPowerBuilder};
pub use kdd::reduction::{DifferenceKind, PinPowers, WeightedReductionEngine, WeightedStats};
pub use kdd::registry::{Availability, StrategyRegistry};
pub use kdd::strategy::{
    Asset, Parameter, ParameterValues, Statistic, Strategy, StrategyBuilder, StrategyState,
};
