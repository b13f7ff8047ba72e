use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::artifact::{ArtifactStore, file_uri};
use crate::data::model::SharedProvider;
use crate::error::{CreateError, StrategyError};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A configurable knob a builder exposes before a strategy is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub default: String,
    /// Empty means any value is accepted.
    pub allowed_values: Vec<String>,
}

impl Parameter {
    pub fn discrete(name: &str, description: &str, default: &str, allowed: &[&str]) -> Self {
        Parameter {
            name: name.to_string(),
            description: description.to_string(),
            default: default.to_string(),
            allowed_values: allowed.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// A `yes`/`no` switch.
    pub fn toggle(name: &str, description: &str, default: bool) -> Self {
        Self::discrete(name, description, if default { "yes" } else { "no" }, &["yes", "no"])
    }

    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values.is_empty() || self.allowed_values.iter().any(|v| v == value)
    }
}

/// Parameter name → chosen value.
pub type ParameterValues = BTreeMap<String, String>;

/// Defaults of `parameters` with `overrides` applied on top.
///
/// Overrides naming an unknown parameter, or carrying a value outside the
/// allowed set, are rejected.
pub fn resolve_parameters(
    strategy: &str,
    parameters: &[Parameter],
    overrides: &ParameterValues,
) -> Result<ParameterValues, CreateError> {
    let mut values: ParameterValues = parameters
        .iter()
        .map(|p| (p.name.clone(), p.default.clone()))
        .collect();

    for (name, value) in overrides {
        let param = parameters
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| CreateError::InvalidParameter {
                strategy: strategy.to_string(),
                parameter: name.clone(),
                reason: "unknown parameter".to_string(),
            })?;
        if !param.allows(value) {
            return Err(CreateError::InvalidParameter {
                strategy: strategy.to_string(),
                parameter: name.clone(),
                reason: format!("'{value}' is not one of {:?}", param.allowed_values),
            });
        }
        values.insert(name.clone(), value.clone());
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Asset – the persisted result of one successful strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Statistic {
    Scalar(f64),
    Array(Vec<f64>),
}

/// Immutable result record of a strategy that executed successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    name: String,
    path: PathBuf,
    uri: String,
    statistics: BTreeMap<String, Statistic>,
}

impl Asset {
    pub fn new(name: impl Into<String>, path: PathBuf, statistics: BTreeMap<String, Statistic>) -> Self {
        let uri = file_uri(&path);
        Asset {
            name: name.into(),
            path,
            uri,
            statistics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn statistics(&self) -> &BTreeMap<String, Statistic> {
        &self.statistics
    }

    pub fn scalar(&self, key: &str) -> Option<f64> {
        match self.statistics.get(key) {
            Some(Statistic::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn array(&self, key: &str) -> Option<&[f64]> {
        match self.statistics.get(key) {
            Some(Statistic::Array(v)) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy – one executable analysis bound to its data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrategyState {
    Created,
    Executing,
    Succeeded,
    Failed,
}

/// A named analysis bound to the providers it was built with.
///
/// A strategy runs at most once: `Created → Executing → Succeeded | Failed`.
/// Only a `Succeeded` strategy has an [`Asset`].
pub trait Strategy: fmt::Debug {
    fn name(&self) -> &str;

    fn state(&self) -> StrategyState;

    /// Run the analysis and persist its report into `store`.
    fn execute(&mut self, store: &ArtifactStore) -> Result<&Asset, StrategyError>;

    fn asset(&self) -> Option<&Asset>;
}

/// Factory and availability check for one kind of [`Strategy`].
pub trait StrategyBuilder: Send + Sync {
    /// Unique registry key; also the name shown to users.
    fn name(&self) -> &str;

    /// Whether the strategy can run on `providers` (primary first).
    fn is_available(&self, providers: &[SharedProvider]) -> bool;

    fn parameters(&self) -> Vec<Parameter>;

    /// Build a strategy bound to `providers`. `values` holds one entry per
    /// parameter, already validated against [`StrategyBuilder::parameters`].
    fn build(
        &self,
        providers: &[SharedProvider],
        values: &ParameterValues,
    ) -> Result<Box<dyn Strategy>, StrategyError>;
}

// ---------------------------------------------------------------------------
// Lifecycle – state bookkeeping shared by implementations
// ---------------------------------------------------------------------------

/// Drives the state machine and holds the asset for a strategy.
#[derive(Debug)]
pub struct Lifecycle {
    name: String,
    state: StrategyState,
    asset: Option<Asset>,
}

impl Lifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Lifecycle {
            name: name.into(),
            state: StrategyState::Created,
            asset: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    /// Execute `work` once, recording success or failure.
    pub fn run(
        &mut self,
        work: impl FnOnce() -> Result<Asset, StrategyError>,
    ) -> Result<&Asset, StrategyError> {
        if self.state != StrategyState::Created {
            return Err(StrategyError::AlreadyExecuted(self.name.clone()));
        }
        self.state = StrategyState::Executing;
        log::info!("executing strategy '{}'", self.name);

        match work() {
            Ok(asset) => {
                self.state = StrategyState::Succeeded;
                log::info!("strategy '{}' wrote {}", self.name, asset.path().display());
                Ok(&*self.asset.insert(asset))
            }
            Err(e) => {
                self.state = StrategyState::Failed;
                log::error!("strategy '{}' failed: {e}", self.name);
                Err(e)
            }
        }
    }
}
