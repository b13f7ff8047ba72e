//! Pin-power analyses of reactor core simulation data.
//!
//! A provider usable by these strategies exposes, at its selected time step:
//!
//! * `"power"` – `n_assemblies × n_axial` equal-shaped matrices, assembly-major;
//! * `"assemblies"` – one 1×1 matrix holding `n_assemblies`;
//! * `"weights"` (optional) – same layout as `"power"`.
//!
//! Without explicit weights, the `Symmetry Type` parameter decides them;
//! `Full` symmetry weighs every pin equally.
//!
//! The first provider is the primary data set, the optional second one the
//! reference that differences are taken against.

mod axial;
mod composite;
mod difference;
mod radial;

use std::collections::BTreeMap;
use std::sync::Arc;

use super::artifact::ArtifactStore;
use super::reduction::{DifferenceKind, PinPowers, WeightedReductionEngine, WeightedStats};
use super::strategy::{
    Asset, Lifecycle, Parameter, ParameterValues, Statistic, Strategy, StrategyBuilder, StrategyState,
};
use crate::data::matrix::Matrix;
use crate::data::model::{DataProvider, SharedProvider};
use crate::error::StrategyError;

pub const POWER_FEATURE: &str = "power";
pub const ASSEMBLIES_FEATURE: &str = "assemblies";
pub const WEIGHTS_FEATURE: &str = "weights";

pub const SYMMETRY_TYPE: &str = "Symmetry Type";
pub const DIFFERENCE_TYPE: &str = "Difference Type";

// ---------------------------------------------------------------------------
// PinPowerAnalysis – the available analyses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPowerAnalysis {
    Radial,
    Axial,
    Difference,
    /// Runs the enabled analyses above and merges them into one report.
    Composite,
}

impl PinPowerAnalysis {
    pub const ALL: [PinPowerAnalysis; 4] = [
        PinPowerAnalysis::Radial,
        PinPowerAnalysis::Axial,
        PinPowerAnalysis::Difference,
        PinPowerAnalysis::Composite,
    ];

    /// Registry name.
    pub fn name(self) -> &'static str {
        match self {
            PinPowerAnalysis::Radial => "Radial Power",
            PinPowerAnalysis::Axial => "Axial Power",
            PinPowerAnalysis::Difference => "Pin Power Difference",
            PinPowerAnalysis::Composite => "Pin Power Analysis",
        }
    }

    /// Canonical artifact file stem.
    pub fn stem(self) -> &'static str {
        match self {
            PinPowerAnalysis::Radial => "radial_power",
            PinPowerAnalysis::Axial => "axial_power",
            PinPowerAnalysis::Difference => "pin_power_difference",
            PinPowerAnalysis::Composite => "pin_power_analysis",
        }
    }

    fn requires_reference(self) -> bool {
        matches!(self, PinPowerAnalysis::Difference | PinPowerAnalysis::Composite)
    }

    fn parameters(self) -> Vec<Parameter> {
        let mut params = vec![
            Parameter::discrete(
                SYMMETRY_TYPE,
                "Reactor symmetry. Dictates the weighting used in the statistics.",
                "Full",
                &["Full"],
            ),
            Parameter::discrete(
                DIFFERENCE_TYPE,
                "How data is compared against the reference.",
                "Basic",
                &["Basic", "Relative"],
            ),
        ];
        if self == PinPowerAnalysis::Composite {
            params.extend(composite::toggles());
        }
        params
    }

    fn section(self, input: &PinPowerInput, values: &ParameterValues) -> Result<Section, StrategyError> {
        match self {
            PinPowerAnalysis::Radial => radial::section(input),
            PinPowerAnalysis::Axial => axial::section(input),
            PinPowerAnalysis::Difference => difference::section(input),
            PinPowerAnalysis::Composite => composite::section(input, values),
        }
    }
}

// ---------------------------------------------------------------------------
// Reading core data from providers
// ---------------------------------------------------------------------------

/// Pin powers (and optional explicit weights) of one provider.
#[derive(Debug, Clone)]
pub struct CoreData {
    pub powers: PinPowers,
    pub weights: Option<PinPowers>,
}

/// Read and partition the pin-power features of `provider`'s current step.
pub fn read_core(provider: &dyn DataProvider) -> Result<CoreData, StrategyError> {
    let n_assemblies = assembly_count(provider)?;
    let powers = PinPowers::partition(require(provider, POWER_FEATURE)?, n_assemblies)?;
    let weights = match provider.data_at(WEIGHTS_FEATURE) {
        Some(w) => {
            let w = PinPowers::partition(w, n_assemblies)?;
            powers.check_layout(&w)?;
            Some(w)
        }
        None => None,
    };
    Ok(CoreData { powers, weights })
}

fn require(provider: &dyn DataProvider, feature: &str) -> Result<Vec<Matrix>, StrategyError> {
    provider
        .data_at(feature)
        .ok_or_else(|| StrategyError::MissingFeature {
            feature: feature.to_string(),
            source_name: provider.source_description(),
        })
}

fn assembly_count(provider: &dyn DataProvider) -> Result<usize, StrategyError> {
    let malformed = |reason: &str| StrategyError::MalformedFeature {
        feature: ASSEMBLIES_FEATURE.to_string(),
        reason: reason.to_string(),
    };
    let matrices = require(provider, ASSEMBLIES_FEATURE)?;
    let value = matrices
        .first()
        .and_then(|m| m.get(0, 0))
        .ok_or_else(|| malformed("expected a 1x1 matrix"))?;
    if value < 1.0 || value.fract() != 0.0 {
        return Err(malformed("must be a positive whole number"));
    }
    Ok(value as usize)
}

// ---------------------------------------------------------------------------
// PinPowerInput – everything a section needs
// ---------------------------------------------------------------------------

pub(crate) struct PinPowerInput {
    pub primary: PinPowers,
    pub reference: Option<PinPowers>,
    pub engine: WeightedReductionEngine,
    pub difference: DifferenceKind,
}

impl PinPowerInput {
    fn gather(
        providers: &[SharedProvider],
        values: &ParameterValues,
        require_reference: bool,
    ) -> Result<Self, StrategyError> {
        let primary_provider = providers
            .first()
            .ok_or_else(|| StrategyError::MissingFeature {
                feature: POWER_FEATURE.to_string(),
                source_name: "<no provider>".to_string(),
            })?;
        let core = read_core(primary_provider.as_ref())?;

        let reference = match providers.get(1) {
            Some(p) => {
                let r = read_core(p.as_ref())?.powers;
                core.powers.check_layout(&r)?;
                Some(r)
            }
            None if require_reference => return Err(StrategyError::ReferenceRequired),
            None => None,
        };

        let weights = match core.weights {
            Some(w) => w,
            None => symmetry_weights(&core.powers, value_of(values, SYMMETRY_TYPE))?,
        };

        let difference_type = value_of(values, DIFFERENCE_TYPE);
        let difference = DifferenceKind::parse(difference_type).ok_or_else(|| StrategyError::Unsupported {
            parameter: DIFFERENCE_TYPE.to_string(),
            value: difference_type.to_string(),
        })?;

        Ok(PinPowerInput {
            primary: core.powers,
            reference,
            engine: WeightedReductionEngine::new(weights),
            difference,
        })
    }

    /// Element-wise difference against the reference, if there is one.
    fn difference_set(&self) -> Result<Option<PinPowers>, StrategyError> {
        match &self.reference {
            Some(r) => Ok(Some(self.primary.difference(r, self.difference)?)),
            None => Ok(None),
        }
    }

    fn require_difference_set(&self) -> Result<PinPowers, StrategyError> {
        self.difference_set()?.ok_or(StrategyError::ReferenceRequired)
    }
}

fn value_of<'a>(values: &'a ParameterValues, name: &str) -> &'a str {
    values.get(name).map(String::as_str).unwrap_or("")
}

fn symmetry_weights(powers: &PinPowers, symmetry: &str) -> Result<PinPowers, StrategyError> {
    match symmetry {
        "Full" => Ok(PinPowers::uniform_like(powers, 1.0)),
        other => Err(StrategyError::Unsupported {
            parameter: SYMMETRY_TYPE.to_string(),
            value: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Section – one titled block of a report
// ---------------------------------------------------------------------------

pub(crate) struct Section {
    pub title: String,
    pub body: String,
    pub statistics: BTreeMap<String, Statistic>,
}

impl Section {
    fn new(kind: PinPowerAnalysis) -> Self {
        Section {
            title: kind.name().to_string(),
            body: String::new(),
            statistics: BTreeMap::new(),
        }
    }

    fn report(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }

    fn push_grids(&mut self, grids: &[Matrix]) {
        for (l, grid) in grids.iter().enumerate() {
            self.body.push_str(&format!("Assembly {l}\n{grid}\n"));
        }
    }

    fn push_stats(&mut self, prefix: &str, stats: WeightedStats) {
        self.body.push_str(&format!("Average: {:.4}\nRMS: {:.4}\n", stats.average, stats.rms));
        self.statistics
            .insert(format!("{prefix}average"), Statistic::Scalar(stats.average));
        self.statistics
            .insert(format!("{prefix}rms"), Statistic::Scalar(stats.rms));
    }
}

// ---------------------------------------------------------------------------
// Builder / strategy
// ---------------------------------------------------------------------------

/// Builder for one [`PinPowerAnalysis`].
#[derive(Debug, Clone)]
pub struct PinPowerBuilder {
    kind: PinPowerAnalysis,
}

impl PinPowerBuilder {
    pub fn new(kind: PinPowerAnalysis) -> Self {
        PinPowerBuilder { kind }
    }
}

impl StrategyBuilder for PinPowerBuilder {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_available(&self, providers: &[SharedProvider]) -> bool {
        let Some(primary) = providers.first() else {
            return false;
        };
        let Ok(core) = read_core(primary.as_ref()) else {
            return false;
        };
        match providers.get(1) {
            Some(reference) => read_core(reference.as_ref())
                .map(|r| core.powers.check_layout(&r.powers).is_ok())
                .unwrap_or(false),
            None => !self.kind.requires_reference(),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.kind.parameters()
    }

    fn build(
        &self,
        providers: &[SharedProvider],
        values: &ParameterValues,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        if self.kind.requires_reference() && providers.len() < 2 {
            return Err(StrategyError::ReferenceRequired);
        }
        Ok(Box::new(PinPowerStrategy {
            kind: self.kind,
            providers: providers.to_vec(),
            values: values.clone(),
            lifecycle: Lifecycle::new(self.kind.name()),
        }))
    }
}

/// A pin-power analysis bound to its providers.
#[derive(Debug)]
pub struct PinPowerStrategy {
    kind: PinPowerAnalysis,
    providers: Vec<SharedProvider>,
    values: ParameterValues,
    lifecycle: Lifecycle,
}

impl Strategy for PinPowerStrategy {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn state(&self) -> StrategyState {
        self.lifecycle.state()
    }

    fn execute(&mut self, store: &ArtifactStore) -> Result<&Asset, StrategyError> {
        let kind = self.kind;
        let providers = &self.providers;
        let values = &self.values;
        self.lifecycle.run(|| {
            let input = PinPowerInput::gather(providers, values, kind.requires_reference())?;
            let section = kind.section(&input, values)?;
            let path = store.persist(kind.stem(), &section.report())?;
            Ok(Asset::new(kind.name(), path, section.statistics))
        })
    }

    fn asset(&self) -> Option<&Asset> {
        self.lifecycle.asset()
    }
}

/// One builder per [`PinPowerAnalysis`].
pub fn default_builders() -> Vec<Arc<dyn StrategyBuilder>> {
    PinPowerAnalysis::ALL
        .iter()
        .map(|&kind| Arc::new(PinPowerBuilder::new(kind)) as Arc<dyn StrategyBuilder>)
        .collect()
}
