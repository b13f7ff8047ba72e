use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::pin_power;
use super::strategy::{Parameter, ParameterValues, Strategy, StrategyBuilder, resolve_parameters};
use crate::data::model::SharedProvider;
use crate::error::CreateError;

/// Outcome of an availability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The registry holds no builders at all.
    NoBuilders,
    /// Names whose predicate accepted the data, sorted; may be empty.
    Available(Vec<String>),
}

impl Availability {
    pub fn names(&self) -> &[String] {
        match self {
            Availability::NoBuilders => &[],
            Availability::Available(names) => names,
        }
    }
}

// ---------------------------------------------------------------------------
// StrategyRegistry
// ---------------------------------------------------------------------------

/// Name → [`StrategyBuilder`] mapping. Registering a name again replaces
/// the previous builder.
#[derive(Default)]
pub struct StrategyRegistry {
    builders: BTreeMap<String, Arc<dyn StrategyBuilder>>,
    /// Result of the last availability query; `None` until one has run.
    last_available: Option<BTreeSet<String>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in pin-power builder.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for builder in pin_power::default_builders() {
            registry.register(builder);
        }
        registry
    }

    /// Insert or replace the builder keyed by its name. Unnamed builders
    /// are ignored.
    pub fn register(&mut self, builder: Arc<dyn StrategyBuilder>) {
        let name = builder.name().to_string();
        if name.is_empty() {
            log::warn!("ignoring strategy builder without a name");
            return;
        }
        if self.builders.insert(name.clone(), builder).is_some() {
            log::debug!("replaced strategy builder '{name}'");
        } else {
            log::debug!("registered strategy builder '{name}'");
        }
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn StrategyBuilder>> {
        let removed = self.builders.remove(name);
        if removed.is_some() {
            log::debug!("unregistered strategy builder '{name}'");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Ask every builder whether it can run on `providers` and remember the
    /// answer for [`StrategyRegistry::properties_for`].
    pub fn available_strategies(&mut self, providers: &[SharedProvider]) -> Availability {
        if self.builders.is_empty() {
            self.last_available = Some(BTreeSet::new());
            return Availability::NoBuilders;
        }
        let names: BTreeSet<String> = self
            .builders
            .iter()
            .filter(|(_, b)| b.is_available(providers))
            .map(|(name, _)| name.clone())
            .collect();
        log::debug!("{} of {} strategies available", names.len(), self.builders.len());
        let list = names.iter().cloned().collect();
        self.last_available = Some(names);
        Availability::Available(list)
    }

    /// The set computed by the last [`StrategyRegistry::available_strategies`].
    pub fn last_available(&self) -> Option<&BTreeSet<String>> {
        self.last_available.as_ref()
    }

    /// Parameters of `name`, only while it is in the last availability set
    /// and still registered.
    pub fn properties_for(&self, name: &str) -> Option<Vec<Parameter>> {
        if !self.last_available.as_ref()?.contains(name) {
            return None;
        }
        self.builders.get(name).map(|b| b.parameters())
    }

    /// Build the strategy `name` bound to `providers`, with `overrides`
    /// applied over the builder's parameter defaults.
    pub fn create(
        &self,
        name: &str,
        providers: &[SharedProvider],
        overrides: &ParameterValues,
    ) -> Result<Box<dyn Strategy>, CreateError> {
        if providers.is_empty() {
            return Err(CreateError::NoProviders);
        }
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| CreateError::UnknownStrategy(name.to_string()))?;
        let values = resolve_parameters(name, &builder.parameters(), overrides)?;
        builder
            .build(providers, &values)
            .map_err(|source| CreateError::Build {
                name: name.to_string(),
                source,
            })
    }
}
