use std::collections::BTreeMap;
use std::sync::Arc;

use super::artifact::ArtifactStore;
use super::registry::{Availability, StrategyRegistry};
use super::strategy::{Asset, Parameter, ParameterValues, StrategyBuilder};
use crate::data::model::SharedProvider;
use crate::error::{CreateError, DocumentError};

// ---------------------------------------------------------------------------
// Document state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Empty,
    PrimaryLoaded,
    /// Primary and reference data are loaded.
    Ready,
    HasAssets,
}

// ---------------------------------------------------------------------------
// AnalysisDocument
// ---------------------------------------------------------------------------

/// Orchestrates loading data, choosing strategies, and creating assets.
///
/// The document owns its registry and artifact store. Loading data (or
/// changing the registry through the document) recomputes which strategies
/// are available; the user's selection is kept as-is and only checked again
/// when assets are created.
pub struct AnalysisDocument {
    registry: StrategyRegistry,
    store: ArtifactStore,
    primary: Option<SharedProvider>,
    reference: Option<SharedProvider>,
    available: Vec<String>,
    selection: Vec<String>,
    overrides: BTreeMap<String, ParameterValues>,
    assets: Vec<Asset>,
}

impl AnalysisDocument {
    pub fn new(registry: StrategyRegistry, store: ArtifactStore) -> Self {
        AnalysisDocument {
            registry,
            store,
            primary: None,
            reference: None,
            available: Vec::new(),
            selection: Vec::new(),
            overrides: BTreeMap::new(),
            assets: Vec::new(),
        }
    }

    pub fn state(&self) -> DocumentState {
        if !self.assets.is_empty() {
            DocumentState::HasAssets
        } else if self.primary.is_none() {
            DocumentState::Empty
        } else if self.reference.is_none() {
            DocumentState::PrimaryLoaded
        } else {
            DocumentState::Ready
        }
    }

    pub fn load_primary(&mut self, provider: SharedProvider) -> Result<(), DocumentError> {
        check_provider(&provider)?;
        log::info!("loaded primary data from {}", provider.source_description());
        self.primary = Some(provider);
        self.refresh_availability();
        Ok(())
    }

    pub fn load_reference(&mut self, provider: SharedProvider) -> Result<(), DocumentError> {
        check_provider(&provider)?;
        log::info!("loaded reference data from {}", provider.source_description());
        self.reference = Some(provider);
        self.refresh_availability();
        Ok(())
    }

    pub fn primary(&self) -> Option<&SharedProvider> {
        self.primary.as_ref()
    }

    pub fn reference(&self) -> Option<&SharedProvider> {
        self.reference.as_ref()
    }

    /// `[primary]`, plus the reference when loaded.
    fn providers(&self) -> Vec<SharedProvider> {
        self.primary
            .iter()
            .chain(self.reference.iter())
            .cloned()
            .collect()
    }

    /// Recompute the cached availability list for the loaded data.
    pub fn refresh_availability(&mut self) {
        if self.primary.is_none() {
            self.available.clear();
            return;
        }
        let providers = self.providers();
        self.available = match self.registry.available_strategies(&providers) {
            Availability::NoBuilders => {
                log::warn!("no strategy builders are registered");
                Vec::new()
            }
            Availability::Available(names) => names,
        };
    }

    pub fn available_asset_names(&self) -> &[String] {
        &self.available
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn register_builder(&mut self, builder: Arc<dyn StrategyBuilder>) {
        self.registry.register(builder);
        self.refresh_availability();
    }

    pub fn unregister_builder(&mut self, name: &str) {
        self.registry.unregister(name);
        self.refresh_availability();
    }

    pub fn properties_for(&self, name: &str) -> Option<Vec<Parameter>> {
        self.registry.properties_for(name)
    }

    /// Replace the selection. An empty list is ignored and `false` returned.
    pub fn set_selection<S: AsRef<str>>(&mut self, names: &[S]) -> bool {
        if names.is_empty() {
            log::debug!("ignoring empty selection");
            return false;
        }
        self.selection = names.iter().map(|n| n.as_ref().to_string()).collect();
        true
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Override one parameter of an available strategy for later creation
    /// passes.
    pub fn set_parameter(&mut self, strategy: &str, name: &str, value: &str) -> Result<(), CreateError> {
        let params = self
            .properties_for(strategy)
            .ok_or_else(|| CreateError::Unavailable(strategy.to_string()))?;
        let invalid = |reason: String| CreateError::InvalidParameter {
            strategy: strategy.to_string(),
            parameter: name.to_string(),
            reason,
        };
        let param = params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| invalid("unknown parameter".to_string()))?;
        if !param.allows(value) {
            return Err(invalid(format!("'{value}' is not one of {:?}", param.allowed_values)));
        }
        self.overrides
            .entry(strategy.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn parameter_overrides(&self, strategy: &str) -> Option<&ParameterValues> {
        self.overrides.get(strategy)
    }

    /// Create, execute, and collect a fresh asset for every selected name.
    ///
    /// Without primary data this does nothing and the previous assets stay.
    /// Otherwise the asset list is replaced by the assets of the strategies
    /// that were created and executed successfully; failures are logged and
    /// skipped. Returns the number of assets now held.
    pub fn create_selected_assets(&mut self) -> usize {
        if self.primary.is_none() {
            log::warn!("no primary data loaded; keeping {} existing asset(s)", self.assets.len());
            return self.assets.len();
        }
        let providers = self.providers();
        let empty = ParameterValues::new();
        let mut assets = Vec::with_capacity(self.selection.len());

        for name in &self.selection {
            let overrides = self.overrides.get(name).unwrap_or(&empty);
            let mut strategy = match self.registry.create(name, &providers, overrides) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("skipping '{name}': {e}");
                    continue;
                }
            };
            match strategy.execute(&self.store) {
                Ok(asset) => assets.push(asset.clone()),
                Err(e) => log::warn!("no asset for '{name}': {e}"),
            }
        }

        log::info!("created {} of {} selected asset(s)", assets.len(), self.selection.len());
        self.assets = assets;
        self.assets.len()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

fn check_provider(provider: &SharedProvider) -> Result<(), DocumentError> {
    if provider.time_step_count() == 0 {
        return Err(DocumentError::EmptyProvider(provider.source_description()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TimeSeriesProvider;
    use crate::kdd::registry::tests::fixed;

    fn document(dir: &std::path::Path) -> AnalysisDocument {
        let mut registry = StrategyRegistry::new();
        registry.register(fixed("A", true));
        registry.register(fixed("B", true));
        registry.register(fixed("C", false));
        AnalysisDocument::new(registry, ArtifactStore::new(dir))
    }

    fn provider(name: &str) -> SharedProvider {
        Arc::new(TimeSeriesProvider::new(name).with_series(0.0, "x", vec![]))
    }

    #[test]
    fn state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        assert_eq!(doc.state(), DocumentState::Empty);
        assert!(doc.available_asset_names().is_empty());

        doc.load_primary(provider("p")).unwrap();
        assert_eq!(doc.state(), DocumentState::PrimaryLoaded);
        assert_eq!(doc.available_asset_names(), &["A".to_string(), "B".to_string()]);

        doc.load_reference(provider("r")).unwrap();
        assert_eq!(doc.state(), DocumentState::Ready);

        doc.set_selection(&["A"]);
        assert_eq!(doc.create_selected_assets(), 1);
        assert_eq!(doc.state(), DocumentState::HasAssets);
    }

    #[test]
    fn empty_provider_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        let err = doc.load_primary(Arc::new(TimeSeriesProvider::new("none")));
        assert_eq!(err, Err(DocumentError::EmptyProvider("none".to_string())));
        assert_eq!(doc.state(), DocumentState::Empty);
    }

    #[test]
    fn empty_selection_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        assert!(doc.set_selection(&["A", "B"]));
        assert!(!doc.set_selection::<&str>(&[]));
        assert_eq!(doc.selection(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn selection_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        doc.load_primary(provider("p")).unwrap();
        doc.set_selection(&["A", "C"]);
        doc.load_primary(provider("q")).unwrap();
        assert_eq!(doc.selection().len(), 2);
    }

    #[test]
    fn failures_are_skipped_and_assets_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        doc.load_primary(provider("p")).unwrap();
        doc.set_selection(&["A", "B", "missing"]);
        assert_eq!(doc.create_selected_assets(), 2);

        doc.set_selection(&["B"]);
        assert_eq!(doc.create_selected_assets(), 1);
        assert_eq!(doc.assets()[0].name(), "B");
    }

    #[test]
    fn no_primary_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        doc.set_selection(&["A"]);
        assert_eq!(doc.create_selected_assets(), 0);
        assert_eq!(doc.selection(), &["A".to_string()]);
        assert_eq!(doc.state(), DocumentState::Empty);
    }

    #[test]
    fn parameters_only_for_available_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        assert!(matches!(doc.set_parameter("A", "Verbose", "yes"), Err(CreateError::Unavailable(_))));

        doc.load_primary(provider("p")).unwrap();
        doc.set_parameter("A", "Verbose", "yes").unwrap();
        assert_eq!(doc.parameter_overrides("A").unwrap()["Verbose"], "yes");
        assert!(doc.set_parameter("A", "Verbose", "loud").is_err());
        assert!(doc.set_parameter("A", "Colour", "red").is_err());
        assert!(matches!(doc.set_parameter("C", "Verbose", "yes"), Err(CreateError::Unavailable(_))));
    }

    #[test]
    fn registering_through_document_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path());
        doc.load_primary(provider("p")).unwrap();
        doc.register_builder(fixed("D", true));
        assert!(doc.available_asset_names().contains(&"D".to_string()));
        doc.unregister_builder("A");
        assert!(!doc.available_asset_names().contains(&"A".to_string()));
    }
}
