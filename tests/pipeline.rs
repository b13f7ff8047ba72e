use std::sync::Arc;

use reactor_kdd::data::loader;
use reactor_kdd::{
    AnalysisDocument, ArtifactStore, DataProvider, DocumentState, Matrix, ParameterValues,
    SharedProvider, Strategy, StrategyRegistry, StrategyState, TimeSeriesProvider,
};

const EPS: f64 = 1e-9;

fn core(value: f64) -> SharedProvider {
    Arc::new(
        TimeSeriesProvider::new(format!("core {value}"))
            .with_series(0.0, "assemblies", vec![Matrix::filled(1, 1, 2.0)])
            .with_series(0.0, "power", vec![Matrix::filled(2, 2, value); 4]),
    )
}

fn document(dir: &std::path::Path) -> AnalysisDocument {
    AnalysisDocument::new(StrategyRegistry::with_defaults(), ArtifactStore::new(dir))
}

#[test]
fn uniform_core_against_identical_reference() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = document(dir.path());
    doc.load_primary(core(2.0)).unwrap();
    doc.load_reference(core(2.0)).unwrap();
    assert_eq!(doc.state(), DocumentState::Ready);

    doc.set_selection(&["Radial Power"]);
    assert_eq!(doc.create_selected_assets(), 1);

    let asset = &doc.assets()[0];
    assert!((asset.scalar("average").unwrap() - 2f64.sqrt()).abs() < EPS);
    assert!((asset.scalar("rms").unwrap() - 2f64.sqrt()).abs() < EPS);
    assert_eq!(asset.scalar("difference_average"), Some(0.0));
    assert_eq!(asset.scalar("difference_rms"), Some(0.0));
    assert!(asset.uri().starts_with("file://"));

    let report = std::fs::read_to_string(asset.path()).unwrap();
    assert!(report.contains("Average: 1.4142\nRMS: 1.4142\n"));
}

#[test]
fn availability_depends_on_reference() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = document(dir.path());
    assert!(doc.available_asset_names().is_empty());

    doc.load_primary(core(1.0)).unwrap();
    assert_eq!(doc.available_asset_names(), &["Axial Power", "Radial Power"]);
    assert!(doc.properties_for("Pin Power Difference").is_none());

    doc.load_reference(core(0.5)).unwrap();
    assert_eq!(doc.available_asset_names().len(), 4);
    let params = doc.properties_for("Pin Power Analysis").unwrap();
    assert!(params.iter().any(|p| p.name == "Axial Power"));
}

#[test]
fn failures_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = document(dir.path());
    doc.load_primary(core(1.0)).unwrap();
    doc.set_selection(&["Radial Power", "Not Registered", "Axial Power"]);

    assert_eq!(doc.create_selected_assets(), 2);
    let names: Vec<&str> = doc.assets().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["Radial Power", "Axial Power"]);
}

#[test]
fn repeated_runs_never_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = document(dir.path());
    doc.load_primary(core(1.0)).unwrap();
    doc.set_selection(&["Radial Power"]);

    doc.create_selected_assets();
    let first = doc.assets()[0].path().to_path_buf();
    doc.create_selected_assets();
    let second = doc.assets()[0].path().to_path_buf();

    assert_eq!(first.file_name().unwrap(), "radial_power.txt");
    assert_eq!(second.file_name().unwrap(), "radial_power_1.txt");
    assert!(first.exists() && second.exists());
}

#[test]
fn parameter_overrides_reach_the_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = document(dir.path());
    doc.load_primary(core(3.0)).unwrap();
    doc.load_reference(core(2.0)).unwrap();
    doc.set_parameter("Pin Power Difference", "Difference Type", "Relative").unwrap();
    assert!(doc.set_parameter("Pin Power Difference", "Symmetry Type", "Quarter").is_err());

    doc.set_selection(&["Pin Power Difference"]);
    assert_eq!(doc.create_selected_assets(), 1);
    assert!((doc.assets()[0].scalar("difference_average").unwrap() - 0.5).abs() < EPS);
}

#[test]
fn json_file_through_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("core.json");
    std::fs::write(
        &path,
        r#"{
            "source": "two steps",
            "steps": [
                { "time": 0.0, "features": {
                    "assemblies": [{ "rows": 1, "cols": 1, "values": [1.0] }],
                    "power": [{ "rows": 1, "cols": 1, "values": [4.0] }]
                } },
                { "time": 10.0, "features": {
                    "assemblies": [{ "rows": 1, "cols": 1, "values": [1.0] }],
                    "power": [{ "rows": 1, "cols": 1, "values": [9.0] }]
                } }
            ]
        }"#,
    )
    .unwrap();

    let provider = loader::load_file(&path).unwrap();
    assert!(provider.select_time(10.0));
    assert!(!provider.select_time(5.0));

    let mut doc = document(&dir.path().join("out"));
    doc.load_primary(Arc::new(provider)).unwrap();
    doc.set_selection(&["Radial Power"]);
    assert_eq!(doc.create_selected_assets(), 1);
    assert!((doc.assets()[0].scalar("average").unwrap() - 3.0).abs() < EPS);
}

#[test]
fn unwritable_store_fails_the_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "occupied").unwrap();

    let mut doc = document(&blocker);
    doc.load_primary(core(2.0)).unwrap();
    doc.set_selection(&["Radial Power"]);
    assert_eq!(doc.create_selected_assets(), 0);
    assert!(doc.assets().is_empty());
    assert_eq!(doc.state(), DocumentState::PrimaryLoaded);

    let providers = [core(2.0)];
    let mut strategy = doc
        .registry()
        .create("Radial Power", &providers, &ParameterValues::new())
        .unwrap();
    assert!(strategy.execute(doc.store()).is_err());
    assert_eq!(strategy.state(), StrategyState::Failed);
    assert!(strategy.asset().is_none());
}
