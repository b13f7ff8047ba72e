use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use reactor_kdd::config::KddConfig;
use reactor_kdd::data::loader;
use reactor_kdd::{AnalysisDocument, ArtifactStore, DataProvider, SharedProvider, StrategyRegistry};

const USAGE: &str = "\
usage: reactor-kdd [--config FILE] [--out DIR] [--time T] [--strategy NAME]...
                   [--set NAME:KEY=VALUE]... [--list] PRIMARY [REFERENCE]";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    time: Option<f64>,
    strategies: Vec<String>,
    overrides: Vec<(String, String, String)>,
    list: bool,
    inputs: Vec<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        let mut value = |flag: &str| raw.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--out" => args.out = Some(PathBuf::from(value("--out")?)),
            "--time" => {
                let t = value("--time")?;
                args.time = Some(t.parse().with_context(|| format!("invalid time '{t}'"))?);
            }
            "--strategy" => args.strategies.push(value("--strategy")?),
            "--set" => args.overrides.push(parse_override(&value("--set")?)?),
            "--list" => args.list = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ => args.inputs.push(PathBuf::from(&arg)),
        }
    }
    if args.inputs.is_empty() || args.inputs.len() > 2 {
        bail!("expected a primary file and an optional reference file\n{USAGE}");
    }
    Ok(args)
}

/// `NAME:KEY=VALUE` → `(NAME, KEY, VALUE)`.
fn parse_override(text: &str) -> Result<(String, String, String)> {
    let (strategy, rest) = text
        .split_once(':')
        .with_context(|| format!("expected NAME:KEY=VALUE, got '{text}'"))?;
    let (key, value) = rest
        .split_once('=')
        .with_context(|| format!("expected NAME:KEY=VALUE, got '{text}'"))?;
    Ok((strategy.to_string(), key.to_string(), value.to_string()))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn load(path: &Path, time: Option<f64>) -> Result<SharedProvider> {
    let provider = loader::load_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    if let Some(t) = time {
        if !provider.select_time(t) {
            bail!("{} has no time step at {t}", path.display());
        }
    }
    Ok(Arc::new(provider))
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = KddConfig::load(args.config.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();

    let out = args.out.clone().unwrap_or_else(|| config.output.dir.clone());
    let mut doc = AnalysisDocument::new(StrategyRegistry::with_defaults(), ArtifactStore::new(out));

    doc.load_primary(load(&args.inputs[0], args.time)?)?;
    if let Some(reference) = args.inputs.get(1) {
        doc.load_reference(load(reference, args.time)?)?;
    }

    if args.list {
        for name in doc.available_asset_names() {
            println!("{name}");
        }
        return Ok(());
    }

    // Config parameters first so command-line values win.
    for (strategy, values) in &config.strategies.parameters {
        for (key, value) in values {
            if let Err(e) = doc.set_parameter(strategy, key, value) {
                log::warn!("ignoring configured parameter: {e}");
            }
        }
    }
    for (strategy, key, value) in &args.overrides {
        doc.set_parameter(strategy, key, value)?;
    }

    let selection = if !args.strategies.is_empty() {
        args.strategies.clone()
    } else if !config.strategies.selected.is_empty() {
        config.strategies.selected.clone()
    } else {
        doc.available_asset_names().to_vec()
    };
    if !doc.set_selection(&selection) {
        bail!("no strategies are available for the loaded data");
    }

    let created = doc.create_selected_assets();
    log::info!("{created} asset(s) written to {}", doc.store().root().display());
    println!("{}", serde_json::to_string_pretty(doc.assets())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_inputs() {
        let a = args(&[
            "--out", "reports", "--time", "1.5", "--strategy", "Radial Power",
            "--set", "Radial Power:Difference Type=Relative", "p.json", "r.json",
        ])
        .unwrap();
        assert_eq!(a.out, Some(PathBuf::from("reports")));
        assert_eq!(a.time, Some(1.5));
        assert_eq!(a.strategies, vec!["Radial Power"]);
        assert_eq!(
            a.overrides,
            vec![("Radial Power".into(), "Difference Type".into(), "Relative".into())]
        );
        assert_eq!(a.inputs.len(), 2);
    }

    #[test]
    fn rejects_bad_command_lines() {
        assert!(args(&[]).is_err());
        assert!(args(&["a", "b", "c"]).is_err());
        assert!(args(&["--bogus", "a"]).is_err());
        assert!(args(&["a", "--time"]).is_err());
        assert!(args(&["--set", "no-colon", "a"]).is_err());
    }
}
