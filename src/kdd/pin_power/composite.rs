use super::{PinPowerAnalysis, PinPowerInput, Section, value_of};
use crate::error::StrategyError;
use crate::kdd::strategy::{Parameter, ParameterValues, Statistic};

/// Sub-analyses, in report order.
const PARTS: [PinPowerAnalysis; 3] = [
    PinPowerAnalysis::Difference,
    PinPowerAnalysis::Axial,
    PinPowerAnalysis::Radial,
];

pub(super) fn toggles() -> Vec<Parameter> {
    PARTS
        .iter()
        .map(|part| Parameter::toggle(part.name(), &format!("Run the {} sub-analysis.", part.name()), true))
        .collect()
}

/// Run every enabled part and merge them under one header. Statistics are
/// keyed `<part stem>.<statistic>`.
pub(super) fn section(input: &PinPowerInput, values: &ParameterValues) -> Result<Section, StrategyError> {
    let mut section = Section::new(PinPowerAnalysis::Composite);
    let (rows, cols) = input.primary.shape();
    section.body.push_str(&format!(
        "Number of Assemblies: {}\nNumber of Axial Levels: {}\nNumber of Pin Rows: {rows}\nNumber of Pin Columns: {cols}\n",
        input.primary.n_assemblies(),
        input.primary.n_axial(),
    ));

    let enabled: Vec<PinPowerAnalysis> = PARTS
        .into_iter()
        .filter(|part| value_of(values, part.name()) == "yes")
        .collect();
    if enabled.is_empty() {
        return Err(StrategyError::NothingEnabled);
    }

    for part in enabled {
        log::info!("running {} sub-analysis", part.name());
        let sub = part.section(input, values)?;
        section.body.push('\n');
        section.body.push_str(&sub.report());
        for (key, stat) in sub.statistics {
            section.statistics.insert(format!("{}.{key}", part.stem()), stat);
        }
    }
    section
        .statistics
        .insert("assemblies".to_string(), Statistic::Scalar(input.primary.n_assemblies() as f64));

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{core_provider, defaults};
    use super::*;

    #[test]
    fn merges_enabled_parts() {
        let providers = [core_provider(2, 2, 2, 2, 2.0), core_provider(2, 2, 2, 2, 2.0)];
        let mut values = defaults(PinPowerAnalysis::Composite);
        values.insert("Axial Power".to_string(), "no".to_string());
        let input = PinPowerInput::gather(&providers, &values, true).unwrap();
        let section = section(&input, &values).unwrap();
        let report = section.report();

        assert!(report.starts_with("Pin Power Analysis\nNumber of Assemblies: 2\nNumber of Axial Levels: 2\n"));
        assert!(report.contains("\nPin Power Difference\n"));
        assert!(report.contains("\nRadial Power\n"));
        assert!(!report.contains("\nAxial Power\n"));
        assert!(section.statistics.contains_key("radial_power.average"));
        assert!(section.statistics.contains_key("pin_power_difference.difference_rms"));
        assert!(!section.statistics.contains_key("axial_power.average"));
    }

    #[test]
    fn nothing_enabled_fails() {
        let providers = [core_provider(1, 1, 1, 1, 1.0), core_provider(1, 1, 1, 1, 1.0)];
        let mut values = defaults(PinPowerAnalysis::Composite);
        for part in PARTS {
            values.insert(part.name().to_string(), "no".to_string());
        }
        let input = PinPowerInput::gather(&providers, &values, true).unwrap();
        assert!(matches!(section(&input, &values), Err(StrategyError::NothingEnabled)));
    }
}
