use super::{PinPowerAnalysis, PinPowerInput, Section};
use crate::data::matrix::Matrix;
use crate::error::StrategyError;
use crate::kdd::strategy::Statistic;

/// Per-level reduction over the pin plane; one profile line per assembly.
pub(super) fn section(input: &PinPowerInput) -> Result<Section, StrategyError> {
    let mut section = Section::new(PinPowerAnalysis::Axial);

    let primary = input.engine.axial(&input.primary)?;
    push_profiles(&mut section, &primary.profiles);
    section.push_stats("", primary.stats);
    section.statistics.insert(
        "profile".to_string(),
        Statistic::Array(primary.profiles.elements().to_vec()),
    );

    if let Some(diff) = input.difference_set()? {
        let reduced = input.engine.axial(&diff)?;
        section.body.push_str("\nAxial Power Difference\n");
        push_profiles(&mut section, &reduced.profiles);
        section.push_stats("difference_", reduced.stats);
        section.statistics.insert(
            "difference_profile".to_string(),
            Statistic::Array(reduced.profiles.elements().to_vec()),
        );
    }

    Ok(section)
}

fn push_profiles(section: &mut Section, profiles: &Matrix) {
    for l in 0..profiles.rows() {
        if let Some(row) = profiles.row(l) {
            section.body.push_str(&format!("Assembly {l}\n{row}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{core_provider, defaults};
    use super::*;

    #[test]
    fn profile_has_one_value_per_level() {
        let providers = [core_provider(2, 3, 2, 2, 4.0)];
        let input = PinPowerInput::gather(&providers, &defaults(PinPowerAnalysis::Axial), false).unwrap();
        let section = section(&input).unwrap();

        let Some(Statistic::Array(profile)) = section.statistics.get("profile") else {
            panic!("missing profile");
        };
        assert_eq!(profile.len(), 6);
        assert!(profile.iter().all(|&v| (v - 2.0).abs() < 1e-12));
        assert!(section.report().contains("Assembly 1\n2.0000 2.0000 2.0000\n"));
        assert!(!section.statistics.contains_key("difference_average"));
    }
}
