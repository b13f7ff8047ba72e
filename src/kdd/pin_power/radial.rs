use super::{PinPowerAnalysis, PinPowerInput, Section};
use crate::error::StrategyError;

/// Per-pin reduction over the axial stack, plus the same over the
/// difference against the reference when one is loaded.
pub(super) fn section(input: &PinPowerInput) -> Result<Section, StrategyError> {
    let mut section = Section::new(PinPowerAnalysis::Radial);

    let primary = input.engine.radial(&input.primary)?;
    section.push_grids(&primary.grids);
    section.push_stats("", primary.stats);

    if let Some(diff) = input.difference_set()? {
        let reduced = input.engine.radial(&diff)?;
        section.body.push_str("\nRadial Power Difference\n");
        section.push_grids(&reduced.grids);
        section.push_stats("difference_", reduced.stats);
    }

    Ok(section)
}
