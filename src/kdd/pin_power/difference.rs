use super::{PinPowerAnalysis, PinPowerInput, Section};
use crate::error::StrategyError;

/// Element-wise difference grids for every assembly and axial level, with
/// weighted statistics of the raw differences.
pub(super) fn section(input: &PinPowerInput) -> Result<Section, StrategyError> {
    let mut section = Section::new(PinPowerAnalysis::Difference);
    let diff = input.require_difference_set()?;

    for (l, stack) in diff.assemblies().iter().enumerate() {
        for (k, grid) in stack.iter().enumerate() {
            section
                .body
                .push_str(&format!("Assembly {l}, Axial Level {k}\n{grid}\n"));
        }
    }
    let stats = input.engine.pointwise(&diff)?;
    section.push_stats("difference_", stats);

    Ok(section)
}
