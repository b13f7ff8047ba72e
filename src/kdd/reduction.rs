//! Weighted reductions over axially stacked pin-power grids.
//!
//! Input is a rank-4 tensor `value[l][k][i][j]`: assembly `l`, axial level
//! `k`, pin row `i`, pin column `j`, with an equal-shaped weight tensor.
//!
//! * **Radial** reduction collapses the axial direction per pin cell:
//!   `sqrt(|Σ_k v·w / Σ_k w|)`, one `R × C` grid per assembly.
//! * **Axial** reduction collapses the pin plane per axial level:
//!   `sqrt(|Σ_ij v·w / Σ_ij w|)`, one profile per assembly.
//!
//! Global statistics are accumulated over every reduced cell, weighted by
//! the total weight that went into that cell. Taking the absolute value
//! before each square root is deliberate: accumulated round-off can leave a
//! tiny negative where the exact result is zero.

use serde::Serialize;

use crate::data::matrix::Matrix;
use crate::error::ReductionError;

// ---------------------------------------------------------------------------
// DifferenceKind
// ---------------------------------------------------------------------------

/// How a primary value is compared against its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// `primary − reference`
    Basic,
    /// `(primary − reference) / reference`; zero reference cells give 0.
    Relative,
}

impl DifferenceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Basic" => Some(DifferenceKind::Basic),
            "Relative" => Some(DifferenceKind::Relative),
            _ => None,
        }
    }

    fn apply(self, primary: f64, reference: f64) -> f64 {
        match self {
            DifferenceKind::Basic => primary - reference,
            DifferenceKind::Relative if reference == 0.0 => 0.0,
            DifferenceKind::Relative => (primary - reference) / reference,
        }
    }
}

// ---------------------------------------------------------------------------
// PinPowers – [assembly][axial] stacks of equal-shaped matrices
// ---------------------------------------------------------------------------

/// Pin-power matrices grouped per assembly, each an ordered axial stack.
///
/// Every assembly has the same number of axial levels and every matrix the
/// same shape; construction rejects anything else with
/// [`ReductionError::ShapeMismatch`] or [`ReductionError::Layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct PinPowers {
    assemblies: Vec<Vec<Matrix>>,
}

impl PinPowers {
    pub fn new(assemblies: Vec<Vec<Matrix>>) -> Result<Self, ReductionError> {
        let first = assemblies
            .first()
            .and_then(|a| a.first())
            .ok_or(ReductionError::Empty)?;
        let shape = first.shape();
        let n_axial = assemblies[0].len();

        for (l, stack) in assemblies.iter().enumerate() {
            if stack.len() != n_axial {
                return Err(ReductionError::Layout {
                    expected_assemblies: assemblies.len(),
                    expected_axial: n_axial,
                    found_assemblies: assemblies.len(),
                    found_axial: stack.len(),
                });
            }
            for (k, m) in stack.iter().enumerate() {
                if m.shape() != shape {
                    return Err(ReductionError::ShapeMismatch {
                        assembly: l,
                        axial: k,
                        expected: shape,
                        found: m.shape(),
                    });
                }
            }
        }
        Ok(PinPowers { assemblies })
    }

    /// Split an assembly-major flat list (all axial levels of assembly 0,
    /// then assembly 1, …) into `n_assemblies` equal stacks.
    pub fn partition(matrices: Vec<Matrix>, n_assemblies: usize) -> Result<Self, ReductionError> {
        if n_assemblies == 0 || matrices.is_empty() || matrices.len() % n_assemblies != 0 {
            return Err(ReductionError::Partition {
                matrices: matrices.len(),
                assemblies: n_assemblies,
            });
        }
        let n_axial = matrices.len() / n_assemblies;
        let mut assemblies = Vec::with_capacity(n_assemblies);
        let mut iter = matrices.into_iter();
        for _ in 0..n_assemblies {
            assemblies.push(iter.by_ref().take(n_axial).collect());
        }
        Self::new(assemblies)
    }

    /// A tensor with the same layout as `like`, every cell set to `value`.
    pub fn uniform_like(like: &PinPowers, value: f64) -> Self {
        let (rows, cols) = like.shape();
        PinPowers {
            assemblies: vec![vec![Matrix::filled(rows, cols, value); like.n_axial()]; like.n_assemblies()],
        }
    }

    pub fn n_assemblies(&self) -> usize {
        self.assemblies.len()
    }

    pub fn n_axial(&self) -> usize {
        self.assemblies[0].len()
    }

    /// `(rows, cols)` of every matrix.
    pub fn shape(&self) -> (usize, usize) {
        self.assemblies[0][0].shape()
    }

    pub fn assemblies(&self) -> &[Vec<Matrix>] {
        &self.assemblies
    }

    /// Fail unless `other` has the same assembly/axial/shape layout.
    pub fn check_layout(&self, other: &PinPowers) -> Result<(), ReductionError> {
        if self.n_assemblies() != other.n_assemblies() || self.n_axial() != other.n_axial() {
            return Err(ReductionError::Layout {
                expected_assemblies: self.n_assemblies(),
                expected_axial: self.n_axial(),
                found_assemblies: other.n_assemblies(),
                found_axial: other.n_axial(),
            });
        }
        if self.shape() != other.shape() {
            return Err(ReductionError::ShapeMismatch {
                assembly: 0,
                axial: 0,
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// Element-wise difference against `reference`.
    pub fn difference(&self, reference: &PinPowers, kind: DifferenceKind) -> Result<PinPowers, ReductionError> {
        self.check_layout(reference)?;
        let assemblies = self
            .assemblies
            .iter()
            .zip(&reference.assemblies)
            .map(|(ours, theirs)| {
                ours.iter()
                    .zip(theirs)
                    .map(|(p, r)| p.zip_map(r, |a, b| kind.apply(a, b)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PinPowers { assemblies })
    }
}

// ---------------------------------------------------------------------------
// Accumulator / WeightedStats
// ---------------------------------------------------------------------------

/// Weighted average and RMS of a reduced data set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeightedStats {
    pub average: f64,
    pub rms: f64,
}

/// Running sums for a weighted mean and mean square.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    weighted: f64,
    weighted_sq: f64,
    weight: f64,
}

impl Accumulator {
    fn push(&mut self, x: f64, w: f64) {
        self.weighted += x * w;
        self.weighted_sq += x * x * w;
        self.weight += w;
    }

    /// Zero total weight yields zero statistics.
    fn finish(&self) -> WeightedStats {
        if self.weight == 0.0 {
            return WeightedStats::default();
        }
        WeightedStats {
            average: (self.weighted / self.weight).abs(),
            rms: (self.weighted_sq / self.weight).abs().sqrt(),
        }
    }
}

/// `sqrt(|sum / weight|)`, or 0 when nothing was weighted.
fn weighted_root(sum: f64, weight: f64) -> f64 {
    if weight == 0.0 {
        0.0
    } else {
        (sum / weight).abs().sqrt()
    }
}

// ---------------------------------------------------------------------------
// Reduction results
// ---------------------------------------------------------------------------

/// One in-plane grid per assembly plus global statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialReduction {
    pub grids: Vec<Matrix>,
    pub stats: WeightedStats,
}

/// `n_assemblies × n_axial` profile matrix plus global statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AxialReduction {
    pub profiles: Matrix,
    pub stats: WeightedStats,
}

// ---------------------------------------------------------------------------
// WeightedReductionEngine
// ---------------------------------------------------------------------------

/// Runs weighted reductions of pin-power tensors against a fixed weight tensor.
#[derive(Debug, Clone)]
pub struct WeightedReductionEngine {
    weights: PinPowers,
}

impl WeightedReductionEngine {
    pub fn new(weights: PinPowers) -> Self {
        WeightedReductionEngine { weights }
    }

    /// Collapse the axial direction of every pin cell.
    pub fn radial(&self, values: &PinPowers) -> Result<RadialReduction, ReductionError> {
        self.weights.check_layout(values)?;
        let (rows, cols) = values.shape();
        let mut acc = Accumulator::default();
        let mut grids = Vec::with_capacity(values.n_assemblies());

        for (stack, weights) in values.assemblies.iter().zip(&self.weights.assemblies) {
            let mut grid = Matrix::zeros(rows, cols);
            for i in 0..rows {
                for j in 0..cols {
                    let (mut sum, mut weight) = (0.0, 0.0);
                    for (v, w) in stack.iter().zip(weights) {
                        sum += v[(i, j)] * w[(i, j)];
                        weight += w[(i, j)];
                    }
                    let cell = weighted_root(sum, weight);
                    grid[(i, j)] = cell;
                    acc.push(cell, weight);
                }
            }
            grids.push(grid);
        }

        Ok(RadialReduction {
            grids,
            stats: acc.finish(),
        })
    }

    /// Collapse the pin plane of every axial level.
    pub fn axial(&self, values: &PinPowers) -> Result<AxialReduction, ReductionError> {
        self.weights.check_layout(values)?;
        let mut acc = Accumulator::default();
        let mut profiles = Matrix::zeros(values.n_assemblies(), values.n_axial());

        for (l, (stack, weights)) in values.assemblies.iter().zip(&self.weights.assemblies).enumerate() {
            for (k, (v, w)) in stack.iter().zip(weights).enumerate() {
                let (mut sum, mut weight) = (0.0, 0.0);
                for (&x, &wx) in v.elements().iter().zip(w.elements()) {
                    sum += x * wx;
                    weight += wx;
                }
                let level = weighted_root(sum, weight);
                profiles[(l, k)] = level;
                acc.push(level, weight);
            }
        }

        Ok(AxialReduction {
            profiles,
            stats: acc.finish(),
        })
    }

    /// Weighted average/RMS of the raw cell values, without any collapse.
    pub fn pointwise(&self, values: &PinPowers) -> Result<WeightedStats, ReductionError> {
        self.weights.check_layout(values)?;
        let mut acc = Accumulator::default();
        for (stack, weights) in values.assemblies.iter().zip(&self.weights.assemblies) {
            for (v, w) in stack.iter().zip(weights) {
                for (&x, &wx) in v.elements().iter().zip(w.elements()) {
                    acc.push(x, wx);
                }
            }
        }
        Ok(acc.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn stack(n_assemblies: usize, n_axial: usize, rows: usize, cols: usize, v: f64) -> PinPowers {
        PinPowers::partition(vec![Matrix::filled(rows, cols, v); n_assemblies * n_axial], n_assemblies).unwrap()
    }

    #[test]
    fn single_cell_reduces_to_sqrt_of_value() {
        let values = stack(1, 1, 1, 1, 9.0);
        let engine = WeightedReductionEngine::new(stack(1, 1, 1, 1, 3.0));
        let r = engine.radial(&values).unwrap();
        assert!((r.grids[0][(0, 0)] - 3.0).abs() < EPS);
        assert!((r.stats.average - 3.0).abs() < EPS);
        assert!((r.stats.rms - 3.0).abs() < EPS);
    }

    #[test]
    fn negative_values_use_absolute_value() {
        let values = stack(1, 1, 1, 1, -4.0);
        let engine = WeightedReductionEngine::new(stack(1, 1, 1, 1, 1.0));
        let r = engine.radial(&values).unwrap();
        assert!((r.stats.average - 2.0).abs() < EPS);
    }

    #[test]
    fn uniform_scenario() {
        let values = stack(2, 2, 2, 2, 2.0);
        let engine = WeightedReductionEngine::new(PinPowers::uniform_like(&values, 1.0));
        let r = engine.radial(&values).unwrap();
        assert_eq!(r.grids.len(), 2);
        assert!(r.grids.iter().all(|g| g.elements().iter().all(|&c| (c - 2f64.sqrt()).abs() < EPS)));
        assert!((r.stats.average - 2f64.sqrt()).abs() < EPS);
        assert!((r.stats.rms - 2f64.sqrt()).abs() < EPS);

        let a = engine.axial(&values).unwrap();
        assert_eq!(a.profiles.shape(), (2, 2));
        assert!((a.stats.average - 2f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn radial_weights_axial_levels() {
        // levels 1.0 and 4.0, weights 3 and 1 → (3 + 4) / 4 = 1.75
        let values = PinPowers::new(vec![vec![Matrix::filled(1, 1, 1.0), Matrix::filled(1, 1, 4.0)]]).unwrap();
        let weights = PinPowers::new(vec![vec![Matrix::filled(1, 1, 3.0), Matrix::filled(1, 1, 1.0)]]).unwrap();
        let r = WeightedReductionEngine::new(weights).radial(&values).unwrap();
        assert!((r.grids[0][(0, 0)] - 1.75f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn zero_weight_cells_are_zero() {
        let values = stack(1, 2, 1, 1, 5.0);
        let engine = WeightedReductionEngine::new(PinPowers::uniform_like(&values, 0.0));
        let r = engine.radial(&values).unwrap();
        assert_eq!(r.grids[0][(0, 0)], 0.0);
        assert_eq!(r.stats, WeightedStats::default());
    }

    #[test]
    fn identical_reference_gives_zero_difference() {
        let values = stack(2, 2, 2, 2, 2.0);
        let diff = values.difference(&values.clone(), DifferenceKind::Basic).unwrap();
        let engine = WeightedReductionEngine::new(PinPowers::uniform_like(&values, 1.0));
        let r = engine.radial(&diff).unwrap();
        assert_eq!(r.stats.average, 0.0);
        assert_eq!(r.stats.rms, 0.0);
    }

    #[test]
    fn relative_difference() {
        let p = stack(1, 1, 1, 2, 3.0);
        let mut cells = Matrix::filled(1, 2, 2.0);
        cells.set(0, 1, 0.0).unwrap();
        let r = PinPowers::new(vec![vec![cells]]).unwrap();
        let d = p.difference(&r, DifferenceKind::Relative).unwrap();
        assert_eq!(d.assemblies()[0][0].elements(), &[0.5, 0.0]);
    }

    #[test]
    fn shape_mismatches_are_errors() {
        let ragged = PinPowers::new(vec![
            vec![Matrix::zeros(2, 2)],
            vec![Matrix::zeros(2, 3)],
        ]);
        assert!(matches!(ragged, Err(ReductionError::ShapeMismatch { assembly: 1, axial: 0, .. })));

        assert!(matches!(
            PinPowers::partition(vec![Matrix::zeros(1, 1); 3], 2),
            Err(ReductionError::Partition { matrices: 3, assemblies: 2 })
        ));

        let engine = WeightedReductionEngine::new(stack(1, 1, 2, 2, 1.0));
        assert!(engine.radial(&stack(1, 1, 3, 3, 1.0)).is_err());
        assert!(engine.axial(&stack(2, 1, 2, 2, 1.0)).is_err());
    }

    #[test]
    fn pointwise_weights_raw_cells() {
        let values = PinPowers::new(vec![vec![Matrix::from_row_major(1, 2, vec![1.0, -3.0]).unwrap()]]).unwrap();
        let engine = WeightedReductionEngine::new(PinPowers::uniform_like(&values, 1.0));
        let s = engine.pointwise(&values).unwrap();
        assert!((s.average - 1.0).abs() < EPS);
        assert!((s.rms - 5f64.sqrt()).abs() < EPS);
    }
}
