//! Exhaustive candidate generation on the unit simplex.
//!
//! Candidates are every mixture of $D$ constituents whose volume fractions
//! are multiples of $1/(P-1)$ (for $P$ points per axis) and sum to one.
//! Enumeration works on integer numerators summing to $P-1$, so membership
//! of the simplex is exact by construction rather than recovered by
//! filtering floating-point sums.
//!
//! Candidate order is deterministic: ascending lexicographic with the first
//! constituent varying slowest, which places $(0, \dots, 0, 1)$ first and
//! $(1, 0, \dots, 0)$ last.
//!
//! The search is exhaustive, and the candidate count
//! $\binom{P - 1 + D - 1}{D - 1}$ grows combinatorially with both resolution
//! and dimension. [`CandidateGrid::expected_len`] gives that count without
//! enumerating, so callers can report it before committing to a scoring pass.

use crate::types::Composition;

/// The full candidate set for one run.
pub struct CandidateGrid {
    dimension: usize,
    points_per_axis: usize,
    candidates: Vec<Composition>,
}

impl CandidateGrid {
    /// Enumerate all grid mixtures of `dimension` constituents.
    ///
    /// # Panics
    /// Panics if `dimension` is zero or `points_per_axis` is below 2; the
    /// configuration layer rejects such values before reaching here.
    pub fn generate(dimension: usize, points_per_axis: usize) -> Self {
        assert!(dimension >= 1, "At least one constituent is required");
        assert!(
            points_per_axis >= 2,
            "At least two points per axis are required to span [0, 1]"
        );

        let steps = points_per_axis - 1;
        let scale = steps as f64;
        let mut candidates = Vec::with_capacity(Self::expected_len(dimension, points_per_axis));
        let mut numerators = Vec::with_capacity(dimension);
        fill(&mut numerators, steps, dimension, scale, &mut candidates);

        Self {
            dimension,
            points_per_axis,
            candidates,
        }
    }

    /// Closed-form candidate count: $\binom{P - 1 + D - 1}{D - 1}$.
    pub fn expected_len(dimension: usize, points_per_axis: usize) -> usize {
        let n = (points_per_axis - 1) + (dimension - 1);
        let k = dimension - 1;
        let mut count: u128 = 1;
        for i in 0..k {
            count = count * (n - i) as u128 / (i + 1) as u128;
        }
        count as usize
    }

    /// Spacing between adjacent fraction values on one axis.
    pub fn resolution(&self) -> f64 {
        1.0 / (self.points_per_axis - 1) as f64
    }

    /// Number of constituents per candidate.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the grid is empty. Never true for a generated grid.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The candidates in enumeration order.
    pub fn candidates(&self) -> &[Composition] {
        &self.candidates
    }
}

/// Extend `numerators` with every suffix summing to `remaining`, emitting a
/// candidate whenever the tuple is complete. The final constituent takes the
/// remainder, so each tuple sums to the full step count exactly.
fn fill(
    numerators: &mut Vec<usize>,
    remaining: usize,
    dimension: usize,
    scale: f64,
    out: &mut Vec<Composition>,
) {
    if numerators.len() == dimension - 1 {
        numerators.push(remaining);
        out.push(Composition::new(
            numerators.iter().map(|&k| k as f64 / scale).collect(),
        ));
        numerators.pop();
        return;
    }
    for k in 0..=remaining {
        numerators.push(k);
        fill(numerators, remaining - k, dimension, scale, out);
        numerators.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_match_closed_form() {
        for (dimension, points) in [(2, 11), (3, 11), (4, 5), (6, 4)] {
            let grid = CandidateGrid::generate(dimension, points);
            assert_eq!(
                grid.len(),
                CandidateGrid::expected_len(dimension, points),
                "D={dimension} P={points}"
            );
        }
        // Spot-check the binomials themselves.
        assert_eq!(CandidateGrid::expected_len(2, 11), 11);
        assert_eq!(CandidateGrid::expected_len(3, 11), 66);
        assert_eq!(CandidateGrid::expected_len(4, 5), 35);
    }

    #[test]
    fn test_binary_grid_order() {
        let grid = CandidateGrid::generate(2, 3);
        let expected = [[0.0, 1.0], [0.5, 0.5], [1.0, 0.0]];
        assert_eq!(grid.len(), 3);
        for (candidate, want) in grid.candidates().iter().zip(expected.iter()) {
            assert_eq!(candidate.fractions(), want);
        }
    }

    #[test]
    fn test_first_and_last_candidates_are_pure() {
        let grid = CandidateGrid::generate(3, 11);
        assert_eq!(grid.candidates()[0].fractions(), &[0.0, 0.0, 1.0]);
        assert_eq!(
            grid.candidates()[grid.len() - 1].fractions(),
            &[1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_all_candidates_lie_on_the_simplex() {
        let grid = CandidateGrid::generate(3, 6);
        for candidate in grid.candidates() {
            assert!((candidate.total() - 1.0).abs() < 1e-12);
            for &f in candidate.fractions() {
                assert!((0.0..=1.0).contains(&f));
            }
        }
    }

    #[test]
    fn test_single_constituent_grid_is_trivial() {
        let grid = CandidateGrid::generate(1, 11);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.candidates()[0].fractions(), &[1.0]);
    }

    #[test]
    fn test_resolution() {
        let grid = CandidateGrid::generate(2, 11);
        assert!((grid.resolution() - 0.1).abs() < 1e-15);
    }
}
