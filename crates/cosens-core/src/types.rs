//! Core types shared across the cosens workspace.
//!
//! This module defines the fundamental data structures used throughout the
//! analysis pipeline: dye compositions, measured combination records, the
//! common wavelength grid, and scored candidates.

use serde::{Deserialize, Serialize};

/// A dye mixture expressed as ordered volume fractions, one per constituent.
///
/// Fractions are non-negative and nominally sum to 1 (the simplex constraint).
/// Measured compositions are used as loaded; only generated grid candidates
/// are guaranteed to sum to 1 exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition(pub Vec<f64>);

impl Composition {
    /// Create a composition from a fraction vector.
    pub fn new(fractions: Vec<f64>) -> Self {
        Self(fractions)
    }

    /// Number of constituent dyes (D).
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// The ordered volume fractions.
    pub fn fractions(&self) -> &[f64] {
        &self.0
    }

    /// Sum of all fractions. 1.0 for a normalised mixture.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Euclidean distance to another composition of the same dimension.
    pub fn distance(&self, other: &Composition) -> f64 {
        debug_assert_eq!(self.dimension(), other.dimension());
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl std::fmt::Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:.3}")?;
        }
        write!(f, "]")
    }
}

/// One measured dye combination: its composition and its absorbance spectrum
/// sampled on the shared [`WavelengthGrid`].
///
/// The label is the join key between the composition table (rows) and the
/// absorbance table (columns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationRecord {
    /// Combination identifier from the input tables.
    pub label: String,
    /// Volume fractions of each constituent dye.
    pub composition: Composition,
    /// Measured absorbance, one value per grid wavelength.
    pub absorbance: Vec<f64>,
}

/// The uniform wavelength domain shared by all spectra in a run.
///
/// Every loaded, fitted, and estimated spectrum is sampled on this grid;
/// mismatched domains are a fatal input error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavelengthGrid {
    /// First wavelength (nm), inclusive.
    pub start_nm: f64,
    /// Last wavelength (nm), inclusive.
    pub stop_nm: f64,
    /// Spacing between samples (nm).
    pub step_nm: f64,
}

impl WavelengthGrid {
    /// Create a grid covering `start_nm..=stop_nm` in steps of `step_nm`.
    ///
    /// # Panics
    /// Panics if the step is not positive, the stop precedes the start, or
    /// the span is not a whole multiple of the step.
    pub fn new(start_nm: f64, stop_nm: f64, step_nm: f64) -> Self {
        assert!(step_nm > 0.0, "Wavelength step must be positive");
        assert!(stop_nm >= start_nm, "Wavelength stop must not precede start");
        let span_steps = (stop_nm - start_nm) / step_nm;
        assert!(
            (span_steps - span_steps.round()).abs() < 1e-9,
            "Wavelength span must be a whole multiple of the step"
        );
        Self {
            start_nm,
            stop_nm,
            step_nm,
        }
    }

    /// Number of samples on the grid.
    pub fn len(&self) -> usize {
        ((self.stop_nm - self.start_nm) / self.step_nm).round() as usize + 1
    }

    /// Whether the grid holds no samples. Never true for a valid grid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ordered wavelength values (nm).
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start_nm + i as f64 * self.step_nm)
            .collect()
    }

    /// Check a parsed wavelength column against this grid.
    ///
    /// Returns the index of the first sample that disagrees (by position or
    /// by value beyond `tolerance_nm`), or `None` when the column matches.
    /// A column shifted by one row disagrees at index 0 and is rejected
    /// rather than silently misaligned.
    pub fn first_mismatch(&self, column: &[f64], tolerance_nm: f64) -> Option<usize> {
        if column.len() != self.len() {
            return Some(column.len().min(self.len()));
        }
        for (i, &w) in column.iter().enumerate() {
            let expected = self.start_nm + i as f64 * self.step_nm;
            if (w - expected).abs() > tolerance_nm {
                return Some(i);
            }
        }
        None
    }
}

impl Default for WavelengthGrid {
    fn default() -> Self {
        Self {
            start_nm: 300.0,
            stop_nm: 800.0,
            step_nm: 1.0,
        }
    }
}

/// A grid candidate after evaluation: its estimated light-harvesting
/// efficiency spectrum and one scalar score per configured fitment condition.
///
/// Created once during scoring and read-only afterwards; winner selection is
/// the terminal consumer.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    /// The synthetic mixture that was evaluated.
    pub composition: Composition,
    /// Estimated LHE spectrum on the shared wavelength grid.
    pub lhe: Vec<f64>,
    /// Scores aligned with the configured fitment-condition list.
    pub scores: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_len_and_values() {
        let grid = WavelengthGrid::new(300.0, 800.0, 1.0);
        assert_eq!(grid.len(), 501);
        let values = grid.values();
        assert_eq!(values[0], 300.0);
        assert_eq!(values[500], 800.0);
    }

    #[test]
    fn test_grid_default_is_visible_range() {
        let grid = WavelengthGrid::default();
        assert_eq!(grid.len(), 501);
        assert_eq!(grid.start_nm, 300.0);
    }

    #[test]
    fn test_grid_detects_shifted_column() {
        let grid = WavelengthGrid::new(400.0, 410.0, 5.0);
        // Shifted by one step: first row already disagrees.
        let shifted = vec![405.0, 410.0, 415.0];
        assert_eq!(grid.first_mismatch(&shifted, 1e-6), Some(0));
        // Matching column passes.
        let exact = vec![400.0, 405.0, 410.0];
        assert_eq!(grid.first_mismatch(&exact, 1e-6), None);
        // Wrong length is a mismatch regardless of values.
        assert!(grid.first_mismatch(&[400.0, 405.0], 1e-6).is_some());
    }

    #[test]
    #[should_panic(expected = "whole multiple")]
    fn test_grid_rejects_ragged_span() {
        WavelengthGrid::new(300.0, 800.5, 1.0);
    }

    #[test]
    fn test_composition_distance() {
        let a = Composition::new(vec![1.0, 0.0]);
        let b = Composition::new(vec![0.0, 1.0]);
        assert!((a.distance(&b) - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_composition_total() {
        let c = Composition::new(vec![0.2, 0.3, 0.5]);
        assert!((c.total() - 1.0).abs() < 1e-12);
    }
}
