//! Per-wavelength spectral response models over composition space.
//!
//! Fitting builds one interpolant per grid wavelength through the measured
//! absorbances. Every interpolant shares the same centres (the measured
//! compositions), so the collocation matrix is factorised once and only the
//! weight vectors differ between wavelengths. Prediction computes a single
//! kernel basis vector per query and applies the whole weight table to it in
//! one matrix-vector product.

use ndarray::{Array1, Array2};

use crate::rbf::{RbfError, RbfKernel, RbfSystem};
use crate::types::{CombinationRecord, Composition, WavelengthGrid};

/// A family of fitted interpolants, one per wavelength, mapping a dye
/// composition to an estimated absorbance spectrum.
#[derive(Debug)]
pub struct SpectralModel {
    system: RbfSystem,
    /// Interpolation weights: one row per wavelength, one column per centre.
    weights: Array2<f64>,
    grid: WavelengthGrid,
}

impl SpectralModel {
    /// Fit the per-wavelength interpolants through the measured records.
    ///
    /// # Panics
    /// Panics if any record's absorbance is not sampled on `grid`; loaders
    /// establish this before records reach the model.
    pub fn fit(
        records: &[CombinationRecord],
        grid: &WavelengthGrid,
        kernel: RbfKernel,
        epsilon: Option<f64>,
        smoothing: f64,
    ) -> Result<Self, RbfError> {
        let n = records.len();
        let wavelengths = grid.len();
        for record in records {
            assert_eq!(
                record.absorbance.len(),
                wavelengths,
                "Record '{}' is not sampled on the model grid",
                record.label
            );
        }

        let centres: Vec<Composition> = records.iter().map(|r| r.composition.clone()).collect();
        let system = RbfSystem::fit(centres, kernel, epsilon, smoothing)?;

        let mut weights = Array2::<f64>::zeros((wavelengths, n));
        let mut values = vec![0.0; n];
        for w in 0..wavelengths {
            for (i, record) in records.iter().enumerate() {
                values[i] = record.absorbance[w];
            }
            for (i, v) in system.weights_for(&values).into_iter().enumerate() {
                weights[[w, i]] = v;
            }
        }

        log::debug!(
            "Fitted {} per-wavelength interpolants over {} samples (kernel={}, epsilon={:.4})",
            wavelengths,
            n,
            system.kernel(),
            system.epsilon()
        );

        Ok(Self {
            system,
            weights,
            grid: grid.clone(),
        })
    }

    /// Estimated absorbance spectrum for a query composition, one value per
    /// grid wavelength.
    ///
    /// Queries outside the convex hull of the fitted compositions are
    /// extrapolation and should not be trusted.
    pub fn predict(&self, composition: &Composition) -> Vec<f64> {
        let basis = Array1::from_vec(self.system.basis(composition));
        self.weights.dot(&basis).to_vec()
    }

    /// Largest absolute difference between a measured absorbance and the
    /// model's estimate at the same composition.
    ///
    /// Zero smoothing makes the interpolant exact at the centres, so this is
    /// a conditioning diagnostic rather than a goodness-of-fit measure.
    pub fn max_training_error(&self, records: &[CombinationRecord]) -> f64 {
        let mut worst = 0.0_f64;
        for record in records {
            let estimate = self.predict(&record.composition);
            for (got, want) in estimate.iter().zip(record.absorbance.iter()) {
                worst = worst.max((got - want).abs());
            }
        }
        worst
    }

    /// The wavelength grid all predictions are sampled on.
    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    /// Number of measured samples the model was fitted through.
    pub fn n_samples(&self) -> usize {
        self.system.len()
    }

    /// The kernel in effect.
    pub fn kernel(&self) -> RbfKernel {
        self.system.kernel()
    }

    /// The shape parameter in effect (explicit or derived).
    pub fn epsilon(&self) -> f64 {
        self.system.epsilon()
    }
}
