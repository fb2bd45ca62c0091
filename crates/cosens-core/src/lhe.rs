//! Light-harvesting efficiency from absorbance.
//!
//! Under Beer-Lambert attenuation a layer of absorbance $A$ transmits
//! $T = 10^{-A}$ of the incident light, so the harvested fraction is
//! $\mathrm{LHE} = 1 - 10^{-A}$. Estimated absorbances can leave the
//! physical range (interpolation undershoot below zero, very strong
//! absorbers above it), so the result is clamped to $[0, 1]$.

/// Convert a single absorbance value to light-harvesting efficiency.
pub fn from_absorbance(absorbance: f64) -> f64 {
    (1.0 - 10.0_f64.powf(-absorbance)).clamp(0.0, 1.0)
}

/// Convert an absorbance spectrum to an LHE spectrum, pointwise.
pub fn spectrum(absorbance: &[f64]) -> Vec<f64> {
    absorbance.iter().map(|&a| from_absorbance(a)).collect()
}
