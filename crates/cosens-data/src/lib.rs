//! # Cosens Data
//!
//! Input handling for the cosens workspace: measured dye-combination tables,
//! the reference solar irradiance spectrum, and the polynomial regression
//! used to resample it onto a run's wavelength grid.
//!
//! All loading is strict. Tables that disagree with each other or with the
//! configured wavelength grid abort the run with a diagnostic naming the
//! offending file and row; only negative measured absorbances are corrected
//! in place (clamped to zero), since small negative baselines are routine in
//! UV/VIS exports.
//!
//! ## Modules
//!
//! - [`dataset`] — Composition and absorbance table loading and validation.
//! - [`irradiance`] — Embedded AM1.5G reference spectrum and CSV override.
//! - [`polyfit`] — Least-squares polynomial regression.

pub mod dataset;
pub mod irradiance;
pub mod polyfit;
