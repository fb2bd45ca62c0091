//! # Cosens Core
//!
//! The numerical backbone of the cosens workspace. This crate estimates the
//! UV/VIS absorbance spectrum of untested dye combinations from a sparse set
//! of measured ones, and scores the estimates against a reference solar
//! irradiance spectrum.
//!
//! ## Pipeline
//!
//! 1. Fit a [`model::SpectralModel`] — one radial-basis-function interpolant
//!    per wavelength over the D-dimensional composition space.
//! 2. Enumerate candidate mixtures on the unit simplex ([`grid::CandidateGrid`]).
//! 3. Convert each estimated absorbance spectrum to light-harvesting
//!    efficiency ([`lhe`]) and score it under every configured
//!    [`score::FitmentCondition`].
//! 4. Select the best-scoring candidate per condition ([`score::select_best`]).
//!
//! ## Modules
//!
//! - [`types`] — Core data structures (compositions, records, wavelength grid).
//! - [`rbf`] — Radial basis kernels and the interpolation matrix.
//! - [`model`] — The per-wavelength spectral interpolation model.
//! - [`grid`] — Simplex discretisation of the composition space.
//! - [`lhe`] — Absorbance to light-harvesting-efficiency conversion.
//! - [`score`] — Fitment conditions, candidate scoring, winner selection.

pub mod grid;
pub mod lhe;
pub mod model;
pub mod rbf;
pub mod score;
pub mod types;
