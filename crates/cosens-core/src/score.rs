//! Candidate scoring against the reference irradiance.
//!
//! Each candidate's estimated LHE spectrum is reduced to one scalar per
//! fitment condition:
//!
//! | Condition    | Measure                                                    |
//! |--------------|------------------------------------------------------------|
//! | `pearson`    | Pearson correlation between LHE and reference              |
//! | `integral`   | Trapezoidal integral of LHE x reference over wavelength    |
//! | `covariance` | Sample covariance between LHE and reference                |
//!
//! Scoring is read-only over the fitted model and independent per candidate,
//! so candidates are scored in parallel with `rayon` and collected back in
//! enumeration order. Winner selection is sequential and keeps the earliest
//! candidate on ties, which makes the whole pipeline deterministic for a
//! given input.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::lhe;
use crate::model::SpectralModel;
use crate::types::{Composition, ScoredCandidate};

/// Scoring failure.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The reference spectrum is not sampled on the model's wavelength grid.
    #[error(
        "Reference spectrum has {found} samples but the wavelength grid has {expected}; \
         resample the reference onto the run grid first"
    )]
    DomainMismatch { expected: usize, found: usize },
}

/// A scalar measure of how well an LHE spectrum fits the reference.
///
/// Higher is better under every condition; winner selection is a plain
/// argmax over candidates.
pub trait FitmentCondition: Send + Sync {
    /// Stable identifier used in artifact names and report headers.
    fn name(&self) -> &'static str;

    /// Score one candidate spectrum against the reference.
    ///
    /// All three slices are sampled on the shared wavelength grid and have
    /// equal length.
    fn score(&self, lhe: &[f64], reference: &[f64], wavelengths: &[f64]) -> f64;
}

/// Pearson correlation coefficient between the LHE and reference shapes.
///
/// A spectrum with zero variance (for instance a fully saturated absorber
/// clamped to 1 everywhere) carries no shape information and scores 0.
pub struct Pearson;

impl FitmentCondition for Pearson {
    fn name(&self) -> &'static str {
        "pearson"
    }

    fn score(&self, lhe: &[f64], reference: &[f64], _wavelengths: &[f64]) -> f64 {
        let n = lhe.len() as f64;
        let mean_l = lhe.iter().sum::<f64>() / n;
        let mean_r = reference.iter().sum::<f64>() / n;
        let mut s_lr = 0.0;
        let mut s_ll = 0.0;
        let mut s_rr = 0.0;
        for (&l, &r) in lhe.iter().zip(reference.iter()) {
            let dl = l - mean_l;
            let dr = r - mean_r;
            s_lr += dl * dr;
            s_ll += dl * dl;
            s_rr += dr * dr;
        }
        if s_ll == 0.0 || s_rr == 0.0 {
            return 0.0;
        }
        // Rounding in the moment sums can push collinear inputs a few ulps
        // past +/-1; the coefficient is bounded by definition.
        (s_lr / (s_ll * s_rr).sqrt()).clamp(-1.0, 1.0)
    }
}

/// Trapezoidal integral of the pointwise product LHE x reference.
///
/// Unlike the correlation conditions this rewards absolute harvested power,
/// so saturated absorbers score highly rather than falling to zero.
pub struct Integral;

impl FitmentCondition for Integral {
    fn name(&self) -> &'static str {
        "integral"
    }

    fn score(&self, lhe: &[f64], reference: &[f64], wavelengths: &[f64]) -> f64 {
        let mut total = 0.0;
        for i in 1..wavelengths.len() {
            let product_left = lhe[i - 1] * reference[i - 1];
            let product_right = lhe[i] * reference[i];
            total += 0.5 * (product_left + product_right) * (wavelengths[i] - wavelengths[i - 1]);
        }
        total
    }
}

/// Sample covariance (denominator $n - 1$) between the LHE and reference.
pub struct Covariance;

impl FitmentCondition for Covariance {
    fn name(&self) -> &'static str {
        "covariance"
    }

    fn score(&self, lhe: &[f64], reference: &[f64], _wavelengths: &[f64]) -> f64 {
        let n = lhe.len();
        if n < 2 {
            return 0.0;
        }
        let mean_l = lhe.iter().sum::<f64>() / n as f64;
        let mean_r = reference.iter().sum::<f64>() / n as f64;
        let mut s_lr = 0.0;
        for (&l, &r) in lhe.iter().zip(reference.iter()) {
            s_lr += (l - mean_l) * (r - mean_r);
        }
        s_lr / (n - 1) as f64
    }
}

/// Configuration-level name for a built-in condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Pearson,
    Integral,
    Covariance,
}

impl ConditionKind {
    /// Every built-in condition, in default reporting order.
    pub const ALL: [ConditionKind; 3] = [
        ConditionKind::Pearson,
        ConditionKind::Integral,
        ConditionKind::Covariance,
    ];

    /// Instantiate the condition this name refers to.
    pub fn instance(&self) -> Box<dyn FitmentCondition> {
        match self {
            ConditionKind::Pearson => Box::new(Pearson),
            ConditionKind::Integral => Box::new(Integral),
            ConditionKind::Covariance => Box::new(Covariance),
        }
    }
}

/// Score every candidate under every condition.
///
/// The reference must already be resampled on the model's wavelength grid;
/// a length disagreement is rejected before any candidate is evaluated.
/// Results are returned in candidate enumeration order regardless of how the
/// parallel scheduler interleaves the work. Progress is logged roughly ten
/// times over the run.
pub fn score_all(
    model: &SpectralModel,
    candidates: &[Composition],
    reference: &[f64],
    conditions: &[Box<dyn FitmentCondition>],
) -> Result<Vec<ScoredCandidate>, ScoreError> {
    let wavelengths = model.grid().values();
    if reference.len() != wavelengths.len() {
        return Err(ScoreError::DomainMismatch {
            expected: wavelengths.len(),
            found: reference.len(),
        });
    }

    let total = candidates.len();
    let stride = (total / 10).max(1);
    let done = AtomicUsize::new(0);

    let scored = candidates
        .par_iter()
        .map(|composition| {
            let absorbance = model.predict(composition);
            let lhe = lhe::spectrum(&absorbance);
            let scores = conditions
                .iter()
                .map(|condition| condition.score(&lhe, reference, &wavelengths))
                .collect();

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % stride == 0 {
                log::info!("Scored {finished}/{total} candidates");
            }

            ScoredCandidate {
                composition: composition.clone(),
                lhe,
                scores,
            }
        })
        .collect();
    Ok(scored)
}

/// The winning candidate under one condition.
#[derive(Debug)]
pub struct Winner<'a> {
    pub candidate: &'a ScoredCandidate,
    /// Position in candidate enumeration order.
    pub index: usize,
    pub score: f64,
    /// Number of candidates sharing the top score, including the winner.
    pub ties: usize,
}

/// Argmax over candidates for the condition at `condition_index`.
///
/// Ties keep the earliest candidate; `ties` reports how many candidates
/// share the top score so callers can flag ambiguous optima. NaN scores are
/// skipped outright, so `None` is returned only for an empty set or one with
/// no rankable score at all.
pub fn select_best(scored: &[ScoredCandidate], condition_index: usize) -> Option<Winner<'_>> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in scored.iter().enumerate() {
        let score = candidate.scores[condition_index];
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    let (index, score) = best?;
    let ties = scored
        .iter()
        .filter(|c| c.scores[condition_index] == score)
        .count();
    Some(Winner {
        candidate: &scored[index],
        index,
        score,
        ties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbf::RbfKernel;
    use crate::types::{CombinationRecord, WavelengthGrid};
    use approx::assert_relative_eq;

    // ── Individual conditions ───────────────────────────────────────────

    #[test]
    fn test_pearson_detects_perfect_correlation() {
        let x = [0.1, 0.2, 0.3, 0.4];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let r = Pearson.score(&x, &y, &[]);
        assert_relative_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_detects_anticorrelation() {
        let x = [0.1, 0.2, 0.3, 0.4];
        let y: Vec<f64> = x.iter().map(|v| 1.0 - v).collect();
        let r = Pearson.score(&x, &y, &[]);
        assert_relative_eq!(r, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_never_leaves_the_unit_interval() {
        // Collinear pairs are the worst case: the raw ratio lands within a
        // few ulps of +/-1 and rounding can carry it past the bound.
        for n in 2..40 {
            for &(scale, step) in &[(1.3, 0.1), (0.7, 0.03), (2.0, 0.25)] {
                let lhe: Vec<f64> = (0..n).map(|i| (i as f64 * step).min(1.0)).collect();
                let reference: Vec<f64> = lhe.iter().map(|v| scale * v + 0.01).collect();
                let r = Pearson.score(&lhe, &reference, &[]);
                assert!(
                    (-1.0..=1.0).contains(&r),
                    "pearson score {r} escaped [-1, 1] at n={n}, scale={scale}, step={step}"
                );
                let anti = Pearson.score(
                    &lhe,
                    &reference.iter().map(|v| -v).collect::<Vec<_>>(),
                    &[],
                );
                assert!((-1.0..=1.0).contains(&anti));
            }
        }
    }

    #[test]
    fn test_pearson_zero_variance_scores_zero() {
        let flat = [1.0, 1.0, 1.0];
        let reference = [0.5, 1.2, 0.9];
        assert_eq!(Pearson.score(&flat, &reference, &[]), 0.0);
        assert_eq!(Pearson.score(&reference, &flat, &[]), 0.0);
    }

    #[test]
    fn test_integral_of_constant_product() {
        let wavelengths = [0.0, 1.0, 2.0];
        let lhe = [1.0, 1.0, 1.0];
        let reference = [2.0, 2.0, 2.0];
        let score = Integral.score(&lhe, &reference, &wavelengths);
        assert_relative_eq!(score, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_rewards_overlap_with_reference() {
        let wavelengths: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let reference = [0.0, 0.0, 1.0, 0.0, 0.0];
        let aligned = [0.0, 0.0, 1.0, 0.0, 0.0];
        let misaligned = [1.0, 0.0, 0.0, 0.0, 1.0];
        let hit = Integral.score(&aligned, &reference, &wavelengths);
        let miss = Integral.score(&misaligned, &reference, &wavelengths);
        assert!(hit > miss);
    }

    #[test]
    fn test_covariance_matches_hand_computation() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 4.0, 6.0];
        // Deviations (-1, 0, 1) and (-2, 0, 2): sum 4, n - 1 = 2.
        assert_relative_eq!(Covariance.score(&x, &y, &[]), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_of_single_sample_is_zero() {
        assert_eq!(Covariance.score(&[1.0], &[2.0], &[]), 0.0);
    }

    #[test]
    fn test_condition_names() {
        let conditions: Vec<Box<dyn FitmentCondition>> =
            ConditionKind::ALL.iter().map(|k| k.instance()).collect();
        let names: Vec<&str> = conditions.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["pearson", "integral", "covariance"]);
    }

    // ── Batch scoring and selection ─────────────────────────────────────

    fn fitted_model() -> (SpectralModel, Vec<CombinationRecord>) {
        let grid = WavelengthGrid::new(400.0, 440.0, 10.0);
        let spectrum_a = [2.0, 1.5, 1.0, 0.5, 0.1];
        let spectrum_b = [0.1, 0.5, 1.0, 1.5, 2.0];
        let mix = |f: f64| -> Vec<f64> {
            spectrum_a
                .iter()
                .zip(spectrum_b.iter())
                .map(|(a, b)| f * a + (1.0 - f) * b)
                .collect()
        };
        let records = vec![
            CombinationRecord {
                label: "A".into(),
                composition: Composition::new(vec![1.0, 0.0]),
                absorbance: mix(1.0),
            },
            CombinationRecord {
                label: "B".into(),
                composition: Composition::new(vec![0.0, 1.0]),
                absorbance: mix(0.0),
            },
            CombinationRecord {
                label: "AB".into(),
                composition: Composition::new(vec![0.5, 0.5]),
                absorbance: mix(0.5),
            },
        ];
        let model =
            SpectralModel::fit(&records, &grid, RbfKernel::InverseMultiquadric, None, 0.0)
                .unwrap();
        (model, records)
    }

    #[test]
    fn test_score_all_preserves_candidate_order() {
        let (model, _) = fitted_model();
        let candidates = vec![
            Composition::new(vec![0.0, 1.0]),
            Composition::new(vec![0.5, 0.5]),
            Composition::new(vec![1.0, 0.0]),
        ];
        let reference = vec![1.0; model.grid().len()];
        let conditions: Vec<Box<dyn FitmentCondition>> =
            ConditionKind::ALL.iter().map(|k| k.instance()).collect();

        let scored = score_all(&model, &candidates, &reference, &conditions).unwrap();
        assert_eq!(scored.len(), 3);
        for (scored, expected) in scored.iter().zip(candidates.iter()) {
            assert_eq!(&scored.composition, expected);
            assert_eq!(scored.scores.len(), conditions.len());
            assert_eq!(scored.lhe.len(), model.grid().len());
        }
    }

    #[test]
    fn test_score_all_rejects_mismatched_reference() {
        let (model, _) = fitted_model();
        let candidates = vec![Composition::new(vec![0.5, 0.5])];
        let short_reference = vec![1.0; model.grid().len() - 1];
        let conditions: Vec<Box<dyn FitmentCondition>> =
            ConditionKind::ALL.iter().map(|k| k.instance()).collect();

        let err = score_all(&model, &candidates, &short_reference, &conditions).unwrap_err();
        match err {
            ScoreError::DomainMismatch { expected, found } => {
                assert_eq!(expected, 5);
                assert_eq!(found, 4);
            }
        }
    }

    #[test]
    fn test_select_best_keeps_first_on_ties() {
        let scored = vec![
            ScoredCandidate {
                composition: Composition::new(vec![1.0, 0.0]),
                lhe: vec![],
                scores: vec![0.9],
            },
            ScoredCandidate {
                composition: Composition::new(vec![0.5, 0.5]),
                lhe: vec![],
                scores: vec![0.9],
            },
            ScoredCandidate {
                composition: Composition::new(vec![0.0, 1.0]),
                lhe: vec![],
                scores: vec![0.3],
            },
        ];
        let winner = select_best(&scored, 0).unwrap();
        assert_eq!(winner.index, 0);
        assert_eq!(winner.ties, 2);
        assert_eq!(winner.score, 0.9);
    }

    #[test]
    fn test_select_best_skips_nan_scores() {
        let scored = vec![
            ScoredCandidate {
                composition: Composition::new(vec![1.0, 0.0]),
                lhe: vec![],
                scores: vec![0.4],
            },
            ScoredCandidate {
                composition: Composition::new(vec![0.0, 1.0]),
                lhe: vec![],
                scores: vec![f64::NAN],
            },
        ];
        let winner = select_best(&scored, 0).unwrap();
        assert_eq!(winner.index, 0);
        assert_eq!(winner.ties, 1);

        let all_nan = vec![ScoredCandidate {
            composition: Composition::new(vec![1.0, 0.0]),
            lhe: vec![],
            scores: vec![f64::NAN],
        }];
        assert!(select_best(&all_nan, 0).is_none());
    }

    #[test]
    fn test_select_best_of_empty_set_is_none() {
        assert!(select_best(&[], 0).is_none());
    }
}
