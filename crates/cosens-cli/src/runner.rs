//! Optimisation runner: ties together dataset, model, search, and scoring.

use std::path::Path;

use anyhow::{ensure, Context, Result};

use cosens_core::grid::CandidateGrid;
use cosens_core::model::SpectralModel;
use cosens_core::rbf::RbfKernel;
use cosens_core::score::{self, FitmentCondition};
use cosens_core::types::{Composition, ScoredCandidate, WavelengthGrid};
use cosens_data::dataset::DyeDataset;
use cosens_data::irradiance::ReferenceSpectrum;

use crate::config::{DomainConfig, JobConfig};

/// Results from an optimisation run.
#[derive(Debug)]
pub struct RunOutput {
    pub grid: WavelengthGrid,
    pub constituents: Vec<String>,
    /// Reference irradiance resampled onto `grid`.
    pub reference: Vec<f64>,
    /// Kernel and shape parameter the model was fitted with.
    pub kernel: RbfKernel,
    pub epsilon: f64,
    /// Condition names in the order scores were recorded.
    pub condition_names: Vec<&'static str>,
    pub scored: Vec<ScoredCandidate>,
    pub winners: Vec<WinnerReport>,
}

/// The best candidate under one fitment condition.
#[derive(Debug)]
pub struct WinnerReport {
    pub condition: &'static str,
    /// Position in candidate enumeration order.
    pub index: usize,
    pub score: f64,
    /// Number of candidates sharing the top score, including this one.
    pub ties: usize,
    pub composition: Composition,
    pub lhe: Vec<f64>,
}

/// Run a full optimisation from a parsed job configuration.
pub fn run(job: &JobConfig) -> Result<RunOutput> {
    let (dataset, reference) = prepare(job)?;

    println!(
        "Constituents: {} ({} measured combinations)",
        dataset.constituents().join(", "),
        dataset.len()
    );

    // Fit one interpolant per wavelength through the measured spectra
    let model = SpectralModel::fit(
        dataset.records(),
        dataset.grid(),
        job.model.kernel,
        job.model.epsilon,
        job.model.smoothing,
    )?;
    if model.kernel().uses_epsilon() {
        println!(
            "Model: {} kernel, epsilon={:.4}",
            model.kernel(),
            model.epsilon()
        );
    } else {
        println!("Model: {} kernel", model.kernel());
    }

    // Enumerate every candidate composition on the simplex
    let candidates = CandidateGrid::generate(dataset.dimension(), job.search.points_per_axis);
    println!("Volume-fraction resolution: {:.3}", candidates.resolution());
    println!("Total combinations to evaluate: {}", candidates.len());

    let conditions: Vec<Box<dyn FitmentCondition>> = job
        .search
        .conditions
        .iter()
        .map(|kind| kind.instance())
        .collect();
    let scored = score::score_all(&model, candidates.candidates(), &reference, &conditions)?;

    let mut winners = Vec::with_capacity(conditions.len());
    for (ci, condition) in conditions.iter().enumerate() {
        let winner = score::select_best(&scored, ci).context("No scored candidates to rank")?;

        println!();
        println!(
            "Best combination by {}: score={:.6}",
            condition.name(),
            winner.score
        );
        for (name, fraction) in dataset
            .constituents()
            .iter()
            .zip(winner.candidate.composition.fractions())
        {
            println!("  {name} = {fraction:.3}");
        }
        if winner.ties > 1 {
            log::warn!(
                "{} candidates tie for the best {} score; keeping the first",
                winner.ties,
                condition.name()
            );
        }

        winners.push(WinnerReport {
            condition: condition.name(),
            index: winner.index,
            score: winner.score,
            ties: winner.ties,
            composition: winner.candidate.composition.clone(),
            lhe: winner.candidate.lhe.clone(),
        });
    }

    Ok(RunOutput {
        grid: dataset.grid().clone(),
        constituents: dataset.constituents().to_vec(),
        reference,
        kernel: model.kernel(),
        epsilon: model.epsilon(),
        condition_names: conditions.iter().map(|c| c.name()).collect(),
        scored,
        winners,
    })
}

/// Load and cross-check every input the job names, without scoring.
///
/// Fits the interpolation model so that degenerate sample sets surface here
/// rather than midway through a long run.
pub fn validate(job: &JobConfig) -> Result<()> {
    let (dataset, reference) = prepare(job)?;

    let model = SpectralModel::fit(
        dataset.records(),
        dataset.grid(),
        job.model.kernel,
        job.model.epsilon,
        job.model.smoothing,
    )?;

    println!(
        "  {} combinations of {} constituents ({})",
        dataset.len(),
        dataset.dimension(),
        dataset.constituents().join(", ")
    );
    println!(
        "  {} wavelengths from {:.0} to {:.0} nm",
        dataset.grid().len(),
        dataset.grid().start_nm,
        dataset.grid().stop_nm
    );
    println!(
        "  Reference: {}",
        reference_summary(job, reference.len())
    );
    println!(
        "  Worst training residual: {:.3e} absorbance units",
        model.max_training_error(dataset.records())
    );
    println!(
        "  {} candidates at resolution {:.3}",
        CandidateGrid::expected_len(dataset.dimension(), job.search.points_per_axis),
        1.0 / (job.search.points_per_axis - 1) as f64
    );
    Ok(())
}

/// One-line description of the reference source and its resampling. The
/// count is the run grid's, not the source table's; the regression has
/// already replaced the tabulated samples by this point.
fn reference_summary(job: &JobConfig, grid_points: usize) -> String {
    match &job.reference.csv {
        Some(path) => format!(
            "{} (degree-{} regression on {} grid points)",
            path, job.reference.degree, grid_points
        ),
        None => format!(
            "embedded AM1.5G (degree-{} regression on {} grid points)",
            job.reference.degree, grid_points
        ),
    }
}

/// Checks shared by `run` and `validate`: the wavelength grid, both input
/// tables, the resampled reference, and the search parameters.
fn prepare(job: &JobConfig) -> Result<(DyeDataset, Vec<f64>)> {
    let grid = build_grid(&job.domain)?;

    let dataset = DyeDataset::load(
        Path::new(&job.data.compositions),
        Path::new(&job.data.absorbance),
        &grid,
    )?;
    if let Some(expected) = job.data.constituents {
        ensure!(
            dataset.dimension() == expected,
            "Composition table lists {} constituents but the job expects {}",
            dataset.dimension(),
            expected
        );
    }

    let spectrum = match &job.reference.csv {
        Some(path) => ReferenceSpectrum::from_csv(Path::new(path))?,
        None => ReferenceSpectrum::am15g(),
    };
    let reference = spectrum.resample(dataset.grid(), job.reference.degree)?;

    if let Some(epsilon) = job.model.epsilon {
        ensure!(
            epsilon > 0.0,
            "model.epsilon must be positive, got {}",
            epsilon
        );
    }
    ensure!(
        job.search.points_per_axis >= 2,
        "search.points_per_axis must be at least 2, got {}",
        job.search.points_per_axis
    );
    ensure!(
        !job.search.conditions.is_empty(),
        "search.conditions must name at least one fitment condition"
    );

    Ok((dataset, reference))
}

/// Build the wavelength grid from the domain section, rejecting values the
/// grid type would panic on.
fn build_grid(domain: &DomainConfig) -> Result<WavelengthGrid> {
    ensure!(
        domain.step_nm > 0.0,
        "domain.step_nm must be positive, got {}",
        domain.step_nm
    );
    ensure!(
        domain.stop_nm >= domain.start_nm,
        "domain.stop_nm ({}) must not precede domain.start_nm ({})",
        domain.stop_nm,
        domain.start_nm
    );
    let steps = (domain.stop_nm - domain.start_nm) / domain.step_nm;
    ensure!(
        (steps - steps.round()).abs() < 1e-9,
        "The span {}-{} nm is not a whole multiple of step {} nm",
        domain.start_nm,
        domain.stop_nm,
        domain.step_nm
    );
    Ok(WavelengthGrid::new(
        domain.start_nm,
        domain.stop_nm,
        domain.step_nm,
    ))
}

/// Write the resampled reference irradiance to a CSV file with a metadata header.
pub fn write_irradiance_csv(output: &RunOutput, path: &Path, job: &JobConfig) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# Cosens Dye-Combination Optimiser — Reference Irradiance")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    match &job.reference.csv {
        Some(source) => writeln!(file, "# source: {source}")?,
        None => writeln!(file, "# source: embedded AM1.5G (ASTM G-173-03)")?,
    }
    writeln!(file, "# regression degree: {}", job.reference.degree)?;
    writeln!(
        file,
        "# domain: {}-{} nm, step {} nm",
        output.grid.start_nm, output.grid.stop_nm, output.grid.step_nm
    )?;
    writeln!(file, "#")?;
    writeln!(file, "wavelength_nm,irradiance")?;

    let wavelengths = output.grid.values();
    for (wl, irr) in wavelengths.iter().zip(output.reference.iter()) {
        writeln!(file, "{:.2},{:.6e}", wl, irr)?;
    }

    println!("Reference irradiance written to: {}", path.display());
    Ok(())
}

/// Write every candidate's score under one condition to a CSV file.
pub fn write_scores_csv(
    output: &RunOutput,
    condition_index: usize,
    path: &Path,
    job: &JobConfig,
) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let condition = output.condition_names[condition_index];
    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "# Cosens Dye-Combination Optimiser — Candidate Scores ({})",
        condition
    )?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# compositions: {}", job.data.compositions)?;
    writeln!(file, "# absorbance: {}", job.data.absorbance)?;
    writeln!(
        file,
        "# kernel: {} (epsilon={:.6})",
        output.kernel, output.epsilon
    )?;
    writeln!(file, "#")?;
    writeln!(file, "index,{},score", output.constituents.join(","))?;

    for (i, candidate) in output.scored.iter().enumerate() {
        let fractions = candidate
            .composition
            .fractions()
            .iter()
            .map(|f| format!("{f:.6}"))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            file,
            "{},{},{:.6e}",
            i, fractions, candidate.scores[condition_index]
        )?;
    }

    println!("Score table ({}) written to: {}", condition, path.display());
    Ok(())
}

/// Write a winning candidate's estimated LHE spectrum, with the reference
/// irradiance alongside, to a CSV file.
pub fn write_best_csv(output: &RunOutput, winner: &WinnerReport, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let composition = output
        .constituents
        .iter()
        .zip(winner.composition.fractions())
        .map(|(name, f)| format!("{name}={f:.3}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "# Cosens Dye-Combination Optimiser — Winning Spectrum ({})",
        winner.condition
    )?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# composition: {}", composition)?;
    writeln!(file, "# score: {:.6e}", winner.score)?;
    writeln!(
        file,
        "# kernel: {} (epsilon={:.6})",
        output.kernel, output.epsilon
    )?;
    writeln!(file, "#")?;
    writeln!(file, "wavelength_nm,lhe,reference_irradiance")?;

    let wavelengths = output.grid.values();
    for ((wl, lhe), irr) in wavelengths
        .iter()
        .zip(winner.lhe.iter())
        .zip(output.reference.iter())
    {
        writeln!(file, "{:.2},{:.6},{:.6e}", wl, lhe, irr)?;
    }

    println!(
        "Winning spectrum ({}) written to: {}",
        winner.condition,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, ModelConfig, OutputConfig, ReferenceConfig, SearchConfig};
    use approx::assert_relative_eq;
    use cosens_core::score::ConditionKind;

    fn test_job(dir: &Path) -> JobConfig {
        let compositions = dir.join("compositions.csv");
        std::fs::write(
            &compositions,
            "combination,A,B\nP1,1.0,0.0\nP2,0.0,1.0\nM1,0.5,0.5\n",
        )
        .unwrap();
        let absorbance = dir.join("absorbance.csv");
        std::fs::write(
            &absorbance,
            "wavelength,P1,P2,M1\n400,0.8,0.1,0.45\n410,1.2,0.1,0.65\n420,0.9,0.1,0.5\n",
        )
        .unwrap();

        JobConfig {
            data: DataConfig {
                compositions: compositions.to_string_lossy().into_owned(),
                absorbance: absorbance.to_string_lossy().into_owned(),
                constituents: Some(2),
            },
            domain: DomainConfig {
                start_nm: 400.0,
                stop_nm: 420.0,
                step_nm: 10.0,
            },
            model: ModelConfig::default(),
            reference: ReferenceConfig::default(),
            search: SearchConfig {
                points_per_axis: 5,
                conditions: ConditionKind::ALL.to_vec(),
            },
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_end_to_end_run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let job = test_job(dir.path());

        let result = run(&job).unwrap();
        assert_eq!(result.scored.len(), 5);
        assert_eq!(result.winners.len(), 3);
        for winner in &result.winners {
            assert_relative_eq!(winner.composition.total(), 1.0, epsilon = 1e-12);
            assert!(winner.score.is_finite());
        }

        let out = dir.path().join("out");
        write_irradiance_csv(&result, &out.join("irradiance.csv"), &job).unwrap();
        write_scores_csv(&result, 0, &out.join("scores_pearson.csv"), &job).unwrap();
        write_best_csv(&result, &result.winners[0], &out.join("best_pearson.csv")).unwrap();

        assert!(out.join("irradiance.csv").exists());
        assert!(out.join("best_pearson.csv").exists());

        let scores = std::fs::read_to_string(out.join("scores_pearson.csv")).unwrap();
        assert!(scores.contains("index,A,B,score"));
        // Header line plus one row per candidate
        assert_eq!(
            scores.lines().filter(|l| !l.starts_with('#')).count(),
            6
        );
    }

    #[test]
    fn test_validate_cross_checks_the_constituent_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = test_job(dir.path());

        job.data.constituents = Some(3);
        assert!(validate(&job).is_err());

        job.data.constituents = Some(2);
        assert!(validate(&job).is_ok());
    }

    #[test]
    fn test_zero_step_domain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = test_job(dir.path());
        job.domain.step_nm = 0.0;

        let err = run(&job).unwrap_err();
        assert!(err.to_string().contains("step_nm"));
    }

    #[test]
    fn test_zero_epsilon_is_rejected_before_fitting() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = test_job(dir.path());
        job.model.epsilon = Some(0.0);

        let err = run(&job).unwrap_err();
        assert!(err.to_string().contains("model.epsilon"));

        job.model.epsilon = Some(-0.5);
        let err = validate(&job).unwrap_err();
        assert!(err.to_string().contains("model.epsilon"));
    }

    #[test]
    fn test_reference_summary_labels_grid_points() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = test_job(dir.path());

        let summary = reference_summary(&job, 3);
        assert!(summary.contains("embedded AM1.5G"));
        assert!(summary.contains("3 grid points"));

        job.reference.csv = Some("nrel_full.csv".into());
        let summary = reference_summary(&job, 501);
        assert!(summary.starts_with("nrel_full.csv"));
        assert!(summary.contains("501 grid points"));
    }
}
