//! TOML configuration deserialisation for optimisation jobs.

use cosens_core::rbf::RbfKernel;
use cosens_core::score::ConditionKind;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input table locations from TOML.
#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// CSV mapping combination labels to constituent volume fractions.
    pub compositions: String,
    /// CSV mapping wavelengths to measured absorbance per combination.
    pub absorbance: String,
    /// Expected number of constituent dyes, cross-checked against the table.
    #[serde(default)]
    pub constituents: Option<usize>,
}

/// Wavelength domain over which spectra are modelled.
#[derive(Debug, Deserialize)]
pub struct DomainConfig {
    /// First wavelength in nm (default: 300).
    #[serde(default = "default_start_nm")]
    pub start_nm: f64,
    /// Last wavelength in nm, inclusive (default: 800).
    #[serde(default = "default_stop_nm")]
    pub stop_nm: f64,
    /// Grid spacing in nm (default: 1).
    #[serde(default = "default_step_nm")]
    pub step_nm: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            start_nm: default_start_nm(),
            stop_nm: default_stop_nm(),
            step_nm: default_step_nm(),
        }
    }
}

fn default_start_nm() -> f64 {
    300.0
}
fn default_stop_nm() -> f64 {
    800.0
}
fn default_step_nm() -> f64 {
    1.0
}

/// Interpolation model parameters from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ModelConfig {
    /// Kernel: "inverse-multiquadric" (or "inverse"), "multiquadric",
    /// "gaussian", "linear", "cubic", "quintic", "thin-plate".
    #[serde(default)]
    pub kernel: RbfKernel,
    /// Shape parameter; derived from the sample spread when omitted.
    #[serde(default)]
    pub epsilon: Option<f64>,
    /// Diagonal relaxation for noisy data (default: 0, exact interpolation).
    #[serde(default)]
    pub smoothing: f64,
}

/// Reference irradiance configuration.
#[derive(Debug, Deserialize)]
pub struct ReferenceConfig {
    /// Two-column wavelength/irradiance CSV. Embedded AM1.5G when omitted.
    #[serde(default)]
    pub csv: Option<String>,
    /// Degree of the smoothing polynomial fitted before resampling (default: 6).
    #[serde(default = "default_degree")]
    pub degree: usize,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            csv: None,
            degree: default_degree(),
        }
    }
}

fn default_degree() -> usize {
    6
}

/// Candidate search configuration.
#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    /// Grid points per composition axis (default: 11, a 10% resolution).
    #[serde(default = "default_points_per_axis")]
    pub points_per_axis: usize,
    /// Fitment conditions to rank by (default: all of them).
    #[serde(default = "default_conditions")]
    pub conditions: Vec<ConditionKind>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            points_per_axis: default_points_per_axis(),
            conditions: default_conditions(),
        }
    }
}

fn default_points_per_axis() -> usize {
    11
}
fn default_conditions() -> Vec<ConditionKind> {
    ConditionKind::ALL.to_vec()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the resampled reference irradiance (default: true).
    #[serde(default = "default_true")]
    pub plot_irradiance: bool,
    /// Whether to save per-condition score tables (default: true).
    #[serde(default = "default_true")]
    pub plot_score_distribution: bool,
    /// Whether to save the winning spectra alongside the reference (default: true).
    #[serde(default = "default_true")]
    pub plot_best_spectrum: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            plot_irradiance: true,
            plot_score_distribution: true,
            plot_best_spectrum: true,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    Ok(config)
}
