//! Measured dye-combination tables.
//!
//! Two CSV tables describe a measurement campaign:
//!
//! **Composition table** — one row per measured combination. The header
//! names the constituent dyes; the first column labels each combination.
//!
//! ```csv
//! combination,A,B,K
//! D1,1.0,0.0,0.0
//! D7,0.5,0.5,0.0
//! ```
//!
//! **Absorbance table** — one row per wavelength, one column per measured
//! combination, labelled in the header.
//!
//! ```csv
//! wavelength,D1,D7
//! 300,0.101,0.085
//! 301,0.102,0.086
//! ```
//!
//! The tables are joined on combination label, so row and column order are
//! free to differ; every label must appear exactly once on each side. The
//! wavelength column must sit exactly on the configured grid (to within
//! [`WAVELENGTH_TOLERANCE_NM`]), so a file sampled on a shifted or coarser
//! domain is rejected rather than silently misaligned.
//!
//! Negative measured absorbances are clamped to zero at load; small negative
//! baselines are routine in UV/VIS exports and carry no physical meaning.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use cosens_core::types::{CombinationRecord, Composition, WavelengthGrid};

/// Largest wavelength disagreement (nm) tolerated between an input table and
/// the configured grid.
pub const WAVELENGTH_TOLERANCE_NM: f64 = 1e-6;

/// Errors from dataset loading and validation.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path}, row {row}: cannot parse '{value}' as a number")]
    BadNumber {
        path: String,
        row: usize,
        value: String,
    },

    #[error("{path}, row {row}: value {value} is not finite")]
    NotFinite { path: String, row: usize, value: f64 },

    #[error("Malformed table: {details}")]
    Structure { details: String },

    /// The two tables do not describe the same set of combinations.
    #[error(
        "Tables disagree on combination labels: \
         composition rows without an absorbance column {missing:?}, \
         absorbance columns without a composition row {extra:?}"
    )]
    LabelMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error(
        "Wavelength domain mismatch in {path}: row {row} reads {found} nm \
         where the grid expects {expected} nm"
    )]
    DomainMismatch {
        path: String,
        row: usize,
        found: f64,
        expected: f64,
    },

    #[error("{path} has {found} wavelength rows but the grid has {expected} samples")]
    RowCount {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "Reference spectrum covers [{data_min}, {data_max}] nm but the grid \
         spans [{grid_min}, {grid_max}] nm"
    )]
    Coverage {
        data_min: f64,
        data_max: f64,
        grid_min: f64,
        grid_max: f64,
    },

    #[error(transparent)]
    Polyfit(#[from] crate::polyfit::PolyfitError),
}

/// A validated measurement campaign: constituent names and one record per
/// measured combination, all sampled on the shared wavelength grid.
#[derive(Debug)]
pub struct DyeDataset {
    constituents: Vec<String>,
    records: Vec<CombinationRecord>,
    grid: WavelengthGrid,
}

impl DyeDataset {
    /// Load and cross-validate the composition and absorbance tables.
    ///
    /// Record order follows the composition table.
    pub fn load(
        composition_path: &Path,
        absorbance_path: &Path,
        grid: &WavelengthGrid,
    ) -> Result<Self, DatasetError> {
        let (constituents, labels, fractions) = read_composition_table(composition_path)?;
        let (column_labels, wavelengths, mut columns) =
            read_absorbance_table(absorbance_path)?;

        let absorbance_display = absorbance_path.display().to_string();

        if wavelengths.len() != grid.len() {
            return Err(DatasetError::RowCount {
                path: absorbance_display,
                expected: grid.len(),
                found: wavelengths.len(),
            });
        }
        if let Some(row) = grid.first_mismatch(&wavelengths, WAVELENGTH_TOLERANCE_NM) {
            return Err(DatasetError::DomainMismatch {
                path: absorbance_display,
                row: row + 1,
                found: wavelengths[row],
                expected: grid.start_nm + row as f64 * grid.step_nm,
            });
        }

        let clamped = clamp_negative(&mut columns);
        if clamped > 0 {
            log::warn!(
                "Clamped {clamped} negative absorbance values to zero in {}",
                absorbance_path.display()
            );
        }

        // Join on combination label; matched columns are consumed so that
        // anything left over is an extra column.
        let mut column_of: HashMap<String, Vec<f64>> = HashMap::new();
        for (label, column) in column_labels.iter().zip(columns.into_iter()) {
            if column_of.insert(label.clone(), column).is_some() {
                return Err(DatasetError::Structure {
                    details: format!(
                        "combination '{label}' appears more than once in {}",
                        absorbance_path.display()
                    ),
                });
            }
        }

        let mut records = Vec::with_capacity(labels.len());
        let mut missing = Vec::new();
        for (label, row) in labels.into_iter().zip(fractions.into_iter()) {
            if records
                .iter()
                .any(|r: &CombinationRecord| r.label == label)
            {
                return Err(DatasetError::Structure {
                    details: format!(
                        "combination '{label}' appears more than once in {}",
                        composition_path.display()
                    ),
                });
            }
            match column_of.remove(&label) {
                Some(absorbance) => records.push(CombinationRecord {
                    label,
                    composition: Composition::new(row),
                    absorbance,
                }),
                None => missing.push(label),
            }
        }

        let mut extra: Vec<String> = column_of.into_keys().collect();
        if !missing.is_empty() || !extra.is_empty() {
            extra.sort();
            return Err(DatasetError::LabelMismatch { missing, extra });
        }

        if constituents.is_empty() {
            return Err(DatasetError::Structure {
                details: format!(
                    "{} names no constituent columns",
                    composition_path.display()
                ),
            });
        }
        if records.is_empty() {
            return Err(DatasetError::Structure {
                details: format!("{} has no combination rows", composition_path.display()),
            });
        }

        log::info!(
            "Loaded {} combinations of {} constituents over {} wavelengths",
            records.len(),
            constituents.len(),
            grid.len()
        );

        Ok(Self {
            constituents,
            records,
            grid: grid.clone(),
        })
    }

    /// Constituent dye names, in composition-table column order.
    pub fn constituents(&self) -> &[String] {
        &self.constituents
    }

    /// The measured combinations, in composition-table row order.
    pub fn records(&self) -> &[CombinationRecord] {
        &self.records
    }

    /// Number of constituent dyes (D).
    pub fn dimension(&self) -> usize {
        self.constituents.len()
    }

    /// Number of measured combinations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no combinations. Never true after `load`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The wavelength grid the dataset was validated against.
    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }
}

/// Returns `(constituent names, combination labels, fraction rows)`.
fn read_composition_table(
    path: &Path,
) -> Result<(Vec<String>, Vec<String>, Vec<Vec<f64>>), DatasetError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Csv {
        path: display.clone(),
        source,
    })?;

    let constituents: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?;
        let row_no = i + 1;

        let label = record.get(0).unwrap_or("").trim().to_string();
        if label.is_empty() {
            return Err(DatasetError::Structure {
                details: format!("{display}, row {row_no} has an empty combination label"),
            });
        }

        let mut fractions = Vec::with_capacity(constituents.len());
        for field in record.iter().skip(1) {
            fractions.push(parse_number(field, &display, row_no)?);
        }
        labels.push(label);
        rows.push(fractions);
    }

    Ok((constituents, labels, rows))
}

/// Returns `(combination labels, wavelength column, one absorbance column
/// per combination)`.
fn read_absorbance_table(
    path: &Path,
) -> Result<(Vec<String>, Vec<f64>, Vec<Vec<f64>>), DatasetError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Csv {
        path: display.clone(),
        source,
    })?;

    let labels: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    if labels.is_empty() {
        return Err(DatasetError::Structure {
            details: format!("{display} names no combination columns"),
        });
    }

    let mut wavelengths = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); labels.len()];
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?;
        let row_no = i + 1;

        wavelengths.push(parse_number(record.get(0).unwrap_or(""), &display, row_no)?);
        for (column, field) in columns.iter_mut().zip(record.iter().skip(1)) {
            column.push(parse_number(field, &display, row_no)?);
        }
    }

    Ok((labels, wavelengths, columns))
}

fn parse_number(field: &str, path: &str, row: usize) -> Result<f64, DatasetError> {
    let value: f64 = field
        .trim()
        .parse()
        .map_err(|_| DatasetError::BadNumber {
            path: path.to_string(),
            row,
            value: field.trim().to_string(),
        })?;
    if !value.is_finite() {
        return Err(DatasetError::NotFinite {
            path: path.to_string(),
            row,
            value,
        });
    }
    Ok(value)
}

/// Clamp negative values to zero in place, returning how many were touched.
fn clamp_negative(columns: &mut [Vec<f64>]) -> usize {
    let mut clamped = 0;
    for column in columns {
        for value in column {
            if *value < 0.0 {
                *value = 0.0;
                clamped += 1;
            }
        }
    }
    clamped
}
