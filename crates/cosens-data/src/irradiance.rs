//! Reference solar irradiance.
//!
//! The built-in reference is the AM1.5 global-tilt spectrum (ASTM G-173-03,
//! as distributed by NREL), embedded at compile time as a coarse 10 nm
//! table over 300-1000 nm. Data source:
//! <https://www.nrel.gov/grid/solar-resource/spectra-am1.5.html>
//!
//! Scoring never reads the raw table directly: [`ReferenceSpectrum::resample`]
//! fits a polynomial regression through the tabulated points and evaluates
//! it on the run's wavelength grid, smoothing over the telluric absorption
//! dips that a coarse table samples unevenly. A full-resolution measurement
//! can be substituted with [`ReferenceSpectrum::from_csv`].

use std::path::Path;

use crate::dataset::DatasetError;
use crate::polyfit;
use cosens_core::types::WavelengthGrid;

/// AM1.5 global tilt, coarsely resampled: `(wavelength nm, W m^-2 nm^-1)`.
const AM15_GLOBAL_TILT: [(f64, f64); 71] = [
    (300.0, 0.0102),
    (310.0, 0.1095),
    (320.0, 0.2530),
    (330.0, 0.4083),
    (340.0, 0.5034),
    (350.0, 0.5530),
    (360.0, 0.5689),
    (370.0, 0.7345),
    (380.0, 0.7158),
    (390.0, 0.8133),
    (400.0, 1.1141),
    (410.0, 1.1603),
    (420.0, 1.1803),
    (430.0, 1.0077),
    (440.0, 1.2649),
    (450.0, 1.5564),
    (460.0, 1.5580),
    (470.0, 1.5440),
    (480.0, 1.5810),
    (490.0, 1.5080),
    (500.0, 1.5430),
    (510.0, 1.4960),
    (520.0, 1.4370),
    (530.0, 1.5180),
    (540.0, 1.4610),
    (550.0, 1.5160),
    (560.0, 1.4700),
    (570.0, 1.4790),
    (580.0, 1.5090),
    (590.0, 1.4570),
    (600.0, 1.4440),
    (610.0, 1.4470),
    (620.0, 1.4400),
    (630.0, 1.4240),
    (640.0, 1.4110),
    (650.0, 1.3480),
    (660.0, 1.3800),
    (670.0, 1.3740),
    (680.0, 1.3470),
    (690.0, 1.2490),
    (700.0, 1.2820),
    (710.0, 1.2760),
    (720.0, 1.1630),
    (730.0, 1.2080),
    (740.0, 1.2150),
    (750.0, 1.2070),
    (760.0, 0.7470),
    (770.0, 1.1510),
    (780.0, 1.1470),
    (790.0, 1.1200),
    (800.0, 1.1000),
    (810.0, 0.9720),
    (820.0, 0.9560),
    (830.0, 0.9810),
    (840.0, 1.0070),
    (850.0, 0.9660),
    (860.0, 0.9760),
    (870.0, 0.9450),
    (880.0, 0.9480),
    (890.0, 0.9170),
    (900.0, 0.8240),
    (910.0, 0.8500),
    (920.0, 0.8060),
    (930.0, 0.6460),
    (940.0, 0.5250),
    (950.0, 0.4690),
    (960.0, 0.6170),
    (970.0, 0.6850),
    (980.0, 0.6900),
    (990.0, 0.6800),
    (1000.0, 0.6940),
];

/// Tabulated spectral irradiance samples.
#[derive(Debug)]
pub struct ReferenceSpectrum {
    wavelengths_nm: Vec<f64>,
    irradiance: Vec<f64>,
}

impl ReferenceSpectrum {
    /// The embedded AM1.5 global-tilt table.
    pub fn am15g() -> Self {
        let (wavelengths_nm, irradiance) = AM15_GLOBAL_TILT.iter().copied().unzip();
        Self {
            wavelengths_nm,
            irradiance,
        }
    }

    /// Load a two-column `wavelength, irradiance` CSV.
    ///
    /// A leading header row is skipped if its first field is not numeric.
    pub fn from_csv(path: &Path) -> Result<Self, DatasetError> {
        let display = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|source| DatasetError::Csv {
                path: display.clone(),
                source,
            })?;

        let mut wavelengths_nm = Vec::new();
        let mut irradiance = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result.map_err(|source| DatasetError::Csv {
                path: display.clone(),
                source,
            })?;
            let row_no = i + 1;

            let first = record.get(0).unwrap_or("").trim();
            if i == 0 && first.parse::<f64>().is_err() {
                log::debug!("Skipping header row in {display}");
                continue;
            }

            wavelengths_nm.push(parse_field(first, &display, row_no)?);
            irradiance.push(parse_field(
                record.get(1).unwrap_or(""),
                &display,
                row_no,
            )?);
        }

        if wavelengths_nm.len() < 2 {
            return Err(DatasetError::Structure {
                details: format!("{display} holds fewer than two irradiance samples"),
            });
        }

        Ok(Self {
            wavelengths_nm,
            irradiance,
        })
    }

    /// Regression of the table evaluated on a run grid.
    ///
    /// The polynomial is fitted over the whole table, so the table must
    /// cover the grid span; extrapolating a high-degree regression beyond
    /// its data is rejected as a domain error.
    pub fn resample(
        &self,
        grid: &WavelengthGrid,
        degree: usize,
    ) -> Result<Vec<f64>, DatasetError> {
        let (data_min, data_max) = self.span();
        if grid.start_nm < data_min - 1e-9 || grid.stop_nm > data_max + 1e-9 {
            return Err(DatasetError::Coverage {
                data_min,
                data_max,
                grid_min: grid.start_nm,
                grid_max: grid.stop_nm,
            });
        }

        let regression = polyfit::fit(&self.wavelengths_nm, &self.irradiance, degree)?;
        Ok(regression.sample(&grid.values()))
    }

    /// Smallest and largest tabulated wavelength (nm).
    pub fn span(&self) -> (f64, f64) {
        let min = self
            .wavelengths_nm
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        let max = self
            .wavelengths_nm
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    /// Tabulated wavelengths (nm).
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths_nm
    }

    /// Tabulated spectral irradiance (W m^-2 nm^-1).
    pub fn irradiance(&self) -> &[f64] {
        &self.irradiance
    }

    /// Number of tabulated samples.
    pub fn len(&self) -> usize {
        self.wavelengths_nm.len()
    }

    /// Whether the table is empty. Never true for a loaded spectrum.
    pub fn is_empty(&self) -> bool {
        self.wavelengths_nm.is_empty()
    }
}

fn parse_field(field: &str, path: &str, row: usize) -> Result<f64, DatasetError> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_table_is_ordered_and_covers_the_default_grid() {
        let reference = ReferenceSpectrum::am15g();
        assert_eq!(reference.len(), 71);
        for pair in reference.wavelengths().windows(2) {
            assert!(pair[0] < pair[1]);
        }
        let (min, max) = reference.span();
        let grid = WavelengthGrid::default();
        assert!(min <= grid.start_nm && max >= grid.stop_nm);
    }

    #[test]
    fn test_resample_on_default_grid() {
        let reference = ReferenceSpectrum::am15g();
        let grid = WavelengthGrid::default();
        let values = reference.resample(&grid, 6).unwrap();

        assert_eq!(values.len(), grid.len());
        assert!(values.iter().all(|v| v.is_finite()));
        // The regression should track the broad shape: mid-visible output
        // well above the near-UV tail.
        let at = |nm: f64| values[((nm - grid.start_nm) / grid.step_nm) as usize];
        assert!(at(550.0) > 1.0);
        assert!(at(550.0) > at(310.0));
    }

    #[test]
    fn test_resample_outside_table_span_is_rejected() {
        let reference = ReferenceSpectrum::am15g();
        let grid = WavelengthGrid::new(200.0, 900.0, 1.0);
        let err = reference.resample(&grid, 6).unwrap_err();
        assert!(matches!(err, DatasetError::Coverage { .. }));
    }

    #[test]
    fn test_from_csv_with_and_without_header() {
        let dir = TempDir::new().unwrap();

        let with_header = dir.path().join("with_header.csv");
        fs::write(&with_header, "wavelength,irradiance\n300,0.01\n400,1.11\n500,1.54\n")
            .unwrap();
        let loaded = ReferenceSpectrum::from_csv(&with_header).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.wavelengths()[0], 300.0);

        let bare = dir.path().join("bare.csv");
        fs::write(&bare, "300,0.01\n400,1.11\n500,1.54\n").unwrap();
        let loaded = ReferenceSpectrum::from_csv(&bare).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.irradiance()[2], 1.54);
    }

    #[test]
    fn test_from_csv_rejects_garbage_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "300,0.01\n400,not-a-number\n").unwrap();
        let err = ReferenceSpectrum::from_csv(&path).unwrap_err();
        assert!(matches!(err, DatasetError::BadNumber { .. }));
    }
}
