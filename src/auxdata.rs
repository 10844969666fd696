//! Readers for the plain-text auxiliary data files.
//!
//! Both files are whitespace-separated numeric tables with one record per
//! line. Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};

use crate::error::ReconstructError;
use crate::regression::{RegressionCoefficients, NUM_TERMS};
use crate::spectrum::Spectrum;

/// Parse a numeric table with `width` columns into row-major values.
fn parse_table(path: &Path, text: &str, width: usize) -> Result<(usize, Vec<f64>), ReconstructError> {
    let mut values = Vec::new();
    let mut num_rows = 0;

    for (line_index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parse_error = |reason: String| ReconstructError::Parse {
            path: path.to_path_buf(),
            line: line_index + 1,
            reason,
        };

        let start = values.len();
        for field in line.split_whitespace() {
            let value = field
                .parse::<f64>()
                .map_err(|e| parse_error(format!("'{field}': {e}")))?;
            values.push(value);
        }

        let found = values.len() - start;
        if found != width {
            return Err(parse_error(format!("expected {width} columns, found {found}")));
        }
        num_rows += 1;
    }

    Ok((num_rows, values))
}

fn read(path: &Path) -> Result<String, ReconstructError> {
    fs::read_to_string(path).map_err(|source| ReconstructError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse regression coefficients from text, one row of
/// `intercept slope_412 slope_489 slope_555 slope_705` per line.
///
/// `path` is only used for error messages.
pub fn parse_coefficients(path: &Path, text: &str) -> Result<RegressionCoefficients, ReconstructError> {
    let (num_rows, values) = parse_table(path, text, NUM_TERMS)?;
    let rows = Array2::from_shape_vec((num_rows, NUM_TERMS), values)
        .map_err(|e| ReconstructError::InvalidCoefficients(e.to_string()))?;
    RegressionCoefficients::from_rows(rows.view())
}

/// Read the regression coefficients file.
///
/// A file with a single row gives coefficients shared across all
/// wavelengths, otherwise there must be one row per TOA wavelength.
pub fn read_coefficients(path: impl AsRef<Path>) -> Result<RegressionCoefficients, ReconstructError> {
    let path = path.as_ref();
    let coefficients = parse_coefficients(path, &read(path)?)?;
    debug!(
        "read {} row(s) of regression coefficients from {}",
        coefficients.num_wavelengths().unwrap_or(1),
        path.display()
    );
    Ok(coefficients)
}

/// Parse a TOA irradiance spectrum from text, with columns of wavelength
/// (nm) and irradiance (W/m²/nm).
///
/// `path` is only used for error messages.
pub fn parse_toa_spectrum(path: &Path, text: &str) -> Result<Spectrum, ReconstructError> {
    let (_, values) = parse_table(path, text, 2)?;
    let (wavelength, irradiance): (Vec<f64>, Vec<f64>) =
        values.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();
    Spectrum::new(Array1::from(wavelength), Array1::from(irradiance))
}

/// Read the TOA solar irradiance spectrum file.
pub fn read_toa_spectrum(path: impl AsRef<Path>) -> Result<Spectrum, ReconstructError> {
    let path = path.as_ref();
    let spectrum = parse_toa_spectrum(path, &read(path)?)?;
    debug!(
        "read TOA spectrum with {} samples from {}",
        spectrum.len(),
        path.display()
    );
    Ok(spectrum)
}
