//! Linear regression from band-normalized irradiance to a full spectrum.

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::ReconstructError;

/// Number of regression terms: an intercept plus one slope per band.
pub const NUM_TERMS: usize = 5;

/// Pre-fit regression coefficients.
///
/// Each row is `[intercept, slope_412, slope_489, slope_555, slope_705]`, so
/// the slopes are bound to the band order of
/// [`BandMeasurement`](crate::BandMeasurement) and must not be reordered.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionCoefficients {
    /// A single row applied at every wavelength of the output grid.
    Shared([f64; NUM_TERMS]),
    /// One row per wavelength of the output grid, shaped (`num_wl`, 5).
    PerWavelength(Array2<f64>),
}

impl RegressionCoefficients {
    /// Build from a table shaped (`rows`, 5). A single row becomes
    /// [`RegressionCoefficients::Shared`].
    pub fn from_rows(rows: ArrayView2<'_, f64>) -> Result<Self, ReconstructError> {
        if rows.ncols() != NUM_TERMS || rows.nrows() == 0 {
            return Err(ReconstructError::InvalidCoefficients(format!(
                "expected rows of {NUM_TERMS} terms, got shape {:?}",
                rows.shape()
            )));
        }

        if rows.nrows() == 1 {
            let mut row = [0.; NUM_TERMS];
            row.iter_mut().zip(rows.row(0)).for_each(|(r, &c)| *r = c);
            Ok(Self::Shared(row))
        } else {
            Ok(Self::PerWavelength(rows.to_owned()))
        }
    }

    /// Number of wavelengths these coefficients are tied to, if any.
    pub fn num_wavelengths(&self) -> Option<usize> {
        match self {
            Self::Shared(_) => None,
            Self::PerWavelength(rows) => Some(rows.nrows()),
        }
    }

    /// Evaluate the regression for the input vector `x` (with the leading
    /// `1` for the intercept) on a grid of `num_wl` wavelengths.
    pub fn apply(
        &self,
        x: &[f64; NUM_TERMS],
        num_wl: usize,
    ) -> Result<Array1<f64>, ReconstructError> {
        match self {
            Self::Shared(row) => {
                let value: f64 = row.iter().zip(x).map(|(c, x)| c * x).sum();
                Ok(Array1::from_elem(num_wl, value))
            }
            Self::PerWavelength(rows) => {
                if rows.nrows() != num_wl {
                    return Err(ReconstructError::InvalidCoefficients(format!(
                        "{} coefficient rows for {num_wl} wavelengths",
                        rows.nrows()
                    )));
                }
                Ok(rows.dot(&Array1::from(x.to_vec())))
            }
        }
    }
}
