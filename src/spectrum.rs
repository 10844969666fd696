//! Sampled spectra and band averaging.

use ndarray::{s, Array1, ArrayView1};

use crate::error::ReconstructError;

/// Default half width of a band-averaging window, in nm.
pub const DEFAULT_HALF_WIDTH: f64 = 5.0;

/// Mean of `values` over the samples whose wavelength is within
/// `[center - half_width, center + half_width]`, inclusive.
///
/// `wavelengths` must be sorted in increasing order and aligned with
/// `values`. An empty window gives NaN, which callers are expected to carry
/// through rather than treat as fatal.
pub fn band_average(
    wavelengths: ArrayView1<'_, f64>,
    values: ArrayView1<'_, f64>,
    center: f64,
    half_width: f64,
) -> f64 {
    let lower = center - half_width;
    let upper = center + half_width;

    // Wavelengths are sorted, so the window is a contiguous run
    let start = wavelengths.iter().take_while(|&&w| w < lower).count();
    let len = wavelengths
        .slice(s![start..])
        .iter()
        .take_while(|&&w| w <= upper)
        .count();

    let end = (start + len).min(values.len());
    values
        .slice(s![start.min(end)..end])
        .mean()
        .unwrap_or(f64::NAN)
}

/// A spectrum sampled on a strictly increasing wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Wavelength in nm
    wavelength: Array1<f64>,
    /// Spectral value at each wavelength
    value: Array1<f64>,
}

impl Spectrum {
    /// Create a spectrum. The two arrays must be the same non-zero length and
    /// the wavelengths must be strictly increasing.
    pub fn new(wavelength: Array1<f64>, value: Array1<f64>) -> Result<Self, ReconstructError> {
        if wavelength.is_empty() {
            return Err(ReconstructError::InvalidSpectrum("no samples"));
        }
        if wavelength.len() != value.len() {
            return Err(ReconstructError::InvalidSpectrum(
                "wavelengths and values have different lengths",
            ));
        }
        let increasing = wavelength
            .iter()
            .zip(wavelength.iter().skip(1))
            .all(|(a, b)| a < b);
        if !increasing {
            return Err(ReconstructError::InvalidSpectrum(
                "wavelengths are not strictly increasing",
            ));
        }
        Ok(Self { wavelength, value })
    }

    /// Wavelengths in nm.
    pub fn wavelength(&self) -> ArrayView1<'_, f64> {
        self.wavelength.view()
    }

    /// Values aligned with [`Spectrum::wavelength`].
    pub fn value(&self) -> ArrayView1<'_, f64> {
        self.value.view()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    /// Always `false`, since empty spectra are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Split into `(wavelength, value)`.
    pub fn into_parts(self) -> (Array1<f64>, Array1<f64>) {
        (self.wavelength, self.value)
    }

    /// Band average of this spectrum, see [`band_average`].
    pub fn band_average(&self, center: f64, half_width: f64) -> f64 {
        band_average(self.wavelength(), self.value(), center, half_width)
    }

    /// Band average at each of `centers`.
    pub fn resample(&self, centers: ArrayView1<'_, f64>, half_width: f64) -> Array1<f64> {
        centers.mapv(|center| self.band_average(center, half_width))
    }
}
