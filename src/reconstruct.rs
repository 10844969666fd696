//! Hyperspectral Ed reconstruction from four multispectral bands.
//!
//! The measured irradiance at each band is divided by the gas transmittance
//! and by the band-averaged top-of-atmosphere irradiance. The pre-fit
//! regression turns these four normalized values into a normalized spectrum
//! on the TOA grid, which is then multiplied back by the transmittance and
//! the TOA irradiance, and finally band-averaged onto the requested output
//! wavelengths.

#[cfg(test)]
mod tests;

use log::{debug, info};
use ndarray::{aview1, Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;

use crate::atmosphere::AtmosphericState;
use crate::error::ReconstructError;
use crate::regression::{RegressionCoefficients, NUM_TERMS};
use crate::spectrum::{band_average, Spectrum, DEFAULT_HALF_WIDTH};
use crate::transmittance::GasTransmittance;

/// Number of multispectral bands.
pub const NUM_BANDS: usize = NUM_TERMS - 1;

/// Center wavelengths of the multispectral bands in nm, in regression order.
pub const BAND_WAVELENGTHS: [f64; NUM_BANDS] = [412., 489., 555., 705.];

/// Measured irradiance (W/m²/nm) at each of [`BAND_WAVELENGTHS`], in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandMeasurement(pub [f64; NUM_BANDS]);

/// Inclusive range an input is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl ClampRange {
    /// Clamp `value` into the range. NaN stays NaN.
    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            value
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Reconstruction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    /// Valid ozone range, in DU
    pub ozone: ClampRange,
    /// Valid surface pressure range, in mb
    pub surface_pressure: ClampRange,
    /// Valid water vapor range, in g/cm²
    pub water_vapor: ClampRange,
    /// Half width of the band-averaging windows, in nm
    pub half_width: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            ozone: ClampRange {
                min: 250.,
                max: 450.,
            },
            surface_pressure: ClampRange {
                min: 1000.,
                max: 1025.,
            },
            water_vapor: ClampRange { min: 0.1, max: 7. },
            half_width: DEFAULT_HALF_WIDTH,
        }
    }
}

impl ReconstructionConfig {
    /// Clamp ozone, pressure, and water vapor into their valid ranges. The
    /// solar zenith angle is left alone.
    pub fn clamp(&self, state: &AtmosphericState) -> AtmosphericState {
        AtmosphericState {
            solar_zenith: state.solar_zenith,
            ozone: self.ozone.apply(state.ozone),
            surface_pressure: self.surface_pressure.apply(state.surface_pressure),
            water_vapor: self.water_vapor.apply(state.water_vapor),
        }
    }
}

/// Reconstructs hyperspectral Ed from band measurements.
///
/// All the auxiliary data is loaded up front and never modified, so one
/// instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    transmittance: GasTransmittance,
    coefficients: RegressionCoefficients,
    toa: Spectrum,
    /// Band-averaged TOA irradiance at each of [`BAND_WAVELENGTHS`]
    toa_bands: [f64; NUM_BANDS],
    config: ReconstructionConfig,
}

impl Reconstructor {
    /// Create a reconstructor from the transmittance table, the regression
    /// coefficients, and the TOA solar irradiance spectrum (W/m²/nm).
    ///
    /// Per-wavelength coefficients must have one row per TOA sample.
    pub fn new(
        transmittance: GasTransmittance,
        coefficients: RegressionCoefficients,
        toa: Spectrum,
        config: ReconstructionConfig,
    ) -> Result<Self, ReconstructError> {
        if let Some(rows) = coefficients.num_wavelengths() {
            if rows != toa.len() {
                return Err(ReconstructError::InvalidCoefficients(format!(
                    "{rows} coefficient rows but the TOA spectrum has {} samples",
                    toa.len()
                )));
            }
        }

        let toa_bands = BAND_WAVELENGTHS.map(|band| toa.band_average(band, config.half_width));
        debug!("band-averaged TOA irradiance: {toa_bands:?}");

        Ok(Self {
            transmittance,
            coefficients,
            toa,
            toa_bands,
            config,
        })
    }

    /// The settings in use.
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// The TOA irradiance spectrum, whose grid is the native resolution of
    /// the reconstruction.
    pub fn toa(&self) -> &Spectrum {
        &self.toa
    }

    /// Reconstruct Ed on the native TOA grid.
    pub fn reconstruct_full(
        &self,
        state: &AtmosphericState,
        measurement: &BandMeasurement,
    ) -> Result<Spectrum, ReconstructError> {
        let state = self.config.clamp(state);

        // Normalize the measurements by Tg and the TOA irradiance
        let tg_bands = self
            .transmittance
            .transmittance(&state, aview1(&BAND_WAVELENGTHS))?;
        let mut x = [1.; NUM_TERMS];
        for (i, term) in x.iter_mut().skip(1).enumerate() {
            *term = measurement.0[i] / tg_bands[i] / self.toa_bands[i];
        }

        let toa_wl = self.toa.wavelength();
        let ed_norm = self.coefficients.apply(&x, toa_wl.len())?;
        let tg_full = self.transmittance.transmittance(&state, toa_wl)?;

        let ed = ed_norm * tg_full * self.toa.value();
        Spectrum::new(toa_wl.to_owned(), ed)
    }

    /// Reconstruct Ed (W/m²/nm) at each of `output_wavelengths` (nm).
    ///
    /// Each output is the mean of the native-resolution reconstruction over
    /// the configured window around that wavelength. Windows with no native
    /// samples give NaN.
    pub fn reconstruct(
        &self,
        state: &AtmosphericState,
        measurement: &BandMeasurement,
        output_wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, ReconstructError> {
        let full = self.reconstruct_full(state, measurement)?;
        Ok(output_wavelengths.mapv(|wl| {
            band_average(full.wavelength(), full.value(), wl, self.config.half_width)
        }))
    }

    /// Reconstruct many independent measurements in parallel.
    ///
    /// `states` and `measurements` must be the same length. The output is
    /// dimensioned as (`states.len()`, `output_wavelengths.len()`).
    pub fn reconstruct_batch(
        &self,
        states: &[AtmosphericState],
        measurements: &[BandMeasurement],
        output_wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, ReconstructError> {
        if states.len() != measurements.len() {
            return Err(ReconstructError::InconsistentQuery);
        }
        info!("Reconstructing Ed for {} measurements", states.len());

        let results: Vec<_> = states
            .par_iter()
            .zip(measurements)
            .map(|(state, measurement)| self.reconstruct(state, measurement, output_wavelengths))
            .collect();

        let mut output = Array2::zeros([states.len(), output_wavelengths.len()]);
        for (mut row, result) in output.axis_iter_mut(Axis(0)).zip(results) {
            row.assign(&result?);
        }
        Ok(output)
    }
}
