//! Python interface.
//!
//! NOTE: this module is only the glue between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use log::{debug, info};
use ndarray::{Array2, Axis};
use numpy::prelude::*;
use numpy::{
    PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3, PyReadonlyArrayDyn,
    ToPyArray,
};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::{
    AtmosphereGrid, AtmosphericState, BandMeasurement, GasTransmittance, ReconstructError,
    ReconstructionConfig, Reconstructor, RegressionCoefficients, Spectrum, BAND_WAVELENGTHS,
    NUM_BANDS,
};

impl From<ReconstructError> for PyErr {
    fn from(e: ReconstructError) -> Self {
        match e {
            ReconstructError::Io { ref source, .. } => PyIOError::new_err(format!("{e}: {source}")),
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Hyperspectral Ed reconstruction.
///
/// `tg` is the gas transmittance table dimensioned as (`solar_zenith`,
/// `ozone`, `oxygen`, `water_vapor`, `wavelength`), each of which is the 1d
/// axis coordinate array. `coefficients` is either a single row of 5
/// regression terms, or one row per TOA wavelength. `toa_wavelength` (nm)
/// and `toa_irradiance` (W/m²/nm) are the extraterrestrial solar spectrum.
#[pyclass(frozen)]
struct EdReconstructor {
    inner: Reconstructor,
}

#[pymethods]
impl EdReconstructor {
    #[new]
    #[pyo3(signature = (tg, solar_zenith, ozone, oxygen, water_vapor, wavelength, coefficients, toa_wavelength, toa_irradiance, half_width = crate::spectrum::DEFAULT_HALF_WIDTH))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        tg: PyReadonlyArrayDyn<'_, f64>,
        solar_zenith: PyReadonlyArray1<'_, f64>,
        ozone: PyReadonlyArray1<'_, f64>,
        oxygen: PyReadonlyArray1<'_, f64>,
        water_vapor: PyReadonlyArray1<'_, f64>,
        wavelength: PyReadonlyArray1<'_, f64>,
        coefficients: PyReadonlyArrayDyn<'_, f64>,
        toa_wavelength: PyReadonlyArray1<'_, f64>,
        toa_irradiance: PyReadonlyArray1<'_, f64>,
        half_width: f64,
    ) -> PyResult<Self> {
        let transmittance = GasTransmittance::from_arrays(
            tg.as_array().to_owned(),
            solar_zenith.as_array().to_vec(),
            ozone.as_array().to_vec(),
            oxygen.as_array().to_vec(),
            water_vapor.as_array().to_vec(),
            wavelength.as_array().to_vec(),
        )?;

        let coefficients = coefficients.as_array();
        let (rows, cols) = match *coefficients.shape() {
            [cols] => (1, cols),
            [rows, cols] => (rows, cols),
            _ => return Err(PyValueError::new_err("coefficients must be 1d or 2d")),
        };
        let table = Array2::from_shape_vec((rows, cols), coefficients.iter().copied().collect())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let coefficients = RegressionCoefficients::from_rows(table.view())?;

        let toa = Spectrum::new(
            toa_wavelength.as_array().to_owned(),
            toa_irradiance.as_array().to_owned(),
        )?;

        let config = ReconstructionConfig {
            half_width,
            ..Default::default()
        };
        let inner = Reconstructor::new(transmittance, coefficients, toa, config)?;
        Ok(Self { inner })
    }

    /// Reconstruct Ed at `output_wavelength` (nm) from the four band
    /// measurements `ed` (W/m²/nm) at 412, 489, 555, and 705 nm.
    ///
    /// `solar_zenith` is in degrees, `ozone` in DU, `surface_pressure` in mb,
    /// and `water_vapor` in g/cm².
    #[pyo3(signature = (solar_zenith, ozone, surface_pressure, water_vapor, ed, output_wavelength))]
    #[allow(clippy::too_many_arguments)]
    fn reconstruct<'py>(
        &self,
        py: Python<'py>,
        solar_zenith: f64,
        ozone: f64,
        surface_pressure: f64,
        water_vapor: f64,
        ed: [f64; NUM_BANDS],
        output_wavelength: PyReadonlyArray1<'py, f64>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let state = AtmosphericState {
            solar_zenith,
            ozone,
            surface_pressure,
            water_vapor,
        };
        let output_wavelength = output_wavelength.as_array();
        let output = py.allow_threads(|| {
            self.inner
                .reconstruct(&state, &BandMeasurement(ed), output_wavelength)
        })?;
        Ok(output.to_pyarray(py))
    }

    /// Reconstruct Ed on the native TOA grid. Returns the tuple
    /// (`wavelength`, `ed`).
    #[pyo3(signature = (solar_zenith, ozone, surface_pressure, water_vapor, ed))]
    fn reconstruct_full<'py>(
        &self,
        py: Python<'py>,
        solar_zenith: f64,
        ozone: f64,
        surface_pressure: f64,
        water_vapor: f64,
        ed: [f64; NUM_BANDS],
    ) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
        let state = AtmosphericState {
            solar_zenith,
            ozone,
            surface_pressure,
            water_vapor,
        };
        let full = py.allow_threads(|| {
            self.inner
                .reconstruct_full(&state, &BandMeasurement(ed))
        })?;
        let (wavelength, ed) = full.into_parts();
        Ok((wavelength.to_pyarray(py), ed.to_pyarray(py)))
    }

    /// Reconstruct Ed for many measurements.
    ///
    /// The atmospheric inputs have shape (`num_points`, ), `ed` has shape
    /// (`num_points`, 4), and the returned array is dimensioned as
    /// (`num_points`, `num_output_wavelengths`).
    ///
    /// The number of worker threads is controlled by `num_threads`. It must
    /// be a positive integer, or `None` to automatically choose the number
    /// of threads.
    #[pyo3(signature = (solar_zenith, ozone, surface_pressure, water_vapor, ed, output_wavelength, num_threads = None))]
    #[allow(clippy::too_many_arguments)]
    fn reconstruct_many<'py>(
        &self,
        py: Python<'py>,
        solar_zenith: PyReadonlyArray1<'py, f64>,
        ozone: PyReadonlyArray1<'py, f64>,
        surface_pressure: PyReadonlyArray1<'py, f64>,
        water_vapor: PyReadonlyArray1<'py, f64>,
        ed: PyReadonlyArray2<'py, f64>,
        output_wavelength: PyReadonlyArray1<'py, f64>,
        num_threads: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let num_points = ed.shape()[0];

        // Check shapes of all inputs
        {
            let one_dim_points = &[
                solar_zenith.len(),
                ozone.len(),
                surface_pressure.len(),
                water_vapor.len(),
            ];
            if ed.shape()[1] != NUM_BANDS || one_dim_points.iter().any(|&d| d != num_points) {
                return Err(ReconstructError::InconsistentQuery.into());
            }
        }
        debug!("input shapes are consistent");

        let (solar_zenith, ozone, surface_pressure, water_vapor) = (
            solar_zenith.as_array(),
            ozone.as_array(),
            surface_pressure.as_array(),
            water_vapor.as_array(),
        );
        let states: Vec<_> = (0..num_points)
            .map(|i| AtmosphericState {
                solar_zenith: solar_zenith[i],
                ozone: ozone[i],
                surface_pressure: surface_pressure[i],
                water_vapor: water_vapor[i],
            })
            .collect();
        let measurements: Vec<_> = ed
            .as_array()
            .axis_iter(Axis(0))
            .map(|row| {
                let mut bands = [0.; NUM_BANDS];
                bands.iter_mut().zip(row).for_each(|(b, &v)| *b = v);
                BandMeasurement(bands)
            })
            .collect();
        let output_wavelength = output_wavelength.as_array();

        let mut results = Vec::new();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.unwrap_or(0))
            .build()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        // These atomics keep track of how many points have finished and
        // whether it's time to cancel the computation or not
        let num_completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);

        info!("Reconstructing Ed for {num_points} measurements");

        pool.in_place_scope(|s| -> Result<(), PyErr> {
            s.spawn(|_| {
                states
                    .par_iter()
                    .zip(&measurements)
                    .map(|(state, measurement)| -> Result<_, ReconstructError> {
                        if cancelled.load(Ordering::Relaxed) {
                            return Err(ReconstructError::Cancelled);
                        }
                        self.inner
                            .reconstruct(state, measurement, output_wavelength)
                    })
                    .inspect(|_| {
                        num_completed.fetch_add(1, Ordering::Relaxed);
                    })
                    .collect_into_vec(&mut results);
            });

            // The work is done in the thread pool, but back here in the main
            // thread, handle progress reporting and checking for early
            // cancellation
            while !cancelled.load(Ordering::Relaxed) {
                if let Err(e) = py.check_signals() {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(e);
                }

                let num_completed = num_completed.load(Ordering::Relaxed);
                let progress = num_completed as f32 / num_points as f32 * 100.;
                debug!("Completed {num_completed}/{num_points} reconstructions ({progress:0.2}%)");

                // All finished without cancelling early
                if num_completed == num_points {
                    break;
                }

                py.allow_threads(|| {
                    std::thread::sleep(Duration::from_millis(200));
                });
            }

            Ok(())
        })?;

        // Copy the intermediate results to the output array
        debug!("copying reconstruction output");
        let mut output = Array2::zeros([num_points, output_wavelength.len()]);
        results
            .into_iter()
            .enumerate()
            .try_for_each(|(index, result)| -> Result<_, ReconstructError> {
                let ed = result?;
                output.index_axis_mut(Axis(0), index).assign(&ed);
                Ok(())
            })?;

        Ok(output.to_pyarray(py))
    }
}

/// Hourly MERRA-2 atmosphere fields for one day.
///
/// `lat` and `lon` are the grid coordinates in degrees. The fields are
/// dimensioned as (`time`, `lat`, `lon`) in their native units: `TO3` in DU,
/// `TQV` in kg/m², and `PS` in Pa.
#[pyclass(frozen)]
struct Atmosphere {
    inner: AtmosphereGrid,
}

#[pymethods]
impl Atmosphere {
    #[new]
    #[pyo3(signature = (lat, lon, total_ozone, total_water_vapor, surface_pressure))]
    fn new(
        lat: PyReadonlyArray1<'_, f64>,
        lon: PyReadonlyArray1<'_, f64>,
        total_ozone: PyReadonlyArray3<'_, f64>,
        total_water_vapor: PyReadonlyArray3<'_, f64>,
        surface_pressure: PyReadonlyArray3<'_, f64>,
    ) -> PyResult<Self> {
        let inner = AtmosphereGrid::from_merra2(
            lat.as_array().to_vec(),
            lon.as_array().to_vec(),
            total_ozone.as_array().to_owned(),
            total_water_vapor.as_array().to_owned(),
            surface_pressure.as_array().to_owned(),
        )?;
        Ok(Self { inner })
    }

    /// Atmospheric state at `time` (GMT hours) and a location in degrees.
    ///
    /// Returns the tuple (`ozone` in DU, `water_vapor` in g/cm²,
    /// `surface_pressure` in mb).
    fn state_at(&self, time: f64, lat: f64, lon: f64) -> PyResult<(f64, f64, f64)> {
        let state = self.inner.state_at(time, lat, lon)?;
        Ok((state.ozone, state.water_vapor, state.surface_pressure))
    }
}

/// A Python module implemented in Rust.
#[pymodule]
fn ed_reconstruct(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<EdReconstructor>()?;
    m.add_class::<Atmosphere>()?;
    m.add("BAND_WAVELENGTHS", BAND_WAVELENGTHS.to_vec())?;
    Ok(())
}
