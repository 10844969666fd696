//! Atmospheric state, and its retrieval from gridded reanalysis fields.

use log::debug;
use ndarray::Array3;

use crate::error::ReconstructError;
use crate::lut::{nearest_index, LutAxis};

/// Atmospheric state for a single reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericState {
    /// Solar zenith angle in degrees
    pub solar_zenith: f64,
    /// Total column ozone in Dobson units
    pub ozone: f64,
    /// Surface pressure in mb (hPa)
    pub surface_pressure: f64,
    /// Total precipitable water vapor in g/cm²
    pub water_vapor: f64,
}

/// Gas amounts at a point in space and time, without the sun geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericConditions {
    /// Total column ozone in Dobson units
    pub ozone: f64,
    /// Total precipitable water vapor in g/cm²
    pub water_vapor: f64,
    /// Surface pressure in mb (hPa)
    pub surface_pressure: f64,
}

impl AtmosphericConditions {
    /// Combine with a solar zenith angle (degrees) into a full state.
    pub fn with_solar_zenith(self, solar_zenith: f64) -> AtmosphericState {
        AtmosphericState {
            solar_zenith,
            ozone: self.ozone,
            surface_pressure: self.surface_pressure,
            water_vapor: self.water_vapor,
        }
    }
}

/// Hourly gridded atmosphere fields for one day.
///
/// Each field is dimensioned as (`num_times`, `num_lat`, `num_lon`), with
/// time step `i` at hour `i`. Fields are stored in the units of
/// [`AtmosphericConditions`].
#[derive(Debug, Clone)]
pub struct AtmosphereGrid {
    lat: LutAxis,
    lon: LutAxis,
    ozone: Array3<f64>,
    water_vapor: Array3<f64>,
    surface_pressure: Array3<f64>,
}

impl AtmosphereGrid {
    /// Create a grid from fields already in DU, g/cm², and mb.
    ///
    /// `lat` and `lon` (degrees) must be strictly increasing, and every field
    /// must be shaped (`num_times`, `lat.len()`, `lon.len()`) with at least
    /// one time step.
    pub fn new(
        lat: Vec<f64>,
        lon: Vec<f64>,
        ozone: Array3<f64>,
        water_vapor: Array3<f64>,
        surface_pressure: Array3<f64>,
    ) -> Result<Self, ReconstructError> {
        let lat = LutAxis::new("latitude (deg)", lat)?;
        let lon = LutAxis::new("longitude (deg)", lon)?;

        let expected = [ozone.shape()[0].max(1), lat.len(), lon.len()];
        for field in [&ozone, &water_vapor, &surface_pressure] {
            if field.shape() != expected.as_slice() {
                return Err(ReconstructError::InconsistentGrid {
                    expected,
                    actual: field.shape().to_vec(),
                });
            }
        }

        debug!(
            "atmosphere grid has {} time steps on a {}x{} lat/lon grid",
            expected[0], expected[1], expected[2]
        );
        Ok(Self {
            lat,
            lon,
            ozone,
            water_vapor,
            surface_pressure,
        })
    }

    /// Create a grid from MERRA-2 single-level fields in their native units.
    ///
    /// `total_ozone` (`TO3`) is in DU, `total_water_vapor` (`TQV`) in kg/m²,
    /// and `surface_pressure` (`PS`) in Pa.
    pub fn from_merra2(
        lat: Vec<f64>,
        lon: Vec<f64>,
        total_ozone: Array3<f64>,
        total_water_vapor: Array3<f64>,
        surface_pressure: Array3<f64>,
    ) -> Result<Self, ReconstructError> {
        // kg/m² to g/cm²
        let water_vapor = total_water_vapor.mapv(|tqv| tqv / 10.);
        // Pa to mb
        let surface_pressure = surface_pressure.mapv(|ps| ps / 100.);
        Self::new(lat, lon, total_ozone, water_vapor, surface_pressure)
    }

    /// Number of time steps.
    pub fn num_times(&self) -> usize {
        self.ozone.shape()[0]
    }

    /// Atmospheric conditions at `time` (hours since the first step) and a
    /// location in degrees.
    ///
    /// The location snaps to the nearest grid point. In time, the values are
    /// interpolated linearly between `floor(time)` and the following step;
    /// past the last step the last value is held, so for hourly data
    /// `time = 24` gives the value at hour 23.
    pub fn state_at(
        &self,
        time: f64,
        lat: f64,
        lon: f64,
    ) -> Result<AtmosphericConditions, ReconstructError> {
        let last = self.num_times() - 1;
        if !(0.0..=(last + 1) as f64).contains(&time) {
            return Err(ReconstructError::TimeOutOfRange {
                time,
                max: (last + 1) as f64,
            });
        }

        let (Some(i_lat), Some(i_lon)) = (
            nearest_index(self.lat.coordinates(), lat),
            nearest_index(self.lon.coordinates(), lon),
        ) else {
            return Err(ReconstructError::InvalidAxis("latitude/longitude".into()));
        };

        let t1 = (time.floor() as usize).min(last);
        let t2 = (t1 + 1).min(last);
        let dist = time - t1 as f64;

        let at = |field: &Array3<f64>| {
            let v1 = field[[t1, i_lat, i_lon]];
            let v2 = field[[t2, i_lat, i_lon]];
            if t1 == t2 {
                v1
            } else {
                v1 + (v2 - v1) * dist
            }
        };

        Ok(AtmosphericConditions {
            ozone: at(&self.ozone),
            water_vapor: at(&self.water_vapor),
            surface_pressure: at(&self.surface_pressure),
        })
    }
}
