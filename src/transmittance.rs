//! Gas transmittance lookup.

use ndarray::{aview0, Array1, ArrayD, ArrayView0, ArrayView1};

use crate::atmosphere::AtmosphericState;
use crate::error::ReconstructError;
use crate::lut::{Lut, LutAxis};

/// Names of the transmittance table axes, in storage order.
pub const AXIS_NAMES: [&str; 5] = [
    "solar zenith (deg)",
    "ozone (Dobson)",
    "oxygen (mb)",
    "water vapor (g/cm2)",
    "wavelength (nm)",
];

/// Gas transmittance Tg as a function of solar zenith angle, ozone, oxygen,
/// water vapor, and wavelength.
///
/// The oxygen axis is indexed by surface pressure in mb, which stands in for
/// the oxygen amount.
#[derive(Debug, Clone)]
pub struct GasTransmittance {
    lut: Lut,
}

impl GasTransmittance {
    /// Wrap a 5-axis table, ordered as in [`AXIS_NAMES`].
    pub fn new(lut: Lut) -> Result<Self, ReconstructError> {
        if lut.ndim() != AXIS_NAMES.len() {
            return Err(ReconstructError::WrongAxisCount {
                expected: AXIS_NAMES.len(),
                actual: lut.ndim(),
            });
        }
        Ok(Self { lut })
    }

    /// Build the table from the raw transmittance array and its axis
    /// coordinates.
    pub fn from_arrays(
        tg: ArrayD<f64>,
        solar_zenith: Vec<f64>,
        ozone: Vec<f64>,
        oxygen: Vec<f64>,
        water_vapor: Vec<f64>,
        wavelength: Vec<f64>,
    ) -> Result<Self, ReconstructError> {
        let axes = AXIS_NAMES
            .iter()
            .zip([solar_zenith, ozone, oxygen, water_vapor, wavelength])
            .map(|(name, coords)| LutAxis::new(*name, coords))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(Lut::new(tg, axes)?)
    }

    /// The underlying table.
    pub fn lut(&self) -> &Lut {
        &self.lut
    }

    /// Transmittance at each of `wavelengths` (nm) for one atmospheric state.
    ///
    /// No range clamping is applied to the state here beyond the flat
    /// extrapolation at the table edges.
    pub fn transmittance(
        &self,
        state: &AtmosphericState,
        wavelengths: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, ReconstructError> {
        let [sz_axis, o3_axis, o2_axis, h2o_axis, wl_axis] = self.lut.axes() else {
            return Err(ReconstructError::WrongAxisCount {
                expected: AXIS_NAMES.len(),
                actual: self.lut.ndim(),
            });
        };

        // The atmosphere is fixed for the call, so only wavelength varies
        let scalars = [
            sz_axis.fractional_index(state.solar_zenith),
            o3_axis.fractional_index(state.ozone),
            o2_axis.fractional_index(state.surface_pressure),
            h2o_axis.fractional_index(state.water_vapor),
        ];
        let wl = wavelengths.mapv(|w| wl_axis.fractional_index(w));

        let scalars: Vec<ArrayView0<'_, f64>> = scalars.iter().map(aview0).collect();
        let mut indices = scalars
            .iter()
            .map(|scalar| {
                scalar
                    .broadcast(wl.len())
                    .ok_or(ReconstructError::InconsistentQuery)
            })
            .collect::<Result<Vec<_>, _>>()?;
        indices.push(wl.view());

        self.lut.query(&indices)
    }
}
