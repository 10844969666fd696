//! Hyperspectral downwelling irradiance (Ed) reconstruction.
//!
//! Four multispectral Ed measurements at 412, 489, 555, and 705 nm are turned
//! into a full spectrum using a gas transmittance lookup table, a pre-fit
//! linear regression, and the top-of-atmosphere solar irradiance. See
//! [`Reconstructor`] for the algorithm.
//!
//! All the auxiliary data is loaded by the caller and handed to
//! [`Reconstructor::new`]; nothing in the reconstruction itself reads files.
//! The [`auxdata`] readers cover the plain-text coefficient and TOA files,
//! and [`AtmosphereGrid`] gives the atmospheric state from gridded
//! reanalysis fields.
//!
//! With the `python` feature, the crate is also a Python extension module.

pub mod atmosphere;
pub mod auxdata;
pub(crate) mod error;
pub mod lut;
pub mod reconstruct;
pub mod regression;
pub mod spectrum;
pub mod transmittance;

#[cfg(feature = "python")]
mod python;

pub use atmosphere::{AtmosphereGrid, AtmosphericConditions, AtmosphericState};
pub use error::ReconstructError;
pub use lut::{Lut, LutAxis};
pub use reconstruct::{
    BandMeasurement, ClampRange, ReconstructionConfig, Reconstructor, BAND_WAVELENGTHS, NUM_BANDS,
};
pub use regression::RegressionCoefficients;
pub use spectrum::Spectrum;
pub use transmittance::GasTransmittance;
