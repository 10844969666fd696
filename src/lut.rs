//! Multidimensional lookup tables.
//!
//! A [`Lut`] is a dense N-dimensional array with a coordinate vector for each
//! axis. Queries are made in "fractional index" space: a value of `2.25` on
//! an axis means a quarter of the way between the third and fourth
//! coordinates. Raw coordinates are converted to fractional indices with
//! [`resolve_index`], which clamps to the ends of the axis so the table is
//! never extrapolated linearly.

use log::debug;
use ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD};
use smallvec::SmallVec;

use crate::error::ReconstructError;

/// Per-axis scratch storage. Tables in practice have five or fewer axes.
type PerAxis<T> = SmallVec<[T; 8]>;

/// Convert a raw coordinate into a fractional index along `coordinates`.
///
/// The bracketing pair is found with a right-biased binary search (a value
/// equal to a knot lands on that knot's right-hand interval), and the result
/// is clamped to `[0, N-1]`. Knots map exactly onto their own index, values
/// below the first coordinate map to `0` and values above the last map to
/// `N-1`.
///
/// A single-coordinate axis always resolves to `0`. NaN, or an empty axis,
/// gives NaN.
pub fn resolve_index(coordinates: &[f64], value: f64) -> f64 {
    let n = coordinates.len();
    if n == 0 || value.is_nan() {
        return f64::NAN;
    }
    if n == 1 {
        return 0.;
    }

    let hi = coordinates.partition_point(|&c| c <= value).clamp(1, n - 1);
    let lo = hi - 1;
    let frac = (value - coordinates[lo]) / (coordinates[hi] - coordinates[lo]);

    // Flat extrapolation past either end
    (lo as f64 + frac).clamp(0., (n - 1) as f64)
}

/// Index of the coordinate closest to `value`.
///
/// Both ends are clamped, and a value exactly halfway between two
/// coordinates picks the upper one. Returns `None` for an empty axis or a
/// NaN value.
pub fn nearest_index(coordinates: &[f64], value: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    let last = coordinates.len().checked_sub(1)?;

    let hi = coordinates.partition_point(|&c| c < value).min(last);
    let lo = hi.saturating_sub(1);

    if (coordinates[hi] - value).abs() > (coordinates[lo] - value).abs() {
        Some(lo)
    } else {
        Some(hi)
    }
}

/// One axis of a [`Lut`].
#[derive(Debug, Clone, PartialEq)]
pub struct LutAxis {
    /// Human-readable name, including units
    name: String,
    /// Strictly increasing coordinates
    coordinates: Vec<f64>,
}

impl LutAxis {
    /// Create an axis from its coordinates, which must be non-empty, finite,
    /// and strictly increasing.
    pub fn new(name: impl Into<String>, coordinates: Vec<f64>) -> Result<Self, ReconstructError> {
        let name = name.into();
        let increasing = coordinates.windows(2).all(|w| w[0] < w[1]);
        if coordinates.is_empty() || !increasing || coordinates.iter().any(|c| !c.is_finite()) {
            return Err(ReconstructError::InvalidAxis(name));
        }
        Ok(Self { name, coordinates })
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis coordinates.
    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Always `false`, since empty axes are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// The fractional index of `value` on this axis, see [`resolve_index`].
    pub fn fractional_index(&self, value: f64) -> f64 {
        resolve_index(&self.coordinates, value)
    }

    /// Largest valid fractional index.
    fn max_index(&self) -> f64 {
        (self.len() - 1) as f64
    }
}

/// A dense lookup table with multilinear interpolation.
#[derive(Debug, Clone)]
pub struct Lut {
    data: ArrayD<f64>,
    axes: Vec<LutAxis>,
}

impl Lut {
    /// Create a table, checking that `data` has one dimension per axis and
    /// that each dimension matches its axis length.
    pub fn new(data: ArrayD<f64>, axes: Vec<LutAxis>) -> Result<Self, ReconstructError> {
        let axis_lengths: Vec<usize> = axes.iter().map(LutAxis::len).collect();
        if data.shape() != axis_lengths.as_slice() {
            return Err(ReconstructError::ShapeMismatch {
                data: data.shape().to_vec(),
                axes: axis_lengths,
            });
        }

        debug!(
            "loaded LUT with axes [{}] and shape {:?}",
            axes.iter().map(LutAxis::name).collect::<Vec<_>>().join(", "),
            axis_lengths
        );
        Ok(Self { data, axes })
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// The table axes, in storage order.
    pub fn axes(&self) -> &[LutAxis] {
        &self.axes
    }

    /// The stored values.
    pub fn data(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }

    /// Interpolate the table at `M` points given in fractional-index space.
    ///
    /// `indices` holds one vector per axis, each of length `M`; point `m` is
    /// at `(indices[0][m], indices[1][m], ...)`. To hold an axis fixed,
    /// broadcast a scalar, e.g. `ndarray::aview0(&idx).broadcast(m)`.
    ///
    /// Every index must lie in `[0, len-1]` for its axis. Indices are not
    /// clamped here; use [`resolve_index`] (or [`Lut::interpolate`]) to get
    /// there from raw coordinates.
    pub fn query(&self, indices: &[ArrayView1<'_, f64>]) -> Result<Array1<f64>, ReconstructError> {
        if indices.len() != self.ndim() {
            return Err(ReconstructError::WrongAxisCount {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }

        let num_points = indices.first().map_or(0, |index| index.len());
        if indices.iter().any(|index| index.len() != num_points) {
            return Err(ReconstructError::InconsistentQuery);
        }

        for (axis, index) in self.axes.iter().zip(indices) {
            let max = axis.max_index();
            // NaN fails `contains` too
            if let Some(&bad) = index.iter().find(|f| !(0.0..=max).contains(*f)) {
                return Err(ReconstructError::IndexOutOfRange {
                    axis: axis.name.clone(),
                    index: bad,
                    max,
                });
            }
        }

        Ok(Array1::from_shape_fn(num_points, |point| {
            self.interpolate_point(indices, point)
        }))
    }

    /// Interpolate the table at raw coordinates, one vector per axis.
    ///
    /// Each coordinate is clamped onto its axis with [`resolve_index`] before
    /// the [`Lut::query`].
    pub fn interpolate(
        &self,
        values: &[ArrayView1<'_, f64>],
    ) -> Result<Array1<f64>, ReconstructError> {
        if values.len() != self.ndim() {
            return Err(ReconstructError::WrongAxisCount {
                expected: self.ndim(),
                actual: values.len(),
            });
        }

        let indices: Vec<Array1<f64>> = self
            .axes
            .iter()
            .zip(values)
            .map(|(axis, values)| values.mapv(|v| axis.fractional_index(v)))
            .collect();
        let views: Vec<ArrayView1<'_, f64>> = indices.iter().map(Array1::view).collect();
        self.query(&views)
    }

    /// Multilinear interpolation for a single, already validated, point.
    fn interpolate_point(&self, indices: &[ArrayView1<'_, f64>], point: usize) -> f64 {
        // Lower corner and the weight of the upper corner along each axis.
        // The lower corner stops one short of the end so that the last knot
        // is reached with a weight of exactly 1.
        let brackets: PerAxis<(usize, f64)> = self
            .axes
            .iter()
            .zip(indices)
            .map(|(axis, index)| {
                let f = index[point];
                let lo = (f.floor() as usize).min(axis.len().saturating_sub(2));
                (lo, f - lo as f64)
            })
            .collect();

        let ndim = brackets.len();
        let mut corner: PerAxis<usize> = SmallVec::from_elem(0, ndim);
        let mut sum = 0.;

        // Zero-weight corners are skipped, so grid points are reproduced
        // exactly and single-point axes never read past their end
        'corners: for mask in 0..(1_usize << ndim) {
            let mut weight = 1.;
            for (axis, &(lo, frac)) in brackets.iter().enumerate() {
                let upper = (mask & (1 << axis)) != 0;
                let w = if upper { frac } else { 1. - frac };
                if w == 0. {
                    continue 'corners;
                }
                weight *= w;
                corner[axis] = lo + usize::from(upper);
            }
            sum += weight * self.data[corner.as_slice()];
        }

        sum
    }
}
