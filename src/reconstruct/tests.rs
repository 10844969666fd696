use approx::assert_relative_eq;
use ndarray::{array, Array, Array1, IxDyn};

use super::*;

/// Transmittance table with two points per axis and a given value function
/// of (ozone, pressure, water vapor).
fn two_point_tg(f: impl Fn(f64, f64, f64) -> f64) -> GasTransmittance {
    let sz = vec![0., 80.];
    let o3 = vec![250., 450.];
    let o2 = vec![1000., 1025.];
    let h2o = vec![0.1, 7.];
    let wl = vec![400., 800.];
    let tg = Array::from_shape_fn(IxDyn(&[2; 5]), |idx| {
        f(o3[idx[1]], o2[idx[2]], h2o[idx[3]])
    });
    GasTransmittance::from_arrays(tg, sz, o3, o2, h2o, wl).unwrap()
}

/// Linear in every gas, so every clamp is visible in the output.
fn sloped_tg() -> GasTransmittance {
    two_point_tg(|o3, p, h2o| 1. - 0.0005 * (o3 - 250.) - 0.001 * (p - 1000.) - 0.01 * h2o)
}

/// Constant TOA irradiance from 400 to 800 nm every 0.5 nm.
fn flat_toa(value: f64) -> Spectrum {
    let wl = Array1::range(400., 800.5, 0.5);
    let toa = Array1::from_elem(wl.len(), value);
    Spectrum::new(wl, toa).unwrap()
}

fn band1_passthrough() -> RegressionCoefficients {
    RegressionCoefficients::Shared([0., 1., 0., 0., 0.])
}

fn state() -> AtmosphericState {
    AtmosphericState {
        solar_zenith: 30.,
        ozone: 320.,
        surface_pressure: 1013.,
        water_vapor: 2.,
    }
}

#[test]
fn worked_example() {
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        band1_passthrough(),
        flat_toa(2.0),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let measurement = BandMeasurement([2.0, 0.3, 0.3, 0.3]);

    // Es_toa at each band is the constant 2.0
    for band in reconstructor.toa_bands {
        assert_relative_eq!(band, 2.0, max_relative = 1e-12);
    }

    // Ed0 = 2/1, Ed_norm = 2/2 = 1, and the regression passes band 1 through,
    // so the native-resolution Ed is 1 * Tg * Es_toa = 2 everywhere
    let full = reconstructor.reconstruct_full(&state(), &measurement).unwrap();
    assert_eq!(full.len(), reconstructor.toa().len());
    for &ed in full.value() {
        assert_relative_eq!(ed, 2.0, max_relative = 1e-12);
    }

    let result = reconstructor
        .reconstruct(&state(), &measurement, array![412.].view())
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_relative_eq!(result[0], 2.0, max_relative = 1e-12);
}

#[test]
fn transmittance_is_removed_then_reapplied() {
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 0.5),
        band1_passthrough(),
        flat_toa(2.0),
        ReconstructionConfig::default(),
    )
    .unwrap();

    // Ed0 = 1/0.5 = 2, Ed_norm = 1, Ed = 1 * 0.5 * 2 = 1
    let result = reconstructor
        .reconstruct(
            &state(),
            &BandMeasurement([1.0, 0.3, 0.3, 0.3]),
            array![412., 600.].view(),
        )
        .unwrap();
    assert_relative_eq!(result[0], 1.0, max_relative = 1e-12);
    assert_relative_eq!(result[1], 1.0, max_relative = 1e-12);
}

#[test]
fn intercept_and_slopes_are_positional() {
    let coefficients = RegressionCoefficients::Shared([0.25, 0., 0., 0., 2.]);
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        coefficients,
        flat_toa(4.0),
        ReconstructionConfig::default(),
    )
    .unwrap();

    // Only the 705 nm band counts: Ed_norm = 0.25 + 2 * (1/4) = 0.75
    let result = reconstructor
        .reconstruct(
            &state(),
            &BandMeasurement([100., 100., 100., 1.]),
            array![500.].view(),
        )
        .unwrap();
    assert_relative_eq!(result[0], 0.75 * 4.0, max_relative = 1e-12);
}

#[test]
fn deterministic() {
    let reconstructor = Reconstructor::new(
        sloped_tg(),
        RegressionCoefficients::Shared([0.1, 0.2, 0.3, 0.2, 0.1]),
        flat_toa(1.8),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let measurement = BandMeasurement([0.2, 0.25, 0.23, 0.2]);
    let output = Array1::range(400., 800., 5.);

    let first = reconstructor
        .reconstruct(&state(), &measurement, output.view())
        .unwrap();
    let second = reconstructor
        .reconstruct(&state(), &measurement, output.view())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn out_of_range_gases_are_clamped() {
    let reconstructor = Reconstructor::new(
        sloped_tg(),
        RegressionCoefficients::Shared([0.1, 0.2, 0.3, 0.2, 0.1]),
        flat_toa(1.8),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let measurement = BandMeasurement([0.2, 0.25, 0.23, 0.2]);
    let output = array![420., 550., 700.];
    let run = |state: AtmosphericState| {
        reconstructor
            .reconstruct(&state, &measurement, output.view())
            .unwrap()
    };

    let ozone_high = AtmosphericState {
        ozone: 500.,
        ..state()
    };
    let ozone_max = AtmosphericState {
        ozone: 450.,
        ..state()
    };
    assert_eq!(run(ozone_high), run(ozone_max));

    let extreme = AtmosphericState {
        solar_zenith: 30.,
        ozone: 100.,
        surface_pressure: 900.,
        water_vapor: 12.,
    };
    let edge = AtmosphericState {
        solar_zenith: 30.,
        ozone: 250.,
        surface_pressure: 1000.,
        water_vapor: 7.,
    };
    assert_eq!(run(extreme), run(edge));

    // The table does respond to ozone inside the valid range
    let ozone_mid = AtmosphericState {
        ozone: 350.,
        ..state()
    };
    assert_ne!(run(ozone_mid), run(ozone_max));
}

#[test]
fn clamp_leaves_solar_zenith() {
    let config = ReconstructionConfig::default();
    let clamped = config.clamp(&AtmosphericState {
        solar_zenith: 95.,
        ozone: 200.,
        surface_pressure: 1030.,
        water_vapor: 0.,
    });
    assert_eq!(
        clamped,
        AtmosphericState {
            solar_zenith: 95.,
            ozone: 250.,
            surface_pressure: 1025.,
            water_vapor: 0.1,
        }
    );
}

#[test]
fn nan_gases_are_not_clamped() {
    let range = ClampRange {
        min: 250.,
        max: 450.,
    };
    assert!(range.apply(f64::NAN).is_nan());
    assert_eq!(range.apply(f64::INFINITY), 450.);

    let reconstructor = Reconstructor::new(
        sloped_tg(),
        RegressionCoefficients::Shared([0.1, 0.2, 0.3, 0.2, 0.1]),
        flat_toa(1.8),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let measurement = BandMeasurement([0.2, 0.25, 0.23, 0.2]);
    let output = array![420., 550.];
    let nan_ozone = AtmosphericState {
        ozone: f64::NAN,
        ..state()
    };
    let nan_pressure = AtmosphericState {
        surface_pressure: f64::NAN,
        ..state()
    };
    let nan_water_vapor = AtmosphericState {
        water_vapor: f64::NAN,
        ..state()
    };
    for bad in [nan_ozone, nan_pressure, nan_water_vapor] {
        assert!(matches!(
            reconstructor.reconstruct(&bad, &measurement, output.view()),
            Err(ReconstructError::IndexOutOfRange { .. })
        ));
    }
}

#[test]
fn empty_window_only_affects_that_output() {
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        band1_passthrough(),
        flat_toa(2.0),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let result = reconstructor
        .reconstruct(
            &state(),
            &BandMeasurement([2.0, 0.3, 0.3, 0.3]),
            array![412., 1500., 799.].view(),
        )
        .unwrap();
    assert_relative_eq!(result[0], 2.0, max_relative = 1e-12);
    assert!(result[1].is_nan());
    assert_relative_eq!(result[2], 2.0, max_relative = 1e-12);
}

#[test]
fn toa_not_covering_a_band_gives_nan() {
    // 700 nm and up only, so the three blue/green bands have no TOA samples
    let wl = Array1::range(700., 800.5, 0.5);
    let toa = Spectrum::new(wl.clone(), Array1::from_elem(wl.len(), 2.0)).unwrap();
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        RegressionCoefficients::Shared([0., 0., 0., 0., 1.]),
        toa,
        ReconstructionConfig::default(),
    )
    .unwrap();
    assert!(reconstructor.toa_bands[0].is_nan());

    // A zero coefficient doesn't mask it, since 0 * NaN is NaN
    let result = reconstructor
        .reconstruct(
            &state(),
            &BandMeasurement([1., 1., 1., 1.]),
            array![750.].view(),
        )
        .unwrap();
    assert!(result[0].is_nan());
}

#[test]
fn per_wavelength_coefficients() {
    let toa = flat_toa(2.0);
    let n = toa.len();
    // Row i scales band 1 by i / n
    let mut rows = Array2::zeros((n, NUM_TERMS));
    for (i, mut row) in rows.axis_iter_mut(Axis(0)).enumerate() {
        row[1] = i as f64 / n as f64;
    }
    let coefficients = RegressionCoefficients::from_rows(rows.view()).unwrap();
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        coefficients,
        toa,
        ReconstructionConfig::default(),
    )
    .unwrap();

    let full = reconstructor
        .reconstruct_full(&state(), &BandMeasurement([2.0, 0.3, 0.3, 0.3]))
        .unwrap();
    for (i, &ed) in full.value().iter().enumerate() {
        assert_relative_eq!(
            ed,
            2.0 * i as f64 / n as f64,
            max_relative = 1e-12,
            epsilon = 1e-15
        );
    }
}

#[test]
fn coefficient_rows_must_match_toa_grid() {
    let rows = Array2::zeros((3, NUM_TERMS));
    let coefficients = RegressionCoefficients::from_rows(rows.view()).unwrap();
    let result = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        coefficients,
        flat_toa(2.0),
        ReconstructionConfig::default(),
    );
    assert!(matches!(
        result,
        Err(ReconstructError::InvalidCoefficients(_))
    ));
}

#[test]
fn half_width_is_configurable() {
    let wl = Array1::range(400., 800.5, 0.5);
    let toa = Spectrum::new(wl.clone(), wl.mapv(|w| w / 100.)).unwrap();
    let config = ReconstructionConfig {
        half_width: 0.,
        ..Default::default()
    };
    let reconstructor = Reconstructor::new(
        two_point_tg(|_, _, _| 1.),
        RegressionCoefficients::Shared([1., 0., 0., 0., 0.]),
        toa,
        config,
    )
    .unwrap();
    assert_relative_eq!(reconstructor.toa_bands[1], 4.89, max_relative = 1e-12);

    let result = reconstructor
        .reconstruct(
            &state(),
            &BandMeasurement([1., 1., 1., 1.]),
            array![500., 500.25].view(),
        )
        .unwrap();
    assert_relative_eq!(result[0], 5.0, max_relative = 1e-12);
    assert!(result[1].is_nan());
}

#[test]
fn batch_matches_single_calls() {
    let reconstructor = Reconstructor::new(
        sloped_tg(),
        RegressionCoefficients::Shared([0.1, 0.2, 0.3, 0.2, 0.1]),
        flat_toa(1.8),
        ReconstructionConfig::default(),
    )
    .unwrap();
    let states: Vec<_> = (0..8)
        .map(|i| AtmosphericState {
            ozone: 260. + 20. * i as f64,
            ..state()
        })
        .collect();
    let measurements: Vec<_> = (0..8)
        .map(|i| BandMeasurement([0.2 + 0.01 * i as f64, 0.25, 0.23, 0.2]))
        .collect();
    let output = array![412., 489., 555., 705.];

    let batch = reconstructor
        .reconstruct_batch(&states, &measurements, output.view())
        .unwrap();
    assert_eq!(batch.dim(), (8, 4));
    for (i, (state, measurement)) in states.iter().zip(&measurements).enumerate() {
        let single = reconstructor
            .reconstruct(state, measurement, output.view())
            .unwrap();
        assert_eq!(batch.row(i), single);
    }

    assert!(matches!(
        reconstructor.reconstruct_batch(&states, &measurements[1..], output.view()),
        Err(ReconstructError::InconsistentQuery)
    ));
}
