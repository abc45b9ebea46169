//! Build-time validation: configuration and stability failures must
//! surface before any time stepping happens.

use ndarray::Array2;
use seismod::prelude::*;

fn demo_medium() -> Medium {
    let grid = SpatialGrid::new(60, 60, 10.0, 10.0, 0.0, 0.0).unwrap();
    Medium::homogeneous(grid, 2000.0, 1000.0).unwrap()
}

fn demo_ageom() -> Ageom {
    Ageom::forward(vec![Supersource::single(
        300.0,
        300.0,
        vec![100.0],
        vec![400.0],
    )])
}

fn demo_srcwav(nt: usize) -> SourceWavelets {
    SourceWavelets::forward(vec![Array2::zeros((nt, 1))])
}

fn demo_params() -> SimulationParams {
    SimulationParams {
        fpeak: 15.0,
        npml: 10,
        ..SimulationParams::default()
    }
}

#[test]
fn test_build_succeeds_on_valid_input() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let sim = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        demo_params(),
    );
    assert!(sim.is_ok());
}

#[test]
fn test_flag_length_mismatch_is_config_error() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        sflags: vec![SourceFlag::Pressure, SourceFlag::Pressure],
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Config(_)), "got {err}");
}

#[test]
fn test_born_needs_two_wavefields() {
    let medium = demo_medium();
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        kind: ModelKind::AcousticBorn(Perturbation::zeros(&medium.grid)),
        ..demo_params()
    };
    let err = Simulation::new(&medium, tgrid, &demo_ageom(), &demo_srcwav(100), params)
        .unwrap_err();
    assert!(err.to_string().contains("npw = 2"));
}

#[test]
fn test_gradient_needs_two_wavefields() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        gmodel_flag: true,
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Config(_)));
}

#[test]
fn test_replay_without_checkpoints_is_rejected() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        backprop_flag: -1,
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(err.to_string().contains("checkpoint"), "got {err}");
}

#[test]
fn test_replay_inside_gradient_run_is_rejected() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        backprop_flag: -1,
        gmodel_flag: true,
        npw: 2,
        sflags: vec![SourceFlag::Pressure, SourceFlag::TimeReversed],
        rflags: vec![true, false],
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Config(_)));
}

#[test]
fn test_checkpoints_outside_replay_are_rejected() {
    // produce a genuine checkpoint, then feed it to a forward run
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let save_params = SimulationParams {
        backprop_flag: 1,
        ..demo_params()
    };
    let saved = simulate(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        save_params,
    )
    .unwrap();
    let checkpoints: Vec<_> = saved.checkpoints.into_iter().flatten().collect();
    assert_eq!(checkpoints.len(), 1);

    let params = SimulationParams {
        backprop_flag: 0,
        checkpoints,
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Config(_)));
}

#[test]
fn test_viscoacoustic_is_a_stub() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        kind: ModelKind::AcousticVisco,
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(err.to_string().contains("viscoacoustic"));
}

#[test]
fn test_source_outside_mesh_is_rejected() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let ageom = Ageom::forward(vec![Supersource::single(
        -50.0,
        300.0,
        vec![100.0],
        vec![400.0],
    )]);
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &ageom,
        &demo_srcwav(100),
        demo_params(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("outside"));
}

#[test]
fn test_wavelet_longer_than_tgrid_is_rejected() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(160),
        demo_params(),
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Config(_)));
}

#[test]
fn test_courant_violation_is_stability_error() {
    let tgrid = TimeGrid::new(100, 8.0e-3).unwrap();
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        demo_params(),
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Stability(_)), "got {err}");
}

#[test]
fn test_dispersion_violation_is_stability_error() {
    let tgrid = TimeGrid::new(100, 1.0e-3).unwrap();
    let params = SimulationParams {
        fmax: Some(120.0),
        ..demo_params()
    };
    let err = Simulation::new(
        &demo_medium(),
        tgrid,
        &demo_ageom(),
        &demo_srcwav(100),
        params,
    )
    .unwrap_err();
    assert!(matches!(err, SeisError::Stability(_)));
}
