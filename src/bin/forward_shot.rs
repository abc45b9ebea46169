//! Forward-modeling demo: one shot over a homogeneous medium
//!
//! Fires a Ricker source in the middle of a 2 km/s box and records a
//! spread of surface receivers.

use std::time::Instant;

use ndarray::{s, Array2};
use seismod::prelude::*;

fn main() -> SeisResult<()> {
    println!("SeisMod forward shot");
    println!("====================\n");

    let grid = SpatialGrid::new(200, 200, 10.0, 10.0, 0.0, 0.0)?;
    let tgrid = TimeGrid::new(700, 1.5e-3)?;
    let medium = Medium::homogeneous(grid, 2000.0, 1000.0)?;

    println!("Configuration:");
    println!("  Grid: {}x{} cells at {} m", grid.nzd, grid.nxd, grid.dz);
    println!("  Time: {} steps of {:.2} ms", tgrid.nt, tgrid.dt * 1e3);
    println!("  Medium: vp = 2000 m/s, rho = 1000 kg/m3\n");

    let fpeak = 15.0;
    let nr = 40;
    let rx: Vec<f64> = (0..nr).map(|i| 50.0 + i as f64 * 47.5).collect();
    let rz = vec![100.0; nr];
    let ageom = Ageom::forward(vec![Supersource::single(1000.0, 1000.0, rz, rx)]);

    let wavelet = ricker(&tgrid, fpeak, None);
    let mut wav = Array2::zeros((tgrid.nt, 1));
    for it in 0..tgrid.nt {
        wav[[it, 0]] = wavelet[it];
    }
    let srcwav = SourceWavelets::forward(vec![wav]);

    let params = SimulationParams {
        fpeak,
        illum_flag: true,
        verbose: true,
        ..SimulationParams::default()
    };

    println!("Running...");
    let start = Instant::now();
    let sim = simulate(&medium, tgrid, &ageom, &srcwav, params)?;
    println!("Done in {:.2} s\n", start.elapsed().as_secs_f64());

    if let Some(p) = sim.records[0].p.as_ref() {
        let peak = p.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let tail = p
            .slice(s![p.nrows() - 50.., ..])
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        println!("Records: {} x {}", p.nrows(), p.ncols());
        println!("  Peak amplitude:       {:.3e}", peak);
        println!("  Tail peak (last 50):  {:.3e}", tail);
        println!("  Tail / peak:          {:.3e}", tail / peak);
    }
    if let Some(illum) = sim.illum.as_ref() {
        let total: f64 = illum.iter().sum();
        println!("  Illumination total:   {:.3e}", total);
    }

    println!("\nForward shot complete");
    Ok(())
}
