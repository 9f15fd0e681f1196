// src/main.rs
//
// Driver for the 1D dielectric-interface FDTD run.
//
// Examples:
//
//   cargo run --release
//       -> reference run: 200 cells, eps = 9 from cell 100, probe at 50,
//          snapshot every 50 steps up to t = 1000.
//
//   cargo run --release -- f=25 eps=4 run=eps4
//       -> denser snapshots (nicer waterfall), n = 2 dielectric.
//
//   cargo run --release -- config=my_run.json plots=off
//       -> load settings from JSON, CSV output only.
//
// Outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── EM_Data_for_k=<p>.csv
//     ├── EM_Data_snapshots.csv
//     ├── E[<p>] plot.png
//     ├── H[<p>] plot.png
//     ├── Waterfall normal.png
//     └── Snapshots/snapshot<T>.png

use std::env;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fdtd_dielectric::analysis::{field_energy, measure_interface};
use fdtd_dielectric::config::RunConfig;
use fdtd_dielectric::output::{
    ProbeCsvWriter, SnapshotCsvWriter, prepare_snapshot_dir, read_probe_csv, read_snapshot_csv,
};
use fdtd_dielectric::visualisation::{render_snapshots, save_probe_plot, save_waterfall_plot};
use fdtd_dielectric::{OutputError, Permittivity};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [config=FILE.json]
             [n=N] [boundary=K] [eps_left=VAL] [eps=VAL]
             [t0=VAL] [spread=VAL]
             [probe=K] [f=N] [steps=N]
             [out=DIR] [run=RUN_ID] [plots=on|off] [parallel=on|off]

Notes:
  - Snapshots are taken when t % f == 0, before the source is injected.
  - Default steps = 1000 + f + 1 so snapshots up to t = 1000 are written.
  - Set RUST_LOG=debug for per-run simulator details.
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn create_dir(path: &Path) -> Result<(), OutputError> {
    create_dir_all(path).map_err(|e| OutputError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let argv: Vec<String> = env::args().skip(1).collect();
    if argv
        .iter()
        .any(|a| a == "-h" || a == "--help" || a == "help")
    {
        print_usage();
        return Ok(());
    }

    // JSON first, command-line overrides on top
    let mut cfg = match argv.iter().find_map(|a| a.strip_prefix("config=")) {
        Some(path) => RunConfig::from_json_file(Path::new(path))?,
        None => RunConfig::default(),
    };
    for arg in &argv {
        if arg.starts_with("config=") {
            continue;
        }
        let Some((key, value)) = arg.split_once('=') else {
            warn!(arg = arg.as_str(), "ignoring argument without '='");
            continue;
        };
        match cfg.apply_override(key, value) {
            Ok(true) => {}
            Ok(false) => warn!(key, "ignoring unknown argument"),
            Err(e) => warn!(error = %e, "ignoring override"),
        }
    }
    cfg.run.run_id = sanitize_run_id(&cfg.run.run_id);

    let mut sim = cfg.build_simulator()?;
    let max_t = cfg.max_t();
    let eps: Permittivity = sim.permittivity().clone();
    let probe = sim.probe_cell();

    // -------- output directory setup --------
    let run_dir = PathBuf::from(&cfg.output.out_dir).join(&cfg.run.run_id);
    create_dir(&run_dir)?;
    let snapshot_dir = prepare_snapshot_dir(&run_dir)?;
    cfg.write_to_dir(&run_dir)?;

    info!(
        run_dir = %run_dir.display(),
        n = cfg.geometry.n,
        boundary = ?eps.boundary(),
        eps_left = cfg.geometry.eps_left,
        eps_right = cfg.geometry.eps_right,
        probe,
        snapshot_interval = cfg.output.snapshot_interval,
        max_t,
        parallel = cfg.numerics.parallel,
        "run configured"
    );

    // -------- time stepping --------
    let mut probe_writer = ProbeCsvWriter::create(&run_dir, probe)?;
    let mut snapshot_writer = SnapshotCsvWriter::create(&run_dir)?;
    let print_every = (max_t / 10).max(1);

    sim.run_until(max_t, |p, snapshot| -> Result<(), OutputError> {
        probe_writer.write(&p)?;
        if let Some(s) = snapshot {
            snapshot_writer.write(&s)?;
            if s.t % print_every < cfg.output.snapshot_interval {
                let energy = field_energy(&s.e, &s.h, s.first_cell, &eps);
                info!(t = s.t, e_probe = p.e, h_probe = p.h, energy, "progress");
            }
        }
        Ok(())
    })?;

    let probe_path = probe_writer.finish()?;
    let snapshot_path = snapshot_writer.finish()?;
    info!(
        steps = sim.current_time(),
        probe_csv = %probe_path.display(),
        snapshot_csv = %snapshot_path.display(),
        "time stepping done"
    );

    // -------- read back, summarise, render --------
    let series = read_probe_csv(&probe_path)?;
    let frames = read_snapshot_csv(&snapshot_path)?;

    match measure_interface(&frames, &eps, 0.05) {
        Some(r) => info!(
            t = r.t_measured,
            incident = r.incident,
            reflection = r.reflection(),
            expected_reflection = r.expected_reflection,
            transmission = r.transmission(),
            expected_transmission = r.expected_transmission,
            "dielectric interface"
        ),
        None => info!("no reflection/transmission measurement (no interface crossing captured)"),
    }

    if cfg.output.plots {
        let cell = series.cell;
        save_probe_plot(
            &series.t,
            &series.e,
            &format!("E[{cell}] field component (V/m)"),
            &run_dir.join(format!("E[{cell}] plot.png")),
        )?;
        save_probe_plot(
            &series.t,
            &series.h,
            &format!("H[{cell}] field component (A/m)"),
            &run_dir.join(format!("H[{cell}] plot.png")),
        )?;

        let pngs = render_snapshots(&frames, eps.boundary(), &snapshot_dir)?;
        save_waterfall_plot(&frames, &run_dir.join("Waterfall normal.png"))?;
        info!(snapshots = pngs.len(), "plots written");
    } else {
        info!("plot generation skipped (plots=off)");
    }

    info!(run_dir = %run_dir.display(), "done");
    Ok(())
}
