// src/visualisation.rs
//
// PNG rendering of probe time series, spatial snapshots and the waterfall
// stack, all read back from the persisted CSV tables.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use rayon::prelude::*;

use crate::error::OutputError;
use crate::simulator::SnapshotSample;

/// Y-range for a set of samples with a 10% margin.
/// Falls back to [-1, 1] for empty/non-finite data and widens flat data.
fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        (-1.0, 1.0)
    } else if (y_max - y_min).abs() < 1e-30 {
        let delta = if y_max.abs() < 1e-30 {
            1.0
        } else {
            0.1 * y_max.abs()
        };
        (y_min - delta, y_max + delta)
    } else {
        let margin = 0.1 * (y_max - y_min);
        (y_min - margin, y_max + margin)
    }
}

fn plot_err(e: Box<dyn std::error::Error>) -> OutputError {
    OutputError::Plot(e.to_string())
}

/// Plot one field component at the probe cell against timestep.
pub fn save_probe_plot(
    times: &[u64],
    values: &[f64],
    y_label: &str,
    filename: &Path,
) -> Result<(), OutputError> {
    if times.len() < 2 {
        return Ok(()); // nothing to plot
    }
    draw_probe(times, values, y_label, filename).map_err(plot_err)
}

fn draw_probe(
    times: &[u64],
    values: &[f64],
    y_label: &str,
    filename: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let t_min = times[0] as f64;
    let t_max = times[times.len() - 1] as f64;
    let (y_min, y_max) = padded_range(values);

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(y_label, ("sans-serif", 24))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Timestep")
        .y_desc(y_label)
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart.draw_series(LineSeries::new(
        times.iter().zip(values.iter()).map(|(&t, &v)| (t as f64, v)),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}

/// E against spacestep for one snapshot, with the dielectric interface
/// marked by a vertical line from -1 to 1.
pub fn save_snapshot_plot(
    frame: &SnapshotSample,
    boundary: Option<usize>,
    filename: &Path,
) -> Result<(), OutputError> {
    if frame.is_empty() {
        return Ok(());
    }
    draw_snapshot(frame, boundary, filename).map_err(plot_err)
}

fn draw_snapshot(
    frame: &SnapshotSample,
    boundary: Option<usize>,
    filename: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let x_max = (frame.first_cell + frame.len()) as f64;
    let (lo, hi) = padded_range(&frame.e);
    let y_min = lo.min(-1.1);
    let y_max = hi.max(1.1);

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(format!("Snapshot at t = {}", frame.t), ("sans-serif", 28))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Spacestep")
        .y_desc("E field component (V/m)")
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    if let Some(b) = boundary {
        let b = b as f64;
        chart.draw_series(LineSeries::new(
            vec![(b, -1.0), (b, 1.0)],
            BLACK.stroke_width(2),
        ))?;
    }

    chart.draw_series(LineSeries::new(
        frame.rows().map(|(k, e, _)| (k as f64, e)),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}

/// Render every snapshot into `dir/snapshot<T>.png`. Frames are drawn in
/// parallel; the first failure is returned.
pub fn render_snapshots(
    frames: &[SnapshotSample],
    boundary: Option<usize>,
    dir: &Path,
) -> Result<Vec<PathBuf>, OutputError> {
    frames
        .par_iter()
        .map(|frame| -> Result<PathBuf, OutputError> {
            let path = dir.join(format!("snapshot{}.png", frame.t));
            save_snapshot_plot(frame, boundary, &path)?;
            Ok(path)
        })
        .collect()
}

/// Overlay all snapshots, frame `i` shifted up by `i`.
pub fn save_waterfall_plot(frames: &[SnapshotSample], filename: &Path) -> Result<(), OutputError> {
    if frames.is_empty() {
        return Ok(());
    }
    draw_waterfall(frames, filename).map_err(plot_err)
}

fn draw_waterfall(
    frames: &[SnapshotSample],
    filename: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let x_max = frames
        .iter()
        .map(|f| f.first_cell + f.len())
        .max()
        .unwrap_or(1) as f64;
    let (lo, hi) = padded_range(frames.iter().flat_map(|f| f.e.iter()));
    let y_min = lo.min(-1.0);
    let y_max = hi.max(1.0) + (frames.len() - 1) as f64;

    let root = BitMapBackend::new(filename, (1024, 1280)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Spacestep")
        .y_desc("Time [frame number]")
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    for (i, frame) in frames.iter().enumerate() {
        let offset = i as f64;
        chart.draw_series(LineSeries::new(
            frame.rows().map(move |(k, e, _)| (k as f64, e + offset)),
            &BLUE,
        ))?;
    }

    root.present()?;
    Ok(())
}
