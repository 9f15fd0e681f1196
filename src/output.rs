// src/output.rs
//
// CSV persistence for probe and snapshot samples, plus readers that load
// the tables back for plotting.
//
// Layout (per run directory):
//   EM_Data_for_k=<p>.csv     Timestep,E[p] field component (V/m),H[p] field component (A/m)
//   EM_Data_snapshots.csv     Timestep,E field component (V/m),H field component (A/m)
//   Snapshots/                one PNG per captured snapshot
//
// Snapshot rows are written cell by cell (cells 1..N), so a frame is the
// run of consecutive rows sharing one timestep.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::OutputError;
use crate::simulator::{ProbeSample, SnapshotSample};

pub const SNAPSHOT_CSV: &str = "EM_Data_snapshots.csv";
pub const SNAPSHOT_DIR: &str = "Snapshots";

pub fn probe_csv_name(cell: usize) -> String {
    format!("EM_Data_for_k={cell}.csv")
}

/// Create `<out_dir>/Snapshots`, wiping any previous contents.
pub fn prepare_snapshot_dir(out_dir: &Path) -> Result<PathBuf, OutputError> {
    let dir = out_dir.join(SNAPSHOT_DIR);
    if dir.exists() {
        fs::remove_dir_all(&dir).map_err(|e| OutputError::io(&dir, e))?;
    }
    fs::create_dir_all(&dir).map_err(|e| OutputError::io(&dir, e))?;
    Ok(dir)
}

pub struct ProbeCsvWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ProbeCsvWriter {
    pub fn create(out_dir: &Path, cell: usize) -> Result<Self, OutputError> {
        let path = out_dir.join(probe_csv_name(cell));
        let file = File::create(&path).map_err(|e| OutputError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "Timestep,E[{cell}] field component (V/m),H[{cell}] field component (A/m)"
        )
        .map_err(|e| OutputError::io(&path, e))?;
        Ok(Self { path, writer })
    }

    pub fn write(&mut self, s: &ProbeSample) -> Result<(), OutputError> {
        writeln!(self.writer, "{},{:.16e},{:.16e}", s.t, s.e, s.h)
            .map_err(|e| OutputError::io(&self.path, e))
    }

    pub fn finish(mut self) -> Result<PathBuf, OutputError> {
        self.writer
            .flush()
            .map_err(|e| OutputError::io(&self.path, e))?;
        Ok(self.path)
    }
}

pub struct SnapshotCsvWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SnapshotCsvWriter {
    pub fn create(out_dir: &Path) -> Result<Self, OutputError> {
        let path = out_dir.join(SNAPSHOT_CSV);
        let file = File::create(&path).map_err(|e| OutputError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "Timestep,E field component (V/m),H field component (A/m)"
        )
        .map_err(|e| OutputError::io(&path, e))?;
        Ok(Self { path, writer })
    }

    pub fn write(&mut self, s: &SnapshotSample) -> Result<(), OutputError> {
        for (_, e, h) in s.rows() {
            writeln!(self.writer, "{},{:.16e},{:.16e}", s.t, e, h)
                .map_err(|e| OutputError::io(&self.path, e))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf, OutputError> {
        self.writer
            .flush()
            .map_err(|e| OutputError::io(&self.path, e))?;
        Ok(self.path)
    }
}

/// Probe time series loaded back from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeSeries {
    pub cell: usize,
    pub t: Vec<u64>,
    pub e: Vec<f64>,
    pub h: Vec<f64>,
}

impl ProbeSeries {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

pub fn read_probe_csv(path: &Path) -> Result<ProbeSeries, OutputError> {
    let mut lines = open_lines(path)?;
    let header = match lines.next() {
        Some(line) => line.map_err(|e| OutputError::io(path, e))?,
        None => return Err(parse_err(path, 1, "missing header")),
    };
    let cell = header
        .split_once("E[")
        .and_then(|(_, rest)| rest.split_once(']'))
        .and_then(|(k, _)| k.parse::<usize>().ok())
        .ok_or_else(|| parse_err(path, 1, "header does not name the probe cell"))?;

    let mut series = ProbeSeries {
        cell,
        ..Default::default()
    };
    for (i, line) in lines.enumerate() {
        let line = line.map_err(|e| OutputError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let (t, e, h) = parse_row(path, i + 2, &line)?;
        series.t.push(t);
        series.e.push(e);
        series.h.push(h);
    }
    Ok(series)
}

/// Load snapshot frames, regrouping consecutive rows by timestep.
pub fn read_snapshot_csv(path: &Path) -> Result<Vec<SnapshotSample>, OutputError> {
    let mut lines = open_lines(path)?;
    if lines.next().is_none() {
        return Err(parse_err(path, 1, "missing header"));
    }

    let mut frames: Vec<SnapshotSample> = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.map_err(|e| OutputError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let (t, e, h) = parse_row(path, i + 2, &line)?;
        match frames.last_mut() {
            Some(frame) if frame.t == t => {
                frame.e.push(e);
                frame.h.push(h);
            }
            _ => frames.push(SnapshotSample {
                t,
                first_cell: 1,
                e: vec![e],
                h: vec![h],
            }),
        }
    }
    Ok(frames)
}

fn open_lines(path: &Path) -> Result<std::io::Lines<BufReader<File>>, OutputError> {
    let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
    Ok(BufReader::new(file).lines())
}

fn parse_row(path: &Path, line_no: usize, line: &str) -> Result<(u64, f64, f64), OutputError> {
    let mut cols = line.split(',').map(str::trim);
    let (Some(t), Some(e), Some(h), None) = (cols.next(), cols.next(), cols.next(), cols.next())
    else {
        return Err(parse_err(path, line_no, "expected 3 columns"));
    };
    let t = t
        .parse::<u64>()
        .map_err(|_| parse_err(path, line_no, &format!("bad timestep '{t}'")))?;
    let e = e
        .parse::<f64>()
        .map_err(|_| parse_err(path, line_no, &format!("bad E value '{e}'")))?;
    let h = h
        .parse::<f64>()
        .map_err(|_| parse_err(path, line_no, &format!("bad H value '{h}'")))?;
    Ok((t, e, h))
}

fn parse_err(path: &Path, line: usize, reason: &str) -> OutputError {
    OutputError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_table_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ProbeCsvWriter::create(dir.path(), 50).unwrap();
        for t in 0..3 {
            w.write(&ProbeSample {
                t,
                cell: 50,
                e: 0.1 * t as f64,
                h: -0.25 * t as f64,
            })
            .unwrap();
        }
        let path = w.finish().unwrap();
        assert!(path.ends_with("EM_Data_for_k=50.csv"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "Timestep,E[50] field component (V/m),H[50] field component (A/m)\n"
        ));

        let series = read_probe_csv(&path).unwrap();
        assert_eq!(series.cell, 50);
        assert_eq!(series.t, vec![0, 1, 2]);
        assert_eq!(series.e, vec![0.0, 0.1, 0.2]);
        assert_eq!(series.h, vec![0.0, -0.25, -0.5]);
    }

    #[test]
    fn snapshot_rows_regroup_into_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SnapshotCsvWriter::create(dir.path()).unwrap();
        let a = SnapshotSample {
            t: 0,
            first_cell: 1,
            e: vec![0.0; 4],
            h: vec![0.0; 4],
        };
        let b = SnapshotSample {
            t: 50,
            first_cell: 1,
            e: vec![1.0, 2.0, 3.0, 4.0],
            h: vec![-1.0, -2.0, -3.0, -4.0],
        };
        w.write(&a).unwrap();
        w.write(&b).unwrap();
        let path = w.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + 8);

        let frames = read_snapshot_csv(&path).unwrap();
        assert_eq!(frames, vec![a, b]);
    }

    #[test]
    fn malformed_rows_report_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_CSV);
        fs::write(&path, "Timestep,E,H\n0,1.0,2.0\n1,oops,2.0\n").unwrap();
        match read_snapshot_csv(&path) {
            Err(OutputError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_dir_is_recreated_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snaps = prepare_snapshot_dir(dir.path()).unwrap();
        fs::write(snaps.join("stale.png"), b"x").unwrap();

        let again = prepare_snapshot_dir(dir.path()).unwrap();
        assert_eq!(again, snaps);
        assert_eq!(fs::read_dir(&again).unwrap().count(), 0);
    }
}
