// src/config.rs
//
// Run configuration. Defaults reproduce the reference dielectric-slab run:
// 200 cells, eps = 1 | 9 split at cell 100, Gaussian pulse at t0 = 30,
// probe at cell 50, snapshot every 50 steps, up to t = 1000.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{OutputError, SimError};
use crate::permittivity::Permittivity;
use crate::simulator::FieldSimulator;
use crate::source::Source;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub geometry: GeometryConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub numerics: NumericsConfig,
    pub run: RunInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Number of cells.
    pub n: usize,
    /// First cell of the dielectric.
    pub boundary: usize,
    pub eps_left: f64,
    pub eps_right: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            n: 200,
            boundary: 100,
            eps_left: 1.0,
            eps_right: 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub t0: f64,
    pub spread: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            t0: 30.0,
            spread: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub probe: usize,
    pub snapshot_interval: u64,
    /// Number of steps to run. `None` means 1000 + interval + 1, which is
    /// enough to capture every snapshot up to t = 1000.
    pub max_t: Option<u64>,
    pub out_dir: String,
    pub plots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            probe: 50,
            snapshot_interval: 50,
            max_t: None,
            out_dir: "runs".to_string(),
            plots: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericsConfig {
    /// Split the H and E passes across rayon workers.
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,
}

impl Default for RunInfo {
    fn default() -> Self {
        Self {
            binary: "fdtd-dielectric".to_string(),
            run_id: "dielectric".to_string(),
        }
    }
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, OutputError> {
        let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
        let cfg = serde_json::from_reader(BufReader::new(file))?;
        Ok(cfg)
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<(), OutputError> {
        let path = out_dir.join("config.json");
        let file = File::create(&path).map_err(|e| OutputError::io(&path, e))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn max_t(&self) -> u64 {
        self.output
            .max_t
            .unwrap_or(1000 + self.output.snapshot_interval + 1)
    }

    pub fn permittivity(&self) -> Permittivity {
        let g = &self.geometry;
        if g.eps_left == g.eps_right {
            Permittivity::Uniform(g.eps_left)
        } else {
            Permittivity::Step {
                boundary: g.boundary,
                left: g.eps_left,
                right: g.eps_right,
            }
        }
    }

    pub fn source(&self) -> Source {
        Source::GaussianPulse {
            t0: self.source.t0,
            spread: self.source.spread,
        }
    }

    pub fn build_simulator(&self) -> Result<FieldSimulator, SimError> {
        if self.source.spread.is_nan() || self.source.spread <= 0.0 {
            return Err(SimError::InvalidConfiguration(format!(
                "pulse spread must be > 0, got {}",
                self.source.spread
            )));
        }
        let sim = FieldSimulator::new(
            self.geometry.n,
            self.permittivity(),
            self.output.probe,
            self.output.snapshot_interval,
            self.source(),
        )?;
        Ok(sim.with_parallel(self.numerics.parallel))
    }

    /// Apply one `key=value` override. Returns `Ok(false)` for unknown keys.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<bool, SimError> {
        let value = value.trim();
        match key {
            "n" => self.geometry.n = parse(key, value)?,
            "boundary" => self.geometry.boundary = parse(key, value)?,
            "eps_left" => self.geometry.eps_left = parse(key, value)?,
            "eps" | "eps_right" => self.geometry.eps_right = parse(key, value)?,
            "t0" => self.source.t0 = parse(key, value)?,
            "spread" => self.source.spread = parse(key, value)?,
            "probe" => self.output.probe = parse(key, value)?,
            "f" | "interval" => self.output.snapshot_interval = parse(key, value)?,
            "steps" | "max_t" => self.output.max_t = Some(parse(key, value)?),
            "out" => self.output.out_dir = value.to_string(),
            "run" => self.run.run_id = value.to_string(),
            "plots" => self.output.plots = parse_switch(key, value)?,
            "parallel" => self.numerics.parallel = parse_switch(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SimError> {
    value
        .parse::<T>()
        .map_err(|_| SimError::InvalidConfiguration(format!("could not parse {key}='{value}'")))
}

fn parse_switch(key: &str, value: &str) -> Result<bool, SimError> {
    if value.eq_ignore_ascii_case("on") || value == "1" || value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("off") || value == "0" || value.eq_ignore_ascii_case("false")
    {
        Ok(false)
    } else {
        Err(SimError::InvalidConfiguration(format!(
            "expected on/off for {key}, got '{value}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.geometry.n, 200);
        assert_eq!(cfg.output.probe, 50);
        assert_eq!(cfg.output.snapshot_interval, 50);
        assert_eq!(cfg.max_t(), 1051);
        assert_eq!(cfg.permittivity().boundary(), Some(100));
        assert!(!cfg.numerics.parallel);
    }

    #[test]
    fn overrides_update_fields() {
        let mut cfg = RunConfig::default();
        assert!(cfg.apply_override("eps", "4").unwrap());
        assert!(cfg.apply_override("f", "25").unwrap());
        assert!(cfg.apply_override("plots", "off").unwrap());
        assert!(cfg.apply_override("steps", "300").unwrap());
        assert!(!cfg.apply_override("colour", "red").unwrap());

        assert_eq!(cfg.geometry.eps_right, 4.0);
        assert_eq!(cfg.output.snapshot_interval, 25);
        assert!(!cfg.output.plots);
        assert_eq!(cfg.max_t(), 300);

        assert!(cfg.apply_override("probe", "abc").is_err());
        assert!(cfg.apply_override("parallel", "maybe").is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: RunConfig =
            serde_json::from_str(r#"{ "geometry": { "eps_right": 4.0 }, "output": { "probe": 10 } }"#)
                .unwrap();
        assert_eq!(cfg.geometry.n, 200);
        assert_eq!(cfg.geometry.eps_right, 4.0);
        assert_eq!(cfg.output.probe, 10);
        assert_eq!(cfg.output.snapshot_interval, 50);
    }

    #[test]
    fn config_json_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = RunConfig::default();
        cfg.run.run_id = "slab".into();
        cfg.write_to_dir(dir.path()).unwrap();

        let back = RunConfig::from_json_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn invalid_settings_fail_at_build() {
        let mut cfg = RunConfig::default();
        cfg.output.probe = 200;
        assert!(matches!(
            cfg.build_simulator(),
            Err(SimError::InvalidConfiguration(_))
        ));

        let mut cfg = RunConfig::default();
        cfg.source.spread = 0.0;
        assert!(cfg.build_simulator().is_err());

        assert!(RunConfig::default().build_simulator().is_ok());
    }
}
