// src/simulator.rs
//
// 1D FDTD (Yee leapfrog) kernel for a lossless dielectric line.
//
// Normalised units: unit cell spacing, Courant number 1 in free space.
// One call to `step()` does, in this order:
//
//   1. H[k] += E[k] - E[k+1]                   k in [0, N-2]
//   2. E[k] += (H[k-1] - H[k]) / eps(k)        k in [1, N-1]
//   3. snapshot of cells 1..N if t % f == 0    (before injection)
//   4. E[0] = s(t)                             (hard source, overwrite)
//   5. probe sample (E[p], H[p])               (after injection)
//   6. t += 1
//
// Boundary invariants:
//   - H[N-1] is never updated and stays at its initial 0. The right edge
//     therefore acts as a perfect reflector. Keep it that way.
//   - E[0] is never updated by the curl pass; it only carries s(t).

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::SimError;
use crate::grid::Grid1D;
use crate::permittivity::Permittivity;
use crate::source::Source;

/// Fields at the probe cell after a step (source already injected).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSample {
    pub t: u64,
    pub cell: usize,
    pub e: f64,
    pub h: f64,
}

/// Full-array capture taken before the source is injected.
///
/// `e[i]` / `h[i]` belong to cell `first_cell + i`. Cell 0 is never included.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSample {
    pub t: u64,
    pub first_cell: usize,
    pub e: Vec<f64>,
    pub h: Vec<f64>,
}

impl SnapshotSample {
    pub fn len(&self) -> usize {
        self.e.len()
    }

    pub fn is_empty(&self) -> bool {
        self.e.is_empty()
    }

    /// (cell index, E, H) rows in cell order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        self.e
            .iter()
            .zip(self.h.iter())
            .enumerate()
            .map(move |(i, (&e, &h))| (self.first_cell + i, e, h))
    }
}

pub struct FieldSimulator {
    grid: Grid1D,
    e: Vec<f64>,
    h: Vec<f64>,
    eps: Vec<f64>,
    permittivity: Permittivity,
    source: Source,
    probe: usize,
    snapshot_interval: u64,
    t: u64,
    parallel: bool,
    last_probe: Option<ProbeSample>,
}

impl FieldSimulator {
    /// Allocate zeroed E/H arrays on an `n`-cell grid with the clock at t = 0.
    ///
    /// Fails with `InvalidConfiguration` if `n < 2`, `snapshot_interval == 0`,
    /// `probe >= n`, or the permittivity profile has eps(k) < 1 anywhere.
    pub fn new(
        n: usize,
        permittivity: Permittivity,
        probe: usize,
        snapshot_interval: u64,
        source: Source,
    ) -> Result<Self, SimError> {
        let grid = Grid1D::new(n)?;
        if snapshot_interval == 0 {
            return Err(SimError::InvalidConfiguration(
                "snapshot interval must be > 0".to_string(),
            ));
        }
        if !grid.contains(probe) {
            return Err(SimError::InvalidConfiguration(format!(
                "probe cell {probe} outside grid [0, {n})"
            )));
        }
        permittivity.validate(&grid)?;

        let eps: Vec<f64> = (0..n).map(|k| permittivity.eps_at(k)).collect();

        debug!(
            n,
            probe,
            snapshot_interval,
            boundary = ?permittivity.boundary(),
            "field simulator initialised"
        );

        Ok(Self {
            grid,
            e: vec![0.0; n],
            h: vec![0.0; n],
            eps,
            permittivity,
            source,
            probe,
            snapshot_interval,
            t: 0,
            parallel: false,
            last_probe: None,
        })
    }

    /// Split each pass across rayon workers. The H pass still completes
    /// before the E pass starts, so results are bit-identical to the serial path.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Timestep the next call to `step()` will run.
    pub fn current_time(&self) -> u64 {
        self.t
    }

    pub fn grid(&self) -> Grid1D {
        self.grid
    }

    pub fn probe_cell(&self) -> usize {
        self.probe
    }

    pub fn snapshot_interval(&self) -> u64 {
        self.snapshot_interval
    }

    pub fn permittivity(&self) -> &Permittivity {
        &self.permittivity
    }

    pub fn e_field(&self) -> &[f64] {
        &self.e
    }

    pub fn h_field(&self) -> &[f64] {
        &self.h
    }

    /// Probe sample from the most recent step.
    pub fn last_probe(&self) -> Result<ProbeSample, SimError> {
        self.last_probe.ok_or(SimError::NoStepTaken)
    }

    /// Advance one timestep. Always yields the probe sample; yields a
    /// snapshot only when `t % snapshot_interval == 0`.
    pub fn step(&mut self) -> (ProbeSample, Option<SnapshotSample>) {
        let t = self.t;

        self.update_h();
        self.update_e();

        let snapshot = if t % self.snapshot_interval == 0 {
            trace!(t, "snapshot");
            Some(SnapshotSample {
                t,
                first_cell: 1,
                e: self.e[1..].to_vec(),
                h: self.h[1..].to_vec(),
            })
        } else {
            None
        };

        self.e[0] = self.source.value_at(t);

        let probe = ProbeSample {
            t,
            cell: self.probe,
            e: self.e[self.probe],
            h: self.h[self.probe],
        };
        self.last_probe = Some(probe);

        self.t += 1;
        (probe, snapshot)
    }

    /// Like `step()`, but refuses to run unless `expected_t` is the next timestep.
    pub fn step_at(
        &mut self,
        expected_t: u64,
    ) -> Result<(ProbeSample, Option<SnapshotSample>), SimError> {
        if expected_t != self.t {
            return Err(SimError::OutOfOrderStep {
                expected: self.t,
                got: expected_t,
            });
        }
        Ok(self.step())
    }

    /// Step until `current_time() == max_t`, handing every sample to `on_step`.
    /// Stops at the first error returned by the callback.
    pub fn run_until<F, E>(&mut self, max_t: u64, mut on_step: F) -> Result<(), E>
    where
        F: FnMut(ProbeSample, Option<SnapshotSample>) -> Result<(), E>,
    {
        while self.t < max_t {
            let (probe, snapshot) = self.step();
            on_step(probe, snapshot)?;
        }
        Ok(())
    }

    fn update_h(&mut self) {
        let last = self.grid.last();
        let e = &self.e;
        if self.parallel {
            self.h[..last]
                .par_iter_mut()
                .enumerate()
                .for_each(|(k, hk)| *hk += e[k] - e[k + 1]);
        } else {
            for k in 0..last {
                self.h[k] += e[k] - e[k + 1];
            }
        }
    }

    fn update_e(&mut self) {
        let h = &self.h;
        let eps = &self.eps;
        if self.parallel {
            self.e[1..]
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, ek)| {
                    let k = i + 1;
                    *ek += (h[k - 1] - h[k]) / eps[k];
                });
        } else {
            for k in self.grid.interior() {
                self.e[k] += (h[k - 1] - h[k]) / eps[k];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> FieldSimulator {
        FieldSimulator::new(200, Permittivity::half_space(200, 9.0), 50, 50, Source::default())
            .unwrap()
    }

    #[test]
    fn construction_rejects_bad_settings() {
        let eps = || Permittivity::Uniform(1.0);
        assert!(FieldSimulator::new(0, eps(), 0, 1, Source::default()).is_err());
        assert!(FieldSimulator::new(10, eps(), 10, 1, Source::default()).is_err());
        assert!(FieldSimulator::new(10, eps(), 3, 0, Source::default()).is_err());
        assert!(FieldSimulator::new(10, Permittivity::Uniform(0.9), 3, 1, Source::default()).is_err());
        assert!(FieldSimulator::new(10, eps(), 9, 1, Source::default()).is_ok());
    }

    #[test]
    fn fields_start_at_zero() {
        let sim = reference();
        assert_eq!(sim.current_time(), 0);
        assert!(sim.e_field().iter().all(|&v| v == 0.0));
        assert!(sim.h_field().iter().all(|&v| v == 0.0));
        assert!(matches!(sim.last_probe(), Err(SimError::NoStepTaken)));
    }

    #[test]
    fn first_step_only_injects_source() {
        let mut sim = reference();
        let (probe, snap) = sim.step();

        assert_eq!(sim.current_time(), 1);
        assert_relative_eq!(sim.e_field()[0], (-9.0f64).exp());
        assert!(sim.e_field()[1..].iter().all(|&v| v == 0.0));
        assert!(sim.h_field().iter().all(|&v| v == 0.0));

        assert_eq!(probe.t, 0);
        assert_eq!(probe.cell, 50);
        assert_eq!(probe.e, 0.0);
        assert_eq!(probe.h, 0.0);

        let snap = snap.expect("t = 0 is a snapshot step");
        assert_eq!(snap.first_cell, 1);
        assert_eq!(snap.len(), 199);
        assert!(snap.e.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn snapshot_excludes_the_same_step_injection() {
        // Probe at the source cell sees the injected value, snapshots never do.
        let mut sim =
            FieldSimulator::new(8, Permittivity::Uniform(1.0), 0, 1, Source::custom(|_| 5.0))
                .unwrap();
        let (probe, snap) = sim.step();
        assert_eq!(probe.e, 5.0);
        let snap = snap.unwrap();
        assert_eq!(snap.rows().next().map(|r| r.0), Some(1));
        assert_eq!(snap.e[0], 0.0);

        // The next step propagates E[0] into H[0], then H[0] into E[1].
        let (_, snap) = sim.step();
        let snap = snap.unwrap();
        assert_eq!(sim.h_field()[0], 5.0);
        assert_eq!(snap.h[0], 0.0);
        assert_eq!(snap.e[0], 5.0);
    }

    #[test]
    fn second_step_moves_pulse_one_cell() {
        let mut sim =
            FieldSimulator::new(6, Permittivity::Uniform(1.0), 1, 10, Source::custom(|t| {
                if t == 0 { 1.0 } else { 0.0 }
            }))
            .unwrap();
        sim.step();
        sim.step();
        // H[0] = E[0] - E[1] = 1, E[1] = H[0] - H[1] = 1, then E[0] overwritten with 0.
        assert_eq!(sim.h_field(), &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(sim.e_field(), &[0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn step_at_enforces_monotone_clock() {
        let mut sim = reference();
        assert!(sim.step_at(0).is_ok());
        match sim.step_at(5) {
            Err(SimError::OutOfOrderStep { expected, got }) => {
                assert_eq!(expected, 1);
                assert_eq!(got, 5);
            }
            other => panic!("expected OutOfOrderStep, got {other:?}"),
        }
        assert!(sim.step_at(0).is_err());
        assert_eq!(sim.current_time(), 1);
        assert_eq!(sim.last_probe().unwrap().t, 0);
    }

    #[test]
    fn run_until_stops_at_max_t() {
        let mut sim = reference();
        let mut probes = 0;
        let mut snaps = Vec::new();
        sim.run_until(101, |_, snap| {
            probes += 1;
            if let Some(s) = snap {
                snaps.push(s.t);
            }
            Ok::<(), SimError>(())
        })
        .unwrap();
        assert_eq!(probes, 101);
        assert_eq!(snaps, vec![0, 50, 100]);
        assert_eq!(sim.current_time(), 101);
    }

    #[test]
    fn parallel_pass_matches_serial_bitwise() {
        let mut serial = reference();
        let mut parallel = reference().with_parallel(true);
        for _ in 0..400 {
            let a = serial.step();
            let b = parallel.step();
            assert_eq!(a, b);
        }
        assert_eq!(serial.e_field(), parallel.e_field());
        assert_eq!(serial.h_field(), parallel.h_field());
    }
}
