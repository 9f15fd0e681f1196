// src/analysis.rs
//
// Post-processing helpers: normal-incidence Fresnel coefficients, pulse
// tracking on snapshots and probe series, and discrete field energy.

use crate::permittivity::Permittivity;
use crate::simulator::SnapshotSample;

#[inline]
pub fn refractive_index(eps: f64) -> f64 {
    eps.sqrt()
}

/// E-field transmission coefficient going from index `n1` into `n2`.
#[inline]
pub fn fresnel_transmission(n1: f64, n2: f64) -> f64 {
    2.0 * n1 / (n1 + n2)
}

/// E-field reflection coefficient going from index `n1` into `n2`.
/// Negative when `n2 > n1` (phase flip).
#[inline]
pub fn fresnel_reflection(n1: f64, n2: f64) -> f64 {
    (n1 - n2) / (n1 + n2)
}

/// Index and value of the sample with the largest magnitude (sign kept).
pub fn peak_abs(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b.abs() >= v.abs() => best,
            _ => Some((i, v)),
        })
}

/// First index where |value| exceeds `threshold`.
pub fn first_arrival(values: &[f64], threshold: f64) -> Option<usize> {
    values.iter().position(|v| v.abs() > threshold)
}

/// 0.5 * sum(eps(k) E[k]^2 + H[k]^2) over the given cells.
///
/// E and H live on staggered half-steps, so this is only approximately
/// constant once the source has switched off.
pub fn field_energy(e: &[f64], h: &[f64], first_cell: usize, eps: &Permittivity) -> f64 {
    e.iter()
        .zip(h.iter())
        .enumerate()
        .map(|(i, (&ek, &hk))| 0.5 * (eps.eps_at(first_cell + i) * ek * ek + hk * hk))
        .sum()
}

/// Signed pulse peaks either side of a dielectric interface in one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceReading {
    pub t: u64,
    /// Largest-magnitude E left of the interface, with its cell.
    pub left: Option<(usize, f64)>,
    /// Largest-magnitude E at or right of the interface, with its cell.
    pub right: Option<(usize, f64)>,
}

pub fn read_interface(frame: &SnapshotSample, boundary: usize) -> InterfaceReading {
    let split = boundary.saturating_sub(frame.first_cell).min(frame.e.len());
    let (l, r) = frame.e.split_at(split);
    InterfaceReading {
        t: frame.t,
        left: peak_abs(l).map(|(i, v)| (frame.first_cell + i, v)),
        right: peak_abs(r).map(|(i, v)| (frame.first_cell + split + i, v)),
    }
}

/// Measured vs. predicted reflection/transmission for a pulse crossing the interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceReport {
    pub incident: f64,
    pub reflected: f64,
    pub transmitted: f64,
    pub expected_reflection: f64,
    pub expected_transmission: f64,
    /// Snapshot time the reflected/transmitted peaks were read at.
    pub t_measured: u64,
}

impl InterfaceReport {
    pub fn reflection(&self) -> f64 {
        self.reflected / self.incident
    }

    pub fn transmission(&self) -> f64 {
        self.transmitted / self.incident
    }
}

/// Measure reflection and transmission from a sequence of snapshots.
///
/// The incident amplitude is the largest peak seen left of the interface
/// while nothing has crossed it yet. The first later frame in which the
/// left-side peak has flipped sign (reflected pulse) while a transmitted
/// pulse is present supplies the other two amplitudes.
pub fn measure_interface(
    frames: &[SnapshotSample],
    eps: &Permittivity,
    settle: f64,
) -> Option<InterfaceReport> {
    let boundary = eps.boundary()?;
    let n1 = refractive_index(eps.eps_at(boundary.saturating_sub(1)));
    let n2 = refractive_index(eps.eps_at(boundary));
    let expected_r = fresnel_reflection(n1, n2);

    let readings: Vec<InterfaceReading> = frames
        .iter()
        .map(|f| read_interface(f, boundary))
        .collect();

    let mut incident: Option<f64> = None;
    for r in &readings {
        let right = r.right.map_or(0.0, |(_, v)| v.abs());
        let left = r.left.map_or(0.0, |(_, v)| v);
        if right < settle && left.abs() > incident.map_or(0.0, f64::abs) {
            incident = Some(left);
        }
    }
    let incident = incident.filter(|v| v.abs() > settle)?;

    readings.iter().find_map(|r| {
        let (_, left) = r.left?;
        let (_, right) = r.right?;
        let reflected_sign_ok = left.signum() == (incident * expected_r).signum();
        if reflected_sign_ok && left.abs() > settle && right.abs() > settle {
            Some(InterfaceReport {
                incident,
                reflected: left,
                transmitted: right,
                expected_reflection: expected_r,
                expected_transmission: fresnel_transmission(n1, n2),
                t_measured: r.t,
            })
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fresnel_for_index_three() {
        let n2 = refractive_index(9.0);
        assert_relative_eq!(n2, 3.0);
        assert_relative_eq!(fresnel_transmission(1.0, n2), 0.5);
        assert_relative_eq!(fresnel_reflection(1.0, n2), -0.5);
        // 1 + r = t at normal incidence
        assert_relative_eq!(1.0 + fresnel_reflection(1.0, n2), fresnel_transmission(1.0, n2));
    }

    #[test]
    fn peak_keeps_sign() {
        assert_eq!(peak_abs(&[0.1, -0.7, 0.5]), Some((1, -0.7)));
        assert_eq!(peak_abs(&[]), None);
        assert_eq!(peak_abs(&[f64::NAN, 0.2]), Some((1, 0.2)));
    }

    #[test]
    fn arrival_uses_magnitude() {
        assert_eq!(first_arrival(&[0.0, 1e-6, -0.01, 0.5], 1e-3), Some(2));
        assert_eq!(first_arrival(&[0.0, 0.0], 1e-3), None);
    }

    #[test]
    fn interface_reading_splits_at_boundary() {
        let frame = SnapshotSample {
            t: 7,
            first_cell: 1,
            e: vec![0.0, -0.4, 0.0, 0.3, 0.1],
            h: vec![0.0; 5],
        };
        // cells 1..=5; boundary at cell 4
        let r = read_interface(&frame, 4);
        assert_eq!(r.left, Some((2, -0.4)));
        assert_eq!(r.right, Some((4, 0.3)));
    }

    #[test]
    fn energy_weights_e_by_permittivity() {
        let eps = Permittivity::Step {
            boundary: 2,
            left: 1.0,
            right: 9.0,
        };
        let e = [1.0, 1.0];
        let h = [0.0, 2.0];
        // cells 1 and 2: 0.5*(1*1) + 0.5*(9*1 + 4)
        assert_relative_eq!(field_energy(&e, &h, 1, &eps), 0.5 + 6.5);
    }
}
