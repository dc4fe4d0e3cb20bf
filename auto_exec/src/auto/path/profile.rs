//! Speed profile limiting
//!
//! The curvature speed cap of each sample is limited in two passes. The forward pass ramps
//! acceleration at the jerk limit from rest at the first sample, the backward pass ensures the
//! robot can always brake to the next sample's speed, and zero at the end of the path.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const NEWTON_MAX_ITERS: usize = 32;

const NEWTON_TOLERANCE_S: f64 = 1e-12;

/// Curvatures below this are treated as straight.
const MIN_CURVATURE_M: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Limits applied when sampling a path and building its speed profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Maximum distance between consecutive samples.
    pub sample_resolution_m: f64,

    /// Maximum recursion depth when subdividing a curve.
    pub max_subdivision_depth: u32,

    /// Maximum speed along the path.
    pub max_speed_ms: f64,

    /// Maximum centripetal acceleration, limits speed through curves.
    pub max_radial_accel_mss: f64,

    /// Maximum forward acceleration.
    pub max_accel_mss: f64,

    /// Maximum rate of change of acceleration. Zero or less disables the jerk limit.
    pub max_jerk_msss: f64,

    /// Maximum deceleration.
    pub max_reverse_accel_mss: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            sample_resolution_m: 0.05,
            max_subdivision_depth: 12,
            max_speed_ms: 3.0,
            max_radial_accel_mss: 5.0,
            max_accel_mss: 4.0,
            max_jerk_msss: 3.0,
            max_reverse_accel_mss: 8.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Speed cap from the curvature at a point.
pub fn curvature_speed_cap(curvature_m: f64, params: &ProfileParams) -> f64 {
    let k = curvature_m.abs();

    if k < MIN_CURVATURE_M {
        params.max_speed_ms
    } else {
        (params.max_radial_accel_mss / k).sqrt().min(params.max_speed_ms)
    }
}

/// Limit a profile in place.
///
/// `dists_m` is the cumulative distance of each sample, `caps_ms` the speed cap at each sample.
/// Both slices must be the same length.
pub fn limit_profile(dists_m: &[f64], caps_ms: &mut [f64], params: &ProfileParams) {
    let fwd = forward_pass(dists_m, caps_ms, params);
    let bwd = backward_pass(dists_m, caps_ms, params);

    for ((cap, f), b) in caps_ms.iter_mut().zip(fwd).zip(bwd) {
        *cap = cap.min(f).min(b);
    }
}

/// Highest speeds reachable from rest with jerk limited acceleration.
fn forward_pass(dists_m: &[f64], caps_ms: &[f64], params: &ProfileParams) -> Vec<f64> {
    let mut speeds = Vec::with_capacity(caps_ms.len());

    if caps_ms.is_empty() {
        return speeds;
    }

    let mut v = 0.0;
    let mut a = match params.max_jerk_msss > 0.0 {
        true => 0.0,
        false => params.max_accel_mss,
    };
    speeds.push(v);

    for i in 1..caps_ms.len() {
        let ds = dists_m[i] - dists_m[i - 1];

        if ds > 0.0 {
            let j = match params.max_jerk_msss > 0.0 && a < params.max_accel_mss {
                true => params.max_jerk_msss,
                false => 0.0,
            };

            let dt = time_to_cover(ds, v, a, j);
            v += a * dt + 0.5 * j * dt * dt;
            a = (a + j * dt).min(params.max_accel_mss);
        }

        // Restart the acceleration ramp after being held back by the cap
        if v >= caps_ms[i] {
            v = caps_ms[i];
            if params.max_jerk_msss > 0.0 {
                a = 0.0;
            }
        }

        speeds.push(v);
    }

    speeds
}

/// Highest speeds from which the robot can still stop at the end of the path.
fn backward_pass(dists_m: &[f64], caps_ms: &[f64], params: &ProfileParams) -> Vec<f64> {
    let mut speeds = vec![0.0; caps_ms.len()];

    for i in (0..caps_ms.len().saturating_sub(1)).rev() {
        let ds = (dists_m[i + 1] - dists_m[i]).max(0.0);
        let next = speeds[i + 1];

        speeds[i] = (next * next + 2.0 * params.max_reverse_accel_mss * ds)
            .sqrt()
            .min(caps_ms[i]);
    }

    speeds
}

/// Time taken to cover `ds` starting at speed `v` with acceleration `a` and jerk `j`, i.e. the
/// solution of `ds = v dt + a dt^2 / 2 + j dt^3 / 6`.
///
/// Returns zero if the distance cannot be covered (no speed, acceleration or jerk).
fn time_to_cover(ds: f64, v: f64, a: f64, j: f64) -> f64 {
    // Each term alone gives an upper bound on the time, Newton's method then converges
    // monotonically down from the tightest one.
    let mut dt = f64::INFINITY;
    if v > 0.0 {
        dt = dt.min(ds / v);
    }
    if a > 0.0 {
        dt = dt.min((2.0 * ds / a).sqrt());
    }
    if j > 0.0 {
        dt = dt.min((6.0 * ds / j).cbrt());
    }

    if !dt.is_finite() {
        return 0.0;
    }

    for _ in 0..NEWTON_MAX_ITERS {
        let f = v * dt + 0.5 * a * dt * dt + j * dt * dt * dt / 6.0 - ds;
        let df = v + a * dt + 0.5 * j * dt * dt;

        if df <= 0.0 {
            break;
        }

        let step = f / df;
        dt -= step;

        if step.abs() < NEWTON_TOLERANCE_S {
            break;
        }
    }

    dt.max(0.0)
}
