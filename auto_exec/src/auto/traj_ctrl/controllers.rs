//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for TrajCtrl, including their
//! error calculations.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use crate::auto::{loc::Pose, path::SampledPath};
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The trajectory controllers
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    /// Lateral error controller
    lat_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }

    /// Get the value of the controller for the given error, `dt_s` seconds after the previous
    /// call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Without a time step neither the integral nor the derivative can be computed, and
        // assuming one would produce a spike.
        let valid_dt = dt_s > 0f64;

        if valid_dt {
            self.integral += error * dt_s;
        }

        // No derivative on the first call either, there's no previous error
        let deriv = match (self.prev_error, valid_dt) {
            (Some(e), true) => (error - e) / dt_s,
            _ => 0f64,
        };

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }
}

impl TrajControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &super::Params) -> Self {
        Self {
            lat_ctrl: PidController::new(params.lat_k_p, params.lat_k_i, params.lat_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
        }
    }

    pub fn reset(&mut self) {
        self.lat_ctrl.reset();
        self.head_ctrl.reset();
    }

    /// Get the angular velocity demand for the given sample of the path.
    ///
    /// `speed_ms` is the current speed along the path, used for the curvature feed-forward.
    pub fn get_ang_vel_dem(
        &mut self,
        path: &SampledPath,
        index: usize,
        pose: &Pose,
        speed_ms: f64,
        dt_s: f64,
        report: &mut super::StatusReport,
        params: &super::Params,
    ) -> f64 {
        let lat_err_m = calc_lat_error(path, index, pose);
        report.lat_error_m = lat_err_m;

        let head_err_rad = calc_head_error(path, index, pose);
        report.head_error_rad = head_err_rad;

        if lat_err_m.abs() > params.lat_error_limit_m {
            report.lat_error_limit_exceeded = true;
        }

        // Feed-forward the turn rate of the path itself. The heading follows the tangent at the
        // same rate whichever way round the robot drives.
        let ff_rads = speed_ms * path.curvature(index);

        // Being left of the path needs a clockwise (negative) correction, a heading error to the
        // right an anticlockwise (positive) one.
        let lat_rads = -self.lat_ctrl.get(lat_err_m, dt_s);
        let head_rads = self.head_ctrl.get(head_err_rad, dt_s);

        (ff_rads + lat_rads + head_rads).clamp(-params.max_ang_vel_rads, params.max_ang_vel_rads)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Calculate the lateral error to the path at the given sample.
///
/// Lateral error will be positive if the robot is to the "left" of the path's direction of
/// travel, and negative if it's to the right (following right hand rule).
pub fn calc_lat_error(path: &SampledPath, index: usize, pose: &Pose) -> f64 {
    let tangent = path.tangent(index);
    let offset: Vector2<f64> = pose.position_m - path.samples()[index].position_m;

    // 2D cross product, +ve is left
    tangent[0] * offset[1] - tangent[1] * offset[0]
}

/// Calculate the heading error to the path at the given sample.
///
/// The heading error is +ve if the path heading is anticlockwise of the robot's heading, i.e. the
/// robot needs to turn left to reduce it.
pub fn calc_head_error(path: &SampledPath, index: usize, pose: &Pose) -> f64 {
    get_ang_dist_2pi(pose.heading_rad, path.heading_rad(index))
}
