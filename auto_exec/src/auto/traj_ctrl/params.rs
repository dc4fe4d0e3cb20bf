//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::auto::path::ProfileParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Sampling and speed profile limits
    pub profile: ProfileParams,

    /// Lateral controller proportional gain
    pub lat_k_p: f64,

    /// Lateral controller integral gain
    pub lat_k_i: f64,

    /// Lateral controller derivative gain
    pub lat_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Gain from speed error to acceleration demand
    pub speed_k_p: f64,

    /// Angular velocity demand limit
    pub max_ang_vel_rads: f64,

    /// Speed demand never drops below this until the path is finished, so that the robot does not
    /// stall short of the final sample.
    pub min_speed_ms: f64,

    /// Number of samples ahead of the current one searched for the nearest sample each cycle.
    pub search_window: usize,

    /// The limit on lateral error. Above this limit the path will be aborted.
    pub lat_error_limit_m: f64,

    /// Within this distance of the end of the path, passing the end point along the final
    /// tangent also finishes the path.
    pub end_tolerance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            profile: ProfileParams::default(),
            lat_k_p: 2.0,
            lat_k_i: 0.0,
            lat_k_d: 0.1,
            head_k_p: 3.0,
            head_k_i: 0.0,
            head_k_d: 0.1,
            speed_k_p: 6.0,
            max_ang_vel_rads: 4.0,
            min_speed_ms: 0.1,
            search_window: 20,
            lat_error_limit_m: 0.75,
            end_tolerance_m: 0.25,
        }
    }
}
