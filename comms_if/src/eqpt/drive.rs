//! # Drivetrain Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The complete set of demands last sent to the drivetrain.
///
/// The drivetrain holds on to its last demands, so a demand set that has been sent keeps acting
/// until it is replaced.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveDems {
    /// Acceleration demand in the robot body frame, `[forward, left]`.
    ///
    /// Units: meters/second^2
    pub accel_mss: [f64; 2],

    /// Angular velocity demand about the robot's Z+ (upwards) axis. Positive is anticlockwise.
    ///
    /// Units: radians/second
    pub ang_vel_rads: f64,

    /// If true the parking brake is engaged.
    pub brake: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveDems {
    /// The fail-safe demand: no acceleration, no rotation, brake engaged.
    pub fn safe_stop() -> Self {
        Self {
            accel_mss: [0.0, 0.0],
            ang_vel_rads: 0.0,
            brake: true,
        }
    }

    /// Returns true if these demands are the fail-safe stop.
    pub fn is_safe_stop(&self) -> bool {
        *self == Self::safe_stop()
    }
}
