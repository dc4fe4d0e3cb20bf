//! # Localisation module
//!
//! The robot's odometry is owned by the drivetrain, which is reset to the start of each path. This
//! module only defines the [`Pose`] exchanged with the drivetrain.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and heading in the field frame) of the robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the field frame
    pub position_m: Vector2<f64>,

    /// Heading of the robot, angle from the positive field X axis, anticlockwise positive.
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Unit vector pointing in the robot's forward direction.
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_forward2() {
        let pose = Pose::new(1.0, 2.0, std::f64::consts::FRAC_PI_2);
        let fwd = pose.forward2();

        assert!(fwd[0].abs() < 1e-12);
        assert!((fwd[1] - 1.0).abs() < 1e-12);
    }
}
