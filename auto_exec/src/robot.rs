//! # Robot equipment interfaces
//!
//! The autonomy system drives the robot's equipment through the traits in this module. Hardware
//! bindings and the simulation clients both implement them, and are gathered into a [`Robot`]
//! which is passed to every task.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{drive::DriveDems, pixy::Detection};

use crate::auto::loc::Pose;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The robot's drivetrain, which also owns the odometry.
pub trait Drivetrain {
    /// Set the acceleration demand in the robot frame, `x` forward and `y` left.
    fn set_acceleration(&mut self, x_mss: f64, y_mss: f64);

    fn set_angular_velocity(&mut self, ang_vel_rads: f64);

    fn set_brake(&mut self, engaged: bool);

    /// Reset the odometry to the given pose.
    fn set_pose(&mut self, x_m: f64, y_m: f64, heading_rad: f64);

    fn get_pose(&self) -> Pose;

    /// Called once per cycle before the autonomy is stepped.
    fn periodic(&mut self, _dt_s: f64) {}

    /// Apply a full set of drive demands.
    fn apply(&mut self, dems: &DriveDems) {
        self.set_acceleration(dems.accel_mss[0], dems.accel_mss[1]);
        self.set_angular_velocity(dems.ang_vel_rads);
        self.set_brake(dems.brake);
    }
}

/// The power cell intake.
pub trait Intake {
    fn extend(&mut self);
    fn retract(&mut self);
    fn start(&mut self);
    fn stop(&mut self);
}

/// The shooter flywheel.
pub trait Shooter {
    fn set_speed(&mut self, speed_rpm: f64);

    fn stop(&mut self) {
        self.set_speed(0.0)
    }
}

/// Source of vision sensor detections.
pub trait DetectionSource {
    /// Get the latest batch of detections.
    ///
    /// Faults are logged and reported as an empty batch.
    fn poll(&mut self) -> Vec<Detection>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All the equipment available to the autonomy system.
pub struct Robot {
    pub drivetrain: Box<dyn Drivetrain>,
    pub intake: Box<dyn Intake>,
    pub shooter: Box<dyn Shooter>,
    pub pixy: Box<dyn DetectionSource>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Robot {
    /// Per-cycle equipment processing.
    pub fn periodic(&mut self, dt_s: f64) {
        self.drivetrain.periodic(dt_s);
    }

    /// Command the drivetrain to stop with the brake engaged.
    pub fn safe_stop(&mut self) {
        self.drivetrain.apply(&DriveDems::safe_stop());
    }
}

// ------------------------------------------------------------------------------------------------
// MOCKS
// ------------------------------------------------------------------------------------------------
