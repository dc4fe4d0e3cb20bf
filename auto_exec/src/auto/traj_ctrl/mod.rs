//! # Trajectory control module
//!
//! Trajectory control is responsible for keeping the robot on the target path. The path is a
//! [`SampledPath`](crate::auto::path::SampledPath): a table of samples every few centimetres along
//! a chain of Bézier curves, each carrying the maximum speed allowed at that point.
//!
//! Every cycle the nearest sample ahead of the last one tracked is found. The tracked index only
//! ever moves forward, so noise in the pose cannot make the robot jump back along the path.
//!
//! The lateral error is the signed distance between the robot and the path at that sample, the
//! heading error the difference between the robot's heading and the path tangent. A pair of PID
//! controllers correct these errors, their outputs summed with the curvature feed-forward to give
//! the angular velocity demand. The acceleration demand drives the robot's speed, measured from the
//! change in pose between cycles, toward the speed profile. It is limited by the configured
//! acceleration, deceleration and jerk, and never decelerates the robot past a standstill.
//!
//! The path finishes once the final sample is reached, or once the robot passes the end point when
//! already within `end_tolerance_m` of the end.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use state::*;
