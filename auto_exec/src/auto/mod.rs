//! # Autonomy Module
//!
//! This module provides the autonomous behaviour of the robot: working out which field layout is
//! in play from the vision sensor, and driving pre-planned paths.

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use auto_mgr::AutoMgr;

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Automation Manager module - runs the autonomous routines
pub mod auto_mgr;

/// Layout module - classifies the field layout from sensor detections
pub mod layout;

/// Localisation module - the pose of the robot
pub mod loc;

/// Defines path types
pub mod path;

/// Trajectory control module - keeps the robot on the given path
pub mod traj_ctrl;
