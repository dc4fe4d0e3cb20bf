//! # Autonomy library.
//!
//! This library allows the executables in this crate to access the autonomy modules, the
//! equipment interfaces and the equipment clients.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy - layout classification, path following and the routines built on them
pub mod auto;

/// Executable parameters
pub mod params;

/// Pixy client - requests detected blocks from the vision sensor
pub mod pixy_client;

/// Equipment interfaces used by the autonomy
pub mod robot;

/// Simulation client - simulated equipment for running without the robot
pub mod sim_client;
