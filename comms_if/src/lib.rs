//! # Communications interface crate.
//!
//! Provides the interface definitions shared between the autonomy software and the equipment it
//! talks to: the vision sensor's block protocol and the drivetrain demands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment (vision sensor, drivetrain)
pub mod eqpt;
