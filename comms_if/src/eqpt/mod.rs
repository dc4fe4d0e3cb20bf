//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod pixy;
