//! # Autonomy Executable Parameters
//!
//! This module provide parameters for the autonomy executable, loaded from `auto_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::logger::LogParams;

use crate::auto::{layout::Layout, loc::Pose};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoExecParams {
    /// Target period of one cycle
    pub cycle_period_s: f64,

    /// Length of the autonomous period. The running routine is aborted once it elapses.
    pub autonomous_period_s: f64,

    pub sim: SimParams,

    /// Log levels, console at `INFO` and file at `DEBUG` if not given
    #[serde(default)]
    pub log: LogParams,
}

/// Parameters of the simulated equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Pose of the robot at the start of the simulation, `[x_m, y_m, heading_rad]`
    pub start_pose: [f64; 3],

    pub pixy: SimPixySource,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Where simulated sensor detections come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SimPixySource {
    /// No detections
    None,

    /// Recorded frames, relative to the software root
    Replay {
        file: String,

        #[serde(default)]
        repeat: bool,
    },

    /// Detections on the reference points of a layout
    Layout { layout: Layout },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimParams {
    pub fn start_pose(&self) -> Pose {
        Pose::new(self.start_pose[0], self.start_pose[1], self.start_pose[2])
    }
}
