//! # Routine Parameters
//!
//! The autonomous routines available to the robot are described in `routines.toml`:
//!
//! ```toml
//! paths_dir = "paths"
//!
//! [[routines]]
//! name = "galactic_search"
//! kind = "galactic_search"
//! classify_timeout_s = 3.0
//! paths = { a_red = "pickup-a-red.json", a_blue = "pickup-a-blue.json", b_red = "pickup-b-red.json", b_blue = "pickup-b-blue.json" }
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::auto::layout::Layout;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RoutineParams {
    /// Directory containing the path files, relative to the software root
    pub paths_dir: String,

    pub routines: Vec<RoutineSpec>,
}

/// A named routine.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutineSpec {
    pub name: String,

    #[serde(flatten)]
    pub kind: RoutineKind,
}

/// The path to pick up the power cells of each layout.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutPaths {
    pub a_red: String,
    pub a_blue: String,
    pub b_red: String,
    pub b_blue: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutineKind {
    /// Follow a chain of paths, starting from the first path's start pose.
    Follow { paths: Vec<String> },

    /// Classify the layout then drive the matching pickup path with the intake running.
    GalacticSearch {
        paths: LayoutPaths,

        /// Give up classifying after this long
        #[serde(default)]
        classify_timeout_s: Option<f64>,
    },

    /// Spin up the shooter, feed the power cells, then drive a path.
    ShootAndDrive {
        shooter_speed_rpm: f64,
        spin_up_s: f64,
        shoot_s: f64,
        path: String,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LayoutPaths {
    pub fn get(&self, layout: Layout) -> &str {
        match layout {
            Layout::ARed => &self.a_red,
            Layout::ABlue => &self.a_blue,
            Layout::BRed => &self.b_red,
            Layout::BBlue => &self.b_blue,
        }
    }
}
