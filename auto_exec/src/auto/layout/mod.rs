//! # Layout detection module
//!
//! Determines which of the known field layouts is in play from the stream of vision sensor
//! detections. Detection runs in three stages:
//!
//! - [`TrackStats`] - running average statistics for each object the sensor tracks,
//! - [`LayoutClassifier`] - one per layout, scores the mature tracks against that layout's
//!   reference points,
//! - [`VoteArbiter`] - runs every classifier each cycle and turns unambiguous cycles into votes,
//!   deciding once a layout has collected enough of them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod arbiter;
mod classifier;
mod track;

pub use arbiter::{find_best, ArbiterError, ArbiterState, CycleReport, CycleVote, VoteArbiter};
pub use classifier::{layout_error, LayoutClassifier, MAX_LAYOUT_ERROR};
pub use track::TrackStats;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tracks must be older than this to pass any classifier's filter.
pub const YOUNG_AGE_LIMIT: u8 = 32;

/// Tracks must be older than this to be used as an observed point.
pub const OLD_AGE_LIMIT: u8 = 64;

/// Layouts with an error below this are considered a match.
pub const MATCH_ERROR_THRESHOLD: i64 = 1000;

/// Number of votes needed to decide on a layout.
pub const WIN_SCORE: u32 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the layout detection system, loaded from `layout.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Detections must be older than this to be accepted by a classifier.
    pub young_age_limit: u8,

    /// Tracks must have been seen older than this to be used as an observed point.
    pub old_age_limit: u8,

    /// A layout whose error is strictly below this threshold is a match for the cycle.
    pub match_error_threshold: i64,

    /// Number of votes a layout needs to be decided.
    pub win_score: u32,

    /// The known layouts. Terminal checks are made in the order given here.
    pub layouts: Vec<LayoutConfig>,
}

/// Configuration of one known layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub layout: Layout,

    /// Expected sensor positions of the three objects in this layout.
    pub reference_points: [Point2<i32>; 3],

    /// Detections whose area lies outside this bound are ignored by this layout's classifier.
    #[serde(default)]
    pub area: AreaBound,
}

/// Exclusive bound on a detection's area. Either side may be left open.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBound {
    #[serde(default)]
    pub min: Option<i64>,

    #[serde(default)]
    pub max: Option<i64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The known field layouts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    ARed,
    ABlue,
    BRed,
    BBlue,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Layout {
    /// All layouts in their fixed order.
    pub const ALL: [Layout; 4] = [Layout::ARed, Layout::ABlue, Layout::BRed, Layout::BBlue];
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::ARed => write!(f, "A-Red"),
            Layout::ABlue => write!(f, "A-Blue"),
            Layout::BRed => write!(f, "B-Red"),
            Layout::BBlue => write!(f, "B-Blue"),
        }
    }
}

impl AreaBound {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    /// True if the area lies strictly within the bound.
    pub fn contains(&self, area: i64) -> bool {
        self.min.map_or(true, |min| area > min) && self.max.map_or(true, |max| area < max)
    }
}

impl LayoutConfig {
    pub fn new(layout: Layout, reference_points: [(i32, i32); 3], area: AreaBound) -> Self {
        Self {
            layout,
            reference_points: [
                Point2::new(reference_points[0].0, reference_points[0].1),
                Point2::new(reference_points[1].0, reference_points[1].1),
                Point2::new(reference_points[2].0, reference_points[2].1),
            ],
            area,
        }
    }
}

impl Default for LayoutParams {
    /// The galactic search layouts as seen from the robot's starting position.
    fn default() -> Self {
        Self {
            young_age_limit: YOUNG_AGE_LIMIT,
            old_age_limit: OLD_AGE_LIMIT,
            match_error_threshold: MATCH_ERROR_THRESHOLD,
            win_score: WIN_SCORE,
            layouts: vec![
                LayoutConfig::new(
                    Layout::ARed,
                    [(166, 136), (231, 91), (50, 79)],
                    AreaBound::new(Some(40), None),
                ),
                LayoutConfig::new(
                    Layout::ABlue,
                    [(271, 83), (115, 72), (160, 66)],
                    AreaBound::new(None, Some(300)),
                ),
                LayoutConfig::new(
                    Layout::BRed,
                    [(36, 136), (231, 91), (115, 72)],
                    AreaBound::new(None, Some(300)),
                ),
                LayoutConfig::new(
                    Layout::BBlue,
                    [(217, 81), (191, 64), (121, 68)],
                    AreaBound::default(),
                ),
            ],
        }
    }
}
