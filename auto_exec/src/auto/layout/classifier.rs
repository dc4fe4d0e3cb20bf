//! Layout classifier

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::pixy::Detection;
use log::trace;
use nalgebra::Point2;

use super::{Layout, LayoutConfig, TrackStats};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Error reported when there are not enough mature tracks to score a layout.
pub const MAX_LAYOUT_ERROR: i64 = i64::MAX;

/// Maximum number of observed points used when scoring.
const MAX_OBSERVED_POINTS: usize = 3;

/// Minimum number of observed points needed to score.
const MIN_OBSERVED_POINTS: usize = 2;

/// Every assignment of three observed points to three reference points.
const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Scores the objects seen by the sensor against one layout.
#[derive(Debug, Clone)]
pub struct LayoutClassifier {
    config: LayoutConfig,
    young_age_limit: u8,
    old_age_limit: u8,

    /// Tracks accepted by the filter, in the order they were first seen.
    possibles: Vec<TrackStats>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LayoutClassifier {
    pub fn new(config: LayoutConfig, young_age_limit: u8, old_age_limit: u8) -> Self {
        Self {
            config,
            young_age_limit,
            old_age_limit,
            possibles: Vec::new(),
        }
    }

    pub fn layout(&self) -> Layout {
        self.config.layout
    }

    /// Forget all tracks.
    pub fn reset(&mut self) {
        self.possibles.clear();
    }

    /// Returns true if the detection could be one of this layout's objects.
    pub fn filter(&self, det: &Detection) -> bool {
        self.config.area.contains(det.area()) && det.age > self.young_age_limit
    }

    /// Process one batch of detections.
    ///
    /// Every detection passing the filter updates its track, creating it if needed. Tracks which
    /// were not seen in this batch are removed.
    pub fn process(&mut self, dets: &[Detection]) {
        let mut visited = [false; 256];

        for det in dets.iter() {
            if !self.filter(det) {
                continue;
            }
            visited[det.index as usize] = true;

            match self.possibles.iter_mut().find(|t| t.index() == det.index) {
                Some(track) => {
                    if !track.update(det) {
                        trace!(
                            "{}: stale detection for track {} (age {} < {})",
                            self.config.layout,
                            det.index,
                            det.age,
                            track.max_age()
                        );
                    }
                }
                None => self.possibles.push(TrackStats::new(det)),
            }
        }

        self.possibles.retain(|t| visited[t.index() as usize]);
    }

    /// Number of tracks currently held.
    pub fn num_tracks(&self) -> usize {
        self.possibles.len()
    }

    /// Get the track with the given index, if it's held.
    pub fn track(&self, index: u8) -> Option<&TrackStats> {
        self.possibles.iter().find(|t| t.index() == index)
    }

    /// Average positions of up to three mature tracks, in the order the tracks were first seen.
    pub fn observed_points(&self) -> Vec<Point2<i32>> {
        self.possibles
            .iter()
            .filter(|t| t.max_age() > self.old_age_limit)
            .take(MAX_OBSERVED_POINTS)
            .map(|t| t.average_position())
            .collect()
    }

    /// Error between the observed points and this layout's reference points.
    ///
    /// Returns [`MAX_LAYOUT_ERROR`] if there are fewer than two mature tracks.
    pub fn error(&self) -> i64 {
        let observed = self.observed_points();

        if observed.len() < MIN_OBSERVED_POINTS {
            return MAX_LAYOUT_ERROR;
        }

        layout_error(&self.config.reference_points, &observed)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Minimum, over all assignments of observed points to reference points, of the sum of squared
/// distances between assigned pairs.
///
/// Reference point `a` is paired with observed point `perm[a]`. Pairs where either point is
/// missing are skipped and add nothing to the sum.
pub fn layout_error(reference: &[Point2<i32>], observed: &[Point2<i32>]) -> i64 {
    PERMUTATIONS
        .iter()
        .map(|perm| {
            perm.iter()
                .enumerate()
                .filter_map(|(a, &o)| Some(sq_dist(reference.get(a)?, observed.get(o)?)))
                .sum::<i64>()
        })
        .min()
        .unwrap_or(MAX_LAYOUT_ERROR)
}

fn sq_dist(a: &Point2<i32>, b: &Point2<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::layout::LayoutParams;

    fn a_red() -> LayoutClassifier {
        let params = LayoutParams::default();
        LayoutClassifier::new(
            params.layouts[0].clone(),
            params.young_age_limit,
            params.old_age_limit,
        )
    }

    /// A mature 10x10 detection at the given position
    fn mature(index: u8, x: i32, y: i32) -> Detection {
        Detection::new(index, 70, x, y, 10, 10)
    }

    #[test]
    fn test_filter() {
        let c = a_red();

        // Area must be strictly above 40, age strictly above 32
        assert!(c.filter(&Detection::new(0, 33, 0, 0, 7, 6)));
        assert!(!c.filter(&Detection::new(0, 33, 0, 0, 8, 5)));
        assert!(!c.filter(&Detection::new(0, 32, 0, 0, 10, 10)));
    }

    #[test]
    fn test_filter_largest_box() {
        let params = LayoutParams::default();
        let a_blue = LayoutClassifier::new(
            params.layouts[1].clone(),
            params.young_age_limit,
            params.old_age_limit,
        );

        // The largest box the sensor can report must not wrap round into the small-box bound
        let huge = Detection::new(0, 100, 0, 0, 65535, 65535);
        assert!(!a_blue.filter(&huge));
        assert!(a_red().filter(&huge));
    }

    #[test]
    fn test_eviction() {
        let mut c = a_red();

        c.process(&[mature(1, 166, 136), mature(2, 231, 91)]);
        assert_eq!(c.num_tracks(), 2);

        // Track 2 absent
        c.process(&[mature(1, 166, 136)]);
        assert_eq!(c.num_tracks(), 1);
        assert!(c.track(2).is_none());

        // Track 1 present but filtered out
        c.process(&[Detection::new(1, 70, 166, 136, 2, 2)]);
        assert_eq!(c.num_tracks(), 0);
    }

    #[test]
    fn test_evicted_track_restarts() {
        let mut c = a_red();

        c.process(&[mature(1, 100, 100)]);
        c.process(&[mature(1, 200, 200)]);
        assert_eq!(c.track(1).unwrap().average_position(), Point2::new(150, 150));

        c.process(&[]);
        c.process(&[mature(1, 10, 10)]);
        assert_eq!(c.track(1).unwrap().average_position(), Point2::new(10, 10));
    }

    #[test]
    fn test_stale_detection_keeps_track() {
        let mut c = a_red();

        c.process(&[Detection::new(4, 80, 100, 100, 10, 10)]);
        c.process(&[Detection::new(4, 40, 300, 300, 10, 10)]);

        let track = c.track(4).unwrap();
        assert_eq!(track.average_position(), Point2::new(100, 100));
        assert_eq!(track.max_age(), 80);
    }

    #[test]
    fn test_error_needs_two_mature_tracks() {
        let mut c = a_red();
        assert_eq!(c.error(), MAX_LAYOUT_ERROR);

        // One mature, one passing the filter but not mature
        c.process(&[
            mature(1, 166, 136),
            Detection::new(2, 50, 231, 91, 10, 10),
        ]);
        assert_eq!(c.num_tracks(), 2);
        assert_eq!(c.error(), MAX_LAYOUT_ERROR);
    }

    #[test]
    fn test_exact_match_any_order() {
        let mut c = a_red();

        c.process(&[
            mature(7, 50, 79),
            mature(3, 166, 136),
            mature(5, 231, 91),
        ]);

        assert_eq!(c.error(), 0);
    }

    #[test]
    fn test_two_points_leave_one_reference_unmatched() {
        let mut c = a_red();

        c.process(&[mature(1, 170, 136), mature(2, 50, 80)]);

        // (166, 136) <-> (170, 136) and (50, 79) <-> (50, 80), (231, 91) is unmatched
        assert_eq!(c.error(), 16 + 1);
    }

    #[test]
    fn test_only_first_three_mature_tracks_are_used() {
        let mut c = a_red();

        c.process(&[
            mature(1, 166, 136),
            mature(2, 231, 91),
            mature(3, 50, 79),
            mature(4, 0, 0),
        ]);

        assert_eq!(c.observed_points().len(), 3);
        assert_eq!(c.error(), 0);
    }

    #[test]
    fn test_layout_error() {
        let reference = [Point2::new(0, 0), Point2::new(10, 0), Point2::new(0, 10)];
        let observed = [Point2::new(0, 11), Point2::new(1, 0), Point2::new(10, 2)];

        // Best pairing is 0->1, 1->2, 2->0: 1 + 4 + 1
        assert_eq!(layout_error(&reference, &observed), 6);
    }
}
