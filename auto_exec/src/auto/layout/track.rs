//! Track statistics

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::pixy::Detection;
use nalgebra::Point2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Running statistics of one tracked object.
///
/// All arithmetic is integer, averages truncate toward zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStats {
    index: u8,
    max_age: u8,

    sum_x: i64,
    count_x: i64,
    sum_y: i64,
    count_y: i64,
    sum_width: i64,
    count_width: i64,
    sum_height: i64,
    count_height: i64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrackStats {
    /// Start a new track from its first detection.
    pub fn new(det: &Detection) -> Self {
        Self {
            index: det.index,
            max_age: det.age,
            sum_x: det.x as i64,
            count_x: 1,
            sum_y: det.y as i64,
            count_y: 1,
            sum_width: det.width as i64,
            count_width: 1,
            sum_height: det.height as i64,
            count_height: 1,
        }
    }

    /// Accumulate a detection into the track.
    ///
    /// Detections younger than the oldest one seen so far are stale and leave the statistics
    /// untouched, in which case `false` is returned.
    pub fn update(&mut self, det: &Detection) -> bool {
        if det.age < self.max_age {
            return false;
        }

        self.sum_x += det.x as i64;
        self.count_x += 1;
        self.sum_y += det.y as i64;
        self.count_y += 1;
        self.sum_width += det.width as i64;
        self.count_width += 1;
        self.sum_height += det.height as i64;
        self.count_height += 1;
        self.max_age = det.age;

        true
    }

    /// Tracking index of the object
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Oldest age seen for this track
    pub fn max_age(&self) -> u8 {
        self.max_age
    }

    /// Average centre position of the object.
    pub fn average_position(&self) -> Point2<i32> {
        Point2::new(
            (self.sum_x / self.count_x) as i32,
            (self.sum_y / self.count_y) as i32,
        )
    }

    /// Average (width, height) of the object.
    pub fn average_size(&self) -> (i32, i32) {
        (
            (self.sum_width / self.count_width) as i32,
            (self.sum_height / self.count_height) as i32,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_average() {
        let mut stats = TrackStats::new(&Detection::new(3, 10, 100, 50, 10, 8));

        assert!(stats.update(&Detection::new(3, 11, 103, 51, 11, 9)));
        assert!(stats.update(&Detection::new(3, 11, 102, 51, 12, 9)));

        // Integer division of 305 / 3 and 152 / 3
        assert_eq!(stats.average_position(), Point2::new(101, 50));
        assert_eq!(stats.average_size(), (11, 8));
        assert_eq!(stats.max_age(), 11);
        assert_eq!(stats.index(), 3);
    }

    #[test]
    fn test_stale_update_is_discarded() {
        let mut stats = TrackStats::new(&Detection::new(1, 70, 100, 50, 10, 8));
        let before = stats.clone();

        assert!(!stats.update(&Detection::new(1, 69, 500, 500, 50, 50)));
        assert_eq!(stats, before);

        assert!(!stats.update(&Detection::new(1, 0, 500, 500, 50, 50)));
        assert_eq!(stats, before);
    }
}
