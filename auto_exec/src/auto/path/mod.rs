//! # Path
//!
//! This module defines the paths followed by the robot. A path is an ordered sequence of cubic
//! Bézier curves loaded from a JSON path file:
//!
//! ```json
//! {
//!     "backwards": false,
//!     "curves": [
//!         [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}, {"x": 2.0, "y": 1.0}, {"x": 3.0, "y": 1.0}]
//!     ]
//! }
//! ```
//!
//! Paths are sampled once on load into a [`SampledPath`], a table of [`DistanceSample`]s holding
//! the position, cumulative distance and speed limit at regular intervals along the path.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod bezier;
mod profile;

pub use bezier::CubicBezier;
pub use profile::{curvature_speed_cap, limit_profile, ProfileParams};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::PI,
    path::{Path, PathBuf},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Curves are always split at least this many times, so that closed or looping curves whose
/// endpoints coincide are still sampled.
const MIN_SUBDIVISION_DEPTH: u32 = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Contents of a path file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFile {
    /// If true the robot drives the path in reverse.
    #[serde(default)]
    pub backwards: bool,

    pub curves: Vec<[PathPoint; 4]>,
}

/// A control point in a path file.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// One sample along a path.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct DistanceSample {
    /// Position of the sample
    pub position_m: Vector2<f64>,

    /// Index of the curve the sample lies on
    pub curve_index: usize,

    /// Curve parameter of the sample
    pub t: f64,

    /// Distance along the path to the sample
    pub dist_m: f64,

    /// Maximum speed at the sample
    pub max_speed_ms: f64,
}

/// A path sampled at regular distances, with its speed profile.
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct SampledPath {
    curves: Vec<CubicBezier>,
    samples: Vec<DistanceSample>,
    backwards: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot read path file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot parse path file {0:?}: {1}")]
    ParseError(PathBuf, serde_json::Error),

    #[error("The path contains no curves")]
    EmptyPath,

    #[error("Invalid profile parameters: {0}")]
    InvalidParams(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathFile {
    /// Load a path file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PathError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| PathError::FileLoadError(path.to_path_buf(), e))?;

        Self::from_str(path, &s)
    }

    /// Parse the contents of a path file. `origin` is only used in errors.
    pub fn from_str(origin: &Path, s: &str) -> Result<Self, PathError> {
        serde_json::from_str(s).map_err(|e| PathError::ParseError(origin.to_path_buf(), e))
    }

    pub fn curves(&self) -> Vec<CubicBezier> {
        self.curves
            .iter()
            .map(|c| {
                CubicBezier::new(
                    Vector2::new(c[0].x, c[0].y),
                    Vector2::new(c[1].x, c[1].y),
                    Vector2::new(c[2].x, c[2].y),
                    Vector2::new(c[3].x, c[3].y),
                )
            })
            .collect()
    }
}

impl SampledPath {
    /// Load and sample a path file.
    pub fn load<P: AsRef<Path>>(path: P, params: &ProfileParams) -> Result<Self, PathError> {
        let file = PathFile::load(path.as_ref())?;
        let sampled = Self::from_curves(file.curves(), file.backwards, params)?;

        debug!(
            "Loaded path {:?}: {} curves, {} samples, {:.02} m{}",
            path.as_ref(),
            sampled.curves.len(),
            sampled.samples.len(),
            sampled.length_m(),
            if sampled.backwards { " (backwards)" } else { "" }
        );

        Ok(sampled)
    }

    /// Sample the given curves and build the speed profile.
    pub fn from_curves(
        curves: Vec<CubicBezier>,
        backwards: bool,
        params: &ProfileParams,
    ) -> Result<Self, PathError> {
        if curves.is_empty() {
            return Err(PathError::EmptyPath);
        }
        if !(params.sample_resolution_m > 0.0) {
            return Err(PathError::InvalidParams("sample_resolution_m must be positive"));
        }
        if !(params.max_speed_ms > 0.0) {
            return Err(PathError::InvalidParams("max_speed_ms must be positive"));
        }

        let mut samples: Vec<DistanceSample> = Vec::new();

        for (curve_index, curve) in curves.iter().enumerate() {
            // The start of each curve after the first is the end of the previous one
            let mut points = vec![];
            if curve_index == 0 {
                points.push((0.0, curve.start()));
            }
            subdivide(
                curve,
                (0.0, curve.start()),
                (1.0, curve.end()),
                0,
                params,
                &mut points,
            );

            for (t, position_m) in points {
                let dist_m = match samples.last() {
                    Some(prev) => prev.dist_m + (position_m - prev.position_m).norm(),
                    None => 0.0,
                };

                samples.push(DistanceSample {
                    position_m,
                    curve_index,
                    t,
                    dist_m,
                    max_speed_ms: curvature_speed_cap(curve.curvature(t), params),
                });
            }
        }

        let dists: Vec<f64> = samples.iter().map(|s| s.dist_m).collect();
        let mut caps: Vec<f64> = samples.iter().map(|s| s.max_speed_ms).collect();
        limit_profile(&dists, &mut caps, params);
        for (s, c) in samples.iter_mut().zip(caps) {
            s.max_speed_ms = c;
        }

        Ok(Self {
            curves,
            samples,
            backwards,
        })
    }

    pub fn samples(&self) -> &[DistanceSample] {
        &self.samples
    }

    pub fn curves(&self) -> &[CubicBezier] {
        &self.curves
    }

    pub fn is_backwards(&self) -> bool {
        self.backwards
    }

    /// Total length of the path.
    pub fn length_m(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.dist_m)
    }

    pub fn start_point(&self) -> Vector2<f64> {
        self.curves[0].start()
    }

    pub fn end_point(&self) -> Vector2<f64> {
        self.curves[self.curves.len() - 1].end()
    }

    /// Unit tangent (direction of travel along the path) at a sample.
    ///
    /// Where the curve has no direction at the sample the chord to the neighbouring sample is
    /// used instead.
    pub fn tangent(&self, index: usize) -> Vector2<f64> {
        let s = &self.samples[index];

        if let Some(t) = self.curves[s.curve_index].tangent(s.t) {
            return t;
        }

        let chord = match index + 1 < self.samples.len() {
            true => self.samples[index + 1].position_m - s.position_m,
            false if index > 0 => s.position_m - self.samples[index - 1].position_m,
            false => Vector2::new(1.0, 0.0),
        };

        chord.try_normalize(f64::EPSILON).unwrap_or_else(|| Vector2::new(1.0, 0.0))
    }

    /// Signed curvature of the path at a sample.
    pub fn curvature(&self, index: usize) -> f64 {
        let s = &self.samples[index];
        self.curves[s.curve_index].curvature(s.t)
    }

    /// Heading the robot should have at a sample, accounting for backwards paths.
    pub fn heading_rad(&self, index: usize) -> f64 {
        let t = self.tangent(index);
        let heading = t[1].atan2(t[0]);

        match self.backwards {
            true => heading + PI,
            false => heading,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Recursively split the curve between `start` and `end`, pushing the sample points after `start`
/// up to and including `end` onto `out` in order.
fn subdivide(
    curve: &CubicBezier,
    start: (f64, Vector2<f64>),
    end: (f64, Vector2<f64>),
    depth: u32,
    params: &ProfileParams,
    out: &mut Vec<(f64, Vector2<f64>)>,
) {
    let too_far = (end.1 - start.1).norm() > params.sample_resolution_m;

    if depth < params.max_subdivision_depth && (depth < MIN_SUBDIVISION_DEPTH || too_far) {
        let t = 0.5 * (start.0 + end.0);
        let mid = (t, curve.position(t));

        subdivide(curve, start, mid, depth + 1, params, out);
        subdivide(curve, mid, end, depth + 1, params, out);
    } else {
        out.push(end);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight_two_curve_path(params: &ProfileParams) -> SampledPath {
        SampledPath::from_curves(
            vec![
                CubicBezier::line(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)),
                CubicBezier::line(Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0)),
            ],
            false,
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_sample_spacing() {
        let params = ProfileParams::default();
        let path = SampledPath::from_curves(
            vec![CubicBezier::new(
                Vector2::new(0.0, 0.0),
                Vector2::new(2.0, 0.0),
                Vector2::new(2.0, 2.0),
                Vector2::new(0.0, 2.0),
            )],
            false,
            &params,
        )
        .unwrap();

        let samples = path.samples();
        assert!((samples[0].position_m - path.start_point()).norm() < 1e-12);
        assert!((samples[samples.len() - 1].position_m - path.end_point()).norm() < 1e-12);

        for w in samples.windows(2) {
            let gap = (w[1].position_m - w[0].position_m).norm();
            assert!(gap <= params.sample_resolution_m + 1e-12);
            assert!(w[1].dist_m > w[0].dist_m);
            assert!(w[1].t > w[0].t);
        }
    }

    #[test]
    fn test_curves_join_without_duplicate_sample() {
        let params = ProfileParams::default();
        let path = straight_two_curve_path(&params);

        let samples = path.samples();
        for w in samples.windows(2) {
            assert!(w[1].dist_m > w[0].dist_m);
        }
        assert!((path.length_m() - 2.0).abs() < 1e-9);
        assert_eq!(samples[samples.len() - 1].curve_index, 1);
    }

    #[test]
    fn test_speed_cap_non_increasing_approaching_end() {
        let params = ProfileParams::default();
        let path = straight_two_curve_path(&params);
        let samples = path.samples();

        let tail: Vec<_> = samples
            .iter()
            .filter(|s| path.length_m() - s.dist_m < 0.25)
            .collect();
        assert!(tail.len() > 2);

        for w in tail.windows(2) {
            assert!(w[1].max_speed_ms <= w[0].max_speed_ms);
        }
        assert_eq!(tail[tail.len() - 1].max_speed_ms, 0.0);
    }

    #[test]
    fn test_speed_limited_in_turns() {
        let params = ProfileParams::default();

        // Straight, then a tight turn, then straight
        let path = SampledPath::from_curves(
            vec![
                CubicBezier::line(Vector2::new(0.0, 0.0), Vector2::new(4.0, 0.0)),
                CubicBezier::new(
                    Vector2::new(4.0, 0.0),
                    Vector2::new(4.3, 0.0),
                    Vector2::new(4.5, 0.2),
                    Vector2::new(4.5, 0.5),
                ),
                CubicBezier::line(Vector2::new(4.5, 0.5), Vector2::new(4.5, 4.5)),
            ],
            false,
            &params,
        )
        .unwrap();

        for (i, s) in path.samples().iter().enumerate() {
            let cap = curvature_speed_cap(path.curvature(i), &params);
            assert!(s.max_speed_ms <= cap + 1e-9);
        }

        let turn_max = path
            .samples()
            .iter()
            .filter(|s| s.curve_index == 1)
            .map(|s| s.max_speed_ms)
            .fold(0.0, f64::max);
        assert!(turn_max < params.max_speed_ms);
    }

    #[test]
    fn test_backwards_heading() {
        let params = ProfileParams::default();
        let path = SampledPath::from_curves(
            vec![CubicBezier::line(Vector2::new(0.0, 0.0), Vector2::new(0.0, 1.0))],
            true,
            &params,
        )
        .unwrap();

        assert!(path.is_backwards());
        assert!((path.heading_rad(0) - 1.5 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_path_file() {
        let file = PathFile::from_str(
            Path::new("test.json"),
            r#"{"curves": [[{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 2, "y": 0}, {"x": 3, "y": 0}]]}"#,
        )
        .unwrap();

        assert!(!file.backwards);
        assert_eq!(file.curves().len(), 1);
        assert_eq!(file.curves()[0].end(), Vector2::new(3.0, 0.0));
    }

    #[test]
    fn test_load_errors() {
        let params = ProfileParams::default();

        assert!(matches!(
            SampledPath::load("/does/not/exist.json", &params),
            Err(PathError::FileLoadError(_, _))
        ));
        assert!(matches!(
            PathFile::from_str(Path::new("bad.json"), r#"{"curves": [[{"x": 0}]]}"#),
            Err(PathError::ParseError(_, _))
        ));
        assert!(matches!(
            SampledPath::from_curves(vec![], false, &params),
            Err(PathError::EmptyPath)
        ));
    }
}
