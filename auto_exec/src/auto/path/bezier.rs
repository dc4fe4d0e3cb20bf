//! Cubic Bézier curves

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Below this first derivative magnitude the curve is treated as having no direction.
const MIN_DERIV_NORM: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A cubic Bézier curve defined by four control points.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub points_m: [Vector2<f64>; 4],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CubicBezier {
    pub fn new(p0: Vector2<f64>, p1: Vector2<f64>, p2: Vector2<f64>, p3: Vector2<f64>) -> Self {
        Self {
            points_m: [p0, p1, p2, p3],
        }
    }

    /// A straight line from `start` to `end` with evenly spaced control points.
    pub fn line(start: Vector2<f64>, end: Vector2<f64>) -> Self {
        let d = end - start;
        Self::new(start, start + d / 3.0, start + d * 2.0 / 3.0, end)
    }

    pub fn start(&self) -> Vector2<f64> {
        self.points_m[0]
    }

    pub fn end(&self) -> Vector2<f64> {
        self.points_m[3]
    }

    /// Position at parameter `t`.
    pub fn position(&self, t: f64) -> Vector2<f64> {
        let [p0, p1, p2, p3] = self.points_m;
        let u = 1.0 - t;

        p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
    }

    /// First derivative with respect to `t`.
    pub fn derivative(&self, t: f64) -> Vector2<f64> {
        let [p0, p1, p2, p3] = self.points_m;
        let u = 1.0 - t;

        (p1 - p0) * (3.0 * u * u) + (p2 - p1) * (6.0 * u * t) + (p3 - p2) * (3.0 * t * t)
    }

    /// Second derivative with respect to `t`.
    pub fn second_derivative(&self, t: f64) -> Vector2<f64> {
        let [p0, p1, p2, p3] = self.points_m;

        (p2 - p1 * 2.0 + p0) * (6.0 * (1.0 - t)) + (p3 - p2 * 2.0 + p1) * (6.0 * t)
    }

    /// Unit tangent at `t`, or `None` where the curve has no direction (coincident control
    /// points).
    pub fn tangent(&self, t: f64) -> Option<Vector2<f64>> {
        let d = self.derivative(t);
        let n = d.norm();

        if n < MIN_DERIV_NORM {
            None
        } else {
            Some(d / n)
        }
    }

    /// Signed curvature at `t`, positive when turning anticlockwise.
    ///
    /// Zero where the curve has no direction.
    pub fn curvature(&self, t: f64) -> f64 {
        let d = self.derivative(t);
        let dd = self.second_derivative(t);
        let n = d.norm();

        if n < MIN_DERIV_NORM {
            return 0.0;
        }

        (d[0] * dd[1] - d[1] * dd[0]) / (n * n * n)
    }
}
