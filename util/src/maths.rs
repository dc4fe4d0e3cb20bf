//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Get the signed angular distance from `a` to `b`.
///
/// Both angles may be given in any range, the result is the shortest signed rotation which takes
/// `a` onto `b`, in the range `[-pi, pi]`. Positive results follow the right hand rule (anticlockwise).
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float,
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap_or_else(T::zero);

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    } else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Move `current` towards `target` by at most `max_step`.
pub fn approach<T>(current: T, target: T, max_step: T) -> T
where
    T: Float,
{
    let step = max_step.abs();

    if target > current + step {
        current + step
    } else if target < current - step {
        current - step
    } else {
        target
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist_2pi() {
        const TAU: f64 = std::f64::consts::TAU;
        const PI: f64 = std::f64::consts::PI;

        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
        assert!((get_ang_dist_2pi(-PI + 0.1, PI - 0.1) + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_approach() {
        assert_eq!(approach(0.0, 1.0, 0.25), 0.25);
        assert_eq!(approach(0.0, -1.0, 0.25), -0.25);
        assert_eq!(approach(0.9, 1.0, 0.25), 1.0);
        assert_eq!(approach(1.0, 0.0, -0.5), 0.5);
    }
}
