//! Utility maths functions
//!
//! Angles are in radians. Headings are canonicalised into [0, 2pi), measured
//! counter-clockwise from the positive X axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when
/// `lhs` is a tiny negative number, see `wrap_2pi` which folds that case back
/// to zero.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Canonicalise an angle into [0, 2pi).
pub fn wrap_2pi<T>(angle: T) -> T
where
    T: Float
{
    let tau_t = tau::<T>();
    let r = rem_euclid(angle, tau_t);
    if r >= tau_t { T::zero() } else { r }
}

/// Get the signed angular distance between two angles.
///
/// This function will return the shortest signed distance from `a` to `b`,
/// accounting for wrapping. A positive result means `b` is counter-clockwise
/// of `a`. The result lies in (-pi, pi].
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t = tau::<T>();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Unsigned angular distance travelled from `from` to `to` when sweeping in
/// one direction only, in [0, 2pi).
pub fn get_ang_sweep<T>(from: T, to: T, counter_clockwise: bool) -> T
where
    T: Float
{
    if counter_clockwise {
        wrap_2pi(to - from)
    }
    else {
        wrap_2pi(from - to)
    }
}

/// Determine if two headings are equal to within the given tolerance,
/// accounting for wrapping.
pub fn headings_eq<T>(a: T, b: T, tolerance: T) -> bool
where
    T: Float
{
    get_ang_dist_2pi(a, b).abs() <= tolerance
}

/// Heading of the line from `(x0, y0)` to `(x1, y1)` in [0, 2pi).
pub fn heading_between<T>(x0: T, y0: T, x1: T, y1: T) -> T
where
    T: Float
{
    wrap_2pi((y1 - y0).atan2(x1 - x0))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn tau<T: Float>() -> T {
    T::from(std::f64::consts::TAU).unwrap_or_else(T::nan)
}
