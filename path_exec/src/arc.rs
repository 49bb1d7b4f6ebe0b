//! # Arc geometry
//!
//! Pure functions which connect two points with either a straight line or a
//! single circular arc, given the heading of travel at the first point.
//!
//! The arc is the unique circle tangent to the entry heading at `from` which
//! also passes through `to`. Its centre lies on the line through `from`
//! perpendicular to the entry heading. With `d = to - from` and `n` the left
//! normal of the entry heading, the signed distance from `from` to the centre
//! along `n` is
//!
//! ```text
//! r_s = |d|^2 / (2 n.d)
//! ```
//!
//! A positive `r_s` puts the centre on the left of the direction of travel,
//! so the arc sweeps counter-clockwise. The exit heading follows from the
//! chord angle `phi` being the mean of the entry and exit headings:
//!
//! ```text
//! exit = 2 phi - entry  (mod 2pi)
//! ```
//!
//! When the entry heading points exactly away from `to`, `n.d` vanishes and
//! the circle has infinite radius. This configuration is reported as a
//! degenerate arc rather than divided through.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use util::maths::{get_ang_sweep, heading_between, headings_eq, wrap_2pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default tolerance within which an entry heading is considered equal to
/// the chord heading, making the arc straight. The path graph uses its own
/// `heading_tolerance_rad` parameter instead.
///
/// Units: radians
pub const HEADING_EQ_TOL_RAD: f64 = 1e-3;

/// Below this value of `sin(entry - chord)` the entry heading is treated as
/// anti-parallel to the chord.
const DEGENERATE_SIN_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The connection between two points given an entry heading.
///
/// Arcs are always computed wholesale by `compute_arc`, never modified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arc {
    /// Start point of the arc
    pub from: Point2<f64>,

    /// End point of the arc
    pub to: Point2<f64>,

    /// Centre of the circle, `None` for straight and degenerate arcs
    pub center: Option<Point2<f64>>,

    /// Radius of the circle, infinite for straight and degenerate arcs
    ///
    /// Units: inches
    pub radius_in: f64,

    /// Polar angle of `from` about the centre
    ///
    /// Units: radians
    pub theta1_rad: f64,

    /// Polar angle of `to` about the centre
    ///
    /// Units: radians
    pub theta2_rad: f64,

    /// Heading of travel at `from`
    ///
    /// Units: radians
    pub entry_heading_rad: f64,

    /// Heading of travel at `to`
    ///
    /// Units: radians
    pub exit_heading_rad: f64,

    /// Sweep direction around the centre, `None` unless the arc is curved
    pub parity: Option<Parity>,

    /// True if the arc is a straight line from `from` to `to`
    pub is_straight: bool,

    /// True if the entry heading points directly away from `to`
    pub is_degenerate: bool,

    /// Length along the arc, infinite for degenerate arcs
    ///
    /// Units: inches
    pub arc_length_in: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sweep direction of a circular arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    Clockwise,
    CounterClockwise,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Parity {
    /// +1 for counter-clockwise, -1 for clockwise.
    pub fn signum(&self) -> f64 {
        match self {
            Parity::Clockwise => -1.0,
            Parity::CounterClockwise => 1.0,
        }
    }

    pub fn is_ccw(&self) -> bool {
        matches!(self, Parity::CounterClockwise)
    }
}

impl Arc {
    /// Build a straight arc between the two points.
    pub fn straight(from: Point2<f64>, to: Point2<f64>) -> Self {
        let heading = straight_heading(&from, &to);

        Self {
            from,
            to,
            center: None,
            radius_in: std::f64::INFINITY,
            theta1_rad: 0.0,
            theta2_rad: 0.0,
            entry_heading_rad: heading,
            exit_heading_rad: heading,
            parity: None,
            is_straight: true,
            is_degenerate: false,
            arc_length_in: (to - from).norm(),
        }
    }

    /// Angle swept around the centre from `from` to `to` in the parity
    /// direction. Zero if the arc is not curved.
    pub fn sweep_rad(&self) -> f64 {
        match self.parity {
            Some(p) => get_ang_sweep(self.theta1_rad, self.theta2_rad, p.is_ccw()),
            None => 0.0,
        }
    }

    /// Signed curvature of the arc, positive when turning left.
    ///
    /// Units: 1/inches
    pub fn curvature_in(&self) -> f64 {
        match self.parity {
            Some(p) => p.signum() / self.radius_in,
            None => 0.0,
        }
    }

    /// The point a distance `s_in` along the arc from `from`.
    pub fn point_at(&self, s_in: f64) -> Point2<f64> {
        match (self.center, self.parity) {
            (Some(c), Some(p)) => {
                let ang = self.theta1_rad + p.signum() * s_in / self.radius_in;
                c + self.radius_in * Vector2::new(ang.cos(), ang.sin())
            }
            _ => {
                let h = self.entry_heading_rad;
                self.from + s_in * Vector2::new(h.cos(), h.sin())
            }
        }
    }

    /// The heading of travel a distance `s_in` along the arc from `from`.
    pub fn heading_at(&self, s_in: f64) -> f64 {
        wrap_2pi(self.entry_heading_rad + self.curvature_in() * s_in)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the arc from `from` to `to` with the given entry heading.
///
/// # Preconditions
/// - `from` and `to` must not coincide.
pub fn compute_arc(from: Point2<f64>, to: Point2<f64>, entry_heading_rad: f64) -> Arc {
    compute_arc_with_tolerance(from, to, entry_heading_rad, HEADING_EQ_TOL_RAD)
}

/// Compute the arc as `compute_arc` does, treating it as straight when the
/// entry heading is within `straight_tol_rad` of the chord heading.
pub fn compute_arc_with_tolerance(
    from: Point2<f64>,
    to: Point2<f64>,
    entry_heading_rad: f64,
    straight_tol_rad: f64
) -> Arc {
    let entry = wrap_2pi(entry_heading_rad);
    let chord_heading = straight_heading(&from, &to);

    if headings_eq(entry, chord_heading, straight_tol_rad) {
        return Arc::straight(from, to);
    }

    let d = to - from;
    let dist_sq = d.norm_squared();

    // Component of the chord along the left normal of the entry heading
    let normal = Vector2::new(-entry.sin(), entry.cos());
    let n_dot_d = normal.dot(&d);

    if n_dot_d.abs() <= DEGENERATE_SIN_TOL * dist_sq.sqrt() {
        return Arc {
            from,
            to,
            center: None,
            radius_in: std::f64::INFINITY,
            theta1_rad: 0.0,
            theta2_rad: 0.0,
            entry_heading_rad: entry,
            exit_heading_rad: exit_heading(&from, &to, entry),
            parity: None,
            is_straight: false,
            is_degenerate: true,
            arc_length_in: std::f64::INFINITY,
        };
    }

    let signed_radius = dist_sq / (2.0 * n_dot_d);
    let center = from + signed_radius * normal;
    let radius_in = (from - center).norm();

    let theta1_rad = heading_between(center.x, center.y, from.x, from.y);
    let theta2_rad = heading_between(center.x, center.y, to.x, to.y);

    // The centre lies to the left of the entry heading exactly when the
    // heading turns counter-clockwise around it.
    let parity = if signed_radius > 0.0 {
        Parity::CounterClockwise
    }
    else {
        Parity::Clockwise
    };

    let sweep = get_ang_sweep(theta1_rad, theta2_rad, parity.is_ccw());

    Arc {
        from,
        to,
        center: Some(center),
        radius_in,
        theta1_rad,
        theta2_rad,
        entry_heading_rad: entry,
        exit_heading_rad: exit_heading(&from, &to, entry),
        parity: Some(parity),
        is_straight: false,
        is_degenerate: false,
        arc_length_in: sweep * radius_in,
    }
}

/// Exit heading of the constant curvature arc from `from` to `to` with the
/// given entry heading.
pub fn exit_heading(from: &Point2<f64>, to: &Point2<f64>, entry_heading_rad: f64) -> f64 {
    let d = to - from;
    wrap_2pi(2.0 * d.y.atan2(d.x) - entry_heading_rad)
}

/// The entry heading which makes the arc from `from` to `to` leave with the
/// given exit heading. The arc relation is symmetric so this is the same
/// formula as `exit_heading`.
pub fn entry_heading_for_exit(from: &Point2<f64>, to: &Point2<f64>, exit_heading_rad: f64) -> f64 {
    exit_heading(from, to, exit_heading_rad)
}

/// Heading of the straight line from `from` to `to`.
pub fn straight_heading(from: &Point2<f64>, to: &Point2<f64>) -> f64 {
    heading_between(from.x, from.y, to.x, to.y)
}

/// The 2D cross product (z component of the 3D cross product).
pub fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Determine if the point is within `tolerance_in` of the arc.
///
/// Straight and degenerate arcs are tested against the bounded segment
/// between their end points. Curved arcs are tested against the circle,
/// limited to the span swept in the parity direction.
pub fn is_touching(arc: &Arc, point: &Point2<f64>, tolerance_in: f64) -> bool {
    match (arc.center, arc.parity) {
        (Some(center), Some(parity)) => {
            let radial = point - center;
            if (radial.norm() - arc.radius_in).abs() > tolerance_in {
                return false;
            }

            let ang = heading_between(center.x, center.y, point.x, point.y);
            get_ang_sweep(arc.theta1_rad, ang, parity.is_ccw()) <= arc.sweep_rad()
        }
        _ => {
            let seg = arc.to - arc.from;
            let len_sq = seg.norm_squared();
            if len_sq == 0.0 {
                return false;
            }

            let rel = point - arc.from;
            let t = rel.dot(&seg) / len_sq;
            if !(0.0..=1.0).contains(&t) {
                return false;
            }

            cross2(&seg, &rel).abs() / len_sq.sqrt() <= tolerance_in
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};
    use util::maths::get_ang_dist_2pi;

    fn random_point(rng: &mut StdRng) -> Point2<f64> {
        Point2::new(rng.gen_range(0.0..144.0), rng.gen_range(0.0..144.0))
    }

    #[test]
    fn test_straight_heading_gives_straight_arc() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let a = random_point(&mut rng);
            let b = random_point(&mut rng);
            if (b - a).norm() < 1e-6 {
                continue;
            }

            let arc = compute_arc(a, b, straight_heading(&a, &b));
            assert!(arc.is_straight);
            assert!(arc.center.is_none());
            assert_abs_diff_eq!(arc.arc_length_in, (b - a).norm(), epsilon = 1e-9);
            assert_abs_diff_eq!(arc.exit_heading_rad, arc.entry_heading_rad);
        }
    }

    #[test]
    fn test_semicircle() {
        let arc = compute_arc(Point2::new(0.0, 0.0), Point2::new(0.0, 2.0), 0.0);

        assert!(!arc.is_straight);
        assert_eq!(arc.parity, Some(Parity::CounterClockwise));
        let c = arc.center.unwrap();
        assert_abs_diff_eq!(c.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.radius_in, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.arc_length_in, PI, epsilon = 1e-9);
        assert_abs_diff_eq!(arc.exit_heading_rad, PI, epsilon = 1e-9);
    }

    #[test]
    fn test_quarter_turns() {
        // Left quarter turn
        let left = compute_arc(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 0.0);
        assert_eq!(left.parity, Some(Parity::CounterClockwise));
        assert_abs_diff_eq!(left.sweep_rad(), FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(left.exit_heading_rad, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(left.curvature_in(), 1.0, epsilon = 1e-9);

        // Right quarter turn
        let right = compute_arc(Point2::new(0.0, 0.0), Point2::new(1.0, -1.0), 0.0);
        assert_eq!(right.parity, Some(Parity::Clockwise));
        assert_abs_diff_eq!(right.sweep_rad(), FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(right.exit_heading_rad, 3.0 * FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(right.curvature_in(), -1.0, epsilon = 1e-9);

        // Walking along the arc ends at `to` with the exit heading
        let end = left.point_at(left.arc_length_in);
        assert_abs_diff_eq!(end.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.y, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left.heading_at(left.arc_length_in), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_major_arc_follows_heading_not_shorter_side() {
        // Heading straight down but needing to reach a point up and to the
        // right: the arc must go the long way around.
        let arc = compute_arc(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 3.0 * FRAC_PI_2);
        assert_eq!(arc.parity, Some(Parity::CounterClockwise));
        assert!(arc.sweep_rad() > PI);
        assert_abs_diff_eq!(arc.sweep_rad(), 3.0 * FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_perpendicular_entry_is_finite() {
        let arc = compute_arc(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), FRAC_PI_2);
        assert!(!arc.is_degenerate);
        assert_abs_diff_eq!(arc.radius_in, 2.0, epsilon = 1e-9);
        assert_eq!(arc.parity, Some(Parity::Clockwise));
    }

    #[test]
    fn test_anti_parallel_entry_is_degenerate() {
        let arc = compute_arc(Point2::new(0.0, 0.0), Point2::new(3.0, 0.0), PI);
        assert!(arc.is_degenerate);
        assert!(!arc.is_straight);
        assert!(arc.center.is_none());
        assert!(arc.arc_length_in.is_infinite());
    }

    #[test]
    fn test_exit_heading_continuity() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut num_checked = 0;

        while num_checked < 1000 {
            let a = random_point(&mut rng);
            let b = random_point(&mut rng);
            let entry = rng.gen_range(0.0..TAU);
            if (b - a).norm() < 1e-3 {
                continue;
            }

            let arc = compute_arc(a, b, entry);
            if arc.is_straight || arc.is_degenerate {
                continue;
            }

            // Tangent at `to` derived from the polar angle alone
            let parity = arc.parity.unwrap();
            let tangent = arc.theta2_rad + parity.signum() * FRAC_PI_2;

            assert!(
                get_ang_dist_2pi(tangent, arc.exit_heading_rad).abs() < 1e-6,
                "exit mismatch for {:?} -> {:?} @ {}", a, b, entry
            );

            // Tangent at `from` must match the entry heading too
            let tangent_from = arc.theta1_rad + parity.signum() * FRAC_PI_2;
            assert!(get_ang_dist_2pi(tangent_from, arc.entry_heading_rad).abs() < 1e-6);

            num_checked += 1;
        }
    }

    #[test]
    fn test_parity_sweep_samples() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut num_checked = 0;

        while num_checked < 200 {
            let a = random_point(&mut rng);
            let b = random_point(&mut rng);
            let entry = rng.gen_range(0.0..TAU);
            if (b - a).norm() < 1.0 {
                continue;
            }

            let arc = compute_arc(a, b, entry);
            if arc.is_straight || arc.is_degenerate {
                continue;
            }

            let center = arc.center.unwrap();
            let parity = arc.parity.unwrap();
            let chord = b - a;
            let sweep = arc.sweep_rad();

            for i in 1..20 {
                let ang = arc.theta1_rad + parity.signum() * sweep * (i as f64) / 20.0;
                let p = center + arc.radius_in * Vector2::new(ang.cos(), ang.sin());

                // On the circle
                assert_abs_diff_eq!((p - center).norm(), arc.radius_in, epsilon = 1e-6 * arc.radius_in);

                // Counter-clockwise arcs bulge to the right of the chord,
                // clockwise arcs to the left
                let side = cross2(&chord, &(p - a));
                let tol = 1e-9 * chord.norm() * arc.radius_in;
                match parity {
                    Parity::CounterClockwise => assert!(side <= tol),
                    Parity::Clockwise => assert!(side >= -tol),
                }
            }

            num_checked += 1;
        }
    }

    #[test]
    fn test_is_touching() {
        let line = compute_arc(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 0.0);
        assert!(is_touching(&line, &Point2::new(5.0, 0.5), 1.0));
        assert!(!is_touching(&line, &Point2::new(5.0, 1.5), 1.0));
        assert!(!is_touching(&line, &Point2::new(11.0, 0.0), 1.0));

        // Right half circle of radius 1 about (0, 1)
        let arc = compute_arc(Point2::new(0.0, 0.0), Point2::new(0.0, 2.0), 0.0);
        assert!(is_touching(&arc, &Point2::new(1.0, 1.0), 0.1));
        assert!(is_touching(&arc, &Point2::new(FRAC_PI_4.cos(), 1.0 - FRAC_PI_4.sin()), 0.1));
        // Same circle but outside the swept span
        assert!(!is_touching(&arc, &Point2::new(-1.0, 1.0), 0.1));
        // Inside the span but off the circle
        assert!(!is_touching(&arc, &Point2::new(0.5, 1.0), 0.1));
    }

    #[test]
    fn test_back_solve_entry() {
        let a = Point2::new(10.0, 10.0);
        let b = Point2::new(30.0, 25.0);
        let arc = compute_arc(a, b, 0.3);
        let entry = entry_heading_for_exit(&a, &b, arc.exit_heading_rad);
        assert_abs_diff_eq!(entry, 0.3, epsilon = 1e-9);
    }
}
