//! Path graph parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the path graph
#[derive(Deserialize, Debug, Clone)]
pub struct GraphParams {

    /// Side length of the square field. Waypoints are clamped into
    /// `[0, field_size_in]` on both axes.
    pub field_size_in: f64,

    /// Tolerance within which two headings are considered equal when
    /// classifying turns.
    pub heading_tolerance_rad: f64,

    /// Angular distance within which a dragged heading or a dragged waypoint
    /// snaps onto a candidate.
    pub snap_tolerance_rad: f64,

    /// Headings producing an arc longer than this are rejected.
    pub max_arc_length_in: f64,

    /// Default position of the start waypoint
    pub start_position_in: [f64; 2],

    /// Default heading of the start waypoint
    pub start_heading_rad: f64,

    /// Distance within which a point is considered to touch a segment or a
    /// waypoint for hit testing.
    pub hit_tolerance_in: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            field_size_in: 144.0,
            heading_tolerance_rad: 1e-3,
            snap_tolerance_rad: 0.05,
            max_arc_length_in: 300.0,
            start_position_in: [24.0, 48.0],
            start_heading_rad: 0.0,
            hit_tolerance_in: 2.0,
        }
    }
}
