//! # Path library.
//!
//! This library provides the path geometry engine and the drive preview
//! simulator used by the `path_exec` binary.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Arc geometry - tangent arcs between two points given an entry heading
pub mod arc;

/// Path graph - the chain of waypoints and segments making up a path
pub mod graph;

/// Simulation - differential drive simulator, PID and command playback
pub mod sim;
