//! Utility library for the path generation software
//!
//! Provides the ambient services shared by the executables: logging,
//! parameter loading, sessions, CSV archiving and angle maths.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod time;
