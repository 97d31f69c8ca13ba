//! Trajectory control module
//!
//! Owns the commanded target position and moves it toward the goal by a
//! bounded step each control cycle, so that a distant goal produces a
//! constant-speed sweep rather than a jump. A goal change mid-flight simply
//! changes the heading from wherever the commanded target currently is.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TrajCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("The commanded target has not been seeded from the arm's initial position yet")]
    NotSeeded,
}
