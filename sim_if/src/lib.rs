//! # Simulator interface crate.
//!
//! Provides the communications interfaces shared between the arm control
//! executable, the goal-entry client, and the simulator's remote API adapter.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Goal update wire format shared by the goal server and the terminal client
pub mod goal;

/// Network module
pub mod net;

/// Simulator remote API request and response definitions
pub mod sim;
