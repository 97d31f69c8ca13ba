//! Parameters structure for TrajCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Speed at which the commanded target moves toward the goal.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}
