//! Parameters structure for FwdKin

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for forward kinematics.
///
/// Each field is a comma-separated list of six entries, one per joint. An
/// entry may be a small arithmetic expression using the constant `pi`, e.g.
/// `"pi/2, 0, 0, pi/2, -pi/2, 0"`. The lists are evaluated once at module
/// initialisation, a malformed list degrades to all-zero entries rather
/// than failing the exec.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Link offsets along the previous joint's Z axis.
    ///
    /// Units: meters.
    pub dh_d: String,

    /// Link lengths along the rotated X axis.
    ///
    /// Units: meters.
    pub dh_a: String,

    /// Link twists about the rotated X axis.
    ///
    /// Units: radians.
    pub dh_alpha: String,
}
