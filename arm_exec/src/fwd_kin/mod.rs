//! Forward kinematics module
//!
//! Converts a sampled joint angle vector into the world-frame pose of the
//! arm's end effector, using the Denavit-Hartenberg parameters loaded from
//! configuration. The computed position is compared against the simulator's
//! reported end-effector position as a validation signal, it is never fed
//! back into control.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dh;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Matrix4;

// Internal
pub use dh::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of joints on the arm.
pub const NUM_JOINTS: usize = 6;

/// Mechanical zero offsets applied to the sampled joint angles before the
/// DH transforms are composed. Joints 2 and 4 are mounted a quarter turn
/// from their kinematic zero.
pub const JOINT_ZERO_OFFSET_RAD: [f64; NUM_JOINTS] = [
    0.0,
    -std::f64::consts::FRAC_PI_2,
    0.0,
    -std::f64::consts::FRAC_PI_2,
    0.0,
    0.0,
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during FwdKin operation.
#[derive(Debug, thiserror::Error)]
pub enum FwdKinError {
    #[error("Expected {NUM_JOINTS} joint angles, found {0}")]
    WrongJointCount(usize),

    #[error("No pose has been computed yet, call forward() first")]
    NoPoseComputed,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The fixed transform taking poses in the arm's base frame into the
/// simulator's world frame.
///
/// The two frames differ by a quarter turn about the vertical axis: the
/// base frame's Y axis is the world frame's X axis, and the base frame's X
/// axis is the world frame's -Y axis. The transform is rotation only.
pub fn base_to_world() -> Matrix4<f64> {
    Matrix4::new(
        0.0, 1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}
