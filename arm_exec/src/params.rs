//! # Arm Executable Parameters
//!
//! This module provides parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmExecParams {
    /// Scene names of the six arm joints, in joint order
    pub joint_names: Vec<String>,

    /// Scene name of the end-effector (tool center point) object
    pub tcp_name: String,

    /// Scene name of the target dummy the arm is driven toward
    pub target_name: String,
}
