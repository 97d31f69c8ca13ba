//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix4, Vector3};

use crate::{fwd_kin, sim_client::Snapshot, traj_ctrl};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time
    pub elapsed_s: f64,

    // Goal tracking
    /// Copy of the shared goal vector observed at the start of this cycle
    pub goal_m_w: Vector3<f64>,

    // TrajCtrl
    pub traj_ctrl: traj_ctrl::TrajCtrl,
    pub traj_ctrl_input: traj_ctrl::InputData,
    pub traj_ctrl_output: Option<Vector3<f64>>,
    pub traj_ctrl_status_rpt: traj_ctrl::StatusReport,

    // Sampling
    /// The snapshot sampled this cycle, `None` until sampling has happened
    pub snapshot: Option<Snapshot>,

    // FwdKin
    pub fwd_kin: fwd_kin::FwdKin,
    pub fwd_kin_input: fwd_kin::InputData,
    pub fwd_kin_output: Option<Matrix4<f64>>,
    pub fwd_kin_status_rpt: fwd_kin::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive incomplete snapshots
    pub num_consec_incomplete_snapshots: u64,

    /// Number of consecutive simulator request errors
    pub num_consec_sim_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and
    /// sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.traj_ctrl_input = traj_ctrl::InputData::default();
        self.traj_ctrl_output = None;
        self.traj_ctrl_status_rpt = traj_ctrl::StatusReport::default();

        self.snapshot = None;
        self.fwd_kin_input = fwd_kin::InputData::default();
        self.fwd_kin_output = None;
        self.fwd_kin_status_rpt = fwd_kin::StatusReport::default();

        self.elapsed_s = util::session::get_elapsed_seconds();
    }
}
