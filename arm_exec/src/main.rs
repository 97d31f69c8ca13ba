//! Main arm-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Connect to the simulator, start it, register streaming reads
//!     - Seed the goal and the commanded target from the arm's initial
//!       measured position
//!     - Main loop:
//!         - Read the shared goal vector
//!         - Trajectory control processing (bounded-step interpolation)
//!         - Push the commanded target to the simulator
//!         - Sample a synchronized state snapshot
//!         - Forward kinematics validation of the sampled state
//!
//! Goal updates arrive on a background thread (see `goal_server`), the
//! main loop only ever reads the shared goal vector.
//!
//! # Modules
//!
//! All modules (e.g. `traj_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State`
//!        trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use arm_lib::{
    data_store::DataStore,
    fwd_kin,
    goal_server::{GoalServer, SharedGoal},
    params::ArmExecParams,
    sim_client::SimClient,
    traj_ctrl, CYCLE_FREQUENCY_HZ, CYCLE_PERIOD_S,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use nalgebra::Vector3;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use sim_if::net::NetParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Flag keeping the main loop running. Cleared by the interrupt handler.
static RUN: AtomicBool = AtomicBool::new(true);

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time to wait after registering streams before the first snapshot is
/// requested, lets the simulator's streams deliver their first values.
const STREAM_SETTLE_TIME_S: f64 = 1.0;

/// Maximum number of cycles spent waiting for the first complete snapshot
/// while seeding the goal from the arm's initial position.
const MAX_SEED_WAIT_CYCLES: u32 = 200;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let exec_params: ArmExecParams =
        util::params::load("arm_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE & MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.fwd_kin
        .init("fwd_kin.toml", &session)
        .wrap_err("Failed to initialise FwdKin")?;
    info!("FwdKin init complete");

    ds.traj_ctrl
        .init("traj_ctrl.toml", &session)
        .wrap_err("Failed to initialise TrajCtrl")?;
    info!("TrajCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE INTERRUPT HANDLER ----

    ctrlc::set_handler(|| RUN.store(false, Ordering::Relaxed))
        .wrap_err("Failed to set the interrupt handler")?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = sim_if::net::zmq::Context::new();

    let mut sim_client =
        SimClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the SimClient")?;
    info!("SimClient initialised");

    // ---- SIMULATION STARTUP ----

    // Simulator link errors degrade: the exec keeps cycling with unset
    // handles rather than crashing, and the affected operations no-op.
    if let Err(e) = sim_client.start_simulation() {
        warn!("Could not start the simulation: {}", e);
    }

    sim_client.init_handles(&exec_params);
    sim_client.start_streaming();

    // Give the streams time to deliver their first values
    thread::sleep(Duration::from_secs_f64(STREAM_SETTLE_TIME_S));

    // ---- SEED GOAL AND COMMANDED TARGET ----

    let goal: SharedGoal = Arc::new(Mutex::new(Vector3::default()));

    seed_initial_position(&mut ds, &sim_client, &goal);

    // ---- START GOAL SERVER ----

    let goal_server =
        GoalServer::start(&net_params, goal.clone()).wrap_err("Failed to start the GoalServer")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    while RUN.load(Ordering::Relaxed) {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- GOAL INPUT ----

        // The goal server swaps the vector whole, so this read never
        // observes a partially updated goal
        ds.goal_m_w = *goal.lock().expect("Goal mutex poisoned");

        // ---- TRAJECTORY CONTROL PROCESSING ----

        ds.traj_ctrl_input = traj_ctrl::InputData {
            goal_m_w: ds.goal_m_w,
        };

        match ds.traj_ctrl.proc(&ds.traj_ctrl_input) {
            Ok((o, r)) => {
                ds.traj_ctrl_output = Some(o);
                ds.traj_ctrl_status_rpt = r;
            }
            Err(e) => {
                // Happens when seeding never succeeded, the arm is left
                // where it is until a snapshot arrives
                warn!("Error during TrajCtrl processing: {}", e);
            }
        }

        // ---- TARGET OUTPUT ----

        if let Some(ref target_m_w) = ds.traj_ctrl_output {
            match sim_client.set_target_position(target_m_w) {
                Ok(()) => ds.num_consec_sim_errors = 0,
                Err(e) => {
                    // Only warn on the first of a run of errors, at 40 Hz a
                    // disconnected simulator would otherwise flood the log
                    if ds.num_consec_sim_errors == 0 {
                        warn!("Could not set the target position: {}", e);
                    }
                    ds.num_consec_sim_errors += 1;
                }
            }
        }

        // ---- STATE SAMPLING ----

        match sim_client.get_snapshot() {
            Ok(snapshot) => {
                if snapshot.is_complete() {
                    ds.num_consec_incomplete_snapshots = 0;
                } else {
                    // Not yet ready: skip this cycle's validation, the
                    // interpolation above has already run and is
                    // unaffected by sampling success
                    ds.num_consec_incomplete_snapshots += 1;
                    debug!("Incomplete snapshot, skipping validation");
                }

                ds.snapshot = Some(snapshot);
            }
            Err(e) => {
                if ds.num_consec_sim_errors == 0 {
                    warn!("Could not sample the simulator state: {}", e);
                }
                ds.num_consec_sim_errors += 1;
            }
        }

        // ---- FORWARD KINEMATICS VALIDATION ----

        let fwd_kin_input = match ds.snapshot {
            Some(ref s) => match (s.joint_array(), s.tcp_pos_m_w) {
                (Some(joint_pos_rad), Some(tcp_pos_m_w)) => Some(fwd_kin::InputData {
                    joint_pos_rad,
                    tcp_pos_m_w,
                }),
                _ => None,
            },
            None => None,
        };

        if let Some(input) = fwd_kin_input {
            ds.fwd_kin_input = input;

            match ds.fwd_kin.proc(&ds.fwd_kin_input) {
                Ok((o, r)) => {
                    ds.fwd_kin_output = Some(o);
                    ds.fwd_kin_status_rpt = r;
                }
                Err(e) => warn!("Error during FwdKin processing: {}", e),
            }
        }

        // ---- REPORTING ----

        if ds.is_1_hz_cycle {
            report_cycle(&ds);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("Stop requested, shutting down");

    // The goal server joins within its poll timeout, and dropping the
    // SimClient stops the simulation and releases the link
    goal_server.stop();
    drop(sim_client);

    info!("End of execution");

    Ok(())
}

/// Seed the shared goal and the commanded target from the arm's initial
/// measured position.
///
/// Waits for the first complete snapshot, giving the simulator's streams
/// time to warm up. If no complete snapshot arrives within the wait budget
/// both are seeded at the origin and the exec continues degraded.
fn seed_initial_position(ds: &mut DataStore, sim_client: &SimClient, goal: &SharedGoal) {
    for _ in 0..MAX_SEED_WAIT_CYCLES {
        if !RUN.load(Ordering::Relaxed) {
            break;
        }

        let snapshot = match sim_client.get_snapshot() {
            Ok(s) => s,
            Err(e) => {
                debug!("No snapshot while seeding: {}", e);
                thread::sleep(Duration::from_secs_f64(CYCLE_PERIOD_S));
                continue;
            }
        };

        if let (true, Some(tcp_pos_m_w)) = (snapshot.is_complete(), snapshot.tcp_pos_m_w) {
            ds.traj_ctrl.seed(tcp_pos_m_w);
            *goal.lock().expect("Goal mutex poisoned") = tcp_pos_m_w;

            info!(
                "Initial position: ({:.4}, {:.4}, {:.4})",
                tcp_pos_m_w[0], tcp_pos_m_w[1], tcp_pos_m_w[2]
            );

            return;
        }

        thread::sleep(Duration::from_secs_f64(CYCLE_PERIOD_S));
    }

    warn!("No complete snapshot while seeding, starting from the origin");
    ds.traj_ctrl.seed(Vector3::default());
}

/// Log the 1 Hz cycle report.
fn report_cycle(ds: &DataStore) {
    let goal = ds.goal_m_w;

    info!(
        "Goal target   : ({:.4}, {:.4}, {:.4})",
        goal[0], goal[1], goal[2]
    );

    if let Some(ref current) = ds.traj_ctrl_output {
        info!(
            "Current target: ({:.4}, {:.4}, {:.4}) | Remaining: {:.5} m",
            current[0], current[1], current[2], ds.traj_ctrl_status_rpt.remaining_m
        );
    }

    if let Some(tcp) = ds.snapshot.as_ref().and_then(|s| s.tcp_pos_m_w) {
        info!(
            "TCP position  : ({:.4}, {:.4}, {:.4}) | FK discrepancy: {:.5} m",
            tcp[0], tcp[1], tcp[2], ds.fwd_kin_status_rpt.discrepancy_m
        );
    }
}
