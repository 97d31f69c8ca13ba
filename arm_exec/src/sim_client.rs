//! # Simulator Client
//!
//! The SimClient drives the simulator's remote API adapter: starting and
//! stopping the simulation, looking up object handles, registering
//! streaming reads, sampling synchronized state snapshots and pushing new
//! Cartesian target positions.
//!
//! The adapter only offers independent per-quantity reads, so a coherent
//! multi-value sample is obtained by bracketing a series of buffered reads
//! between a pause and a resume of the adapter's outbound communication
//! (see [`get_snapshot`](SimClient::get_snapshot)).
//!
//! Link failures degrade rather than crash: a missing handle or an
//! unreachable adapter leaves the affected operations as logged no-ops and
//! the control loop keeps cycling.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use nalgebra::Vector3;

use sim_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    sim::{ObjectHandle, ReadMode, SimRequest, SimResponse},
};

use crate::fwd_kin::NUM_JOINTS;
use crate::params::ArmExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client for the simulator's remote API adapter.
pub struct SimClient {
    socket: MonitoredSocket,

    /// Handles of the joints which were found in the scene, in joint order.
    /// Entries are `None` for joints whose lookup failed.
    joint_handles: Vec<Option<ObjectHandle>>,

    /// Handle of the end-effector (tool center point) object
    tcp_handle: Option<ObjectHandle>,

    /// Handle of the target dummy the arm is driven toward
    target_handle: Option<ObjectHandle>,

    /// True once the simulation has been started, so that drop knows to
    /// stop it again
    sim_started: bool,
}

/// An atomic sample of the simulator's state.
///
/// Both values reflect the same simulator instant: the snapshot protocol
/// freezes the adapter's cache while the individual reads take place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Joint angles in joint order. May hold fewer than [`NUM_JOINTS`]
    /// entries while streams are still warming up.
    pub joint_pos_rad: Vec<f64>,

    /// End-effector position in the world frame, `None` if the stream has
    /// not delivered a value yet
    pub tcp_pos_m_w: Option<Vector3<f64>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the simulator")]
    NotConnected,

    #[error("Could not send a request to the simulator: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a response from the simulator: {0}")]
    RecvError(zmq::Error),

    #[error("No response from the simulator within the timeout")]
    NoResponse,

    #[error("The simulator sent a message which was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not parse the response from the simulator: {0}")]
    ResponseParseError(sim_if::sim::SimMessageError),

    #[error("The simulator rejected the request: {0}")]
    Rejected(String),

    #[error("No scene object named \"{0}\"")]
    ObjectNotFound(String),

    #[error("The simulator sent an unexpected response: {0:?}")]
    UnexpectedResponse(SimResponse),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Snapshot {
    /// A snapshot is complete once every joint stream and the end-effector
    /// stream have delivered a value.
    ///
    /// Incomplete snapshots must not be used: the caller skips the cycle's
    /// validation rather than acting on partial data.
    pub fn is_complete(&self) -> bool {
        self.joint_pos_rad.len() == NUM_JOINTS && self.tcp_pos_m_w.is_some()
    }

    /// The joint angles as a fixed-size array, or `None` if the snapshot
    /// is incomplete.
    pub fn joint_array(&self) -> Option<[f64; NUM_JOINTS]> {
        if self.joint_pos_rad.len() != NUM_JOINTS {
            return None;
        }

        let mut array = [0.0; NUM_JOINTS];
        array.copy_from_slice(&self.joint_pos_rad);
        Some(array)
    }
}

impl SimClient {
    /// Create a new instance of the simulator client.
    ///
    /// This function will not block waiting for the simulator: if the
    /// adapter is not reachable the client comes up disconnected and all
    /// requests fail with [`SimClientError::NotConnected`] until the
    /// background reconnect succeeds.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            // A REQ socket in strict alternation deadlocks after a timed
            // out receive, relax it so the next request resets the state
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REQ, socket_options, &params.sim_endpoint)
            .map_err(SimClientError::SocketError)?;

        if !socket.connected() {
            warn!(
                "Simulator not reachable at {}, will keep trying in the background",
                params.sim_endpoint
            );
        }

        Ok(Self {
            socket,
            joint_handles: Vec::new(),
            tcp_handle: None,
            target_handle: None,
            sim_started: false,
        })
    }

    /// Check if the client is connected to the simulator.
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Start the simulation running.
    pub fn start_simulation(&mut self) -> Result<(), SimClientError> {
        self.request_ok(&SimRequest::StartSimulation)?;
        self.sim_started = true;
        info!("Simulation started");
        Ok(())
    }

    /// Stop the simulation.
    pub fn stop_simulation(&mut self) -> Result<(), SimClientError> {
        self.request_ok(&SimRequest::StopSimulation)?;
        self.sim_started = false;
        info!("Simulation stopped");
        Ok(())
    }

    /// Look up the handles of the joints, the end effector and the target
    /// dummy.
    ///
    /// Lookup failures are logged and leave the affected handle unset,
    /// operations depending on it become no-ops rather than faults.
    pub fn init_handles(&mut self, params: &ArmExecParams) {
        self.joint_handles = params
            .joint_names
            .iter()
            .map(|name| match self.get_object_handle(name) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!("Could not find handle for joint \"{}\": {}", name, e);
                    None
                }
            })
            .collect();

        self.tcp_handle = match self.get_object_handle(&params.tcp_name) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(
                    "Could not find handle for end effector \"{}\": {}",
                    params.tcp_name, e
                );
                None
            }
        };

        self.target_handle = match self.get_object_handle(&params.target_name) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(
                    "Could not find handle for target \"{}\": {}",
                    params.target_name, e
                );
                None
            }
        };
    }

    /// Register streaming reads for every known handle.
    ///
    /// Called once at startup. The adapter starts keeping its cache of
    /// these quantities fresh, subsequent buffered reads return the cached
    /// values without new round trips into the simulation.
    pub fn start_streaming(&self) {
        for handle in self.joint_handles.iter().flatten() {
            let result = self.request(&SimRequest::GetJointPosition {
                handle: *handle,
                mode: ReadMode::Streaming,
            });
            if let Err(e) = result {
                warn!("Could not register joint streaming: {}", e);
            }
        }

        if let Some(handle) = self.tcp_handle {
            let result = self.request(&SimRequest::GetObjectPosition {
                handle,
                relative_to: None,
                mode: ReadMode::Streaming,
            });
            if let Err(e) = result {
                warn!("Could not register end-effector streaming: {}", e);
            }
        }
    }

    /// Sample a synchronized snapshot of the joint angles and the
    /// end-effector world position.
    ///
    /// The adapter's outbound communication is paused around the buffered
    /// reads so that every read observes the same simulator instant, then
    /// resumed. The resume is issued even when a read in the middle fails.
    pub fn get_snapshot(&self) -> Result<Snapshot, SimClientError> {
        self.request_ok(&SimRequest::PauseCommunication { pause: true })?;

        let snapshot = self.read_snapshot_values();

        // Resume must happen regardless of how the reads went, otherwise
        // the adapter's cache stays frozen
        if let Err(e) = self.request_ok(&SimRequest::PauseCommunication { pause: false }) {
            warn!("Could not resume simulator communication: {}", e);
        }

        Ok(snapshot)
    }

    /// Push a new Cartesian target position for the arm to be driven to.
    ///
    /// A no-op if the target handle was not found at startup.
    pub fn set_target_position(&self, pos_m_w: &Vector3<f64>) -> Result<(), SimClientError> {
        let handle = match self.target_handle {
            Some(h) => h,
            None => return Ok(()),
        };

        self.request_ok(&SimRequest::SetTargetPosition {
            handle,
            pos_m: [pos_m_w[0], pos_m_w[1], pos_m_w[2]],
        })
    }

    // --------------------------------------------------------------------------------------------
    // PRIVATE METHODS
    // --------------------------------------------------------------------------------------------

    /// Read all snapshot quantities from the adapter's frozen cache.
    ///
    /// Individual read failures shrink the snapshot instead of aborting it,
    /// the completeness gate decides downstream whether it is usable.
    fn read_snapshot_values(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();

        for handle in self.joint_handles.iter().flatten() {
            let result = self.request(&SimRequest::GetJointPosition {
                handle: *handle,
                mode: ReadMode::Buffer,
            });

            match result {
                Ok(SimResponse::JointPosition(pos_rad)) => {
                    snapshot.joint_pos_rad.push(pos_rad);
                }
                Ok(SimResponse::NoValue) => (),
                Ok(r) => warn!("Unexpected joint read response: {:?}", r),
                Err(e) => warn!("Joint read failed: {}", e),
            }
        }

        if let Some(handle) = self.tcp_handle {
            let result = self.request(&SimRequest::GetObjectPosition {
                handle,
                relative_to: None,
                mode: ReadMode::Buffer,
            });

            match result {
                Ok(SimResponse::ObjectPosition(p)) => {
                    snapshot.tcp_pos_m_w = Some(Vector3::new(p[0], p[1], p[2]));
                }
                Ok(SimResponse::NoValue) => (),
                Ok(r) => warn!("Unexpected end-effector read response: {:?}", r),
                Err(e) => warn!("End-effector read failed: {}", e),
            }
        }

        snapshot
    }

    /// Look up a single object handle by name.
    fn get_object_handle(&self, name: &str) -> Result<ObjectHandle, SimClientError> {
        match self.request(&SimRequest::GetObjectHandle {
            name: String::from(name),
        })? {
            SimResponse::Handle(h) => Ok(h),
            SimResponse::NotFound => Err(SimClientError::ObjectNotFound(String::from(name))),
            r => Err(SimClientError::UnexpectedResponse(r)),
        }
    }

    /// Perform one request/response exchange with the adapter.
    fn request(&self, request: &SimRequest) -> Result<SimResponse, SimClientError> {
        if !self.socket.connected() {
            return Err(SimClientError::NotConnected);
        }

        self.socket
            .send(&request.to_json(), 0)
            .map_err(SimClientError::SendError)?;

        let response_str = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(SimClientError::NonUtf8Response),
            Err(zmq::Error::EAGAIN) => return Err(SimClientError::NoResponse),
            Err(e) => return Err(SimClientError::RecvError(e)),
        };

        let response =
            SimResponse::from_json(&response_str).map_err(SimClientError::ResponseParseError)?;

        if let SimResponse::Rejected(reason) = response {
            return Err(SimClientError::Rejected(reason));
        }

        Ok(response)
    }

    /// Perform a request which is expected to produce a plain `Ok`.
    fn request_ok(&self, request: &SimRequest) -> Result<(), SimClientError> {
        match self.request(request)? {
            SimResponse::Ok => Ok(()),
            r => Err(SimClientError::UnexpectedResponse(r)),
        }
    }
}

impl Drop for SimClient {
    /// Release the simulator deterministically on every exit path: stop
    /// the simulation if this client started it.
    fn drop(&mut self) {
        if self.sim_started {
            if let Err(e) = self.stop_simulation() {
                warn!("Could not stop the simulation on shutdown: {}", e);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snapshot_completeness_gate() {
        // Fresh snapshot: nothing delivered yet
        let snapshot = Snapshot::default();
        assert!(!snapshot.is_complete());
        assert!(snapshot.joint_array().is_none());

        // Five of six joints: still incomplete
        let snapshot = Snapshot {
            joint_pos_rad: vec![0.0; NUM_JOINTS - 1],
            tcp_pos_m_w: Some(Vector3::new(0.3, 0.0, 0.4)),
        };
        assert!(!snapshot.is_complete());
        assert!(snapshot.joint_array().is_none());

        // All joints but no end-effector position: incomplete
        let snapshot = Snapshot {
            joint_pos_rad: vec![0.0; NUM_JOINTS],
            tcp_pos_m_w: None,
        };
        assert!(!snapshot.is_complete());

        // Fully populated: complete
        let snapshot = Snapshot {
            joint_pos_rad: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            tcp_pos_m_w: Some(Vector3::new(0.3, 0.0, 0.4)),
        };
        assert!(snapshot.is_complete());
        assert_eq!(
            snapshot.joint_array(),
            Some([0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
        );
    }
}
