//! # Simulator remote API definitions
//!
//! The simulator exposes its remote API through an adapter speaking JSON
//! over a ZMQ REQ/REP socket. Every operation is an independent
//! request/response exchange, there is no native multi-read transaction.
//! Clients wanting a coherent multi-value sample must bracket their buffered
//! reads between a pair of [`SimRequest::PauseCommunication`] commands, which
//! freeze the adapter's cache of streamed values while the reads take place.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An opaque handle identifying an object inside the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode of a read operation.
///
/// A `Streaming` read registers the quantity with the adapter, which will
/// keep its cached value fresh in the background. A `Buffer` read returns
/// the most recently cached value without triggering a new round trip into
/// the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadMode {
    Streaming,
    Buffer,
}

/// A request to the simulator's remote API adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimRequest {
    /// Start the simulation running.
    StartSimulation,

    /// Stop the simulation.
    StopSimulation,

    /// Look up the handle of a named scene object.
    GetObjectHandle { name: String },

    /// Pause or resume the adapter's outbound communication. While paused
    /// no new streamed values are folded into the adapter's cache, so a
    /// series of buffered reads observes one coherent instant.
    PauseCommunication { pause: bool },

    /// Read a joint's angular position.
    GetJointPosition { handle: ObjectHandle, mode: ReadMode },

    /// Read an object's position, relative to another object or (if
    /// `relative_to` is `None`) to the world frame.
    GetObjectPosition {
        handle: ObjectHandle,
        relative_to: Option<ObjectHandle>,
        mode: ReadMode,
    },

    /// Set the Cartesian target position an object should be driven to.
    SetTargetPosition { handle: ObjectHandle, pos_m: [f64; 3] },
}

/// A response from the simulator's remote API adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimResponse {
    /// The request was carried out and produced no value.
    Ok,

    /// The handle of a requested scene object.
    Handle(ObjectHandle),

    /// A joint's angular position in radians.
    JointPosition(f64),

    /// An object's position in metres.
    ObjectPosition([f64; 3]),

    /// The named scene object does not exist.
    NotFound,

    /// A buffered read was issued before the stream delivered its first
    /// value. The caller should treat the quantity as not yet available.
    NoValue,

    /// The adapter rejected the request.
    Rejected(String),
}

/// Possible parsing errors for messages on the simulator link.
#[derive(Debug, Error)]
pub enum SimMessageError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimRequest {
    /// Serialize this request into its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("SimRequest serialization failed. This should not happen")
    }
}

impl SimResponse {
    /// Parse a response from its JSON wire form.
    pub fn from_json(json_str: &str) -> Result<Self, SimMessageError> {
        serde_json::from_str(json_str).map_err(SimMessageError::InvalidJson)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let req = SimRequest::GetJointPosition {
            handle: ObjectHandle(3),
            mode: ReadMode::Buffer,
        };

        let parsed: SimRequest = serde_json::from_str(&req.to_json()).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_response_round_trip() {
        let resp = SimResponse::ObjectPosition([0.3, 0.0, 0.4]);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(SimResponse::from_json(&json).unwrap(), resp);
    }

    #[test]
    fn test_bad_json_rejected() {
        assert!(SimResponse::from_json("not json").is_err());
    }
}
