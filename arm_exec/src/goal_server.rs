//! # Goal Server
//!
//! The goal server accepts goal position updates from the terminal client
//! (`command_line_target`). Updates arrive as one plain-text payload of
//! three whitespace-separated decimals per TCP connection, the connection
//! is closed after a single read.
//!
//! The listener runs on a background thread and publishes valid updates
//! into a shared goal vector. The whole vector is swapped under the mutex
//! in one go, so the control loop never observes a goal with only some
//! components updated. The accept loop polls with a short sleep rather
//! than blocking, which bounds the shutdown latency to one poll interval.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::Read,
    net::{TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{info, warn};
use nalgebra::Vector3;

use sim_if::{goal::parse_goal, net::NetParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Interval between accept polls. Bounds the shutdown latency of the
/// listener thread.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timeout on reading the payload from an accepted connection.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum payload size. Three decimal numbers fit comfortably, anything
/// larger is garbage.
const MAX_PAYLOAD_BYTES: usize = 256;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Handle to the goal vector shared between the goal server's listener
/// thread and the control loop.
pub type SharedGoal = Arc<Mutex<Vector3<f64>>>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Server which accepts goal position updates from the terminal client.
pub struct GoalServer {
    jh: Option<JoinHandle<()>>,

    run: Arc<AtomicBool>,

    local_addr: std::net::SocketAddr,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GoalServerError {
    #[error("Could not bind the goal listener to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not configure the goal listener: {0}")]
    ListenerConfigError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GoalServer {
    /// Bind the listener and start serving goal updates into `goal`.
    pub fn start(params: &NetParams, goal: SharedGoal) -> Result<Self, GoalServerError> {
        let listener = TcpListener::bind(&params.goal_bind_addr)
            .map_err(|e| GoalServerError::BindError(params.goal_bind_addr.clone(), e))?;

        // Non-blocking accept so the listener loop can observe the run flag
        listener
            .set_nonblocking(true)
            .map_err(GoalServerError::ListenerConfigError)?;
        let local_addr = listener
            .local_addr()
            .map_err(GoalServerError::ListenerConfigError)?;

        let run = Arc::new(AtomicBool::new(true));
        let run_clone = run.clone();

        let jh = thread::spawn(move || listener_loop(listener, run_clone, goal));

        info!("Goal server listening on {}", local_addr);

        Ok(Self {
            jh: Some(jh),
            run,
            local_addr,
        })
    }

    /// The address the listener actually bound to.
    ///
    /// Differs from the configured address when the configuration requests
    /// an ephemeral port.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Stop the listener thread.
    ///
    /// Returns once the thread has exited, which takes at most one accept
    /// poll interval plus one payload read timeout.
    pub fn stop(mut self) {
        self.run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.jh.take() {
            jh.join().ok();
        }

        info!("Goal server stopped");
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Listener main loop, runs on the background thread.
fn listener_loop(listener: TcpListener, run: Arc<AtomicBool>, goal: SharedGoal) {
    while run.load(Ordering::Relaxed) {
        let (stream, addr) = match listener.accept() {
            Ok(c) => c,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(e) => {
                warn!("Goal listener accept error: {}", e);
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
        };

        // One payload per connection, the stream is dropped (closed) as
        // soon as it has been handled
        match read_payload(stream) {
            Ok(payload) => match parse_goal(&payload) {
                Ok(coords) => {
                    let new_goal = Vector3::new(coords[0], coords[1], coords[2]);

                    // Swap the whole vector in one go so the control loop
                    // never sees a partially updated goal
                    {
                        let mut g = goal.lock().expect("GoalServer: goal mutex poisoned");
                        *g = new_goal;
                    }

                    info!(
                        "New goal from {}: ({:.4}, {:.4}, {:.4})",
                        addr, new_goal[0], new_goal[1], new_goal[2]
                    );
                }
                Err(e) => {
                    // Malformed payloads never mutate the goal
                    warn!("Rejected goal payload from {}: {}", addr, e);
                }
            },
            Err(e) => {
                warn!("Could not read goal payload from {}: {}", addr, e);
            }
        }
    }
}

/// Read a single payload from an accepted connection.
fn read_payload(mut stream: TcpStream) -> Result<String, std::io::Error> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut buf = [0u8; MAX_PAYLOAD_BYTES];
    let num_bytes = stream.read(&mut buf)?;

    match std::str::from_utf8(&buf[..num_bytes]) {
        Ok(s) => Ok(String::from(s.trim())),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "payload is not valid UTF-8",
        )),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use std::time::Instant;

    /// Start a server on an ephemeral port and return it with its goal.
    fn start_test_server() -> (GoalServer, SharedGoal) {
        let params = NetParams {
            sim_endpoint: String::from("tcp://localhost:19999"),
            goal_bind_addr: String::from("127.0.0.1:0"),
        };
        let goal: SharedGoal = Arc::new(Mutex::new(Vector3::new(0.3, 0.0, 0.4)));
        let server = GoalServer::start(&params, goal.clone()).unwrap();
        (server, goal)
    }

    /// Send one payload to the server over a real TCP connection.
    fn send_payload(addr: std::net::SocketAddr, payload: &str) {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(payload.as_bytes()).unwrap();
    }

    /// Wait until the goal matches `expected`, or panic after a deadline.
    fn wait_for_goal(goal: &SharedGoal, expected: Vector3<f64>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if *goal.lock().unwrap() == expected {
                return;
            }
            assert!(Instant::now() < deadline, "goal never reached {:?}", expected);
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_valid_update_swaps_goal() {
        let (server, goal) = start_test_server();

        send_payload(server.local_addr(), "0.3 0.2 0.4");
        wait_for_goal(&goal, Vector3::new(0.3, 0.2, 0.4));

        server.stop();
    }

    #[test]
    fn test_malformed_payloads_ignored() {
        let (server, goal) = start_test_server();
        let initial = *goal.lock().unwrap();

        send_payload(server.local_addr(), "0.1 0.2");
        send_payload(server.local_addr(), "1 2 3 4");
        send_payload(server.local_addr(), "a b c");

        // A valid update afterwards proves the earlier ones were processed
        // and dropped rather than still queued
        send_payload(server.local_addr(), "0.5 0.6 0.7");
        wait_for_goal(&goal, Vector3::new(0.5, 0.6, 0.7));

        assert_ne!(initial, Vector3::new(0.5, 0.6, 0.7));
        server.stop();
    }

    #[test]
    fn test_stop_is_bounded() {
        let (server, _goal) = start_test_server();

        let start = Instant::now();
        server.stop();

        // Poll interval plus margin
        assert!(Instant::now() - start < Duration::from_secs(3));
    }
}
