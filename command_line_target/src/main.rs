//! Terminal client for entering goal positions.
//!
//! Reads `x y z` coordinate triples from an interactive prompt and delivers
//! each one to the arm exec's goal server over a fresh TCP connection. The
//! payload is validated locally with the same parser the server uses, so a
//! payload this client sends is one the server will accept.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::eyre, eyre::WrapErr, Report};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use structopt::StructOpt;

use sim_if::goal::{format_goal, parse_goal};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "Target $ ";

/// Timeout for connecting to the goal server and writing the payload.
const SEND_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(
    name = "command_line_target",
    about = "Sends goal positions to the arm exec's goal server"
)]
struct Opt {
    /// Address of the arm exec's goal server
    #[structopt(short, long, default_value = "127.0.0.1:5555")]
    addr: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    let addr: SocketAddr = opt
        .addr
        .to_socket_addrs()
        .wrap_err("Could not parse the goal server address")?
        .next()
        .ok_or_else(|| eyre!("The goal server address resolved to nothing"))?;

    println!("Goal entry client, sending to {}", addr);
    println!("Enter coordinates as \"x y z\" (e.g. 0.3 0.2 0.4), or q to quit");
    println!();

    let mut rl = DefaultEditor::new().wrap_err("Could not create the line editor")?;

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled error: {:?}", e);
                break;
            }
        };

        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("q") {
            break;
        }

        rl.add_history_entry(line).ok();

        // Validate before sending, a payload the server would reject is
        // not worth a connection
        let coords = match parse_goal(line) {
            Ok(c) => c,
            Err(e) => {
                println!("Invalid input: {}", e);
                continue;
            }
        };

        match send_goal(&addr, &coords) {
            Ok(()) => println!(
                "Sent goal ({}, {}, {})",
                coords[0], coords[1], coords[2]
            ),
            Err(ref e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                println!("Connection refused, is the arm exec running?")
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                println!("Timed out talking to the goal server")
            }
            Err(e) => println!("Could not send the goal: {}", e),
        }
    }

    println!("Exiting...");

    Ok(())
}

/// Deliver one goal payload over a fresh connection.
fn send_goal(addr: &SocketAddr, coords: &[f64; 3]) -> std::io::Result<()> {
    let mut stream = TcpStream::connect_timeout(addr, SEND_TIMEOUT)?;
    stream.set_write_timeout(Some(SEND_TIMEOUT))?;

    stream.write_all(format_goal(coords).as_bytes())
}
