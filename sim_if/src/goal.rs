//! # Goal update wire format
//!
//! Goal updates travel as a single plain-text payload of three
//! whitespace-separated decimal numbers (`"x y z"`), one TCP connection per
//! update, with no length prefix and no acknowledgement beyond delivery.
//! Both ends of the link validate payloads with the parser defined here, so
//! that a payload the client would refuse to send is also one the server
//! would refuse to apply.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of coordinates in a goal payload
pub const NUM_GOAL_COORDS: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised while parsing a goal payload.
#[derive(Debug, Error, PartialEq)]
pub enum GoalParseError {
    #[error("Expected {NUM_GOAL_COORDS} coordinates in the payload, found {0}")]
    WrongTokenCount(usize),

    #[error("Could not parse \"{0}\" as a coordinate")]
    InvalidCoord(String),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a goal payload into its three coordinates.
///
/// The payload must contain exactly three whitespace-separated decimal
/// numbers. Anything else is rejected without producing a partial result.
pub fn parse_goal(payload: &str) -> Result<[f64; NUM_GOAL_COORDS], GoalParseError> {
    let tokens: Vec<&str> = payload.split_whitespace().collect();

    if tokens.len() != NUM_GOAL_COORDS {
        return Err(GoalParseError::WrongTokenCount(tokens.len()));
    }

    let mut coords = [0.0; NUM_GOAL_COORDS];

    for (i, token) in tokens.iter().enumerate() {
        coords[i] = token
            .parse()
            .map_err(|_| GoalParseError::InvalidCoord(String::from(*token)))?;
    }

    Ok(coords)
}

/// Format three coordinates as a goal payload.
pub fn format_goal(coords: &[f64; NUM_GOAL_COORDS]) -> String {
    format!("{} {} {}", coords[0], coords[1], coords[2])
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_payloads() {
        assert_eq!(parse_goal("0.3 0.2 0.4"), Ok([0.3, 0.2, 0.4]));
        assert_eq!(parse_goal("  -0.1\t2 3e-2 "), Ok([-0.1, 2.0, 0.03]));
    }

    #[test]
    fn test_wrong_token_count() {
        assert_eq!(parse_goal(""), Err(GoalParseError::WrongTokenCount(0)));
        assert_eq!(parse_goal("1 2"), Err(GoalParseError::WrongTokenCount(2)));
        assert_eq!(
            parse_goal("1 2 3 4"),
            Err(GoalParseError::WrongTokenCount(4))
        );
    }

    #[test]
    fn test_non_numeric() {
        assert_eq!(
            parse_goal("1 two 3"),
            Err(GoalParseError::InvalidCoord(String::from("two")))
        );
        assert!(parse_goal("x y z").is_err());
    }

    #[test]
    fn test_round_trip() {
        let coords = [0.3, -0.2, 0.4];
        assert_eq!(parse_goal(&format_goal(&coords)), Ok(coords));
    }
}
