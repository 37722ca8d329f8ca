//! Error types for instance loading and solution validation.

use std::fmt;
use std::io;

/// Errors raised while loading instances or parameter files.
#[derive(Debug)]
pub enum AcoError {
    Io(io::Error),
    Json(serde_json::Error),
    /// A malformed instance file, with the offending line when known.
    Parse { line: Option<usize>, message: String },
}

/// A type alias for results carrying an `AcoError`.
pub type AcoResult<T> = Result<T, AcoError>;

impl AcoError {
    pub fn parse(line: Option<usize>, message: impl Into<String>) -> Self {
        AcoError::Parse {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for AcoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcoError::Io(err) => write!(f, "io error: {}", err),
            AcoError::Json(err) => write!(f, "json error: {}", err),
            AcoError::Parse {
                line: Some(line),
                message,
            } => write!(f, "parse error at line {}: {}", line, message),
            AcoError::Parse { line: None, message } => write!(f, "parse error: {}", message),
        }
    }
}

impl std::error::Error for AcoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcoError::Io(err) => Some(err),
            AcoError::Json(err) => Some(err),
            AcoError::Parse { .. } => None,
        }
    }
}

impl From<io::Error> for AcoError {
    fn from(err: io::Error) -> Self {
        AcoError::Io(err)
    }
}

impl From<serde_json::Error> for AcoError {
    fn from(err: serde_json::Error) -> Self {
        AcoError::Json(err)
    }
}

/// A broken solution invariant found by `Solution::validate`.
#[derive(Debug, Clone, PartialEq)]
pub enum SolutionError {
    /// The tour does not start and end at the depot.
    MissingDepot,
    /// Two consecutive depot visits.
    EmptyRoute { position: usize },
    UnknownNode { node: usize, position: usize },
    DuplicateNode { node: usize, position: usize },
    UnvisitedNode { node: usize },
    CapacityExceeded { route: usize, load: u64, capacity: u64 },
    DistanceExceeded { route: usize, distance: f64, limit: f64 },
}

impl fmt::Display for SolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionError::MissingDepot => write!(f, "tour must start and end at the depot"),
            SolutionError::EmptyRoute { position } => {
                write!(f, "empty route ending at position {}", position)
            }
            SolutionError::UnknownNode { node, position } => {
                write!(f, "unknown node {} at position {}", node, position)
            }
            SolutionError::DuplicateNode { node, position } => {
                write!(f, "node {} visited twice (last at position {})", node, position)
            }
            SolutionError::UnvisitedNode { node } => write!(f, "node {} is never visited", node),
            SolutionError::CapacityExceeded {
                route,
                load,
                capacity,
            } => write!(
                f,
                "route {} exceeds capacity: load {} > {}",
                route, load, capacity
            ),
            SolutionError::DistanceExceeded {
                route,
                distance,
                limit,
            } => write!(
                f,
                "route {} exceeds distance limit: {:.2} > {:.2}",
                route, distance, limit
            ),
        }
    }
}

impl std::error::Error for SolutionError {}
