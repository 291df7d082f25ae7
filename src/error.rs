//! Error types for the simulator.
//!
//! Simulated hardware faults (SEGV, SEGPROT) are not errors: they are events
//! of the model. Everything here is a contract violation caught before or at
//! the edge of the core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed input or random-number file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected {what}")]
    Missing { line: usize, what: &'static str },

    #[error("line {line}: invalid {what}: {token}")]
    InvalidToken {
        line: usize,
        what: &'static str,
        token: String,
    },

    #[error("line {line}: virtual page {vpage} exceeds max {max}")]
    VpageOutOfRange { line: usize, vpage: usize, max: usize },

    #[error("line {line}: VMA [{start}, {end}] is inverted")]
    InvertedVma { line: usize, start: usize, end: usize },

    #[error("line {line}: VMA [{start}, {end}] overlaps a previous VMA")]
    OverlappingVma { line: usize, start: usize, end: usize },

    #[error("line {line}: process {pid} does not exist ({count} processes)")]
    UnknownProcess { line: usize, pid: usize, count: usize },

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("random file declares {declared} values but holds none")]
    EmptyRandomFile { declared: usize },
}

/// Invalid run configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown replacement algorithm: <{0}>")]
    UnknownAlgorithm(char),

    #[error("unknown output option: <{0}>")]
    UnknownOutputOption(char),

    #[error("frame count {0} outside 1..={max}", max = crate::constants::MAX_FRAMES)]
    FrameCount(usize),

    #[error("random algorithm requires a random file")]
    MissingRandomFile,
}

/// Instruction the dispatcher refuses to delegate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("process {pid} does not exist ({count} processes)")]
    UnknownProcess { pid: usize, count: usize },

    #[error("virtual page {0} exceeds address space")]
    VpageOutOfRange(usize),
}

/// Umbrella error for library consumers
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("cannot write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
