use std::fmt;

use thiserror::Error;

/// Which part of the echo handshake did not happen in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    /// Echo still high from the previous ping.
    Settle,
    Rising,
    Falling,
}

impl fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EchoEdge::Settle => "settle",
            EchoEdge::Rising => "rising edge",
            EchoEdge::Falling => "falling edge",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoverError {
    #[error("sensor timeout waiting for echo {edge}")]
    SensorTimeout { edge: EchoEdge },
    #[error("pin i/o failure: {0}")]
    PinIo(String),
    #[error("initialization failure: {0}")]
    Initialization(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RoverError>;
