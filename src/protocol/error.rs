//! Protocol error types

use thiserror::Error;

use crate::transport::TransportError;

/// Protocol and configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// Bit-field layout does not fit the 64-bit data word
    #[error("invalid protocol layout: {0}")]
    InvalidLayout(String),

    /// User command could not be encoded
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// Transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a free-text command is rejected before anything is transmitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No command family matches the text
    #[error("unable to interpret command {0:?}")]
    Unrecognized(String),

    /// The numeric argument is missing or out of the signed 32-bit range
    #[error("malformed value {0:?}: expected a signed 32-bit decimal")]
    MalformedValue(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
