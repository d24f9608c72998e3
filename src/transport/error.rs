//! Transport-level error types covering port, I/O and reader lifecycle failures.

use core::fmt;
use std::io;

/// Unified error type for serial link operations.
#[derive(Debug)]
pub enum TransportError {
    /// The serial port could not be opened or configured.
    Open {
        /// Port name as given by the caller.
        port: String,
        /// Underlying cause.
        source: io::Error,
    },
    /// Mid-stream read or write failure.
    Io(io::Error),
    /// A reader thread is already running for this bridge.
    AlreadyRunning,
    /// The bridge has been closed.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { port, source } => write!(f, "failed to open port {port}: {source}"),
            Self::Io(err) => write!(f, "link I/O error: {err}"),
            Self::AlreadyRunning => write!(f, "reader already running"),
            Self::Closed => write!(f, "link closed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::AlreadyRunning | Self::Closed => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
