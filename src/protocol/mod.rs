//! Link protocol core
//!
//! This module provides the wire format, identifier decomposition, bit-field layout and
//! symbolic tables used to interpret CAN-style messages carried over the serial link.

mod checksum;
mod codec;
mod command;
mod error;
mod identifier;
mod layout;
pub(crate) mod metrics;
mod tables;
mod types;

pub use checksum::internet_checksum;
pub use codec::{InboundPayload, RawMessage, encode_outbound, pad_payload};
pub use command::{UPDATE_VALUE_COMMAND, encode_command};
pub use error::{CommandError, Error, Result};
pub use identifier::CanIdentifier;
pub use layout::{HeartbeatLayout, ProtocolLayout, WarningLayout, extract_bits};
pub use metrics::{MetricsSnapshot, snapshot as metrics_snapshot};
pub use tables::{CodeTable, FlagTable, ProtocolTables};
pub use types::FunctionCode;

/// Start-of-frame marker preceding every frame in both directions.
pub const SOF: u8 = 0xFF;

/// Checksum field size in bytes.
pub const CHECKSUM_SIZE: usize = 2;

/// Inbound payload size: 32-bit identifier followed by 64-bit data.
pub const INBOUND_PAYLOAD_SIZE: usize = 12;

/// Outbound payload size: 64-bit data only, the receiving node supplies its own id.
pub const OUTBOUND_PAYLOAD_SIZE: usize = 8;

/// Total inbound frame size (SOF + checksum + payload).
pub const INBOUND_FRAME_SIZE: usize = 1 + CHECKSUM_SIZE + INBOUND_PAYLOAD_SIZE;

/// Total outbound frame size (SOF + checksum + payload).
pub const OUTBOUND_FRAME_SIZE: usize = 1 + CHECKSUM_SIZE + OUTBOUND_PAYLOAD_SIZE;
