//! Function codes carried in the identifier

use std::fmt;

/// Sub-protocol selected by the 4-bit function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// CANopen network management
    Nmt = 0x0,
    /// CANopen synchronization
    Synchronization = 0x1,
    /// Warning raised by the vitals node about another node's data
    WarningCode = 0x2,
    /// Response to a command sent from the ground station
    TelemetryCommand = 0x3,
    /// Heartbeat ping broadcast by the vitals node
    HeartbeatPing = 0x4,
    /// Heartbeat pong answered by a node
    HeartbeatPong = 0x5,
    /// Sensor data frame
    TransmitData = 0x6,
    /// Heartbeat status/timing summary
    HeartbeatResponseUpdate = 0x7,
    /// Bus controller status from the vitals node
    BusStatusUpdate = 0x8,
    /// Enumerated node status update
    StatusUpdate = 0x9,
    /// CANopen error control
    ErrorControl = 0xE,
}

impl FunctionCode {
    /// Convert from the raw 4-bit code
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Nmt),
            0x1 => Some(Self::Synchronization),
            0x2 => Some(Self::WarningCode),
            0x3 => Some(Self::TelemetryCommand),
            0x4 => Some(Self::HeartbeatPing),
            0x5 => Some(Self::HeartbeatPong),
            0x6 => Some(Self::TransmitData),
            0x7 => Some(Self::HeartbeatResponseUpdate),
            0x8 => Some(Self::BusStatusUpdate),
            0x9 => Some(Self::StatusUpdate),
            0xE => Some(Self::ErrorControl),
            _ => None,
        }
    }

    /// Convert to the raw code
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nmt => "NMT",
            Self::Synchronization => "Synchronization",
            Self::WarningCode => "WarningCode",
            Self::TelemetryCommand => "TelemetryCommand",
            Self::HeartbeatPing => "HeartbeatPing",
            Self::HeartbeatPong => "HeartbeatPong",
            Self::TransmitData => "TransmitData",
            Self::HeartbeatResponseUpdate => "HeartbeatResponseUpdate",
            Self::BusStatusUpdate => "BusStatusUpdate",
            Self::StatusUpdate => "StatusUpdate",
            Self::ErrorControl => "ErrorControl",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_code_roundtrip() {
        for raw in 0u8..16 {
            if let Some(code) = FunctionCode::from_u8(raw) {
                assert_eq!(code.as_u8(), raw);
            }
        }
    }

    #[test]
    fn test_unassigned_codes() {
        for raw in [0xA, 0xB, 0xC, 0xD, 0xF] {
            assert!(FunctionCode::from_u8(raw).is_none());
        }
    }
}
