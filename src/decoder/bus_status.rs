//! Bus controller status updates.
//!
//! ```text
//!  bit  0  2        10       18         30        40        50        60    64
//!      [st][tx_err ][rx_err ][bus_err Δ][tx_fail Δ][rx_over Δ][rx_miss Δ][to_rx]
//!        2     8        8        12         10        10        10        4
//! ```

use super::{MessageDecoder, SlotKey};
use crate::protocol::{CodeTable, extract_bits};
use crate::sink::{Channel, Severity};

const CRITICAL_ERROR_COUNT: u32 = 200;
const CRITICAL_DELTA: u32 = 10;
const WARNING_ERROR_COUNT: u32 = 100;
const WARNING_PENDING_RX: u32 = 4;

/// Decoded bus status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct BusStatus {
    pub state: u8,
    pub tx_error: u32,
    pub rx_error: u32,
    pub bus_error_delta: u32,
    pub tx_fail_delta: u32,
    pub rx_overrun_delta: u32,
    pub rx_missed_delta: u32,
    pub pending_rx: u32,
}

impl BusStatus {
    /// Unpack the eight consecutive fields.
    #[must_use]
    pub fn from_data(data: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)] // every field is at most 12 bits
        let field = |offset, width| extract_bits(data, offset, width) as u32;
        Self {
            state: u8::try_from(field(0, 2)).unwrap_or(u8::MAX),
            tx_error: field(2, 8),
            rx_error: field(10, 8),
            bus_error_delta: field(18, 12),
            tx_fail_delta: field(30, 10),
            rx_overrun_delta: field(40, 10),
            rx_missed_delta: field(50, 10),
            pending_rx: field(60, 4),
        }
    }

    /// Classify against fixed thresholds. `running` is the state code of a healthy controller.
    #[must_use]
    pub fn severity(&self, running: u8) -> Severity {
        let error_max = self.tx_error.max(self.rx_error).max(self.bus_error_delta);
        let delta_max = self
            .tx_fail_delta
            .max(self.rx_overrun_delta)
            .max(self.rx_missed_delta);

        if error_max > CRITICAL_ERROR_COUNT || delta_max > CRITICAL_DELTA {
            Severity::Critical
        } else if self.state != running
            || error_max > WARNING_ERROR_COUNT
            || delta_max > 0
            || self.pending_rx > WARNING_PENDING_RX
        {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    /// One-line summary with the state resolved through `states`.
    #[must_use]
    pub fn describe(&self, states: &CodeTable) -> String {
        let state = states
            .name(i32::from(self.state))
            .map_or_else(|| format!("unknown state {}", self.state), str::to_string);
        format!(
            "bus: state={state}, txErr={}, rxErr={}, busErrΔ={}, txFailΔ={}, rxOverΔ={}, rxMissΔ={}, toRx={}",
            self.tx_error,
            self.rx_error,
            self.bus_error_delta,
            self.tx_fail_delta,
            self.rx_overrun_delta,
            self.rx_missed_delta,
            self.pending_rx
        )
    }
}

impl MessageDecoder {
    pub(super) fn decode_bus_status(&self, data: u64) {
        let status = BusStatus::from_data(data);
        let severity = status.severity(self.tables.bus_state_running);
        let text = status.describe(&self.tables.bus_state);
        self.slots
            .upsert(SlotKey::BusStatus, Channel::Vitals, severity, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::test_support::{decoder, id, posts};
    use crate::protocol::{FunctionCode, ProtocolTables};
    use crate::registry::StaticRegistry;

    const RUNNING: u8 = 1;

    fn running() -> BusStatus {
        BusStatus {
            state: RUNNING,
            ..BusStatus::default()
        }
    }

    #[test]
    fn test_field_unpacking() {
        let data = 1
            | 3 << 2
            | 4 << 10
            | 0xABC << 18
            | 0x3FF << 30
            | 6 << 40
            | 7 << 50
            | 0xF << 60;
        assert_eq!(
            BusStatus::from_data(data),
            BusStatus {
                state: 1,
                tx_error: 3,
                rx_error: 4,
                bus_error_delta: 0xABC,
                tx_fail_delta: 0x3FF,
                rx_overrun_delta: 6,
                rx_missed_delta: 7,
                pending_rx: 0xF,
            }
        );
    }

    #[test]
    fn test_error_count_thresholds() {
        let critical = BusStatus {
            tx_error: 250,
            ..running()
        };
        assert_eq!(critical.severity(RUNNING), Severity::Critical);

        let warning = BusStatus {
            tx_error: 150,
            ..running()
        };
        assert_eq!(warning.severity(RUNNING), Severity::Warning);

        assert_eq!(running().severity(RUNNING), Severity::Ok);
    }

    #[test]
    fn test_delta_and_state_thresholds() {
        let dropped = BusStatus {
            rx_missed_delta: 11,
            ..running()
        };
        assert_eq!(dropped.severity(RUNNING), Severity::Critical);

        let one_drop = BusStatus {
            tx_fail_delta: 1,
            ..running()
        };
        assert_eq!(one_drop.severity(RUNNING), Severity::Warning);

        let backlog = BusStatus {
            pending_rx: 5,
            ..running()
        };
        assert_eq!(backlog.severity(RUNNING), Severity::Warning);

        assert_eq!(BusStatus::default().severity(RUNNING), Severity::Warning);
    }

    #[test]
    fn test_describe() {
        let tables = ProtocolTables::default();
        assert_eq!(
            running().describe(&tables.bus_state),
            "bus: state=running, txErr=0, rxErr=0, busErrΔ=0, txFailΔ=0, rxOverΔ=0, rxMissΔ=0, toRx=0"
        );
    }

    #[test]
    fn test_decoded_into_persistent_slot() {
        let (decoder, events) = decoder(StaticRegistry::default());
        decoder.decode(id(1, FunctionCode::BusStatusUpdate, 0), 250 << 2 | 1);
        let posted = posts(&events);
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, Channel::Vitals);
        assert_eq!(posted[0].1, Severity::Critical);
        assert!(decoder.slots().get(SlotKey::BusStatus).is_some());

        decoder.decode(id(1, FunctionCode::BusStatusUpdate, 0), 1);
        assert!(posts(&events).is_empty());
    }
}
