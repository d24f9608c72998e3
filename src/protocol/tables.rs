//! Symbolic name tables for enumerated codes and flag bitmasks.
//!
//! Each message kind owns one table mapping integer codes to names, plus an explicit
//! classification of which codes are critical or warnings. Tables are built once and
//! shared read-only by the decoder.

use std::collections::HashMap;

use crate::sink::Severity;

/// Integer code -> symbolic name, with per-code severity classification.
#[derive(Debug, Clone)]
pub struct CodeTable {
    kind: &'static str,
    names: HashMap<i32, &'static str>,
    severities: HashMap<i32, Severity>,
}

impl CodeTable {
    /// Create an empty table for the named message kind
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: HashMap::new(),
            severities: HashMap::new(),
        }
    }

    /// Add a code classified as OK
    #[must_use]
    pub fn with(mut self, code: i32, name: &'static str) -> Self {
        self.names.insert(code, name);
        self
    }

    /// Add a code with an explicit severity
    #[must_use]
    pub fn with_severity(mut self, code: i32, name: &'static str, severity: Severity) -> Self {
        self.names.insert(code, name);
        if severity == Severity::Ok {
            self.severities.remove(&code);
        } else {
            self.severities.insert(code, severity);
        }
        self
    }

    /// Message kind this table describes
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Symbolic name for `code`
    #[must_use]
    pub fn name(&self, code: i32) -> Option<&'static str> {
        self.names.get(&code).copied()
    }

    /// Severity class of `code`: critical set, warning set, otherwise OK
    #[must_use]
    pub fn severity(&self, code: i32) -> Severity {
        self.severities.get(&code).copied().unwrap_or(Severity::Ok)
    }
}

/// Single-bit flag masks -> names, kept in bit order.
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: Vec<(u32, &'static str)>,
}

impl FlagTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named flag mask
    #[must_use]
    pub fn with(mut self, mask: u32, name: &'static str) -> Self {
        self.flags.push((mask, name));
        self.flags.sort_by_key(|(mask, _)| *mask);
        self
    }

    /// Comma-separated names of every flag present in `value`
    #[must_use]
    pub fn describe(&self, value: u32) -> String {
        let names: Vec<&str> = self
            .flags
            .iter()
            .filter(|(mask, _)| value & mask != 0)
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            "no flags set".to_string()
        } else {
            names.join(", ")
        }
    }
}

/// All symbolic tables used by the decoder.
#[derive(Debug, Clone)]
pub struct ProtocolTables {
    /// Responses to commands sent from the ground station
    pub telemetry_command: CodeTable,
    /// Enumerated node status updates
    pub status_update: CodeTable,
    /// Warning-code flag bits
    pub warning_flags: FlagTable,
    /// Bus controller states
    pub bus_state: CodeTable,
    /// Bus state code meaning the controller is running normally
    pub bus_state_running: u8,
}

impl Default for ProtocolTables {
    /// Placeholder names for bench and demo use.
    ///
    /// A deployment should build its own tables from the vehicle's code definitions and pass
    /// them to [`MessageDecoder::new`](crate::decoder::MessageDecoder::new).
    fn default() -> Self {
        Self {
            telemetry_command: CodeTable::new("telemetryCommand")
                .with(0, "ack")
                .with(1, "valueUpdated")
                .with(2, "enablePrecharge")
                .with_severity(3, "disablePrecharge", Severity::Critical)
                .with_severity(4, "commandRejected", Severity::Warning),
            status_update: CodeTable::new("statusUpdate")
                .with(0, "nominal")
                .with(1, "prechargeOn")
                .with_severity(2, "prechargeOff", Severity::Critical)
                .with_severity(3, "lowPowerMode", Severity::Warning),
            warning_flags: FlagTable::new()
                .with(1 << 0, "critical")
                .with(1 << 1, "nonCritical")
                .with(1 << 2, "latched")
                .with(1 << 3, "valueAboveMax")
                .with(1 << 4, "valueBelowMin")
                .with(1 << 5, "frameMissing")
                .with(1 << 6, "nodeReset")
                .with(1 << 7, "busFault")
                .with(1 << 8, "sensorFault"),
            bus_state: CodeTable::new("busState")
                .with(0, "stopped")
                .with(1, "running")
                .with(2, "busOff")
                .with(3, "recovering"),
            bus_state_running: 1,
        }
    }
}
