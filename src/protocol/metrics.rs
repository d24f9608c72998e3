use std::sync::atomic::{AtomicU64, Ordering};

use super::FunctionCode;

/// Track link and decoder counters without external dependencies.
pub(crate) struct Metrics;

static VALID_FRAMES: AtomicU64 = AtomicU64::new(0);
static INVALID_FRAMES: AtomicU64 = AtomicU64::new(0);
static DISCARDED_BYTES: AtomicU64 = AtomicU64::new(0);
static SENT_FRAMES: AtomicU64 = AtomicU64::new(0);
static IO_ERRORS: AtomicU64 = AtomicU64::new(0);
static PROTOCOL_WARNINGS: AtomicU64 = AtomicU64::new(0);
static REJECTED_COMMANDS: AtomicU64 = AtomicU64::new(0);
static OVERDUE_FRAMES: AtomicU64 = AtomicU64::new(0);
static UNKNOWN_FUNCTIONS: AtomicU64 = AtomicU64::new(0);

struct FunctionCounters {
    nmt: AtomicU64,
    synchronization: AtomicU64,
    warning_code: AtomicU64,
    telemetry_command: AtomicU64,
    heartbeat_ping: AtomicU64,
    heartbeat_pong: AtomicU64,
    transmit_data: AtomicU64,
    heartbeat_response_update: AtomicU64,
    bus_status_update: AtomicU64,
    status_update: AtomicU64,
    error_control: AtomicU64,
}

static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

impl FunctionCounters {
    const fn new() -> Self {
        Self {
            nmt: AtomicU64::new(0),
            synchronization: AtomicU64::new(0),
            warning_code: AtomicU64::new(0),
            telemetry_command: AtomicU64::new(0),
            heartbeat_ping: AtomicU64::new(0),
            heartbeat_pong: AtomicU64::new(0),
            transmit_data: AtomicU64::new(0),
            heartbeat_response_update: AtomicU64::new(0),
            bus_status_update: AtomicU64::new(0),
            status_update: AtomicU64::new(0),
            error_control: AtomicU64::new(0),
        }
    }

    fn counter(&self, function: FunctionCode) -> &AtomicU64 {
        use FunctionCode::*;

        match function {
            Nmt => &self.nmt,
            Synchronization => &self.synchronization,
            WarningCode => &self.warning_code,
            TelemetryCommand => &self.telemetry_command,
            HeartbeatPing => &self.heartbeat_ping,
            HeartbeatPong => &self.heartbeat_pong,
            TransmitData => &self.transmit_data,
            HeartbeatResponseUpdate => &self.heartbeat_response_update,
            BusStatusUpdate => &self.bus_status_update,
            StatusUpdate => &self.status_update,
            ErrorControl => &self.error_control,
        }
    }
}

impl Metrics {
    #[inline]
    pub(crate) fn record_valid_frame() {
        VALID_FRAMES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_invalid_frame() {
        INVALID_FRAMES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_discarded(bytes: usize) {
        DISCARDED_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_sent_frame() {
        SENT_FRAMES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_io_error() {
        IO_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_protocol_warning() {
        PROTOCOL_WARNINGS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected_command() {
        REJECTED_COMMANDS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overdue_frame() {
        OVERDUE_FRAMES.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_function(function: Option<FunctionCode>) {
        match function {
            Some(function) => {
                FUNCTION_COUNTERS
                    .counter(function)
                    .fetch_add(1, Ordering::Relaxed);
            }
            None => {
                UNKNOWN_FUNCTIONS.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            valid_frames: VALID_FRAMES.load(Ordering::Relaxed),
            invalid_frames: INVALID_FRAMES.load(Ordering::Relaxed),
            discarded_bytes: DISCARDED_BYTES.load(Ordering::Relaxed),
            sent_frames: SENT_FRAMES.load(Ordering::Relaxed),
            io_errors: IO_ERRORS.load(Ordering::Relaxed),
            protocol_warnings: PROTOCOL_WARNINGS.load(Ordering::Relaxed),
            rejected_commands: REJECTED_COMMANDS.load(Ordering::Relaxed),
            overdue_frames: OVERDUE_FRAMES.load(Ordering::Relaxed),
            nmt_messages: FUNCTION_COUNTERS.nmt.load(Ordering::Relaxed),
            synchronization_messages: FUNCTION_COUNTERS.synchronization.load(Ordering::Relaxed),
            warning_code_messages: FUNCTION_COUNTERS.warning_code.load(Ordering::Relaxed),
            telemetry_command_messages: FUNCTION_COUNTERS
                .telemetry_command
                .load(Ordering::Relaxed),
            heartbeat_pings: FUNCTION_COUNTERS.heartbeat_ping.load(Ordering::Relaxed),
            heartbeat_pongs: FUNCTION_COUNTERS.heartbeat_pong.load(Ordering::Relaxed),
            transmit_data_messages: FUNCTION_COUNTERS.transmit_data.load(Ordering::Relaxed),
            heartbeat_response_updates: FUNCTION_COUNTERS
                .heartbeat_response_update
                .load(Ordering::Relaxed),
            bus_status_updates: FUNCTION_COUNTERS
                .bus_status_update
                .load(Ordering::Relaxed),
            status_updates: FUNCTION_COUNTERS.status_update.load(Ordering::Relaxed),
            error_control_messages: FUNCTION_COUNTERS.error_control.load(Ordering::Relaxed),
            unknown_functions: UNKNOWN_FUNCTIONS.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the process-wide link counters.
pub fn snapshot() -> MetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of link and decoder counters.
#[derive(Default, Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub valid_frames: u64,
    pub invalid_frames: u64,
    pub discarded_bytes: u64,
    pub sent_frames: u64,
    pub io_errors: u64,
    pub protocol_warnings: u64,
    pub rejected_commands: u64,
    pub overdue_frames: u64,
    pub nmt_messages: u64,
    pub synchronization_messages: u64,
    pub warning_code_messages: u64,
    pub telemetry_command_messages: u64,
    pub heartbeat_pings: u64,
    pub heartbeat_pongs: u64,
    pub transmit_data_messages: u64,
    pub heartbeat_response_updates: u64,
    pub bus_status_updates: u64,
    pub status_updates: u64,
    pub error_control_messages: u64,
    pub unknown_functions: u64,
}

impl MetricsSnapshot {
    /// Messages decoded with `function`.
    #[must_use]
    pub const fn messages(&self, function: FunctionCode) -> u64 {
        match function {
            FunctionCode::Nmt => self.nmt_messages,
            FunctionCode::Synchronization => self.synchronization_messages,
            FunctionCode::WarningCode => self.warning_code_messages,
            FunctionCode::TelemetryCommand => self.telemetry_command_messages,
            FunctionCode::HeartbeatPing => self.heartbeat_pings,
            FunctionCode::HeartbeatPong => self.heartbeat_pongs,
            FunctionCode::TransmitData => self.transmit_data_messages,
            FunctionCode::HeartbeatResponseUpdate => self.heartbeat_response_updates,
            FunctionCode::BusStatusUpdate => self.bus_status_updates,
            FunctionCode::StatusUpdate => self.status_updates,
            FunctionCode::ErrorControl => self.error_control_messages,
        }
    }

    /// Fraction of received frames that failed checksum validation.
    #[must_use]
    pub fn invalid_ratio(&self) -> Option<f64> {
        let total = self.valid_frames + self.invalid_frames;
        if total == 0 {
            return None;
        }
        Some(self.invalid_frames as f64 / total as f64)
    }
}
