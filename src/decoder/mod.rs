//! Message decoder
//!
//! Dispatches validated messages on their function code and turns each sub-format into
//! samples, status events and liveness updates. Protocol faults never escape as errors:
//! every malformed message or lookup failure becomes a warning event and decoding moves on.

mod bus_status;
mod enum_flag;
mod heartbeat;
mod slots;
mod transmit;
mod warning;

use std::sync::Arc;

use tracing::{debug, error, warn};

pub use bus_status::BusStatus;
pub use slots::{SlotKey, StatusSlots};

use crate::monitor::{FrameTimers, HeartbeatWindow};
use crate::protocol::metrics::Metrics;
use crate::protocol::{
    CanIdentifier, CommandError, FunctionCode, InboundPayload, OUTBOUND_PAYLOAD_SIZE,
    ProtocolLayout, ProtocolTables, RawMessage, Result, encode_command,
};
use crate::registry::MetadataRegistry;
use crate::sink::{Channel, Severity, Sinks};
use crate::transport::FrameHandler;

/// Decoder for inbound messages and encoder for outbound commands.
pub struct MessageDecoder {
    registry: Arc<dyn MetadataRegistry>,
    sinks: Sinks,
    layout: ProtocolLayout,
    tables: ProtocolTables,
    slots: Arc<StatusSlots>,
    window: Arc<HeartbeatWindow>,
    timers: Arc<FrameTimers>,
}

impl std::fmt::Debug for MessageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDecoder")
            .field("layout", &self.layout)
            .field("window", &self.window)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl MessageDecoder {
    /// Build a decoder, validating the layout and seeding one liveness timer per monitored
    /// frame in the registry.
    pub fn new(
        registry: Arc<dyn MetadataRegistry>,
        sinks: Sinks,
        layout: ProtocolLayout,
        tables: ProtocolTables,
    ) -> Result<Self> {
        if let Err(err) = layout.validate() {
            error!(error = %err, "rejecting protocol layout");
            return Err(err);
        }
        let timers = FrameTimers::seeded(registry.monitored_frames());
        debug!(monitored = timers.len(), "frame timers seeded");
        Ok(Self {
            slots: Arc::new(StatusSlots::new(Arc::clone(&sinks.notifications))),
            window: Arc::new(HeartbeatWindow::new()),
            timers: Arc::new(timers),
            registry,
            sinks,
            layout,
            tables,
        })
    }

    /// Metadata registry
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn MetadataRegistry> {
        &self.registry
    }

    /// Sinks written to
    #[must_use]
    pub fn sinks(&self) -> &Sinks {
        &self.sinks
    }

    /// Persistent status slots
    #[must_use]
    pub fn slots(&self) -> &Arc<StatusSlots> {
        &self.slots
    }

    /// Current heartbeat pong window
    #[must_use]
    pub fn window(&self) -> &Arc<HeartbeatWindow> {
        &self.window
    }

    /// Frame liveness timers
    #[must_use]
    pub fn timers(&self) -> &Arc<FrameTimers> {
        &self.timers
    }

    /// Decode a validated 12-byte payload.
    pub fn decode_payload(&self, payload: &InboundPayload) {
        let msg = RawMessage::from_payload(payload);
        self.decode(msg.id, msg.data);
    }

    /// Dispatch one message on its function code.
    pub fn decode(&self, id: u32, data: u64) {
        let ident = CanIdentifier::from_raw(id);
        let node_id = ident.node_id();
        debug!(
            node = node_id,
            function = ident.function_code(),
            extended = ident.extended_id(),
            data = format_args!("{data:#018x}"),
            "decoding message"
        );

        let function = ident.function();
        Metrics::record_function(function);
        let Some(function) = function else {
            self.fault(format!(
                "Message with unknown function code observed. function code = {}. data = {data:x}",
                ident.function_code()
            ));
            return;
        };

        match function {
            FunctionCode::Nmt => {
                self.telemetry(Severity::Ok, "Received NMT function message".into());
            }
            FunctionCode::Synchronization => {
                self.telemetry(Severity::Ok, "Received synchronization message".into());
            }
            FunctionCode::ErrorControl => {
                self.telemetry(Severity::Ok, "Received error control message".into());
            }
            FunctionCode::HeartbeatPing => {
                self.vitals(Severity::Ok, "Received HB ping message".into());
            }
            FunctionCode::HeartbeatPong => self.decode_pong(node_id),
            FunctionCode::WarningCode => self.decode_warning(data),
            FunctionCode::TelemetryCommand => {
                self.decode_enum_flag(&self.tables.telemetry_command, node_id, data);
            }
            FunctionCode::StatusUpdate => {
                self.decode_enum_flag(&self.tables.status_update, node_id, data);
            }
            FunctionCode::TransmitData => {
                self.decode_transmit(node_id, ident.extended_id(), data);
            }
            FunctionCode::HeartbeatResponseUpdate => self.decode_heartbeat_update(data),
            FunctionCode::BusStatusUpdate => self.decode_bus_status(data),
        }
    }

    /// Diagnostic for a frame that failed checksum validation. Raises no status.
    pub fn log_invalid(&self, payload: &InboundPayload, expected: u16, found: u16) {
        let msg = RawMessage::from_payload(payload);
        debug!(
            ident = %msg.identifier(),
            data = format_args!("{:#018x}", msg.data),
            expected,
            found,
            "invalid frame"
        );
    }

    /// Encode a user command. Rejected text also produces a warning event.
    pub fn encode_command(
        &self,
        text: &str,
    ) -> std::result::Result<[u8; OUTBOUND_PAYLOAD_SIZE], CommandError> {
        encode_command(text).inspect_err(|err| {
            Metrics::record_rejected_command();
            warn!(error = %err, "command rejected");
            self.telemetry(
                Severity::Warning,
                format!("unable to interpret provided user command: {err}"),
            );
        })
    }

    fn decode_pong(&self, node_id: u8) {
        if self.registry.node_name(node_id).is_none() {
            self.fault(format!("Received HB Pong from unknown nodeId={node_id}"));
            return;
        }
        self.window.record(node_id);
    }

    fn node_label(&self, node_id: u8, fallback: impl FnOnce() -> String) -> String {
        self.registry.node_name(node_id).unwrap_or_else(fallback)
    }

    fn telemetry(&self, severity: Severity, text: String) {
        self.sinks
            .notifications
            .post(Channel::Telemetry, severity, text);
    }

    fn vitals(&self, severity: Severity, text: String) {
        self.sinks.notifications.post(Channel::Vitals, severity, text);
    }

    /// Protocol fault: logged, counted and posted as a telemetry warning.
    fn fault(&self, text: String) {
        Metrics::record_protocol_warning();
        warn!(text = %text, "protocol fault");
        self.telemetry(Severity::Warning, text);
    }
}

impl FrameHandler for MessageDecoder {
    fn on_frame(&self, payload: &InboundPayload) {
        self.decode_payload(payload);
    }

    fn on_invalid(&self, payload: &InboundPayload, expected: u16, found: u16) {
        self.log_invalid(payload, expected, found);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{decoder, id, posts};
    use super::*;
    use crate::registry::StaticRegistry;

    #[test]
    fn test_unknown_function_code_warns() {
        let (decoder, events) = decoder(StaticRegistry::default());
        decoder.decode(CanIdentifier::new(3, 0xB, 0).to_raw(), 0xABCD);
        assert_eq!(
            posts(&events),
            vec![(
                Channel::Telemetry,
                Severity::Warning,
                "Message with unknown function code observed. function code = 11. data = abcd"
                    .into()
            )]
        );
    }

    #[test]
    fn test_stateless_messages() {
        let (decoder, events) = decoder(StaticRegistry::default());
        decoder.decode(id(1, FunctionCode::Nmt, 0), 0);
        decoder.decode(id(1, FunctionCode::HeartbeatPing, 0), 0);
        let posted = posts(&events);
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].0, Channel::Telemetry);
        assert_eq!(posted[1].0, Channel::Vitals);
        assert!(posted.iter().all(|(_, severity, _)| *severity == Severity::Ok));
    }

    #[test]
    fn test_pong_from_known_node_is_silent() {
        let registry = StaticRegistry::builder().node(4, "motor").build();
        let (decoder, events) = decoder(registry);
        decoder.decode(id(4, FunctionCode::HeartbeatPong, 0), 0);
        assert!(posts(&events).is_empty());
        assert!(decoder.window().contains(4));

        decoder.decode(id(5, FunctionCode::HeartbeatPong, 0), 0);
        assert!(!decoder.window().contains(5));
        assert_eq!(
            posts(&events)[0].2,
            "Received HB Pong from unknown nodeId=5"
        );
    }

    #[test]
    fn test_rejected_command_warns() {
        let (decoder, events) = decoder(StaticRegistry::default());
        assert_eq!(
            decoder.encode_command("updateValue5"),
            Ok([5, 0, 0, 0, 0, 0, 0, 0])
        );
        assert!(posts(&events).is_empty());

        assert_eq!(
            decoder.encode_command("launch"),
            Err(CommandError::Unrecognized("launch".into()))
        );
        let posted = posts(&events);
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].1, Severity::Warning);
        assert!(posted[0].2.starts_with("unable to interpret provided user command"));
    }

    #[test]
    fn test_invalid_layout_rejected_at_startup() {
        let (queue, _events) = crate::sink::UiQueue::new();
        let mut layout = ProtocolLayout::default();
        layout.heartbeat.page_bits = 32;
        let result = MessageDecoder::new(
            Arc::new(StaticRegistry::default()),
            Sinks::from_queue(Arc::new(queue)),
            layout,
            ProtocolTables::default(),
        );
        assert!(matches!(result, Err(crate::protocol::Error::InvalidLayout(_))));
    }
}
