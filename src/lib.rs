//! telemlink - serial telemetry link for a vehicle ground station
//!
//! A microcontroller bridges a vehicle CAN bus onto a serial line. Every CAN message arrives
//! wrapped in a small checksummed frame; this crate resynchronizes on that stream, decodes
//! the bit-packed payloads into samples and status events, tracks node liveness and sends
//! commands back over the same link.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telemlink::{ProtocolTables, Sinks, Station, StationConfig, StaticRegistry, UiQueue};
//!
//! let registry = StaticRegistry::builder()
//!     .node(1, "vitals")
//!     .node(8, "pedals")
//!     .frame(8, 0, 200)
//!     .build();
//! let (queue, events) = UiQueue::new();
//!
//! let station = Station::open(
//!     &StationConfig::default(),
//!     Arc::new(registry),
//!     Sinks::from_queue(Arc::new(queue)),
//!     ProtocolTables::default(),
//! )?;
//! station.submit_command("updateValue5")?;
//!
//! for event in events.try_iter() {
//!     println!("{event:?}");
//! }
//! # Ok::<(), telemlink::Error>(())
//! ```
//!
//! # Layers
//!
//! - [`protocol`]: wire format, checksum, identifier fields, bit layouts, code tables
//! - [`transport`]: receive ring, framer, link abstraction and the serial bridge
//! - [`decoder`]: per-function-code decoding into sink events
//! - [`monitor`]: heartbeat window and per-frame liveness timers
//! - [`station`]: everything wired together
//!
//! The library installs no `tracing` subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod decoder;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod sink;
pub mod station;
pub mod transport;

pub use decoder::MessageDecoder;
pub use monitor::{FrameTimeoutMonitor, HeartbeatMonitor, MonitorConfig, MonitorHandle};
pub use protocol::{
    CanIdentifier, Error, FunctionCode, INBOUND_FRAME_SIZE, OUTBOUND_FRAME_SIZE, ProtocolLayout,
    ProtocolTables, RawMessage, Result, SOF,
};
pub use registry::{DataInfoMeta, DataKey, FrameKey, FrameMeta, MetadataRegistry, StaticRegistry};
pub use sink::{Channel, DisplaySink, NotificationSink, Severity, Sinks, StatusId, UiEvent, UiQueue};
pub use station::{Station, StationConfig};
pub use transport::{BridgeConfig, SerialBridge, TransportError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
