//! Ground station facade
//!
//! Wires a [`SerialBridge`], a [`MessageDecoder`] and the liveness monitors together.
//! Frames flow from the bridge's reader thread straight into the decoder; commands flow
//! from [`Station::submit_command`] through the encoder and out over the bridge.

use std::sync::Arc;

use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::decoder::MessageDecoder;
use crate::monitor::{MonitorConfig, MonitorHandle};
use crate::protocol::{ProtocolLayout, ProtocolTables, Result};
use crate::registry::MetadataRegistry;
use crate::sink::Sinks;
use crate::transport::{BridgeConfig, FrameHandler, SerialBridge};

/// Everything needed to bring a station up.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct StationConfig {
    /// Serial device name.
    pub port: String,
    /// Baud rate.
    pub baud: u32,
    /// Link settings.
    pub bridge: BridgeConfig,
    /// Bit-field layout of the decoded sub-formats.
    pub layout: ProtocolLayout,
    /// Monitor timing.
    pub monitor: MonitorConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".into(),
            baud: 115_200,
            bridge: BridgeConfig::default(),
            layout: ProtocolLayout::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// A running link: reader thread, decoder and both monitors.
///
/// Dropping the station stops the monitors first, then closes the link.
#[derive(Debug)]
pub struct Station {
    monitors: MonitorHandle,
    decoder: Arc<MessageDecoder>,
    bridge: SerialBridge,
}

impl Station {
    /// Open the configured serial port and start every activity.
    ///
    /// A port that cannot be opened is reported once and returned; nothing retries.
    #[cfg(feature = "serial")]
    pub fn open(
        config: &StationConfig,
        registry: Arc<dyn MetadataRegistry>,
        sinks: Sinks,
        tables: ProtocolTables,
    ) -> Result<Self> {
        let bridge = SerialBridge::open(&config.port, config.baud, config.bridge.clone())
            .inspect_err(|err| tracing::error!(error = %err, "unable to open serial link"))?;
        Self::with_bridge(bridge, config, registry, sinks, tables)
    }

    /// Start every activity over an existing bridge.
    pub fn with_bridge(
        bridge: SerialBridge,
        config: &StationConfig,
        registry: Arc<dyn MetadataRegistry>,
        sinks: Sinks,
        tables: ProtocolTables,
    ) -> Result<Self> {
        let decoder = Arc::new(MessageDecoder::new(
            registry,
            sinks,
            config.layout.clone(),
            tables,
        )?);
        let monitors = MonitorHandle::spawn(&decoder, &config.monitor)?;
        let handler: Arc<dyn FrameHandler> = decoder.clone();
        bridge.start_reader(handler)?;
        info!(port = bridge.port(), "station running");
        Ok(Self {
            monitors,
            decoder,
            bridge,
        })
    }

    /// Encode and transmit a user command.
    ///
    /// Rejected text is reported through the notification sink and nothing is sent.
    pub fn submit_command(&self, text: &str) -> Result<()> {
        let payload = self.decoder.encode_command(text)?;
        self.bridge
            .send(&payload)
            .inspect_err(|err| warn!(error = %err, command = text, "command not sent"))?;
        Ok(())
    }

    /// Decoder fed by the reader thread.
    #[must_use]
    pub fn decoder(&self) -> &Arc<MessageDecoder> {
        &self.decoder
    }

    /// Underlying link.
    #[must_use]
    pub fn bridge(&self) -> &SerialBridge {
        &self.bridge
    }

    /// Stop the monitors and close the link. Idempotent.
    pub fn close(&mut self) {
        self.monitors.stop();
        self.bridge.close();
    }
}
