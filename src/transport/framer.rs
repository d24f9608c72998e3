//! Link-layer framer: SOF search, checksum validation and resynchronization.
//!
//! The framer is sans-IO at its core ([`Framer::push_bytes`] + [`Framer::next_event`]);
//! [`Framer::poll`] adds the non-blocking read from a [`LinkRead`].

use tracing::{trace, warn};

#[cfg(feature = "serde")]
use serde::Deserialize;

use super::error::TransportError;
use super::link::LinkRead;
use super::ring::{RX_CAPACITY, RingBuffer};
use crate::protocol::metrics::Metrics;
use crate::protocol::{
    CHECKSUM_SIZE, INBOUND_FRAME_SIZE, INBOUND_PAYLOAD_SIZE, InboundPayload, RawMessage, SOF,
    internet_checksum,
};

/// Framer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct FramerConfig {
    /// With no SOF in sight, a buffer holding more than this many bytes is discarded.
    pub noise_limit: usize,
    /// Upper bound on frames parsed per [`Framer::poll`]; `None` parses all complete frames.
    pub max_frames_per_poll: Option<usize>,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            noise_limit: 128,
            max_frames_per_poll: None,
        }
    }
}

/// Outcome of parsing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// Checksum matched.
    Valid(InboundPayload),
    /// Checksum mismatch. Diagnostic only.
    Invalid {
        /// The 12 bytes that failed validation
        payload: InboundPayload,
        /// Checksum computed over the payload
        expected: u16,
        /// Checksum carried by the frame
        found: u16,
    },
}

/// Receives framer output. Called synchronously on the reader thread.
pub trait FrameHandler: Send + Sync {
    /// A frame passed checksum validation.
    fn on_frame(&self, payload: &InboundPayload);

    /// A frame failed checksum validation.
    fn on_invalid(&self, payload: &InboundPayload, expected: u16, found: u16);
}

impl FrameEvent {
    /// Route this event to the matching handler callback.
    pub fn dispatch<H: FrameHandler + ?Sized>(&self, handler: &H) {
        match self {
            Self::Valid(payload) => handler.on_frame(payload),
            Self::Invalid {
                payload,
                expected,
                found,
            } => handler.on_invalid(payload, *expected, *found),
        }
    }
}

/// Receive-side framer owning the circular receive buffer.
#[derive(Debug, Clone, Default)]
pub struct Framer {
    ring: RingBuffer,
    config: FramerConfig,
}

impl Framer {
    /// Create a framer.
    #[must_use]
    pub fn new(config: FramerConfig) -> Self {
        Self {
            ring: RingBuffer::new(),
            config,
        }
    }

    /// Bytes waiting to be parsed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Feed raw bytes. Returns how many fit in the receive buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.ring.push(bytes);
        trace!(offered = bytes.len(), accepted, "receive buffer fill");
        accepted
    }

    /// Drain whatever the link has available, then parse complete frames.
    ///
    /// Never blocks beyond the link's own read. A read failure is returned only after the
    /// already-buffered bytes have been parsed.
    pub fn poll<L, F>(&mut self, link: &mut L, on_event: F) -> Result<usize, TransportError>
    where
        L: LinkRead + ?Sized,
        F: FnMut(FrameEvent),
    {
        let filled = self.fill_from(link);
        let frames = self.drain(on_event);
        filled.map(|_| frames)
    }

    fn fill_from<L: LinkRead + ?Sized>(&mut self, link: &mut L) -> Result<usize, TransportError> {
        let available = link.bytes_available()?;
        let wanted = available.min(self.ring.free());
        if wanted == 0 {
            return Ok(0);
        }
        let mut chunk = [0u8; RX_CAPACITY];
        let read = link.read_available(&mut chunk[..wanted])?;
        Ok(self.push_bytes(&chunk[..read]))
    }

    /// Parse complete frames, up to the configured per-poll limit.
    pub fn drain<F: FnMut(FrameEvent)>(&mut self, mut on_event: F) -> usize {
        let limit = self.config.max_frames_per_poll.unwrap_or(usize::MAX);
        let mut frames = 0;
        while frames < limit {
            let Some(event) = self.next_event() else {
                break;
            };
            on_event(event);
            frames += 1;
        }
        frames
    }

    /// Parse at most one frame from the buffer.
    pub fn next_event(&mut self) -> Option<FrameEvent> {
        let len = self.ring.len();
        if len < INBOUND_FRAME_SIZE {
            return None;
        }

        let Some(sof) = self.ring.find(SOF, 0, len) else {
            if len > self.config.noise_limit {
                trace!(bytes = len, "no start of frame; discarding noise");
                Metrics::record_discarded(len);
                self.ring.clear();
            }
            return None;
        };

        if len - sof < INBOUND_FRAME_SIZE {
            // A full ring with a late SOF can only make progress by dropping the prefix.
            if self.ring.free() == 0 && sof > 0 {
                Metrics::record_discarded(sof);
                self.ring.consume(sof);
            }
            return None;
        }

        let mut checksum = [0u8; CHECKSUM_SIZE];
        self.ring.copy_out(sof + 1, &mut checksum);
        let found = u16::from_le_bytes(checksum);

        let mut payload = [0u8; INBOUND_PAYLOAD_SIZE];
        self.ring.copy_out(sof + 1 + CHECKSUM_SIZE, &mut payload);
        let expected = internet_checksum(&payload);

        if expected == found {
            if sof > 0 {
                Metrics::record_discarded(sof);
            }
            self.ring.consume(sof + INBOUND_FRAME_SIZE);
            Metrics::record_valid_frame();
            return Some(FrameEvent::Valid(payload));
        }

        let msg = RawMessage::from_payload(&payload);
        let ident = msg.identifier();
        warn!(
            expected = format_args!("{expected:#06x}"),
            found = format_args!("{found:#06x}"),
            node = ident.node_id(),
            function = ident.function_code(),
            extended = ident.extended_id(),
            data = format_args!("{:#018x}", msg.data),
            "checksum failed"
        );
        Metrics::record_invalid_frame();

        // Resync on an SOF embedded in the examined window, keeping everything after it.
        let resume = self
            .ring
            .find(SOF, sof + 1, INBOUND_FRAME_SIZE - 1)
            .unwrap_or(sof + INBOUND_FRAME_SIZE);
        Metrics::record_discarded(resume);
        self.ring.consume(resume);

        Some(FrameEvent::Invalid {
            payload,
            expected,
            found,
        })
    }
}
