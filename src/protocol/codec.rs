//! Frame codec (encode/decode)
//!
//! ```text
//! inbound:  [SOF 0xFF] [CHK16 LE] [ID32 LE] [DATA64 LE]   15 bytes, checksum over ID+DATA
//! outbound: [SOF 0xFF] [CHK16 LE] [DATA64 LE]             11 bytes, checksum over DATA
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use super::{
    CanIdentifier, INBOUND_FRAME_SIZE, INBOUND_PAYLOAD_SIZE, OUTBOUND_FRAME_SIZE,
    OUTBOUND_PAYLOAD_SIZE, SOF, internet_checksum,
};

/// The 12 checksummed bytes of an inbound frame: identifier then data, both little-endian.
pub type InboundPayload = [u8; INBOUND_PAYLOAD_SIZE];

/// An inbound message split into its raw identifier and data words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    /// Raw 32-bit identifier
    pub id: u32,
    /// 64-bit data word
    pub data: u64,
}

impl RawMessage {
    /// Create a message from its parts
    #[must_use]
    pub const fn new(id: u32, data: u64) -> Self {
        Self { id, data }
    }

    /// Split an inbound payload into identifier and data.
    #[must_use]
    pub fn from_payload(payload: &InboundPayload) -> Self {
        let mut buf = &payload[..];
        let id = buf.get_u32_le();
        let data = buf.get_u64_le();
        Self { id, data }
    }

    /// Decomposed identifier fields
    #[must_use]
    pub const fn identifier(&self) -> CanIdentifier {
        CanIdentifier::from_raw(self.id)
    }

    /// Serialize back to the 12-byte payload layout
    #[must_use]
    pub fn to_payload(&self) -> InboundPayload {
        let mut payload = [0u8; INBOUND_PAYLOAD_SIZE];
        let mut buf = &mut payload[..];
        buf.put_u32_le(self.id);
        buf.put_u64_le(self.data);
        payload
    }

    /// Encode as a complete inbound frame, the way a node on the bus would send it.
    #[must_use]
    pub fn encode_frame(&self) -> Bytes {
        let payload = self.to_payload();
        let mut frame = BytesMut::with_capacity(INBOUND_FRAME_SIZE);
        frame.put_u8(SOF);
        frame.put_u16_le(internet_checksum(&payload));
        frame.put_slice(&payload);
        frame.freeze()
    }
}

/// Pad with zeros or truncate to exactly eight bytes.
#[must_use]
pub fn pad_payload(data: &[u8]) -> [u8; OUTBOUND_PAYLOAD_SIZE] {
    let mut padded = [0u8; OUTBOUND_PAYLOAD_SIZE];
    if data.len() != OUTBOUND_PAYLOAD_SIZE {
        debug!(
            len = data.len(),
            "outbound payload not {OUTBOUND_PAYLOAD_SIZE} bytes; padding/truncating"
        );
    }
    let len = data.len().min(OUTBOUND_PAYLOAD_SIZE);
    padded[..len].copy_from_slice(&data[..len]);
    padded
}

/// Encode an outbound frame
///
/// # Format
///
/// ```text
/// [SOF (1)] [CHECKSUM LE (2)] [DATA (8)]
/// ```
///
/// Any input length is accepted; see [`pad_payload`].
#[must_use]
pub fn encode_outbound(data: &[u8]) -> Bytes {
    let payload = pad_payload(data);
    let mut frame = BytesMut::with_capacity(OUTBOUND_FRAME_SIZE);
    frame.put_u8(SOF);
    frame.put_u16_le(internet_checksum(&payload));
    frame.put_slice(&payload);
    frame.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_little_endian() {
        let msg = RawMessage::new(0x0403_0201, 0x0C0B_0A09_0807_0605);
        let payload = msg.to_payload();
        assert_eq!(payload, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(RawMessage::from_payload(&payload), msg);
    }

    #[test]
    fn test_inbound_frame_layout() {
        let msg = RawMessage::new(0x0000_0305, 42);
        let frame = msg.encode_frame();
        assert_eq!(frame.len(), INBOUND_FRAME_SIZE);
        assert_eq!(frame[0], SOF);
        let chk = u16::from_le_bytes([frame[1], frame[2]]);
        assert_eq!(chk, internet_checksum(&frame[3..]));
        assert_eq!(&frame[3..], &msg.to_payload());
    }

    #[test]
    fn test_outbound_frame_layout() {
        let frame = encode_outbound(&[5, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.len(), OUTBOUND_FRAME_SIZE);
        assert_eq!(frame[0], SOF);
        // checksum covers only the 8 data bytes: !0x0005
        assert_eq!(&frame[1..3], &[0xFA, 0xFF]);
        assert_eq!(&frame[3..], &[5, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_outbound_pads_short_and_truncates_long() {
        assert_eq!(pad_payload(&[1, 2, 3]), [1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(
            pad_payload(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
        assert_eq!(encode_outbound(&[]).len(), OUTBOUND_FRAME_SIZE);
    }
}
