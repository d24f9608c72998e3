//! Bit-field layouts of the packed sub-formats.
//!
//! Offsets and widths are fixed configuration shared with the firmware that packs them.
//! They are validated once at startup; decoding never re-checks them.

#[cfg(feature = "serde")]
use serde::Deserialize;

use super::{Error, Result};

/// Minimum node-presence slots a heartbeat status page must carry.
const MIN_NODE_SLOTS_PER_PAGE: u32 = 30;

/// Extract `width` bits of `data` starting at bit `offset`.
///
/// Bits beyond bit 63 read as zero; a zero width yields zero.
#[must_use]
pub const fn extract_bits(data: u64, offset: u32, width: u32) -> u64 {
    if width == 0 || offset >= 64 {
        return 0;
    }
    let shifted = data >> offset;
    if width >= 64 {
        shifted
    } else {
        shifted & ((1u64 << width) - 1)
    }
}

/// Layout of the warning-code word (low 32 bits of the data).
///
/// ```text
/// [type | other flags ...][node id][frame number][data index]
///  0                       node_offset  frame_offset  data_offset
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct WarningLayout {
    /// Width of the type sub-field at bit 0
    pub type_bits: u32,
    /// Type bit marking a critical warning
    pub critical_bit: u32,
    /// Type bit marking a non-critical warning
    pub non_critical_bit: u32,
    /// First bit of the problematic node id; bits below it form the flags bitmask
    pub node_offset: u32,
    /// First bit of the frame number; the node id spans `node_offset..frame_offset`
    pub frame_offset: u32,
    /// Width of the frame number
    pub frame_bits: u32,
    /// First bit of the data-point index
    pub data_offset: u32,
    /// Width of the data-point index
    pub data_bits: u32,
}

impl Default for WarningLayout {
    fn default() -> Self {
        Self {
            type_bits: 3,
            critical_bit: 0b001,
            non_critical_bit: 0b010,
            node_offset: 12,
            frame_offset: 19,
            frame_bits: 5,
            data_offset: 24,
            data_bits: 5,
        }
    }
}

impl WarningLayout {
    /// Width of the problematic-node field
    #[must_use]
    pub const fn node_bits(&self) -> u32 {
        self.frame_offset.saturating_sub(self.node_offset)
    }

    fn validate(&self) -> Result<()> {
        let type_mask = mask32(self.type_bits);
        if self.critical_bit & !type_mask != 0 || self.non_critical_bit & !type_mask != 0 {
            return Err(Error::InvalidLayout(
                "warning type bits fall outside the type field".into(),
            ));
        }
        if self.critical_bit == 0
            || self.non_critical_bit == 0
            || self.critical_bit & self.non_critical_bit != 0
        {
            return Err(Error::InvalidLayout(
                "warning critical/non-critical bits must be distinct and non-zero".into(),
            ));
        }
        if self.node_offset < self.type_bits {
            return Err(Error::InvalidLayout(
                "warning node id overlaps the type field".into(),
            ));
        }
        if !(1..=8).contains(&self.node_bits()) {
            return Err(Error::InvalidLayout(format!(
                "warning node id must be 1..=8 bits, got {}",
                self.node_bits()
            )));
        }
        if self.frame_offset + self.frame_bits > self.data_offset {
            return Err(Error::InvalidLayout(
                "warning frame number overlaps the data index".into(),
            ));
        }
        if self.data_bits > 8 || self.data_offset + self.data_bits > 32 {
            return Err(Error::InvalidLayout(
                "warning data index does not fit the 32-bit warning word".into(),
            ));
        }
        Ok(())
    }
}

/// Layout of the heartbeat-response-update word.
///
/// ```text
/// status: [type][page number][presence bitmap ...]
/// timing: [type][average ms][(node id, response ms) * pairs]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct HeartbeatLayout {
    /// Width of the sub-message type discriminator
    pub type_bits: u32,
    /// Type value selecting the timing layout
    pub timing_type: u64,
    /// Type value selecting the status layout
    pub status_type: u64,
    /// Width of the status page number
    pub page_bits: u32,
    /// Width of every millisecond field in the timing layout
    pub timer_ms_bits: u32,
    /// Width of a node id in a timing pair
    pub node_id_bits: u32,
    /// Upper bound on (node id, response ms) pairs in one timing message
    pub max_timing_pairs: u32,
}

impl Default for HeartbeatLayout {
    fn default() -> Self {
        Self {
            type_bits: 2,
            timing_type: 0,
            status_type: 1,
            page_bits: 3,
            timer_ms_bits: 10,
            node_id_bits: 7,
            max_timing_pairs: 3,
        }
    }
}

impl HeartbeatLayout {
    /// Bits preceding the presence bitmap in a status page
    #[must_use]
    pub const fn status_header_bits(&self) -> u32 {
        self.type_bits + self.page_bits
    }

    /// Node presence bits carried by one status page
    #[must_use]
    pub const fn node_slots_per_page(&self) -> u32 {
        64u32.saturating_sub(self.status_header_bits())
    }

    /// Width of one (node id, response ms) pair
    #[must_use]
    pub const fn pair_bits(&self) -> u32 {
        self.node_id_bits + self.timer_ms_bits
    }

    /// Pairs actually carried by a timing message
    #[must_use]
    pub const fn timing_pairs(&self) -> u32 {
        let available = 64u32.saturating_sub(self.type_bits + self.timer_ms_bits);
        let pair_bits = self.pair_bits();
        let by_bits = if pair_bits == 0 { 0 } else { available / pair_bits };
        if by_bits < self.max_timing_pairs {
            by_bits
        } else {
            self.max_timing_pairs
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=32).contains(&self.type_bits) {
            return Err(Error::InvalidLayout(format!(
                "heartbeat type field must be 1..=32 bits, got {}",
                self.type_bits
            )));
        }
        let type_mask = mask64(self.type_bits);
        if self.timing_type & !type_mask != 0
            || self.status_type & !type_mask != 0
            || self.timing_type == self.status_type
        {
            return Err(Error::InvalidLayout(
                "heartbeat type values must be distinct and fit the type field".into(),
            ));
        }
        if self.page_bits > 32 {
            return Err(Error::InvalidLayout(format!(
                "heartbeat page field must be at most 32 bits, got {}",
                self.page_bits
            )));
        }
        if self.node_slots_per_page() <= MIN_NODE_SLOTS_PER_PAGE {
            return Err(Error::InvalidLayout(format!(
                "heartbeat status page carries {} node slots; more than {MIN_NODE_SLOTS_PER_PAGE} required",
                self.node_slots_per_page()
            )));
        }
        if !(1..=32).contains(&self.timer_ms_bits) || !(1..=8).contains(&self.node_id_bits) {
            return Err(Error::InvalidLayout(
                "heartbeat timer must be 1..=32 bits and node id 1..=8 bits".into(),
            ));
        }
        if self.type_bits + self.timer_ms_bits > 64 {
            return Err(Error::InvalidLayout(
                "heartbeat timing header exceeds 64 bits".into(),
            ));
        }
        Ok(())
    }
}

/// Every packed layout the decoder relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct ProtocolLayout {
    /// Warning-code word
    pub warning: WarningLayout,
    /// Heartbeat-response-update word
    pub heartbeat: HeartbeatLayout,
}

impl ProtocolLayout {
    /// Check every layout fits its word. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        self.warning.validate()?;
        self.heartbeat.validate()
    }
}

const fn mask32(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

const fn mask64(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        ProtocolLayout::default().validate().unwrap();
    }

    #[test]
    fn test_extract_bits() {
        let data = 0xF0F0_0000_0000_00AB;
        assert_eq!(extract_bits(data, 0, 8), 0xAB);
        assert_eq!(extract_bits(data, 4, 4), 0xA);
        assert_eq!(extract_bits(data, 56, 8), 0xF0);
        assert_eq!(extract_bits(data, 0, 64), data);
        assert_eq!(extract_bits(data, 0, 0), 0);
        assert_eq!(extract_bits(data, 64, 4), 0);
    }

    #[test]
    fn test_default_heartbeat_geometry() {
        let hb = HeartbeatLayout::default();
        assert_eq!(hb.status_header_bits(), 5);
        assert_eq!(hb.node_slots_per_page(), 59);
        assert_eq!(hb.pair_bits(), 17);
        // (64 - 12) / 17 = 3
        assert_eq!(hb.timing_pairs(), 3);
    }

    #[test]
    fn test_timing_pairs_limited_by_bits() {
        let hb = HeartbeatLayout {
            max_timing_pairs: 10,
            ..HeartbeatLayout::default()
        };
        assert_eq!(hb.timing_pairs(), 3);
    }

    #[test]
    fn test_too_few_node_slots_rejected() {
        // 64 - (16 + 17) = 31 slots is the smallest accepted page
        let roomy = ProtocolLayout {
            heartbeat: HeartbeatLayout {
                type_bits: 16,
                page_bits: 17,
                ..HeartbeatLayout::default()
            },
            ..ProtocolLayout::default()
        };
        roomy.validate().unwrap();

        let cramped = ProtocolLayout {
            heartbeat: HeartbeatLayout {
                type_bits: 16,
                page_bits: 18,
                ..HeartbeatLayout::default()
            },
            ..ProtocolLayout::default()
        };
        assert_eq!(cramped.heartbeat.node_slots_per_page(), 30);
        assert!(matches!(cramped.validate(), Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn test_warning_overlap_rejected() {
        let layout = ProtocolLayout {
            warning: WarningLayout {
                frame_offset: 22,
                ..WarningLayout::default()
            },
            ..ProtocolLayout::default()
        };
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));
    }
}
