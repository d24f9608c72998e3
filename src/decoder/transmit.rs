//! Sensor data frames.
//!
//! Data points are packed low bit first in index order. Each point's raw bits are an offset
//! from the point's `min`.

use super::MessageDecoder;
use crate::protocol::extract_bits;
use crate::registry::{DataInfoMeta, DataKey, FrameKey};
use crate::sink::Severity;

/// Widest data point a frame may declare.
const MAX_POINT_BITS: u8 = 32;

impl MessageDecoder {
    pub(super) fn decode_transmit(&self, node_id: u8, frame_index: u32, data: u64) {
        let Some(frame) = self.registry.frame(node_id, frame_index) else {
            self.fault(format!(
                "Transmit Data from unknown nodeId/frameIndex: {node_id}/{frame_index}"
            ));
            return;
        };

        if frame.data_timeout_ms > 0 {
            self.timers
                .reset(FrameKey::new(node_id, frame_index), frame.data_timeout_ms);
        }

        let mut cursor: u32 = 0;
        for data_index in 0..frame.num_data_points {
            let key = DataKey::new(node_id, frame_index, data_index);
            let Some(info) = self.registry.data_info(key) else {
                self.fault(format!(
                    "Missing DataInfo for a data point declared by the frame. {key}"
                ));
                return;
            };
            if info.bit_length > MAX_POINT_BITS {
                self.fault(format!(
                    "DataInfo has invalid bitLength. {key} bitLength: {}",
                    info.bit_length
                ));
                return;
            }
            let width = u32::from(info.bit_length);
            if cursor + width > 64 {
                self.fault(format!("Data overflowed 64 bits. {key}"));
                return;
            }

            let raw = extract_bits(data, cursor, width);
            let value = i64::from(info.min) + i64::try_from(raw).unwrap_or(i64::MAX);
            let severity = classify(&info, value);
            self.slots
                .signal_transition(key, severity, || self.registry.title_for(key));

            if !self.sinks.display.push_sample(key, value) {
                self.fault(format!(
                    "Failed to add data point to display. {key} value: {value}"
                ));
            }
            cursor += width;
        }
    }
}

fn classify(info: &DataInfoMeta, value: i64) -> Severity {
    let outside = |low: i32, high: i32| value < i64::from(low) || value > i64::from(high);
    if outside(info.min_critical, info.max_critical) {
        Severity::Critical
    } else if outside(info.min_warning, info.max_warning) {
        Severity::Warning
    } else {
        Severity::Ok
    }
}
