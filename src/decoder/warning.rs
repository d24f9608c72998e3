//! Warning-code messages.

use super::MessageDecoder;
use crate::protocol::extract_bits;
use crate::registry::DataKey;
use crate::sink::Severity;

impl MessageDecoder {
    pub(super) fn decode_warning(&self, data: u64) {
        let layout = &self.layout.warning;
        let word = extract_bits(data, 0, 32);

        let kind = extract_bits(word, 0, layout.type_bits);
        let critical = kind & u64::from(layout.critical_bit) != 0;
        let non_critical = kind & u64::from(layout.non_critical_bit) != 0;
        match (critical, non_critical) {
            (false, false) => self.fault(
                "Warning msg with no critical/non-critical type bit set.".into(),
            ),
            (true, true) => self.telemetry(
                Severity::Critical,
                "Warning msg with BOTH critical and non-critical bits set.".into(),
            ),
            _ => {}
        }

        let flags = extract_bits(word, 0, layout.node_offset);
        let flags = self
            .tables
            .warning_flags
            .describe(u32::try_from(flags).unwrap_or(u32::MAX));

        let fields = |offset, width| u32::try_from(extract_bits(word, offset, width)).unwrap_or(0);
        let node_id = u8::try_from(fields(layout.node_offset, layout.node_bits())).unwrap_or(0);
        let frame = fields(layout.frame_offset, layout.frame_bits);
        let data_index = u8::try_from(fields(layout.data_offset, layout.data_bits)).unwrap_or(0);

        let node_name = self.node_label(node_id, || format!("Unrecognized nodeID: {node_id}"));
        let data_name = self
            .registry
            .data_info(DataKey::new(node_id, frame, data_index))
            .map_or_else(|| "unknown dataName".to_string(), |info| info.name);

        let type_label = if critical {
            "CRITICAL"
        } else if non_critical {
            "WARNING"
        } else {
            "NONE"
        };
        let severity = if critical {
            Severity::Critical
        } else {
            Severity::Warning
        };

        self.vitals(
            severity,
            format!(
                "warning for node: {node_name} (id={node_id}). type={type_label}. flags={flags}. \
                 Other fields: frame={frame}, data={data_name}"
            ),
        );
    }
}
