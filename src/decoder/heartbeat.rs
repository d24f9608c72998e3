//! Heartbeat response updates: status pages and response timing.

use super::{MessageDecoder, SlotKey};
use crate::protocol::extract_bits;
use crate::sink::{Channel, Severity};

impl MessageDecoder {
    pub(super) fn decode_heartbeat_update(&self, data: u64) {
        let layout = &self.layout.heartbeat;
        let kind = extract_bits(data, 0, layout.type_bits);
        if kind == layout.timing_type {
            self.decode_heartbeat_timing(data);
        } else if kind == layout.status_type {
            self.decode_heartbeat_status(data);
        } else {
            self.fault(format!("HB parse: unknown frame type value {kind}"));
        }
    }

    /// `[type][page][presence bit per roster slot ...]`
    fn decode_heartbeat_status(&self, data: u64) {
        let layout = &self.layout.heartbeat;
        let header = layout.status_header_bits();
        let slots = layout.node_slots_per_page() as usize;
        let page = u32::try_from(extract_bits(data, layout.type_bits, layout.page_bits))
            .unwrap_or(u32::MAX);

        let roster = self.registry.roster();
        let total = roster.len();
        let pages_needed = total.div_ceil(slots);
        if page as usize >= pages_needed {
            self.fault(format!(
                "HB Status parse: received frameNo={page} but framesNeeded={pages_needed} \
                 for numberOfNodes={total}"
            ));
            return;
        }

        let start = page as usize * slots;
        let end = total.min(start + slots);
        if start >= end {
            self.fault(format!("HB Status parse: empty node range for frame {page}"));
            return;
        }

        let mut collected = 0;
        let mut missing = Vec::new();
        for (slot, &node_id) in roster[start..end].iter().enumerate() {
            let bit = header + u32::try_from(slot).unwrap_or(u32::MAX);
            if extract_bits(data, bit, 1) == 1 {
                collected += 1;
                continue;
            }
            match self.registry.node_name(node_id) {
                Some(name) => missing.push(name),
                None => self.fault(format!(
                    "HB Status parse: missing nodeInfo for nodeID={node_id}"
                )),
            }
        }

        let expected = end - start;
        let severity = if collected == expected {
            Severity::Ok
        } else {
            Severity::Warning
        };
        let mut text = format!("HB Status frame {page} ({collected}/{expected}).");
        if severity == Severity::Warning {
            text.push_str(&format!(" missingNodes={{{}}}", missing.join(",")));
        }
        self.slots
            .upsert(SlotKey::HeartbeatPage(page), Channel::Vitals, severity, text);
    }

    /// `[type][average ms][(node id, response ms) ...]`
    fn decode_heartbeat_timing(&self, data: u64) {
        let layout = &self.layout.heartbeat;
        let mut cursor = layout.type_bits;
        let average = extract_bits(data, cursor, layout.timer_ms_bits);
        cursor += layout.timer_ms_bits;

        let pairs = layout.timing_pairs();
        let roster_len = self.registry.roster().len();
        let mut details = format!("avg={average}ms");
        for _ in 0..pairs {
            let node = extract_bits(data, cursor, layout.node_id_bits);
            if node == 0 {
                // Padding: fewer nodes than pair slots. Skip the whole pair.
                if roster_len >= pairs as usize {
                    self.fault(
                        "Got Null node (id=0) for HB timing, even though there are enough \
                         nodes to fill the msg."
                            .into(),
                    );
                }
                cursor += layout.pair_bits();
                continue;
            }
            cursor += layout.node_id_bits;
            let response = extract_bits(data, cursor, layout.timer_ms_bits);
            cursor += layout.timer_ms_bits;

            let node_id = u8::try_from(node).unwrap_or(u8::MAX);
            match self.registry.node_name(node_id) {
                Some(name) => details.push_str(&format!("; {name}={response}ms")),
                None => {
                    details.push_str(&format!("; id{node_id}={response}ms"));
                    self.fault(format!(
                        "HB Timing parse: missing nodeInfo for nodeID={node_id}"
                    ));
                }
            }
        }

        self.slots.upsert(
            SlotKey::HeartbeatTiming,
            Channel::Vitals,
            Severity::Ok,
            format!("HB Timing: {details}"),
        );
    }
}
