//! Enumerated-code messages (telemetry command responses, status updates).

use super::MessageDecoder;
use crate::protocol::CodeTable;

impl MessageDecoder {
    pub(super) fn decode_enum_flag(&self, table: &CodeTable, node_id: u8, data: u64) {
        let node_name = self.node_label(node_id, || format!("Unrecognized nodeID: ({node_id})"));
        let node_info = format!("{node_name} (id={node_id})");

        let signed = i64::from_le_bytes(data.to_le_bytes());
        let Ok(code) = i32::try_from(signed) else {
            self.fault(format!(
                "{} value out of int range ({signed}) from {node_info}",
                table.kind()
            ));
            return;
        };

        let Some(name) = table.name(code) else {
            self.fault(format!(
                "Unrecognized code {code} in {} from {node_info}",
                table.kind()
            ));
            return;
        };

        self.telemetry(
            table.severity(code),
            format!("Flag={name} ({code}) from {node_info}"),
        );
    }
}
