//! Outbound command encoding (free text -> 8-byte payload)

use super::{CommandError, OUTBOUND_PAYLOAD_SIZE};

/// Command family setting a node's value: `updateValue<N>`
pub const UPDATE_VALUE_COMMAND: &str = "updateValue";

/// Encode a user command into an outbound payload.
///
/// `updateValue<N>` encodes `N` (signed decimal, `_` separators allowed) as a little-endian
/// `i32` followed by four zero bytes. Anything else is rejected.
pub fn encode_command(input: &str) -> Result<[u8; OUTBOUND_PAYLOAD_SIZE], CommandError> {
    let input = input.trim();
    let Some(argument) = input.strip_prefix(UPDATE_VALUE_COMMAND) else {
        return Err(CommandError::Unrecognized(input.to_string()));
    };

    let digits: String = argument.trim().chars().filter(|c| *c != '_').collect();
    let value: i32 = digits
        .parse()
        .map_err(|_| CommandError::MalformedValue(argument.trim().to_string()))?;

    let mut payload = [0u8; OUTBOUND_PAYLOAD_SIZE];
    payload[..4].copy_from_slice(&value.to_le_bytes());
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_value_encoding() {
        assert_eq!(encode_command("updateValue5").unwrap(), [5, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            encode_command("  updateValue 1_000 ").unwrap(),
            [0xE8, 0x03, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            encode_command("updateValue-1").unwrap(),
            [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]
        );
        assert_eq!(
            encode_command("updateValue-2147483648").unwrap(),
            [0x00, 0x00, 0x00, 0x80, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_malformed_values_rejected() {
        for text in ["updateValue", "updateValue12abc", "updateValue2147483648", "updateValue1.5"] {
            assert!(
                matches!(encode_command(text), Err(CommandError::MalformedValue(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert_eq!(
            encode_command("reboot"),
            Err(CommandError::Unrecognized("reboot".into()))
        );
        assert!(matches!(encode_command(""), Err(CommandError::Unrecognized(_))));
    }
}
