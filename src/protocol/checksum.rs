//! 16-bit Internet checksum with little-endian word pairing.

/// Compute the one's-complement Internet checksum of `bytes`.
///
/// Words are paired little-endian (low byte first). An odd trailing byte contributes
/// only its low byte. Carries are folded until the sum fits 16 bits, then complemented.
#[must_use]
pub fn internet_checksum(bytes: &[u8]) -> u16 {
    let mut sum: u64 = 0;

    let mut words = bytes.chunks_exact(2);
    for word in words.by_ref() {
        sum += u64::from(u16::from_le_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u64::from(*last);
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !u16::try_from(sum).unwrap_or(u16::MAX)
}
