//! Fixed-capacity circular receive buffer.

/// Receive ring capacity in bytes.
pub const RX_CAPACITY: usize = 256;

/// Byte ring addressed by offset from the oldest unconsumed byte.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: [u8; RX_CAPACITY],
    head: usize,
    len: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Create an empty ring.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0u8; RX_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Unconsumed bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check whether nothing is buffered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Space left before the ring is full.
    #[must_use]
    pub const fn free(&self) -> usize {
        RX_CAPACITY - self.len
    }

    /// Append as much of `bytes` as fits and return how many were accepted.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(self.free());
        let tail = (self.head + self.len) % RX_CAPACITY;
        let first = accepted.min(RX_CAPACITY - tail);
        self.data[tail..tail + first].copy_from_slice(&bytes[..first]);
        let rest = accepted - first;
        self.data[..rest].copy_from_slice(&bytes[first..accepted]);
        self.len += accepted;
        accepted
    }

    /// Offset of the first `byte` within `count` bytes starting at `from`.
    #[must_use]
    pub fn find(&self, byte: u8, from: usize, count: usize) -> Option<usize> {
        let end = from.saturating_add(count).min(self.len);
        (from..end).find(|&offset| self.data[(self.head + offset) % RX_CAPACITY] == byte)
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `offset + dst.len()` bytes are buffered.
    pub fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        assert!(offset + dst.len() <= self.len, "copy past buffered data");
        let start = (self.head + offset) % RX_CAPACITY;
        let first = dst.len().min(RX_CAPACITY - start);
        dst[..first].copy_from_slice(&self.data[start..start + first]);
        let rest = dst.len() - first;
        dst[first..].copy_from_slice(&self.data[..rest]);
    }

    /// Drop `count` bytes from the front. Dropping more than is buffered empties the ring.
    pub fn consume(&mut self, count: usize) {
        if count >= self.len {
            self.clear();
        } else {
            self.head = (self.head + count) % RX_CAPACITY;
            self.len -= count;
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_respects_capacity() {
        let mut ring = RingBuffer::new();
        assert_eq!(ring.push(&[1u8; 300]), RX_CAPACITY);
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.push(&[2]), 0);
    }

    #[test]
    fn test_wraparound_copy_and_find() {
        let mut ring = RingBuffer::new();
        ring.push(&[0u8; 250]);
        ring.consume(250);
        assert!(ring.is_empty());

        let bytes: Vec<u8> = (1..=12).collect();
        ring.push(&bytes);
        assert_eq!(ring.len(), 12);

        let mut out = [0u8; 10];
        ring.copy_out(2, &mut out);
        assert_eq!(out, [3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        assert_eq!(ring.find(9, 0, 12), Some(8));
        assert_eq!(ring.find(9, 0, 8), None);
        assert_eq!(ring.find(1, 1, 20), None);
    }

    #[test]
    fn test_overconsume_clears() {
        let mut ring = RingBuffer::new();
        ring.push(&[1, 2, 3]);
        ring.consume(10);
        assert!(ring.is_empty());
        assert_eq!(ring.free(), RX_CAPACITY);
    }
}
