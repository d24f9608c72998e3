//! Byte-link abstraction under the framer.
//!
//! A link is read without blocking: the framer asks how many bytes are available and reads
//! at most that many. The serial backend lives behind the `serial` feature; [`MemoryLink`]
//! is an in-process loopback used by tests, benches and demos.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Non-blocking byte source.
pub trait LinkRead: Send {
    /// Bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` already-available bytes.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<L: LinkRead + ?Sized> LinkRead for Box<L> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_available(buf)
    }
}

#[cfg(feature = "serial")]
impl LinkRead for dyn serialport::SerialPort {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.bytes_to_read().map_err(io::Error::from)?;
        Ok(usize::try_from(pending).unwrap_or(usize::MAX))
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match io::Read::read(self, buf) {
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }
}

/// In-memory link: bytes injected on one side are read by the framer, bytes written are
/// captured for inspection.
///
/// Clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLink {
    /// Create an empty link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the reader.
    pub fn inject(&self, bytes: &[u8]) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(bytes);
    }

    /// Bytes injected but not yet read.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Take everything written so far.
    #[must_use]
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.outbound.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl LinkRead for MemoryLink {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.pending())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        let count = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for MemoryLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_link_reads_only_available() {
        let mut link = MemoryLink::new();
        link.inject(&[1, 2, 3]);
        assert_eq!(link.bytes_available().unwrap(), 3);

        let mut buf = [0u8; 2];
        assert_eq!(link.read_available(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);

        let mut buf = [0u8; 8];
        assert_eq!(link.read_available(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(link.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_clones_share_buffers() {
        let link = MemoryLink::new();
        let mut writer = link.clone();
        writer.write_all(&[9, 8]).unwrap();
        assert_eq!(link.take_written(), vec![9, 8]);
        assert!(link.take_written().is_empty());
    }
}
