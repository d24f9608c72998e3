//! Serial bridge: reader thread, single-writer send path and bounded shutdown.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

#[cfg(feature = "serde")]
use serde::Deserialize;

use super::error::TransportError;
use super::framer::{FrameHandler, Framer, FramerConfig};
use super::link::LinkRead;
use crate::protocol::encode_outbound;
use crate::protocol::metrics::Metrics;

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct BridgeConfig {
    /// Framer settings used by the reader thread.
    pub framer: FramerConfig,
    /// Serial read timeout. Reads only ever request available bytes, so this is a backstop.
    pub read_timeout: Duration,
    /// Sleep between polls that produced no frame.
    pub idle_backoff: Duration,
    /// How long `close` waits for the reader thread to exit.
    pub join_timeout: Duration,
    /// Delay after opening the port before it is used (boards that reset on DTR need ~2 s).
    pub settle_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            framer: FramerConfig::default(),
            read_timeout: Duration::from_millis(10),
            idle_backoff: Duration::from_millis(1),
            join_timeout: Duration::from_millis(500),
            settle_delay: Duration::ZERO,
        }
    }
}

type Reader = Box<dyn LinkRead>;
type Writer = Box<dyn Write + Send>;

struct ReaderWorker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

/// Bidirectional framed link over a serial port (or any [`LinkRead`] + [`Write`] pair).
pub struct SerialBridge {
    port: String,
    config: BridgeConfig,
    reader: Mutex<Option<Reader>>,
    writer: Mutex<Writer>,
    running: Arc<AtomicBool>,
    closed: AtomicBool,
    worker: Mutex<Option<ReaderWorker>>,
}

impl std::fmt::Debug for SerialBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialBridge")
            .field("port", &self.port)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SerialBridge {
    /// Open and configure a serial port: 8 data bits, no parity, one stop bit, no flow
    /// control, DTR and RTS asserted.
    #[cfg(feature = "serial")]
    #[instrument(level = "debug", skip(config))]
    pub fn open(port: &str, baud: u32, config: BridgeConfig) -> Result<Self, TransportError> {
        use serialport::{DataBits, FlowControl, Parity, StopBits};

        let open_error = |err: serialport::Error| TransportError::Open {
            port: port.to_string(),
            source: err.into(),
        };

        let mut serial = serialport::new(port, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(open_error)?;
        serial.write_data_terminal_ready(true).map_err(open_error)?;
        serial.write_request_to_send(true).map_err(open_error)?;

        if !config.settle_delay.is_zero() {
            debug!(delay = ?config.settle_delay, "waiting for port to settle");
            thread::sleep(config.settle_delay);
        }

        let reader = serial.try_clone().map_err(open_error)?;
        info!(port, baud, "serial port open");
        Ok(Self::from_parts(port, Box::new(reader), Box::new(serial), config))
    }

    /// Build a bridge over an already-open link.
    #[must_use]
    pub fn from_parts(
        port: impl Into<String>,
        reader: Reader,
        writer: Writer,
        config: BridgeConfig,
    ) -> Self {
        Self {
            port: port.into(),
            config,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(writer),
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Port name this bridge was opened on.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the reader thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the reader thread, delivering every parsed frame to `handler`.
    pub fn start_reader(&self, handler: Arc<dyn FrameHandler>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyRunning);
        }
        let Some(link) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            self.running.store(false, Ordering::Release);
            return Err(TransportError::Closed);
        };

        let (exit_tx, exited) = mpsc::channel();
        let running = Arc::clone(&self.running);
        let framer = Framer::new(self.config.framer.clone());
        let idle = self.config.idle_backoff;
        let handle = thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || {
                run_reader(link, framer, &*handler, &running, idle);
                // Dropping the sender signals exit even if the send is never observed.
                drop(exit_tx);
            })
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                TransportError::Io(err)
            })?;

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ReaderWorker { handle, exited });
        Ok(())
    }

    /// Frame and write an outbound payload. Payloads that are not exactly eight bytes are
    /// padded with zeros or truncated.
    #[instrument(level = "debug", skip(self, data), fields(len = data.len()))]
    pub fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let frame = encode_outbound(data);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let written = writer.write_all(&frame).and_then(|()| writer.flush());
        drop(writer);
        if let Err(err) = written {
            Metrics::record_io_error();
            warn!(error = %err, "serial write failed");
            return Err(TransportError::Io(err));
        }
        Metrics::record_sent_frame();
        debug!(frame = ?&frame[..], "frame sent");
        Ok(())
    }

    /// Stop the reader and release the link. Waits at most `join_timeout` for the reader.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            match worker.exited.recv_timeout(self.config.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        warn!("reader thread panicked");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(timeout = ?self.config.join_timeout, "reader thread did not exit; detaching");
                }
            }
        }
        info!(port = %self.port, "link closed");
    }
}

impl Drop for SerialBridge {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_reader(
    mut link: Reader,
    mut framer: Framer,
    handler: &dyn FrameHandler,
    running: &AtomicBool,
    idle: Duration,
) {
    info!("reader thread started");
    while running.load(Ordering::Acquire) {
        match framer.poll(&mut link, |event| event.dispatch(handler)) {
            Ok(0) => thread::sleep(idle),
            Ok(_) => {}
            Err(err) => {
                Metrics::record_io_error();
                if running.load(Ordering::Acquire) {
                    warn!(error = %err, "serial read failed");
                }
                thread::sleep(idle);
            }
        }
    }
    info!("reader thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{InboundPayload, RawMessage};
    use crate::transport::MemoryLink;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<InboundPayload>>,
        invalid: Mutex<usize>,
    }

    impl FrameHandler for Recorder {
        fn on_frame(&self, payload: &InboundPayload) {
            self.frames.lock().unwrap().push(*payload);
        }

        fn on_invalid(&self, _payload: &InboundPayload, _expected: u16, _found: u16) {
            *self.invalid.lock().unwrap() += 1;
        }
    }

    fn loopback() -> (MemoryLink, SerialBridge) {
        let link = MemoryLink::new();
        let bridge = SerialBridge::from_parts(
            "mem",
            Box::new(link.clone()),
            Box::new(link.clone()),
            BridgeConfig::default(),
        );
        (link, bridge)
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_reader_delivers_frames() {
        let (link, bridge) = loopback();
        let recorder = Arc::new(Recorder::default());
        bridge.start_reader(recorder.clone()).unwrap();

        link.inject(&RawMessage::new(0x305, 1).encode_frame());
        let mut bad = RawMessage::new(0x305, 2).encode_frame().to_vec();
        bad[4] ^= 0x10;
        link.inject(&bad);
        link.inject(&RawMessage::new(0x306, 3).encode_frame());

        assert!(wait_for(|| recorder.frames.lock().unwrap().len() == 2));
        assert_eq!(*recorder.invalid.lock().unwrap(), 1);
        bridge.close();
        assert!(!bridge.is_running());
    }

    #[test]
    fn test_second_start_rejected() {
        let (_link, bridge) = loopback();
        bridge.start_reader(Arc::new(Recorder::default())).unwrap();
        assert!(matches!(
            bridge.start_reader(Arc::new(Recorder::default())),
            Err(TransportError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_send_frames_payload() {
        let (link, bridge) = loopback();
        bridge.send(&[5]).unwrap();
        assert_eq!(
            link.take_written(),
            vec![0xFF, 0xFA, 0xFF, 5, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_closed_bridge_rejects_use() {
        let (_link, bridge) = loopback();
        bridge.close();
        bridge.close();
        assert!(matches!(bridge.send(&[1]), Err(TransportError::Closed)));
        assert!(matches!(
            bridge.start_reader(Arc::new(Recorder::default())),
            Err(TransportError::Closed)
        ));
    }
}
