//! Serial link transport
//!
//! Byte-stream buffering, frame search and validation, and the symmetric send path.

mod bridge;
mod error;
mod framer;
mod link;
mod ring;

pub use bridge::{BridgeConfig, SerialBridge};
pub use error::TransportError;
pub use framer::{FrameEvent, FrameHandler, Framer, FramerConfig};
pub use link::{LinkRead, MemoryLink};
pub use ring::{RX_CAPACITY, RingBuffer};
