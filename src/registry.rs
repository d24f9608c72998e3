//! Metadata registry boundary.
//!
//! The decoder reads node, frame and data-point metadata through [`MetadataRegistry`] and
//! never mutates it. How the registry is populated is up to the caller; [`StaticRegistry`]
//! is an in-memory implementation assembled with [`RegistryBuilder`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// (node, frame) identity of a transmitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    /// Sending node
    pub node_id: u8,
    /// Frame index within the node
    pub frame_index: u32,
}

impl FrameKey {
    /// Create a frame key
    #[must_use]
    pub const fn new(node_id: u8, frame_index: u32) -> Self {
        Self {
            node_id,
            frame_index,
        }
    }
}

/// (node, frame, data point) identity of one scalar signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataKey {
    /// Sending node
    pub node_id: u8,
    /// Frame index within the node
    pub frame_index: u32,
    /// Data-point index within the frame
    pub data_index: u8,
}

impl DataKey {
    /// Create a data key
    #[must_use]
    pub const fn new(node_id: u8, frame_index: u32, data_index: u8) -> Self {
        Self {
            node_id,
            frame_index,
            data_index,
        }
    }

    /// Frame this signal belongs to
    #[must_use]
    pub const fn frame(&self) -> FrameKey {
        FrameKey::new(self.node_id, self.frame_index)
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node={} frame={} data={}",
            self.node_id, self.frame_index, self.data_index
        )
    }
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct FrameMeta {
    /// Expected period in milliseconds; zero disables liveness monitoring
    pub data_timeout_ms: u32,
    /// Number of data points packed into the frame
    pub num_data_points: u8,
}

/// Data-point metadata
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct DataInfoMeta {
    /// Human name of the signal
    pub name: String,
    /// Packed width, valid range 0..=32
    pub bit_length: u8,
    /// Value represented by raw zero
    pub min: i32,
    /// Largest representable value
    pub max: i32,
    /// Lower warning threshold
    pub min_warning: i32,
    /// Upper warning threshold
    pub max_warning: i32,
    /// Lower critical threshold
    pub min_critical: i32,
    /// Upper critical threshold
    pub max_critical: i32,
}

/// A frame with a positive liveness timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoredFrame {
    /// Frame identity
    pub key: FrameKey,
    /// Expected period in milliseconds
    pub timeout_ms: u32,
}

/// Read-only metadata lookups consumed by the decoder and monitors.
pub trait MetadataRegistry: Send + Sync {
    /// Human name of a node
    fn node_name(&self, node_id: u8) -> Option<String>;

    /// Frame metadata
    fn frame(&self, node_id: u8, frame_index: u32) -> Option<FrameMeta>;

    /// Data-point metadata
    fn data_info(&self, key: DataKey) -> Option<DataInfoMeta>;

    /// Every frame with a positive timeout
    fn monitored_frames(&self) -> Vec<MonitoredFrame>;

    /// Expected node roster, in the order used by heartbeat status pages
    fn roster(&self) -> Vec<u8>;

    /// Display title `"<node>.<data>"`, with `node<N>` / `dp<N>` fallbacks
    fn title_for(&self, key: DataKey) -> String {
        let node = self
            .node_name(key.node_id)
            .unwrap_or_else(|| format!("node{}", key.node_id));
        let data = self
            .data_info(key)
            .map_or_else(|| format!("dp{}", key.data_index), |info| info.name);
        format!("{node}.{data}")
    }
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    nodes: HashMap<u8, String>,
    frames: BTreeMap<FrameKey, FrameMeta>,
    data: HashMap<DataKey, DataInfoMeta>,
    roster: Vec<u8>,
}

impl StaticRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Number of known nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl MetadataRegistry for StaticRegistry {
    fn node_name(&self, node_id: u8) -> Option<String> {
        self.nodes.get(&node_id).cloned()
    }

    fn frame(&self, node_id: u8, frame_index: u32) -> Option<FrameMeta> {
        self.frames.get(&FrameKey::new(node_id, frame_index)).cloned()
    }

    fn data_info(&self, key: DataKey) -> Option<DataInfoMeta> {
        self.data.get(&key).cloned()
    }

    fn monitored_frames(&self) -> Vec<MonitoredFrame> {
        self.frames
            .iter()
            .filter(|(_, frame)| frame.data_timeout_ms > 0)
            .map(|(key, frame)| MonitoredFrame {
                key: *key,
                timeout_ms: frame.data_timeout_ms,
            })
            .collect()
    }

    fn roster(&self) -> Vec<u8> {
        self.roster.clone()
    }
}

/// Builder for [`StaticRegistry`].
///
/// Nodes join the roster in insertion order. Frames and data points are upserted;
/// a frame's data-point count tracks the highest data index added to it.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: StaticRegistry,
}

impl RegistryBuilder {
    /// Add a node to the registry and the heartbeat roster
    #[must_use]
    pub fn node(mut self, node_id: u8, name: impl Into<String>) -> Self {
        if self.registry.nodes.insert(node_id, name.into()).is_none() {
            self.registry.roster.push(node_id);
        }
        self
    }

    /// Add a frame with the given liveness timeout
    #[must_use]
    pub fn frame(mut self, node_id: u8, frame_index: u32, data_timeout_ms: u32) -> Self {
        self.registry
            .frames
            .entry(FrameKey::new(node_id, frame_index))
            .and_modify(|frame| frame.data_timeout_ms = data_timeout_ms)
            .or_insert(FrameMeta {
                data_timeout_ms,
                num_data_points: 0,
            });
        self
    }

    /// Add a data point to an existing (or implicitly created) frame
    #[must_use]
    pub fn data_point(mut self, key: DataKey, info: DataInfoMeta) -> Self {
        let frame = self
            .registry
            .frames
            .entry(key.frame())
            .or_insert(FrameMeta {
                data_timeout_ms: 0,
                num_data_points: 0,
            });
        frame.num_data_points = frame.num_data_points.max(key.data_index.saturating_add(1));
        self.registry.data.insert(key, info);
        self
    }

    /// Override the roster order (nodes absent from the registry are kept as-is)
    #[must_use]
    pub fn roster(mut self, roster: impl IntoIterator<Item = u8>) -> Self {
        self.registry.roster = roster.into_iter().collect();
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> StaticRegistry {
        self.registry
    }
}
