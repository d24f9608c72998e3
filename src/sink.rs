//! Notification and display sinks.
//!
//! The core never mutates UI state itself. Every user-visible change goes through
//! [`NotificationSink`] or [`DisplaySink`]; [`UiQueue`] implements both by enqueueing
//! [`UiEvent`]s for a single consumer (the UI thread) to apply in order.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::trace;

use crate::registry::DataKey;

/// Severity of a status or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Nominal
    #[default]
    Ok,
    /// Degraded or suspicious
    Warning,
    /// Requires immediate attention
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{name}")
    }
}

/// Notification channel an event is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Messages originating from the vitals node
    Vitals,
    /// Messages about the ground-station link and decoded telemetry
    Telemetry,
}

/// Opaque handle to a posted status entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusId(u64);

impl StatusId {
    /// Wrap a raw handle value
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Receives status notifications. Fire-and-forget.
pub trait NotificationSink: Send + Sync {
    /// Post a new status entry and return its handle.
    fn post(&self, channel: Channel, severity: Severity, text: String) -> StatusId;

    /// Replace the text of a previously posted entry.
    fn update_text(&self, id: StatusId, text: String);

    /// Replace the severity of a previously posted entry.
    fn update_severity(&self, id: StatusId, severity: Severity);
}

/// Receives decoded sensor samples.
pub trait DisplaySink: Send + Sync {
    /// Push one sample. Returns `false` if the sample was refused.
    fn push_sample(&self, key: DataKey, value: i64) -> bool;
}

/// The pair of sinks the decoder and monitors write to.
#[derive(Clone)]
pub struct Sinks {
    /// Status notifications
    pub notifications: Arc<dyn NotificationSink>,
    /// Sensor samples
    pub display: Arc<dyn DisplaySink>,
}

impl Sinks {
    /// Bundle two sinks
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationSink>, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            notifications,
            display,
        }
    }

    /// Route both notifications and samples through one queue
    #[must_use]
    pub fn from_queue(queue: Arc<UiQueue>) -> Self {
        Self {
            notifications: queue.clone(),
            display: queue,
        }
    }
}

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}

/// A user-visible mutation, applied in order by the UI consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// New status entry
    Post {
        /// Handle assigned to the entry
        id: StatusId,
        /// Channel posted to
        channel: Channel,
        /// Initial severity
        severity: Severity,
        /// Initial text
        text: String,
    },
    /// Text replacement for an existing entry
    UpdateText {
        /// Entry handle
        id: StatusId,
        /// New text
        text: String,
    },
    /// Severity replacement for an existing entry
    UpdateSeverity {
        /// Entry handle
        id: StatusId,
        /// New severity
        severity: Severity,
    },
    /// Decoded sensor sample
    Sample {
        /// Signal identity
        key: DataKey,
        /// Decoded value (raw bits plus the signal minimum)
        value: i64,
    },
}

/// Queue-backed sink marshaling every mutation onto one consumer.
#[derive(Debug)]
pub struct UiQueue {
    next_id: AtomicU64,
    events: Sender<UiEvent>,
}

impl UiQueue {
    /// Create a queue and the receiver the UI thread drains.
    #[must_use]
    pub fn new() -> (Self, Receiver<UiEvent>) {
        let (events, receiver) = mpsc::channel();
        (
            Self {
                next_id: AtomicU64::new(1),
                events,
            },
            receiver,
        )
    }

    fn enqueue(&self, event: UiEvent) -> bool {
        match self.events.send(event) {
            Ok(()) => true,
            Err(mpsc::SendError(event)) => {
                trace!(?event, "ui consumer gone; dropping event");
                false
            }
        }
    }
}

impl NotificationSink for UiQueue {
    fn post(&self, channel: Channel, severity: Severity, text: String) -> StatusId {
        let id = StatusId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.enqueue(UiEvent::Post {
            id,
            channel,
            severity,
            text,
        });
        id
    }

    fn update_text(&self, id: StatusId, text: String) {
        self.enqueue(UiEvent::UpdateText { id, text });
    }

    fn update_severity(&self, id: StatusId, severity: Severity) {
        self.enqueue(UiEvent::UpdateSeverity { id, severity });
    }
}

impl DisplaySink for UiQueue {
    fn push_sample(&self, key: DataKey, value: i64) -> bool {
        self.enqueue(UiEvent::Sample { key, value })
    }
}
