//! Long-lived status slots with create-once, update-after semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::registry::DataKey;
use crate::sink::{Channel, NotificationSink, Severity, StatusId};

/// Identity of a persistent status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Bus controller status
    BusStatus,
    /// Heartbeat response timing summary
    HeartbeatTiming,
    /// One heartbeat status page
    HeartbeatPage(u32),
    /// Aggregate of the heartbeat pong window
    HeartbeatWindow,
}

#[derive(Debug, Clone, Copy)]
struct SignalEntry {
    id: StatusId,
    severity: Severity,
}

/// Keyed registry of status handles.
///
/// The first upsert for a key posts a new entry; later upserts rewrite that entry's text and
/// severity in place. Per-signal entries are only ever created on a transition away from OK.
pub struct StatusSlots {
    sink: Arc<dyn NotificationSink>,
    slots: Mutex<HashMap<SlotKey, StatusId>>,
    signals: Mutex<HashMap<DataKey, SignalEntry>>,
}

impl std::fmt::Debug for StatusSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSlots")
            .field("slots", &self.slots)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

impl StatusSlots {
    /// Create an empty registry posting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            slots: Mutex::new(HashMap::new()),
            signals: Mutex::new(HashMap::new()),
        }
    }

    /// Post or update the entry for `key`. Idempotent in the key.
    pub fn upsert(
        &self,
        key: SlotKey,
        channel: Channel,
        severity: Severity,
        text: String,
    ) -> StatusId {
        // Held across the post so two racing upserts cannot both create.
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = slots.get(&key).copied() {
            self.sink.update_text(id, text);
            self.sink.update_severity(id, severity);
            return id;
        }
        let id = self.sink.post(channel, severity, text);
        slots.insert(key, id);
        id
    }

    /// Handle of an existing slot.
    #[must_use]
    pub fn get(&self, key: SlotKey) -> Option<StatusId> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
    }

    /// Record the latest severity of a signal, notifying only when it changed.
    ///
    /// An untracked signal counts as OK. The first change posts `"status of: <title>"` on the
    /// telemetry channel; later changes update that entry's severity. Returns `true` when a
    /// notification was emitted.
    pub fn signal_transition(
        &self,
        key: DataKey,
        severity: Severity,
        title: impl FnOnce() -> String,
    ) -> bool {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        match signals.get_mut(&key) {
            Some(entry) if entry.severity == severity => false,
            Some(entry) => {
                entry.severity = severity;
                self.sink.update_severity(entry.id, severity);
                true
            }
            None if severity == Severity::Ok => false,
            None => {
                let id = self
                    .sink
                    .post(Channel::Telemetry, severity, format!("status of: {}", title()));
                signals.insert(key, SignalEntry { id, severity });
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{UiEvent, UiQueue};

    #[test]
    fn test_upsert_creates_once() {
        let (queue, events) = UiQueue::new();
        let slots = StatusSlots::new(Arc::new(queue));

        let first = slots.upsert(SlotKey::BusStatus, Channel::Vitals, Severity::Ok, "a".into());
        let second = slots.upsert(
            SlotKey::BusStatus,
            Channel::Vitals,
            Severity::Warning,
            "b".into(),
        );
        assert_eq!(first, second);
        assert_eq!(slots.get(SlotKey::BusStatus), Some(first));
        assert_eq!(slots.get(SlotKey::HeartbeatPage(0)), None);

        let drained: Vec<UiEvent> = events.try_iter().collect();
        assert_eq!(drained.len(), 3);
        assert!(matches!(drained[0], UiEvent::Post { .. }));
        assert_eq!(
            drained[1],
            UiEvent::UpdateText {
                id: first,
                text: "b".into()
            }
        );
        assert_eq!(
            drained[2],
            UiEvent::UpdateSeverity {
                id: first,
                severity: Severity::Warning
            }
        );
    }

    #[test]
    fn test_pages_are_distinct_slots() {
        let (queue, _events) = UiQueue::new();
        let slots = StatusSlots::new(Arc::new(queue));
        let a = slots.upsert(SlotKey::HeartbeatPage(0), Channel::Vitals, Severity::Ok, "p0".into());
        let b = slots.upsert(SlotKey::HeartbeatPage(1), Channel::Vitals, Severity::Ok, "p1".into());
        assert_ne!(a, b);
    }

    #[test]
    fn test_signal_transitions_suppress_repeats() {
        let (queue, events) = UiQueue::new();
        let slots = StatusSlots::new(Arc::new(queue));
        let key = DataKey::new(8, 0, 1);

        assert!(!slots.signal_transition(key, Severity::Ok, || "x".into()));
        assert!(slots.signal_transition(key, Severity::Warning, || "pedal.reading".into()));
        assert!(!slots.signal_transition(key, Severity::Warning, || unreachable!()));
        assert!(slots.signal_transition(key, Severity::Ok, || unreachable!()));

        let drained: Vec<UiEvent> = events.try_iter().collect();
        assert_eq!(drained.len(), 2);
        match &drained[0] {
            UiEvent::Post {
                channel,
                severity,
                text,
                ..
            } => {
                assert_eq!(*channel, Channel::Telemetry);
                assert_eq!(*severity, Severity::Warning);
                assert_eq!(text, "status of: pedal.reading");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            drained[1],
            UiEvent::UpdateSeverity {
                severity: Severity::Ok,
                ..
            }
        ));
    }
}
