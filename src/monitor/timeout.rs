//! Per-frame liveness countdowns.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::registry::{FrameKey, MonitoredFrame};

#[derive(Debug, Clone, Copy)]
struct Countdown {
    timeout_ms: u32,
    remaining_ms: i64,
}

/// A frame found overdue by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overdue {
    /// Frame identity
    pub key: FrameKey,
    /// Configured period
    pub expected_ms: u32,
    /// How far past zero the countdown had run
    pub overdue_ms: i64,
}

/// Tick parameters, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPolicy {
    /// Amount subtracted from every countdown per tick
    pub tick_ms: u32,
    /// A countdown strictly below `-threshold_ms` is overdue
    pub threshold_ms: u32,
    /// An overdue countdown restarts at `max(timeout, backoff_min_ms)`
    pub backoff_min_ms: u32,
}

impl Default for TickPolicy {
    fn default() -> Self {
        Self {
            tick_ms: 5,
            threshold_ms: 5,
            backoff_min_ms: 1000,
        }
    }
}

/// Countdown table for every monitored frame.
#[derive(Debug, Default)]
pub struct FrameTimers {
    countdowns: Mutex<HashMap<FrameKey, Countdown>>,
}

impl FrameTimers {
    /// Seed one countdown per frame, each starting at its full timeout.
    #[must_use]
    pub fn seeded(frames: impl IntoIterator<Item = MonitoredFrame>) -> Self {
        let countdowns = frames
            .into_iter()
            .filter(|frame| frame.timeout_ms > 0)
            .map(|frame| {
                (
                    frame.key,
                    Countdown {
                        timeout_ms: frame.timeout_ms,
                        remaining_ms: i64::from(frame.timeout_ms),
                    },
                )
            })
            .collect();
        Self {
            countdowns: Mutex::new(countdowns),
        }
    }

    /// Number of monitored frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no frame is monitored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Restart a frame's countdown at its full timeout. Zero timeouts are ignored.
    pub fn reset(&self, key: FrameKey, timeout_ms: u32) {
        if timeout_ms == 0 {
            return;
        }
        self.lock().insert(
            key,
            Countdown {
                timeout_ms,
                remaining_ms: i64::from(timeout_ms),
            },
        );
    }

    /// Milliseconds left on a frame's countdown.
    #[must_use]
    pub fn remaining(&self, key: FrameKey) -> Option<i64> {
        self.lock().get(&key).map(|countdown| countdown.remaining_ms)
    }

    /// Advance every countdown by one tick and collect the frames that went overdue.
    ///
    /// Overdue frames are restarted at the back-off value, so a frame that stays silent is
    /// reported again only after that much time.
    pub fn tick(&self, policy: TickPolicy) -> Vec<Overdue> {
        let threshold = -i64::from(policy.threshold_ms);
        let mut overdue = Vec::new();
        let mut countdowns = self.lock();
        for (key, countdown) in countdowns.iter_mut() {
            let updated = countdown.remaining_ms - i64::from(policy.tick_ms);
            if updated < threshold {
                overdue.push(Overdue {
                    key: *key,
                    expected_ms: countdown.timeout_ms,
                    overdue_ms: -updated,
                });
                countdown.remaining_ms = i64::from(countdown.timeout_ms.max(policy.backoff_min_ms));
            } else {
                countdown.remaining_ms = updated;
            }
        }
        drop(countdowns);
        if !overdue.is_empty() {
            trace!(count = overdue.len(), "frames overdue");
        }
        overdue.sort_by_key(|entry| entry.key);
        overdue
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<FrameKey, Countdown>> {
        self.countdowns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
