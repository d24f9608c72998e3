//! Liveness monitors
//!
//! Two periodic activities run against state the decoder mutates:
//!
//! - the heartbeat monitor closes the pong window every interval and publishes one aggregate
//!   status;
//! - the frame timeout monitor advances every frame countdown on a fast tick and warns about
//!   frames that went overdue.
//!
//! Both expose a synchronous `evaluate`/`tick` so they can be driven deterministically, and
//! [`MonitorHandle::spawn`] runs them on their own threads.

mod heartbeat;
mod timeout;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

#[cfg(feature = "serde")]
use serde::Deserialize;

pub use heartbeat::{HeartbeatWindow, WindowReport};
pub use timeout::{FrameTimers, Overdue, TickPolicy};

use crate::decoder::{MessageDecoder, SlotKey, StatusSlots};
use crate::protocol::metrics::Metrics;
use crate::registry::MetadataRegistry;
use crate::sink::{Channel, NotificationSink, Severity};

/// Monitor timing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct MonitorConfig {
    /// Length of one heartbeat pong window.
    pub heartbeat_interval: Duration,
    /// Period of the frame countdown tick.
    pub frame_tick: Duration,
    /// How far below zero a countdown may run before the frame is reported.
    pub overdue_threshold: Duration,
    /// Lower bound on the countdown restart after a report.
    pub backoff_min: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(2),
            frame_tick: Duration::from_millis(5),
            overdue_threshold: Duration::from_millis(5),
            backoff_min: Duration::from_millis(1000),
        }
    }
}

impl MonitorConfig {
    /// Countdown parameters in whole milliseconds.
    #[must_use]
    pub fn policy(&self) -> TickPolicy {
        let millis = |duration: Duration| u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TickPolicy {
            tick_ms: millis(self.frame_tick),
            threshold_ms: millis(self.overdue_threshold),
            backoff_min_ms: millis(self.backoff_min),
        }
    }
}

/// Publishes the heartbeat pong window as a single persistent status.
#[derive(Clone)]
pub struct HeartbeatMonitor {
    registry: Arc<dyn MetadataRegistry>,
    window: Arc<HeartbeatWindow>,
    slots: Arc<StatusSlots>,
}

impl std::fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("window", &self.window)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl HeartbeatMonitor {
    /// Monitor the window `decoder` records pongs into.
    #[must_use]
    pub fn new(decoder: &MessageDecoder) -> Self {
        Self {
            registry: Arc::clone(decoder.registry()),
            window: Arc::clone(decoder.window()),
            slots: Arc::clone(decoder.slots()),
        }
    }

    /// Close the current window, publish its status and start the next one.
    pub fn evaluate(&self) -> WindowReport {
        let report = self.window.evaluate(&*self.registry);
        debug!(
            collected = report.collected,
            total = report.total,
            "heartbeat window closed"
        );
        self.slots.upsert(
            SlotKey::HeartbeatWindow,
            Channel::Telemetry,
            report.severity(),
            report.text(),
        );
        report
    }
}

/// Advances frame countdowns and warns about silent frames.
#[derive(Clone)]
pub struct FrameTimeoutMonitor {
    registry: Arc<dyn MetadataRegistry>,
    timers: Arc<FrameTimers>,
    notifications: Arc<dyn NotificationSink>,
    policy: TickPolicy,
}

impl std::fmt::Debug for FrameTimeoutMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTimeoutMonitor")
            .field("timers", &self.timers)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FrameTimeoutMonitor {
    /// Monitor the countdowns `decoder` resets on receipt.
    #[must_use]
    pub fn new(decoder: &MessageDecoder, policy: TickPolicy) -> Self {
        Self {
            registry: Arc::clone(decoder.registry()),
            timers: Arc::clone(decoder.timers()),
            notifications: Arc::clone(&decoder.sinks().notifications),
            policy,
        }
    }

    /// Run one tick, posting a warning per overdue frame.
    pub fn tick(&self) -> Vec<Overdue> {
        let overdue = self.timers.tick(self.policy);
        for frame in &overdue {
            Metrics::record_overdue_frame();
            let node_id = frame.key.node_id;
            let node = self
                .registry
                .node_name(node_id)
                .unwrap_or_else(|| format!("id={node_id}"));
            warn!(
                node = node_id,
                frame = frame.key.frame_index,
                overdue_ms = frame.overdue_ms,
                "frame overdue"
            );
            self.notifications.post(
                Channel::Telemetry,
                Severity::Warning,
                format!(
                    "Missing CAN frame: {node} (frameIndex={}). Expected every ~{}ms; overdue by {}ms.",
                    frame.key.frame_index, frame.expected_ms, frame.overdue_ms
                ),
            );
        }
        overdue
    }
}

/// Stop signal shared by the monitor threads.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    /// Sleep until `deadline`. Returns `false` once stopped.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *stopped {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            stopped = self
                .wake
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Running monitor threads. Dropping the handle stops them.
#[derive(Debug)]
pub struct MonitorHandle {
    signal: Arc<StopSignal>,
    running: AtomicBool,
    threads: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Start the heartbeat and frame timeout threads for `decoder`.
    pub fn spawn(decoder: &MessageDecoder, config: &MonitorConfig) -> std::io::Result<Self> {
        let mut handle = Self {
            signal: Arc::new(StopSignal::default()),
            running: AtomicBool::new(true),
            threads: Vec::with_capacity(2),
        };

        let heartbeat = HeartbeatMonitor::new(decoder);
        handle.start("hb-pong-monitor", config.heartbeat_interval, move || {
            heartbeat.evaluate();
        })?;

        let frames = FrameTimeoutMonitor::new(decoder, config.policy());
        handle.start("can-frame-monitor", config.frame_tick, move || {
            let overdue = frames.tick();
            trace!(overdue = overdue.len(), "frame tick");
        })?;

        Ok(handle)
    }

    fn start(
        &mut self,
        name: &str,
        period: Duration,
        mut work: impl FnMut() + Send + 'static,
    ) -> std::io::Result<()> {
        let signal = Arc::clone(&self.signal);
        let thread_name = name.to_string();
        let spawned = thread::Builder::new().name(name.into()).spawn(move || {
            info!(thread = %thread_name, ?period, "monitor started");
            // Deadlines advance by whole periods so slow ticks do not accumulate drift.
            let mut deadline = Instant::now() + period;
            while signal.wait_until(deadline) {
                work();
                deadline += period;
            }
            info!(thread = %thread_name, "monitor exiting");
        });
        match spawned {
            Ok(thread) => {
                self.threads.push(thread);
                Ok(())
            }
            Err(err) => {
                self.stop();
                Err(err)
            }
        }
    }

    /// Whether the threads are still scheduled to run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop both threads and wait for them to exit. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.signal.stop();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("monitor thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
