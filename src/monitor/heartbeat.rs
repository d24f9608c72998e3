//! Heartbeat pong window.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::registry::MetadataRegistry;
use crate::sink::Severity;

/// Node ids that answered a heartbeat ping in the current interval.
///
/// Windows are non-overlapping: [`HeartbeatWindow::take`] empties the set in the same
/// critical section that reads it, so a pong lands in exactly one evaluation.
#[derive(Debug, Default)]
pub struct HeartbeatWindow {
    responded: Mutex<HashSet<u8>>,
}

impl HeartbeatWindow {
    /// Create an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `node_id` as having responded in this window.
    pub fn record(&self, node_id: u8) {
        self.responded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node_id);
    }

    /// Whether `node_id` has responded in this window.
    #[must_use]
    pub fn contains(&self, node_id: u8) -> bool {
        self.responded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&node_id)
    }

    /// Close the current window, returning its members and starting an empty one.
    pub fn take(&self) -> HashSet<u8> {
        std::mem::take(&mut *self.responded.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Close the current window and compare it against the registry roster.
    pub fn evaluate(&self, registry: &dyn MetadataRegistry) -> WindowReport {
        let responded = self.take();
        let roster = registry.roster();
        let mut report = WindowReport {
            collected: 0,
            total: roster.len(),
            missing: Vec::new(),
        };
        for node_id in roster {
            if responded.contains(&node_id) {
                report.collected += 1;
            } else {
                report.missing.push(
                    registry
                        .node_name(node_id)
                        .unwrap_or_else(|| format!("id={node_id}")),
                );
            }
        }
        report
    }
}

/// Result of evaluating one heartbeat window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    /// Roster nodes that responded
    pub collected: usize,
    /// Roster size
    pub total: usize,
    /// Names of roster nodes that did not respond, in roster order
    pub missing: Vec<String>,
}

impl WindowReport {
    /// OK when every roster node responded
    #[must_use]
    pub fn severity(&self) -> Severity {
        if self.collected == self.total {
            Severity::Ok
        } else {
            Severity::Warning
        }
    }

    /// Status line for the aggregate notification
    #[must_use]
    pub fn text(&self) -> String {
        if self.missing.is_empty() {
            format!("HB Pong Status ({}/{})", self.collected, self.total)
        } else {
            format!(
                "HB Pong Status ({}/{}). Missing: {}",
                self.collected,
                self.total,
                self.missing.join(", ")
            )
        }
    }
}
