//! One slot per timer kind.
//!
//! Arming a slot always cancels what it held, and every expiry carries the
//! generation it was armed with, so an expiry already queued behind a
//! re-arm or a clear is recognised as stale and dropped.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::runner::Command;
use crate::services::ServiceGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    ProbeInterval,
    ProbeCheck,
    ResponseOverdue,
    ResumeGrace,
    Service(ServiceGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Weak handle onto the runner's command queue. Holding it does not keep
/// the runner alive.
#[derive(Debug, Clone)]
pub(crate) struct CommandSink {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl CommandSink {
    pub(crate) fn new(tx: &mpsc::UnboundedSender<Command>) -> Self {
        Self { tx: tx.downgrade() }
    }

    pub(crate) fn send(&self, command: Command) {
        if let Some(tx) = self.tx.upgrade() {
            // The runner may have exited between upgrade and send.
            let _ = tx.send(command);
        }
    }
}

#[derive(Debug)]
pub(crate) struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    armed: Option<AbortHandle>,
}

impl TimerSlot {
    pub(crate) fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            armed: None,
        }
    }

    pub(crate) fn kind(&self) -> TimerKind {
        self.kind
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Replace whatever this slot held with a timer firing after `delay`.
    pub(crate) fn arm(&mut self, delay: Duration, sink: &CommandSink) {
        self.clear();
        self.generation += 1;
        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        let sink = sink.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.send(Command::Timer(fired));
        });
        self.armed = Some(task.abort_handle());
    }

    pub(crate) fn clear(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
            // Bump so an expiry already in the queue no longer matches.
            self.generation += 1;
        }
    }

    /// Accept an expiry if it belongs to the current arming. Disarms the slot.
    pub(crate) fn accept(&mut self, fired: &TimerFired) -> bool {
        if fired.kind != self.kind || fired.generation != self.generation || self.armed.is_none() {
            return false;
        }
        self.armed = None;
        true
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }
}
