//! Typed publish/subscribe for runner events.
//!
//! Subscribers own a [`Subscription`]; dropping it unregisters. Nothing
//! outlives a reload because nothing is registered by name.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::status::RunnerStatus;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    UpdateStatus,
    Reloading,
    Sleep,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::UpdateStatus => "update-status",
            Topic::Reloading => "reloading",
            Topic::Sleep => "sleep",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum RunnerEvent {
    UpdateStatus(RunnerStatus),
    Reloading,
    Sleep,
}

impl RunnerEvent {
    pub fn topic(&self) -> Topic {
        match self {
            RunnerEvent::UpdateStatus(_) => Topic::UpdateStatus,
            RunnerEvent::Reloading => Topic::Reloading,
            RunnerEvent::Sleep => Topic::Sleep,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RunnerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: RunnerEvent) -> usize {
        tracing::trace!(topic = %event.topic(), event = ?event, "Publishing runner event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to every topic.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topics: None,
        }
    }

    /// Subscribe to the given topics only.
    pub fn subscribe_to(&self, topics: &[Topic]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topics: Some(topics.to_vec()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<RunnerEvent>,
    topics: Option<Vec<Topic>>,
}

impl Subscription {
    fn wants(&self, event: &RunnerEvent) -> bool {
        self.topics
            .as_ref()
            .is_none_or(|topics| topics.contains(&event.topic()))
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<RunnerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Runner event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, if any.
    pub fn try_recv(&mut self) -> Option<RunnerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Runner event subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything queued right now, in publish order.
    pub fn drain(&mut self) -> Vec<RunnerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
