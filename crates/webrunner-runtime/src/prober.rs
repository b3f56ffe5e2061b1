//! Liveness probing of the embedded runtime.
//!
//! Every probe interval a ping goes out and a check cycle begins. Each check
//! looks at how long ago the runtime last answered; a stale answer earns a
//! retry (another ping, another check) until `max_retry` retries are spent,
//! at which point the runner reloads the page. A fresh answer resets the
//! retry count and the cycle ends until the next interval.

use tokio::time::Instant;
use webrunner_core::config::ProbeConfig;

use crate::timer::{CommandSink, TimerKind, TimerSlot};

/// Per-cycle probe bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessTicket {
    pub retry_count: u32,
    pub last_response: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckOutcome {
    /// Answered within the timeout.
    Healthy,
    /// Stale; ping again. Carries the retry number, starting at 1.
    Retry(u32),
    /// Retries spent. The prober has stopped itself.
    Exhausted,
}

#[derive(Debug)]
pub(crate) struct LivenessProber {
    config: ProbeConfig,
    interval: TimerSlot,
    check: TimerSlot,
    ticket: LivenessTicket,
}

impl LivenessProber {
    pub(crate) fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            interval: TimerSlot::new(TimerKind::ProbeInterval),
            check: TimerSlot::new(TimerKind::ProbeCheck),
            ticket: LivenessTicket::default(),
        }
    }

    pub(crate) fn ticket(&self) -> LivenessTicket {
        self.ticket
    }

    pub(crate) fn is_running(&self) -> bool {
        self.interval.is_armed() || self.check.is_armed()
    }

    /// (Re)start the probe interval. Forgets any earlier response.
    pub(crate) fn start(&mut self, sink: &CommandSink) {
        self.stop();
        self.ticket = LivenessTicket::default();
        self.interval.arm(self.config.interval(), sink);
    }

    pub(crate) fn stop(&mut self) {
        self.interval.clear();
        self.check.clear();
    }

    pub(crate) fn record_response(&mut self, now: Instant) {
        self.ticket.last_response = Some(now);
    }

    pub(crate) fn interval_slot(&mut self) -> &mut TimerSlot {
        &mut self.interval
    }

    pub(crate) fn check_slot(&mut self) -> &mut TimerSlot {
        &mut self.check
    }

    /// The interval elapsed: re-arm it and begin a fresh check cycle. The
    /// caller sends the ping.
    ///
    /// A check cycle still retrying is left to run out, so its retries keep
    /// counting towards `max_retry` however short the interval is.
    pub(crate) fn on_interval(&mut self, sink: &CommandSink) {
        self.interval.arm(self.config.interval(), sink);
        if self.check.is_armed() {
            return;
        }
        self.ticket.retry_count = 0;
        self.check.arm(self.config.check_interval(), sink);
    }

    /// The check timer elapsed. On [`CheckOutcome::Retry`] the caller sends
    /// another ping; the next check is already armed.
    pub(crate) fn on_check(&mut self, now: Instant, sink: &CommandSink) -> CheckOutcome {
        let stale = match self.ticket.last_response {
            Some(at) => now.saturating_duration_since(at) > self.config.timeout(),
            None => true,
        };

        if !stale {
            self.ticket.retry_count = 0;
            return CheckOutcome::Healthy;
        }

        if self.ticket.retry_count < self.config.max_retry {
            self.ticket.retry_count += 1;
            self.check.arm(self.config.check_interval(), sink);
            CheckOutcome::Retry(self.ticket.retry_count)
        } else {
            self.stop();
            CheckOutcome::Exhausted
        }
    }

    pub(crate) fn armed(&self) -> impl Iterator<Item = TimerKind> + '_ {
        [&self.interval, &self.check]
            .into_iter()
            .filter(|slot| slot.is_armed())
            .map(|slot| slot.kind())
    }
}
