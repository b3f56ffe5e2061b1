//! The runner task.
//!
//! A single task owns every piece of mutable bridge state and processes
//! [`Command`]s in arrival order. Host calls, inbound envelopes, and timer
//! expiries all arrive on the same queue, so no state is ever shared.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use webrunner_core::{EventBus, PingEnvelope, RunnerConfig, RunnerEvent, RunnerState, RunnerStatus, Subscription};

use crate::error::{HostError, RuntimeError};
use crate::host::Collaborators;
use crate::lifecycle::{Activation, LifecyclePhase};
use crate::prober::{CheckOutcome, LivenessProber};
use crate::reactor::{AppState, ForegroundReactor};
use crate::services::{ServiceScheduler, start_group};
use crate::timer::{CommandSink, TimerFired, TimerKind, TimerSlot};

#[derive(Debug)]
pub(crate) enum Command {
    Activate,
    Sleep,
    Rerender,
    Reload,
    Inbound(String),
    AppState(AppState),
    Connectivity(Option<bool>),
    Timer(TimerFired),
    Provisioned {
        attempt: u64,
        result: Result<(), HostError>,
    },
    Snapshot(oneshot::Sender<RunnerSnapshot>),
}

/// Point-in-time view of the runner, for UI consumers and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerSnapshot {
    pub state: RunnerState,
    pub phase: LifecyclePhase,
    pub app_state: AppState,
    pub is_ready: bool,
    pub is_net_connected: bool,
    pub probe_retry: u32,
    pub armed_timers: Vec<TimerKind>,
}

impl RunnerSnapshot {
    pub fn is_probing(&self) -> bool {
        self.armed_timers
            .iter()
            .any(|k| matches!(k, TimerKind::ProbeInterval | TimerKind::ProbeCheck))
    }
}

pub struct WebRunner {
    pub(crate) config: RunnerConfig,
    pub(crate) host: Collaborators,
    pub(crate) bus: EventBus,
    pub(crate) state: RunnerState,
    pub(crate) phase: LifecyclePhase,
    pub(crate) activation: Activation,
    pub(crate) prober: LivenessProber,
    pub(crate) overdue: TimerSlot,
    pub(crate) resume: TimerSlot,
    pub(crate) services: ServiceScheduler,
    pub(crate) reactor: ForegroundReactor,
    pub(crate) sink: CommandSink,
}

impl WebRunner {
    /// Spawn the runner task. It stops once every handle is dropped.
    pub fn spawn(
        config: RunnerConfig,
        host: Collaborators,
        bus: EventBus,
    ) -> (WebRunnerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = WebRunner {
            prober: LivenessProber::new(config.probe.clone()),
            config,
            host,
            bus: bus.clone(),
            state: RunnerState::default(),
            phase: LifecyclePhase::Inactive,
            activation: Activation::default(),
            overdue: TimerSlot::new(TimerKind::ResponseOverdue),
            resume: TimerSlot::new(TimerKind::ResumeGrace),
            services: ServiceScheduler::new(),
            reactor: ForegroundReactor::new(),
            sink: CommandSink::new(&tx),
        };
        let task = tokio::spawn(runner.run(rx));
        (WebRunnerHandle { tx, bus }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Web runner task started");
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        tracing::debug!("Web runner task stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Activate => self.activate(),
            Command::Sleep => self.sleep(),
            Command::Rerender => self.rerender(),
            Command::Reload => self.reload(),
            Command::Inbound(raw) => self.on_inbound(&raw),
            Command::AppState(next) => self.on_app_state(next),
            Command::Connectivity(reachable) => self.on_connectivity(reachable),
            Command::Timer(fired) => self.on_timer(fired),
            Command::Provisioned { attempt, result } => self.finish_activation(attempt, result),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn on_timer(&mut self, fired: TimerFired) {
        match fired.kind {
            TimerKind::ProbeInterval => {
                if self.prober.interval_slot().accept(&fired) {
                    self.prober.on_interval(&self.sink);
                    self.ping();
                }
            }
            TimerKind::ProbeCheck => {
                if self.prober.check_slot().accept(&fired) {
                    match self.prober.on_check(Instant::now(), &self.sink) {
                        CheckOutcome::Healthy => tracing::trace!("Web runner answered in time"),
                        CheckOutcome::Retry(retry) => {
                            tracing::debug!(retry, "Web runner answer overdue, pinging again");
                            self.ping();
                        }
                        CheckOutcome::Exhausted => {
                            tracing::warn!("Reload the web runner, probe retries exhausted");
                            self.reload();
                        }
                    }
                }
            }
            TimerKind::ResponseOverdue => {
                if self.overdue.accept(&fired) {
                    tracing::info!("No response from web runner within acceptable time");
                    self.publish_status(RunnerStatus::OutOfResponseTime);
                }
            }
            TimerKind::ResumeGrace => {
                if self.resume.accept(&fired) {
                    self.resume_probing();
                }
            }
            TimerKind::Service(group) => {
                if let Some(slot) = self.services.slot_mut(group)
                    && slot.accept(&fired)
                {
                    start_group(group, &self.host.messaging);
                }
            }
        }
    }

    /// Post a probe into the page.
    pub(crate) fn ping(&self) {
        let ping = PingEnvelope::new();
        tracing::trace!(id = %ping.id, "Pinging web runner");
        self.host.view.inject_script(&ping.injection_script());
    }

    pub(crate) fn start_probing(&mut self) {
        if self.phase != LifecyclePhase::Active {
            tracing::debug!(phase = ?self.phase, "Web runner not active, not probing");
            return;
        }
        tracing::debug!(restart = self.prober.is_running(), "Starting liveness probe");
        self.prober.start(&self.sink);
    }

    /// Stop the prober and everything that hangs off it.
    pub(crate) fn stop_probing(&mut self) {
        self.prober.stop();
        self.overdue.clear();
        self.resume.clear();
    }

    /// Probe right away, then settle into the regular interval.
    pub(crate) fn resume_probing(&mut self) {
        if self.phase != LifecyclePhase::Active || !self.reactor.is_foreground() {
            return;
        }
        self.ping();
        self.start_probing();
    }

    pub(crate) fn publish_status(&mut self, status: RunnerStatus) {
        self.bus.publish(RunnerEvent::UpdateStatus(status));
        if let Some(ready) = self.reactor.observe_status(status) {
            tracing::info!(ready, "Web runner readiness changed");
        }
    }

    pub(crate) fn snapshot(&self) -> RunnerSnapshot {
        let mut armed_timers: Vec<TimerKind> = self
            .prober
            .armed()
            .chain(self.services.armed())
            .chain([&self.overdue, &self.resume].into_iter().filter(|s| s.is_armed()).map(|s| s.kind()))
            .collect();
        armed_timers.sort();
        RunnerSnapshot {
            state: self.state.clone(),
            phase: self.phase,
            app_state: self.reactor.app_state(),
            is_ready: self.reactor.is_ready(),
            is_net_connected: self.reactor.is_net_connected(),
            probe_retry: self.prober.ticket().retry_count,
            armed_timers,
        }
    }
}

/// Cloneable front door to a spawned [`WebRunner`].
#[derive(Debug, Clone)]
pub struct WebRunnerHandle {
    tx: mpsc::UnboundedSender<Command>,
    bus: EventBus,
}

impl WebRunnerHandle {
    fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.tx.send(command).map_err(|_| RuntimeError::RunnerGone)
    }

    /// Provision the backing server and mount the view.
    pub fn activate(&self) -> Result<(), RuntimeError> {
        self.send(Command::Activate)
    }

    /// Stop probing and unmount the view.
    pub fn sleep(&self) -> Result<(), RuntimeError> {
        self.send(Command::Sleep)
    }

    pub fn rerender(&self) -> Result<(), RuntimeError> {
        self.send(Command::Rerender)
    }

    pub fn reload(&self) -> Result<(), RuntimeError> {
        self.send(Command::Reload)
    }

    /// Hand over a raw envelope posted by the page.
    pub fn deliver(&self, raw: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::Inbound(raw.into()))
    }

    pub fn app_state_changed(&self, state: AppState) -> Result<(), RuntimeError> {
        self.send(Command::AppState(state))
    }

    /// Report internet reachability. `None` means unknown and is ignored.
    pub fn connectivity_changed(&self, reachable: Option<bool>) -> Result<(), RuntimeError> {
        self.send(Command::Connectivity(reachable))
    }

    pub async fn snapshot(&self) -> Result<RunnerSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| RuntimeError::RunnerGone)
    }

    pub fn events(&self) -> Subscription {
        self.bus.subscribe()
    }
}
