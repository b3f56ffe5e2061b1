//! Host foreground and connectivity transitions.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use webrunner_core::RunnerStatus;

use crate::runner::WebRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Foreground,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReactorAction {
    /// Went to background.
    Suspend,
    /// Back after a long idle; the page's connections are not trusted.
    Reload,
    ResumeNow,
    ResumeAfterGrace,
}

/// Remembers what the host last reported so repeated reports are no-ops.
#[derive(Debug)]
pub(crate) struct ForegroundReactor {
    app_state: AppState,
    backgrounded_at: Option<Instant>,
    is_ready: bool,
    is_net_connected: bool,
}

impl ForegroundReactor {
    pub(crate) fn new() -> Self {
        Self {
            app_state: AppState::Foreground,
            backgrounded_at: None,
            is_ready: false,
            is_net_connected: true,
        }
    }

    pub(crate) fn app_state(&self) -> AppState {
        self.app_state
    }

    pub(crate) fn is_foreground(&self) -> bool {
        self.app_state == AppState::Foreground
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub(crate) fn is_net_connected(&self) -> bool {
        self.is_net_connected
    }

    pub(crate) fn on_app_state(
        &mut self,
        next: AppState,
        now: Instant,
        last_status: RunnerStatus,
        long_idle: Duration,
    ) -> Option<ReactorAction> {
        if next == self.app_state {
            return None;
        }
        self.app_state = next;

        match next {
            AppState::Background => {
                self.backgrounded_at = Some(now);
                Some(ReactorAction::Suspend)
            }
            AppState::Foreground => {
                let idle = self
                    .backgrounded_at
                    .take()
                    .map(|at| now.saturating_duration_since(at));
                if idle.is_some_and(|idle| idle > long_idle) {
                    Some(ReactorAction::Reload)
                } else if last_status.is_ready() {
                    Some(ReactorAction::ResumeNow)
                } else {
                    Some(ReactorAction::ResumeAfterGrace)
                }
            }
        }
    }

    /// Returns `true` when connectivity came back while foregrounded.
    pub(crate) fn on_connectivity(&mut self, reachable: Option<bool>) -> bool {
        let Some(reachable) = reachable else {
            return false;
        };
        let regained = !self.is_net_connected && reachable && self.is_foreground();
        self.is_net_connected = reachable;
        regained
    }

    /// Track readiness. Returns the new value when it changed.
    pub(crate) fn observe_status(&mut self, status: RunnerStatus) -> Option<bool> {
        let ready = status.is_ready();
        if ready == self.is_ready {
            return None;
        }
        self.is_ready = ready;
        Some(ready)
    }
}

impl WebRunner {
    pub(crate) fn on_app_state(&mut self, next: AppState) {
        let Some(action) = self.reactor.on_app_state(
            next,
            Instant::now(),
            self.state.status,
            self.config.lifecycle.long_idle(),
        ) else {
            return;
        };
        tracing::debug!(app_state = ?next, action = ?action, "App state changed");

        match action {
            ReactorAction::Suspend => self.stop_probing(),
            _ if self.activation_stalled() => {
                tracing::info!("Retrying web runner activation");
                self.activate();
            }
            ReactorAction::Reload => self.reload(),
            ReactorAction::ResumeNow => self.resume_probing(),
            ReactorAction::ResumeAfterGrace => {
                self.resume
                    .arm(self.config.lifecycle.resume_grace(), &self.sink);
            }
        }
    }

    pub(crate) fn on_connectivity(&mut self, reachable: Option<bool>) {
        if reachable == Some(false) && self.reactor.is_net_connected() {
            tracing::warn!("Network connection lost");
        }
        if self.reactor.on_connectivity(reachable) {
            tracing::info!("Network connection regained, reloading web runner");
            self.reload();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_IDLE: Duration = Duration::from_secs(15 * 60);

    #[tokio::test(start_paused = true)]
    async fn long_background_forces_reload() {
        let mut reactor = ForegroundReactor::new();
        let start = Instant::now();
        reactor.on_app_state(AppState::Background, start, RunnerStatus::CryptoReady, LONG_IDLE);

        let back = start + Duration::from_secs(20 * 60);
        assert_eq!(
            reactor.on_app_state(AppState::Foreground, back, RunnerStatus::CryptoReady, LONG_IDLE),
            Some(ReactorAction::Reload)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn short_background_resumes_by_status() {
        let mut reactor = ForegroundReactor::new();
        let start = Instant::now();
        let back = start + Duration::from_secs(120);

        reactor.on_app_state(AppState::Background, start, RunnerStatus::CryptoReady, LONG_IDLE);
        assert_eq!(
            reactor.on_app_state(AppState::Foreground, back, RunnerStatus::CryptoReady, LONG_IDLE),
            Some(ReactorAction::ResumeNow)
        );

        reactor.on_app_state(AppState::Background, start, RunnerStatus::Loading, LONG_IDLE);
        assert_eq!(
            reactor.on_app_state(AppState::Foreground, back, RunnerStatus::Loading, LONG_IDLE),
            Some(ReactorAction::ResumeAfterGrace)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_reports_are_ignored() {
        let mut reactor = ForegroundReactor::new();
        let now = Instant::now();
        assert_eq!(
            reactor.on_app_state(AppState::Foreground, now, RunnerStatus::Init, LONG_IDLE),
            None
        );
        reactor.on_app_state(AppState::Background, now, RunnerStatus::Init, LONG_IDLE);
        assert_eq!(
            reactor.on_app_state(AppState::Background, now, RunnerStatus::Init, LONG_IDLE),
            None
        );
    }

    #[test]
    fn connectivity_regained_only_counts_in_foreground() {
        let mut reactor = ForegroundReactor::new();
        assert!(!reactor.on_connectivity(Some(true)), "already connected");
        assert!(!reactor.on_connectivity(Some(false)));
        assert!(!reactor.on_connectivity(None), "unknown is ignored");
        assert!(!reactor.is_net_connected());
        assert!(reactor.on_connectivity(Some(true)));

        reactor.app_state = AppState::Background;
        reactor.on_connectivity(Some(false));
        assert!(!reactor.on_connectivity(Some(true)));
        assert!(reactor.is_net_connected());
    }

    #[test]
    fn readiness_reports_transitions_only() {
        let mut reactor = ForegroundReactor::new();
        assert_eq!(reactor.observe_status(RunnerStatus::Loading), None);
        assert_eq!(reactor.observe_status(RunnerStatus::CryptoReady), Some(true));
        assert_eq!(reactor.observe_status(RunnerStatus::CryptoReady), None);
        assert_eq!(reactor.observe_status(RunnerStatus::OutOfResponseTime), Some(false));
    }
}
