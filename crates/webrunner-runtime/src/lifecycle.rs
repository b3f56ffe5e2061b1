//! Provisioning and teardown of the embedded page.
//!
//! `inactive → activating → active`, and back to `inactive` on sleep. A
//! failed provisioning parks the runner in `activating` until the next
//! explicit activation.

use serde::Serialize;
use webrunner_core::config::HostConfig;
use webrunner_core::script::bootstrap_script;
use webrunner_core::{RunnerEvent, RunnerStatus};

use crate::error::HostError;
use crate::host::{ViewMount, ensure_running};
use crate::runner::{Command, WebRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Inactive,
    Activating,
    Active,
}

/// Tracks provisioning attempts so a late result from an abandoned attempt
/// is ignored.
#[derive(Debug, Default)]
pub(crate) struct Activation {
    attempt: u64,
    in_flight: bool,
}

/// Address the view loads, e.g.
/// `http://localhost:9135/site/index.html?platform=ios&version=1.0&build=10&time=1700000000000`.
pub fn initial_address(host: &HostConfig, time_ms: i64) -> String {
    format!(
        "{}/index.html?platform={}&version={}&build={}&time={}",
        host.base_url(),
        host.platform,
        host.app_version,
        host.build_version,
        time_ms
    )
}

impl WebRunner {
    /// Provisioning failed and nothing is retrying it.
    pub(crate) fn activation_stalled(&self) -> bool {
        self.phase == LifecyclePhase::Activating && !self.activation.in_flight
    }

    pub(crate) fn activate(&mut self) {
        match self.phase {
            LifecyclePhase::Active => return,
            LifecyclePhase::Activating if self.activation.in_flight => return,
            _ => {}
        }

        self.phase = LifecyclePhase::Activating;
        self.activation.attempt += 1;
        self.activation.in_flight = true;
        let attempt = self.activation.attempt;
        tracing::info!(attempt, "Activating web runner");

        match self.host.server.clone() {
            None => self.finish_activation(attempt, Ok(())),
            Some(server) => {
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    let result = ensure_running(server.as_ref()).await;
                    sink.send(Command::Provisioned { attempt, result });
                });
            }
        }
    }

    pub(crate) fn finish_activation(&mut self, attempt: u64, result: Result<(), HostError>) {
        if attempt != self.activation.attempt || self.phase != LifecyclePhase::Activating {
            tracing::debug!(attempt, "Ignoring result of abandoned activation");
            return;
        }
        self.activation.in_flight = false;

        if let Err(e) = result {
            tracing::error!(attempt, error = %e, "Failed to provision web runner");
            return;
        }

        let mount = ViewMount {
            url: initial_address(&self.config.host, chrono::Utc::now().timestamp_millis()),
            injected_script: bootstrap_script(self.config.host.show_console),
        };
        self.phase = LifecyclePhase::Active;
        tracing::info!(url = %mount.url, "Web runner active");
        self.host.view.mount(&mount);
    }

    pub(crate) fn sleep(&mut self) {
        self.stop_probing();
        self.services.clear();
        self.activation.in_flight = false;

        if self.phase == LifecyclePhase::Inactive {
            return;
        }
        self.phase = LifecyclePhase::Inactive;
        self.host.view.unmount();
        self.state.reset_for_sleep();
        tracing::info!("Web runner asleep");
        self.publish_status(RunnerStatus::Sleep);
        self.bus.publish(RunnerEvent::Sleep);
    }

    /// Show a reloading status without touching the page or the server.
    pub(crate) fn rerender(&mut self) {
        self.state.status = RunnerStatus::Reloading;
        self.publish_status(RunnerStatus::Reloading);
        self.bus.publish(RunnerEvent::Reloading);
    }

    /// Reload the page in place. The runner stays active.
    pub(crate) fn reload(&mut self) {
        if self.phase != LifecyclePhase::Active {
            tracing::debug!(phase = ?self.phase, "Web runner not mounted, nothing to reload");
            return;
        }
        tracing::info!("Reloading web runner");
        self.stop_probing();
        self.services.clear();
        self.state.status = RunnerStatus::Reloading;
        self.publish_status(RunnerStatus::Reloading);
        self.host.messaging.reset_handler_maps();
        self.host.view.reload();
    }
}
