//! Host collaborators for headless runs.

use webrunner_core::CorrelatedEnvelope;
use webrunner_runtime::{
    HostFuture, InitialServices, MessagingLayer, RunnerView, ServiceGroup, UpdateNotice,
    UpdatePrompter, ViewMount,
};

use crate::output::{OutputLine, emit};

/// Writes every view effect to stdout.
pub struct StdoutView;

impl RunnerView for StdoutView {
    fn mount(&self, mount: &ViewMount) {
        emit(&OutputLine::Mount {
            url: &mount.url,
            script_bytes: mount.injected_script.len(),
        });
    }

    fn unmount(&self) {
        emit(&OutputLine::Unmount);
    }

    fn inject_script(&self, script: &str) {
        emit(&OutputLine::Inject { script });
    }

    fn reload(&self) {
        emit(&OutputLine::Reload);
    }
}

/// Stands in for the engine messaging layer. Never fails.
pub struct StubMessaging;

impl MessagingLayer for StubMessaging {
    fn dispatch(&self, envelope: &CorrelatedEnvelope) {
        emit(&OutputLine::Forwarded {
            envelope: &envelope.raw,
        });
    }

    fn reset_handler_maps(&self) {
        tracing::info!("Resetting handler maps");
    }

    fn init_services(&self, services: InitialServices) -> HostFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!(
                subscription = ?services.subscription,
                cron = ?services.cron,
                "Init background services"
            );
            Ok(())
        })
    }

    fn start_services(&self, group: ServiceGroup) -> HostFuture<'_, ()> {
        Box::pin(async move {
            let plan = group.plan();
            tracing::info!(
                group = %group,
                cron = ?plan.cron,
                subscription = ?plan.subscription,
                "Start background services"
            );
            Ok(())
        })
    }
}

pub struct LoggingPrompter;

impl UpdatePrompter for LoggingPrompter {
    fn prompt_update(&self, notice: &UpdateNotice) {
        tracing::warn!(
            detected = notice.detected_major,
            minimum = notice.minimum_major,
            "System web view needs an update"
        );
        emit(&OutputLine::UpdatePrompt {
            detected_major: notice.detected_major,
            minimum_major: notice.minimum_major,
            store_url: notice.store_url,
        });
    }
}
