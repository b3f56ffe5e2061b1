//! Background service groups gated on the engine reaching `crypto_ready`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use webrunner_core::config::ServicesConfig;

use crate::host::MessagingLayer;
use crate::timer::{CommandSink, TimerKind, TimerSlot};

/// A group started after a delay so the engine is not flooded at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceGroup {
    Crowdloan,
    Staking,
    Nft,
}

impl ServiceGroup {
    pub const ALL: [ServiceGroup; 3] = [ServiceGroup::Crowdloan, ServiceGroup::Staking, ServiceGroup::Nft];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceGroup::Crowdloan => "crowdloan",
            ServiceGroup::Staking => "staking",
            ServiceGroup::Nft => "nft",
        }
    }

    /// What the group asks the engine to start.
    pub fn plan(&self) -> ServiceStart {
        match self {
            ServiceGroup::Crowdloan => ServiceStart {
                cron: vec![],
                subscription: vec!["crowdloan"],
            },
            ServiceGroup::Staking => ServiceStart {
                cron: vec!["staking"],
                subscription: vec!["staking"],
            },
            ServiceGroup::Nft => ServiceStart {
                cron: vec!["nft"],
                subscription: vec![],
            },
        }
    }

    fn delay(&self, config: &ServicesConfig) -> Duration {
        Duration::from_millis(match self {
            ServiceGroup::Crowdloan => config.crowdloan_delay_ms,
            ServiceGroup::Staking => config.staking_delay_ms,
            ServiceGroup::Nft => config.nft_delay_ms,
        })
    }
}

impl std::fmt::Display for ServiceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStart {
    pub cron: Vec<&'static str>,
    pub subscription: Vec<&'static str>,
}

/// Services started as soon as the engine is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialServices {
    pub subscription: Vec<&'static str>,
    pub cron: Vec<&'static str>,
    pub interval_map: BTreeMap<&'static str, u64>,
}

impl InitialServices {
    pub fn from_config(config: &ServicesConfig) -> Self {
        Self {
            subscription: vec!["chainRegistry", "balance"],
            cron: vec!["price", "history", "recoverApi", "checkApiStatus"],
            interval_map: config.cron.interval_map(),
        }
    }
}

/// Delay slots for the staggered groups.
#[derive(Debug)]
pub(crate) struct ServiceScheduler {
    slots: Vec<(ServiceGroup, TimerSlot)>,
}

impl ServiceScheduler {
    pub(crate) fn new() -> Self {
        Self {
            slots: ServiceGroup::ALL
                .into_iter()
                .map(|group| (group, TimerSlot::new(TimerKind::Service(group))))
                .collect(),
        }
    }

    /// Kick off the initial services now and arm every delayed group.
    pub(crate) fn schedule(
        &mut self,
        config: &ServicesConfig,
        messaging: &Arc<dyn MessagingLayer>,
        sink: &CommandSink,
    ) {
        let initial = InitialServices::from_config(config);
        let messaging = Arc::clone(messaging);
        tokio::spawn(async move {
            if let Err(e) = messaging.init_services(initial).await {
                tracing::error!(error = %e, "Init background services error");
            }
        });

        for (group, slot) in &mut self.slots {
            let delay = group.delay(config);
            tracing::debug!(group = %group, delay_ms = delay.as_millis() as u64, "Scheduling service group");
            slot.arm(delay, sink);
        }
    }

    pub(crate) fn slot_mut(&mut self, group: ServiceGroup) -> Option<&mut TimerSlot> {
        self.slots
            .iter_mut()
            .find(|(g, _)| *g == group)
            .map(|(_, slot)| slot)
    }

    pub(crate) fn clear(&mut self) {
        for (_, slot) in &mut self.slots {
            slot.clear();
        }
    }

    pub(crate) fn armed(&self) -> impl Iterator<Item = TimerKind> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_armed())
            .map(|(_, slot)| slot.kind())
    }
}

/// Start one group. Failures are logged and do not affect the others.
pub(crate) fn start_group(group: ServiceGroup, messaging: &Arc<dyn MessagingLayer>) {
    let messaging = Arc::clone(messaging);
    tokio::spawn(async move {
        tracing::info!(group = %group, "Starting background service group");
        if let Err(e) = messaging.start_services(group).await {
            tracing::error!(group = %group, error = %e, "Background service group failed to start");
        }
    });
}
