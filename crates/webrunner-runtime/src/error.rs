use thiserror::Error;

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("backing server failed to start: {0}")]
    ServerStart(String),

    #[error("backing server state unavailable: {0}")]
    ServerProbe(String),

    #[error("service group {group} failed to start: {reason}")]
    ServiceStart { group: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runner task has stopped")]
    RunnerGone,
}
