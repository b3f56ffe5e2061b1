use serde::{Deserialize, Serialize};

/// Status announced by the embedded runtime (or forced by the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStatus {
    Init,
    Loading,
    /// The wallet engine finished booting; background services may start.
    CryptoReady,
    Reloading,
    Sleep,
    /// Degraded: no liveness signal within the acceptable response window.
    OutOfResponseTime,
}

impl RunnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerStatus::Init => "init",
            RunnerStatus::Loading => "loading",
            RunnerStatus::CryptoReady => "crypto_ready",
            RunnerStatus::Reloading => "reloading",
            RunnerStatus::Sleep => "sleep",
            RunnerStatus::OutOfResponseTime => "out_of_response_time",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RunnerStatus::CryptoReady)
    }
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handshake details the embedded page reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub user_agent: String,
}

/// Shared runner state. One instance per runner, written only by the
/// runner task; everyone else receives copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerState {
    pub status: RunnerStatus,
    pub url: Option<String>,
    pub version: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for RunnerState {
    fn default() -> Self {
        Self {
            status: RunnerStatus::Init,
            url: None,
            version: Some("unknown".into()),
            user_agent: None,
        }
    }
}

impl RunnerState {
    pub fn apply_info(&mut self, info: &RunnerInfo) {
        self.url = Some(info.url.clone());
        self.version = info.version.clone();
        self.user_agent = Some(info.user_agent.clone());
    }

    /// Put the state in the shape it has while the view is unmounted.
    pub fn reset_for_sleep(&mut self) {
        self.status = RunnerStatus::Sleep;
        self.url = None;
        self.version = None;
    }
}
