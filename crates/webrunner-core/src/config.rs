use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Liveness probe timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

fn default_probe_interval() -> u64 {
    9999
}
fn default_check_interval() -> u64 {
    999
}
fn default_probe_timeout() -> u64 {
    6666
}
fn default_max_retry() -> u32 {
    3
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_probe_interval(),
            check_interval_ms: default_check_interval(),
            timeout_ms: default_probe_timeout(),
            max_retry: default_max_retry(),
        }
    }
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleConfig {
    /// Background longer than this forces a reload on return.
    #[serde(default = "default_long_idle")]
    pub long_idle_ms: u64,
    /// Wait before resuming probes when the runtime was not ready.
    #[serde(default = "default_resume_grace")]
    pub resume_grace_ms: u64,
    #[serde(default = "default_response_overdue")]
    pub response_overdue_ms: u64,
}

fn default_long_idle() -> u64 {
    15 * 60 * 1000
}
fn default_resume_grace() -> u64 {
    9999
}
fn default_response_overdue() -> u64 {
    30_000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            long_idle_ms: default_long_idle(),
            resume_grace_ms: default_resume_grace(),
            response_overdue_ms: default_response_overdue(),
        }
    }
}

impl LifecycleConfig {
    pub fn long_idle(&self) -> Duration {
        Duration::from_millis(self.long_idle_ms)
    }

    pub fn resume_grace(&self) -> Duration {
        Duration::from_millis(self.resume_grace_ms)
    }

    pub fn response_overdue(&self) -> Duration {
        Duration::from_millis(self.response_overdue_ms)
    }
}

/// Staggered start of the background service groups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_crowdloan_delay")]
    pub crowdloan_delay_ms: u64,
    #[serde(default = "default_staking_delay")]
    pub staking_delay_ms: u64,
    #[serde(default = "default_nft_delay")]
    pub nft_delay_ms: u64,
    #[serde(default)]
    pub cron: CronIntervals,
}

fn default_crowdloan_delay() -> u64 {
    2000
}
fn default_staking_delay() -> u64 {
    4000
}
fn default_nft_delay() -> u64 {
    6000
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            crowdloan_delay_ms: default_crowdloan_delay(),
            staking_delay_ms: default_staking_delay(),
            nft_delay_ms: default_nft_delay(),
            cron: CronIntervals::default(),
        }
    }
}

/// Refresh intervals handed to the engine's cron scheduler, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CronIntervals {
    #[serde(default = "default_recover_api_map")]
    pub recover_api_map: u64,
    #[serde(default = "default_check_api_map_status")]
    pub check_api_map_status: u64,
    #[serde(default = "default_minute")]
    pub refresh_history: u64,
    #[serde(default = "default_minute")]
    pub refresh_nft: u64,
    #[serde(default = "default_refresh_price")]
    pub refresh_price: u64,
    #[serde(default = "default_minute")]
    pub refresh_stake_unlocking_info: u64,
    #[serde(default = "default_minute")]
    pub refresh_staking_reward: u64,
}

fn default_recover_api_map() -> u64 {
    20_000
}
fn default_check_api_map_status() -> u64 {
    5000
}
fn default_minute() -> u64 {
    60_000
}
fn default_refresh_price() -> u64 {
    30_000
}

impl Default for CronIntervals {
    fn default() -> Self {
        Self {
            recover_api_map: default_recover_api_map(),
            check_api_map_status: default_check_api_map_status(),
            refresh_history: default_minute(),
            refresh_nft: default_minute(),
            refresh_price: default_refresh_price(),
            refresh_stake_unlocking_info: default_minute(),
            refresh_staking_reward: default_minute(),
        }
    }
}

impl CronIntervals {
    /// Interval map keyed the way the engine names its cron jobs.
    pub fn interval_map(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("recoverApiMap", self.recover_api_map),
            ("checkApiMapStatus", self.check_api_map_status),
            ("refreshHistory", self.refresh_history),
            ("refreshNft", self.refresh_nft),
            ("refreshPrice", self.refresh_price),
            ("refreshStakeUnlockingInfo", self.refresh_stake_unlocking_info),
            ("refreshStakingReward", self.refresh_staking_reward),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Page is read from the bundled asset root; no server needed.
    #[default]
    Android,
    /// Page is served by a local static file server.
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub platform: Platform,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_build_version")]
    pub build_version: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_android_base")]
    pub android_base: String,
    /// Oldest Chrome major the Android system web view may report.
    #[serde(default = "default_min_webview_major")]
    pub min_webview_major: u32,
    #[serde(default)]
    pub show_console: bool,
}

fn default_app_version() -> String {
    "0.0.0".into()
}
fn default_build_version() -> String {
    "0".into()
}
fn default_server_port() -> u16 {
    9135
}
fn default_android_base() -> String {
    "file:///android_asset/Web.bundle/site".into()
}
fn default_min_webview_major() -> u32 {
    74
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            app_version: default_app_version(),
            build_version: default_build_version(),
            server_port: default_server_port(),
            android_base: default_android_base(),
            min_webview_major: default_min_webview_major(),
            show_console: false,
        }
    }
}

impl HostConfig {
    /// Root the embedded page is loaded from on this platform.
    pub fn base_url(&self) -> String {
        match self.platform {
            Platform::Android => self.android_base.clone(),
            Platform::Ios => format!("http://localhost:{}/site", self.server_port),
        }
    }
}

impl RunnerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default config location: ~/.webrunner/webrunner.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".webrunner")
            .join("webrunner.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.interval_ms == 0 {
            return Err(ConfigError::Invalid("probe.interval_ms must be non-zero".into()));
        }
        if self.probe.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe.check_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RunnerConfig::parse("").unwrap();
        assert_eq!(config.probe, ProbeConfig::default());
        assert_eq!(config.probe.interval(), Duration::from_millis(9999));
        assert_eq!(config.probe.max_retry, 3);
        assert_eq!(config.lifecycle.long_idle(), Duration::from_secs(900));
        assert_eq!(config.lifecycle.response_overdue(), Duration::from_secs(30));
        assert_eq!(config.host.platform, Platform::Android);
        assert_eq!(config.host.min_webview_major, 74);
    }

    #[test]
    fn parses_partial_sections() {
        let toml_str = r#"
[probe]
max_retry = 5

[host]
platform = "ios"
app_version = "1.1.2"
build_version = "212"
server_port = 9200
"#;
        let config = RunnerConfig::parse(toml_str).unwrap();
        assert_eq!(config.probe.max_retry, 5);
        assert_eq!(config.probe.timeout_ms, 6666);
        assert_eq!(config.host.platform, Platform::Ios);
        assert_eq!(config.host.base_url(), "http://localhost:9200/site");
    }

    #[test]
    fn android_base_is_the_asset_root() {
        let host = HostConfig::default();
        assert_eq!(host.base_url(), "file:///android_asset/Web.bundle/site");
    }

    #[test]
    fn rejects_zero_probe_interval() {
        let err = RunnerConfig::parse("[probe]\ninterval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn cron_map_uses_engine_names() {
        let map = CronIntervals::default().interval_map();
        assert_eq!(map["recoverApiMap"], 20_000);
        assert_eq!(map["refreshPrice"], 30_000);
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn loads_from_file_or_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");
        let config = RunnerConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.lifecycle, LifecycleConfig::default());

        let present = tmp.path().join("webrunner.toml");
        std::fs::write(&present, "[lifecycle]\nlong_idle_ms = 1000\n").unwrap();
        let config = RunnerConfig::load_or_default(&present).unwrap();
        assert_eq!(config.lifecycle.long_idle_ms, 1000);
    }
}
