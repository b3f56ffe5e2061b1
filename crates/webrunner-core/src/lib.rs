//! Wire vocabulary for the WebRunner bridge.
//!
//! The embedded wallet engine runs inside a web view; this crate defines
//! what crosses that boundary ([`Inbound`], [`PingEnvelope`]), the shared
//! [`RunnerState`], the typed [`EventBus`] UI consumers subscribe to, and
//! the [`RunnerConfig`] file. The runtime that drives it lives in
//! `webrunner-runtime`.

pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod script;
pub mod status;

pub use config::{Platform, RunnerConfig};
pub use envelope::{ConsoleLevel, ConsoleLine, CorrelatedEnvelope, Inbound, PingEnvelope};
pub use error::{ConfigError, EnvelopeError};
pub use events::{EventBus, RunnerEvent, Subscription, Topic};
pub use status::{RunnerInfo, RunnerState, RunnerStatus};
