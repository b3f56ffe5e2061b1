//! Runtime for the WebRunner bridge.
//!
//! The wallet engine runs in an embedded web page. [`WebRunner`] keeps that
//! page provisioned and mounted, probes it for liveness and reloads it when
//! it stops answering, relays its envelopes, and follows the host app
//! between foreground and background.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use webrunner_core::{EventBus, RunnerConfig};
//! use webrunner_runtime::{AppState, Collaborators, WebRunner};
//!
//! # async fn run(host: Collaborators) -> Result<(), webrunner_runtime::RuntimeError> {
//! let (runner, _task) = WebRunner::spawn(RunnerConfig::default(), host, EventBus::new());
//! let mut events = runner.events();
//!
//! runner.activate()?;
//! // Wire the view's message callback:
//! runner.deliver(r#"{"id":"0","response":{"status":"crypto_ready"}}"#)?;
//! // And the host's app state listener:
//! runner.app_state_changed(AppState::Background)?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod host;
pub mod lifecycle;
pub mod prober;
pub mod reactor;
pub mod relay;
pub mod runner;
pub mod services;
pub mod timer;

pub use error::{HostError, RuntimeError};
pub use host::{BackingServer, Collaborators, HostFuture, MessagingLayer, RunnerView, UpdateNotice, UpdatePrompter, ViewMount};
pub use lifecycle::{LifecyclePhase, initial_address};
pub use prober::LivenessTicket;
pub use reactor::AppState;
pub use runner::{RunnerSnapshot, WebRunner, WebRunnerHandle};
pub use services::{InitialServices, ServiceGroup, ServiceStart};
pub use timer::TimerKind;
