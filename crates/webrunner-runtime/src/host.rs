//! Collaborators the runner drives but does not own.
//!
//! The embedded view, the static file server behind it, the engine's
//! messaging layer, and the UI prompt are all supplied by the host shell.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use webrunner_core::CorrelatedEnvelope;

use crate::error::HostError;
use crate::services::{InitialServices, ServiceGroup};

pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, HostError>> + Send + 'a>>;

/// What the view needs to load the embedded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMount {
    pub url: String,
    pub injected_script: String,
}

/// The embedded web view hosting the wallet engine.
pub trait RunnerView: Send + Sync {
    /// Mount the view at `mount.url`. Replaces any earlier mount.
    fn mount(&self, mount: &ViewMount);

    fn unmount(&self);

    /// Evaluate a script inside the mounted page.
    fn inject_script(&self, script: &str);

    /// Reload the mounted page in place.
    fn reload(&self);
}

/// Local file server the page is loaded from on platforms that need one.
pub trait BackingServer: Send + Sync {
    fn is_running(&self) -> HostFuture<'_, bool>;

    fn start(&self) -> HostFuture<'_, ()>;
}

/// Start the server unless it already runs.
pub async fn ensure_running(server: &dyn BackingServer) -> Result<(), HostError> {
    if !server.is_running().await? {
        server.start().await?;
    }
    Ok(())
}

/// The engine-side request/response layer.
pub trait MessagingLayer: Send + Sync {
    /// Resolve a correlated response or subscription update.
    fn dispatch(&self, envelope: &CorrelatedEnvelope);

    /// Drop every pending request and subscription handler.
    fn reset_handler_maps(&self);

    fn init_services(&self, services: InitialServices) -> HostFuture<'_, ()>;

    fn start_services(&self, group: ServiceGroup) -> HostFuture<'_, ()>;
}

/// Raised when the Android system web view is too old for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub detected_major: u32,
    pub minimum_major: u32,
    /// Deep link to the system web view's store page.
    pub store_url: &'static str,
}

pub const WEBVIEW_STORE_URL: &str = "market://details?id=com.google.android.webview";

/// Presents the outdated web view warning.
///
/// Implementations keep re-presenting until the user acts, try
/// `store_url`, and fall back to a "use a device with Google Play Store"
/// warning when it cannot be opened.
pub trait UpdatePrompter: Send + Sync {
    fn prompt_update(&self, notice: &UpdateNotice);
}

/// Everything the runner talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub view: Arc<dyn RunnerView>,
    /// `None` where the page is read straight from the bundle.
    pub server: Option<Arc<dyn BackingServer>>,
    pub messaging: Arc<dyn MessagingLayer>,
    pub prompter: Arc<dyn UpdatePrompter>,
}
