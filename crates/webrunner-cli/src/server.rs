//! Local static file server for ios-style runs.
//!
//! Serves `/site/<path>` from the bundle directory. Without a bundle a
//! placeholder page answers `/site/index.html` so the view has something
//! to mount.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use webrunner_runtime::{BackingServer, HostError, HostFuture};

const PLACEHOLDER: &str = "<!doctype html><title>webrunner</title><p>headless</p>";

#[derive(Default)]
struct Serving {
    task: Option<JoinHandle<()>>,
    addr: Option<SocketAddr>,
}

pub struct StaticServer {
    port: u16,
    root: Option<PathBuf>,
    serving: Mutex<Serving>,
}

impl StaticServer {
    pub fn new(port: u16, root: Option<PathBuf>) -> Self {
        Self {
            port,
            root,
            serving: Mutex::new(Serving::default()),
        }
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.serving.lock().ok().and_then(|s| s.addr)
    }

    fn running(&self) -> Result<bool, HostError> {
        let serving = self
            .serving
            .lock()
            .map_err(|_| HostError::ServerProbe("server state poisoned".into()))?;
        Ok(serving.task.as_ref().is_some_and(|t| !t.is_finished()))
    }
}

fn router(root: Option<&Path>) -> Router {
    match root {
        Some(root) => Router::new().nest_service("/site", ServeDir::new(root)),
        None => Router::new().route("/site/index.html", get(|| async { Html(PLACEHOLDER) })),
    }
}

impl BackingServer for StaticServer {
    fn is_running(&self) -> HostFuture<'_, bool> {
        Box::pin(async move { self.running() })
    }

    fn start(&self) -> HostFuture<'_, ()> {
        Box::pin(async move {
            if self.running()? {
                return Ok(());
            }
            let listener = TcpListener::bind(("127.0.0.1", self.port))
                .await
                .map_err(|e| HostError::ServerStart(e.to_string()))?;
            let addr = listener
                .local_addr()
                .map_err(|e| HostError::ServerStart(e.to_string()))?;
            tracing::info!(%addr, root = ?self.root, "Static server listening");

            let app = router(self.root.as_deref());
            let handle = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "Static server stopped");
                }
            });

            let mut serving = self
                .serving
                .lock()
                .map_err(|_| HostError::ServerStart("server state poisoned".into()))?;
            serving.task = Some(handle);
            serving.addr = Some(addr);
            Ok(())
        })
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Ok(serving) = self.serving.get_mut()
            && let Some(handle) = serving.task.take()
        {
            handle.abort();
        }
    }
}
