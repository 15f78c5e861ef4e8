//! HTTP server wrapper with a one-way `Idle -> Running -> Stopped` lifecycle.
//!
//! # Design
//! - `start` binds on the caller's thread so address errors surface
//!   immediately, then serves on a background task and returns.
//! - `stop` fires the graceful-shutdown signal once and waits for in-flight
//!   requests no longer than the supplied deadline before aborting the task.
//! - Serve and shutdown outcomes are logged rather than returned.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{HttpError, Result};
use crate::layers::with_request_tracing;

/// Host bound when none is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Port bound when none is configured.
pub const DEFAULT_PORT: u16 = 8080;

/// Option applied to a server before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOption {
    /// Host name or IP address to bind.
    Host(String),
    /// TCP port to bind; `0` picks an ephemeral port.
    Port(u16),
}

/// Bind address of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    fn apply(&mut self, option: ServerOption) {
        match option {
            ServerOption::Host(host) => self.host = host,
            ServerOption::Port(port) => self.port = port,
        }
    }
}

/// Lifecycle state of an [`HttpServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Configured but never started.
    Idle,
    /// Serving on a background task.
    Running,
    /// Shut down; cannot be restarted.
    Stopped,
}

struct Running {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Controllable HTTP server around an axum router.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    request_tracing: bool,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    running: Option<Running>,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpServer")
            .field("config", &self.config)
            .field("request_tracing", &self.request_tracing)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Server for `router` bound to the default host and port.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            config: ServerConfig::default(),
            request_tracing: true,
            state: ServerState::Idle,
            local_addr: None,
            running: None,
        }
    }

    /// Apply options in order; later options override earlier ones.
    #[must_use]
    pub fn apply(mut self, options: impl IntoIterator<Item = ServerOption>) -> Self {
        for option in options {
            self.config.apply(option);
        }
        self
    }

    /// Bind to `host`.
    #[must_use]
    pub fn with_host(self, host: impl Into<String>) -> Self {
        self.apply([ServerOption::Host(host.into())])
    }

    /// Bind to `port`.
    #[must_use]
    pub fn with_port(self, port: u16) -> Self {
        self.apply([ServerOption::Port(port)])
    }

    /// Toggle request-id and span middleware (enabled by default).
    #[must_use]
    pub fn with_request_tracing(mut self, enabled: bool) -> Self {
        self.request_tracing = enabled;
        self
    }

    /// Configured bind address.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Address actually bound, once started.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and begin serving on a background task.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the
    /// listener is bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the server was already started, no runtime is
    /// available, or the address cannot be bound.
    pub fn start(&mut self) -> Result<SocketAddr> {
        match self.state {
            ServerState::Running => return Err(HttpError::AlreadyRunning),
            ServerState::Stopped => return Err(HttpError::AlreadyStopped),
            ServerState::Idle => {}
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| HttpError::NoRuntime)?;

        let std_listener = std::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .map_err(|source| HttpError::Bind {
                host: self.config.host.clone(),
                port: self.config.port,
                source,
            })?;
        std_listener
            .set_nonblocking(true)
            .map_err(|source| HttpError::Listener { source })?;
        let addr = std_listener
            .local_addr()
            .map_err(|source| HttpError::Listener { source })?;
        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener).map_err(|source| HttpError::Listener { source })?
        };

        let router = if self.request_tracing {
            with_request_tracing(self.router.clone())
        } else {
            self.router.clone()
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        info!(%addr, "http server listening");
        let task = runtime.spawn(async move {
            let outcome = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                })
                .await;
            match outcome {
                Ok(()) => info!(%addr, "server graceful shutdown"),
                Err(err) => error!(%addr, error = %err, "server terminated unexpectedly"),
            }
        });

        self.running = Some(Running {
            shutdown: Some(shutdown_tx),
            task,
        });
        self.local_addr = Some(addr);
        self.state = ServerState::Running;
        Ok(addr)
    }

    /// Gracefully stop serving, waiting at most `deadline` for in-flight requests.
    ///
    /// Stopping a server that is not running only logs a warning.
    pub async fn stop(&mut self, deadline: Duration) {
        let Some(mut running) = self.running.take() else {
            warn!(state = ?self.state, "stop called on a server that is not running");
            return;
        };
        self.state = ServerState::Stopped;

        if let Some(shutdown) = running.shutdown.take()
            && shutdown.send(()).is_err()
        {
            warn!("http server task exited before shutdown was requested");
        }

        match tokio::time::timeout(deadline, &mut running.task).await {
            Ok(Ok(())) => info!(?deadline, "http server stopped"),
            Ok(Err(err)) => error!(error = %err, "http server task failed during shutdown"),
            Err(_) => {
                running.task.abort();
                error!(
                    ?deadline,
                    "http server shutdown deadline exceeded; aborting in-flight requests"
                );
            }
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self
            .running
            .as_mut()
            .and_then(|running| running.shutdown.take())
        {
            shutdown.send(()).ok();
        }
    }
}
