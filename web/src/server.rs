use crate::events::EventBus;
use crate::handlers;
use crate::registry::SessionRegistry;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::Filter;

/// Listen address of the read-only admin surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    registry: Arc<SessionRegistry>,
}

impl AppContext {
    pub fn new(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        let event_bus = registry.event_bus();
        Self {
            config,
            event_bus,
            registry,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address: {0}")]
    Address(String),
    #[error("failed to bind admin server: {0}")]
    Bind(String),
}

pub struct WebServer;

impl WebServer {
    /// Binds the admin surface and serves it until the handle shuts it
    /// down.
    pub fn start(ctx: AppContext) -> Result<ServerHandle, ServerError> {
        let ip: IpAddr = ctx
            .config()
            .host()
            .parse()
            .map_err(|_| ServerError::Address(ctx.config().host().to_string()))?;
        let addr = SocketAddr::new(ip, ctx.config().port());
        let routes = admin_routes(ctx.registry());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (bound, serving) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async {
                let _ = shutdown_rx.await;
            })
            .map_err(|err| ServerError::Bind(err.to_string()))?;
        let task = tokio::spawn(serving);
        Ok(ServerHandle {
            addr: bound,
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

fn admin_routes(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_registry = warp::any().map(move || Arc::clone(&registry));

    let stats = warp::get()
        .and(warp::path!("stats"))
        .and(with_registry.clone())
        .then(handlers::admin::stats);
    let sessions = warp::get()
        .and(warp::path!("sessions"))
        .and(with_registry.clone())
        .then(handlers::admin::list_sessions);
    let session = warp::get()
        .and(with_registry)
        .and(warp::path!("sessions" / String))
        .then(handlers::admin::get_session);

    stats.or(sessions).or(session)
}
