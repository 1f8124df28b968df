use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::NetConfig;
use crate::connection::Connection;
use crate::constants::TICK_INTERVAL;
use crate::error::NetError;
use crate::pool::WorkerPool;
use crate::registry::Registry;
use crate::services::Services;

/// State shared by every connection of one server.
pub struct ServerContext {
    pub config: NetConfig,
    pub registry: Registry<Connection>,
    pub pool: WorkerPool,
    pub services: Services,
    next_connection: AtomicU64,
    next_entity: AtomicI32,
}

impl ServerContext {
    pub(crate) fn next_connection_id(&self) -> u64 {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_entity_id(&self) -> i32 {
        self.next_entity.fetch_add(1, Ordering::Relaxed)
    }
}

pub struct Server {
    ctx: Arc<ServerContext>,
}

impl Server {
    pub fn new(config: NetConfig, services: Services) -> Result<Self, NetError> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads)?;
        debug!("Worker pool started with {} threads", pool.threads());
        Ok(Self {
            ctx: Arc::new(ServerContext {
                config,
                registry: Registry::new(),
                pool,
                services,
                next_connection: AtomicU64::new(1),
                next_entity: AtomicI32::new(1),
            }),
        })
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Take over an accepted stream and start its transport tasks.
    pub fn accept<S>(&self, stream: S, addr: SocketAddr) -> Arc<Connection>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (conn, outgoing) = Connection::new(Arc::clone(&self.ctx), addr);
        debug!("Accepted connection #{} from {addr}", conn.id());
        crate::session::spawn(Arc::clone(&conn), stream, outgoing);
        conn
    }

    /// Accept clients and drive ticks until `shutdown` turns `true`.
    pub async fn run(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), NetError> {
        info!("Listening on {}", listener.local_addr()?);
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {addr}: {e}");
                        }
                        self.accept(stream, addr);
                    }
                    Err(e) => warn!("Accept failed: {e}"),
                },
                _ = tick.tick() => self.tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One server tick: keep-alives and timeouts.
    pub fn tick(&self) {
        let now = Instant::now();
        self.ctx
            .registry
            .for_each(|conn| conn.tick_keep_alive(now), None);
    }

    /// Disconnect every player and wait for their releases.
    pub async fn shutdown(&self) {
        let connections = self.ctx.registry.snapshot(None);
        info!("Shutting down, disconnecting {} players", connections.len());
        for conn in &connections {
            conn.disconnect(NetError::ServerClosing);
        }
        let grace = self.ctx.config.flush_timeout * 2;
        for conn in connections {
            if timeout(grace, conn.wait_released()).await.is_err() {
                warn!("{conn} was not released within {grace:?}");
            }
        }
    }
}
