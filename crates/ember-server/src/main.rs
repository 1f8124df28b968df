mod config;
mod persistence;
mod world;

use std::net::SocketAddr;
use std::sync::Arc;

use config::ServerConfig;
use ember_net::{NoHooks, OfflineAuthenticator, Server, Services};
use persistence::JsonProfileStore;
use tokio::net::TcpListener;
use tracing::{error, info};
use world::FlatWorld;

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load_or_default("server.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load server.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let net_config = match config.net_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Ember v{} starting on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.address,
        config.server.port
    );
    info!("MOTD: {}", config.server.motd);
    info!("Max players: {}", config.server.max_players);
    info!(
        "Gamemode: {}, Difficulty: {}",
        config.server.gamemode, config.server.difficulty
    );
    info!(
        "World: {} ({} layers, view distance {})",
        config.world.name,
        config.world.layers.len(),
        config.world.view_distance
    );

    let addr: SocketAddr = match format!("{}:{}", config.server.address, config.server.port).parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address: {e}");
            std::process::exit(1);
        }
    };

    let services = Services {
        auth: Arc::new(OfflineAuthenticator),
        profiles: Arc::new(JsonProfileStore::new(&config.world.players_dir)),
        world: Arc::new(FlatWorld::new(
            config.world.name.clone(),
            config.world.layers.clone(),
            config.world.chunk_cache,
        )),
        hooks: Arc::new(NoHooks),
    };

    let server = match Server::new(net_config, services) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = server.run(listener, shutdown_rx).await {
        error!("Server stopped: {e}");
    }
    info!("Server shut down.");
}
