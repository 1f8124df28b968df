use std::path::Path;
use std::time::Duration;

use ember_net::{DistanceMetric, NetConfig, OrderingPolicy};
use ember_proto::packets::status::favicon_data_uri;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub network: NetworkSection,
    pub world: WorldSection,
    pub dispatch: DispatchSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub address: String,
    pub port: u16,
    pub motd: String,
    pub max_players: usize,
    pub gamemode: String,
    pub difficulty: String,
    /// Path to a 64x64 PNG shown in the server list.
    pub favicon: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 25565,
            motd: "An Ember server".into(),
            max_players: 20,
            gamemode: "creative".into(),
            difficulty: "peaceful".into(),
            favicon: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub max_frame_len: usize,
    pub outgoing_queue_capacity: usize,
    pub max_pending_frames: usize,
    /// 0 = one per available core.
    pub worker_threads: usize,
    pub keep_alive_interval_secs: u64,
    pub keep_alive_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub flush_timeout_ms: u64,
    pub protocol_versions: Vec<i32>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        let net = NetConfig::default();
        Self {
            max_frame_len: net.max_frame_len,
            outgoing_queue_capacity: net.outgoing_queue_capacity,
            max_pending_frames: net.max_pending_frames,
            worker_threads: 0,
            keep_alive_interval_secs: net.keep_alive_interval.as_secs(),
            keep_alive_timeout_secs: net.keep_alive_timeout.as_secs(),
            read_timeout_secs: net.read_timeout.as_secs(),
            flush_timeout_ms: net.flush_timeout.as_millis() as u64,
            protocol_versions: net.protocol_versions,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub name: String,
    /// Block ids of the flat layers, bottom first.
    pub layers: Vec<u8>,
    pub view_distance: i32,
    pub distance_metric: DistanceMetric,
    /// Directory holding one JSON profile per player.
    pub players_dir: String,
    /// Generated columns kept in memory.
    pub chunk_cache: usize,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: "world".into(),
            layers: vec![7, 3, 3, 2],
            view_distance: ember_net::constants::CHUNK_RADIUS,
            distance_metric: DistanceMetric::Square,
            players_dir: "players".into(),
            chunk_cache: 4096,
        }
    }
}

/// One order-sensitive class of play packets.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderClassSection {
    pub name: String,
    pub packets: Vec<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    #[serde(rename = "class")]
    pub classes: Vec<OrderClassSection>,
}

impl Default for DispatchSection {
    fn default() -> Self {
        let classes = [
            ("movement", vec![0x03, 0x04, 0x05, 0x06, 0x16]),
            ("inventory", vec![0x09, 0x0D, 0x0E, 0x10]),
            ("world", vec![0x07, 0x08]),
            ("chat", vec![0x01]),
        ];
        Self {
            classes: classes
                .into_iter()
                .map(|(name, packets)| OrderClassSection {
                    name: name.into(),
                    packets,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

fn gamemode_to_numeric(gamemode: &str) -> Result<u8, String> {
    match gamemode.to_lowercase().as_str() {
        "survival" => Ok(0),
        "creative" => Ok(1),
        "adventure" => Ok(2),
        other => Err(format!("unknown gamemode {other:?}")),
    }
}

fn difficulty_to_numeric(difficulty: &str) -> Result<u8, String> {
    match difficulty.to_lowercase().as_str() {
        "peaceful" => Ok(0),
        "easy" => Ok(1),
        "normal" => Ok(2),
        "hard" => Ok(3),
        other => Err(format!("unknown difficulty {other:?}")),
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults if the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Settings for the connection core. Reads the favicon file, if any.
    pub fn net_config(&self) -> Result<NetConfig, Box<dyn std::error::Error>> {
        let defaults = NetConfig::default();
        let network = &self.network;

        let favicon = match &self.server.favicon {
            Some(path) => Some(favicon_data_uri(&std::fs::read(path)?)),
            None => None,
        };
        let ordering = OrderingPolicy::new(
            self.dispatch
                .classes
                .iter()
                .map(|c| (c.name.clone(), c.packets.clone())),
        )?;

        let config = NetConfig {
            max_frame_len: network.max_frame_len,
            outgoing_queue_capacity: network.outgoing_queue_capacity,
            max_pending_frames: network.max_pending_frames,
            worker_threads: match network.worker_threads {
                0 => defaults.worker_threads,
                n => n,
            },
            chunk_radius: self.world.view_distance,
            distance_metric: self.world.distance_metric,
            keep_alive_interval: Duration::from_secs(network.keep_alive_interval_secs),
            keep_alive_timeout: Duration::from_secs(network.keep_alive_timeout_secs),
            read_timeout: Duration::from_secs(network.read_timeout_secs),
            flush_timeout: Duration::from_millis(network.flush_timeout_ms),
            max_players: self.server.max_players,
            motd: self.server.motd.clone(),
            favicon,
            version_name: defaults.version_name,
            protocol_versions: network.protocol_versions.clone(),
            gamemode: gamemode_to_numeric(&self.server.gamemode)?,
            difficulty: difficulty_to_numeric(&self.server.difficulty)?,
            ordering,
        };
        config.validate()?;
        Ok(config)
    }
}
