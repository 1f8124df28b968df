use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::dispatch::OrderingPolicy;
use crate::error::NetError;

/// Metric deciding which chunks lie within the view radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Chebyshev distance: a square of side `2r + 1`.
    #[default]
    Square,
    /// Euclidean distance: a disc of radius `r`.
    Circle,
}

/// Runtime settings of the connection core.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Largest declared frame length accepted from a client.
    pub max_frame_len: usize,
    pub outgoing_queue_capacity: usize,
    pub max_pending_frames: usize,
    pub worker_threads: usize,
    pub chunk_radius: i32,
    pub distance_metric: DistanceMetric,
    pub keep_alive_interval: Duration,
    pub keep_alive_timeout: Duration,
    pub read_timeout: Duration,
    pub flush_timeout: Duration,
    pub max_players: usize,
    pub motd: String,
    /// `data:image/png;base64,...` URI, if a server icon is configured.
    pub favicon: Option<String>,
    pub version_name: String,
    /// Accepted protocol numbers, ascending.
    pub protocol_versions: Vec<i32>,
    pub gamemode: u8,
    pub difficulty: u8,
    pub ordering: OrderingPolicy,
}

impl NetConfig {
    pub fn validate(&self) -> Result<(), NetError> {
        if self.protocol_versions.is_empty() {
            return Err(NetError::InvalidConfig(
                "at least one protocol version is required".into(),
            ));
        }
        if !(1..=MAX_CHUNK_RADIUS).contains(&self.chunk_radius) {
            return Err(NetError::InvalidConfig(format!(
                "chunk radius must be between 1 and {MAX_CHUNK_RADIUS}, got {}",
                self.chunk_radius
            )));
        }
        if self.outgoing_queue_capacity == 0 || self.max_pending_frames == 0 {
            return Err(NetError::InvalidConfig("queue sizes must be non-zero".into()));
        }
        // A world change unloads the whole view and requests a new one.
        let burst = 2 * self.view_columns();
        if self.outgoing_queue_capacity < burst {
            return Err(NetError::InvalidConfig(format!(
                "outgoing queue of {} frames cannot hold a radius {} view change ({burst} frames)",
                self.outgoing_queue_capacity, self.chunk_radius
            )));
        }
        Ok(())
    }

    /// Columns in a full view at the configured radius.
    pub fn view_columns(&self) -> usize {
        let side = 2 * self.chunk_radius.max(0) as usize + 1;
        side * side
    }

    /// Check a client's protocol number against the accepted set.
    pub fn check_protocol(&self, client: i32) -> Result<(), NetError> {
        if self.protocol_versions.contains(&client) {
            return Ok(());
        }
        let newest = self.protocol_versions.iter().copied().max().unwrap_or(client);
        if client > newest {
            Err(NetError::OutdatedServer {
                client,
                server: newest,
            })
        } else {
            Err(NetError::OutdatedClient {
                client,
                server: newest,
            })
        }
    }

    /// Protocol number advertised in the status response.
    pub fn advertised_protocol(&self, client: i32) -> i32 {
        if self.protocol_versions.contains(&client) {
            client
        } else {
            self.protocol_versions.iter().copied().max().unwrap_or(client)
        }
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_frame_len: ember_proto::frame::DEFAULT_MAX_FRAME_LEN,
            outgoing_queue_capacity: OUTGOING_QUEUE_CAPACITY,
            max_pending_frames: MAX_PENDING_FRAMES,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            chunk_radius: CHUNK_RADIUS,
            distance_metric: DistanceMetric::Square,
            keep_alive_interval: KEEP_ALIVE_INTERVAL,
            keep_alive_timeout: KEEP_ALIVE_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            flush_timeout: FLUSH_TIMEOUT,
            max_players: 20,
            motd: "An Ember server".into(),
            favicon: None,
            version_name: VERSION_NAME.into(),
            protocol_versions: SUPPORTED_PROTOCOLS.to_vec(),
            gamemode: 1,
            difficulty: 0,
            ordering: OrderingPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunk_radius, 5);
        assert_eq!(config.max_frame_len, 2 * 1024 * 1024);
    }

    #[test]
    fn protocol_check() {
        let config = NetConfig::default();
        assert!(config.check_protocol(4).is_ok());
        assert!(config.check_protocol(5).is_ok());
        assert!(matches!(
            config.check_protocol(3),
            Err(NetError::OutdatedClient { client: 3, server: 5 })
        ));
        assert!(matches!(
            config.check_protocol(47),
            Err(NetError::OutdatedServer { client: 47, .. })
        ));
        assert_eq!(config.advertised_protocol(4), 4);
        assert_eq!(config.advertised_protocol(47), 5);
    }

    #[test]
    fn rejects_empty_protocol_list() {
        let config = NetConfig {
            protocol_versions: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn radius_must_fit_the_outgoing_queue() {
        let too_far = NetConfig {
            chunk_radius: 32,
            ..Default::default()
        };
        assert!(matches!(too_far.validate(), Err(NetError::InvalidConfig(_))));

        let widest = NetConfig {
            chunk_radius: MAX_CHUNK_RADIUS,
            ..Default::default()
        };
        widest.validate().unwrap();
        assert_eq!(widest.view_columns(), 961);

        let small_queue = NetConfig {
            chunk_radius: 10,
            outgoing_queue_capacity: 500,
            ..Default::default()
        };
        assert!(small_queue.validate().is_err());

        let zero = NetConfig {
            chunk_radius: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
