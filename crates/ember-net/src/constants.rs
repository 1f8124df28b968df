use std::time::Duration;

/// Protocol numbers spoken by 1.7.2 (4) and 1.7.6-1.7.10 (5).
pub const SUPPORTED_PROTOCOLS: [i32; 2] = [4, 5];

/// Version name reported in the server list.
pub const VERSION_NAME: &str = "1.7.10";

/// How often the tick driver walks the registry.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Default interval between keep-alives.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Disconnect if a keep-alive is unanswered for this long.
pub const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Disconnect a client that sends nothing for this long before Play.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the best-effort flush when a connection closes.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity of each connection's outgoing frame queue.
pub const OUTGOING_QUEUE_CAPACITY: usize = 4096;

/// Maximum play frames waiting for dispatch on one connection.
pub const MAX_PENDING_FRAMES: usize = 1024;

/// Default view radius, in chunks.
pub const CHUNK_RADIUS: i32 = 5;

/// Largest view radius a client will render.
pub const MAX_CHUNK_RADIUS: i32 = 15;

/// Size of the transport read buffer.
pub const READ_BUF_SIZE: usize = 4096;

/// Names included in the status response player sample.
pub const STATUS_SAMPLE_SIZE: usize = 12;
