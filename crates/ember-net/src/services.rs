//! Boundaries to the collaborators the core does not implement itself:
//! authentication, profile persistence, world data and gameplay reactions.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use ember_proto::packets::login::EncryptionResponse;
use ember_proto::packets::play::{
    BlockPlacement, ClickWindow, CreativeInventoryAction, PlayerDigging,
};
use ember_proto::types::{BlockPos, ChunkPos, Position, Uuid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::Connection;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Name and stable id of an authenticated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub uuid: Uuid,
}

impl Identity {
    /// Identity of an unauthenticated player, derived from the name alone.
    pub fn offline(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::from_bytes(ember_crypto::offline_uuid(name)),
        }
    }
}

/// Encryption challenge sent to the client in an Encryption Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

pub enum AuthStart {
    /// Log in without encryption.
    Accept(Identity),
    /// Ask the client to negotiate encryption first.
    Challenge(Challenge),
}

pub struct AuthOutcome {
    pub identity: Identity,
    /// Decrypted 16-byte shared secret; keys the stream cipher.
    pub shared_secret: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Rejected with a message for the client.
    #[error("{0}")]
    Rejected(String),

    #[error("verify token mismatch")]
    VerifyTokenMismatch,

    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn begin(&self, name: &str) -> Result<AuthStart, AuthError>;

    async fn complete(
        &self,
        name: &str,
        challenge: &Challenge,
        response: &EncryptionResponse,
    ) -> Result<AuthOutcome, AuthError>;
}

/// Accepts every name without encryption.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAuthenticator;

#[async_trait]
impl Authenticator for OfflineAuthenticator {
    async fn begin(&self, name: &str) -> Result<AuthStart, AuthError> {
        Ok(AuthStart::Accept(Identity::offline(name)))
    }

    async fn complete(
        &self,
        _name: &str,
        _challenge: &Challenge,
        _response: &EncryptionResponse,
    ) -> Result<AuthOutcome, AuthError> {
        Err(AuthError::Rejected("Encryption was not requested".into()))
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Persisted state of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub uuid: String,
    pub world: String,
    pub position: Position,
    pub gamemode: u8,
    /// Unix seconds.
    pub first_login: u64,
    pub last_login: u64,
    pub login_count: u32,
}

impl Profile {
    pub fn new(identity: &Identity, world: &str, position: Position, gamemode: u8) -> Self {
        let now = unix_now();
        Self {
            name: identity.name.clone(),
            uuid: identity.uuid.to_string(),
            world: world.to_string(),
            position,
            gamemode,
            first_login: now,
            last_login: now,
            login_count: 0,
        }
    }

    /// Record a login happening now.
    pub fn touch_login(&mut self) {
        self.last_login = unix_now();
        self.login_count += 1;
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed profile: {0}")]
    Format(#[from] serde_json::Error),
}

/// Blocking profile storage. Called off the I/O runtime.
pub trait ProfileStore: Send + Sync {
    fn load_profile(&self, name: &str) -> Result<Option<Profile>, ProfileError>;
    fn save_profile(&self, profile: &Profile) -> Result<(), ProfileError>;
}

/// Profiles kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_profile(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self
            .profiles
            .lock()
            .expect("profile store poisoned")
            .get(&name.to_lowercase())
            .cloned())
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), ProfileError> {
        self.profiles
            .lock()
            .expect("profile store poisoned")
            .insert(profile.name.to_lowercase(), profile.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// One generated chunk column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload {
    pub primary_bitmap: u16,
    pub add_bitmap: u16,
    /// Zlib-compressed column data.
    pub data: Bytes,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("unknown world {0:?}")]
    UnknownWorld(String),

    #[error("generation failed: {0}")]
    Failed(String),
}

/// Handle through which a world service delivers one requested chunk.
///
/// Holds only a weak reference: a ticket never keeps a connection alive.
pub struct ChunkTicket {
    conn: Weak<Connection>,
    pub world: String,
    pub epoch: u64,
    pub pos: ChunkPos,
}

impl ChunkTicket {
    pub(crate) fn new(conn: &Arc<Connection>, world: String, epoch: u64, pos: ChunkPos) -> Self {
        Self {
            conn: Arc::downgrade(conn),
            world,
            epoch,
            pos,
        }
    }

    /// Hand the result back to the connection. Results for connections that
    /// are gone, or that no longer want this chunk, are discarded.
    pub fn complete(self, result: Result<ChunkPayload, GenerationError>) {
        if let Some(conn) = self.conn.upgrade() {
            conn.on_generated(&self.world, self.epoch, self.pos, result);
        }
    }
}

impl fmt::Debug for ChunkTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkTicket")
            .field("world", &self.world)
            .field("epoch", &self.epoch)
            .field("pos", &self.pos)
            .finish()
    }
}

pub enum ChunkRequest {
    /// Available right away.
    Hit(ChunkTicket, ChunkPayload),
    /// The service keeps the ticket and completes it later.
    Scheduled,
}

pub trait WorldService: Send + Sync {
    fn default_world(&self) -> String;

    fn world_exists(&self, world: &str) -> bool {
        world == self.default_world()
    }

    fn spawn_point(&self, world: &str) -> Position;

    fn level_type(&self, _world: &str) -> String {
        "default".into()
    }

    fn dimension(&self, _world: &str) -> i8 {
        0
    }

    fn request_chunk(&self, ticket: ChunkTicket) -> ChunkRequest;
}

// ---------------------------------------------------------------------------
// Gameplay hooks
// ---------------------------------------------------------------------------

/// Reactions to play frames. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait PlayHooks: Send + Sync {
    fn on_join(&self, conn: &Arc<Connection>) {}

    /// A chat line starting with `/`, without the slash.
    fn on_chat_command(&self, conn: &Arc<Connection>, command: &str) {
        conn.send_chat("Unknown command.");
    }

    fn on_dig(&self, conn: &Arc<Connection>, dig: &PlayerDigging) {}

    fn on_place(&self, conn: &Arc<Connection>, place: &BlockPlacement) {}

    fn on_held_item(&self, conn: &Arc<Connection>, slot: i16) {}

    /// Whether the click is accepted.
    fn on_click_window(&self, conn: &Arc<Connection>, click: &ClickWindow) -> bool {
        true
    }

    fn on_close_window(&self, conn: &Arc<Connection>, window_id: i8) {}

    fn on_creative_action(&self, conn: &Arc<Connection>, action: &CreativeInventoryAction) {}

    fn on_respawn(&self, conn: &Arc<Connection>) {}

    fn on_move(&self, conn: &Arc<Connection>, from: Position, to: Position) {}

    /// A block was consumed as a mark; restore it on the client.
    fn refresh_block(&self, conn: &Arc<Connection>, pos: BlockPos) {}

    fn on_leave(&self, conn: &Arc<Connection>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl PlayHooks for NoHooks {}

/// The collaborators a server runs with.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn Authenticator>,
    pub profiles: Arc<dyn ProfileStore>,
    pub world: Arc<dyn WorldService>,
    pub hooks: Arc<dyn PlayHooks>,
}

impl Services {
    /// Offline authentication, in-memory profiles, no gameplay hooks.
    pub fn offline(world: Arc<dyn WorldService>) -> Self {
        Self {
            auth: Arc::new(OfflineAuthenticator),
            profiles: Arc::new(MemoryProfileStore::new()),
            world,
            hooks: Arc::new(NoHooks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_accepts_with_stable_id() {
        let auth = OfflineAuthenticator;
        let AuthStart::Accept(first) = auth.begin("Steve").await.unwrap() else {
            panic!("offline mode must accept");
        };
        let AuthStart::Accept(second) = auth.begin("Steve").await.unwrap() else {
            panic!("offline mode must accept");
        };
        assert_eq!(first, second);
        assert_eq!(first.name, "Steve");
    }

    #[test]
    fn memory_store_is_case_insensitive() {
        let store = MemoryProfileStore::new();
        let identity = Identity::offline("Steve");
        let mut profile = Profile::new(&identity, "world", Position::default(), 1);
        profile.touch_login();
        store.save_profile(&profile).unwrap();
        let loaded = store.load_profile("STEVE").unwrap().unwrap();
        assert_eq!(loaded.login_count, 1);
        assert!(store.load_profile("Alex").unwrap().is_none());
    }

    #[test]
    fn profile_json_shape() {
        let identity = Identity::offline("Alex");
        let profile = Profile::new(&identity, "world", Position::new(1.5, 65.0, -3.5), 0);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["name"], "Alex");
        assert_eq!(json["position"]["y"], 65.0);
        assert_eq!(json["uuid"].as_str().unwrap().len(), 36);
    }
}
