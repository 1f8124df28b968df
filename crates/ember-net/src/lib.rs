//! Connection core for a Java Edition (1.7.x) game server.
//!
//! Terminates the wire protocol per connection, serializes order-sensitive
//! play frames over a worker pool and keeps each client's loaded chunks in
//! sync with its position.

pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod extensions;
pub mod handlers;
pub mod lifecycle;
pub mod marking;
pub mod pool;
pub mod region;
pub mod registry;
pub mod server;
pub mod services;
pub mod session;
pub mod state;

pub use config::{DistanceMetric, NetConfig};
pub use connection::Connection;
pub use dispatch::{OrderClass, OrderingPolicy};
pub use error::NetError;
pub use registry::{FindMode, Registry};
pub use server::{Server, ServerContext};
pub use services::{
    AuthError, AuthOutcome, AuthStart, Authenticator, Challenge, ChunkPayload, ChunkRequest,
    ChunkTicket, GenerationError, Identity, MemoryProfileStore, NoHooks, OfflineAuthenticator,
    PlayHooks, Profile, ProfileError, ProfileStore, Services, WorldService,
};
