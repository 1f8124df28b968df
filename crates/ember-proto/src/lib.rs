//! Minecraft Java Edition (1.7.x) wire types, frame codec and packet catalog.

pub mod chat;
pub mod codec;
pub mod error;
pub mod frame;
pub mod packets;
pub mod state;
pub mod types;

pub use error::ProtoError;
pub use frame::{Frame, FrameDecoder};
pub use state::ProtocolState;
