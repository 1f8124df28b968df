//! Packet definitions for the 1.7.x Java Edition protocol, grouped by state.

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;

/// Packet ID constants, per protocol state.
pub mod id {
    pub mod handshake {
        pub const HANDSHAKE: i32 = 0x00;
    }

    pub mod status {
        pub const REQUEST: i32 = 0x00;
        pub const PING: i32 = 0x01;
        pub const RESPONSE: i32 = 0x00;
        pub const PONG: i32 = 0x01;
    }

    pub mod login {
        pub const LOGIN_START: i32 = 0x00;
        pub const ENCRYPTION_RESPONSE: i32 = 0x01;
        pub const DISCONNECT: i32 = 0x00;
        pub const ENCRYPTION_REQUEST: i32 = 0x01;
        pub const LOGIN_SUCCESS: i32 = 0x02;
    }

    /// Play state. Serverbound and clientbound IDs overlap, hence the split.
    pub mod play {
        pub mod serverbound {
            pub const KEEP_ALIVE: i32 = 0x00;
            pub const CHAT_MESSAGE: i32 = 0x01;
            pub const USE_ENTITY: i32 = 0x02;
            pub const PLAYER: i32 = 0x03;
            pub const PLAYER_POSITION: i32 = 0x04;
            pub const PLAYER_LOOK: i32 = 0x05;
            pub const PLAYER_POSITION_LOOK: i32 = 0x06;
            pub const PLAYER_DIGGING: i32 = 0x07;
            pub const BLOCK_PLACEMENT: i32 = 0x08;
            pub const HELD_ITEM_CHANGE: i32 = 0x09;
            pub const ANIMATION: i32 = 0x0A;
            pub const ENTITY_ACTION: i32 = 0x0B;
            pub const CLOSE_WINDOW: i32 = 0x0D;
            pub const CLICK_WINDOW: i32 = 0x0E;
            pub const CREATIVE_INVENTORY_ACTION: i32 = 0x10;
            pub const CLIENT_SETTINGS: i32 = 0x15;
            pub const CLIENT_STATUS: i32 = 0x16;
            pub const PLUGIN_MESSAGE: i32 = 0x17;
        }

        pub mod clientbound {
            pub const KEEP_ALIVE: i32 = 0x00;
            pub const JOIN_GAME: i32 = 0x01;
            pub const CHAT_MESSAGE: i32 = 0x02;
            pub const SPAWN_POSITION: i32 = 0x05;
            pub const RESPAWN: i32 = 0x07;
            pub const PLAYER_POSITION_LOOK: i32 = 0x08;
            pub const CHUNK_DATA: i32 = 0x21;
            pub const BLOCK_CHANGE: i32 = 0x23;
            pub const CONFIRM_TRANSACTION: i32 = 0x32;
            pub const PLAYER_LIST_ITEM: i32 = 0x38;
            pub const DISCONNECT: i32 = 0x40;
        }
    }
}
