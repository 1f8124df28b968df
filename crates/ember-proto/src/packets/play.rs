//! Play state packets.

use bytes::{Buf, BufMut, Bytes};

use crate::chat::ChatComponent;
use crate::codec::{self, ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{BlockPos, Slot, VarInt};

/// Zlib stream of zero bytes, used as the body of an unload frame.
pub const EMPTY_ZLIB: [u8; 8] = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Maximum length of a chat message sent by the client.
pub const MAX_CHAT_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Both directions
// ---------------------------------------------------------------------------

/// Keep Alive (0x00). The client echoes the server's id back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i32,
}

impl ProtoEncode for KeepAlive {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.id);
    }
}

impl ProtoDecode for KeepAlive {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 4)?;
        Ok(Self { id: buf.get_i32() })
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Join Game (0x01).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGame {
    pub entity_id: i32,
    pub gamemode: u8,
    pub dimension: i8,
    pub difficulty: u8,
    pub max_players: u8,
    pub level_type: String,
}

impl ProtoEncode for JoinGame {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.entity_id);
        buf.put_u8(self.gamemode);
        buf.put_i8(self.dimension);
        buf.put_u8(self.difficulty);
        buf.put_u8(self.max_players);
        codec::write_string(buf, &self.level_type);
    }
}

impl ProtoDecode for JoinGame {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 8)?;
        Ok(Self {
            entity_id: buf.get_i32(),
            gamemode: buf.get_u8(),
            dimension: buf.get_i8(),
            difficulty: buf.get_u8(),
            max_players: buf.get_u8(),
            level_type: codec::read_string(buf, 16)?,
        })
    }
}

/// Chat Message (0x02 server to client). JSON component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOut {
    pub json: String,
}

impl ChatOut {
    pub fn new(component: &ChatComponent) -> Self {
        Self {
            json: component.to_json(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(&ChatComponent::text(text))
    }
}

impl ProtoEncode for ChatOut {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.json);
    }
}

impl ProtoDecode for ChatOut {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            json: codec::read_string(buf, 32767)?,
        })
    }
}

/// Spawn Position (0x05).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ProtoEncode for SpawnPosition {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.x);
        buf.put_i32(self.y);
        buf.put_i32(self.z);
    }
}

/// Respawn (0x07). Sent on world change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Respawn {
    pub dimension: i32,
    pub difficulty: u8,
    pub gamemode: u8,
    pub level_type: String,
}

impl ProtoEncode for Respawn {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.dimension);
        buf.put_u8(self.difficulty);
        buf.put_u8(self.gamemode);
        codec::write_string(buf, &self.level_type);
    }
}

/// Player Position And Look (0x08 server to client). `y` is eye height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAndLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl ProtoEncode for PositionAndLook {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        codec::write_bool(buf, self.on_ground);
    }
}

/// Chunk Data (0x21). A ground-up column with empty bitmaps unloads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub ground_up: bool,
    pub primary_bitmap: u16,
    pub add_bitmap: u16,
    /// Zlib-compressed section data.
    pub data: Bytes,
}

impl ChunkData {
    pub fn unload(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            chunk_x,
            chunk_z,
            ground_up: true,
            primary_bitmap: 0,
            add_bitmap: 0,
            data: Bytes::from_static(&EMPTY_ZLIB),
        }
    }

    pub fn is_unload(&self) -> bool {
        self.ground_up && self.primary_bitmap == 0 && self.add_bitmap == 0
    }
}

impl ProtoEncode for ChunkData {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.chunk_x);
        buf.put_i32(self.chunk_z);
        codec::write_bool(buf, self.ground_up);
        buf.put_u16(self.primary_bitmap);
        buf.put_u16(self.add_bitmap);
        buf.put_i32(self.data.len() as i32);
        buf.put_slice(&self.data);
    }
}

impl ProtoDecode for ChunkData {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 17)?;
        let chunk_x = buf.get_i32();
        let chunk_z = buf.get_i32();
        let ground_up = buf.get_u8() != 0;
        let primary_bitmap = buf.get_u16();
        let add_bitmap = buf.get_u16();
        let size = buf.get_i32();
        if size < 0 {
            return Err(ProtoError::NegativeLength(size));
        }
        ensure(buf, size as usize)?;
        Ok(Self {
            chunk_x,
            chunk_z,
            ground_up,
            primary_bitmap,
            add_bitmap,
            data: buf.copy_to_bytes(size as usize),
        })
    }
}

/// Block Change (0x23).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChange {
    pub pos: BlockPos,
    pub block_id: i32,
    pub metadata: u8,
}

impl ProtoEncode for BlockChange {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.pos.proto_encode(buf);
        VarInt(self.block_id).proto_encode(buf);
        buf.put_u8(self.metadata);
    }
}

/// Confirm Transaction (0x32 server to client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmTransaction {
    pub window_id: i8,
    pub action_number: i16,
    pub accepted: bool,
}

impl ProtoEncode for ConfirmTransaction {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.window_id);
        buf.put_i16(self.action_number);
        codec::write_bool(buf, self.accepted);
    }
}

impl ProtoDecode for ConfirmTransaction {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 4)?;
        Ok(Self {
            window_id: buf.get_i8(),
            action_number: buf.get_i16(),
            accepted: buf.get_u8() != 0,
        })
    }
}

/// Player List Item (0x38). Adds or removes one tab-list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListItem {
    pub name: String,
    pub online: bool,
    pub ping: i16,
}

impl ProtoEncode for PlayerListItem {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.name);
        codec::write_bool(buf, self.online);
        buf.put_i16(self.ping);
    }
}

impl ProtoDecode for PlayerListItem {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let name = codec::read_string(buf, 16)?;
        ensure(buf, 3)?;
        Ok(Self {
            name,
            online: buf.get_u8() != 0,
            ping: buf.get_i16(),
        })
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Chat Message (0x01 client to server). Raw text, commands included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIn {
    pub message: String,
}

impl ProtoEncode for ChatIn {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.message);
    }
}

impl ProtoDecode for ChatIn {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            message: codec::read_string(buf, MAX_CHAT_LEN)?,
        })
    }
}

/// Player (0x03).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerGround {
    pub on_ground: bool,
}

impl ProtoEncode for PlayerGround {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_bool(buf, self.on_ground);
    }
}

impl ProtoDecode for PlayerGround {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            on_ground: codec::read_bool(buf)?,
        })
    }
}

/// Player Position (0x04). `stance` is the head height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPosition {
    pub x: f64,
    pub feet_y: f64,
    pub stance: f64,
    pub z: f64,
    pub on_ground: bool,
}

impl ProtoEncode for PlayerPosition {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.feet_y);
        buf.put_f64(self.stance);
        buf.put_f64(self.z);
        codec::write_bool(buf, self.on_ground);
    }
}

impl ProtoDecode for PlayerPosition {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 33)?;
        Ok(Self {
            x: buf.get_f64(),
            feet_y: buf.get_f64(),
            stance: buf.get_f64(),
            z: buf.get_f64(),
            on_ground: buf.get_u8() != 0,
        })
    }
}

/// Player Look (0x05).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerLook {
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl ProtoEncode for PlayerLook {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        codec::write_bool(buf, self.on_ground);
    }
}

impl ProtoDecode for PlayerLook {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 9)?;
        Ok(Self {
            yaw: buf.get_f32(),
            pitch: buf.get_f32(),
            on_ground: buf.get_u8() != 0,
        })
    }
}

/// Player Position And Look (0x06 client to server).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionLook {
    pub x: f64,
    pub feet_y: f64,
    pub stance: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl ProtoEncode for PlayerPositionLook {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.feet_y);
        buf.put_f64(self.stance);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        codec::write_bool(buf, self.on_ground);
    }
}

impl ProtoDecode for PlayerPositionLook {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 41)?;
        Ok(Self {
            x: buf.get_f64(),
            feet_y: buf.get_f64(),
            stance: buf.get_f64(),
            z: buf.get_f64(),
            yaw: buf.get_f32(),
            pitch: buf.get_f32(),
            on_ground: buf.get_u8() != 0,
        })
    }
}

/// Digging status values.
pub mod dig_status {
    pub const STARTED: i8 = 0;
    pub const CANCELLED: i8 = 1;
    pub const FINISHED: i8 = 2;
    pub const DROP_STACK: i8 = 3;
    pub const DROP_ITEM: i8 = 4;
    pub const SHOOT_ARROW: i8 = 5;
}

/// Player Digging (0x07).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDigging {
    pub status: i8,
    pub pos: BlockPos,
    pub face: i8,
}

impl ProtoEncode for PlayerDigging {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.status);
        self.pos.proto_encode(buf);
        buf.put_i8(self.face);
    }
}

impl ProtoDecode for PlayerDigging {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 1)?;
        let status = buf.get_i8();
        let pos = BlockPos::proto_decode(buf)?;
        ensure(buf, 1)?;
        Ok(Self {
            status,
            pos,
            face: buf.get_i8(),
        })
    }
}

/// Player Block Placement (0x08).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlacement {
    pub pos: BlockPos,
    pub direction: i8,
    pub held_item: Slot,
    pub cursor: [i8; 3],
}

impl ProtoEncode for BlockPlacement {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.pos.proto_encode(buf);
        buf.put_i8(self.direction);
        self.held_item.proto_encode(buf);
        for c in self.cursor {
            buf.put_i8(c);
        }
    }
}

impl ProtoDecode for BlockPlacement {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let pos = BlockPos::proto_decode(buf)?;
        ensure(buf, 1)?;
        let direction = buf.get_i8();
        let held_item = Slot::proto_decode(buf)?;
        ensure(buf, 3)?;
        let cursor = [buf.get_i8(), buf.get_i8(), buf.get_i8()];
        Ok(Self {
            pos,
            direction,
            held_item,
            cursor,
        })
    }
}

/// Held Item Change (0x09 client to server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldItemChange {
    pub slot: i16,
}

impl ProtoEncode for HeldItemChange {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i16(self.slot);
    }
}

impl ProtoDecode for HeldItemChange {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 2)?;
        Ok(Self {
            slot: buf.get_i16(),
        })
    }
}

/// Close Window (0x0D client to server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseWindow {
    pub window_id: i8,
}

impl ProtoEncode for CloseWindow {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.window_id);
    }
}

impl ProtoDecode for CloseWindow {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 1)?;
        Ok(Self {
            window_id: buf.get_i8(),
        })
    }
}

/// Click Window (0x0E).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickWindow {
    pub window_id: i8,
    pub slot: i16,
    pub button: i8,
    pub action_number: i16,
    pub mode: i8,
    pub clicked_item: Slot,
}

impl ProtoEncode for ClickWindow {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.window_id);
        buf.put_i16(self.slot);
        buf.put_i8(self.button);
        buf.put_i16(self.action_number);
        buf.put_i8(self.mode);
        self.clicked_item.proto_encode(buf);
    }
}

impl ProtoDecode for ClickWindow {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 7)?;
        Ok(Self {
            window_id: buf.get_i8(),
            slot: buf.get_i16(),
            button: buf.get_i8(),
            action_number: buf.get_i16(),
            mode: buf.get_i8(),
            clicked_item: Slot::proto_decode(buf)?,
        })
    }
}

/// Creative Inventory Action (0x10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeInventoryAction {
    pub slot: i16,
    pub item: Slot,
}

impl ProtoEncode for CreativeInventoryAction {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i16(self.slot);
        self.item.proto_encode(buf);
    }
}

impl ProtoDecode for CreativeInventoryAction {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 2)?;
        Ok(Self {
            slot: buf.get_i16(),
            item: Slot::proto_decode(buf)?,
        })
    }
}

/// Client Status (0x16). Action 0 requests a respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatus {
    pub action_id: i8,
}

impl ClientStatus {
    pub const RESPAWN: i8 = 0;
    pub const REQUEST_STATS: i8 = 1;
    pub const OPEN_INVENTORY_ACHIEVEMENT: i8 = 2;
}

impl ProtoEncode for ClientStatus {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i8(self.action_id);
    }
}

impl ProtoDecode for ClientStatus {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 1)?;
        Ok(Self {
            action_id: buf.get_i8(),
        })
    }
}
