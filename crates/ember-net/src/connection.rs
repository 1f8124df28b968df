//! One client connection.
//!
//! A connection is shared between its reader task, its writer task, worker
//! threads running its play handlers, chunk tickets and the registry. Frames
//! are never written to the socket directly: every producer enqueues onto the
//! bounded outgoing queue, which only the writer task drains.

use std::fmt;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use ember_proto::chat::ChatComponent;
use ember_proto::codec::ProtoEncode;
use ember_proto::frame::{encode_frame, Frame};
use ember_proto::packets::id::{login as login_id, play::clientbound as cb};
use ember_proto::packets::login::Disconnect;
use ember_proto::packets::play::{
    ChatOut, ChunkData, JoinGame, KeepAlive, PlayerListItem, PositionAndLook, Respawn,
    SpawnPosition,
};
use ember_proto::types::{BlockPos, ChunkPos, Position};
use ember_proto::ProtocolState;
use rand::Rng;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::dispatch::{DispatchQueue, OrderClass};
use crate::error::NetError;
use crate::extensions::Extensions;
use crate::handlers;
use crate::lifecycle::Lifecycle;
use crate::marking::{Completed, MarkQueue};
use crate::region::{RegionCache, Resolution};
use crate::registry::FrameSink;
use crate::server::ServerContext;
use crate::services::{
    ChunkPayload, ChunkRequest, ChunkTicket, GenerationError, Identity, Profile,
};
use crate::state::PlayHandler;

/// Eye height above the feet, sent in position frames.
const EYE_HEIGHT: f64 = 1.62;

/// Items on the outgoing queue, in stream order.
#[derive(Debug)]
pub enum Outgoing {
    /// An encoded, length-prefixed frame.
    Frame(Bytes),
    /// Switch the outbound cipher on before writing anything that follows.
    EnableCipher([u8; 16]),
}

/// Gameplay state the core tracks for a logged-in player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub position: Position,
    pub world: String,
    pub gamemode: u8,
    pub held_slot: i16,
    pub profile: Option<Profile>,
}

#[derive(Debug, Default)]
struct KeepAliveState {
    pending: Option<(i32, Instant)>,
    last_sent: Option<Instant>,
    ping_ms: u32,
}

enum KeepAliveStep {
    Idle,
    Send(i32),
    TimedOut,
}

pub(crate) struct PlayJob {
    pub handler: PlayHandler,
    pub frame: Frame,
}

/// One admitted unit of work. Release waits until every guard is dropped.
pub(crate) struct Work<'a> {
    conn: &'a Connection,
}

impl Drop for Work<'_> {
    fn drop(&mut self) {
        if self.conn.lifecycle.finish() {
            self.conn.schedule_release();
        }
    }
}

pub struct Connection {
    me: Weak<Connection>,
    id: u64,
    addr: SocketAddr,
    entity_id: i32,
    ctx: Arc<ServerContext>,
    state: Mutex<ProtocolState>,
    protocol_version: AtomicI32,
    identity: OnceLock<Identity>,
    lifecycle: Lifecycle,
    outgoing: mpsc::Sender<Outgoing>,
    close_tx: watch::Sender<bool>,
    released_tx: watch::Sender<bool>,
    farewell: Mutex<Option<Bytes>>,
    dispatch: DispatchQueue<PlayJob>,
    region: Mutex<RegionCache>,
    player: Mutex<PlayerState>,
    extensions: Extensions,
    marks: MarkQueue<Arc<Connection>>,
    keepalive: Mutex<KeepAliveState>,
}

impl Connection {
    pub(crate) fn new(
        ctx: Arc<ServerContext>,
        addr: SocketAddr,
    ) -> (Arc<Self>, mpsc::Receiver<Outgoing>) {
        let config = &ctx.config;
        let (outgoing, rx) = mpsc::channel(config.outgoing_queue_capacity);
        let world = ctx.services.world.default_world();
        let spawn = ctx.services.world.spawn_point(&world);
        let region = RegionCache::new(world.clone(), config.chunk_radius, config.distance_metric);
        let player = PlayerState {
            position: spawn,
            world,
            gamemode: config.gamemode,
            held_slot: 0,
            profile: None,
        };
        let dispatch = DispatchQueue::new(config.max_pending_frames);
        let id = ctx.next_connection_id();
        let entity_id = ctx.next_entity_id();

        let conn = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            id,
            addr,
            entity_id,
            ctx,
            state: Mutex::new(ProtocolState::Handshake),
            protocol_version: AtomicI32::new(0),
            identity: OnceLock::new(),
            lifecycle: Lifecycle::new(),
            outgoing,
            close_tx: watch::Sender::new(false),
            released_tx: watch::Sender::new(false),
            farewell: Mutex::new(None),
            dispatch,
            region: Mutex::new(region),
            player: Mutex::new(player),
            extensions: Extensions::new(),
            marks: MarkQueue::new(),
            keepalive: Mutex::new(KeepAliveState::default()),
        });
        (conn, rx)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn entity_id(&self) -> i32 {
        self.entity_id
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn state(&self) -> ProtocolState {
        *self.state.lock().expect("connection state poisoned")
    }

    pub(crate) fn set_state(&self, state: ProtocolState) {
        *self.state.lock().expect("connection state poisoned") = state;
    }

    pub fn protocol_version(&self) -> i32 {
        self.protocol_version.load(Ordering::Acquire)
    }

    pub(crate) fn set_protocol_version(&self, version: i32) {
        self.protocol_version.store(version, Ordering::Release);
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.get().map(|i| i.name.as_str())
    }

    /// Assign the identity. Fails if one was already assigned.
    pub(crate) fn set_identity(&self, identity: Identity) -> Result<(), NetError> {
        self.identity
            .set(identity)
            .map_err(|_| NetError::Kicked("Already logged in".into()))
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn player(&self) -> PlayerState {
        self.player.lock().expect("player state poisoned").clone()
    }

    pub fn position(&self) -> Position {
        self.player.lock().expect("player state poisoned").position
    }

    pub fn world(&self) -> String {
        self.player.lock().expect("player state poisoned").world.clone()
    }

    /// Whether the player has joined and is currently in `world`.
    pub fn is_in_world(&self, world: &str) -> bool {
        self.state() == ProtocolState::Play
            && self.player.lock().expect("player state poisoned").world == world
    }

    pub fn ping_ms(&self) -> u32 {
        self.keepalive.lock().expect("keep-alive poisoned").ping_ms
    }

    pub fn is_draining(&self) -> bool {
        self.lifecycle.is_draining()
    }

    pub fn is_released(&self) -> bool {
        self.lifecycle.is_released()
    }

    /// Handlers and deliveries admitted but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.lifecycle.outstanding()
    }

    /// Admit work that must finish before the connection is released.
    /// `None` once the connection is draining.
    pub(crate) fn begin_work(&self) -> Option<Work<'_>> {
        self.lifecycle.try_begin().then_some(Work { conn: self })
    }

    /// Chunks currently held by the client.
    pub fn known_chunks(&self) -> Vec<ChunkPos> {
        let region = self.region.lock().expect("region cache poisoned");
        let mut known: Vec<ChunkPos> = region.known().copied().collect();
        known.sort();
        known
    }

    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        match self.state() {
            ProtocolState::Play => None,
            _ => Some(self.ctx.config.read_timeout),
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Enqueue an encoded frame. A full queue disconnects the client.
    pub fn send_wire(&self, wire: Bytes) {
        match self.outgoing.try_send(Outgoing::Frame(wire)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.disconnect(NetError::QueueOverflow),
            Err(TrySendError::Closed(_)) => trace!("{self}: dropping frame, writer gone"),
        }
    }

    pub fn send(&self, frame: &Frame) {
        self.send_wire(frame.encode());
    }

    pub fn send_packet<P: ProtoEncode>(&self, id: i32, packet: &P) {
        self.send_wire(encode_packet(id, packet));
    }

    pub fn send_chat(&self, text: &str) {
        self.send_packet(cb::CHAT_MESSAGE, &ChatOut::plain(text));
    }

    pub fn send_message(&self, component: &ChatComponent) {
        self.send_packet(cb::CHAT_MESSAGE, &ChatOut::new(component));
    }

    /// Queue the outbound cipher switch right behind what is already queued.
    pub(crate) fn enable_outbound_cipher(&self, secret: [u8; 16]) -> Result<(), NetError> {
        match self.outgoing.try_send(Outgoing::EnableCipher(secret)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetError::QueueOverflow),
            Err(TrySendError::Closed(_)) => Err(NetError::Closed),
        }
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Fatal path for every error: stop intake, queue the reason for the
    /// client, signal the writer and release once outstanding work is done.
    pub fn disconnect(&self, error: NetError) {
        let farewell = match error {
            NetError::Io(_) | NetError::Closed => None,
            _ => self.farewell_frame(&error.reason()),
        };
        if self.shutdown(farewell) {
            match error {
                NetError::Closed => debug!("{self} closed the connection"),
                _ => info!("{self} disconnected: {error}"),
            }
        }
    }

    /// Kick with a custom message.
    pub fn kick(&self, reason: impl Into<String>) {
        self.disconnect(NetError::Kicked(reason.into()));
    }

    /// Close without a reason, after flushing what is queued.
    pub fn close(&self) {
        if self.shutdown(None) {
            debug!("{self} closed");
        }
    }

    /// Returns `true` for the call that started draining.
    fn shutdown(&self, farewell: Option<Bytes>) -> bool {
        let drain = self.lifecycle.begin_drain();
        if drain.first {
            *self.farewell.lock().expect("farewell poisoned") = farewell;
            let dropped = self.dispatch.clear();
            if dropped > 0 {
                trace!("{self}: dropped {dropped} undispatched frames");
            }
            self.close_tx.send_replace(true);
        }
        if drain.release {
            self.schedule_release();
        }
        drain.first
    }

    fn farewell_frame(&self, reason: &str) -> Option<Bytes> {
        let packet = Disconnect::with_message(reason);
        match self.state() {
            ProtocolState::Login => Some(encode_packet(login_id::DISCONNECT, &packet)),
            ProtocolState::Play => Some(encode_packet(cb::DISCONNECT, &packet)),
            _ => None,
        }
    }

    pub(crate) fn take_farewell(&self) -> Option<Bytes> {
        self.farewell.lock().expect("farewell poisoned").take()
    }

    pub(crate) fn close_signal(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }

    /// Resolves once the connection has been released.
    pub async fn wait_released(&self) {
        let mut rx = self.released_tx.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }

    fn schedule_release(&self) {
        if let Some(me) = self.me.upgrade() {
            self.ctx.pool.spawn(move || me.release());
        }
    }

    fn release(self: Arc<Self>) {
        if self.ctx.registry.remove_conn(&self) {
            let name = self.name().unwrap_or_default().to_string();
            let world = self.world();
            let item = PlayerListItem {
                name: name.clone(),
                online: false,
                ping: 0,
            };
            self.ctx.registry.broadcast_where(
                &encode_packet(cb::PLAYER_LIST_ITEM, &item),
                |c| c.is_in_world(&world),
            );
            let message = ChatComponent::text(format!("{name} left the game")).color("yellow");
            self.ctx.registry.broadcast_where(
                &encode_packet(cb::CHAT_MESSAGE, &ChatOut::new(&message)),
                |c| c.is_in_world(&world),
            );
            self.ctx.services.hooks.on_leave(&self);
            self.save_profile();
            info!("{name} left ({} online)", self.ctx.registry.count());
        }

        self.region.lock().expect("region cache poisoned").clear();
        self.extensions.clear();
        self.marks.cancel_all();
        self.dispatch.clear();
        self.close_tx.send_replace(true);
        self.released_tx.send_replace(true);
        debug!("{self} released");
    }

    fn save_profile(&self) {
        let profile = {
            let player = self.player.lock().expect("player state poisoned");
            player.profile.clone().map(|mut p| {
                p.world = player.world.clone();
                p.position = player.position;
                p.gamemode = player.gamemode;
                p
            })
        };
        if let Some(profile) = profile {
            if let Err(e) = self.ctx.services.profiles.save_profile(&profile) {
                warn!("Failed to save profile of {}: {e}", profile.name);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Play dispatch
    // -----------------------------------------------------------------------

    pub(crate) fn enqueue_play(&self, handler: PlayHandler, frame: Frame) -> Result<(), NetError> {
        let class = self.ctx.config.ordering.class_of(frame.id);
        self.dispatch.push(class, PlayJob { handler, frame })?;
        self.pump();
        Ok(())
    }

    fn pump(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        for (class, job) in self.dispatch.take_ready() {
            if !self.lifecycle.try_begin() {
                self.dispatch.complete(class);
                continue;
            }
            let conn = Arc::clone(&me);
            self.ctx.pool.spawn(move || conn.run_job(class, job));
        }
    }

    fn run_job(self: Arc<Self>, class: Option<OrderClass>, job: PlayJob) {
        let id = job.frame.id;
        let result = catch_unwind(AssertUnwindSafe(|| {
            handlers::play::run(&self, job.handler, &job.frame)
        }));
        self.dispatch.complete(class);
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.disconnect(e),
            Err(_) => {
                warn!("{self}: handler for packet 0x{id:02X} panicked");
                self.disconnect(NetError::HandlerPanicked { id });
            }
        }
        if !self.is_draining() {
            self.pump();
        }
        if self.lifecycle.finish() {
            self.schedule_release();
        }
    }

    // -----------------------------------------------------------------------
    // Login and world
    // -----------------------------------------------------------------------

    pub(crate) fn attach_profile(&self, profile: Profile) {
        let world_svc = &self.ctx.services.world;
        let mut player = self.player.lock().expect("player state poisoned");
        if world_svc.world_exists(&profile.world) {
            player.world = profile.world.clone();
            player.position = profile.position;
        } else {
            player.world = world_svc.default_world();
            player.position = world_svc.spawn_point(&player.world);
        }
        player.gamemode = profile.gamemode;
        player.profile = Some(profile);
        let world = player.world.clone();
        drop(player);
        self.region
            .lock()
            .expect("region cache poisoned")
            .set_world(world);
    }

    /// Send the initial play frames and start streaming the surroundings.
    pub(crate) fn join_game(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let config = &self.ctx.config;
        let world_svc = &self.ctx.services.world;
        let player = self.player();

        self.send_packet(
            cb::JOIN_GAME,
            &JoinGame {
                entity_id: self.entity_id,
                gamemode: player.gamemode,
                dimension: world_svc.dimension(&player.world),
                difficulty: config.difficulty,
                max_players: config.max_players.min(u8::MAX as usize) as u8,
                level_type: world_svc.level_type(&player.world),
            },
        );
        let spawn = world_svc.spawn_point(&player.world).block_pos();
        self.send_packet(
            cb::SPAWN_POSITION,
            &SpawnPosition {
                x: spawn.x,
                y: spawn.y,
                z: spawn.z,
            },
        );
        self.send_position();
        self.stream_chunks();

        let name = self.name().unwrap_or_default().to_string();
        self.send_packet(
            cb::PLAYER_LIST_ITEM,
            &PlayerListItem {
                name: name.clone(),
                online: true,
                ping: 0,
            },
        );
        self.exchange_tab_list(&me, &player.world, true);
        let message = ChatComponent::text(format!("{name} joined the game")).color("yellow");
        self.ctx.registry.broadcast_where(
            &encode_packet(cb::CHAT_MESSAGE, &ChatOut::new(&message)),
            |c| c.is_in_world(&player.world),
        );

        self.ctx.services.hooks.on_join(&me);
    }

    /// Show this player to everyone else in `world` and them to this player,
    /// or hide both ways when `online` is false.
    fn exchange_tab_list(&self, me: &Arc<Connection>, world: &str, online: bool) {
        let peers = |c: &Arc<Connection>| !Arc::ptr_eq(c, me) && c.is_in_world(world);
        for other in self.ctx.registry.snapshot_where(peers) {
            let item = PlayerListItem {
                name: other.name().unwrap_or_default().to_string(),
                online,
                ping: other.ping_ms().min(i16::MAX as u32) as i16,
            };
            self.send_packet(cb::PLAYER_LIST_ITEM, &item);
        }
        let item = PlayerListItem {
            name: self.name().unwrap_or_default().to_string(),
            online,
            ping: self.ping_ms().min(i16::MAX as u32) as i16,
        };
        self.ctx
            .registry
            .broadcast_where(&encode_packet(cb::PLAYER_LIST_ITEM, &item), peers);
    }

    pub(crate) fn send_position(&self) {
        let pos = self.position();
        self.send_packet(
            cb::PLAYER_POSITION_LOOK,
            &PositionAndLook {
                x: pos.x,
                y: pos.y + EYE_HEIGHT,
                z: pos.z,
                yaw: pos.yaw,
                pitch: pos.pitch,
                on_ground: pos.on_ground,
            },
        );
    }

    /// Apply `f` to the position. Returns the position before and after.
    pub(crate) fn update_position(&self, f: impl FnOnce(&mut Position)) -> (Position, Position) {
        let mut player = self.player.lock().expect("player state poisoned");
        let before = player.position;
        f(&mut player.position);
        (before, player.position)
    }

    pub(crate) fn set_held_slot(&self, slot: i16) {
        self.player.lock().expect("player state poisoned").held_slot = slot;
    }

    /// Move the player within the current world.
    pub fn teleport(&self, to: Position) {
        self.update_position(|p| *p = to);
        self.send_position();
        self.stream_chunks();
    }

    /// Move the player to the spawn point of another world. Returns `false`
    /// if the world service does not know `world`.
    pub fn join_world(&self, world: &str) -> bool {
        let world_svc = &self.ctx.services.world;
        if !world_svc.world_exists(world) {
            return false;
        }
        let Some(me) = self.me.upgrade() else {
            return false;
        };
        let spawn = world_svc.spawn_point(world);
        self.exchange_tab_list(&me, &self.world(), false);
        {
            let mut region = self.region.lock().expect("region cache poisoned");
            for pos in region.set_world(world) {
                self.send_packet(cb::CHUNK_DATA, &ChunkData::unload(pos.x, pos.z));
            }
        }
        let gamemode = {
            let mut player = self.player.lock().expect("player state poisoned");
            player.world = world.to_string();
            player.position = spawn;
            player.gamemode
        };
        self.send_packet(
            cb::RESPAWN,
            &Respawn {
                dimension: world_svc.dimension(world) as i32,
                difficulty: self.ctx.config.difficulty,
                gamemode,
                level_type: world_svc.level_type(world),
            },
        );
        self.send_position();
        self.stream_chunks();
        self.exchange_tab_list(&me, world, true);
        debug!("{self} moved to world {world}");
        true
    }

    /// Recenter the chunk view on the current position: unload what left the
    /// radius and request what entered it.
    pub fn stream_chunks(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let center = self.position().chunk_pos();
        let (world, epoch, load) = {
            let mut region = self.region.lock().expect("region cache poisoned");
            let plan = region.recenter(center);
            for pos in &plan.unload {
                self.send_packet(cb::CHUNK_DATA, &ChunkData::unload(pos.x, pos.z));
            }
            (region.world().to_string(), region.epoch(), plan.load)
        };
        if !load.is_empty() {
            trace!("{self}: requesting {} chunks around {center}", load.len());
        }
        for pos in load {
            let ticket = ChunkTicket::new(&me, world.clone(), epoch, pos);
            if let ChunkRequest::Hit(ticket, payload) = self.ctx.services.world.request_chunk(ticket)
            {
                ticket.complete(Ok(payload));
            }
        }
    }

    pub(crate) fn on_generated(
        &self,
        world: &str,
        epoch: u64,
        pos: ChunkPos,
        result: Result<ChunkPayload, GenerationError>,
    ) {
        let Some(_work) = self.begin_work() else {
            return;
        };
        let mut region = self.region.lock().expect("region cache poisoned");
        match region.resolve(world, epoch, pos, result.is_ok()) {
            Resolution::Deliver => {
                if let Ok(payload) = result {
                    let chunk = ChunkData {
                        chunk_x: pos.x,
                        chunk_z: pos.z,
                        ground_up: true,
                        primary_bitmap: payload.primary_bitmap,
                        add_bitmap: payload.add_bitmap,
                        data: payload.data,
                    };
                    self.send_packet(cb::CHUNK_DATA, &chunk);
                }
            }
            Resolution::Failed => {
                if let Err(e) = &result {
                    debug!("{self}: chunk {pos} not delivered: {e}");
                }
            }
            Resolution::Stale | Resolution::NotPending => {
                trace!("{self}: discarding chunk {pos} from {world}#{epoch}");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Marking
    // -----------------------------------------------------------------------

    /// Ask the player to mark `count` blocks, then run `f` with their positions.
    pub fn await_marks(
        &self,
        count: usize,
        f: impl FnOnce(&Arc<Connection>, &[BlockPos]) + Send + 'static,
    ) {
        if count == 0 {
            if let Some(me) = self.me.upgrade() {
                f(&me, &[]);
            }
            return;
        }
        self.marks.push(count, Box::new(f));
    }

    pub fn marks_pending(&self) -> bool {
        self.marks.is_pending()
    }

    pub(crate) fn mark_block(&self, pos: BlockPos) -> Option<Completed<Arc<Connection>>> {
        self.marks.mark(pos)
    }

    /// Drop all outstanding mark requests without running them.
    pub fn cancel_marks(&self) -> usize {
        self.marks.cancel_all()
    }

    // -----------------------------------------------------------------------
    // Keep-alive
    // -----------------------------------------------------------------------

    pub(crate) fn tick_keep_alive(&self, now: Instant) {
        if self.state() != ProtocolState::Play || self.is_draining() {
            return;
        }
        let config = &self.ctx.config;
        let step = {
            let mut ka = self.keepalive.lock().expect("keep-alive poisoned");
            let pending = ka.pending;
            match pending {
                Some((_, sent)) if now.duration_since(sent) >= config.keep_alive_timeout => {
                    KeepAliveStep::TimedOut
                }
                Some(_) => KeepAliveStep::Idle,
                None if ka
                    .last_sent
                    .map_or(true, |t| now.duration_since(t) >= config.keep_alive_interval) =>
                {
                    let id = rand::thread_rng().gen_range(1..i32::MAX);
                    ka.pending = Some((id, now));
                    ka.last_sent = Some(now);
                    KeepAliveStep::Send(id)
                }
                None => KeepAliveStep::Idle,
            }
        };
        match step {
            KeepAliveStep::Idle => {}
            KeepAliveStep::Send(id) => self.send_packet(cb::KEEP_ALIVE, &KeepAlive { id }),
            KeepAliveStep::TimedOut => self.disconnect(NetError::KeepAliveTimeout),
        }
    }

    /// Match a client keep-alive against the outstanding one.
    pub(crate) fn acknowledge_keep_alive(&self, id: i32) -> bool {
        let mut ka = self.keepalive.lock().expect("keep-alive poisoned");
        let pending = ka.pending;
        match pending {
            Some((pending, sent)) if pending == id => {
                ka.ping_ms = sent.elapsed().as_millis().min(u32::MAX as u128) as u32;
                ka.pending = None;
                true
            }
            _ => false,
        }
    }
}

impl FrameSink for Connection {
    fn deliver(&self, wire: Bytes) {
        self.send_wire(wire);
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.addr),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("name", &self.name())
            .finish()
    }
}

/// Encode `packet` as a complete wire frame.
pub fn encode_packet<P: ProtoEncode>(id: i32, packet: &P) -> Bytes {
    let mut payload = BytesMut::new();
    packet.proto_encode(&mut payload);
    encode_frame(id, &payload)
}
