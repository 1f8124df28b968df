//! Play frame handlers. These run on the worker pool.

use std::sync::Arc;

use ember_proto::chat::ChatComponent;
use ember_proto::frame::Frame;
use ember_proto::packets::id::play::clientbound as cb;
use ember_proto::packets::play::{
    dig_status, BlockPlacement, ChatIn, ChatOut, ClickWindow, ClientStatus, CloseWindow,
    ConfirmTransaction, CreativeInventoryAction, HeldItemChange, KeepAlive, PlayerDigging,
    PlayerGround, PlayerLook, PlayerPosition, PlayerPositionLook,
};
use ember_proto::types::Position;
use tracing::{debug, info, trace};

use crate::connection::{encode_packet, Connection};
use crate::error::NetError;
use crate::state::PlayHandler;

pub(crate) fn run(
    conn: &Arc<Connection>,
    handler: PlayHandler,
    frame: &Frame,
) -> Result<(), NetError> {
    match handler {
        PlayHandler::KeepAlive => keep_alive(conn, frame.parse()?),
        PlayHandler::Chat => chat(conn, frame.parse()?),
        PlayHandler::Player => {
            let PlayerGround { on_ground } = frame.parse()?;
            conn.update_position(|p| p.on_ground = on_ground);
            Ok(())
        }
        PlayHandler::Position => {
            let m: PlayerPosition = frame.parse()?;
            check_coords(m.x, m.feet_y, m.z)?;
            apply_move(conn, |p| {
                p.x = m.x;
                p.y = m.feet_y;
                p.z = m.z;
                p.on_ground = m.on_ground;
            });
            Ok(())
        }
        PlayHandler::Look => {
            let m: PlayerLook = frame.parse()?;
            apply_move(conn, |p| {
                p.yaw = m.yaw;
                p.pitch = m.pitch;
                p.on_ground = m.on_ground;
            });
            Ok(())
        }
        PlayHandler::PositionLook => {
            let m: PlayerPositionLook = frame.parse()?;
            check_coords(m.x, m.feet_y, m.z)?;
            apply_move(conn, |p| {
                p.x = m.x;
                p.y = m.feet_y;
                p.z = m.z;
                p.yaw = m.yaw;
                p.pitch = m.pitch;
                p.on_ground = m.on_ground;
            });
            Ok(())
        }
        PlayHandler::Digging => digging(conn, frame.parse()?),
        PlayHandler::Placement => {
            let place: BlockPlacement = frame.parse()?;
            conn.context().services.hooks.on_place(conn, &place);
            Ok(())
        }
        PlayHandler::HeldItem => {
            let HeldItemChange { slot } = frame.parse()?;
            if !(0..=8).contains(&slot) {
                debug!("{conn}: ignoring held slot {slot}");
                return Ok(());
            }
            conn.set_held_slot(slot);
            conn.context().services.hooks.on_held_item(conn, slot);
            Ok(())
        }
        PlayHandler::CloseWindow => {
            let CloseWindow { window_id } = frame.parse()?;
            conn.context().services.hooks.on_close_window(conn, window_id);
            Ok(())
        }
        PlayHandler::ClickWindow => click_window(conn, frame.parse()?),
        PlayHandler::CreativeAction => {
            let action: CreativeInventoryAction = frame.parse()?;
            conn.context()
                .services
                .hooks
                .on_creative_action(conn, &action);
            Ok(())
        }
        PlayHandler::ClientStatus => client_status(conn, frame.parse()?),
    }
}

fn keep_alive(conn: &Arc<Connection>, packet: KeepAlive) -> Result<(), NetError> {
    if !conn.acknowledge_keep_alive(packet.id) {
        trace!("{conn}: unsolicited keep-alive {}", packet.id);
    }
    Ok(())
}

fn chat(conn: &Arc<Connection>, packet: ChatIn) -> Result<(), NetError> {
    let message = packet.message.trim();
    if message.is_empty() {
        return Ok(());
    }
    if let Some(command) = message.strip_prefix('/') {
        debug!("{conn} issued command /{command}");
        conn.context().services.hooks.on_chat_command(conn, command);
        return Ok(());
    }

    let name = conn.name().unwrap_or_default();
    info!("<{name}> {message}");
    let line = ChatComponent::text(format!("<{name}> {message}"));
    let world = conn.world();
    conn.context().registry.broadcast_where(
        &encode_packet(cb::CHAT_MESSAGE, &ChatOut::new(&line)),
        |c| c.is_in_world(&world),
    );
    Ok(())
}

fn check_coords(x: f64, y: f64, z: f64) -> Result<(), NetError> {
    if x.is_finite() && y.is_finite() && z.is_finite() {
        Ok(())
    } else {
        Err(NetError::Kicked("Illegal position".into()))
    }
}

fn apply_move(conn: &Arc<Connection>, f: impl FnOnce(&mut Position)) {
    let (from, to) = conn.update_position(f);
    conn.context().services.hooks.on_move(conn, from, to);
    if from.chunk_pos() != to.chunk_pos() {
        conn.stream_chunks();
    }
}

fn digging(conn: &Arc<Connection>, dig: PlayerDigging) -> Result<(), NetError> {
    let hooks = &conn.context().services.hooks;
    if dig.status == dig_status::STARTED && conn.marks_pending() {
        hooks.refresh_block(conn, dig.pos);
        if let Some(done) = conn.mark_block(dig.pos) {
            done.run(conn);
        }
        return Ok(());
    }
    hooks.on_dig(conn, &dig);
    Ok(())
}

fn click_window(conn: &Arc<Connection>, click: ClickWindow) -> Result<(), NetError> {
    let accepted = conn.context().services.hooks.on_click_window(conn, &click);
    conn.send_packet(
        cb::CONFIRM_TRANSACTION,
        &ConfirmTransaction {
            window_id: click.window_id,
            action_number: click.action_number,
            accepted,
        },
    );
    Ok(())
}

fn client_status(conn: &Arc<Connection>, status: ClientStatus) -> Result<(), NetError> {
    if status.action_id != ClientStatus::RESPAWN {
        trace!("{conn}: client status {}", status.action_id);
        return Ok(());
    }
    let world = conn.world();
    let spawn = conn.context().services.world.spawn_point(&world);
    conn.teleport(spawn);
    conn.context().services.hooks.on_respawn(conn);
    Ok(())
}
