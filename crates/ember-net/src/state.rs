//! Frame routing by protocol state.
//!
//! Every (state, id) pair the server accepts maps to exactly one route.
//! Before Play an unknown pair is a protocol violation; in Play it is
//! ignored, since clients send plenty the core has no use for.

use ember_proto::packets::id::{handshake, login, play::serverbound as sb, status};
use ember_proto::ProtocolState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Handshake,
    StatusRequest,
    StatusPing,
    LoginStart,
    EncryptionResponse,
    Play(PlayHandler),
}

/// Play frames with a handler. These run on the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayHandler {
    KeepAlive,
    Chat,
    Player,
    Position,
    Look,
    PositionLook,
    Digging,
    Placement,
    HeldItem,
    CloseWindow,
    ClickWindow,
    CreativeAction,
    ClientStatus,
}

pub fn route(state: ProtocolState, id: i32) -> Option<Route> {
    let route = match (state, id) {
        (ProtocolState::Handshake, handshake::HANDSHAKE) => Route::Handshake,

        (ProtocolState::Status, status::REQUEST) => Route::StatusRequest,
        (ProtocolState::Status, status::PING) => Route::StatusPing,

        (ProtocolState::Login, login::LOGIN_START) => Route::LoginStart,
        (ProtocolState::Login, login::ENCRYPTION_RESPONSE) => Route::EncryptionResponse,

        (ProtocolState::Play, id) => Route::Play(play_handler(id)?),
        _ => return None,
    };
    Some(route)
}

fn play_handler(id: i32) -> Option<PlayHandler> {
    let handler = match id {
        sb::KEEP_ALIVE => PlayHandler::KeepAlive,
        sb::CHAT_MESSAGE => PlayHandler::Chat,
        sb::PLAYER => PlayHandler::Player,
        sb::PLAYER_POSITION => PlayHandler::Position,
        sb::PLAYER_LOOK => PlayHandler::Look,
        sb::PLAYER_POSITION_LOOK => PlayHandler::PositionLook,
        sb::PLAYER_DIGGING => PlayHandler::Digging,
        sb::BLOCK_PLACEMENT => PlayHandler::Placement,
        sb::HELD_ITEM_CHANGE => PlayHandler::HeldItem,
        sb::CLOSE_WINDOW => PlayHandler::CloseWindow,
        sb::CLICK_WINDOW => PlayHandler::ClickWindow,
        sb::CREATIVE_INVENTORY_ACTION => PlayHandler::CreativeAction,
        sb::CLIENT_STATUS => PlayHandler::ClientStatus,
        _ => return None,
    };
    Some(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_routes_by_state() {
        assert_eq!(route(ProtocolState::Handshake, 0x00), Some(Route::Handshake));
        assert_eq!(route(ProtocolState::Status, 0x00), Some(Route::StatusRequest));
        assert_eq!(route(ProtocolState::Login, 0x00), Some(Route::LoginStart));
        assert_eq!(
            route(ProtocolState::Play, 0x00),
            Some(Route::Play(PlayHandler::KeepAlive))
        );
    }

    #[test]
    fn unknown_pairs_have_no_route() {
        assert_eq!(route(ProtocolState::Handshake, 0x01), None);
        assert_eq!(route(ProtocolState::Status, 0x02), None);
        assert_eq!(route(ProtocolState::Login, 0x02), None);
        // Known to the protocol but not handled by the core.
        assert_eq!(route(ProtocolState::Play, sb::ANIMATION), None);
        assert_eq!(route(ProtocolState::Play, sb::PLUGIN_MESSAGE), None);
    }

    #[test]
    fn movement_frames_route_to_movement_handlers() {
        assert_eq!(
            route(ProtocolState::Play, 0x04),
            Some(Route::Play(PlayHandler::Position))
        );
        assert_eq!(
            route(ProtocolState::Play, 0x06),
            Some(Route::Play(PlayHandler::PositionLook))
        );
    }
}
