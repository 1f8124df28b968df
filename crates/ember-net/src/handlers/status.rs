use std::sync::Arc;

use ember_proto::chat::ChatComponent;
use ember_proto::frame::Frame;
use ember_proto::packets::id::status as status_id;
use ember_proto::packets::status::{
    PlayerSample, ServerStatus, StatusPing, StatusPlayers, StatusRequest, StatusVersion,
};
use ember_proto::ProtocolState;
use tracing::debug;

use super::{ReaderState, StatusPhase};
use crate::connection::Connection;
use crate::constants::STATUS_SAMPLE_SIZE;
use crate::error::NetError;

pub(crate) fn request(
    conn: &Arc<Connection>,
    frame: &Frame,
    reader: &mut ReaderState,
) -> Result<(), NetError> {
    if reader.status != StatusPhase::AwaitRequest {
        return Err(NetError::UnexpectedFrame {
            state: ProtocolState::Status,
            id: frame.id,
        });
    }
    let StatusRequest = frame.parse()?;
    reader.status = StatusPhase::Responded;

    let ctx = conn.context();
    let config = &ctx.config;
    let online = ctx.registry.snapshot(None);
    let sample = online
        .iter()
        .filter_map(|c| c.identity())
        .take(STATUS_SAMPLE_SIZE)
        .map(|identity| PlayerSample {
            name: identity.name.clone(),
            id: identity.uuid.to_string(),
        })
        .collect();

    let status = ServerStatus {
        version: StatusVersion {
            name: config.version_name.clone(),
            protocol: config.advertised_protocol(conn.protocol_version()),
        },
        players: StatusPlayers {
            max: config.max_players as u32,
            online: online.len() as u32,
            sample,
        },
        description: ChatComponent::text(config.motd.clone()),
        favicon: config.favicon.clone(),
    };
    conn.send_packet(status_id::RESPONSE, &status.to_response()?);
    Ok(())
}

/// Echo the ping and end the exchange.
pub(crate) fn ping(conn: &Arc<Connection>, frame: &Frame) -> Result<(), NetError> {
    let ping: StatusPing = frame.parse()?;
    debug!("{conn}: status ping");
    conn.send_packet(status_id::PONG, &ping);
    conn.close();
    Ok(())
}
