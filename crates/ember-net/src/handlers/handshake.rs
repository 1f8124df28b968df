use std::sync::Arc;

use ember_proto::frame::Frame;
use ember_proto::packets::handshake::Handshake;
use tracing::debug;

use crate::connection::Connection;
use crate::error::NetError;

pub(crate) fn handle(conn: &Arc<Connection>, frame: &Frame) -> Result<(), NetError> {
    let handshake: Handshake = frame.parse()?;
    let next = handshake.next()?;
    debug!(
        "{conn}: handshake protocol {} via {}:{}, next state {next}",
        handshake.protocol_version, handshake.server_address, handshake.server_port
    );
    conn.set_protocol_version(handshake.protocol_version);
    conn.set_state(next);
    Ok(())
}
