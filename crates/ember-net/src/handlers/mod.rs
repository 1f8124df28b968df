//! Frame handlers.
//!
//! Handshake, Status and Login frames are handled inline on the reader task;
//! Play frames go through the dispatch queue to the worker pool.

pub(crate) mod handshake;
pub(crate) mod login;
pub(crate) mod play;
pub(crate) mod status;

use std::sync::Arc;

use ember_crypto::InboundCipher;
use ember_proto::frame::{Frame, FrameDecoder};
use ember_proto::ProtocolState;
use tracing::trace;

use crate::connection::Connection;
use crate::error::NetError;
use crate::services::Challenge;
use crate::state::{route, Route};

/// Where a connection is within the Status exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum StatusPhase {
    #[default]
    AwaitRequest,
    Responded,
}

/// Where a connection is within the Login exchange.
#[derive(Debug, Default)]
pub(crate) enum LoginPhase {
    #[default]
    AwaitStart,
    AwaitEncryption {
        name: String,
        challenge: Challenge,
    },
    Done,
}

/// State owned by the reader task.
pub(crate) struct ReaderState {
    pub decoder: FrameDecoder,
    pub cipher: InboundCipher,
    pub status: StatusPhase,
    pub login: LoginPhase,
}

impl ReaderState {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            decoder: FrameDecoder::new(max_frame_len),
            cipher: InboundCipher::default(),
            status: StatusPhase::default(),
            login: LoginPhase::default(),
        }
    }
}

pub(crate) async fn handle(
    conn: &Arc<Connection>,
    frame: Frame,
    reader: &mut ReaderState,
) -> Result<(), NetError> {
    let state = conn.state();
    let Some(route) = route(state, frame.id) else {
        if state == ProtocolState::Play {
            trace!("{conn}: ignoring play packet 0x{:02X}", frame.id);
            return Ok(());
        }
        return Err(NetError::UnexpectedFrame { state, id: frame.id });
    };

    match route {
        Route::Handshake => handshake::handle(conn, &frame),
        Route::StatusRequest => status::request(conn, &frame, reader),
        Route::StatusPing => status::ping(conn, &frame),
        Route::LoginStart => login::start(conn, &frame, reader).await,
        Route::EncryptionResponse => login::encryption_response(conn, &frame, reader).await,
        Route::Play(handler) => conn.enqueue_play(handler, frame),
    }
}
