use std::sync::Arc;

use ember_crypto::CryptoError;
use ember_proto::frame::Frame;
use ember_proto::packets::id::login as login_id;
use ember_proto::packets::login::{
    EncryptionRequest, EncryptionResponse, LoginStart, LoginSuccess, MAX_NAME_LEN,
};
use ember_proto::ProtocolState;
use tracing::{debug, info, warn};

use super::{LoginPhase, ReaderState};
use crate::connection::Connection;
use crate::error::NetError;
use crate::registry::Admission;
use crate::services::{AuthStart, Identity, Profile};

fn out_of_sequence(frame: &Frame) -> NetError {
    NetError::UnexpectedFrame {
        state: ProtocolState::Login,
        id: frame.id,
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), NetError> {
    let valid = !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(NetError::InvalidName(name.to_string()))
    }
}

pub(crate) async fn start(
    conn: &Arc<Connection>,
    frame: &Frame,
    reader: &mut ReaderState,
) -> Result<(), NetError> {
    if !matches!(reader.login, LoginPhase::AwaitStart) {
        return Err(out_of_sequence(frame));
    }
    let LoginStart { name } = frame.parse()?;
    validate_name(&name)?;
    conn.context()
        .config
        .check_protocol(conn.protocol_version())?;

    let auth = Arc::clone(&conn.context().services.auth);
    match auth.begin(&name).await? {
        AuthStart::Accept(identity) => {
            reader.login = LoginPhase::Done;
            finish(conn, identity).await
        }
        AuthStart::Challenge(challenge) => {
            debug!("{conn}: requesting encryption from {name}");
            conn.send_packet(
                login_id::ENCRYPTION_REQUEST,
                &EncryptionRequest {
                    server_id: challenge.server_id.clone(),
                    public_key: challenge.public_key.clone(),
                    verify_token: challenge.verify_token.clone(),
                },
            );
            reader.login = LoginPhase::AwaitEncryption { name, challenge };
            Ok(())
        }
    }
}

pub(crate) async fn encryption_response(
    conn: &Arc<Connection>,
    frame: &Frame,
    reader: &mut ReaderState,
) -> Result<(), NetError> {
    let LoginPhase::AwaitEncryption { name, challenge } =
        std::mem::replace(&mut reader.login, LoginPhase::Done)
    else {
        return Err(out_of_sequence(frame));
    };
    let response: EncryptionResponse = frame.parse()?;

    let auth = Arc::clone(&conn.context().services.auth);
    let outcome = auth.complete(&name, &challenge, &response).await?;
    let secret: [u8; 16] = outcome
        .shared_secret
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength(outcome.shared_secret.len()))?;

    reader.cipher.enable(&secret, &secret)?;
    // Anything read past this frame is already ciphertext.
    let mut rest = reader.decoder.take_buffered();
    reader.cipher.decrypt(&mut rest);
    reader.decoder.feed(&rest);

    conn.enable_outbound_cipher(secret)?;
    debug!("{conn}: encryption enabled");
    finish(conn, outcome.identity).await
}

/// Admit an authenticated player and run the join sequence. The whole
/// sequence counts as outstanding work, so a disconnect arriving meanwhile
/// releases the connection only after the join has been announced.
async fn finish(conn: &Arc<Connection>, identity: Identity) -> Result<(), NetError> {
    let Some(_work) = conn.begin_work() else {
        return Ok(());
    };
    admit(conn, identity).await
}

async fn admit(conn: &Arc<Connection>, identity: Identity) -> Result<(), NetError> {
    let ctx = Arc::clone(conn.context());
    let name = identity.name.clone();
    conn.set_identity(identity.clone())?;

    match ctx
        .registry
        .insert_bounded(&name, Arc::clone(conn), ctx.config.max_players)
    {
        Admission::Inserted => {}
        Admission::Duplicate => return Err(NetError::DuplicateLogin),
        Admission::Full => return Err(NetError::ServerFull),
    }

    let world = ctx.services.world.default_world();
    let fresh = || {
        Profile::new(
            &identity,
            &world,
            ctx.services.world.spawn_point(&world),
            ctx.config.gamemode,
        )
    };
    let profiles = Arc::clone(&ctx.services.profiles);
    let lookup = name.clone();
    let mut profile = match tokio::task::spawn_blocking(move || profiles.load_profile(&lookup)).await
    {
        Ok(Ok(Some(profile))) => profile,
        Ok(Ok(None)) => fresh(),
        Ok(Err(e)) => {
            warn!("Failed to load profile of {name}, using defaults: {e}");
            fresh()
        }
        Err(e) => {
            warn!("Profile lookup for {name} did not complete: {e}");
            fresh()
        }
    };
    if conn.is_draining() {
        // Never announced, so leave without a leave message.
        ctx.registry.remove_conn(conn);
        return Ok(());
    }
    profile.touch_login();
    conn.attach_profile(profile);

    conn.send_packet(
        login_id::LOGIN_SUCCESS,
        &LoginSuccess {
            uuid: identity.uuid.to_string(),
            username: name.clone(),
        },
    );
    conn.set_state(ProtocolState::Play);
    info!(
        "{name} [{}] logged in ({} online)",
        conn.addr(),
        ctx.registry.count()
    );
    conn.join_game();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_short_and_plain() {
        assert!(validate_name("Steve").is_ok());
        assert!(validate_name("a_b_9").is_ok());
        assert!(validate_name("sixteen_chars_ok").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("seventeen_chars_x").is_err());
        assert!(validate_name("white space").is_err());
        assert!(validate_name("Ünïcode").is_err());
    }
}
