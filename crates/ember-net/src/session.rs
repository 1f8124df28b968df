//! Transport tasks of one connection.
//!
//! The reader task decrypts, deframes and routes inbound frames; the writer
//! task drains the outgoing queue, encrypts and writes. Either side learns
//! about a disconnect through the connection's close signal.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use ember_crypto::OutboundCipher;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::connection::{Connection, Outgoing};
use crate::constants::READ_BUF_SIZE;
use crate::error::NetError;
use crate::handlers::{self, ReaderState};

/// Bytes collected from the queue before a single write.
const WRITE_BATCH: usize = 64 * 1024;

/// Start the reader and writer tasks for `conn` over `stream`.
pub(crate) fn spawn<S>(conn: Arc<Connection>, stream: S, outgoing: mpsc::Receiver<Outgoing>)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    tokio::spawn(read_loop(Arc::clone(&conn), read_half));
    tokio::spawn(write_loop(conn, write_half, outgoing));
}

async fn closed(signal: &mut watch::Receiver<bool>) {
    let _ = signal.wait_for(|closed| *closed).await;
}

async fn closed_for(signal: &mut watch::Receiver<bool>, grace: Duration) {
    closed(signal).await;
    tokio::time::sleep(grace).await;
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

async fn read_loop<R>(conn: Arc<Connection>, mut reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut state = ReaderState::new(conn.context().config.max_frame_len);
    let mut signal = conn.close_signal();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let limit = conn.read_timeout();
        let read = async {
            match limit {
                Some(limit) => match timeout(limit, reader.read(&mut buf)).await {
                    Ok(result) => result.map_err(NetError::from),
                    Err(_) => Err(NetError::ReadTimeout),
                },
                None => reader.read(&mut buf).await.map_err(NetError::from),
            }
        };
        let read = tokio::select! {
            _ = closed(&mut signal) => break,
            read = read => read,
        };
        let result = match read {
            Ok(0) => Err(NetError::Closed),
            Ok(n) => process(&conn, &mut state, &mut buf[..n]).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            conn.disconnect(e);
            break;
        }
    }
    trace!("{conn}: reader stopped");
}

async fn process(
    conn: &Arc<Connection>,
    state: &mut ReaderState,
    data: &mut [u8],
) -> Result<(), NetError> {
    state.cipher.decrypt(data);
    state.decoder.feed(data);
    while !conn.is_draining() {
        let Some(frame) = state.decoder.decode()? else {
            break;
        };
        handlers::handle(conn, frame, state).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn append(
    out: &mut BytesMut,
    cipher: &mut OutboundCipher,
    item: Outgoing,
) -> Result<(), NetError> {
    match item {
        Outgoing::Frame(wire) => {
            let start = out.len();
            out.extend_from_slice(&wire);
            cipher.encrypt(&mut out[start..]);
        }
        Outgoing::EnableCipher(secret) => cipher.enable(&secret, &secret)?,
    }
    Ok(())
}

async fn write_loop<W>(conn: Arc<Connection>, mut writer: W, mut rx: mpsc::Receiver<Outgoing>)
where
    W: AsyncWrite + Unpin,
{
    let flush_timeout = conn.context().config.flush_timeout;
    let mut cipher = OutboundCipher::default();
    let mut signal = conn.close_signal();
    let mut out = BytesMut::with_capacity(WRITE_BATCH);

    let streamed: Result<(), NetError> = async {
        loop {
            let item = tokio::select! {
                biased;
                item = rx.recv() => item,
                _ = closed(&mut signal) => None,
            };
            let Some(item) = item else {
                return Ok(());
            };
            append(&mut out, &mut cipher, item)?;
            while out.len() < WRITE_BATCH {
                match rx.try_recv() {
                    Ok(item) => append(&mut out, &mut cipher, item)?,
                    Err(_) => break,
                }
            }
            tokio::select! {
                written = writer.write_all(&out) => written?,
                _ = closed_for(&mut signal, flush_timeout) => return Err(NetError::Closed),
            }
            out.clear();
        }
    }
    .await;

    if let Err(e) = streamed {
        conn.disconnect(e);
        let _ = writer.shutdown().await;
        trace!("{conn}: writer stopped");
        return;
    }

    // Closing: write what is still queued, then the farewell.
    let flush = async {
        while let Ok(item) = rx.try_recv() {
            append(&mut out, &mut cipher, item)?;
        }
        if let Some(farewell) = conn.take_farewell() {
            append(&mut out, &mut cipher, Outgoing::Frame(farewell))?;
        }
        writer.write_all(&out).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        Ok::<(), NetError>(())
    };
    match timeout(flush_timeout, flush).await {
        Ok(Ok(())) => trace!("{conn}: writer flushed"),
        Ok(Err(e)) => debug!("{conn}: final flush failed: {e}"),
        Err(_) => debug!("{conn}: final flush timed out"),
    }
}
