//! Route connection I/O.
//!
//! # Data Flow
//! ```text
//! handshake (INFO exchange)
//!     → record created and registered
//!     → serve_route:
//!         reader task: frames → counters, subscriptions, PING replies
//!         writer task: outbound queue → transport → flushed counters
//!     → close signal or EOF → both tasks stop
//!     → record removed from registry
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::observability::metrics;
use crate::route::protocol::{read_frame, Frame, ProtocolError};
use crate::route::record::{Outbound, RouteChannels, RouteRecord};
use crate::route::registry::RouteRegistry;

/// Exchange INFO frames with the peer. Returns the peer's server name.
///
/// The reader is returned wrapped so bytes buffered past the INFO line are
/// not lost.
pub async fn handshake<S>(
    stream: S,
    server_name: &str,
    timeout: Duration,
) -> Result<(BufReader<S>, String), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let exchange = async {
        let info = Frame::Info {
            server_name: server_name.to_string(),
        };
        stream.get_mut().write_all(&info.encode()).await?;
        stream.get_mut().flush().await?;
        match read_frame(&mut stream, 0).await? {
            Some(Frame::Info { server_name }) => Ok::<_, ProtocolError>(server_name),
            Some(other) => Err(ProtocolError::UnexpectedFrame {
                expected: "INFO",
                got: other.name().to_string(),
            }),
            None => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed during handshake",
            ))),
        }
    };
    let peer = tokio::time::timeout(timeout, exchange).await.map_err(|_| {
        ProtocolError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("handshake timed out after {:?}", timeout),
        ))
    })??;
    Ok((stream, peer))
}

/// Drive a registered route until it is closed, then unregister it.
pub async fn serve_route<S>(
    stream: BufReader<S>,
    record: Arc<RouteRecord>,
    channels: RouteChannels,
    registry: Arc<RouteRegistry>,
    max_payload: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let RouteChannels { outbound, close } = channels;
    let (reader, writer) = tokio::io::split(stream);

    let writer_task = tokio::spawn(write_loop(writer, outbound, record.clone(), close.clone()));

    if let Err(e) = read_loop(BufReader::new(reader), &record, close, max_payload).await {
        tracing::warn!(route_id = %record.id(), error = %e, "Route read error");
    }
    // Stop the writer whichever side ended first.
    record.close();
    match writer_task.await {
        Ok(Err(e)) => tracing::warn!(route_id = %record.id(), error = %e, "Route write error"),
        Err(e) => tracing::error!(route_id = %record.id(), error = %e, "Route writer task failed"),
        Ok(Ok(())) => {}
    }

    registry.remove(record.id());
    let solicited = record.is_solicited();
    metrics::record_route_closed(solicited);
    tracing::info!(
        route_id = %record.id(),
        url = record.url().map(|u| u.as_str()).unwrap_or(""),
        solicited,
        "Route closed"
    );
}

/// Resolves once the close flag is set or the record is gone.
async fn closed(close: &mut watch::Receiver<bool>) {
    let _ = close.wait_for(|closing| *closing).await;
}

async fn read_loop<R>(
    mut reader: R,
    record: &RouteRecord,
    mut close: watch::Receiver<bool>,
    max_payload: usize,
) -> Result<(), ProtocolError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = closed(&mut close) => return Ok(()),
            frame = read_frame(&mut reader, max_payload) => frame?,
        };
        match frame {
            None => return Ok(()),
            Some(Frame::Ping) => {
                record.send_control(&Frame::Pong);
            }
            Some(Frame::Pong) => {}
            Some(Frame::Sub { subject }) => {
                record.add_subscription(&subject);
            }
            Some(Frame::Unsub { subject }) => {
                record.remove_subscription(&subject);
            }
            Some(Frame::Msg { payload, .. }) => record.record_inbound(payload.len()),
            Some(Frame::Info { .. }) => {
                tracing::debug!(route_id = %record.id(), "Ignoring INFO after handshake");
            }
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    record: Arc<RouteRecord>,
    mut close: watch::Receiver<bool>,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = closed(&mut close) => break,
            next = outbound.recv() => next,
        };
        let Some(frame) = next else { break };
        writer.write_all(&frame.bytes).await?;
        writer.flush().await?;
        record.record_flushed(frame.bytes.len(), frame.payload_len);
    }
    let _ = writer.shutdown().await;
    Ok(())
}
