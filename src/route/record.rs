//! Per-route state.
//!
//! # Responsibilities
//! - Hold the immutable identity of a route (id, URL, remote endpoint)
//! - Track traffic counters, subscriptions and the solicited flag
//! - Own the outbound queue and the close signal of the connection
//!
//! # Design Decisions
//! - All mutable fields sit behind one per-record mutex, separate from the
//!   registry lock, so a reader sees every counter of a record at one instant
//! - Closing is a signal only; the connection task performs the teardown

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::net::connection::ConnectionId;
use crate::route::protocol::Frame;

/// Mutable fields of a route, written by its I/O tasks.
#[derive(Debug, Default)]
struct RouteState {
    solicited: bool,
    subjects: HashSet<String>,
    pending_bytes: usize,
    in_msgs: u64,
    out_msgs: u64,
    in_bytes: u64,
    out_bytes: u64,
}

/// Point-in-time copy of a route record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub id: ConnectionId,
    pub url: Option<String>,
    pub remote: Option<SocketAddr>,
    pub solicited: bool,
    pub subscriptions: usize,
    pub pending_bytes: usize,
    pub in_msgs: u64,
    pub out_msgs: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

/// A frame waiting on the outbound queue.
#[derive(Debug)]
pub struct Outbound {
    pub bytes: Vec<u8>,
    /// Payload size when the frame carries a message, `None` for control frames.
    pub payload_len: Option<usize>,
}

/// Receiving ends handed to the connection task that serves a record.
#[derive(Debug)]
pub struct RouteChannels {
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    pub close: watch::Receiver<bool>,
}

/// A single route connection as seen by the rest of the node.
#[derive(Debug)]
pub struct RouteRecord {
    id: ConnectionId,
    url: Option<Url>,
    remote: Option<SocketAddr>,
    state: Mutex<RouteState>,
    outbound: mpsc::UnboundedSender<Outbound>,
    close_tx: watch::Sender<bool>,
}

impl RouteRecord {
    /// Create a record for a freshly handshaken route.
    ///
    /// `url` is `Some` for routes this node dialed.
    pub fn new(
        url: Option<Url>,
        remote: Option<SocketAddr>,
        solicited: bool,
    ) -> (Arc<Self>, RouteChannels) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);
        let record = Arc::new(Self {
            id: ConnectionId::new(),
            url,
            remote,
            state: Mutex::new(RouteState {
                solicited,
                ..RouteState::default()
            }),
            outbound: outbound_tx,
            close_tx,
        });
        let channels = RouteChannels {
            outbound: outbound_rx,
            close: close_rx,
        };
        (record, channels)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn state(&self) -> MutexGuard<'_, RouteState> {
        // A panicking I/O task must not wedge the admin surface.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy every field under one acquisition of the record lock.
    pub fn snapshot(&self) -> RouteSnapshot {
        let state = self.state();
        RouteSnapshot {
            id: self.id,
            url: self.url.as_ref().map(|u| u.as_str().to_string()),
            remote: self.remote,
            solicited: state.solicited,
            subscriptions: state.subjects.len(),
            pending_bytes: state.pending_bytes,
            in_msgs: state.in_msgs,
            out_msgs: state.out_msgs,
            in_bytes: state.in_bytes,
            out_bytes: state.out_bytes,
        }
    }

    /// Whether this node owns reconnecting the route.
    pub fn is_solicited(&self) -> bool {
        self.state().solicited
    }

    /// Give up reconnect ownership. Must happen before [`RouteRecord::close`]
    /// when the route is being removed on purpose.
    pub fn clear_solicited(&self) {
        self.state().solicited = false;
    }

    /// Signal the connection task to close. Idempotent.
    pub fn close(&self) {
        self.close_tx.send_replace(true);
    }

    pub fn is_closing(&self) -> bool {
        *self.close_tx.borrow()
    }

    /// Resolve once [`RouteRecord::close`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.close_tx.subscribe();
        let _ = rx.wait_for(|closing| *closing).await;
    }

    /// Queue a message for the peer. Returns false once the writer is gone.
    pub fn send_message(&self, subject: &str, payload: &[u8]) -> bool {
        let frame = Frame::Msg {
            subject: subject.to_string(),
            payload: payload.to_vec(),
        };
        self.enqueue(Outbound {
            bytes: frame.encode(),
            payload_len: Some(payload.len()),
        })
    }

    /// Queue a control frame (PING, PONG, INFO).
    pub fn send_control(&self, frame: &Frame) -> bool {
        self.enqueue(Outbound {
            bytes: frame.encode(),
            payload_len: None,
        })
    }

    fn enqueue(&self, outbound: Outbound) -> bool {
        let len = outbound.bytes.len();
        let mut state = self.state();
        if self.outbound.send(outbound).is_err() {
            return false;
        }
        state.pending_bytes += len;
        true
    }

    /// Account for a frame the writer has flushed to the transport.
    pub fn record_flushed(&self, frame_len: usize, payload_len: Option<usize>) {
        let mut state = self.state();
        state.pending_bytes = state.pending_bytes.saturating_sub(frame_len);
        if let Some(payload_len) = payload_len {
            state.out_msgs += 1;
            state.out_bytes += payload_len as u64;
        }
    }

    /// Account for a message received from the peer.
    pub fn record_inbound(&self, payload_len: usize) {
        let mut state = self.state();
        state.in_msgs += 1;
        state.in_bytes += payload_len as u64;
    }

    /// Returns true when the subject was not already registered.
    pub fn add_subscription(&self, subject: &str) -> bool {
        self.state().subjects.insert(subject.to_string())
    }

    pub fn remove_subscription(&self, subject: &str) -> bool {
        self.state().subjects.remove(subject)
    }
}
