// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction over TCP and BLE.
//!
//! The session machine and router never touch sockets or GATT directly;
//! they speak to a [`Transport`]: a bidirectional, message-granular
//! channel. Framing (TCP) and characteristic chunking (BLE) are internal
//! to the implementations:
//!
//! ```text
//! +-----------------------------+
//! |   Session machine / Router  |
//! +--------------+--------------+
//!                |  Message
//!    +-----------+-----------+
//!    |                       |
//! +--v---------+   +---------v--+
//! | TcpTransport|  | BleTransport|
//! | framing+codec| | GATT+codec  |
//! +------------+   +------------+
//! ```
//!
//! iOS USB tethering is not a distinct transport: it is TCP over a
//! tunneled local port and uses [`TcpTransport`] unchanged.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{CodecError, FrameError, Message};

/// TCP transport (length-prefixed framing over a tuned stream).
pub mod tcp;

/// BLE peripheral adapter seam and message bridge.
pub mod ble;

pub use ble::{BleAdapter, BleInbound, BleTransport, Characteristic};
pub use tcp::{bind_listener, TcpTransport};

/// Errors crossing the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No session is connected; outbound sends fail fast.
    #[error("no session connected")]
    NoSession,

    /// The transport was closed (peer EOF, teardown, or adapter loss).
    #[error("transport closed")]
    Closed,

    /// The outbound path cannot accept the message right now.
    #[error("outbound path backpressured")]
    Backpressured,

    /// Stream framing violation.
    #[error("framing: {0}")]
    Frame(#[from] FrameError),

    /// Message codec violation.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    /// Underlying socket error.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// Platform BLE adapter failure.
    #[error("ble adapter: {0}")]
    Adapter(String),
}

/// Liveness characteristics of a transport.
///
/// TCP relies on kernel keepalive plus EOF/RST detection and needs no
/// application timers; BLE needs both the heartbeat notify and the
/// inbound-silence watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessProfile {
    /// Tear the session down after this much inbound silence (BLE only).
    pub silence_timeout: Option<Duration>,
    /// Push a HEARTBEAT at this period (BLE only).
    pub heartbeat_period: Option<Duration>,
}

impl LivenessProfile {
    /// Kernel-keepalive-only profile (TCP).
    pub fn kernel() -> Self {
        Self {
            silence_timeout: None,
            heartbeat_period: None,
        }
    }

    /// Application-driven profile (BLE).
    pub fn application(silence_timeout: Duration, heartbeat_period: Duration) -> Self {
        Self {
            silence_timeout: Some(silence_timeout),
            heartbeat_period: Some(heartbeat_period),
        }
    }
}

/// Uniform bidirectional message channel consumed by the session layer.
pub trait Transport: Send {
    /// Send one message. Serialized internally; safe to call while another
    /// thread is in `recv`.
    fn send(&self, msg: &Message) -> Result<(), TransportError>;

    /// Wait up to `timeout` for one inbound message.
    ///
    /// `Ok(None)` means the timeout elapsed; `Err(TransportError::Closed)`
    /// means the peer is gone. Codec errors are returned per message so
    /// the caller can decide between skip and teardown.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError>;

    /// Whether the link is still up.
    fn is_connected(&self) -> bool;

    /// Close the link. Idempotent; pending `recv` calls unblock promptly.
    fn close(&self);

    /// Human-readable remote identity (address or BLE central id).
    fn remote(&self) -> String;

    /// Liveness profile for this transport kind.
    fn liveness(&self) -> LivenessProfile;

    /// Shareable outbound half for the router's reverse channel.
    fn outbound(&self) -> Arc<dyn OutboundLink>;
}

/// Thread-safe outbound half of a transport.
///
/// This is the single serialization point for host-originated messages:
/// every writer goes through the link's internal lock, so the on-wire byte
/// sequence is always an interleaving of whole messages.
pub trait OutboundLink: Send + Sync {
    /// Send one message, blocking on the writer lock (and, for TCP, on the
    /// kernel send buffer) as needed.
    fn send(&self, msg: &Message) -> Result<(), TransportError>;

    /// Send only if the writer lock is free right now.
    ///
    /// Returns `Ok(false)` when another writer holds the lock; the caller
    /// keeps (or replaces) its pending value. Used for latest-wins haptic.
    fn try_send(&self, msg: &Message) -> Result<bool, TransportError>;

    /// Whether the link is still up.
    fn is_connected(&self) -> bool;
}
