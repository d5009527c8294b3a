// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host counters.
//!
//! Cheap atomic counters for monitoring stream health; read them with
//! [`HostMetrics::snapshot`]. Counters only ever increase (except
//! `active_session`, which tracks the single connected session).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::engine::DisconnectReason;

/// Counters for one [`Host`](crate::Host) instance.
#[derive(Debug)]
pub struct HostMetrics {
    /// Beacons broadcast since start.
    beacons_sent: AtomicU64,
    /// Sessions that reached `Connected`.
    sessions_opened: AtomicU64,
    /// Whether a session is currently connected.
    active_session: AtomicBool,

    // Per-reason close counters.
    closed_peer: AtomicU64,
    closed_bye: AtomicU64,
    closed_timeout: AtomicU64,
    closed_hello_timeout: AtomicU64,
    closed_bad_code: AtomicU64,
    closed_version_mismatch: AtomicU64,
    closed_protocol_error: AtomicU64,
    closed_host_shutdown: AtomicU64,

    /// Payload bytes received (framing included).
    bytes_in: AtomicU64,
    /// Payload bytes sent (framing included).
    bytes_out: AtomicU64,

    /// Messages rejected for a bad magic.
    bad_magic: AtomicU64,
    /// Messages skipped for an unknown type id.
    unknown_type: AtomicU64,
    /// HELLOs rejected for a version outside the supported range.
    version_mismatch: AtomicU64,
    /// Connections turned away with ACK(BUSY).
    busy_rejected: AtomicU64,
    /// Application callbacks that panicked.
    callback_panics: AtomicU64,

    /// When this instance was created.
    start_time: Instant,
}

impl HostMetrics {
    /// Create a zeroed metrics instance.
    pub fn new() -> Self {
        Self {
            beacons_sent: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            active_session: AtomicBool::new(false),
            closed_peer: AtomicU64::new(0),
            closed_bye: AtomicU64::new(0),
            closed_timeout: AtomicU64::new(0),
            closed_hello_timeout: AtomicU64::new(0),
            closed_bad_code: AtomicU64::new(0),
            closed_version_mismatch: AtomicU64::new(0),
            closed_protocol_error: AtomicU64::new(0),
            closed_host_shutdown: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            bad_magic: AtomicU64::new(0),
            unknown_type: AtomicU64::new(0),
            version_mismatch: AtomicU64::new(0),
            busy_rejected: AtomicU64::new(0),
            callback_panics: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    // ===== Recording =====

    /// One beacon datagram left the socket.
    pub fn record_beacon_sent(&self) {
        self.beacons_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// A session reached `Connected`.
    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.active_session.store(true, Ordering::Release);
    }

    /// A session ended.
    pub fn record_session_closed(&self, reason: DisconnectReason) {
        self.active_session.store(false, Ordering::Release);
        let counter = match reason {
            DisconnectReason::PeerClosed => &self.closed_peer,
            DisconnectReason::Bye => &self.closed_bye,
            DisconnectReason::Timeout => &self.closed_timeout,
            DisconnectReason::HelloTimeout => &self.closed_hello_timeout,
            DisconnectReason::BadCode => &self.closed_bad_code,
            DisconnectReason::VersionMismatch => &self.closed_version_mismatch,
            DisconnectReason::ProtocolError => &self.closed_protocol_error,
            DisconnectReason::HostShutdown => &self.closed_host_shutdown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Inbound bytes (frame prefix included where applicable).
    pub fn record_bytes_in(&self, n: usize) {
        self.bytes_in.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Outbound bytes (frame prefix included where applicable).
    pub fn record_bytes_out(&self, n: usize) {
        self.bytes_out.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// A payload failed the magic check.
    pub fn record_bad_magic(&self) {
        self.bad_magic.fetch_add(1, Ordering::Relaxed);
    }

    /// A message with an unknown type id was skipped.
    pub fn record_unknown_type(&self) {
        self.unknown_type.fetch_add(1, Ordering::Relaxed);
    }

    /// A HELLO was rejected for its version.
    pub fn record_version_mismatch(&self) {
        self.version_mismatch.fetch_add(1, Ordering::Relaxed);
    }

    /// A newcomer was turned away with ACK(BUSY).
    pub fn record_busy_rejected(&self) {
        self.busy_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// An application callback panicked.
    pub fn record_callback_panic(&self) {
        self.callback_panics.fetch_add(1, Ordering::Relaxed);
    }

    // ===== Reading =====

    /// Whether a session is connected right now.
    pub fn has_active_session(&self) -> bool {
        self.active_session.load(Ordering::Acquire)
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            beacons_sent: self.beacons_sent.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: SessionsClosed {
                peer_closed: self.closed_peer.load(Ordering::Relaxed),
                bye: self.closed_bye.load(Ordering::Relaxed),
                timeout: self.closed_timeout.load(Ordering::Relaxed),
                hello_timeout: self.closed_hello_timeout.load(Ordering::Relaxed),
                bad_code: self.closed_bad_code.load(Ordering::Relaxed),
                version_mismatch: self.closed_version_mismatch.load(Ordering::Relaxed),
                protocol_error: self.closed_protocol_error.load(Ordering::Relaxed),
                host_shutdown: self.closed_host_shutdown.load(Ordering::Relaxed),
            },
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            bad_magic: self.bad_magic.load(Ordering::Relaxed),
            unknown_type: self.unknown_type.load(Ordering::Relaxed),
            version_mismatch: self.version_mismatch.load(Ordering::Relaxed),
            busy_rejected: self.busy_rejected.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-reason session close counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionsClosed {
    /// Transport EOF/RST.
    pub peer_closed: u64,
    /// Matching BYE.
    pub bye: u64,
    /// Liveness timeout.
    pub timeout: u64,
    /// No HELLO in time.
    pub hello_timeout: u64,
    /// Auth code mismatch.
    pub bad_code: u64,
    /// Version outside range.
    pub version_mismatch: u64,
    /// Stream-invalidating violation.
    pub protocol_error: u64,
    /// Host shutdown.
    pub host_shutdown: u64,
}

impl SessionsClosed {
    /// Total closes across all reasons.
    pub fn total(&self) -> u64 {
        self.peer_closed
            + self.bye
            + self.timeout
            + self.hello_timeout
            + self.bad_code
            + self.version_mismatch
            + self.protocol_error
            + self.host_shutdown
    }
}

/// Point-in-time copy of all host counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Beacons broadcast.
    pub beacons_sent: u64,
    /// Sessions that reached `Connected`.
    pub sessions_opened: u64,
    /// Per-reason close counts.
    pub sessions_closed: SessionsClosed,
    /// Bytes received.
    pub bytes_in: u64,
    /// Bytes sent.
    pub bytes_out: u64,
    /// Bad-magic rejections.
    pub bad_magic: u64,
    /// Unknown-type skips.
    pub unknown_type: u64,
    /// Version rejections.
    pub version_mismatch: u64,
    /// ACK(BUSY) rejections.
    pub busy_rejected: u64,
    /// Contained callback panics.
    pub callback_panics: u64,
    /// Milliseconds since the metrics were created.
    pub uptime_ms: u64,
}
