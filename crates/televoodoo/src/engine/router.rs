// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Router / event bus.
//!
//! Inbound: every decoded message is dispatched to the application as one
//! [`Event`] variant through a single callback. POSE is delivered
//! synchronously in the receive context; there is no queue between the
//! socket read and the callback, so callback latency is the only latency.
//!
//! Outbound: [`Router::send_haptic`] and [`Router::send_config`] are safe
//! from any thread. Both serialize through the transport's writer lock.
//! Under backpressure HAPTIC is latest-wins (a newer intensity replaces an
//! unsent one); CONFIG is never dropped: it blocks on the writer lock or
//! surfaces [`TransportError::Backpressured`].

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::{Message, PoseSample, MAX_CONFIG_LEN};
use crate::telemetry::HostMetrics;
use crate::transport::{OutboundLink, TransportError};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Transport EOF/RST from the peer.
    PeerClosed,
    /// Peer sent a matching BYE.
    Bye,
    /// Liveness timeout (BLE inbound silence).
    Timeout,
    /// No HELLO within the handshake deadline.
    HelloTimeout,
    /// Auth code mismatch.
    BadCode,
    /// Peer protocol version outside the supported range.
    VersionMismatch,
    /// Stream-invalidating protocol violation (framing or codec).
    ProtocolError,
    /// Host is shutting down.
    HostShutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisconnectReason::PeerClosed => "peer_closed",
            DisconnectReason::Bye => "bye",
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::HelloTimeout => "hello_timeout",
            DisconnectReason::BadCode => "bad_code",
            DisconnectReason::VersionMismatch => "version_mismatch",
            DisconnectReason::ProtocolError => "protocol_error",
            DisconnectReason::HostShutdown => "host_shutdown",
        };
        f.write_str(s)
    }
}

/// A decoded mobile command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Toggle recording.
    Recording(bool),
    /// Keep the current recording alive.
    KeepRecording(bool),
    /// Command type this host does not know; forwarded raw.
    Unknown {
        /// Raw command type byte.
        cmd_type: u8,
        /// Raw value byte.
        value: u8,
    },
}

impl Command {
    /// Map a raw CMD message to a command.
    pub fn from_wire(cmd_type: u8, value: u8) -> Self {
        match cmd_type {
            1 => Command::Recording(value != 0),
            2 => Command::KeepRecording(value != 0),
            _ => Command::Unknown { cmd_type, value },
        }
    }
}

/// Everything the core reports to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A transport link came up (TCP accept / BLE central connect).
    Connected {
        /// Remote address or BLE central id.
        remote: String,
    },
    /// HELLO validated; the session is established.
    Authenticated {
        /// Session id from the HELLO.
        session_id: u32,
        /// Negotiated protocol version.
        version: u8,
    },
    /// One pose sample, in wire order.
    Pose(PoseSample),
    /// A discrete command from the mobile.
    Command(Command),
    /// The session ended.
    Disconnected {
        /// Why it ended.
        reason: DisconnectReason,
    },
    /// A recoverable host-side error (bind failure, socket error).
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Application callback receiving every [`Event`].
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

/// Central dispatch and reverse-channel handle.
///
/// One router exists per [`Host`](crate::Host); the supervisor attaches
/// the active transport's outbound half after authentication and detaches
/// it on teardown.
pub struct Router {
    sink: EventSink,
    outbound: Mutex<Option<Arc<dyn OutboundLink>>>,
    pending_haptic: Mutex<Option<Message>>,
    metrics: Arc<HostMetrics>,
}

impl Router {
    /// Create a router delivering events to `sink`.
    pub fn new(sink: EventSink, metrics: Arc<HostMetrics>) -> Self {
        Self {
            sink,
            outbound: Mutex::new(None),
            pending_haptic: Mutex::new(None),
            metrics,
        }
    }

    /// Deliver one event to the application.
    ///
    /// A panicking callback must not tear down the core: the panic is
    /// caught, logged, and the session continues. High-frequency traffic
    /// (POSE) logs at debug level only; lifecycle events log where they
    /// are produced.
    pub fn dispatch(&self, event: Event) {
        if let Event::Pose(pose) = &event {
            log::debug!(
                "[router] pose seq={} ts_us={} movement_start={}",
                pose.seq,
                pose.timestamp_us,
                pose.movement_start()
            );
        }
        let sink = Arc::clone(&self.sink);
        if catch_unwind(AssertUnwindSafe(move || sink(event))).is_err() {
            self.metrics.record_callback_panic();
            log::error!("[router] application callback panicked; event dropped");
        }
    }

    /// Attach the outbound half of the newly-authenticated transport.
    pub(crate) fn attach(&self, link: Arc<dyn OutboundLink>) {
        *self.pending_haptic.lock() = None;
        *self.outbound.lock() = Some(link);
    }

    /// Detach the outbound half; subsequent sends fail with `NoSession`.
    pub(crate) fn detach(&self) {
        *self.outbound.lock() = None;
        *self.pending_haptic.lock() = None;
    }

    fn link(&self) -> Result<Arc<dyn OutboundLink>, TransportError> {
        match self.outbound.lock().as_ref() {
            Some(link) if link.is_connected() => Ok(Arc::clone(link)),
            _ => Err(TransportError::NoSession),
        }
    }

    /// Send haptic feedback to the mobile.
    ///
    /// `intensity` is clamped to `[0, 1]`; NaN is coerced to 0. If the
    /// writer is busy the value is parked and the newest parked value wins
    /// once the writer frees up.
    pub fn send_haptic(&self, intensity: f32, channel: u8) -> Result<(), TransportError> {
        let link = self.link()?;
        let msg = Message::Haptic {
            intensity: clamp_intensity(intensity),
            channel,
        };
        *self.pending_haptic.lock() = Some(msg);
        self.flush_pending_haptic(&*link)
    }

    /// Send an opaque configuration payload to the mobile.
    ///
    /// Never dropped: blocks on the writer lock until sent, or fails with
    /// a definite error. Payloads beyond one frame are rejected with
    /// `Backpressured` before touching the wire.
    pub fn send_config(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if payload.len() > MAX_CONFIG_LEN {
            return Err(TransportError::Backpressured);
        }
        let link = self.link()?;
        // Preserve call order: an intensity parked by this thread goes out
        // before the config written after it.
        self.flush_pending_haptic(&*link)?;
        link.send(&Message::Config { payload })
    }

    /// Push any parked haptic value through the writer if it is free.
    fn flush_pending_haptic(&self, link: &dyn OutboundLink) -> Result<(), TransportError> {
        loop {
            let Some(msg) = self.pending_haptic.lock().take() else {
                return Ok(());
            };
            match link.try_send(&msg) {
                Ok(true) => continue,
                Ok(false) => {
                    // Writer busy: park the value again unless a newer one
                    // arrived while we were trying.
                    let mut pending = self.pending_haptic.lock();
                    if pending.is_none() {
                        *pending = Some(msg);
                    }
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Clamp haptic intensity into `[0, 1]`, coercing NaN to 0.
fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Outbound link capturing sent messages, with a controllable
    /// "writer busy" switch.
    struct RecordingLink {
        sent: PlMutex<Vec<Message>>,
        busy: AtomicBool,
        connected: AtomicBool,
    }

    impl RecordingLink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: PlMutex::new(Vec::new()),
                busy: AtomicBool::new(false),
                connected: AtomicBool::new(true),
            })
        }
    }

    impl OutboundLink for RecordingLink {
        fn send(&self, msg: &Message) -> Result<(), TransportError> {
            self.sent.lock().push(msg.clone());
            Ok(())
        }

        fn try_send(&self, msg: &Message) -> Result<bool, TransportError> {
            if self.busy.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.send(msg)?;
            Ok(true)
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    fn router() -> (Router, Arc<RecordingLink>) {
        let sink: EventSink = Arc::new(|_| {});
        let router = Router::new(sink, Arc::new(HostMetrics::new()));
        let link = RecordingLink::new();
        router.attach(link.clone());
        (router, link)
    }

    #[test]
    fn test_send_haptic_clamps() {
        let (router, link) = router();
        router.send_haptic(1.7, 0).expect("send");
        router.send_haptic(-0.4, 0).expect("send");
        router.send_haptic(f32::NAN, 0).expect("send");

        let sent = link.sent.lock();
        let intensities: Vec<f32> = sent
            .iter()
            .map(|m| match m {
                Message::Haptic { intensity, .. } => *intensity,
                other => panic!("unexpected {}", other.name()),
            })
            .collect();
        assert_eq!(intensities, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_haptic_latest_wins_when_writer_busy() {
        let (router, link) = router();
        link.busy.store(true, Ordering::SeqCst);
        router.send_haptic(0.2, 0).expect("send");
        router.send_haptic(0.9, 0).expect("send");
        assert!(link.sent.lock().is_empty());

        // Writer frees up: only the newest value goes out.
        link.busy.store(false, Ordering::SeqCst);
        router.send_config(b"{}".to_vec()).expect("send");

        let sent = link.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Message::Haptic {
                intensity: 0.9,
                channel: 0,
            }
        );
        assert!(matches!(sent[1], Message::Config { .. }));
    }

    #[test]
    fn test_no_session_fails_fast() {
        let sink: EventSink = Arc::new(|_| {});
        let router = Router::new(sink, Arc::new(HostMetrics::new()));
        assert!(matches!(
            router.send_haptic(0.5, 0),
            Err(TransportError::NoSession)
        ));
        assert!(matches!(
            router.send_config(b"{}".to_vec()),
            Err(TransportError::NoSession)
        ));
    }

    #[test]
    fn test_detach_restores_no_session() {
        let (router, _link) = router();
        router.detach();
        assert!(matches!(
            router.send_haptic(0.5, 0),
            Err(TransportError::NoSession)
        ));
    }

    #[test]
    fn test_disconnected_link_is_no_session() {
        let (router, link) = router();
        link.connected.store(false, Ordering::SeqCst);
        assert!(matches!(
            router.send_haptic(0.5, 0),
            Err(TransportError::NoSession)
        ));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let (router, link) = router();
        let result = router.send_config(vec![0u8; MAX_CONFIG_LEN + 1]);
        assert!(matches!(result, Err(TransportError::Backpressured)));
        assert!(link.sent.lock().is_empty());
    }

    #[test]
    fn test_callback_panic_contained() {
        let sink: EventSink = Arc::new(|event| {
            if matches!(event, Event::Authenticated { .. }) {
                panic!("application bug");
            }
        });
        let metrics = Arc::new(HostMetrics::new());
        let router = Router::new(sink, metrics.clone());
        router.dispatch(Event::Authenticated {
            session_id: 1,
            version: 1,
        });
        // Still usable afterwards.
        router.dispatch(Event::Disconnected {
            reason: DisconnectReason::PeerClosed,
        });
        assert_eq!(metrics.snapshot().callback_panics, 1);
    }

    #[test]
    fn test_command_mapping() {
        assert_eq!(Command::from_wire(1, 1), Command::Recording(true));
        assert_eq!(Command::from_wire(1, 0), Command::Recording(false));
        assert_eq!(Command::from_wire(2, 1), Command::KeepRecording(true));
        assert_eq!(
            Command::from_wire(9, 3),
            Command::Unknown {
                cmd_type: 9,
                value: 3,
            }
        );
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(DisconnectReason::BadCode.to_string(), "bad_code");
        assert_eq!(DisconnectReason::HostShutdown.to_string(), "host_shutdown");
    }
}
