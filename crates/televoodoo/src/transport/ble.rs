// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLE peripheral adapter seam and message bridge.
//!
//! Platform glue (CoreBluetooth, BlueZ D-Bus) stays outside the core: it
//! implements [`BleAdapter`] and feeds characteristic writes into a
//! [`BleInbound`] handle. The core's [`BleTransport`] turns those writes
//! into decoded messages and maps host-originated messages onto Notify
//! characteristics, so the session machine sees the same message-granular
//! channel as over TCP.
//!
//! GATT layout (service `1C8FD138-FC18-4846-954D-E509366AEF61`):
//!
//! | Char      | Properties                  | Dir  | Carries            |
//! |-----------|-----------------------------|------|--------------------|
//! | Auth      | Write                       | M->H | 6-char code / HELLO|
//! | Pose      | Write, WriteWithoutResponse | M->H | POSE               |
//! | Heartbeat | Read, Notify                | H->M | HEARTBEAT          |
//! | Command   | Write, WriteWithoutResponse | M->H | CMD                |
//! | Haptic    | Read, Notify                | H->M | HAPTIC             |
//! | Config    | Read, Notify                | H->M | CONFIG             |
//!
//! Each write carries exactly one full message, with no framing. The link must
//! negotiate an MTU of at least 64 bytes so a 46-byte POSE fits one write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::protocol::constants::{
    AUTH_CODE_LEN, BLE_CHAR_AUTH_UUID, BLE_CHAR_COMMAND_UUID, BLE_CHAR_CONFIG_UUID,
    BLE_CHAR_HAPTIC_UUID, BLE_CHAR_HEARTBEAT_UUID, BLE_CHAR_POSE_UUID, BLE_MIN_MTU, MAGIC,
    PROTOCOL_VERSION,
};
use crate::protocol::{codec, Message};
use crate::telemetry::HostMetrics;
use crate::transport::{LivenessProfile, OutboundLink, Transport, TransportError};

/// The six Televoodoo GATT characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Write: auth code (wrapped into a HELLO).
    Auth,
    /// Write / WriteWithoutResponse: POSE messages.
    Pose,
    /// Read / Notify: HEARTBEAT messages.
    Heartbeat,
    /// Write / WriteWithoutResponse: CMD messages.
    Command,
    /// Read / Notify: HAPTIC messages.
    Haptic,
    /// Read / Notify: CONFIG messages.
    Config,
}

impl Characteristic {
    /// Characteristic UUID.
    pub fn uuid(&self) -> &'static str {
        match self {
            Characteristic::Auth => BLE_CHAR_AUTH_UUID,
            Characteristic::Pose => BLE_CHAR_POSE_UUID,
            Characteristic::Heartbeat => BLE_CHAR_HEARTBEAT_UUID,
            Characteristic::Command => BLE_CHAR_COMMAND_UUID,
            Characteristic::Haptic => BLE_CHAR_HAPTIC_UUID,
            Characteristic::Config => BLE_CHAR_CONFIG_UUID,
        }
    }

    /// All characteristics, in declaration order.
    pub fn all() -> [Characteristic; 6] {
        [
            Characteristic::Auth,
            Characteristic::Pose,
            Characteristic::Heartbeat,
            Characteristic::Command,
            Characteristic::Haptic,
            Characteristic::Config,
        ]
    }
}

/// Capability the platform BLE glue implements.
///
/// All methods are called from core threads; implementations must be
/// thread-safe. Inbound traffic flows the other way, through the
/// [`BleInbound`] handle.
pub trait BleAdapter: Send + Sync {
    /// Start advertising the Televoodoo service under `local_name`.
    fn start_advertising(&self, local_name: &str) -> Result<(), TransportError>;

    /// Stop advertising.
    fn stop_advertising(&self);

    /// Push a Notify on a characteristic to the connected central.
    fn notify(&self, characteristic: Characteristic, payload: &[u8])
        -> Result<(), TransportError>;

    /// Drop the link to the connected central.
    fn disconnect(&self);

    /// Currently negotiated ATT MTU (payload bytes per write).
    fn mtu(&self) -> usize;
}

/// Link-level events pushed by the platform glue.
enum LinkEvent {
    Connected { remote: String },
    Write { ch: Characteristic, data: Vec<u8> },
    Disconnected,
}

/// Handle the platform glue uses to feed the core.
///
/// Cheap to clone; all methods are fire-and-forget (events for a transport
/// that is already gone are silently discarded).
#[derive(Clone)]
pub struct BleInbound {
    tx: Sender<LinkEvent>,
}

impl BleInbound {
    /// A central connected to the peripheral.
    pub fn central_connected(&self, remote: &str) {
        let _ = self.tx.send(LinkEvent::Connected {
            remote: remote.to_owned(),
        });
    }

    /// A central wrote `data` to `characteristic`.
    pub fn characteristic_written(&self, characteristic: Characteristic, data: &[u8]) {
        let _ = self.tx.send(LinkEvent::Write {
            ch: characteristic,
            data: data.to_vec(),
        });
    }

    /// The central disconnected (or the link was lost).
    pub fn central_disconnected(&self) {
        let _ = self.tx.send(LinkEvent::Disconnected);
    }
}

/// Outbound half: notifies serialized behind one lock.
struct BleOutbound {
    adapter: Arc<dyn BleAdapter>,
    write_lock: Mutex<()>,
    connected: Arc<AtomicBool>,
    metrics: Arc<HostMetrics>,
}

impl BleOutbound {
    fn notify_for(&self, msg: &Message) -> Result<(), TransportError> {
        let ch = match msg {
            Message::Heartbeat { .. } => Characteristic::Heartbeat,
            Message::Haptic { .. } => Characteristic::Haptic,
            Message::Config { .. } => Characteristic::Config,
            // No ACK/BYE characteristic exists: a successful auth is
            // implicit in the link staying up (the CONFIG notify follows),
            // and a failed one disconnects the link right after.
            Message::Ack { .. } | Message::Bye { .. } => {
                log::debug!("[ble] {} has no characteristic; implicit on this link", msg.name());
                return Ok(());
            }
            other => {
                log::warn!("[ble] refusing to notify mobile-originated {}", other.name());
                return Ok(());
            }
        };
        let payload = codec::encode(msg);
        self.adapter.notify(ch, &payload)?;
        self.metrics.record_bytes_out(payload.len());
        Ok(())
    }
}

impl OutboundLink for BleOutbound {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        let _guard = self.write_lock.lock();
        self.notify_for(msg)
    }

    fn try_send(&self, msg: &Message) -> Result<bool, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        match self.write_lock.try_lock() {
            Some(_guard) => self.notify_for(msg).map(|()| true),
            None => Ok(false),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Message-granular transport over the BLE peripheral link.
pub struct BleTransport {
    adapter: Arc<dyn BleAdapter>,
    rx: Receiver<LinkEvent>,
    connected: Arc<AtomicBool>,
    remote: Mutex<Option<String>>,
    outbound: Arc<BleOutbound>,
    liveness: LivenessProfile,
    metrics: Arc<HostMetrics>,
}

impl BleTransport {
    /// Create the transport and the inbound handle for the platform glue.
    pub fn new(
        adapter: Arc<dyn BleAdapter>,
        silence_timeout: Duration,
        heartbeat_period: Duration,
        metrics: Arc<HostMetrics>,
    ) -> (Self, BleInbound) {
        let (tx, rx) = channel();
        let connected = Arc::new(AtomicBool::new(false));
        let outbound = Arc::new(BleOutbound {
            adapter: Arc::clone(&adapter),
            write_lock: Mutex::new(()),
            connected: Arc::clone(&connected),
            metrics: Arc::clone(&metrics),
        });
        let transport = Self {
            adapter,
            rx,
            connected,
            remote: Mutex::new(None),
            outbound,
            liveness: LivenessProfile::application(silence_timeout, heartbeat_period),
            metrics,
        };
        (transport, BleInbound { tx })
    }

    /// Whether the negotiated MTU can carry every message in one write.
    pub fn mtu_sufficient(&self) -> bool {
        self.adapter.mtu() >= BLE_MIN_MTU
    }

    /// Adapter handle (for advertising control in the session loop).
    pub(crate) fn adapter(&self) -> Arc<dyn BleAdapter> {
        Arc::clone(&self.adapter)
    }

    /// Map one characteristic write onto a wire message.
    ///
    /// A raw 6-byte Auth write (the form the phone app uses) is wrapped
    /// into a synthetic HELLO with `session_id = 0` and the current
    /// protocol version; anything that starts with the magic is decoded
    /// as a full message.
    fn map_write(ch: Characteristic, data: &[u8]) -> Result<Message, TransportError> {
        if ch == Characteristic::Auth
            && data.len() == AUTH_CODE_LEN
            && !data.starts_with(&MAGIC)
        {
            let mut code = [0u8; AUTH_CODE_LEN];
            code.copy_from_slice(data);
            return Ok(Message::Hello {
                session_id: 0,
                code,
                version: PROTOCOL_VERSION,
            });
        }
        Ok(codec::decode(data)?)
    }
}

impl Transport for BleTransport {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        self.outbound.send(msg)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(LinkEvent::Connected { remote }) => {
                log::info!("[ble] central connected: {}", remote);
                *self.remote.lock() = Some(remote);
                self.connected.store(true, Ordering::Release);
                Ok(None)
            }
            Ok(LinkEvent::Write { ch, data }) => {
                self.metrics.record_bytes_in(data.len());
                Self::map_write(ch, &data).map(Some)
            }
            Ok(LinkEvent::Disconnected) => {
                self.connected.store(false, Ordering::Release);
                Err(TransportError::Closed)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.connected.store(false, Ordering::Release);
                Err(TransportError::Closed)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn close(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.adapter.disconnect();
        }
    }

    fn remote(&self) -> String {
        self.remote
            .lock()
            .clone()
            .unwrap_or_else(|| "ble-central".to_owned())
    }

    fn liveness(&self) -> LivenessProfile {
        self.liveness
    }

    fn outbound(&self) -> Arc<dyn OutboundLink> {
        Arc::clone(&self.outbound) as Arc<dyn OutboundLink>
    }
}

// ============================================================================
// Tests
// ============================================================================

/// In-memory adapter shared by BLE and session tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Adapter recording notifies; configurable MTU.
    pub(crate) struct MockAdapter {
        /// Every notify pushed to the central, in order.
        pub notifies: Mutex<Vec<(Characteristic, Vec<u8>)>>,
        /// Set when the core dropped the link.
        pub disconnects: AtomicBool,
        /// Count of `start_advertising` calls.
        pub advertising_starts: std::sync::atomic::AtomicU32,
        /// Negotiated MTU to report.
        pub mtu: usize,
    }

    impl MockAdapter {
        pub fn new(mtu: usize) -> Arc<Self> {
            Arc::new(Self {
                notifies: Mutex::new(Vec::new()),
                disconnects: AtomicBool::new(false),
                advertising_starts: std::sync::atomic::AtomicU32::new(0),
                mtu,
            })
        }
    }

    impl BleAdapter for MockAdapter {
        fn start_advertising(&self, _local_name: &str) -> Result<(), TransportError> {
            self.advertising_starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop_advertising(&self) {}

        fn notify(
            &self,
            characteristic: Characteristic,
            payload: &[u8],
        ) -> Result<(), TransportError> {
            self.notifies.lock().push((characteristic, payload.to_vec()));
            Ok(())
        }

        fn disconnect(&self) {
            self.disconnects.store(true, Ordering::SeqCst);
        }

        fn mtu(&self) -> usize {
            self.mtu
        }
    }
}
