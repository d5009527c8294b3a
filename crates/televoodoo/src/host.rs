// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The owning `Host` handle.
//!
//! [`Host::start`] wires discovery, the session supervisor and the router
//! together and returns the handle that owns all of it; there is no
//! global state. [`Host::stop`] (or Drop) tears everything down, sending
//! a best-effort BYE to a connected mobile so the app can distinguish a
//! deliberate shutdown from a lost link.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::config::HostConfig;
use crate::discovery::{local_ip, BeaconBroadcaster};
use crate::engine::{EventSink, Router};
use crate::session::supervisor;
use crate::telemetry::{HostMetrics, MetricsSnapshot};
use crate::transport::{bind_listener, BleAdapter, BleInbound, BleTransport, TransportError};

/// Which physical transport the host serves.
///
/// WiFi and USB tethering are both plain TCP (on iOS the USB path is a
/// tunneled local port, which changes nothing above the socket), so they
/// share one implementation and differ only in the log line.
pub enum TransportSelector {
    /// TCP over the local network.
    Wifi,
    /// TCP over a USB tethering interface (or an iOS usbmuxd tunnel).
    UsbTcp,
    /// BLE peripheral via the given platform adapter.
    Ble(Arc<dyn BleAdapter>),
}

/// Errors from [`Host::start`].
#[derive(Debug, Error)]
pub enum HostError {
    /// The configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Binding a socket or spawning a thread failed.
    #[error("startup i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Running host instance.
///
/// Dropping the handle stops the host.
pub struct Host {
    router: Arc<Router>,
    metrics: Arc<HostMetrics>,
    shutdown: Arc<AtomicBool>,
    supervisor: Option<JoinHandle<()>>,
    beacon: Option<BeaconBroadcaster>,
    tcp_port: Option<u16>,
    ble_inbound: Option<BleInbound>,
}

impl Host {
    /// Start the host on the selected transport.
    ///
    /// Returns once the listener (or advertiser) is up; session handling
    /// and beacon broadcasting run on background threads. Events arrive
    /// on `sink` from the supervisor thread.
    pub fn start(
        config: HostConfig,
        selector: TransportSelector,
        sink: EventSink,
    ) -> Result<Host, HostError> {
        config.validate().map_err(HostError::InvalidConfig)?;
        let metrics = Arc::new(HostMetrics::new());
        let router = Arc::new(Router::new(sink, Arc::clone(&metrics)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let label = match &selector {
            TransportSelector::Wifi => "wifi",
            TransportSelector::UsbTcp => "usb-tcp",
            TransportSelector::Ble(_) => "ble",
        };

        match selector {
            TransportSelector::Wifi | TransportSelector::UsbTcp => {
                let (listener, port) = bind_listener(config.tcp_port)?;
                let beacon = BeaconBroadcaster::spawn(&config, port, Arc::clone(&metrics))?;
                log::info!(
                    "[host] '{}' up via {} at {}:{} (beacon port {})",
                    config.service_name,
                    label,
                    local_ip(),
                    port,
                    config.beacon_port
                );

                let thread_router = Arc::clone(&router);
                let thread_metrics = Arc::clone(&metrics);
                let thread_shutdown = Arc::clone(&shutdown);
                let supervisor = thread::Builder::new()
                    .name("televoodoo-session".to_owned())
                    .spawn(move || {
                        supervisor::run_tcp(
                            listener,
                            config,
                            thread_router,
                            thread_metrics,
                            thread_shutdown,
                        )
                    })?;

                Ok(Host {
                    router,
                    metrics,
                    shutdown,
                    supervisor: Some(supervisor),
                    beacon: Some(beacon),
                    tcp_port: Some(port),
                    ble_inbound: None,
                })
            }
            TransportSelector::Ble(adapter) => {
                let (transport, inbound) = BleTransport::new(
                    adapter,
                    config.ble_silence_timeout,
                    config.heartbeat_period,
                    Arc::clone(&metrics),
                );
                log::info!("[host] '{}' up via {} peripheral", config.service_name, label);

                let thread_router = Arc::clone(&router);
                let thread_metrics = Arc::clone(&metrics);
                let thread_shutdown = Arc::clone(&shutdown);
                let supervisor = thread::Builder::new()
                    .name("televoodoo-session".to_owned())
                    .spawn(move || {
                        supervisor::run_ble(
                            transport,
                            config,
                            thread_router,
                            thread_metrics,
                            thread_shutdown,
                        )
                    })?;

                Ok(Host {
                    router,
                    metrics,
                    shutdown,
                    supervisor: Some(supervisor),
                    beacon: None,
                    tcp_port: None,
                    ble_inbound: Some(inbound),
                })
            }
        }
    }

    /// Send haptic feedback to the connected mobile.
    ///
    /// Thread-safe; fails fast with [`TransportError::NoSession`] when no
    /// session is connected.
    pub fn send_haptic(&self, intensity: f32, channel: u8) -> Result<(), TransportError> {
        self.router.send_haptic(intensity, channel)
    }

    /// Send a configuration payload to the connected mobile.
    pub fn send_config(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.router.send_config(payload)
    }

    /// Snapshot of the host counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether a session is connected right now.
    pub fn has_session(&self) -> bool {
        self.metrics.has_active_session()
    }

    /// Actually-bound TCP port (None in BLE mode).
    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_port
    }

    /// Inbound handle for the platform BLE glue (None in TCP mode).
    pub fn ble_inbound(&self) -> Option<BleInbound> {
        self.ble_inbound.clone()
    }

    /// Stop the host: close any session (with a best-effort BYE), stop
    /// the beacon and join all background threads. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.supervisor.take() {
            if handle.join().is_err() {
                log::error!("[host] supervisor thread panicked");
            }
        }
        if let Some(beacon) = self.beacon.take() {
            beacon.shutdown();
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
