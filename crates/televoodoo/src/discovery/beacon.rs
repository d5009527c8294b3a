// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP discovery beacon broadcaster.
//!
//! The host announces itself by broadcasting one BEACON datagram every
//! 500 ms: service name plus the TCP data port. The mobile listens on the
//! beacon port and connects back over TCP; no mDNS is involved.
//!
//! Broadcasting runs in its own thread and is deliberately independent of
//! session state: a mobile arriving while another session is active must
//! still be able to find the host (it will be turned away with ACK(BUSY)
//! at the TCP layer). Shutdown drains within one beacon period.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::HostConfig;
use crate::protocol::{codec, Message};
use crate::telemetry::HostMetrics;

/// Granularity of the shutdown check inside a beacon period.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Periodic BEACON broadcaster.
///
/// Spawn with [`BeaconBroadcaster::spawn`]; the thread stops on
/// [`BeaconBroadcaster::shutdown`] or Drop.
pub struct BeaconBroadcaster {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl BeaconBroadcaster {
    /// Spawn the broadcaster thread.
    ///
    /// `tcp_port` is the actually-bound data port (which may differ from
    /// the configured one when binding ephemeral in tests).
    pub fn spawn(
        config: &HostConfig,
        tcp_port: u16,
        metrics: Arc<HostMetrics>,
    ) -> io::Result<Self> {
        let socket = broadcast_socket()?;
        let dest = SocketAddr::from((config.beacon_addr, config.beacon_port));
        // Name and port never change mid-run: encode once.
        let datagram = codec::encode(&Message::Beacon {
            tcp_port,
            name: config.service_name.clone(),
        });
        let period = config.beacon_period;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        log::info!(
            "[beacon] broadcasting '{}' port={} to {} every {:?}",
            config.service_name,
            tcp_port,
            dest,
            period
        );

        let handle = thread::Builder::new()
            .name("televoodoo-beacon".to_owned())
            .spawn(move || broadcast_loop(socket, dest, datagram, period, shutdown_flag, metrics))?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the thread to stop and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BeaconBroadcaster {
    fn drop(&mut self) {
        self.stop();
    }
}

fn broadcast_socket() -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;
    socket.set_reuse_address(true)?;
    let bind_addr: SocketAddr = ([0, 0, 0, 0], 0).into();
    socket.bind(&bind_addr.into())?;
    Ok(socket.into())
}

fn broadcast_loop(
    socket: UdpSocket,
    dest: SocketAddr,
    datagram: Vec<u8>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
    metrics: Arc<HostMetrics>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match socket.send_to(&datagram, dest) {
            Ok(_) => metrics.record_beacon_sent(),
            // A transient send failure (interface down, ENETUNREACH) must
            // not kill discovery; the next tick retries.
            Err(e) => log::debug!("[beacon] send to {} failed: {}", dest, e),
        }

        // Sleep in small chunks so shutdown completes within one period.
        let sleep_end = Instant::now() + period;
        while Instant::now() < sleep_end {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(SHUTDOWN_POLL.min(period));
        }
    }
    log::debug!("[beacon] broadcaster stopped");
}

/// Best-effort local IP discovery.
///
/// Opens a UDP socket "towards" a public address to learn which interface
/// the default route uses; no traffic is actually sent. Falls back to
/// loopback when the host is offline.
pub fn local_ip() -> String {
    let probe = || -> io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_else(|_| "127.0.0.1".to_owned())
}

// ============================================================================
// Tests
// ============================================================================
