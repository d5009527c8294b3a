// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP transport: listener setup, low-latency socket tuning, and the
//! message-granular stream wrapper.
//!
//! The accepted stream is tuned immediately:
//!
//! - `TCP_NODELAY` is mandatory; Nagle would batch 46-byte POSE frames
//!   for up to 200 ms.
//! - Kernel keepalive (5 s idle / 1 s interval / 3 probes where the
//!   platform permits) gives ~8 s dead-peer detection without any
//!   application-level ping.
//! - 32 KiB socket buffers keep kernel-side queueing latency bounded.
//!
//! The reader drives a [`FrameDecoder`] with `SO_RCVTIMEO`-based timeouts
//! so the session loop can interleave timer checks with blocking reads.
//! The writer half is a cloned stream behind a mutex, the single
//! serialization point for all host-originated messages.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};

use crate::config::HostConfig;
use crate::protocol::framing::{frame, FrameDecoder};
use crate::protocol::{codec, FrameError, Message};
use crate::telemetry::HostMetrics;
use crate::transport::{LivenessProfile, OutboundLink, Transport, TransportError};

use crate::protocol::constants::{
    FRAME_PREFIX_SIZE, KEEPALIVE_IDLE, KEEPALIVE_INTERVAL, KEEPALIVE_RETRIES, SOCKET_BUFFER_SIZE,
};

/// Bind the host listener on `0.0.0.0:<port>`.
///
/// `SO_REUSEADDR` lets a restarted host rebind immediately; the backlog is
/// 1 because only a single client is ever served. The listener is returned
/// non-blocking so the supervisor can poll it between reads, together with
/// the actual bound port (relevant when `port` is 0).
pub fn bind_listener(port: u16) -> io::Result<(TcpListener, u16)> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    let port = listener.local_addr()?.port();
    log::info!("[tcp] listening on 0.0.0.0:{}", port);
    Ok((listener, port))
}

/// Apply the low-latency tuning set to an accepted stream.
pub fn tune_stream(stream: &TcpStream) -> io::Result<()> {
    let sock = SockRef::from(stream);
    sock.set_nodelay(true)?;

    let mut keepalive = TcpKeepalive::new().with_time(KEEPALIVE_IDLE);
    #[cfg(any(
        target_os = "android",
        target_os = "freebsd",
        target_os = "ios",
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
    ))]
    {
        keepalive = keepalive.with_interval(KEEPALIVE_INTERVAL);
    }
    #[cfg(any(
        target_os = "android",
        target_os = "freebsd",
        target_os = "ios",
        target_os = "linux",
        target_os = "macos",
    ))]
    {
        keepalive = keepalive.with_retries(KEEPALIVE_RETRIES);
    }
    sock.set_tcp_keepalive(&keepalive)?;

    // Buffer sizing is best-effort; some platforms round or clamp.
    let _ = sock.set_recv_buffer_size(SOCKET_BUFFER_SIZE);
    let _ = sock.set_send_buffer_size(SOCKET_BUFFER_SIZE);
    Ok(())
}

/// Shared writer half of a TCP session.
struct TcpOutbound {
    writer: Mutex<TcpStream>,
    connected: AtomicBool,
    metrics: Arc<HostMetrics>,
}

impl TcpOutbound {
    fn write_framed(&self, stream: &mut TcpStream, msg: &Message) -> Result<(), TransportError> {
        use std::io::Write;
        let framed = frame(&codec::encode(msg));
        match stream.write_all(&framed) {
            Ok(()) => {
                self.metrics.record_bytes_out(framed.len());
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::Release);
                Err(TransportError::Io(e))
            }
        }
    }

    fn close(&self, stream: &TcpStream) {
        if self.connected.swap(false, Ordering::AcqRel) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl OutboundLink for TcpOutbound {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        let mut stream = self.writer.lock();
        self.write_framed(&mut stream, msg)
    }

    fn try_send(&self, msg: &Message) -> Result<bool, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        match self.writer.try_lock() {
            Some(mut stream) => self.write_framed(&mut stream, msg).map(|()| true),
            None => Ok(false),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Message-granular transport over one accepted TCP stream.
pub struct TcpTransport {
    stream: TcpStream,
    decoder: FrameDecoder,
    outbound: Arc<TcpOutbound>,
    remote: String,
    metrics: Arc<HostMetrics>,
    read_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Wrap and tune an accepted stream.
    pub fn new(stream: TcpStream, metrics: Arc<HostMetrics>) -> io::Result<Self> {
        tune_stream(&stream)?;
        stream.set_nonblocking(false)?;
        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_owned());
        let writer = stream.try_clone()?;
        let outbound = Arc::new(TcpOutbound {
            writer: Mutex::new(writer),
            connected: AtomicBool::new(true),
            metrics: Arc::clone(&metrics),
        });
        log::debug!("[tcp] stream tuned remote={}", remote);
        Ok(Self {
            stream,
            decoder: FrameDecoder::new(),
            outbound,
            remote,
            metrics,
            read_timeout: None,
        })
    }
}

impl Transport for TcpTransport {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        self.outbound.send(msg)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        if self.read_timeout != Some(timeout) {
            self.stream.set_read_timeout(Some(timeout))?;
            self.read_timeout = Some(timeout);
        }
        match self.decoder.read_frame(&mut self.stream) {
            Ok(Some(payload)) => {
                self.metrics
                    .record_bytes_in(payload.len() + FRAME_PREFIX_SIZE);
                Ok(Some(codec::decode(&payload)?))
            }
            Ok(None) => Ok(None),
            Err(FrameError::Closed) => {
                self.outbound.connected.store(false, Ordering::Release);
                Err(TransportError::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn is_connected(&self) -> bool {
        self.outbound.is_connected()
    }

    fn close(&self) {
        self.outbound.close(&self.stream);
    }

    fn remote(&self) -> String {
        self.remote.clone()
    }

    fn liveness(&self) -> LivenessProfile {
        LivenessProfile::kernel()
    }

    fn outbound(&self) -> Arc<dyn OutboundLink> {
        Arc::clone(&self.outbound) as Arc<dyn OutboundLink>
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Send ACK(BUSY) to a freshly-accepted intruder socket and close it.
///
/// Called while another session is active; must never block the caller,
/// so the socket stays non-blocking and a full send buffer simply loses
/// the courtesy ACK (the close still lands).
pub(crate) fn reject_busy(stream: TcpStream, cfg: &HostConfig) {
    use std::io::Write;
    let remote = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    let _ = stream.set_nonblocking(true);
    let mut stream = stream;
    let framed = frame(&codec::encode(&Message::Ack {
        status: crate::protocol::AckStatus::Busy,
        min_version: cfg.min_version,
        max_version: cfg.max_version,
    }));
    let _ = stream.write_all(&framed);
    let _ = stream.shutdown(Shutdown::Both);
    log::info!("[tcp] rejected second client {} while busy", remote);
}

// ============================================================================
// Tests
// ============================================================================
