// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session supervisor: the listen -> accept -> authenticate -> stream ->
//! re-listen loop.
//!
//! One supervisor thread drives the whole host lifecycle. The listener
//! socket persists across session cycles; only the accepted stream is
//! recreated, so 10k reconnects leak nothing. While a session is active
//! the listener keeps being polled: a second client is accepted just long
//! enough to receive ACK(BUSY) and is closed without ever touching the
//! active session.
//!
//! The supervisor interprets [`SessionMachine`] actions against the active
//! [`Transport`] and dispatches events in the receive context: a POSE
//! goes from socket to application callback on this thread with no queue
//! in between.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::HostConfig;
use crate::engine::{DisconnectReason, Event, Router};
use crate::protocol::{AckStatus, CodecError, Message};
use crate::session::{Action, Phase, SessionMachine, SessionParams};
use crate::telemetry::HostMetrics;
use crate::transport::{
    tcp::reject_busy, BleTransport, LivenessProfile, TcpTransport, Transport, TransportError,
};

/// Receive poll granularity; bounds timer latency and shutdown latency.
const RECV_POLL: Duration = Duration::from_millis(50);

/// Accept poll sleep while no client is connected.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Listen-retry backoff bounds after accept errors.
const BACKOFF_MIN: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(2);

/// TCP supervisor loop. Runs until `shutdown` is set.
pub(crate) fn run_tcp(
    listener: TcpListener,
    cfg: HostConfig,
    router: Arc<Router>,
    metrics: Arc<HostMetrics>,
    shutdown: Arc<AtomicBool>,
) {
    let mut machine = SessionMachine::new(
        SessionParams::from_config(&cfg),
        LivenessProfile::kernel(),
        Instant::now(),
    );
    let mut backoff = BACKOFF_MIN;

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                backoff = BACKOFF_MIN;
                log::info!("[supervisor] accepted {}", addr);
                match TcpTransport::new(stream, Arc::clone(&metrics)) {
                    Ok(mut transport) => run_session(
                        &mut machine,
                        &mut transport,
                        Some(&listener),
                        &cfg,
                        &router,
                        &metrics,
                        &shutdown,
                    ),
                    Err(e) => {
                        router.dispatch(Event::Error {
                            message: format!("failed to prepare stream from {}: {}", addr, e),
                        });
                    }
                }
            }
            Err(e) if would_block(&e) => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                log::error!("[supervisor] accept failed: {}", e);
                router.dispatch(Event::Error {
                    message: format!("accept failed: {}", e),
                });
                thread::sleep(backoff);
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
    log::info!("[supervisor] tcp loop stopped");
}

/// BLE supervisor loop. Advertises, serves one central at a time, and
/// re-advertises after every session cycle.
pub(crate) fn run_ble(
    mut transport: BleTransport,
    cfg: HostConfig,
    router: Arc<Router>,
    metrics: Arc<HostMetrics>,
    shutdown: Arc<AtomicBool>,
) {
    let adapter = transport.adapter();
    if let Err(e) = adapter.start_advertising(&cfg.service_name) {
        router.dispatch(Event::Error {
            message: format!("BLE advertising failed: {}", e),
        });
        return;
    }

    let liveness = transport.liveness();
    let mut machine = SessionMachine::new(
        SessionParams::from_config(&cfg),
        liveness,
        Instant::now(),
    );

    while !shutdown.load(Ordering::Relaxed) {
        if transport.is_connected() {
            if transport.mtu_sufficient() {
                run_session(
                    &mut machine,
                    &mut transport,
                    None,
                    &cfg,
                    &router,
                    &metrics,
                    &shutdown,
                );
            } else {
                router.dispatch(Event::Error {
                    message: "BLE MTU below the 64-byte minimum; disconnecting".to_owned(),
                });
                transport.close();
            }
            // The peripheral re-advertises after every cycle so the next
            // central can find it.
            if !shutdown.load(Ordering::Relaxed) {
                if let Err(e) = adapter.start_advertising(&cfg.service_name) {
                    log::warn!("[supervisor] ble re-advertise failed: {}", e);
                }
            }
        } else {
            // Pump link events until a central connects.
            match transport.recv(RECV_POLL) {
                Ok(_) | Err(TransportError::Closed) => {}
                Err(e) => log::debug!("[supervisor] ble idle recv: {}", e),
            }
        }
    }
    adapter.stop_advertising();
    log::info!("[supervisor] ble loop stopped");
}

/// Drive one session from link-up to teardown.
fn run_session(
    machine: &mut SessionMachine,
    transport: &mut dyn Transport,
    listener: Option<&TcpListener>,
    cfg: &HostConfig,
    router: &Router,
    metrics: &Arc<HostMetrics>,
    shutdown: &AtomicBool,
) {
    let remote = transport.remote();
    let ip = remote_ip(&remote);
    let mut reason = apply_actions(
        machine.on_link_up(&remote, ip, Instant::now()),
        transport,
        router,
        metrics,
    );

    while reason.is_none() {
        if shutdown.load(Ordering::Relaxed) {
            // Tell the mobile this is a deliberate shutdown, not a crash.
            if machine.phase() == Phase::Connected {
                let _ = transport.send(&Message::Bye {
                    session_id: machine.session_id(),
                });
            }
            reason = Some(DisconnectReason::HostShutdown);
            break;
        }

        // Turn intruders away without disturbing the active session.
        if let Some(listener) = listener {
            drain_intruders(listener, cfg, metrics);
        }

        let now = Instant::now();
        match transport.recv(RECV_POLL) {
            Ok(Some(msg)) => {
                reason = apply_actions(machine.on_message(msg, now), transport, router, metrics);
            }
            Ok(None) => {}
            Err(TransportError::Closed) => {
                reason = apply_actions(machine.on_link_closed(), transport, router, metrics);
            }
            Err(TransportError::Codec(e)) => {
                reason = handle_codec_error(e, machine, transport, cfg, metrics);
            }
            Err(TransportError::Frame(e)) => {
                log::error!("[supervisor] framing violation from {}: {}", remote, e);
                reason = Some(DisconnectReason::ProtocolError);
            }
            Err(e) => {
                log::error!("[supervisor] transport error from {}: {}", remote, e);
                reason = Some(DisconnectReason::PeerClosed);
            }
        }

        if reason.is_none() {
            reason = apply_actions(
                machine.on_tick(Instant::now()),
                transport,
                router,
                metrics,
            );
        }
    }

    let reason = reason.unwrap_or(DisconnectReason::PeerClosed);
    transport.close();
    router.detach();
    metrics.record_session_closed(reason);
    machine.on_session_ended();
    router.dispatch(Event::Disconnected { reason });
    log::info!("[supervisor] session with {} closed: {}", remote, reason);
}

/// Perform the machine's actions; returns the close reason when one of
/// them ends the session.
fn apply_actions(
    actions: Vec<Action>,
    transport: &mut dyn Transport,
    router: &Router,
    metrics: &Arc<HostMetrics>,
) -> Option<DisconnectReason> {
    for action in actions {
        match action {
            Action::Send(msg) => {
                if let Err(e) = transport.send(&msg) {
                    log::warn!("[supervisor] send {} failed: {}", msg.name(), e);
                    return Some(DisconnectReason::PeerClosed);
                }
            }
            Action::Emit(event) => {
                if let Event::Authenticated { .. } = &event {
                    debug_assert!(
                        !metrics.has_active_session(),
                        "a second session reached Connected"
                    );
                    metrics.record_session_opened();
                    router.attach(transport.outbound());
                }
                router.dispatch(event);
            }
            Action::Close(reason) => return Some(reason),
        }
    }
    None
}

/// Per-message codec error policy: unknown types are skipped with a
/// warning, a wrong version during the handshake earns the mobile a
/// proper ACK, everything else invalidates the stream.
fn handle_codec_error(
    error: CodecError,
    machine: &SessionMachine,
    transport: &mut dyn Transport,
    cfg: &HostConfig,
    metrics: &Arc<HostMetrics>,
) -> Option<DisconnectReason> {
    match error {
        CodecError::UnknownType { got } => {
            metrics.record_unknown_type();
            log::warn!("[supervisor] skipping message with unknown type {}", got);
            None
        }
        CodecError::BadMagic => {
            metrics.record_bad_magic();
            log::error!("[supervisor] bad magic; closing session");
            Some(DisconnectReason::ProtocolError)
        }
        CodecError::UnsupportedVersion { got } => {
            metrics.record_version_mismatch();
            if machine.phase() == Phase::AwaitingHello {
                log::warn!("[supervisor] peer version {} unsupported, ACKing mismatch", got);
                let _ = transport.send(&Message::Ack {
                    status: AckStatus::VersionMismatch,
                    min_version: cfg.min_version,
                    max_version: cfg.max_version,
                });
                Some(DisconnectReason::VersionMismatch)
            } else {
                log::error!("[supervisor] version changed mid-session to {}", got);
                Some(DisconnectReason::ProtocolError)
            }
        }
        CodecError::TruncatedOrOversized { .. } | CodecError::InvalidFrame(_) => {
            log::error!("[supervisor] malformed message ({}); closing session", error);
            Some(DisconnectReason::ProtocolError)
        }
    }
}

/// Accept and reject any queued newcomers while a session is active.
fn drain_intruders(listener: &TcpListener, cfg: &HostConfig, metrics: &Arc<HostMetrics>) {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                metrics.record_busy_rejected();
                reject_busy(stream, cfg);
            }
            Err(e) if would_block(&e) => return,
            Err(e) => {
                log::warn!("[supervisor] intruder accept failed: {}", e);
                return;
            }
        }
    }
}

fn remote_ip(remote: &str) -> Option<IpAddr> {
    remote.parse::<SocketAddr>().ok().map(|a| a.ip())
}

fn would_block(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EventSink;
    use crate::protocol::constants::HEARTBEAT_PERIOD;
    use crate::protocol::{codec, framing};
    use crate::transport::ble::testing::MockAdapter;
    use crate::transport::{bind_listener, BleInbound, Characteristic};
    use parking_lot::Mutex;
    use std::net::TcpStream;

    fn test_config() -> HostConfig {
        HostConfig::new("myvoodoo", "ABC123")
            .with_initial_config(b"{}".to_vec())
            .with_hello_timeout(Duration::from_millis(400))
            .with_ble_silence_timeout(Duration::from_millis(300))
    }

    fn collecting_sink() -> (EventSink, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sink: EventSink = Arc::new(move |event| sink_events.lock().push(event));
        (sink, events)
    }

    fn wait_for<F: Fn() -> bool>(what: &str, predicate: F) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(10));
        }
    }

    struct TcpHarness {
        port: u16,
        router: Arc<Router>,
        metrics: Arc<HostMetrics>,
        events: Arc<Mutex<Vec<Event>>>,
        shutdown: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl TcpHarness {
        fn start(cfg: HostConfig) -> Self {
            let (listener, port) = bind_listener(0).expect("bind");
            let (sink, events) = collecting_sink();
            let metrics = Arc::new(HostMetrics::new());
            let router = Arc::new(Router::new(sink, Arc::clone(&metrics)));
            let shutdown = Arc::new(AtomicBool::new(false));

            let thread_router = Arc::clone(&router);
            let thread_metrics = Arc::clone(&metrics);
            let thread_shutdown = Arc::clone(&shutdown);
            let handle = thread::spawn(move || {
                run_tcp(listener, cfg, thread_router, thread_metrics, thread_shutdown)
            });

            Self {
                port,
                router,
                metrics,
                events,
                shutdown,
                handle: Some(handle),
            }
        }

        fn connect(&self) -> TcpStream {
            let stream = TcpStream::connect(("127.0.0.1", self.port)).expect("connect");
            stream
                .set_read_timeout(Some(Duration::from_secs(3)))
                .expect("timeout");
            stream
        }

        fn send(&self, stream: &mut TcpStream, msg: &Message) {
            framing::write_message(stream, &codec::encode(msg)).expect("write");
        }

        fn read_msg(&self, stream: &mut TcpStream) -> Option<Message> {
            framing::read_message(stream)
                .expect("read")
                .map(|payload| codec::decode(&payload).expect("decode"))
        }

        fn stop(&mut self) {
            self.shutdown.store(true, Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                handle.join().expect("join");
            }
        }
    }

    impl Drop for TcpHarness {
        fn drop(&mut self) {
            self.stop();
        }
    }

    fn hello(code: &[u8; 6]) -> Message {
        Message::Hello {
            session_id: 1,
            code: *code,
            version: 1,
        }
    }

    #[test]
    fn test_tcp_happy_path_then_bye() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();

        harness.send(&mut client, &hello(b"ABC123"));
        assert_eq!(
            harness.read_msg(&mut client),
            Some(Message::Ack {
                status: AckStatus::Ok,
                min_version: 1,
                max_version: 1,
            })
        );
        assert_eq!(
            harness.read_msg(&mut client),
            Some(Message::Config {
                payload: b"{}".to_vec(),
            })
        );

        harness.send(&mut client, &Message::Bye { session_id: 1 });
        wait_for("disconnect event", || {
            harness
                .events
                .lock()
                .iter()
                .any(|e| matches!(e, Event::Disconnected { reason: DisconnectReason::Bye }))
        });
        assert_eq!(harness.metrics.snapshot().sessions_opened, 1);
        assert_eq!(harness.metrics.snapshot().sessions_closed.bye, 1);
        harness.stop();
    }

    #[test]
    fn test_tcp_bad_code_gets_ack_and_eof() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();

        harness.send(&mut client, &hello(b"WRONG1"));
        assert_eq!(
            harness.read_msg(&mut client),
            Some(Message::Ack {
                status: AckStatus::BadCode,
                min_version: 1,
                max_version: 1,
            })
        );
        // Host closes right after the ACK.
        assert_eq!(harness.read_msg(&mut client), None);
        wait_for("bad-code disconnect", || {
            harness.events.lock().iter().any(|e| {
                matches!(e, Event::Disconnected { reason: DisconnectReason::BadCode })
            })
        });
        harness.stop();
    }

    #[test]
    fn test_tcp_second_client_rejected_busy() {
        let mut harness = TcpHarness::start(test_config());
        let mut first = harness.connect();
        harness.send(&mut first, &hello(b"ABC123"));
        assert!(harness.read_msg(&mut first).is_some()); // ACK
        assert!(harness.read_msg(&mut first).is_some()); // CONFIG

        // Stream a few poses to have a live session on both sides.
        for seq in 0..3u16 {
            harness.send(
                &mut first,
                &Message::Pose(crate::protocol::PoseSample {
                    seq,
                    timestamp_us: seq as u64,
                    flags: 0,
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    qx: 0.0,
                    qy: 0.0,
                    qz: 0.0,
                    qw: 1.0,
                }),
            );
        }

        let mut second = harness.connect();
        assert_eq!(
            harness.read_msg(&mut second),
            Some(Message::Ack {
                status: AckStatus::Busy,
                min_version: 1,
                max_version: 1,
            })
        );
        assert_eq!(harness.read_msg(&mut second), None); // EOF

        // The first session streams on, uninterrupted and in order.
        for seq in 3..6u16 {
            harness.send(
                &mut first,
                &Message::Pose(crate::protocol::PoseSample {
                    seq,
                    timestamp_us: seq as u64,
                    flags: 0,
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    qx: 0.0,
                    qy: 0.0,
                    qz: 0.0,
                    qw: 1.0,
                }),
            );
        }
        wait_for("six poses", || {
            harness
                .events
                .lock()
                .iter()
                .filter(|e| matches!(e, Event::Pose(_)))
                .count()
                == 6
        });
        let seqs: Vec<u16> = harness
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Pose(p) => Some(p.seq),
                _ => None,
            })
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(harness.metrics.snapshot().busy_rejected, 1);
        harness.stop();
    }

    #[test]
    fn test_tcp_version_mismatch_ack() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();

        // Hand-craft a HELLO with header version byte 2.
        let mut payload = codec::encode(&hello(b"ABC123"));
        payload[5] = 2;
        framing::write_message(&mut client, &payload).expect("write");

        assert_eq!(
            harness.read_msg(&mut client),
            Some(Message::Ack {
                status: AckStatus::VersionMismatch,
                min_version: 1,
                max_version: 1,
            })
        );
        assert_eq!(harness.read_msg(&mut client), None);
        wait_for("version mismatch counter", || {
            harness.metrics.snapshot().version_mismatch == 1
        });
        harness.stop();
    }

    #[test]
    fn test_tcp_hello_timeout_closes() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();

        // Say nothing; the host must hang up within the (shortened)
        // handshake deadline.
        assert_eq!(harness.read_msg(&mut client), None);
        wait_for("hello timeout disconnect", || {
            harness.events.lock().iter().any(|e| {
                matches!(
                    e,
                    Event::Disconnected {
                        reason: DisconnectReason::HelloTimeout
                    }
                )
            })
        });
        harness.stop();
    }

    #[test]
    fn test_tcp_unknown_type_skipped_session_survives() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();
        harness.send(&mut client, &hello(b"ABC123"));
        assert!(harness.read_msg(&mut client).is_some());
        assert!(harness.read_msg(&mut client).is_some());

        let mut unknown = codec::encode(&Message::Bye { session_id: 1 });
        unknown[4] = 0x60;
        framing::write_message(&mut client, &unknown).expect("write");

        harness.send(
            &mut client,
            &Message::Cmd {
                cmd_type: 1,
                value: 1,
            },
        );
        wait_for("command after unknown type", || {
            harness
                .events
                .lock()
                .iter()
                .any(|e| matches!(e, Event::Command(_)))
        });
        assert_eq!(harness.metrics.snapshot().unknown_type, 1);
        harness.stop();
    }

    #[test]
    fn test_tcp_reconnect_cycles() {
        let mut harness = TcpHarness::start(test_config());
        for cycle in 0..3 {
            let mut client = harness.connect();
            harness.send(&mut client, &hello(b"ABC123"));
            assert!(harness.read_msg(&mut client).is_some(), "cycle {}", cycle);
            assert!(harness.read_msg(&mut client).is_some(), "cycle {}", cycle);
            drop(client);
            wait_for("cycle close", || {
                harness.metrics.snapshot().sessions_closed.total() as usize == cycle + 1
            });
        }
        assert_eq!(harness.metrics.snapshot().sessions_opened, 3);
        harness.stop();
    }

    #[test]
    fn test_tcp_shutdown_sends_bye() {
        let mut harness = TcpHarness::start(test_config());
        let mut client = harness.connect();
        harness.send(&mut client, &hello(b"ABC123"));
        assert!(harness.read_msg(&mut client).is_some());
        assert!(harness.read_msg(&mut client).is_some());

        harness.stop();
        assert_eq!(
            harness.read_msg(&mut client),
            Some(Message::Bye { session_id: 1 })
        );
    }

    // ===== BLE =====

    struct BleHarness {
        inbound: BleInbound,
        adapter: Arc<MockAdapter>,
        events: Arc<Mutex<Vec<Event>>>,
        metrics: Arc<HostMetrics>,
        shutdown: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl BleHarness {
        fn start(cfg: HostConfig) -> Self {
            let adapter = MockAdapter::new(185);
            let metrics = Arc::new(HostMetrics::new());
            let (transport, inbound) = BleTransport::new(
                adapter.clone(),
                cfg.ble_silence_timeout,
                HEARTBEAT_PERIOD,
                Arc::clone(&metrics),
            );
            let (sink, events) = collecting_sink();
            let router = Arc::new(Router::new(sink, Arc::clone(&metrics)));
            let shutdown = Arc::new(AtomicBool::new(false));

            let thread_metrics = Arc::clone(&metrics);
            let thread_shutdown = Arc::clone(&shutdown);
            let handle = thread::spawn(move || {
                run_ble(transport, cfg, router, thread_metrics, thread_shutdown)
            });

            Self {
                inbound,
                adapter,
                events,
                metrics,
                shutdown,
                handle: Some(handle),
            }
        }

        fn stop(&mut self) {
            self.shutdown.store(true, Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                handle.join().expect("join");
            }
        }
    }

    impl Drop for BleHarness {
        fn drop(&mut self) {
            self.stop();
        }
    }

    #[test]
    fn test_ble_auth_and_config_notify() {
        let mut harness = BleHarness::start(test_config());
        harness.inbound.central_connected("AA:BB:CC:DD:EE:FF");
        harness
            .inbound
            .characteristic_written(Characteristic::Auth, b"ABC123");

        wait_for("authenticated event", || {
            harness
                .events
                .lock()
                .iter()
                .any(|e| matches!(e, Event::Authenticated { .. }))
        });
        wait_for("config notify", || {
            harness
                .adapter
                .notifies
                .lock()
                .iter()
                .any(|(c, _)| *c == Characteristic::Config)
        });
        harness.stop();
    }

    #[test]
    fn test_ble_silence_timeout_and_readvertise() {
        let mut harness = BleHarness::start(test_config());
        harness.inbound.central_connected("central");
        harness
            .inbound
            .characteristic_written(Characteristic::Auth, b"ABC123");

        wait_for("authenticated", || {
            harness.metrics.snapshot().sessions_opened == 1
        });
        // Go silent: the 300 ms test threshold trips the watchdog.
        wait_for("silence teardown", || {
            harness.events.lock().iter().any(|e| {
                matches!(
                    e,
                    Event::Disconnected {
                        reason: DisconnectReason::Timeout
                    }
                )
            })
        });
        // The peripheral re-advertises for the next central.
        wait_for("re-advertise", || {
            harness.adapter.advertising_starts.load(Ordering::SeqCst) >= 2
        });
        assert!(harness.adapter.disconnects.load(Ordering::SeqCst));
        harness.stop();
    }

    #[test]
    fn test_ble_heartbeat_notifies_flow() {
        let mut harness = BleHarness::start(test_config());
        harness.inbound.central_connected("central");
        harness
            .inbound
            .characteristic_written(Characteristic::Auth, b"ABC123");

        wait_for("authenticated", || {
            harness.metrics.snapshot().sessions_opened == 1
        });
        // Keep the link alive past one heartbeat period.
        let keepalive = codec::encode(&Message::Cmd {
            cmd_type: 2,
            value: 1,
        });
        for _ in 0..8 {
            harness
                .inbound
                .characteristic_written(Characteristic::Command, &keepalive);
            thread::sleep(Duration::from_millis(100));
        }
        let notifies = harness.adapter.notifies.lock();
        let heartbeat = notifies
            .iter()
            .find(|(c, _)| *c == Characteristic::Heartbeat)
            .expect("at least one heartbeat notify");
        let decoded = codec::decode(&heartbeat.1).expect("decode");
        assert!(matches!(decoded, Message::Heartbeat { counter, .. } if counter >= 1));
        drop(notifies);
        harness.stop();
    }
}
