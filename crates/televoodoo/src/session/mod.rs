// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session state machine.
//!
//! Host-side lifecycle of one mobile association:
//!
//! ```text
//! Listening ---- link up ------------> AwaitingHello
//! AwaitingHello -- HELLO(ok) --------> Connected   (ACK(OK), CONFIG)
//! AwaitingHello -- HELLO(bad code) --> closed      (ACK(BAD_CODE))
//! AwaitingHello -- HELLO(bad ver) ---> closed      (ACK(VERSION_MISMATCH))
//! AwaitingHello -- deadline ---------> closed
//! Connected ----- BYE / EOF / silence> closed
//! closed -------- drained -----------> Listening
//! ```
//!
//! The machine is pure: no sockets, no clocks. Every entry point takes
//! `now` and returns the [`Action`]s the supervisor must perform, which
//! makes each transition directly unit-testable. The machine outlives
//! individual sessions so the per-remote auth lockout spans cycles.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::engine::{Command, DisconnectReason, Event};
use crate::protocol::constants::{
    AUTH_CODE_LEN, LOCKOUT_MAX_FAILURES, LOCKOUT_WINDOW,
};
use crate::protocol::{AckStatus, Message};
use crate::transport::LivenessProfile;

/// Supervisor-driven session loop.
pub mod supervisor;

/// What the supervisor must do after feeding the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a message on the active transport.
    Send(Message),
    /// Deliver an event to the application.
    Emit(Event),
    /// Tear the session down for this reason. Always the last action.
    Close(DisconnectReason),
}

/// Machine phase. `Closing` is owned by the supervisor (it is the act of
/// draining the transport), so the machine only models the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No link; the listener (or advertiser) is waiting.
    Listening,
    /// Link up, HELLO not yet validated.
    AwaitingHello,
    /// Authenticated and streaming.
    Connected,
}

/// Per-session knobs, extracted from the host config.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Exact auth code bytes expected in HELLO.
    pub auth_code: [u8; AUTH_CODE_LEN],
    /// Oldest accepted protocol version.
    pub min_version: u8,
    /// Newest accepted protocol version.
    pub max_version: u8,
    /// Payload for the initial CONFIG after ACK(OK).
    pub initial_config: Vec<u8>,
    /// HELLO deadline after link-up.
    pub hello_timeout: Duration,
}

impl SessionParams {
    /// Extract session parameters from the host config.
    pub fn from_config(config: &crate::config::HostConfig) -> Self {
        Self {
            auth_code: config.auth_code_bytes(),
            min_version: config.min_version,
            max_version: config.max_version,
            initial_config: config.initial_config.clone(),
            hello_timeout: config.hello_timeout,
        }
    }
}

/// Sliding-window strike counter for one remote.
#[derive(Debug, Clone, Copy)]
struct Strikes {
    count: u32,
    window_start: Instant,
}

/// Per-remote BAD_CODE lockout.
#[derive(Debug, Default)]
struct LockoutTable {
    strikes: HashMap<IpAddr, Strikes>,
}

impl LockoutTable {
    fn record_failure(&mut self, ip: IpAddr, now: Instant) {
        let entry = self.strikes.entry(ip).or_insert(Strikes {
            count: 0,
            window_start: now,
        });
        if now.duration_since(entry.window_start) > LOCKOUT_WINDOW {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
    }

    fn is_locked(&self, ip: IpAddr, now: Instant) -> bool {
        match self.strikes.get(&ip) {
            Some(s) => {
                s.count >= LOCKOUT_MAX_FAILURES
                    && now.duration_since(s.window_start) <= LOCKOUT_WINDOW
            }
            None => false,
        }
    }

    fn clear(&mut self, ip: IpAddr) {
        self.strikes.remove(&ip);
    }
}

/// The host-side session machine.
///
/// One instance per supervisor; it persists across session cycles.
pub struct SessionMachine {
    params: SessionParams,
    liveness: LivenessProfile,
    phase: Phase,
    remote_ip: Option<IpAddr>,
    session_id: u32,
    negotiated_version: u8,
    hello_deadline: Option<Instant>,
    last_inbound: Instant,
    next_heartbeat: Option<Instant>,
    heartbeat_counter: u32,
    started: Instant,
    lockout: LockoutTable,
}

impl SessionMachine {
    /// Create a machine in `Listening`.
    pub fn new(params: SessionParams, liveness: LivenessProfile, now: Instant) -> Self {
        Self {
            params,
            liveness,
            phase: Phase::Listening,
            remote_ip: None,
            session_id: 0,
            negotiated_version: 0,
            hello_deadline: None,
            last_inbound: now,
            next_heartbeat: None,
            heartbeat_counter: 0,
            started: now,
            lockout: LockoutTable::default(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Session id recorded from HELLO (0 before authentication).
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Negotiated protocol version (0 before authentication).
    pub fn negotiated_version(&self) -> u8 {
        self.negotiated_version
    }

    /// A link came up (TCP accept / BLE central connect).
    pub fn on_link_up(&mut self, remote: &str, ip: Option<IpAddr>, now: Instant) -> Vec<Action> {
        debug_assert_eq!(self.phase, Phase::Listening, "second link while active");
        self.phase = Phase::AwaitingHello;
        self.remote_ip = ip;
        self.hello_deadline = Some(now + self.params.hello_timeout);
        self.last_inbound = now;
        log::info!("[session] link up from {}, awaiting HELLO", remote);
        vec![Action::Emit(Event::Connected {
            remote: remote.to_owned(),
        })]
    }

    /// One inbound message arrived on the active link.
    pub fn on_message(&mut self, msg: Message, now: Instant) -> Vec<Action> {
        self.last_inbound = now;
        match self.phase {
            Phase::Listening => {
                log::warn!("[session] dropping {} with no link", msg.name());
                Vec::new()
            }
            Phase::AwaitingHello => self.on_message_awaiting_hello(msg, now),
            Phase::Connected => self.on_message_connected(msg),
        }
    }

    fn on_message_awaiting_hello(&mut self, msg: Message, now: Instant) -> Vec<Action> {
        let Message::Hello {
            session_id,
            code,
            version,
        } = msg
        else {
            log::warn!("[session] expected HELLO, got {}", msg.name());
            return vec![Action::Close(DisconnectReason::ProtocolError)];
        };

        // A remote that keeps guessing codes gets dropped without a
        // response until the window expires.
        if let Some(ip) = self.remote_ip {
            if self.lockout.is_locked(ip, now) {
                log::warn!("[session] {} is locked out, dropping HELLO", ip);
                return vec![Action::Close(DisconnectReason::BadCode)];
            }
        }

        if !(self.params.min_version..=self.params.max_version).contains(&version) {
            log::warn!(
                "[session] version {} outside {}..={}",
                version,
                self.params.min_version,
                self.params.max_version
            );
            return vec![
                Action::Send(self.ack(AckStatus::VersionMismatch)),
                Action::Close(DisconnectReason::VersionMismatch),
            ];
        }

        if code != self.params.auth_code {
            if let Some(ip) = self.remote_ip {
                self.lockout.record_failure(ip, now);
            }
            log::warn!("[session] HELLO with wrong code rejected");
            return vec![
                Action::Send(self.ack(AckStatus::BadCode)),
                Action::Close(DisconnectReason::BadCode),
            ];
        }

        // Authenticated.
        self.phase = Phase::Connected;
        self.session_id = session_id;
        self.negotiated_version = version;
        self.hello_deadline = None;
        if let Some(ip) = self.remote_ip {
            self.lockout.clear(ip);
        }
        if let Some(period) = self.liveness.heartbeat_period {
            self.next_heartbeat = Some(now + period);
        }
        log::info!(
            "[session] authenticated session_id={:#010x} version={}",
            session_id,
            version
        );

        vec![
            Action::Send(self.ack(AckStatus::Ok)),
            Action::Send(Message::Config {
                payload: self.params.initial_config.clone(),
            }),
            Action::Emit(Event::Authenticated {
                session_id,
                version,
            }),
        ]
    }

    fn on_message_connected(&mut self, msg: Message) -> Vec<Action> {
        match msg {
            Message::Pose(sample) => vec![Action::Emit(Event::Pose(sample))],
            Message::Cmd { cmd_type, value } => vec![Action::Emit(Event::Command(
                Command::from_wire(cmd_type, value),
            ))],
            Message::Bye { session_id } => {
                if session_id == self.session_id {
                    log::info!("[session] BYE received, closing");
                    vec![Action::Close(DisconnectReason::Bye)]
                } else {
                    log::warn!(
                        "[session] BYE with stale session_id {:#010x} (active {:#010x}), ignoring",
                        session_id,
                        self.session_id
                    );
                    Vec::new()
                }
            }
            Message::Hello { .. } => {
                log::warn!("[session] HELLO on an established session, ignoring");
                Vec::new()
            }
            other => {
                log::warn!("[session] unexpected {} from mobile, ignoring", other.name());
                Vec::new()
            }
        }
    }

    /// Periodic timer check; call at least a few times per heartbeat
    /// period.
    pub fn on_tick(&mut self, now: Instant) -> Vec<Action> {
        match self.phase {
            Phase::Listening => Vec::new(),
            Phase::AwaitingHello => {
                if self.hello_deadline.is_some_and(|d| now >= d) {
                    log::warn!("[session] no HELLO within deadline, closing");
                    vec![Action::Close(DisconnectReason::HelloTimeout)]
                } else {
                    Vec::new()
                }
            }
            Phase::Connected => {
                if let Some(timeout) = self.liveness.silence_timeout {
                    if now.duration_since(self.last_inbound) >= timeout {
                        log::warn!("[session] inbound silence >= {:?}, closing", timeout);
                        return vec![Action::Close(DisconnectReason::Timeout)];
                    }
                }
                let mut actions = Vec::new();
                if let (Some(period), Some(due)) =
                    (self.liveness.heartbeat_period, self.next_heartbeat)
                {
                    if now >= due {
                        self.heartbeat_counter = self.heartbeat_counter.wrapping_add(1);
                        self.next_heartbeat = Some(now + period);
                        let uptime_ms = self.uptime_ms(now);
                        log::debug!(
                            "[session] heartbeat counter={} uptime_ms={}",
                            self.heartbeat_counter,
                            uptime_ms
                        );
                        actions.push(Action::Send(Message::Heartbeat {
                            counter: self.heartbeat_counter,
                            uptime_ms,
                        }));
                    }
                }
                actions
            }
        }
    }

    /// The transport reported EOF/RST.
    pub fn on_link_closed(&mut self) -> Vec<Action> {
        match self.phase {
            Phase::Listening => Vec::new(),
            _ => vec![Action::Close(DisconnectReason::PeerClosed)],
        }
    }

    /// The supervisor finished tearing the session down.
    pub fn on_session_ended(&mut self) {
        self.phase = Phase::Listening;
        self.remote_ip = None;
        self.session_id = 0;
        self.negotiated_version = 0;
        self.hello_deadline = None;
        self.next_heartbeat = None;
    }

    fn ack(&self, status: AckStatus) -> Message {
        Message::Ack {
            status,
            min_version: self.params.min_version,
            max_version: self.params.max_version,
        }
    }

    fn uptime_ms(&self, now: Instant) -> u32 {
        now.duration_since(self.started).as_millis() as u32
    }
}

// ============================================================================
// Tests
// ============================================================================
