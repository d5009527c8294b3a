// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Televoodoo host core
//!
//! Host-side receiver for a low-latency 6-DoF pose stream from a single
//! mobile device. One transport-agnostic event interface on top, three
//! physical transports underneath (TCP over WiFi, TCP over USB
//! tethering, and BLE GATT), plus a UDP discovery beacon.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use televoodoo::{Event, Host, HostConfig, TransportSelector};
//!
//! let config = HostConfig::new("myvoodoo", "ABC123")
//!     .with_initial_config(b"{}".to_vec());
//!
//! let host = Host::start(
//!     config,
//!     TransportSelector::Wifi,
//!     Arc::new(|event| match event {
//!         Event::Pose(pose) => println!("pose seq={} x={}", pose.seq, pose.x),
//!         Event::Authenticated { session_id, .. } => {
//!             println!("mobile connected, session {:#x}", session_id)
//!         }
//!         other => println!("{:?}", other),
//!     }),
//! )?;
//!
//! // Reverse channel, callable from any thread:
//! host.send_haptic(0.8, 0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Application                           |
//! |        EventSink callback   |   send_haptic / send_config    |
//! +--------------------------------------------------------------+
//! |  Router (engine)     : dispatch + outbound serialization     |
//! |  Session supervisor  : accept / HELLO-ACK / liveness / BUSY  |
//! +--------------------------------------------------------------+
//! |  Transport           : TcpTransport        | BleTransport    |
//! |  Protocol            : codec (9 messages)  + TCP framing     |
//! +--------------------------------------------------------------+
//! |  Discovery           : UDP beacon broadcaster (500 ms)       |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Host`] | Owning handle: start/stop, reverse channel, counters |
//! | [`HostConfig`] | Identity, ports, timers, initial CONFIG payload |
//! | [`Event`] | Everything the core reports to the application |
//! | [`BleAdapter`] | Capability the platform BLE glue implements |
//! | [`Message`] | The nine wire messages |
//!
//! Pose math (frame transforms, deltas, resampling), robot integration
//! and CLI/QR concerns live in the embedding application; this crate is
//! only the protocol and session engine.

/// Host configuration and credential generation.
pub mod config;
/// UDP beacon discovery.
pub mod discovery;
/// Event routing and the reverse channel.
pub mod engine;
/// The owning host handle.
pub mod host;
/// Wire protocol: codec, constants, framing.
pub mod protocol;
/// Session state machine and supervisor.
pub mod session;
/// Host counters.
pub mod telemetry;
/// Transport abstraction (TCP, BLE).
pub mod transport;

pub use config::{generate_credentials, HostConfig};
pub use engine::{Command, DisconnectReason, Event, EventSink};
pub use host::{Host, HostError, TransportSelector};
pub use protocol::{AckStatus, Message, PoseSample};
pub use telemetry::{HostMetrics, MetricsSnapshot};
pub use transport::{BleAdapter, BleInbound, Characteristic, TransportError};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
