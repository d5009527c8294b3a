// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire protocol constants.
//!
//! Every message starts with the common 6-byte header:
//!
//! ```text
//! +------------+-------------+-------------+
//! | "TELE" (4) | msg_type(1) | version(1)  |
//! +------------+-------------+-------------+
//! ```
//!
//! All multi-byte fields are little-endian. TCP payloads are preceded by a
//! 2-byte little-endian length prefix; UDP beacons and BLE characteristic
//! writes carry one unframed message each.

use std::time::Duration;

/// Magic bytes opening every message.
pub const MAGIC: [u8; 4] = *b"TELE";

/// Current protocol version carried in the header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Oldest protocol version this host accepts.
pub const MIN_VERSION: u8 = 1;

/// Newest protocol version this host accepts.
pub const MAX_VERSION: u8 = 1;

/// Common header size (magic + msg_type + version).
pub const HEADER_SIZE: usize = 6;

// ===== Message type ids =====

/// HELLO (mobile -> host): authentication request.
pub const MSG_HELLO: u8 = 1;
/// ACK (host -> mobile): authentication / version-negotiation response.
pub const MSG_ACK: u8 = 2;
/// POSE (mobile -> host): one 6-DoF sample.
pub const MSG_POSE: u8 = 3;
/// BYE (mobile -> host): graceful session end.
pub const MSG_BYE: u8 = 4;
/// CMD (mobile -> host): discrete command (recording toggles).
pub const MSG_CMD: u8 = 5;
/// HEARTBEAT (host -> mobile, BLE only): liveness counter.
pub const MSG_HEARTBEAT: u8 = 6;
/// HAPTIC (host -> mobile): feedback intensity.
pub const MSG_HAPTIC: u8 = 7;
/// BEACON (host broadcast, UDP only): discovery announcement.
pub const MSG_BEACON: u8 = 8;
/// CONFIG (host -> mobile): opaque runtime configuration.
pub const MSG_CONFIG: u8 = 9;

// ===== Fixed message sizes (payload bytes, excluding the TCP frame prefix) =====

/// HELLO: header + session_id(4) + code(6) + reserved(2).
pub const HELLO_SIZE: usize = 18;
/// ACK: header + status(1) + reserved(1) + min_ver(1) + max_ver(1) + reserved(2).
pub const ACK_SIZE: usize = 12;
/// POSE: header + seq(2) + ts_us(8) + flags(1) + reserved(1) + 7 x f32.
pub const POSE_SIZE: usize = 46;
/// BYE: header + session_id(4).
pub const BYE_SIZE: usize = 10;
/// CMD: header + cmd_type(1) + value(1).
pub const CMD_SIZE: usize = 8;
/// HEARTBEAT: header + counter(4) + uptime_ms(4).
pub const HEARTBEAT_SIZE: usize = 14;
/// HAPTIC: header + intensity(4) + channel(1) + reserved(1).
pub const HAPTIC_SIZE: usize = 12;
/// BEACON minimum: header + port(2) + name_len(1) + reserved(1).
pub const BEACON_MIN_SIZE: usize = 10;
/// CONFIG minimum: header + config_len(2).
pub const CONFIG_MIN_SIZE: usize = 8;

/// Auth code length in HELLO.
pub const AUTH_CODE_LEN: usize = 6;

/// POSE flags bit 0: first sample of a movement segment.
pub const FLAG_MOVEMENT_START: u8 = 0x01;

// ===== Framing =====

/// TCP frame length prefix size.
pub const FRAME_PREFIX_SIZE: usize = 2;

/// Maximum framed payload. BEACON and CONFIG are bounded well below this
/// by the service-name and config-length limits; anything larger is a
/// protocol violation.
pub const MAX_FRAME_LEN: usize = 4096;

/// Maximum CONFIG payload that fits a frame (header + length prefix removed).
pub const MAX_CONFIG_LEN: usize = MAX_FRAME_LEN - CONFIG_MIN_SIZE;

/// Service name length bounds for BEACON / BLE advertising.
pub const MIN_SERVICE_NAME_LEN: usize = 1;
/// Upper bound keeps the name inside a BLE advertisement.
pub const MAX_SERVICE_NAME_LEN: usize = 20;

// ===== Default ports =====

/// Default TCP data port.
pub const DEFAULT_TCP_PORT: u16 = 50_000;

/// Default UDP beacon port.
pub const DEFAULT_BEACON_PORT: u16 = 50_001;

// ===== Timing defaults =====

/// Beacon broadcast period.
pub const BEACON_PERIOD: Duration = Duration::from_millis(500);

/// Deadline for HELLO (TCP) or the Auth write (BLE) after link-up.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// BLE heartbeat notify period (2 Hz).
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(500);

/// BLE inbound-silence teardown threshold.
pub const BLE_SILENCE_TIMEOUT: Duration = Duration::from_secs(3);

/// TCP keepalive: idle time before the first probe.
pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(5);
/// TCP keepalive: interval between probes.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);
/// TCP keepalive: failed probes before the connection is declared dead.
pub const KEEPALIVE_RETRIES: u32 = 3;

/// SO_RCVBUF / SO_SNDBUF for the accepted stream; kept small so the kernel
/// cannot buffer more than a few milliseconds of pose traffic.
pub const SOCKET_BUFFER_SIZE: usize = 32 * 1024;

// ===== Auth lockout =====

/// Consecutive BAD_CODE attempts from one remote before lockout.
pub const LOCKOUT_MAX_FAILURES: u32 = 3;

/// Window over which BAD_CODE attempts accumulate.
pub const LOCKOUT_WINDOW: Duration = Duration::from_secs(60);

// ===== BLE GATT =====

/// Televoodoo GATT service UUID.
pub const BLE_SERVICE_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF61";

/// Auth characteristic (Write): 6-char code, wrapped into a HELLO.
pub const BLE_CHAR_AUTH_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF63";
/// Pose characteristic (Write, WriteWithoutResponse): POSE messages.
pub const BLE_CHAR_POSE_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF64";
/// Heartbeat characteristic (Read, Notify): HEARTBEAT messages.
pub const BLE_CHAR_HEARTBEAT_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF65";
/// Command characteristic (Write, WriteWithoutResponse): CMD messages.
pub const BLE_CHAR_COMMAND_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF66";
/// Haptic characteristic (Read, Notify): HAPTIC messages.
pub const BLE_CHAR_HAPTIC_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF67";
/// Config characteristic (Read, Notify): CONFIG messages.
pub const BLE_CHAR_CONFIG_UUID: &str = "1C8FD138-FC18-4846-954D-E509366AEF68";

/// Minimum negotiated ATT MTU. POSE is 46 bytes and must fit one write.
pub const BLE_MIN_MTU: usize = 64;
