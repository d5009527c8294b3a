// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire protocol: constants, message codec and TCP framing.
//!
//! The protocol layer is pure (no sockets, no clocks), so TCP, BLE and
//! the beacon broadcaster all share one codec, one test corpus and one
//! fuzz surface.

/// Protocol constants (magic, versions, sizes, ports, GATT UUIDs).
pub mod constants;

/// Message sum type and pack/unpack functions.
pub mod codec;

/// Length-prefix stream framing for TCP.
pub mod framing;

pub use codec::{decode, encode, AckStatus, CodecError, Message, PoseSample};
pub use constants::{
    DEFAULT_BEACON_PORT, DEFAULT_TCP_PORT, MAX_CONFIG_LEN, MAX_FRAME_LEN, MAX_VERSION, MIN_VERSION,
    PROTOCOL_VERSION,
};
pub use framing::{FrameDecoder, FrameError};
