// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary message codec for the nine wire messages.
//!
//! One pure codec is shared by every transport: TCP frames, UDP beacons and
//! BLE characteristic writes all carry payloads produced by [`encode`] and
//! consumed by [`decode`]. Layouts are fixed and little-endian throughout;
//! see [`crate::protocol::constants`] for the field-by-field breakdown.
//!
//! Decoding is total: any byte slice either yields a [`Message`] or a
//! specific [`CodecError`]: the decoder never panics and never reads past
//! the declared length. Reserved bytes are written as zero and tolerated
//! nonzero on receive, flagged at debug level, so that future protocol
//! revisions can use them without a version bump.

use thiserror::Error;

use super::constants::*;

/// Errors produced by [`decode`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Payload does not start with the `TELE` magic.
    #[error("bad magic (expected TELE)")]
    BadMagic,

    /// Header version outside the supported range.
    #[error("unsupported protocol version {got} (supported {MIN_VERSION}..={MAX_VERSION})")]
    UnsupportedVersion {
        /// Version byte found in the header.
        got: u8,
    },

    /// Message type id outside the known set.
    #[error("unknown message type {got}")]
    UnknownType {
        /// Type byte found in the header.
        got: u8,
    },

    /// Payload length does not match the message layout.
    #[error("payload length mismatch (expected {expected}, got {got})")]
    TruncatedOrOversized {
        /// Length the layout requires.
        expected: usize,
        /// Length actually received.
        got: usize,
    },

    /// Structurally invalid content (zero-length name, bad enum value,
    /// non-UTF-8 service name).
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),
}

/// ACK status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckStatus {
    /// Authentication succeeded; session established.
    Ok = 0,
    /// Auth code did not match.
    BadCode = 1,
    /// Another session is already active.
    Busy = 2,
    /// Mobile protocol version outside the host's supported range.
    VersionMismatch = 3,
}

impl AckStatus {
    /// Decode a status byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AckStatus::Ok),
            1 => Some(AckStatus::BadCode),
            2 => Some(AckStatus::Busy),
            3 => Some(AckStatus::VersionMismatch),
            _ => None,
        }
    }
}

/// One decoded 6-DoF sample.
///
/// Position is meters, orientation is a quaternion forwarded verbatim;
/// the codec does not normalize; consumers are expected to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Application-layer sequence number; wraps at 2^16.
    pub seq: u16,
    /// Sender timestamp in microseconds.
    pub timestamp_us: u64,
    /// Raw flag byte. Bit 0 is the movement-start marker; bits 1..7 are
    /// preserved but carry no semantics.
    pub flags: u8,
    /// Position x (m).
    pub x: f32,
    /// Position y (m).
    pub y: f32,
    /// Position z (m).
    pub z: f32,
    /// Quaternion x.
    pub qx: f32,
    /// Quaternion y.
    pub qy: f32,
    /// Quaternion z.
    pub qz: f32,
    /// Quaternion w.
    pub qw: f32,
}

impl PoseSample {
    /// Whether this sample opens a movement segment (flags bit 0).
    pub fn movement_start(&self) -> bool {
        self.flags & FLAG_MOVEMENT_START != 0
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Authentication request (mobile -> host).
    Hello {
        /// Mobile-chosen session id, echoed back in BYE validation.
        session_id: u32,
        /// Exact auth code bytes; compared byte-for-byte.
        code: [u8; AUTH_CODE_LEN],
        /// Header version, kept for negotiation.
        version: u8,
    },
    /// Authentication response (host -> mobile).
    Ack {
        /// Outcome of the HELLO.
        status: AckStatus,
        /// Oldest version the host accepts.
        min_version: u8,
        /// Newest version the host accepts.
        max_version: u8,
    },
    /// One pose sample (mobile -> host).
    Pose(PoseSample),
    /// Graceful session end (mobile -> host, and host -> mobile on shutdown).
    Bye {
        /// Session id from the original HELLO.
        session_id: u32,
    },
    /// Discrete command (mobile -> host).
    Cmd {
        /// Raw command type byte (1 = recording, 2 = keep-recording).
        cmd_type: u8,
        /// Raw value byte (0 or 1 for the known commands).
        value: u8,
    },
    /// Liveness counter (host -> mobile, BLE only).
    Heartbeat {
        /// Monotonic counter, wraps at 2^32.
        counter: u32,
        /// Host uptime in milliseconds.
        uptime_ms: u32,
    },
    /// Feedback intensity (host -> mobile).
    Haptic {
        /// Intensity in [0, 1]; the outbound path clamps before encoding.
        intensity: f32,
        /// Haptic channel (0 for the default actuator).
        channel: u8,
    },
    /// Discovery announcement (host broadcast, UDP only).
    Beacon {
        /// TCP data port the host listens on.
        tcp_port: u16,
        /// Service name, 1..=255 UTF-8 bytes on the wire.
        name: String,
    },
    /// Opaque runtime configuration (host -> mobile).
    Config {
        /// Verbatim payload bytes; the core does not interpret them.
        payload: Vec<u8>,
    },
}

impl Message {
    /// Wire type id of this message.
    pub fn msg_type(&self) -> u8 {
        match self {
            Message::Hello { .. } => MSG_HELLO,
            Message::Ack { .. } => MSG_ACK,
            Message::Pose(_) => MSG_POSE,
            Message::Bye { .. } => MSG_BYE,
            Message::Cmd { .. } => MSG_CMD,
            Message::Heartbeat { .. } => MSG_HEARTBEAT,
            Message::Haptic { .. } => MSG_HAPTIC,
            Message::Beacon { .. } => MSG_BEACON,
            Message::Config { .. } => MSG_CONFIG,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "HELLO",
            Message::Ack { .. } => "ACK",
            Message::Pose(_) => "POSE",
            Message::Bye { .. } => "BYE",
            Message::Cmd { .. } => "CMD",
            Message::Heartbeat { .. } => "HEARTBEAT",
            Message::Haptic { .. } => "HAPTIC",
            Message::Beacon { .. } => "BEACON",
            Message::Config { .. } => "CONFIG",
        }
    }
}

// ===== Encoding =====

/// Encode a message into its wire payload (header included, frame prefix
/// excluded). Reserved bytes are written as zero.
pub fn encode(msg: &Message) -> Vec<u8> {
    match msg {
        Message::Hello {
            session_id,
            code,
            version,
        } => {
            let mut buf = header_with_version(MSG_HELLO, *version, HELLO_SIZE);
            buf.extend_from_slice(&session_id.to_le_bytes());
            buf.extend_from_slice(code);
            buf.extend_from_slice(&[0, 0]);
            buf
        }
        Message::Ack {
            status,
            min_version,
            max_version,
        } => {
            let mut buf = header(MSG_ACK, ACK_SIZE);
            buf.push(*status as u8);
            buf.push(0);
            buf.push(*min_version);
            buf.push(*max_version);
            buf.extend_from_slice(&[0, 0]);
            buf
        }
        Message::Pose(p) => {
            let mut buf = header(MSG_POSE, POSE_SIZE);
            buf.extend_from_slice(&p.seq.to_le_bytes());
            buf.extend_from_slice(&p.timestamp_us.to_le_bytes());
            buf.push(p.flags);
            buf.push(0);
            for v in [p.x, p.y, p.z, p.qx, p.qy, p.qz, p.qw] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            buf
        }
        Message::Bye { session_id } => {
            let mut buf = header(MSG_BYE, BYE_SIZE);
            buf.extend_from_slice(&session_id.to_le_bytes());
            buf
        }
        Message::Cmd { cmd_type, value } => {
            let mut buf = header(MSG_CMD, CMD_SIZE);
            buf.push(*cmd_type);
            buf.push(*value);
            buf
        }
        Message::Heartbeat { counter, uptime_ms } => {
            let mut buf = header(MSG_HEARTBEAT, HEARTBEAT_SIZE);
            buf.extend_from_slice(&counter.to_le_bytes());
            buf.extend_from_slice(&uptime_ms.to_le_bytes());
            buf
        }
        Message::Haptic { intensity, channel } => {
            let mut buf = header(MSG_HAPTIC, HAPTIC_SIZE);
            buf.extend_from_slice(&intensity.to_le_bytes());
            buf.push(*channel);
            buf.push(0);
            buf
        }
        Message::Beacon { tcp_port, name } => {
            debug_assert!(!name.is_empty() && name.len() <= u8::MAX as usize);
            let mut buf = header(MSG_BEACON, BEACON_MIN_SIZE + name.len());
            buf.extend_from_slice(&tcp_port.to_le_bytes());
            buf.push(name.len() as u8);
            buf.push(0);
            buf.extend_from_slice(name.as_bytes());
            buf
        }
        Message::Config { payload } => {
            debug_assert!(payload.len() <= MAX_CONFIG_LEN);
            let mut buf = header(MSG_CONFIG, CONFIG_MIN_SIZE + payload.len());
            buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
            buf.extend_from_slice(payload);
            buf
        }
    }
}

fn header(msg_type: u8, capacity: usize) -> Vec<u8> {
    header_with_version(msg_type, PROTOCOL_VERSION, capacity)
}

fn header_with_version(msg_type: u8, version: u8, capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(capacity);
    buf.extend_from_slice(&MAGIC);
    buf.push(msg_type);
    buf.push(version);
    buf
}

// ===== Decoding =====

/// Decode one wire payload (header included, frame prefix excluded).
pub fn decode(payload: &[u8]) -> Result<Message, CodecError> {
    if payload.len() < HEADER_SIZE {
        return Err(CodecError::TruncatedOrOversized {
            expected: HEADER_SIZE,
            got: payload.len(),
        });
    }
    if payload[..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let msg_type = payload[4];
    let version = payload[5];
    if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
        return Err(CodecError::UnsupportedVersion { got: version });
    }
    if !(MSG_HELLO..=MSG_CONFIG).contains(&msg_type) {
        return Err(CodecError::UnknownType { got: msg_type });
    }

    let body = &payload[HEADER_SIZE..];
    match msg_type {
        MSG_HELLO => {
            expect_len(payload.len(), HELLO_SIZE)?;
            flag_reserved("HELLO", &body[10..12]);
            let mut code = [0u8; AUTH_CODE_LEN];
            code.copy_from_slice(&body[4..4 + AUTH_CODE_LEN]);
            Ok(Message::Hello {
                session_id: u32_le(&body[0..4]),
                code,
                version,
            })
        }
        MSG_ACK => {
            expect_len(payload.len(), ACK_SIZE)?;
            flag_reserved("ACK", &[body[1], body[4], body[5]]);
            let status = AckStatus::from_u8(body[0])
                .ok_or(CodecError::InvalidFrame("unknown ACK status"))?;
            Ok(Message::Ack {
                status,
                min_version: body[2],
                max_version: body[3],
            })
        }
        MSG_POSE => {
            expect_len(payload.len(), POSE_SIZE)?;
            flag_reserved("POSE", &body[11..12]);
            let mut floats = [0f32; 7];
            for (i, f) in floats.iter_mut().enumerate() {
                *f = f32_le(&body[12 + i * 4..16 + i * 4]);
            }
            Ok(Message::Pose(PoseSample {
                seq: u16_le(&body[0..2]),
                timestamp_us: u64_le(&body[2..10]),
                flags: body[10],
                x: floats[0],
                y: floats[1],
                z: floats[2],
                qx: floats[3],
                qy: floats[4],
                qz: floats[5],
                qw: floats[6],
            }))
        }
        MSG_BYE => {
            expect_len(payload.len(), BYE_SIZE)?;
            Ok(Message::Bye {
                session_id: u32_le(&body[0..4]),
            })
        }
        MSG_CMD => {
            expect_len(payload.len(), CMD_SIZE)?;
            Ok(Message::Cmd {
                cmd_type: body[0],
                value: body[1],
            })
        }
        MSG_HEARTBEAT => {
            expect_len(payload.len(), HEARTBEAT_SIZE)?;
            Ok(Message::Heartbeat {
                counter: u32_le(&body[0..4]),
                uptime_ms: u32_le(&body[4..8]),
            })
        }
        MSG_HAPTIC => {
            expect_len(payload.len(), HAPTIC_SIZE)?;
            flag_reserved("HAPTIC", &body[5..6]);
            Ok(Message::Haptic {
                intensity: f32_le(&body[0..4]),
                channel: body[4],
            })
        }
        MSG_BEACON => {
            if payload.len() < BEACON_MIN_SIZE {
                return Err(CodecError::TruncatedOrOversized {
                    expected: BEACON_MIN_SIZE,
                    got: payload.len(),
                });
            }
            let name_len = body[2] as usize;
            if name_len == 0 {
                return Err(CodecError::InvalidFrame("zero-length service name"));
            }
            expect_len(payload.len(), BEACON_MIN_SIZE + name_len)?;
            flag_reserved("BEACON", &body[3..4]);
            let name = std::str::from_utf8(&body[4..4 + name_len])
                .map_err(|_| CodecError::InvalidFrame("service name is not UTF-8"))?;
            Ok(Message::Beacon {
                tcp_port: u16_le(&body[0..2]),
                name: name.to_owned(),
            })
        }
        MSG_CONFIG => {
            if payload.len() < CONFIG_MIN_SIZE {
                return Err(CodecError::TruncatedOrOversized {
                    expected: CONFIG_MIN_SIZE,
                    got: payload.len(),
                });
            }
            let config_len = u16_le(&body[0..2]) as usize;
            expect_len(payload.len(), CONFIG_MIN_SIZE + config_len)?;
            Ok(Message::Config {
                payload: body[2..2 + config_len].to_vec(),
            })
        }
        // Range-checked above.
        _ => unreachable!(),
    }
}

fn expect_len(got: usize, expected: usize) -> Result<(), CodecError> {
    if got == expected {
        Ok(())
    } else {
        Err(CodecError::TruncatedOrOversized { expected, got })
    }
}

/// Reserved bytes are accepted nonzero (a newer peer may already be using
/// them) but the observation is flagged for protocol debugging.
fn flag_reserved(msg: &'static str, reserved: &[u8]) {
    if reserved.iter().any(|&b| b != 0) {
        log::debug!("[codec] {} carries nonzero reserved bytes {:02x?}", msg, reserved);
    }
}

fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn u64_le(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

fn f32_le(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pose() -> PoseSample {
        PoseSample {
            seq: 7,
            timestamp_us: 1_234_567,
            flags: FLAG_MOVEMENT_START,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }

    fn all_messages() -> Vec<Message> {
        vec![
            Message::Hello {
                session_id: 0xDEAD_BEEF,
                code: *b"ABC123",
                version: PROTOCOL_VERSION,
            },
            Message::Ack {
                status: AckStatus::Ok,
                min_version: MIN_VERSION,
                max_version: MAX_VERSION,
            },
            Message::Pose(sample_pose()),
            Message::Bye { session_id: 42 },
            Message::Cmd {
                cmd_type: 1,
                value: 1,
            },
            Message::Heartbeat {
                counter: 99,
                uptime_ms: 50_000,
            },
            Message::Haptic {
                intensity: 0.5,
                channel: 0,
            },
            Message::Beacon {
                tcp_port: 50_000,
                name: "myvoodoo".to_owned(),
            },
            Message::Config {
                payload: b"{}".to_vec(),
            },
        ]
    }

    #[test]
    fn test_roundtrip_all_messages() {
        for msg in all_messages() {
            let bytes = encode(&msg);
            let decoded = decode(&bytes).expect("roundtrip decode");
            assert_eq!(decoded, msg, "roundtrip mismatch for {}", msg.name());
        }
    }

    #[test]
    fn test_every_encoding_starts_with_header() {
        for msg in all_messages() {
            let bytes = encode(&msg);
            assert_eq!(&bytes[..4], b"TELE");
            assert_eq!(bytes[4], msg.msg_type());
            assert_eq!(bytes[5], PROTOCOL_VERSION);
        }
    }

    #[test]
    fn test_encoded_sizes() {
        let sizes = [
            HELLO_SIZE,
            ACK_SIZE,
            POSE_SIZE,
            BYE_SIZE,
            CMD_SIZE,
            HEARTBEAT_SIZE,
            HAPTIC_SIZE,
            BEACON_MIN_SIZE + 8,
            CONFIG_MIN_SIZE + 2,
        ];
        for (msg, expected) in all_messages().iter().zip(sizes) {
            assert_eq!(encode(msg).len(), expected, "size of {}", msg.name());
        }
    }

    #[test]
    fn test_pose_header_golden() {
        let bytes = encode(&Message::Pose(sample_pose()));
        assert_eq!(&bytes[..6], &[0x54, 0x45, 0x4C, 0x45, 0x03, 0x01]);
        assert_eq!(bytes.len(), 46);
    }

    #[test]
    fn test_beacon_golden_vector() {
        // header + port 50000 LE + name_len 8 + reserved + "myvoodoo"
        let bytes = encode(&Message::Beacon {
            tcp_port: 50_000,
            name: "myvoodoo".to_owned(),
        });
        let expected: &[u8] = &[
            0x54, 0x45, 0x4C, 0x45, 0x08, 0x01, 0x50, 0xC3, 0x08, 0x00, 0x6D, 0x79, 0x76, 0x6F,
            0x6F, 0x64, 0x6F, 0x6F,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_config_golden_vector() {
        let bytes = encode(&Message::Config {
            payload: b"{}".to_vec(),
        });
        let expected: &[u8] = &[0x54, 0x45, 0x4C, 0x45, 0x09, 0x01, 0x02, 0x00, 0x7B, 0x7D];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&Message::Bye { session_id: 1 });
        bytes[0] = b'X';
        assert_eq!(decode(&bytes), Err(CodecError::BadMagic));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&Message::Bye { session_id: 1 });
        bytes[5] = 2;
        assert_eq!(
            decode(&bytes),
            Err(CodecError::UnsupportedVersion { got: 2 })
        );
    }

    #[test]
    fn test_unknown_type() {
        let mut bytes = encode(&Message::Bye { session_id: 1 });
        bytes[4] = 0x7F;
        assert_eq!(decode(&bytes), Err(CodecError::UnknownType { got: 0x7F }));
    }

    #[test]
    fn test_truncated_fixed_message() {
        let bytes = encode(&Message::Pose(sample_pose()));
        assert_eq!(
            decode(&bytes[..POSE_SIZE - 1]),
            Err(CodecError::TruncatedOrOversized {
                expected: POSE_SIZE,
                got: POSE_SIZE - 1,
            })
        );
    }

    #[test]
    fn test_oversized_fixed_message() {
        let mut bytes = encode(&Message::Cmd {
            cmd_type: 1,
            value: 0,
        });
        bytes.push(0);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::TruncatedOrOversized {
                expected: CMD_SIZE,
                got: CMD_SIZE + 1,
            })
        );
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            decode(b"TELE"),
            Err(CodecError::TruncatedOrOversized { .. })
        ));
    }

    #[test]
    fn test_beacon_zero_name_len() {
        let mut bytes = encode(&Message::Beacon {
            tcp_port: 50_000,
            name: "x".to_owned(),
        });
        bytes[8] = 0; // name_len
        bytes.truncate(BEACON_MIN_SIZE);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::InvalidFrame("zero-length service name"))
        );
    }

    #[test]
    fn test_beacon_name_len_exceeds_payload() {
        let mut bytes = encode(&Message::Beacon {
            tcp_port: 50_000,
            name: "abcd".to_owned(),
        });
        bytes[8] = 255; // name_len far beyond the 4 bytes present
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::TruncatedOrOversized { .. })
        ));
    }

    #[test]
    fn test_config_len_exceeds_payload() {
        let mut bytes = encode(&Message::Config {
            payload: b"ab".to_vec(),
        });
        bytes[6] = 0xFF; // config_len low byte
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::TruncatedOrOversized { .. })
        ));
    }

    #[test]
    fn test_reserved_bytes_tolerated_nonzero() {
        // Nonzero reserved bytes are flagged in the log but must not
        // change what decodes.
        let hello = Message::Hello {
            session_id: 1,
            code: *b"ABC123",
            version: PROTOCOL_VERSION,
        };
        let mut bytes = encode(&hello);
        bytes[16] = 0xAA; // reserved u16
        bytes[17] = 0xBB;
        assert_eq!(decode(&bytes).expect("decode"), hello);

        let pose = Message::Pose(sample_pose());
        let mut bytes = encode(&pose);
        bytes[17] = 0xCC; // reserved byte after flags
        assert_eq!(decode(&bytes).expect("decode"), pose);

        let ack = Message::Ack {
            status: AckStatus::Ok,
            min_version: MIN_VERSION,
            max_version: MAX_VERSION,
        };
        let mut bytes = encode(&ack);
        bytes[7] = 0x01; // reserved byte after status
        bytes[10] = 0x02; // trailing reserved u16
        assert_eq!(decode(&bytes).expect("decode"), ack);
    }

    #[test]
    fn test_pose_all_flag_bits() {
        let mut pose = sample_pose();
        pose.flags = 0xFF;
        let decoded = decode(&encode(&Message::Pose(pose))).expect("decode");
        match decoded {
            Message::Pose(p) => {
                assert!(p.movement_start());
                assert_eq!(p.flags, 0xFF);
            }
            other => panic!("expected POSE, got {}", other.name()),
        }
    }

    #[test]
    fn test_pose_floats_bit_exact() {
        let pose = PoseSample {
            seq: 0,
            timestamp_us: 0,
            flags: 0,
            x: f32::NAN,
            y: f32::MIN_POSITIVE / 2.0, // subnormal
            z: -0.0,
            qx: f32::INFINITY,
            qy: f32::NEG_INFINITY,
            qz: f32::from_bits(0x0000_0001),
            qw: 1.0,
        };
        let decoded = decode(&encode(&Message::Pose(pose))).expect("decode");
        match decoded {
            Message::Pose(p) => {
                for (a, b) in [
                    (pose.x, p.x),
                    (pose.y, p.y),
                    (pose.z, p.z),
                    (pose.qx, p.qx),
                    (pose.qy, p.qy),
                    (pose.qz, p.qz),
                    (pose.qw, p.qw),
                ] {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
            other => panic!("expected POSE, got {}", other.name()),
        }
    }

    #[test]
    fn test_ack_unknown_status() {
        let mut bytes = encode(&Message::Ack {
            status: AckStatus::Ok,
            min_version: 1,
            max_version: 1,
        });
        bytes[6] = 9;
        assert_eq!(
            decode(&bytes),
            Err(CodecError::InvalidFrame("unknown ACK status"))
        );
    }

    #[test]
    fn test_decode_never_panics_on_random_prefixes() {
        // Exhaustive over short inputs, pseudo-random over longer ones.
        for len in 0..HEADER_SIZE {
            let _ = decode(&vec![0u8; len]);
        }
        let mut state = 0x1234_5678u32;
        for _ in 0..2000 {
            let len = (state % 64) as usize;
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                buf.push((state >> 24) as u8);
            }
            let _ = decode(&buf);
        }
    }

    #[test]
    fn test_unknown_cmd_type_decodes() {
        let bytes = encode(&Message::Cmd {
            cmd_type: 77,
            value: 3,
        });
        assert_eq!(
            decode(&bytes).expect("decode"),
            Message::Cmd {
                cmd_type: 77,
                value: 3,
            }
        );
    }
}
