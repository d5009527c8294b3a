// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing for TCP streams.
//!
//! TCP is a stream protocol without message boundaries. Each payload is
//! delimited by a 2-byte little-endian length prefix:
//!
//! ```text
//! +----------------+----------------------+
//! | Length (2B LE) | Message payload      |
//! +----------------+----------------------+
//! ```
//!
//! A zero length is illegal, and the length is capped at
//! [`MAX_FRAME_LEN`](crate::protocol::MAX_FRAME_LEN), far above any legal
//! message but small enough that a corrupt prefix cannot stall the reader
//! on a multi-megabyte allocation.
//!
//! [`FrameDecoder`] maintains partial-read state so it works unchanged on
//! blocking streams with read timeouts: a timeout mid-frame parks the
//! decoder and the next call resumes where it left off.

use std::io::{self, Read, Write};

use thiserror::Error;

use super::constants::{FRAME_PREFIX_SIZE, MAX_FRAME_LEN};

/// Errors produced while framing or deframing.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream at a frame boundary.
    #[error("connection closed")]
    Closed,

    /// The stream ended in the middle of a frame.
    #[error("connection closed mid-frame")]
    UnexpectedEof,

    /// A zero-length frame was announced.
    #[error("zero-length frame")]
    ZeroLength,

    /// The announced frame length exceeds [`MAX_FRAME_LEN`].
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN}-byte limit")]
    TooLarge(usize),

    /// Underlying socket error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Internal state for incremental reading.
#[derive(Debug, Clone, Copy)]
enum ReadState {
    /// Reading the 2-byte length prefix.
    ReadingLength { bytes_read: usize },
    /// Reading the frame body.
    ReadingBody {
        expected_len: usize,
        bytes_read: usize,
    },
}

impl Default for ReadState {
    fn default() -> Self {
        ReadState::ReadingLength { bytes_read: 0 }
    }
}

/// Incremental length-prefix frame decoder.
///
/// Call [`FrameDecoder::read_frame`] whenever the stream may have data.
/// `Ok(None)` means the read timed out or would block before a full frame
/// arrived; partial progress is retained for the next call.
#[derive(Debug)]
pub struct FrameDecoder {
    state: ReadState,
    buffer: Vec<u8>,
    frames_decoded: u64,
    bytes_decoded: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with empty state.
    pub fn new() -> Self {
        Self {
            state: ReadState::default(),
            buffer: vec![0u8; FRAME_PREFIX_SIZE],
            frames_decoded: 0,
            bytes_decoded: 0,
        }
    }

    /// Number of frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Total payload bytes decoded so far (prefix excluded).
    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    /// Whether the decoder is parked in the middle of a frame.
    pub fn is_partial(&self) -> bool {
        match self.state {
            ReadState::ReadingLength { bytes_read } => bytes_read > 0,
            ReadState::ReadingBody { .. } => true,
        }
    }

    /// Reset partial state (after a connection is torn down).
    pub fn reset(&mut self) {
        self.state = ReadState::default();
        self.buffer.resize(FRAME_PREFIX_SIZE, 0);
    }

    /// Try to read one complete frame payload from the stream.
    ///
    /// Returns:
    /// - `Ok(Some(payload))` - a complete frame arrived
    /// - `Ok(None)` - the read timed out / would block; call again later
    /// - `Err(FrameError::Closed)` - clean EOF at a frame boundary
    /// - `Err(_)` - protocol violation or socket error
    pub fn read_frame<R: Read + ?Sized>(
        &mut self,
        stream: &mut R,
    ) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            match self.state {
                ReadState::ReadingLength { bytes_read } => {
                    match stream.read(&mut self.buffer[bytes_read..FRAME_PREFIX_SIZE]) {
                        Ok(0) => {
                            return if bytes_read == 0 {
                                Err(FrameError::Closed)
                            } else {
                                Err(FrameError::UnexpectedEof)
                            };
                        }
                        Ok(n) => {
                            let total = bytes_read + n;
                            if total < FRAME_PREFIX_SIZE {
                                self.state = ReadState::ReadingLength { bytes_read: total };
                                continue;
                            }
                            let len = u16::from_le_bytes([self.buffer[0], self.buffer[1]]) as usize;
                            if len == 0 {
                                self.state = ReadState::default();
                                return Err(FrameError::ZeroLength);
                            }
                            if len > MAX_FRAME_LEN {
                                self.state = ReadState::default();
                                return Err(FrameError::TooLarge(len));
                            }
                            self.buffer.resize(len, 0);
                            self.state = ReadState::ReadingBody {
                                expected_len: len,
                                bytes_read: 0,
                            };
                        }
                        Err(e) if would_block(&e) => {
                            self.state = ReadState::ReadingLength { bytes_read };
                            return Ok(None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                ReadState::ReadingBody {
                    expected_len,
                    bytes_read,
                } => {
                    match stream.read(&mut self.buffer[bytes_read..expected_len]) {
                        Ok(0) => return Err(FrameError::UnexpectedEof),
                        Ok(n) => {
                            let total = bytes_read + n;
                            if total < expected_len {
                                self.state = ReadState::ReadingBody {
                                    expected_len,
                                    bytes_read: total,
                                };
                                continue;
                            }
                            let payload = self.buffer[..expected_len].to_vec();
                            self.frames_decoded += 1;
                            self.bytes_decoded += expected_len as u64;
                            self.buffer.resize(FRAME_PREFIX_SIZE, 0);
                            self.state = ReadState::default();
                            return Ok(Some(payload));
                        }
                        Err(e) if would_block(&e) => {
                            self.state = ReadState::ReadingBody {
                                expected_len,
                                bytes_read,
                            };
                            return Ok(None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }
}

/// A read timeout surfaces as `WouldBlock` on unix and `TimedOut` on
/// windows; both mean "try again".
fn would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Read one frame from a blocking stream.
///
/// Returns `Ok(None)` on clean EOF at a frame boundary, per the session
/// teardown contract.
pub fn read_message<R: Read + ?Sized>(stream: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut decoder = FrameDecoder::new();
    loop {
        match decoder.read_frame(stream) {
            Ok(Some(payload)) => return Ok(Some(payload)),
            // A blocking stream without a timeout never parks the decoder,
            // but tolerate a spurious wakeup and retry.
            Ok(None) => continue,
            Err(FrameError::Closed) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

/// Frame a payload into `[len][payload]`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    debug_assert!(!payload.is_empty() && payload.len() <= MAX_FRAME_LEN);
    let mut buf = Vec::with_capacity(FRAME_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Write one framed payload as a single gathered write.
///
/// Prefix and payload go out in one `write_all` so concurrent writers
/// serialized on the stream lock can never interleave half-frames.
pub fn write_message<W: Write + ?Sized>(stream: &mut W, payload: &[u8]) -> io::Result<()> {
    stream.write_all(&frame(payload))
}

// ============================================================================
// Tests
// ============================================================================
