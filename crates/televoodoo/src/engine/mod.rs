// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event routing engine.
//!
//! Inbound messages become [`Event`] values delivered through one
//! application callback; outbound haptic/config messages funnel through
//! the [`Router`]'s writer serialization point.

/// Event sum type, application callback and reverse-channel router.
pub mod router;

pub use router::{Command, DisconnectReason, Event, EventSink, Router};
