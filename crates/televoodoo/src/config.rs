// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host configuration.
//!
//! Everything the embedding application supplies: identity (service name,
//! auth code), ports, the initial CONFIG payload and the protocol timers.
//! Timers default to the values the mobile app is built against; change
//! them only for tests.
//!
//! # Example
//!
//! ```
//! use televoodoo::HostConfig;
//!
//! let config = HostConfig::new("myvoodoo", "ABC123")
//!     .with_initial_config(b"{}".to_vec());
//! assert!(config.validate().is_ok());
//! ```

use std::net::Ipv4Addr;
use std::time::Duration;

use rand::Rng;

use crate::protocol::constants::{
    AUTH_CODE_LEN, BEACON_PERIOD, BLE_SILENCE_TIMEOUT, DEFAULT_BEACON_PORT, DEFAULT_TCP_PORT,
    HEARTBEAT_PERIOD, HELLO_TIMEOUT, MAX_CONFIG_LEN, MAX_SERVICE_NAME_LEN, MAX_VERSION,
    MIN_SERVICE_NAME_LEN, MIN_VERSION,
};

/// Host-side configuration.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Service name: embedded in beacons and advertised over BLE.
    /// 1..=20 UTF-8 bytes.
    pub service_name: String,

    /// Auth code the mobile must present in HELLO: exactly six bytes of
    /// `[A-Z0-9]`, compared byte-for-byte.
    pub auth_code: String,

    /// TCP data port (0 = ephemeral, useful in tests).
    pub tcp_port: u16,

    /// UDP beacon destination port.
    pub beacon_port: u16,

    /// Beacon destination address. The limited broadcast address reaches
    /// every interface, including USB tethering bridges; tests point this
    /// at loopback.
    pub beacon_addr: Ipv4Addr,

    /// Beacon broadcast period.
    pub beacon_period: Duration,

    /// Payload sent verbatim in the initial CONFIG after ACK(OK).
    pub initial_config: Vec<u8>,

    /// Deadline for HELLO (TCP) / the Auth write (BLE) after link-up.
    pub hello_timeout: Duration,

    /// BLE inbound-silence teardown threshold.
    pub ble_silence_timeout: Duration,

    /// BLE heartbeat notify period.
    pub heartbeat_period: Duration,

    /// Oldest protocol version accepted (advertised in ACK).
    pub min_version: u8,

    /// Newest protocol version accepted (advertised in ACK).
    pub max_version: u8,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            service_name: "televoodoo".to_owned(),
            auth_code: "000000".to_owned(),
            tcp_port: DEFAULT_TCP_PORT,
            beacon_port: DEFAULT_BEACON_PORT,
            beacon_addr: Ipv4Addr::BROADCAST,
            beacon_period: BEACON_PERIOD,
            initial_config: Vec::new(),
            hello_timeout: HELLO_TIMEOUT,
            ble_silence_timeout: BLE_SILENCE_TIMEOUT,
            heartbeat_period: HEARTBEAT_PERIOD,
            min_version: MIN_VERSION,
            max_version: MAX_VERSION,
        }
    }
}

impl HostConfig {
    /// Config with the given identity and all defaults.
    pub fn new(service_name: impl Into<String>, auth_code: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            auth_code: auth_code.into(),
            ..Default::default()
        }
    }

    /// Builder: TCP data port.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Builder: UDP beacon port.
    pub fn with_beacon_port(mut self, port: u16) -> Self {
        self.beacon_port = port;
        self
    }

    /// Builder: beacon destination address.
    pub fn with_beacon_addr(mut self, addr: Ipv4Addr) -> Self {
        self.beacon_addr = addr;
        self
    }

    /// Builder: initial CONFIG payload.
    pub fn with_initial_config(mut self, payload: Vec<u8>) -> Self {
        self.initial_config = payload;
        self
    }

    /// Builder: beacon period.
    pub fn with_beacon_period(mut self, period: Duration) -> Self {
        self.beacon_period = period;
        self
    }

    /// Builder: HELLO deadline.
    pub fn with_hello_timeout(mut self, timeout: Duration) -> Self {
        self.hello_timeout = timeout;
        self
    }

    /// Builder: BLE silence threshold.
    pub fn with_ble_silence_timeout(mut self, timeout: Duration) -> Self {
        self.ble_silence_timeout = timeout;
        self
    }

    /// Auth code as the exact bytes carried in HELLO.
    pub(crate) fn auth_code_bytes(&self) -> [u8; AUTH_CODE_LEN] {
        let mut code = [0u8; AUTH_CODE_LEN];
        code.copy_from_slice(self.auth_code.as_bytes());
        code
    }

    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let name_len = self.service_name.len();
        if !(MIN_SERVICE_NAME_LEN..=MAX_SERVICE_NAME_LEN).contains(&name_len) {
            return Err(format!(
                "service_name must be {}..={} bytes, got {}",
                MIN_SERVICE_NAME_LEN, MAX_SERVICE_NAME_LEN, name_len
            ));
        }
        if self.auth_code.len() != AUTH_CODE_LEN {
            return Err(format!(
                "auth_code must be exactly {} characters",
                AUTH_CODE_LEN
            ));
        }
        if !self
            .auth_code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err("auth_code must match [A-Z0-9]{6}".to_owned());
        }
        if self.initial_config.len() > MAX_CONFIG_LEN {
            return Err(format!(
                "initial_config exceeds {} bytes",
                MAX_CONFIG_LEN
            ));
        }
        if self.beacon_period.is_zero() {
            return Err("beacon_period must be > 0".to_owned());
        }
        if self.hello_timeout.is_zero() {
            return Err("hello_timeout must be > 0".to_owned());
        }
        if self.min_version > self.max_version {
            return Err("min_version must be <= max_version".to_owned());
        }
        Ok(())
    }
}

/// Generate random connection credentials: a `voodooXX` service name and
/// a 6-character `[A-Z0-9]` auth code.
pub fn generate_credentials() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let mut pick = |n: usize| -> String {
        (0..n)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    };
    let name = format!("voodoo{}", pick(2));
    let code = pick(AUTH_CODE_LEN);
    (name, code)
}
