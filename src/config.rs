//! Session configuration
//!
//! Plain, validated data: no builder macro, no file/environment loading (that
//! is left to the embedding application). Construction through
//! [`NeighborConfig::new`] is the only place local misconfiguration is
//! rejected; anything the peer itself controls (its own hold time, its
//! capabilities) is checked later by [`crate::open::validate`].

// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// A misconfiguration caught before a session is ever created
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `hold_time` was in `1..3`: too small to be a valid HoldTimer, but not
    /// the sentinel `0` that disables the liveness check entirely
    #[error("hold time {0} is neither 0 (disabled) nor at least 3 seconds")]
    UnacceptableHoldTime(u16),
}

/// Static, per-neighbor configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborConfig {
    pub address: IpAddr,
    pub asn: u32,
    /// Hold time in seconds; `0` disables the HoldTimer/Keepalive liveness check entirely
    pub hold_time: u16,
}

impl NeighborConfig {
    /// Build a neighbor configuration, rejecting a hold time that is neither
    /// `0` (liveness disabled) nor at least 3 seconds (RFC 4271 Section 4.2).
    pub fn new(address: IpAddr, asn: u32, hold_time: u16) -> Result<Self, ConfigError> {
        if hold_time != 0 && hold_time < 3 {
            return Err(ConfigError::UnacceptableHoldTime(hold_time));
        }
        Ok(Self { address, asn, hold_time })
    }
}

/// Session-global options shared by whatever neighbors a deployment configures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub local_asn: u32,
    pub local_bgp_id: Ipv4Addr,
    pub port: u16,
}

impl SessionConfig {
    #[must_use]
    pub const fn new(local_asn: u32, local_bgp_id: Ipv4Addr) -> Self {
        Self { local_asn, local_bgp_id, port: Self::DEFAULT_PORT }
    }

    pub const DEFAULT_PORT: u16 = 179;
}
