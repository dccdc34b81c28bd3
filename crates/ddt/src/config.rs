// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Convertor configuration.
//!
//! Describes the peer on the other end of the byte stream and lets callers
//! steer path selection. Defaults describe the host, so a default-configured
//! convertor never converts and may use the contiguous fast path.

use crate::error::{Error, Result};
use crate::types::primitive::{LONG_DOUBLE_SIZE, LONG_SIZE};
use std::fmt;

/// Byte order of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the running host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    /// Byte order of the running host.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;

    /// The opposite byte order.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Little => write!(f, "little-endian"),
            Endian::Big => write!(f, "big-endian"),
        }
    }
}

/// Representation of primitives on a peer.
///
/// Only the properties that change the byte image of a primitive are kept:
/// byte order and the platform-dependent widths of `long` and `long double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Architecture {
    pub endian: Endian,
    pub long_size: usize,
    pub long_double_size: usize,
}

impl Architecture {
    /// The architecture this process runs on.
    #[must_use]
    pub const fn host() -> Self {
        Self {
            endian: Endian::NATIVE,
            long_size: LONG_SIZE,
            long_double_size: LONG_DOUBLE_SIZE,
        }
    }

    /// Host architecture with the opposite byte order.
    #[must_use]
    pub const fn byte_swapped() -> Self {
        Self {
            endian: Endian::NATIVE.swapped(),
            long_size: LONG_SIZE,
            long_double_size: LONG_DOUBLE_SIZE,
        }
    }

    /// True when primitives must be re-encoded to match this peer.
    #[must_use]
    pub fn is_heterogeneous(&self) -> bool {
        *self != Self::host()
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self::host()
    }
}

/// Per-operation convertor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvertorConfig {
    /// Peer representation of the packed stream.
    pub remote: Architecture,
    /// Always run the stack machine, even when the bulk-copy path applies.
    pub force_general_path: bool,
    /// Walk the coalesced element list instead of the raw one.
    pub use_optimized: bool,
}

impl Default for ConvertorConfig {
    fn default() -> Self {
        Self {
            remote: Architecture::host(),
            force_general_path: false,
            use_optimized: true,
        }
    }
}

impl ConvertorConfig {
    /// Configuration for a peer with the given architecture.
    #[must_use]
    pub fn for_remote(remote: Architecture) -> Self {
        Self {
            remote,
            ..Self::default()
        }
    }

    /// Reject settings no convertor can honor.
    pub fn validate(&self) -> Result<()> {
        if self.remote.long_size == 0 || self.remote.long_double_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "remote primitive widths must be non-zero (long={}, long double={})",
                self.remote.long_size, self.remote.long_double_size
            )));
        }
        Ok(())
    }
}
