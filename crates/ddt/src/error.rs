// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine error type.
//!
//! Only conditions that abort an operation are errors. Running out of wire
//! buffer (`Pending`) and running out of input inside a primitive run
//! (`ShortSourceData`) are reported through [`crate::Status`] so partial
//! progress is never lost.

use crate::convert::Direction;
use crate::types::PrimitiveKind;
use thiserror::Error;

/// Errors raised by descriptor construction and convertor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Structural invariant violated while committing a descriptor
    /// (unbalanced loop nesting, size mismatch, invalid stride).
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// No conversion routine exists for this primitive and peer pairing.
    #[error("unsupported conversion for {kind}: {reason}")]
    UnsupportedConversion { kind: PrimitiveKind, reason: String },

    /// `count` instances of the descriptor span more than the address space.
    #[error("repeat count {count} overflows the address space")]
    CountOverflow { count: usize },

    /// User memory is shorter than the region the descriptor touches.
    #[error("user buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// Operation does not match the direction the convertor was prepared for.
    #[error("convertor was prepared for {expected}")]
    WrongDirection { expected: Direction },

    /// Traversal stack grew past the depth computed at commit time.
    #[error("traversal stack overflow: depth {depth} exceeds capacity {capacity}")]
    StackOverflow { depth: usize, capacity: usize },

    /// Configuration rejected before any conversion started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor(reason.into())
    }
}
