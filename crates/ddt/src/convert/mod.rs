// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pack/unpack engine.
//!
//! A [`Convertor`] drives one operation in one [`Direction`] across any
//! number of calls, each bounded by the wire buffers the caller supplies.
//! Every call returns a [`Progress`]; `Pending` and `ShortSourceData` mean
//! "call again with more buffer", never "start over".

mod convertor;
mod pack;
mod stack;
mod table;
mod traverse;
mod unpack;

pub use convertor::Convertor;
pub use stack::{Frame, TraversalStack};
pub use table::{ConversionEntry, ConversionFn, ConversionTable, Converted};

use std::fmt;

/// Which side of the operation user memory is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// User memory to byte stream.
    Pack,
    /// Byte stream to user memory.
    Unpack,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Pack => write!(f, "pack"),
            Direction::Unpack => write!(f, "unpack"),
        }
    }
}

/// Outcome of one pack/unpack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Every instance has been converted.
    Complete,
    /// Wire buffers ran out; call again to continue.
    Pending,
    /// Unpack input ran out inside an instance. Whole elements that fit
    /// were converted and the rest is resumable.
    ShortSourceData,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Complete => write!(f, "complete"),
            Status::Pending => write!(f, "pending"),
            Status::ShortSourceData => write!(f, "short source data"),
        }
    }
}

/// Work done by one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Primitive elements completed during this call.
    pub elements: usize,
    /// Wire bytes written (pack) or consumed (unpack) during this call.
    pub bytes: usize,
    pub status: Status,
}

impl Progress {
    pub(crate) fn idle() -> Self {
        Self {
            elements: 0,
            bytes: 0,
            status: Status::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }
}
