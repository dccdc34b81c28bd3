// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Elements of the flat descriptor stream.

use super::primitive::PrimitiveKind;
use std::fmt;

/// A run of `count` primitives, each `extent` bytes after the previous one,
/// the first at `disp` bytes from the start of the current iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveRun {
    pub kind: PrimitiveKind,
    pub count: usize,
    pub extent: usize,
    pub disp: isize,
}

impl PrimitiveRun {
    /// Dense run: consecutive primitives with no padding between them.
    #[must_use]
    pub const fn new(kind: PrimitiveKind, count: usize, disp: isize) -> Self {
        Self {
            kind,
            count,
            extent: kind.size(),
            disp,
        }
    }

    /// Strided run: each primitive starts `extent` bytes after the previous one.
    #[must_use]
    pub const fn strided(kind: PrimitiveKind, count: usize, extent: usize, disp: isize) -> Self {
        Self {
            kind,
            count,
            extent,
            disp,
        }
    }

    /// Bytes this run contributes to the packed stream.
    #[must_use]
    pub const fn packed_size(&self) -> usize {
        self.count * self.kind.size()
    }

    /// True when the run covers one gap-free byte range.
    #[must_use]
    pub const fn is_dense(&self) -> bool {
        self.count <= 1 || self.extent == self.kind.size()
    }

    /// Offset one past the last touched byte (relative to the scope), or
    /// `None` when it does not fit in an `isize`.
    pub(crate) fn end(&self) -> Option<isize> {
        if self.count == 0 {
            return Some(self.disp);
        }
        let span = (self.count - 1)
            .checked_mul(self.extent)?
            .checked_add(self.kind.size())?;
        self.disp.checked_add(isize::try_from(span).ok()?)
    }

    /// Offset the walk reaches after stepping over every primitive.
    pub(crate) fn stride_end(&self) -> Option<isize> {
        let span = self.count.checked_mul(self.extent)?;
        self.disp.checked_add(isize::try_from(span).ok()?)
    }
}

/// Opens a loop whose body spans the elements up to `end_index` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopStart {
    pub count: usize,
    pub body_extent: usize,
    pub end_index: usize,
}

/// One entry of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Element {
    Primitive(PrimitiveRun),
    Loop(LoopStart),
}

impl Element {
    #[must_use]
    pub fn as_primitive(&self) -> Option<&PrimitiveRun> {
        match self {
            Element::Primitive(run) => Some(run),
            Element::Loop(_) => None,
        }
    }

    #[must_use]
    pub fn as_loop(&self) -> Option<&LoopStart> {
        match self {
            Element::Loop(start) => Some(start),
            Element::Primitive(_) => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Primitive(run) => write!(
                f,
                "{:<14} count {:<6} extent {:<6} disp {}",
                run.kind.name(),
                run.count,
                run.extent,
                run.disp
            ),
            Element::Loop(start) => write!(
                f,
                "{:<14} count {:<6} extent {:<6} end {}",
                "loop", start.count, start.body_extent, start.end_index
            ),
        }
    }
}
