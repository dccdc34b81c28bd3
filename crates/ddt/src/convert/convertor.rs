// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Convertor state and preparation.

use super::stack::{Frame, TraversalStack};
use super::table::ConversionPlan;
use super::traverse::Staged;
use super::{Direction, Progress, Status};
use crate::config::ConvertorConfig;
use crate::error::{Error, Result};
use crate::types::{Descriptor, Element};
use std::fmt;
use std::sync::Arc;

/// User memory borrowed for the lifetime of the operation.
pub(crate) enum UserMemory<'a> {
    Source(&'a [u8]),
    Destination(&'a mut [u8]),
}

/// Mapping from packed stream positions to user memory for contiguous
/// types: instance `p / size`, offset `p % size`. Every path takes its
/// suspension status from here.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FastLayout {
    base: usize,
    size: usize,
    extent: usize,
    total: usize,
}

impl FastLayout {
    fn new(descriptor: &Descriptor, total: usize) -> Self {
        Self {
            base: (descriptor.origin() as isize + descriptor.true_lb()) as usize,
            size: descriptor.size(),
            extent: descriptor.extent(),
            total,
        }
    }

    /// Longest run of user memory starting at stream position `p`, capped
    /// at `max` bytes: `(buffer index, length)`.
    pub(crate) fn span(&self, p: usize, max: usize) -> (usize, usize) {
        let remaining = self.total - p;
        let (instance, offset) = (p / self.size, p % self.size);
        let start = self.base + instance * self.extent + offset;
        let len = if self.size == self.extent {
            max.min(remaining)
        } else {
            max.min(self.size - offset)
        };
        (start, len)
    }

    /// Status after stopping at stream position `p`.
    pub(crate) fn status(&self, p: usize, direction: Direction) -> Status {
        if p == self.total {
            Status::Complete
        } else if direction == Direction::Unpack && p % self.size != 0 {
            Status::ShortSourceData
        } else {
            Status::Pending
        }
    }
}

/// Stateful engine for one pack or unpack operation.
///
/// The descriptor is shared; the traversal stack is owned and sized once;
/// user memory is borrowed for `'a`; wire buffers are borrowed per call.
pub struct Convertor<'a> {
    pub(crate) descriptor: Arc<Descriptor>,
    pub(crate) memory: UserMemory<'a>,
    pub(crate) config: ConvertorConfig,
    pub(crate) plan: ConversionPlan,
    pub(crate) stack: TraversalStack,
    pub(crate) staged: Option<Staged>,
    pub(crate) layout: FastLayout,
    pub(crate) fast: bool,
    count: usize,
    packed_size: usize,
    pub(crate) bytes: usize,
    elements: usize,
    complete: bool,
}

impl<'a> Convertor<'a> {
    /// Prepare a pack of `count` instances read from `src`.
    pub fn for_pack(descriptor: Arc<Descriptor>, count: usize, src: &'a [u8]) -> Result<Self> {
        Self::for_pack_with(descriptor, count, src, ConvertorConfig::default())
    }

    pub fn for_pack_with(
        descriptor: Arc<Descriptor>,
        count: usize,
        src: &'a [u8],
        config: ConvertorConfig,
    ) -> Result<Self> {
        Self::prepare(descriptor, count, UserMemory::Source(src), config)
    }

    /// Prepare an unpack of `count` instances written into `dst`.
    pub fn for_unpack(
        descriptor: Arc<Descriptor>,
        count: usize,
        dst: &'a mut [u8],
    ) -> Result<Self> {
        Self::for_unpack_with(descriptor, count, dst, ConvertorConfig::default())
    }

    pub fn for_unpack_with(
        descriptor: Arc<Descriptor>,
        count: usize,
        dst: &'a mut [u8],
        config: ConvertorConfig,
    ) -> Result<Self> {
        Self::prepare(descriptor, count, UserMemory::Destination(dst), config)
    }

    fn prepare(
        descriptor: Arc<Descriptor>,
        count: usize,
        memory: UserMemory<'a>,
        config: ConvertorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let have = match &memory {
            UserMemory::Source(src) => src.len(),
            UserMemory::Destination(dst) => dst.len(),
        };
        let (need, packed_size) = descriptor
            .required_len(count)
            .zip(descriptor.packed_size(count))
            .ok_or(Error::CountOverflow { count })?;
        if have < need {
            return Err(Error::BufferTooSmall { need, have });
        }

        let plan = ConversionPlan::new(&descriptor, &config.remote)?;
        let fast =
            descriptor.is_contiguous() && !plan.is_converting() && !config.force_general_path;

        let mut stack = TraversalStack::with_capacity(descriptor.stack_capacity());
        let complete = packed_size == 0;
        if !complete {
            let end = element_list(&descriptor, &config).len();
            stack.push(Frame::top_level(count, end))?;
        }

        let convertor = Self {
            layout: FastLayout::new(&descriptor, packed_size),
            descriptor,
            memory,
            config,
            plan,
            stack,
            staged: None,
            fast,
            count,
            packed_size,
            bytes: 0,
            elements: 0,
            complete,
        };
        log::debug!(
            "[convertor] prepared {} of {} x {} bytes ({} path{})",
            convertor.direction(),
            count,
            convertor.descriptor.size(),
            if fast { "fast" } else { "general" },
            if convertor.plan.is_converting() {
                ", converting"
            } else {
                ""
            }
        );
        Ok(convertor)
    }

    pub fn direction(&self) -> Direction {
        match self.memory {
            UserMemory::Source(_) => Direction::Pack,
            UserMemory::Destination(_) => Direction::Unpack,
        }
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    pub fn config(&self) -> &ConvertorConfig {
        &self.config
    }

    /// Instances being converted.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Total bytes of the packed stream (`count * size`).
    pub fn packed_size(&self) -> usize {
        self.packed_size
    }

    /// Wire bytes moved so far.
    pub fn bytes_converted(&self) -> usize {
        self.bytes
    }

    /// Primitive elements completed so far.
    pub fn elements_converted(&self) -> usize {
        self.elements
    }

    pub fn remaining_bytes(&self) -> usize {
        self.packed_size - self.bytes
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// False when user memory can be handed to the transport directly
    /// through [`Convertor::send_window`] / [`Convertor::recv_window`].
    pub fn need_buffers(&self) -> bool {
        !self.fast
    }

    /// Traversal state, as left by the last call.
    pub fn stack(&self) -> &TraversalStack {
        &self.stack
    }

    pub(crate) fn wrong_direction(&self) -> Error {
        Error::WrongDirection {
            expected: self.direction(),
        }
    }

    /// Elements completed between two stream positions of the fast path.
    pub(crate) fn elements_between(&self, from: usize, to: usize) -> usize {
        self.descriptor.element_count(to) - self.descriptor.element_count(from)
    }

    /// Record one call's work.
    pub(crate) fn finish(&mut self, bytes: usize, elements: usize, status: Status) -> Progress {
        self.bytes += bytes;
        self.elements += elements;
        if status == Status::Complete {
            self.complete = true;
            self.stack.clear();
        }
        log::trace!(
            "[convertor] {} moved {} bytes, {} elements: {} ({}/{})",
            self.direction(),
            bytes,
            elements,
            status,
            self.bytes,
            self.packed_size
        );
        if status != Status::Complete && !self.fast {
            self.stack.dump("suspended");
        }
        Progress {
            elements,
            bytes,
            status,
        }
    }
}

/// Element list a convertor walks.
pub(crate) fn element_list<'d>(descriptor: &'d Descriptor, config: &ConvertorConfig) -> &'d [Element] {
    if config.use_optimized {
        descriptor.optimized()
    } else {
        descriptor.elements()
    }
}

impl fmt::Debug for Convertor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convertor")
            .field("direction", &self.direction())
            .field("count", &self.count)
            .field("packed_size", &self.packed_size)
            .field("bytes", &self.bytes)
            .field("elements", &self.elements)
            .field("fast", &self.fast)
            .field("complete", &self.complete)
            .field("stack", &self.stack.frames())
            .finish()
    }
}
