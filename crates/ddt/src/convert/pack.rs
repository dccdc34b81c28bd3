// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pack: user memory to wire buffers.

use super::convertor::{element_list, Convertor, UserMemory};
use super::table::{ConversionFn, Converted};
use super::traverse::{drive, Side, Staged, Walk};
use super::{Direction, Progress};
use crate::error::Result;
use crate::iov::IovWriter;
use std::io::IoSliceMut;

struct PackSide<'m, 'w, 'i, 'b> {
    src: &'m [u8],
    wire: &'w mut IovWriter<'i, 'b>,
}

impl Side for PackSide<'_, '_, '_, '_> {
    fn wire_exhausted(&mut self) -> bool {
        self.wire.is_exhausted()
    }

    fn transfer(
        &mut self,
        f: ConversionFn,
        size: usize,
        at: usize,
        extent: usize,
        count: usize,
    ) -> Converted {
        let Some(chunk) = self.wire.chunk_mut() else {
            return Converted::default();
        };
        let done = f(count, &self.src[at..], extent, chunk, size);
        self.wire.advance(done.bytes);
        done
    }

    fn stage_begin(&mut self, f: ConversionFn, at: usize, staged: &mut Staged) {
        let size = staged.size;
        f(1, &self.src[at..], size, &mut staged.buf[..size], size);
        staged.len = 0;
    }

    fn stage_move(&mut self, staged: &mut Staged) {
        let (len, size) = (staged.len, staged.size);
        staged.len += self.wire.write_bytes(&staged.buf[len..size]);
    }

    fn stage_end(&mut self, _f: ConversionFn, _at: usize, _staged: &Staged) {}
}

impl<'a> Convertor<'a> {
    /// Fill `iov` with the next packed bytes.
    ///
    /// Returns `Pending` when the buffers filled up before the end of the
    /// operation; call again with fresh buffers to continue. Calls after
    /// `Complete` convert nothing.
    pub fn pack(&mut self, iov: &mut [IoSliceMut<'_>]) -> Result<Progress> {
        let UserMemory::Source(src) = self.memory else {
            return Err(self.wrong_direction());
        };
        if self.is_complete() {
            return Ok(Progress::idle());
        }

        let mut wire = IovWriter::new(iov);
        if self.fast {
            let start = self.bytes;
            let mut p = start;
            while p < self.packed_size() {
                let Some(chunk) = wire.chunk_mut() else {
                    break;
                };
                let (at, len) = self.layout.span(p, chunk.len());
                chunk[..len].copy_from_slice(&src[at..at + len]);
                wire.advance(len);
                p += len;
            }
            let status = self.layout.status(p, Direction::Pack);
            let elements = self.elements_between(start, p);
            return Ok(self.finish(p - start, elements, status));
        }

        let walk = Walk {
            elements: element_list(&self.descriptor, &self.config),
            plan: &self.plan,
            origin: self.descriptor.origin() as isize,
            instance_extent: self.descriptor.extent(),
        };
        let mut side = PackSide {
            src,
            wire: &mut wire,
        };
        let step = drive(&walk, &mut self.stack, &mut self.staged, &mut side)?;
        let bytes = wire.consumed();
        Ok(self.finish(bytes, step.elements, step.status))
    }

    /// Next region of user memory the transport may send as-is, at most
    /// `max` bytes, advancing the convertor past it.
    ///
    /// `None` when the operation is not a contiguous, non-converting pack.
    /// An empty slice once the operation is complete.
    pub fn send_window(&mut self, max: usize) -> Option<&'a [u8]> {
        let UserMemory::Source(src) = self.memory else {
            return None;
        };
        if !self.fast {
            return None;
        }
        if self.is_complete() || max == 0 {
            return Some(&src[..0]);
        }
        let start = self.bytes;
        let (at, len) = self.layout.span(start, max);
        let status = self.layout.status(start + len, Direction::Pack);
        let elements = self.elements_between(start, start + len);
        self.finish(len, elements, status);
        Some(&src[at..at + len])
    }
}
