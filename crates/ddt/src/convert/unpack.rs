// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unpack: wire buffers to user memory.

use super::convertor::{element_list, Convertor, UserMemory};
use super::table::{ConversionFn, Converted};
use super::traverse::{drive, Side, Staged, Walk};
use super::{Direction, Progress, Status};
use crate::error::Result;
use crate::iov::IovReader;
use std::io::IoSlice;

struct UnpackSide<'m, 'r, 'i, 'b> {
    dst: &'m mut [u8],
    wire: &'r mut IovReader<'i, 'b>,
}

impl Side for UnpackSide<'_, '_, '_, '_> {
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
        let Some(chunk) = self.wire.chunk() else {
            return Converted::default();
        };
        let done = f(count, chunk, size, &mut self.dst[at..], extent);
        self.wire.advance(done.bytes);
        done
    }

    fn stage_begin(&mut self, _f: ConversionFn, _at: usize, staged: &mut Staged) {
        staged.len = 0;
    }

    fn stage_move(&mut self, staged: &mut Staged) {
        let (len, size) = (staged.len, staged.size);
        staged.len += self.wire.read_into(&mut staged.buf[len..size]);
    }

    fn stage_end(&mut self, f: ConversionFn, at: usize, staged: &Staged) {
        let size = staged.size;
        f(1, &staged.buf[..size], size, &mut self.dst[at..], size);
    }
}

impl<'a> Convertor<'a> {
    /// Consume the next packed bytes from `iov` into user memory.
    ///
    /// Bytes past the end of the operation are never read. `Pending` means
    /// the input ended on an instance boundary, `ShortSourceData` that it
    /// ended inside an instance; both resume on the next call. The status
    /// depends only on the stream position, never on the path taken.
    pub fn unpack(&mut self, iov: &[IoSlice<'_>]) -> Result<Progress> {
        if self.direction() != Direction::Unpack {
            return Err(self.wrong_direction());
        }
        if self.is_complete() {
            return Ok(Progress::idle());
        }

        let mut wire = IovReader::new(iov);
        if self.fast {
            let start = self.bytes;
            let total = self.packed_size();
            let layout = self.layout;
            let UserMemory::Destination(dst) = &mut self.memory else {
                return Err(Self::unpack_only());
            };
            let mut p = start;
            while p < total {
                let Some(chunk) = wire.chunk() else {
                    break;
                };
                let (at, len) = layout.span(p, chunk.len());
                dst[at..at + len].copy_from_slice(&chunk[..len]);
                wire.advance(len);
                p += len;
            }
            let status = layout.status(p, Direction::Unpack);
            let elements = self.elements_between(start, p);
            return Ok(self.finish(p - start, elements, status));
        }

        let walk = Walk {
            elements: element_list(&self.descriptor, &self.config),
            plan: &self.plan,
            origin: self.descriptor.origin() as isize,
            instance_extent: self.descriptor.extent(),
        };
        let UserMemory::Destination(dst) = &mut self.memory else {
            return Err(Self::unpack_only());
        };
        let mut side = UnpackSide {
            dst: &mut dst[..],
            wire: &mut wire,
        };
        let step = drive(&walk, &mut self.stack, &mut self.staged, &mut side)?;
        let bytes = wire.consumed();
        let status = match step.status {
            Status::Complete => Status::Complete,
            _ => self.layout.status(self.bytes + bytes, Direction::Unpack),
        };
        Ok(self.finish(bytes, step.elements, status))
    }

    /// Next region of user memory the transport may receive into directly,
    /// at most `max` bytes. The convertor counts the region as converted.
    ///
    /// `None` when the operation is not a contiguous, non-converting unpack.
    /// An empty slice once the operation is complete.
    pub fn recv_window(&mut self, max: usize) -> Option<&mut [u8]> {
        if self.direction() != Direction::Unpack || !self.fast {
            return None;
        }
        let (at, len) = if self.is_complete() || max == 0 {
            (0, 0)
        } else {
            let start = self.bytes;
            let (at, len) = self.layout.span(start, max);
            let status = self.layout.status(start + len, Direction::Unpack);
            let elements = self.elements_between(start, start + len);
            self.finish(len, elements, status);
            (at, len)
        };
        match &mut self.memory {
            UserMemory::Destination(dst) => Some(&mut dst[at..at + len]),
            UserMemory::Source(_) => None,
        }
    }

    fn unpack_only() -> crate::Error {
        crate::Error::WrongDirection {
            expected: Direction::Pack,
        }
    }
}
