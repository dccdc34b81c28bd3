// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scatter/gather cursors over caller-owned wire buffers.
//!
//! Both cursors walk an `iovec` list front to back, skipping empty entries.
//! They are borrowed for one convertor call and never retained.

use std::io::{IoSlice, IoSliceMut};

/// Generate the position bookkeeping shared by both cursors.
macro_rules! impl_iov_common {
    () => {
        /// Bytes moved through this cursor so far.
        pub fn consumed(&self) -> usize {
            self.consumed
        }

        /// Bytes left across the current and all following buffers.
        pub fn remaining(&self) -> usize {
            self.iov
                .iter()
                .skip(self.index)
                .map(|buf| buf.len())
                .sum::<usize>()
                .saturating_sub(self.offset)
        }

        /// True when no buffer has room left.
        pub fn is_exhausted(&mut self) -> bool {
            self.settle();
            self.index >= self.iov.len()
        }

        /// Mark `n` bytes of the current buffer as used.
        ///
        /// `n` is clamped to what the current buffer still holds.
        pub fn advance(&mut self, n: usize) {
            self.settle();
            if let Some(buf) = self.iov.get(self.index) {
                let step = n.min(buf.len() - self.offset);
                self.offset += step;
                self.consumed += step;
            }
        }

        /// Move past buffers that are fully used or empty.
        fn settle(&mut self) {
            while let Some(buf) = self.iov.get(self.index) {
                if self.offset < buf.len() {
                    break;
                }
                self.index += 1;
                self.offset = 0;
            }
        }
    };
}

/// Write cursor over a destination buffer list (pack side).
pub struct IovWriter<'a, 'b> {
    iov: &'a mut [IoSliceMut<'b>],
    index: usize,
    offset: usize,
    consumed: usize,
}

impl<'a, 'b> IovWriter<'a, 'b> {
    pub fn new(iov: &'a mut [IoSliceMut<'b>]) -> Self {
        Self {
            iov,
            index: 0,
            offset: 0,
            consumed: 0,
        }
    }

    impl_iov_common!();

    /// Unused tail of the current buffer, or `None` when exhausted.
    pub fn chunk_mut(&mut self) -> Option<&mut [u8]> {
        self.settle();
        let offset = self.offset;
        self.iov.get_mut(self.index).map(|buf| &mut buf[offset..])
    }

    /// Copy as much of `data` as fits, crossing buffer boundaries.
    /// Returns the number of bytes written.
    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        while written < data.len() {
            let Some(chunk) = self.chunk_mut() else {
                break;
            };
            let n = chunk.len().min(data.len() - written);
            chunk[..n].copy_from_slice(&data[written..written + n]);
            self.advance(n);
            written += n;
        }
        written
    }
}

/// Read cursor over a source buffer list (unpack side).
pub struct IovReader<'a, 'b> {
    iov: &'a [IoSlice<'b>],
    index: usize,
    offset: usize,
    consumed: usize,
}

impl<'a, 'b> IovReader<'a, 'b> {
    pub fn new(iov: &'a [IoSlice<'b>]) -> Self {
        Self {
            iov,
            index: 0,
            offset: 0,
            consumed: 0,
        }
    }

    impl_iov_common!();

    /// Unread tail of the current buffer, or `None` when exhausted.
    pub fn chunk(&mut self) -> Option<&'a [u8]> {
        self.settle();
        let iov: &'a [IoSlice<'b>] = self.iov;
        iov.get(self.index).map(|buf| &buf[self.offset..])
    }

    /// Fill as much of `out` as the buffers allow, crossing buffer
    /// boundaries. Returns the number of bytes read.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let mut read = 0;
        while read < out.len() {
            let Some(chunk) = self.chunk() else {
                break;
            };
            let n = chunk.len().min(out.len() - read);
            out[read..read + n].copy_from_slice(&chunk[..n]);
            self.advance(n);
            read += n;
        }
        read
    }
}
