// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder for descriptor element streams.

use super::descriptor::{Descriptor, TypeSpec};
use super::element::{Element, LoopStart, PrimitiveRun};
use super::primitive::PrimitiveKind;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Builds the flat element stream, resolving loop end indices.
///
/// Nesting mistakes are recorded and reported by [`DescriptorBuilder::spec`]
/// so the chain stays infallible.
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    elements: Vec<Element>,
    open_loops: Vec<usize>,
    lower_bound: Option<isize>,
    upper_bound: Option<isize>,
    size: Option<usize>,
    error: Option<Error>,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dense run of `count` primitives starting at `disp`.
    pub fn primitive(mut self, kind: PrimitiveKind, count: usize, disp: isize) -> Self {
        self.elements
            .push(Element::Primitive(PrimitiveRun::new(kind, count, disp)));
        self
    }

    /// Add a run whose primitives are `extent` bytes apart.
    pub fn strided(mut self, kind: PrimitiveKind, count: usize, extent: usize, disp: isize) -> Self {
        self.elements.push(Element::Primitive(PrimitiveRun::strided(
            kind, count, extent, disp,
        )));
        self
    }

    /// Open a loop repeating the following elements `count` times, each
    /// iteration shifted by `body_extent` bytes.
    pub fn begin_loop(mut self, count: usize, body_extent: usize) -> Self {
        self.open_loops.push(self.elements.len());
        self.elements.push(Element::Loop(LoopStart {
            count,
            body_extent,
            end_index: 0,
        }));
        self
    }

    /// Close the innermost open loop.
    pub fn end_loop(mut self) -> Self {
        let end_index = self.elements.len();
        match self.open_loops.pop() {
            Some(at) => {
                if let Element::Loop(start) = &mut self.elements[at] {
                    start.end_index = end_index;
                }
            }
            None => {
                self.error.get_or_insert_with(|| {
                    Error::malformed(format!("end_loop at {} without an open loop", end_index))
                });
            }
        }
        self
    }

    /// Explicit bounds (otherwise the touched span is used).
    pub fn bounds(mut self, lower: isize, upper: isize) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Declared packed size, checked at build time.
    pub fn declared_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Finish the element stream.
    pub fn spec(self) -> Result<TypeSpec> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(at) = self.open_loops.last() {
            return Err(Error::malformed(format!(
                "loop opened at {} is never closed",
                at
            )));
        }
        Ok(TypeSpec {
            elements: self.elements,
            size: self.size,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
        })
    }

    pub fn build(self) -> Result<Descriptor> {
        Descriptor::build(self.spec()?)
    }

    pub fn commit(self) -> Result<Arc<Descriptor>> {
        Descriptor::commit(self.spec()?)
    }

    /// `n` consecutive primitives.
    pub fn contiguous(kind: PrimitiveKind, n: usize) -> Self {
        Self::new().primitive(kind, n, 0)
    }

    /// `count` blocks of `blocklen` primitives, block starts `stride`
    /// primitives apart. The extent ends right after the last block.
    pub fn vector(kind: PrimitiveKind, count: usize, blocklen: usize, stride: usize) -> Self {
        let size = kind.size();
        let upper = if count == 0 {
            0
        } else {
            ((count - 1) * stride + blocklen) * size
        };
        Self::new()
            .begin_loop(count, stride * size)
            .primitive(kind, blocklen, 0)
            .end_loop()
            .bounds(0, upper as isize)
    }
}
