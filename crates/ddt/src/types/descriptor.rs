// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Committed type descriptor.
//!
//! A descriptor is validated and summarized once, then never mutated. It is
//! shared by `Arc` across any number of convertors and threads.
//!
//! User memory layout: displacement `d` of instance `j` lives at buffer index
//! `origin + j * extent + d`, where `origin` shifts types that reach below
//! displacement zero so that the buffer starts at the lowest touched byte.

use super::element::{Element, PrimitiveRun};
use super::optimizer;
use super::primitive::PrimitiveKind;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Build request: a flat element stream plus optional declared summary
/// fields that are checked against the computed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TypeSpec {
    pub elements: Vec<Element>,
    pub size: Option<usize>,
    pub lower_bound: Option<isize>,
    pub upper_bound: Option<isize>,
}

impl TypeSpec {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }
}

/// Immutable flattened description of a structured memory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    elements: Vec<Element>,
    optimized: Vec<Element>,
    size: usize,
    lower_bound: isize,
    upper_bound: isize,
    true_lb: isize,
    true_ub: isize,
    max_depth: usize,
    element_total: usize,
    histogram: [usize; PrimitiveKind::COUNT],
    contiguous: bool,
}

impl Descriptor {
    /// Validate a build request and compute summary fields and the
    /// coalesced element list.
    pub fn build(spec: TypeSpec) -> Result<Self> {
        let tree = optimizer::parse(&spec.elements)?;
        let summary = optimizer::summarize(&tree)?;

        if let Some(declared) = spec.size {
            if declared != summary.size {
                return Err(Error::malformed(format!(
                    "declared size {} disagrees with {} computed from the elements",
                    declared, summary.size
                )));
            }
        }

        let (true_lb, true_ub) = summary.bounds.unwrap_or((0, 0));
        let lower_bound = spec.lower_bound.unwrap_or(true_lb);
        let upper_bound = spec.upper_bound.unwrap_or(true_ub);
        if upper_bound < lower_bound {
            return Err(Error::malformed(format!(
                "upper bound {} is below lower bound {}",
                upper_bound, lower_bound
            )));
        }
        let extent = upper_bound.checked_sub(lower_bound).ok_or_else(|| {
            Error::malformed(format!(
                "extent from {} to {} overflows the address space",
                lower_bound, upper_bound
            ))
        })?;
        if true_ub.checked_sub(true_lb).is_none() {
            return Err(Error::malformed(format!(
                "touched span from {} to {} overflows the address space",
                true_lb, true_ub
            )));
        }

        let coalesced = optimizer::optimize(&tree);
        let contiguous =
            summary.size > 0 && optimizer::dense_span(&coalesced) == Some((true_lb, summary.size));
        let optimized = optimizer::flatten(&coalesced);

        log::debug!(
            "[descriptor] committed {} elements ({} optimized), size {} extent {} depth {} contiguous {}",
            spec.elements.len(),
            optimized.len(),
            summary.size,
            extent,
            summary.depth,
            contiguous
        );

        Ok(Self {
            elements: spec.elements,
            optimized,
            size: summary.size,
            lower_bound,
            upper_bound,
            true_lb,
            true_ub,
            max_depth: summary.depth,
            element_total: summary.elements,
            histogram: summary.histogram,
            contiguous,
        })
    }

    /// [`Descriptor::build`] wrapped for sharing.
    pub fn commit(spec: TypeSpec) -> Result<Arc<Self>> {
        Self::build(spec).map(Arc::new)
    }

    /// Predefined descriptor for a single primitive.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        let run = Element::Primitive(PrimitiveRun::new(kind, 1, 0));
        let size = kind.size();
        let mut histogram = [0; PrimitiveKind::COUNT];
        histogram[kind.index()] = 1;
        Self {
            elements: vec![run],
            optimized: vec![run],
            size,
            lower_bound: 0,
            upper_bound: size as isize,
            true_lb: 0,
            true_ub: size as isize,
            max_depth: 0,
            element_total: 1,
            histogram,
            contiguous: true,
        }
    }

    /// Raw element stream, as committed.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Coalesced element stream producing the same packed bytes.
    pub fn optimized(&self) -> &[Element] {
        &self.optimized
    }

    /// Bytes one instance contributes to the packed stream.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance between successive instances.
    pub fn extent(&self) -> usize {
        (self.upper_bound - self.lower_bound) as usize
    }

    pub fn lower_bound(&self) -> isize {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> isize {
        self.upper_bound
    }

    /// Lowest displacement actually touched.
    pub fn true_lb(&self) -> isize {
        self.true_lb
    }

    /// One past the highest displacement actually touched.
    pub fn true_ub(&self) -> isize {
        self.true_ub
    }

    pub fn true_extent(&self) -> usize {
        (self.true_ub - self.true_lb) as usize
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_depth
    }

    /// Frames a convertor needs: every loop level, the repeat count and
    /// the in-flight element cursor.
    pub fn stack_capacity(&self) -> usize {
        self.max_depth + 2
    }

    /// One instance covers a single gap-free range, in stream order.
    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    /// Primitive elements in one instance.
    pub fn element_total(&self) -> usize {
        self.element_total
    }

    /// Primitive elements of one kind in one instance.
    pub fn kind_count(&self, kind: PrimitiveKind) -> usize {
        self.histogram[kind.index()]
    }

    /// Kinds that occur at least once.
    pub fn kinds(&self) -> impl Iterator<Item = PrimitiveKind> + '_ {
        PrimitiveKind::ALL
            .into_iter()
            .filter(move |kind| self.histogram[kind.index()] > 0)
    }

    /// Buffer index of displacement zero of the first instance.
    pub fn origin(&self) -> usize {
        if self.true_lb < 0 {
            self.true_lb.unsigned_abs()
        } else {
            0
        }
    }

    /// Bytes of user memory `count` instances touch, measured from the
    /// start of the buffer.
    pub fn required_len(&self, count: usize) -> Option<usize> {
        if count == 0 || self.size == 0 {
            return Some(0);
        }
        let last = (count - 1).checked_mul(self.extent())?;
        let top = usize::try_from(self.true_ub + self.origin() as isize).ok()?;
        last.checked_add(top)
    }

    /// Packed bytes for `count` instances.
    pub fn packed_size(&self, count: usize) -> Option<usize> {
        self.size.checked_mul(count)
    }

    /// Whole primitive elements contained in the first `bytes` of a packed
    /// stream of this type.
    pub fn element_count(&self, bytes: usize) -> usize {
        self.split_position(bytes).0
    }

    /// Whole elements before stream position `bytes`, and how many bytes
    /// of the following element precede that position.
    pub(crate) fn split_position(&self, bytes: usize) -> (usize, usize) {
        if self.size == 0 {
            return (0, 0);
        }
        let instances = bytes / self.size;
        let mut budget = bytes % self.size;
        let (partial, _) = count_prefix(&self.optimized, 0, self.optimized.len(), &mut budget);
        (instances * self.element_total + partial, budget)
    }

    /// Copy the bytes `count` instances touch from `src` to `dst`, both laid
    /// out with this descriptor. Gaps in `dst` are left untouched.
    pub fn copy_content(&self, count: usize, dst: &mut [u8], src: &[u8]) -> Result<()> {
        let need = self
            .required_len(count)
            .ok_or(Error::CountOverflow { count })?;
        for have in [dst.len(), src.len()] {
            if have < need {
                return Err(Error::BufferTooSmall { need, have });
            }
        }
        if self.contiguous && self.size == self.extent() {
            let start = (self.origin() as isize + self.true_lb) as usize;
            let len = self.size * count;
            dst[start..start + len].copy_from_slice(&src[start..start + len]);
            return Ok(());
        }

        let origin = self.origin() as isize;
        let mut pending: Option<(isize, usize)> = None;
        let mut flush = |seg: (isize, usize)| {
            let start = (origin + seg.0) as usize;
            dst[start..start + seg.1].copy_from_slice(&src[start..start + seg.1]);
        };
        for instance in 0..count {
            let base = (instance * self.extent()) as isize;
            visit_segments(&self.optimized, 0, self.optimized.len(), base, &mut |at: isize, len: usize| {
                pending = match pending {
                    Some((start, run)) if start + run as isize == at => Some((start, run + len)),
                    Some(seg) => {
                        flush(seg);
                        Some((at, len))
                    }
                    None => Some((at, len)),
                };
            });
        }
        if let Some(seg) = pending {
            flush(seg);
        }
        Ok(())
    }
}

/// Packed bytes and elements of the scope `start..end`.
fn scope_totals(elements: &[Element], start: usize, end: usize) -> (usize, usize) {
    let (mut bytes, mut count) = (0, 0);
    let mut index = start;
    while index < end {
        match &elements[index] {
            Element::Primitive(run) => {
                bytes += run.packed_size();
                count += run.count;
                index += 1;
            }
            Element::Loop(start_elem) => {
                let (b, c) = scope_totals(elements, index + 1, start_elem.end_index);
                bytes += b * start_elem.count;
                count += c * start_elem.count;
                index = start_elem.end_index;
            }
        }
    }
    (bytes, count)
}

/// Whole elements of `start..end` that fit in `budget` bytes; `budget` is
/// left holding the bytes of the element where counting stopped.
fn count_prefix(elements: &[Element], start: usize, end: usize, budget: &mut usize) -> (usize, bool) {
    let mut count = 0;
    let mut index = start;
    while index < end {
        match &elements[index] {
            Element::Primitive(run) => {
                let size = run.kind.size();
                let full = run.count.min(*budget / size);
                count += full;
                *budget -= full * size;
                if full < run.count {
                    return (count, true);
                }
                index += 1;
            }
            Element::Loop(start_elem) => {
                let (bytes, elems) = scope_totals(elements, index + 1, start_elem.end_index);
                if bytes > 0 {
                    let iterations = start_elem.count.min(*budget / bytes);
                    count += iterations * elems;
                    *budget -= iterations * bytes;
                    if iterations < start_elem.count {
                        let (partial, _) =
                            count_prefix(elements, index + 1, start_elem.end_index, budget);
                        return (count + partial, true);
                    }
                }
                index = start_elem.end_index;
            }
        }
    }
    (count, false)
}

/// Report every touched byte range of `start..end` in stream order.
fn visit_segments(
    elements: &[Element],
    start: usize,
    end: usize,
    base: isize,
    sink: &mut dyn FnMut(isize, usize),
) {
    let mut index = start;
    while index < end {
        match &elements[index] {
            Element::Primitive(run) => {
                if run.is_dense() {
                    sink(base + run.disp, run.packed_size());
                } else {
                    for i in 0..run.count {
                        sink(base + run.disp + (i * run.extent) as isize, run.kind.size());
                    }
                }
                index += 1;
            }
            Element::Loop(start_elem) => {
                for i in 0..start_elem.count {
                    let iteration = base + (i * start_elem.body_extent) as isize;
                    visit_segments(elements, index + 1, start_elem.end_index, iteration, sink);
                }
                index = start_elem.end_index;
            }
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "size {} extent {} bounds [{}, {}) true [{}, {}) depth {} contiguous {}",
            self.size,
            self.extent(),
            self.lower_bound,
            self.upper_bound,
            self.true_lb,
            self.true_ub,
            self.max_depth,
            if self.contiguous { "yes" } else { "no" }
        )?;
        writeln!(f, "raw ({} elements):", self.elements.len())?;
        for (i, elem) in self.elements.iter().enumerate() {
            writeln!(f, "  {:>4}: {}", i, elem)?;
        }
        writeln!(f, "optimized ({} elements):", self.optimized.len())?;
        for (i, elem) in self.optimized.iter().enumerate() {
            writeln!(f, "  {:>4}: {}", i, elem)?;
        }
        Ok(())
    }
}
