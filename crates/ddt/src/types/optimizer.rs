// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout tree, commit-time validation and the coalescing optimizer.
//!
//! The flat element stream is parsed once into a tree at commit time. The
//! tree is only used to validate nesting, compute summary fields and derive
//! the coalesced element list; convertors walk the flat lists.
//!
//! Coalescing rules (all preserve stream order and primitive kinds, so the
//! packed bytes and the element count are unchanged):
//! - zero-count runs and loops, and loops with empty bodies, are dropped;
//! - single-iteration loops are replaced by their body;
//! - a loop around one single-element run becomes a strided run;
//! - a loop around one dense run that tiles the loop extent becomes a
//!   longer dense run;
//! - adjacent runs of the same kind sharing a stride are merged.

use super::element::{Element, LoopStart, PrimitiveRun};
use super::primitive::PrimitiveKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Run(PrimitiveRun),
    Loop {
        count: usize,
        body_extent: usize,
        body: Vec<Node>,
    },
}

/// Parse the flat stream, rejecting unbalanced nesting and invalid runs.
pub(crate) fn parse(elements: &[Element]) -> Result<Vec<Node>> {
    parse_scope(elements, 0, elements.len())
}

fn parse_scope(elements: &[Element], start: usize, end: usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut index = start;
    while index < end {
        match elements[index] {
            Element::Primitive(run) => {
                if run.count > 1 && run.extent < run.kind.size() {
                    return Err(Error::malformed(format!(
                        "primitive run at {} has extent {} below the {} width {}",
                        index,
                        run.extent,
                        run.kind,
                        run.kind.size()
                    )));
                }
                nodes.push(Node::Run(run));
                index += 1;
            }
            Element::Loop(start_elem) => {
                if start_elem.end_index <= index || start_elem.end_index > end {
                    return Err(Error::malformed(format!(
                        "loop at {} ends at {}, outside enclosing scope {}..{}",
                        index, start_elem.end_index, start, end
                    )));
                }
                let body = parse_scope(elements, index + 1, start_elem.end_index)?;
                nodes.push(Node::Loop {
                    count: start_elem.count,
                    body_extent: start_elem.body_extent,
                    body,
                });
                index = start_elem.end_index;
            }
        }
    }
    Ok(nodes)
}

/// Summary fields computed by walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub size: usize,
    pub elements: usize,
    pub histogram: [usize; PrimitiveKind::COUNT],
    pub bounds: Option<(isize, isize)>,
    pub depth: usize,
}

impl Summary {
    fn empty() -> Self {
        Self {
            size: 0,
            elements: 0,
            histogram: [0; PrimitiveKind::COUNT],
            bounds: None,
            depth: 0,
        }
    }
}

fn overflow() -> Error {
    Error::malformed("descriptor size overflows the address space")
}

fn widen(bounds: Option<(isize, isize)>, lo: isize, hi: isize) -> Option<(isize, isize)> {
    Some(match bounds {
        Some((a, b)) => (a.min(lo), b.max(hi)),
        None => (lo, hi),
    })
}

pub(crate) fn summarize(nodes: &[Node]) -> Result<Summary> {
    let mut summary = Summary::empty();
    for node in nodes {
        match node {
            Node::Run(run) => {
                summary.size = run
                    .count
                    .checked_mul(run.kind.size())
                    .and_then(|bytes| summary.size.checked_add(bytes))
                    .ok_or_else(overflow)?;
                summary.elements = summary.elements.checked_add(run.count).ok_or_else(overflow)?;
                summary.histogram[run.kind.index()] += run.count;
                // the walk steps past the last primitive, so that offset must fit too
                run.stride_end().ok_or_else(overflow)?;
                if run.count > 0 {
                    let end = run.end().ok_or_else(overflow)?;
                    summary.bounds = widen(summary.bounds, run.disp, end);
                }
            }
            Node::Loop {
                count,
                body_extent,
                body,
            } => {
                let inner = summarize(body)?;
                let size = inner.size.checked_mul(*count).ok_or_else(overflow)?;
                let elements = inner.elements.checked_mul(*count).ok_or_else(overflow)?;
                summary.size = summary.size.checked_add(size).ok_or_else(overflow)?;
                summary.elements = summary.elements.checked_add(elements).ok_or_else(overflow)?;
                for (slot, n) in summary.histogram.iter_mut().zip(inner.histogram) {
                    *slot += n * count;
                }
                summary.depth = summary.depth.max(inner.depth + 1);
                if let (Some((lo, hi)), true) = (inner.bounds, *count > 0) {
                    let reach = (count - 1)
                        .checked_mul(*body_extent)
                        .and_then(|r| isize::try_from(r).ok())
                        .ok_or_else(overflow)?;
                    let hi = hi.checked_add(reach).ok_or_else(overflow)?;
                    // a loop collapsed into a strided run steps one body past its end
                    isize::try_from(*body_extent)
                        .ok()
                        .and_then(|step| hi.checked_add(step))
                        .ok_or_else(overflow)?;
                    summary.bounds = widen(summary.bounds, lo, hi);
                }
            }
        }
    }
    Ok(summary)
}

/// Start and length of the single gap-free range the nodes touch, in
/// stream order, or `None` when they leave gaps or go backwards.
pub(crate) fn dense_span(nodes: &[Node]) -> Option<(isize, usize)> {
    let mut span: Option<(isize, usize)> = None;
    for node in nodes {
        let piece = match node {
            Node::Run(run) if run.count == 0 => continue,
            Node::Run(run) if run.is_dense() => (run.disp, run.packed_size()),
            Node::Run(_) => return None,
            Node::Loop { count: 0, .. } => continue,
            Node::Loop {
                count,
                body_extent,
                body,
            } => match dense_span(body) {
                Some((start, len)) if len == *body_extent || *count == 1 => (start, len * count),
                None if body.is_empty() => continue,
                _ => return None,
            },
        };
        span = match span {
            None => Some(piece),
            Some((start, len)) if start + len as isize == piece.0 => Some((start, len + piece.1)),
            Some(_) => return None,
        };
    }
    span
}

/// Coalesce the tree.
pub(crate) fn optimize(nodes: &[Node]) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Run(run) if run.count == 0 => {}
            Node::Run(run) => push_merged(&mut out, Node::Run(normalize(*run))),
            Node::Loop {
                count,
                body_extent,
                body,
            } => {
                if *count == 0 {
                    continue;
                }
                let body = optimize(body);
                if body.is_empty() {
                    continue;
                }
                if *count == 1 {
                    for inner in body {
                        push_merged(&mut out, inner);
                    }
                    continue;
                }
                push_merged(&mut out, collapse_loop(*count, *body_extent, body));
            }
        }
    }
    out
}

fn normalize(mut run: PrimitiveRun) -> PrimitiveRun {
    if run.count == 1 {
        run.extent = run.kind.size();
    }
    run
}

fn collapse_loop(count: usize, body_extent: usize, body: Vec<Node>) -> Node {
    if let [Node::Run(run)] = body.as_slice() {
        let size = run.kind.size();
        if run.count == 1 && body_extent >= size {
            return Node::Run(PrimitiveRun::strided(run.kind, count, body_extent, run.disp));
        }
        if run.extent == size && body_extent == run.count * size {
            return Node::Run(PrimitiveRun::new(run.kind, run.count * count, run.disp));
        }
    }
    Node::Loop {
        count,
        body_extent,
        body,
    }
}

fn push_merged(out: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Run(last)), Node::Run(next)) = (out.last_mut(), &node) {
        if let Some(merged) = merge_runs(last, next) {
            *last = merged;
            return;
        }
    }
    out.push(node);
}

fn merge_runs(a: &PrimitiveRun, b: &PrimitiveRun) -> Option<PrimitiveRun> {
    if a.kind != b.kind {
        return None;
    }
    let size = a.kind.size();
    let stride = if a.count > 1 {
        a.extent
    } else if b.count > 1 {
        b.extent
    } else {
        usize::try_from(b.disp - a.disp).ok()?
    };
    if stride < size {
        return None;
    }
    let stride_ok = (a.count == 1 || a.extent == stride) && (b.count == 1 || b.extent == stride);
    let offset = isize::try_from(a.count.checked_mul(stride)?).ok()?;
    if stride_ok && a.disp.checked_add(offset)? == b.disp {
        Some(PrimitiveRun::strided(a.kind, a.count + b.count, stride, a.disp))
    } else {
        None
    }
}

/// Flatten a tree back into an element stream with resolved end indices.
pub(crate) fn flatten(nodes: &[Node]) -> Vec<Element> {
    let mut out = Vec::new();
    flatten_into(nodes, &mut out);
    out
}

fn flatten_into(nodes: &[Node], out: &mut Vec<Element>) {
    for node in nodes {
        match node {
            Node::Run(run) => out.push(Element::Primitive(*run)),
            Node::Loop {
                count,
                body_extent,
                body,
            } => {
                let at = out.len();
                out.push(Element::Loop(LoopStart {
                    count: *count,
                    body_extent: *body_extent,
                    end_index: 0,
                }));
                flatten_into(body, out);
                let end_index = out.len();
                if let Element::Loop(start) = &mut out[at] {
                    start.end_index = end_index;
                }
            }
        }
    }
}
