// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resumable stack machine shared by pack and unpack.
//!
//! The walk only ever suspends at a primitive run: loop frames are pushed
//! eagerly and scope ends are unwound before the wire is consulted, so the
//! cursor frame on top of the stack is always the exact resume point.

use super::stack::{Frame, TraversalStack};
use super::table::{ConversionFn, ConversionPlan, Converted};
use super::Status;
use crate::error::{Error, Result};
use crate::types::element::Element;
use crate::types::primitive::MAX_PRIMITIVE_SIZE;

/// One primitive split across wire buffers, held in scratch until whole.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Staged {
    pub(crate) buf: [u8; MAX_PRIMITIVE_SIZE],
    /// Bytes already moved between scratch and the wire.
    pub(crate) len: usize,
    pub(crate) size: usize,
}

impl Staged {
    fn new(size: usize) -> Self {
        Self {
            buf: [0; MAX_PRIMITIVE_SIZE],
            len: 0,
            size,
        }
    }

    fn is_full(&self) -> bool {
        self.len == self.size
    }
}

/// Direction-specific half of the machine: which side is user memory and
/// which side is the wire.
pub(crate) trait Side {
    fn wire_exhausted(&mut self) -> bool;

    /// Convert up to `count` primitives between user memory at `at` and the
    /// current wire buffer.
    fn transfer(
        &mut self,
        f: ConversionFn,
        size: usize,
        at: usize,
        extent: usize,
        count: usize,
    ) -> Converted;

    /// Prepare scratch for the primitive at `at`.
    fn stage_begin(&mut self, f: ConversionFn, at: usize, staged: &mut Staged);

    /// Move scratch bytes across as many wire buffers as needed.
    fn stage_move(&mut self, staged: &mut Staged);

    /// Finish a primitive once scratch is full.
    fn stage_end(&mut self, f: ConversionFn, at: usize, staged: &Staged);
}

/// Immutable inputs of one walk.
pub(crate) struct Walk<'d> {
    pub(crate) elements: &'d [Element],
    pub(crate) plan: &'d ConversionPlan,
    pub(crate) origin: isize,
    pub(crate) instance_extent: usize,
}

/// Result of one [`drive`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) elements: usize,
    pub(crate) status: Status,
}

impl Walk<'_> {
    #[inline]
    fn at(&self, disp: isize) -> usize {
        (self.origin + disp) as usize
    }

    fn body_extent(&self, frame: &Frame) -> usize {
        match frame.index {
            None => self.instance_extent,
            Some(index) => self.elements[index]
                .as_loop()
                .map_or(0, |start| start.body_extent),
        }
    }
}

/// Run the walk until the wire is exhausted (`Pending`) or every instance
/// is done (`Complete`).
pub(crate) fn drive<S: Side>(
    walk: &Walk<'_>,
    stack: &mut TraversalStack,
    staged: &mut Option<Staged>,
    side: &mut S,
) -> Result<Step> {
    let mut elements = 0;
    let mut resume = stack.take_cursor();

    if let (Some(cursor), Some(mut stage)) = (resume.as_mut(), staged.take()) {
        let Some(run) = walk.elements[cursor.end_loop].as_primitive() else {
            return Err(Error::malformed(format!(
                "suspended at element {} which is not a primitive run",
                cursor.end_loop
            )));
        };
        let f = walk.plan.get(run.kind);
        side.stage_move(&mut stage);
        if !stage.is_full() {
            *staged = Some(stage);
            stack.push(*cursor)?;
            return Ok(Step {
                elements,
                status: Status::Pending,
            });
        }
        side.stage_end(f, walk.at(cursor.disp), &stage);
        cursor.count -= 1;
        cursor.disp += run.extent as isize;
        elements += 1;
    }

    let mut pos = resume.map_or(0, |cursor| cursor.end_loop);
    loop {
        let Some(scope) = stack.top().copied() else {
            return Ok(Step {
                elements,
                status: Status::Complete,
            });
        };

        if pos == scope.end_loop {
            let body_extent = walk.body_extent(&scope);
            let Some(frame) = stack.top_mut() else {
                continue;
            };
            frame.count -= 1;
            if frame.count == 0 {
                // parent scope resumes right after the finished loop
                stack.pop();
                continue;
            }
            frame.disp += body_extent as isize;
            pos = frame.index.map_or(0, |index| index + 1);
            continue;
        }

        match walk.elements[pos] {
            Element::Loop(start) => {
                if start.count == 0 || start.end_index == pos + 1 {
                    pos = start.end_index;
                    continue;
                }
                stack.push(Frame::looping(pos, start.count, scope.disp, start.end_index))?;
                pos += 1;
            }
            Element::Primitive(run) => {
                let (mut left, mut disp) = match resume.take() {
                    Some(cursor) => (cursor.count, cursor.disp),
                    None => (run.count, scope.disp + run.disp),
                };
                let size = run.kind.size();
                let f = walk.plan.get(run.kind);

                while left > 0 {
                    if side.wire_exhausted() {
                        stack.push(Frame::cursor(pos, left, disp))?;
                        return Ok(Step {
                            elements,
                            status: Status::Pending,
                        });
                    }

                    let at = walk.at(disp);
                    let done = side.transfer(f, size, at, run.extent, left);
                    if done.elements > 0 {
                        left -= done.elements;
                        disp += (done.elements * run.extent) as isize;
                        elements += done.elements;
                        continue;
                    }

                    // current wire buffer holds less than one primitive
                    let mut stage = Staged::new(size);
                    side.stage_begin(f, at, &mut stage);
                    side.stage_move(&mut stage);
                    if !stage.is_full() {
                        *staged = Some(stage);
                        stack.push(Frame::cursor(pos, left, disp))?;
                        return Ok(Step {
                            elements,
                            status: Status::Pending,
                        });
                    }
                    side.stage_end(f, at, &stage);
                    left -= 1;
                    disp += run.extent as isize;
                    elements += 1;
                }
                pos += 1;
            }
        }
    }
}
