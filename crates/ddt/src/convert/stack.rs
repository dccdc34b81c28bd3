// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded traversal stack.
//!
//! The bottom frame counts the remaining instances, one frame per open loop
//! sits above it, and a cursor frame on top records a suspended primitive
//! run. Capacity is fixed when the convertor is prepared.

use crate::error::{Error, Result};

/// One level of the nested iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// `LoopStart` index for loop frames, primitive index for the cursor,
    /// `None` for the instance frame.
    pub index: Option<usize>,
    /// Remaining iterations (current one included), or remaining elements
    /// of the run for the cursor.
    pub count: usize,
    /// Displacement of the current iteration, or of the next element for
    /// the cursor.
    pub disp: isize,
    /// Exclusive end of the scope; equals `index` for the cursor.
    pub end_loop: usize,
}

impl Frame {
    pub fn top_level(count: usize, end: usize) -> Self {
        Self {
            index: None,
            count,
            disp: 0,
            end_loop: end,
        }
    }

    pub fn looping(index: usize, count: usize, disp: isize, end_loop: usize) -> Self {
        Self {
            index: Some(index),
            count,
            disp,
            end_loop,
        }
    }

    pub fn cursor(index: usize, remaining: usize, disp: isize) -> Self {
        Self {
            index: Some(index),
            count: remaining,
            disp,
            end_loop: index,
        }
    }

    pub fn is_cursor(&self) -> bool {
        self.index == Some(self.end_loop)
    }
}

/// Explicit frame stack driving the non-recursive walk.
#[derive(Debug, Clone)]
pub struct TraversalStack {
    frames: Vec<Frame>,
    capacity: usize,
}

impl TraversalStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame, refusing to grow past the precomputed capacity.
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= self.capacity {
            return Err(Error::StackOverflow {
                depth: self.frames.len() + 1,
                capacity: self.capacity,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Bottom first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Pop the suspended-run cursor if one is on top.
    pub(crate) fn take_cursor(&mut self) -> Option<Frame> {
        match self.frames.last() {
            Some(frame) if frame.is_cursor() => self.frames.pop(),
            _ => None,
        }
    }

    /// Log every frame at trace level.
    pub fn dump(&self, label: &str) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        log::trace!(
            "[convertor] {} stack {}/{}",
            label,
            self.frames.len(),
            self.capacity
        );
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            let kind = match frame.index {
                None => "instances",
                Some(_) if frame.is_cursor() => "cursor",
                Some(_) => "loop",
            };
            log::trace!(
                "[convertor]   {:>2} {:<9} index {:?} count {} disp {} end {}",
                depth,
                kind,
                frame.index,
                frame.count,
                frame.disp,
                frame.end_loop
            );
        }
    }
}
