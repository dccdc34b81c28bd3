// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Chunked pack/unpack runs.
//!
//! Each call gets one wire buffer of `chunk` bytes, the way a transport
//! would hand out MTU-sized fragments.

use ddt::{Convertor, ConvertorConfig, Descriptor, Status};
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;

/// Summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub calls: usize,
    pub bytes: usize,
    pub elements: usize,
    pub status: Status,
    /// True when the contiguous fast path carried the run.
    pub fast_path: bool,
}

/// Pack `count` instances read from `src` into a single stream.
pub fn pack(
    descriptor: Arc<Descriptor>,
    count: usize,
    src: &[u8],
    config: ConvertorConfig,
    chunk: usize,
) -> ddt::Result<(Vec<u8>, RunReport)> {
    let mut conv = Convertor::for_pack_with(descriptor, count, src, config)?;
    let mut stream = Vec::with_capacity(conv.packed_size());
    let mut buf = vec![0u8; chunk.max(1)];
    let mut report = RunReport {
        calls: 0,
        bytes: 0,
        elements: 0,
        status: Status::Complete,
        fast_path: !conv.need_buffers(),
    };

    while !conv.is_complete() {
        let progress = conv.pack(&mut [IoSliceMut::new(&mut buf)])?;
        stream.extend_from_slice(&buf[..progress.bytes]);
        report.calls += 1;
        report.bytes += progress.bytes;
        report.elements += progress.elements;
        report.status = progress.status;
        tracing::debug!(
            call = report.calls,
            bytes = progress.bytes,
            elements = progress.elements,
            status = %progress.status,
            "pack call"
        );
    }
    Ok((stream, report))
}

/// Unpack `count` instances from `stream` into zeroed user memory.
///
/// A stream shorter than the packed size leaves the run suspended; the
/// report carries the last status.
pub fn unpack(
    descriptor: Arc<Descriptor>,
    count: usize,
    stream: &[u8],
    config: ConvertorConfig,
    chunk: usize,
) -> ddt::Result<(Vec<u8>, RunReport)> {
    let len = descriptor
        .required_len(count)
        .ok_or(ddt::Error::CountOverflow { count })?;
    let mut dst = vec![0u8; len];
    let mut conv = Convertor::for_unpack_with(descriptor, count, &mut dst, config)?;
    let mut report = RunReport {
        calls: 0,
        bytes: 0,
        elements: 0,
        status: Status::Complete,
        fast_path: !conv.need_buffers(),
    };

    for piece in stream.chunks(chunk.max(1)) {
        if conv.is_complete() {
            break;
        }
        let progress = conv.unpack(&[IoSlice::new(piece)])?;
        report.calls += 1;
        report.bytes += progress.bytes;
        report.elements += progress.elements;
        report.status = progress.status;
        tracing::debug!(
            call = report.calls,
            bytes = progress.bytes,
            elements = progress.elements,
            status = %progress.status,
            "unpack call"
        );
    }
    if !conv.is_complete() && report.calls == 0 {
        report.status = Status::Pending;
    }
    drop(conv);
    Ok((dst, report))
}
