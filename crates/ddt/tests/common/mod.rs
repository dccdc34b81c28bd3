// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures: a catalogue of layouts, a recursive reference walk
//! that the convertor output is checked against, and chunked drivers.

#![allow(dead_code)]

use ddt::{
    Convertor, ConvertorConfig, Descriptor, DescriptorBuilder, Element, PrimitiveKind, Progress,
    Status,
};
use proptest::prelude::*;
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;

/// Named layouts covering scalars, dense runs, strides, nesting, padding
/// and negative displacements.
pub fn layouts() -> Vec<(&'static str, Arc<Descriptor>)> {
    let commit = |builder: DescriptorBuilder| builder.commit().expect("fixture layout");
    vec![
        (
            "scalar_double",
            Arc::new(Descriptor::primitive(PrimitiveKind::Double)),
        ),
        (
            "contiguous_int",
            commit(DescriptorBuilder::contiguous(PrimitiveKind::Int, 7)),
        ),
        (
            "strided_double",
            commit(DescriptorBuilder::vector(PrimitiveKind::Double, 10, 1, 2)),
        ),
        ("int_blocks", commit(int_blocks(4))),
        (
            "padded_struct",
            commit(
                DescriptorBuilder::new()
                    .primitive(PrimitiveKind::Char, 1, 0)
                    .primitive(PrimitiveKind::Double, 1, 8)
                    .primitive(PrimitiveKind::Short, 3, 16)
                    .bounds(0, 24),
            ),
        ),
        (
            "negative_disp",
            commit(
                DescriptorBuilder::new()
                    .primitive(PrimitiveKind::Int, 1, -8)
                    .primitive(PrimitiveKind::Int, 1, 4),
            ),
        ),
        ("nested_loop_starts", commit(nested_loop_starts())),
        (
            "complex_mix",
            commit(
                DescriptorBuilder::new()
                    .primitive(PrimitiveKind::ComplexDouble, 2, 0)
                    .primitive(PrimitiveKind::ComplexFloat, 1, 32)
                    .primitive(PrimitiveKind::LongLong, 1, 48)
                    .primitive(PrimitiveKind::Byte, 3, 56),
            ),
        ),
    ]
}

/// `repeats` x { 5 ints @0, 5 ints @32, 5 ints @64 }, 96 bytes per repeat.
pub fn int_blocks(repeats: usize) -> DescriptorBuilder {
    DescriptorBuilder::new()
        .begin_loop(repeats, 96)
        .primitive(PrimitiveKind::Int, 5, 0)
        .primitive(PrimitiveKind::Int, 5, 32)
        .primitive(PrimitiveKind::Int, 5, 64)
        .end_loop()
}

/// Three loop starts back to back before the first primitive.
pub fn nested_loop_starts() -> DescriptorBuilder {
    DescriptorBuilder::new()
        .begin_loop(2, 112)
        .begin_loop(3, 32)
        .begin_loop(2, 8)
        .primitive(PrimitiveKind::Int, 1, 0)
        .end_loop()
        .primitive(PrimitiveKind::Double, 1, 16)
        .end_loop()
        .primitive(PrimitiveKind::Short, 2, 100)
        .end_loop()
}

/// Nested layout generated for property tests.
#[derive(Debug, Clone)]
pub enum Shape {
    Run {
        kind: PrimitiveKind,
        count: usize,
        extent: usize,
        disp: isize,
    },
    Loop {
        count: usize,
        body_extent: usize,
        body: Vec<Shape>,
    },
}

impl Shape {
    fn emit(&self, builder: DescriptorBuilder) -> DescriptorBuilder {
        match self {
            Shape::Run {
                kind,
                count,
                extent,
                disp,
            } => builder.strided(*kind, *count, *extent, *disp),
            Shape::Loop {
                count,
                body_extent,
                body,
            } => body
                .iter()
                .fold(builder.begin_loop(*count, *body_extent), |b, shape| shape.emit(b))
                .end_loop(),
        }
    }
}

/// Commit a generated layout.
pub fn commit_shapes(shapes: &[Shape]) -> Arc<Descriptor> {
    shapes
        .iter()
        .fold(DescriptorBuilder::new(), |b, shape| shape.emit(b))
        .commit()
        .expect("generated layout commits")
}

fn run_shape() -> impl Strategy<Value = Shape> {
    (
        prop::sample::select(PrimitiveKind::ALL.to_vec()),
        prop_oneof![1 => Just(0usize), 6 => 1usize..4],
        prop_oneof![3 => Just(0usize), 1 => 1usize..9],
        -24isize..48,
    )
        .prop_map(|(kind, count, pad, disp)| Shape::Run {
            kind,
            count,
            extent: kind.size() + pad,
            disp,
        })
}

/// Balanced element streams: nested loops (some empty or zero-count),
/// mixed kinds, dense and strided runs, negative displacements, and
/// adjacent runs the optimizer may merge.
pub fn shapes() -> impl Strategy<Value = Vec<Shape>> {
    let shape = run_shape().prop_recursive(3, 24, 4, |inner| {
        (
            prop_oneof![1 => Just(0usize), 1 => Just(1usize), 4 => 2usize..4],
            prop_oneof![1 => Just(0usize), 3 => 1usize..64],
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(count, body_extent, body)| Shape::Loop {
                count,
                body_extent,
                body,
            })
    });
    prop::collection::vec(shape, 1..4)
}

/// Deterministic pseudo-random bytes.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf);
    buf
}

/// Touched `(buffer index, length)` segments in stream order, one per
/// primitive, computed by plain recursion over the raw element list.
pub fn reference_segments(desc: &Descriptor, count: usize) -> Vec<(usize, usize)> {
    fn walk(elements: &[Element], start: usize, end: usize, base: isize, out: &mut Vec<(usize, usize)>) {
        let mut index = start;
        while index < end {
            match &elements[index] {
                Element::Primitive(run) => {
                    for i in 0..run.count {
                        let at = base + run.disp + (i * run.extent) as isize;
                        out.push((at as usize, run.kind.size()));
                    }
                    index += 1;
                }
                Element::Loop(start_elem) => {
                    for i in 0..start_elem.count {
                        let iteration = base + (i * start_elem.body_extent) as isize;
                        walk(elements, index + 1, start_elem.end_index, iteration, out);
                    }
                    index = start_elem.end_index;
                }
            }
        }
    }

    let mut out = Vec::new();
    let origin = desc.origin() as isize;
    for j in 0..count {
        let base = origin + (j * desc.extent()) as isize;
        walk(desc.elements(), 0, desc.elements().len(), base, &mut out);
    }
    out
}

/// Packed stream of `src`, built from the reference segments.
pub fn reference_stream(desc: &Descriptor, count: usize, src: &[u8]) -> Vec<u8> {
    reference_segments(desc, count)
        .into_iter()
        .flat_map(|(at, len)| src[at..at + len].iter().copied())
        .collect()
}

/// `src` with every byte the layout does not touch cleared.
pub fn masked(desc: &Descriptor, count: usize, src: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    for (at, len) in reference_segments(desc, count) {
        out[at..at + len].copy_from_slice(&src[at..at + len]);
    }
    out
}

/// Pack with one buffer per call, sized by `next_chunk`.
pub fn pack_in_chunks(
    desc: &Arc<Descriptor>,
    count: usize,
    src: &[u8],
    config: ConvertorConfig,
    mut next_chunk: impl FnMut() -> usize,
) -> Vec<u8> {
    let mut conv = Convertor::for_pack_with(desc.clone(), count, src, config).expect("prepare pack");
    let mut stream = Vec::new();
    let mut elements = 0;
    while !conv.is_complete() {
        let mut buf = vec![0u8; next_chunk().max(1)];
        let progress = conv
            .pack(&mut [IoSliceMut::new(&mut buf)])
            .expect("pack");
        assert!(progress.bytes > 0, "pack made no progress: {:?}", progress);
        assert_ne!(progress.status, Status::ShortSourceData);
        stream.extend_from_slice(&buf[..progress.bytes]);
        elements += progress.elements;
    }
    assert_eq!(elements, desc.element_total() * count);
    assert_eq!(conv.bytes_converted(), conv.packed_size());
    stream
}

/// Unpack `stream` into zeroed user memory, one buffer per call.
pub fn unpack_in_chunks(
    desc: &Arc<Descriptor>,
    count: usize,
    stream: &[u8],
    config: ConvertorConfig,
    mut next_chunk: impl FnMut() -> usize,
) -> Vec<u8> {
    let len = desc.required_len(count).expect("required length");
    let mut dst = vec![0u8; len];
    let mut conv =
        Convertor::for_unpack_with(desc.clone(), count, &mut dst, config).expect("prepare unpack");
    let mut offset = 0;
    let mut last = Progress {
        elements: 0,
        bytes: 0,
        status: Status::Pending,
    };
    while !conv.is_complete() {
        let end = (offset + next_chunk().max(1)).min(stream.len());
        last = conv
            .unpack(&[IoSlice::new(&stream[offset..end])])
            .expect("unpack");
        assert_eq!(last.bytes, end - offset, "unpack left input unread");
        offset = end;
    }
    assert!(last.is_complete() || count == 0 || desc.size() == 0);
    assert_eq!(offset, stream.len());
    assert_eq!(conv.elements_converted(), desc.element_total() * count);
    drop(conv);
    dst
}

/// Config that always runs the stack machine.
pub fn general_path() -> ConvertorConfig {
    ConvertorConfig {
        force_general_path: true,
        ..ConvertorConfig::default()
    }
}

/// Config that walks the raw element list through the stack machine.
pub fn raw_elements() -> ConvertorConfig {
    ConvertorConfig {
        force_general_path: true,
        use_optimized: false,
        ..ConvertorConfig::default()
    }
}
