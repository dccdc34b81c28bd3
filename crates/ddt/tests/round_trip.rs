// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::cast_sign_loss)] // Test data conversions

//! Pack/unpack round trips on the same architecture.
//!
//! Every layout is packed and unpacked through the fast path (when it
//! applies), the general stack machine over the optimized list, and the
//! stack machine over the raw list. All three must agree with a plain
//! recursive walk of the descriptor.

mod common;

use common::{
    commit_shapes, general_path, layouts, masked, pack_in_chunks, random_bytes, raw_elements,
    reference_stream, shapes, unpack_in_chunks,
};
use ddt::{Convertor, ConvertorConfig, Descriptor, PrimitiveKind, Progress, Status};
use proptest::prelude::*;
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;

fn configs() -> [(&'static str, ConvertorConfig); 3] {
    [
        ("default", ConvertorConfig::default()),
        ("general", general_path()),
        ("raw", raw_elements()),
    ]
}

#[test]
fn test_round_trip_every_layout() {
    for (name, desc) in layouts() {
        for count in [1usize, 3] {
            let len = desc.required_len(count).expect("len");
            let src = random_bytes(len, 0xD0 + count as u64);
            let expected_stream = reference_stream(&desc, count, &src);
            assert_eq!(expected_stream.len(), desc.packed_size(count).expect("size"));

            for (label, config) in configs() {
                let full = desc.packed_size(count).expect("size");
                let stream = pack_in_chunks(&desc, count, &src, config.clone(), || full);
                assert_eq!(stream, expected_stream, "{} x{} pack via {}", name, count, label);

                let dst = unpack_in_chunks(&desc, count, &stream, config, || full);
                assert_eq!(
                    dst,
                    masked(&desc, count, &src),
                    "{} x{} unpack via {}",
                    name,
                    count,
                    label
                );
            }
        }
    }
}

#[test]
fn test_fast_path_matches_general_path() {
    for (name, desc) in layouts().into_iter().filter(|(_, d)| d.is_contiguous()) {
        let count = 5;
        let src = random_bytes(desc.required_len(count).expect("len"), 7);

        let fast = Convertor::for_pack(desc.clone(), count, &src).expect("prepare");
        assert!(!fast.need_buffers(), "{} should take the fast path", name);
        drop(fast);

        for chunk in [1usize, 3, 8, 64] {
            let fast = pack_in_chunks(&desc, count, &src, ConvertorConfig::default(), || chunk);
            let general = pack_in_chunks(&desc, count, &src, general_path(), || chunk);
            assert_eq!(fast, general, "{} chunk {}", name, chunk);
        }
    }
}

#[test]
fn test_zero_count_touches_nothing() {
    for (name, desc) in layouts() {
        let src: [u8; 0] = [];
        let mut wire = [0xAAu8; 16];
        let mut conv = Convertor::for_pack(desc.clone(), 0, &src).expect("prepare");
        assert!(conv.is_complete(), "{}", name);
        let progress = conv.pack(&mut [IoSliceMut::new(&mut wire)]).expect("pack");
        assert_eq!(
            progress,
            Progress {
                elements: 0,
                bytes: 0,
                status: Status::Complete
            }
        );
        assert!(wire.iter().all(|b| *b == 0xAA));

        let mut dst: [u8; 0] = [];
        let mut conv = Convertor::for_unpack(desc, 0, &mut dst).expect("prepare");
        let progress = conv.unpack(&[IoSlice::new(&wire)]).expect("unpack");
        assert_eq!(progress.bytes, 0);
        assert!(progress.is_complete());
    }
}

#[test]
fn test_scalar_matches_raw_copy() {
    let desc = Arc::new(Descriptor::primitive(PrimitiveKind::Double));
    let value = std::f64::consts::PI.to_ne_bytes();
    let mut wire = [0u8; 8];
    let mut conv = Convertor::for_pack(desc.clone(), 1, &value).expect("prepare");
    let progress = conv.pack(&mut [IoSliceMut::new(&mut wire)]).expect("pack");
    assert_eq!(progress.elements, 1);
    assert_eq!(wire, value);

    let mut back = [0u8; 8];
    let mut conv = Convertor::for_unpack(desc, 1, &mut back).expect("prepare");
    conv.unpack(&[IoSlice::new(&wire)]).expect("unpack");
    drop(conv);
    assert_eq!(f64::from_ne_bytes(back), std::f64::consts::PI);
}

#[test]
fn test_calls_after_complete_are_noops() {
    for (name, desc) in layouts() {
        let src = random_bytes(desc.required_len(2).expect("len"), 11);
        let mut wire = vec![0u8; desc.packed_size(2).expect("size")];
        let mut conv = Convertor::for_pack(desc.clone(), 2, &src).expect("prepare");
        assert!(conv.pack(&mut [IoSliceMut::new(&mut wire)]).expect("pack").is_complete());

        let before = (conv.bytes_converted(), conv.elements_converted());
        let mut extra = [0u8; 32];
        for _ in 0..3 {
            let progress = conv.pack(&mut [IoSliceMut::new(&mut extra)]).expect("pack");
            assert_eq!(progress.elements, 0, "{}", name);
            assert_eq!(progress.bytes, 0, "{}", name);
            assert!(progress.is_complete());
        }
        assert!(extra.iter().all(|b| *b == 0));
        assert_eq!((conv.bytes_converted(), conv.elements_converted()), before);

        let mut dst = vec![0u8; src.len()];
        let mut conv = Convertor::for_unpack(desc, 2, &mut dst).expect("prepare");
        assert!(conv.unpack(&[IoSlice::new(&wire)]).expect("unpack").is_complete());
        let progress = conv.unpack(&[IoSlice::new(&wire)]).expect("unpack");
        assert_eq!(progress.bytes, 0);
    }
}

#[test]
fn test_position_queries() {
    let (_, desc) = layouts()
        .into_iter()
        .find(|(name, _)| *name == "int_blocks")
        .expect("fixture");
    let src = random_bytes(desc.required_len(2).expect("len"), 3);
    let mut conv = Convertor::for_pack(desc.clone(), 2, &src).expect("prepare");
    assert_eq!(conv.count(), 2);
    assert_eq!(conv.packed_size(), 480);

    let mut wire = [0u8; 130];
    let progress = conv.pack(&mut [IoSliceMut::new(&mut wire)]).expect("pack");
    assert_eq!(progress.status, Status::Pending);
    assert_eq!(conv.bytes_converted(), 130);
    assert_eq!(conv.elements_converted(), 32);
    assert_eq!(conv.elements_converted(), desc.element_count(130));
    assert_eq!(conv.remaining_bytes(), 350);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any layout, any count, any single-call buffer split: output matches
    /// the reference walk and unpacks back to the source.
    #[test]
    fn round_trip_random(layout in 0usize..8, count in 0usize..6, seed in any::<u64>(), chunk in 1usize..200) {
        let (_, desc) = layouts().swap_remove(layout);
        let src = random_bytes(desc.required_len(count).expect("len"), seed);
        let stream = pack_in_chunks(&desc, count, &src, ConvertorConfig::default(), || chunk);
        prop_assert_eq!(&stream, &reference_stream(&desc, count, &src));
        let dst = unpack_in_chunks(&desc, count, &stream, raw_elements(), || chunk);
        prop_assert_eq!(dst, masked(&desc, count, &src));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Generated layouts: every path packs the reference stream and
    /// unpacks it back to the touched bytes of the source.
    #[test]
    fn round_trip_generated_layouts(layout in shapes(), count in 0usize..4, seed in any::<u64>(),
                                    chunk in 1usize..64) {
        let desc = commit_shapes(&layout);
        let src = random_bytes(desc.required_len(count).expect("len"), seed);
        let expected = reference_stream(&desc, count, &src);
        let touched = masked(&desc, count, &src);
        for config in [ConvertorConfig::default(), general_path(), raw_elements()] {
            let stream = pack_in_chunks(&desc, count, &src, config.clone(), || chunk);
            prop_assert_eq!(&stream, &expected);
            let dst = unpack_in_chunks(&desc, count, &stream, config, || chunk);
            prop_assert_eq!(&dst, &touched);
        }
    }
}
