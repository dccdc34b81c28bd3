// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Independent convertors sharing one committed descriptor across threads.

mod common;

use common::{int_blocks, masked, pack_in_chunks, random_bytes, reference_stream, unpack_in_chunks};
use ddt::{ConvertorConfig, DescriptorCache, PrimitiveKind};
use std::sync::Arc;

#[test]
fn test_parallel_convertors_share_descriptor() {
    let desc = int_blocks(4).commit().expect("commit");
    let count = 3;
    let len = desc.required_len(count).expect("len");
    let sources: Vec<Vec<u8>> = (0..8).map(|seed| random_bytes(len, seed)).collect();

    let results: Vec<(Vec<u8>, Vec<u8>)> = crossbeam::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(i, src)| {
                let desc = Arc::clone(&desc);
                scope.spawn(move |_| {
                    let chunk = i * 7 + 1;
                    let stream =
                        pack_in_chunks(&desc, count, src, ConvertorConfig::default(), || chunk);
                    let dst =
                        unpack_in_chunks(&desc, count, &stream, ConvertorConfig::default(), || chunk);
                    (stream, dst)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker"))
            .collect()
    })
    .expect("scope");

    for (src, (stream, dst)) in sources.iter().zip(results) {
        assert_eq!(stream, reference_stream(&desc, count, src));
        assert_eq!(dst, masked(&desc, count, src));
    }
    // only the local handle is left once the workers are gone
    assert_eq!(Arc::strong_count(&desc), 1);
}

#[test]
fn test_cache_shared_between_threads() {
    let cache = DescriptorCache::with_predefined(8);
    crossbeam::scope(|scope| {
        for i in 0..4usize {
            let cache = &cache;
            scope.spawn(move |_| {
                for _ in 0..50 {
                    let desc = cache
                        .get_or_try_build("blocks", || int_blocks(2).build())
                        .expect("build");
                    assert_eq!(desc.size(), 120);
                    let double = cache.predefined(PrimitiveKind::Double).expect("predefined");
                    assert_eq!(double.size(), 8);
                    let src = random_bytes(desc.required_len(1).expect("len"), i as u64);
                    let stream =
                        pack_in_chunks(&desc, 1, &src, ConvertorConfig::default(), || 9);
                    assert_eq!(stream.len(), 120);
                }
            });
        }
    })
    .expect("scope");

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 200);
    assert!(stats.misses >= 1);
    assert!(cache.get("blocks").is_some());
}
