// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDT - derived datatype convertor
//!
//! Converts between a structured, possibly non-contiguous memory layout
//! (a derived datatype) and a flat byte stream, in either direction, across
//! any number of bounded scatter/gather buffer calls.
//!
//! ## Quick Start
//!
//! ```rust
//! use ddt::{Convertor, DescriptorBuilder, PrimitiveKind, Status};
//! use std::io::{IoSlice, IoSliceMut};
//!
//! // Every other double of a 20-slot array.
//! let desc = DescriptorBuilder::vector(PrimitiveKind::Double, 10, 1, 2)
//!     .commit()
//!     .unwrap();
//!
//! let src: Vec<u8> = (0..160u8).collect();
//! let mut wire = vec![0u8; 80];
//!
//! let mut packer = Convertor::for_pack(desc.clone(), 1, &src).unwrap();
//! let progress = packer.pack(&mut [IoSliceMut::new(&mut wire)]).unwrap();
//! assert_eq!(progress.status, Status::Complete);
//!
//! let mut dst = vec![0u8; 160];
//! let mut unpacker = Convertor::for_unpack(desc, 1, &mut dst).unwrap();
//! unpacker.unpack(&[IoSlice::new(&wire)]).unwrap();
//! assert_eq!(&dst[..8], &src[..8]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Convertor  (pack / unpack / zero-copy windows, per operation) |
//! +-------------------------------+-------------------------------+
//! |  Traversal stack + machine    |  Scatter/gather views (iov)   |
//! +-------------------------------+-------------------------------+
//! |  Primitive conversion table   |  Descriptor + optimizer       |
//! +---------------------------------------------------------------+
//! ```
//!
//! A [`Descriptor`] is committed once and shared through an `Arc` by any
//! number of convertors. A [`Convertor`] owns its traversal stack and
//! borrows user memory for its lifetime; wire buffers are borrowed per call.

/// Bounded cache of committed descriptors (predefined primitives pinned).
pub mod cache;
/// Convertor configuration (remote architecture, path selection).
pub mod config;
/// Pack/unpack engine: conversion table, traversal stack, convertor.
pub mod convert;
/// Error type shared by every engine component.
pub mod error;
/// Scatter/gather cursors over caller-owned wire buffers.
pub mod iov;
/// Type descriptors, the flat element stream and its optimizer.
pub mod types;

pub use cache::{DescriptorCache, LookupStats};
pub use config::{Architecture, ConvertorConfig, Endian};
pub use convert::{
    ConversionFn, ConversionTable, Converted, Convertor, Direction, Frame, Progress, Status,
    TraversalStack,
};
pub use error::{Error, Result};
pub use types::{
    Descriptor, DescriptorBuilder, Element, LoopStart, PrimitiveKind, PrimitiveRun, TypeSpec,
};
