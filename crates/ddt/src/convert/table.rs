// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive conversion table.
//!
//! One entry per [`PrimitiveKind`]: a plain copy routine and, where one
//! exists, a byte-order swapping routine. Every routine honors independent
//! strides on both sides and clamps to whichever side runs out first.

use crate::config::{Architecture, Endian};
use crate::error::{Error, Result};
use crate::types::primitive::{PrimitiveKind, LONG_DOUBLE_SIZE, LONG_SIZE};
use crate::types::Descriptor;

/// Outcome of one conversion routine call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Converted {
    /// Whole primitives converted.
    pub elements: usize,
    /// Packed bytes those primitives occupy.
    pub bytes: usize,
}

/// `(count, src, src_extent, dst, dst_extent) -> Converted`.
///
/// Available lengths are the slice lengths. Extents smaller than the
/// primitive width are treated as the width.
pub type ConversionFn = fn(usize, &[u8], usize, &mut [u8], usize) -> Converted;

/// Primitives of `size` bytes, `extent` apart, that fit in `len` bytes.
#[inline]
fn fits(len: usize, extent: usize, size: usize) -> usize {
    if len < size {
        0
    } else {
        (len - size) / extent + 1
    }
}

#[inline]
fn clamp<const N: usize>(
    count: usize,
    src: &[u8],
    src_extent: usize,
    dst: &[u8],
    dst_extent: usize,
) -> (usize, usize, usize) {
    let src_extent = src_extent.max(N);
    let dst_extent = dst_extent.max(N);
    let n = count
        .min(fits(src.len(), src_extent, N))
        .min(fits(dst.len(), dst_extent, N));
    (n, src_extent, dst_extent)
}

fn copy_elements<const N: usize>(
    count: usize,
    src: &[u8],
    src_extent: usize,
    dst: &mut [u8],
    dst_extent: usize,
) -> Converted {
    let (n, src_extent, dst_extent) = clamp::<N>(count, src, src_extent, dst, dst_extent);
    if src_extent == N && dst_extent == N {
        dst[..n * N].copy_from_slice(&src[..n * N]);
    } else {
        for i in 0..n {
            let (s, d) = (i * src_extent, i * dst_extent);
            dst[d..d + N].copy_from_slice(&src[s..s + N]);
        }
    }
    Converted {
        elements: n,
        bytes: n * N,
    }
}

/// Copy, then reverse the byte order of every `UNIT`-byte component.
fn swap_elements<const N: usize, const UNIT: usize>(
    count: usize,
    src: &[u8],
    src_extent: usize,
    dst: &mut [u8],
    dst_extent: usize,
) -> Converted {
    let (n, src_extent, dst_extent) = clamp::<N>(count, src, src_extent, dst, dst_extent);
    for i in 0..n {
        let (s, d) = (i * src_extent, i * dst_extent);
        let out = &mut dst[d..d + N];
        out.copy_from_slice(&src[s..s + N]);
        for component in out.chunks_exact_mut(UNIT) {
            component.reverse();
        }
    }
    Converted {
        elements: n,
        bytes: n * N,
    }
}

/// Routines registered for one primitive kind.
#[derive(Clone, Copy)]
pub struct ConversionEntry {
    pub kind: PrimitiveKind,
    pub copy: ConversionFn,
    /// Value-preserving conversion to the opposite byte order.
    pub swap: Option<ConversionFn>,
}

impl std::fmt::Debug for ConversionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEntry")
            .field("kind", &self.kind)
            .field("swap", &self.swap.is_some())
            .finish()
    }
}

/// Dispatch table indexed by [`PrimitiveKind::index`].
#[derive(Debug)]
pub struct ConversionTable {
    entries: [ConversionEntry; PrimitiveKind::COUNT],
}

static STANDARD: ConversionTable = ConversionTable {
    entries: [
        ConversionEntry {
            kind: PrimitiveKind::Char,
            copy: copy_elements::<1>,
            swap: Some(copy_elements::<1>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Byte,
            copy: copy_elements::<1>,
            swap: Some(copy_elements::<1>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Short,
            copy: copy_elements::<2>,
            swap: Some(swap_elements::<2, 2>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Int,
            copy: copy_elements::<4>,
            swap: Some(swap_elements::<4, 4>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Float,
            copy: copy_elements::<4>,
            swap: Some(swap_elements::<4, 4>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Long,
            copy: copy_elements::<{ LONG_SIZE }>,
            swap: Some(swap_elements::<{ LONG_SIZE }, { LONG_SIZE }>),
        },
        ConversionEntry {
            kind: PrimitiveKind::Double,
            copy: copy_elements::<8>,
            swap: Some(swap_elements::<8, 8>),
        },
        ConversionEntry {
            kind: PrimitiveKind::LongLong,
            copy: copy_elements::<8>,
            swap: Some(swap_elements::<8, 8>),
        },
        ConversionEntry {
            kind: PrimitiveKind::LongDouble,
            copy: copy_elements::<{ LONG_DOUBLE_SIZE }>,
            swap: None,
        },
        ConversionEntry {
            kind: PrimitiveKind::ComplexFloat,
            copy: copy_elements::<8>,
            swap: Some(swap_elements::<8, 4>),
        },
        ConversionEntry {
            kind: PrimitiveKind::ComplexDouble,
            copy: copy_elements::<16>,
            swap: Some(swap_elements::<16, 8>),
        },
    ],
};

impl ConversionTable {
    /// The built-in table.
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    pub fn entry(&self, kind: PrimitiveKind) -> &ConversionEntry {
        &self.entries[kind.index()]
    }

    /// Pick the routine that maps host primitives of `kind` to the
    /// representation of `remote`.
    pub fn resolve(&self, kind: PrimitiveKind, remote: &Architecture) -> Result<ConversionFn> {
        let remote_width = match kind {
            PrimitiveKind::Long => Some(remote.long_size),
            PrimitiveKind::LongDouble => Some(remote.long_double_size),
            _ => None,
        };
        if let Some(width) = remote_width {
            if width != kind.size() {
                return Err(Error::UnsupportedConversion {
                    kind,
                    reason: format!(
                        "remote width {} differs from host width {}",
                        width,
                        kind.size()
                    ),
                });
            }
        }

        let entry = self.entry(kind);
        if remote.endian == Endian::NATIVE {
            return Ok(entry.copy);
        }
        entry.swap.ok_or_else(|| Error::UnsupportedConversion {
            kind,
            reason: format!("no conversion to {}", remote.endian),
        })
    }
}

/// Routines resolved once per convertor for the kinds its descriptor uses.
pub(crate) struct ConversionPlan {
    routines: [ConversionFn; PrimitiveKind::COUNT],
    converting: bool,
}

impl ConversionPlan {
    pub(crate) fn new(descriptor: &Descriptor, remote: &Architecture) -> Result<Self> {
        let table = ConversionTable::standard();
        let mut routines = [table.entry(PrimitiveKind::Byte).copy; PrimitiveKind::COUNT];
        for kind in PrimitiveKind::ALL {
            routines[kind.index()] = table.entry(kind).copy;
        }
        for kind in descriptor.kinds() {
            routines[kind.index()] = table.resolve(kind, remote)?;
        }
        let converting = remote.endian != Endian::NATIVE
            && descriptor.kinds().any(|kind| kind.component_size() > 1);
        Ok(Self {
            routines,
            converting,
        })
    }

    #[inline]
    pub(crate) fn get(&self, kind: PrimitiveKind) -> ConversionFn {
        self.routines[kind.index()]
    }

    /// True when packed bytes differ from the host image.
    pub(crate) fn is_converting(&self) -> bool {
        self.converting
    }
}
