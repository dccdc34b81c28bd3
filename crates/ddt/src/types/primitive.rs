// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive type tags.
//!
//! The tag indexes the conversion table, so the discriminants are dense and
//! start at zero.

use std::fmt;

/// Width of C `long` on the host.
pub const LONG_SIZE: usize = std::mem::size_of::<core::ffi::c_long>();

#[cfg(target_os = "windows")]
pub const LONG_DOUBLE_SIZE: usize = 8;
#[cfg(not(target_os = "windows"))]
pub const LONG_DOUBLE_SIZE: usize = 16;

/// Largest primitive width; sizes the partial-element staging slot.
pub const MAX_PRIMITIVE_SIZE: usize = 16;

/// Base primitive types a descriptor element can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrimitiveKind {
    Char,
    Byte,
    Short,
    Int,
    Float,
    Long,
    Double,
    LongLong,
    LongDouble,
    ComplexFloat,
    ComplexDouble,
}

impl PrimitiveKind {
    /// Number of primitive kinds (conversion table length).
    pub const COUNT: usize = 11;

    /// Every kind, in tag order.
    pub const ALL: [PrimitiveKind; Self::COUNT] = [
        PrimitiveKind::Char,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Float,
        PrimitiveKind::Long,
        PrimitiveKind::Double,
        PrimitiveKind::LongLong,
        PrimitiveKind::LongDouble,
        PrimitiveKind::ComplexFloat,
        PrimitiveKind::ComplexDouble,
    ];

    /// Dense table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Host width in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Char | Self::Byte => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long => LONG_SIZE,
            Self::Double | Self::LongLong | Self::ComplexFloat => 8,
            Self::LongDouble => LONG_DOUBLE_SIZE,
            Self::ComplexDouble => 16,
        }
    }

    /// Width of each independently byte-ordered component.
    ///
    /// Complex values are a pair of reals, each swapped on its own.
    #[must_use]
    pub const fn component_size(self) -> usize {
        match self {
            Self::ComplexFloat => 4,
            Self::ComplexDouble => 8,
            other => other.size(),
        }
    }

    /// Snake-case name, as used in layout files and dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Long => "long",
            Self::Double => "double",
            Self::LongLong => "long_long",
            Self::LongDouble => "long_double",
            Self::ComplexFloat => "complex_float",
            Self::ComplexDouble => "complex_double",
        }
    }

    /// Inverse of [`PrimitiveKind::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_dense() {
        for (i, kind) in PrimitiveKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_sizes_match_host_types() {
        assert_eq!(PrimitiveKind::Short.size(), std::mem::size_of::<i16>());
        assert_eq!(PrimitiveKind::Int.size(), std::mem::size_of::<i32>());
        assert_eq!(PrimitiveKind::Float.size(), std::mem::size_of::<f32>());
        assert_eq!(PrimitiveKind::Double.size(), std::mem::size_of::<f64>());
        assert_eq!(PrimitiveKind::LongLong.size(), std::mem::size_of::<i64>());
        assert_eq!(PrimitiveKind::ComplexDouble.size(), 2 * std::mem::size_of::<f64>());
        assert!(PrimitiveKind::ALL
            .iter()
            .all(|kind| kind.size() <= MAX_PRIMITIVE_SIZE));
    }

    #[test]
    fn test_complex_components_split_in_half() {
        assert_eq!(PrimitiveKind::ComplexFloat.component_size() * 2, 8);
        assert_eq!(PrimitiveKind::ComplexDouble.component_size() * 2, 16);
        assert_eq!(PrimitiveKind::Int.component_size(), 4);
    }

    #[test]
    fn test_name_roundtrip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("quad"), None);
    }
}
