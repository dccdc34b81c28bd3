// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: the flat element stream, its builder, the committed
//! descriptor and the coalescing optimizer.

pub mod builder;
pub mod descriptor;
pub mod element;
mod optimizer;
pub mod primitive;

pub use builder::DescriptorBuilder;
pub use descriptor::{Descriptor, TypeSpec};
pub use element::{Element, LoopStart, PrimitiveRun};
pub use primitive::{PrimitiveKind, LONG_DOUBLE_SIZE, LONG_SIZE, MAX_PRIMITIVE_SIZE};
