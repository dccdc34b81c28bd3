// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout file.
//!
//! A TOML file with an optional `[convertor]` section and one or more
//! `[[layout]]` tables describing element streams:
//!
//! ```toml
//! [convertor]
//! chunk_size = 1500
//!
//! [[layout]]
//! name = "blocks"
//! elements = [
//!   { loop = 4, extent = 96, body = [
//!     { primitive = "int", count = 5, disp = 0 },
//!     { primitive = "int", count = 5, disp = 32 },
//!   ] },
//! ]
//! ```

use ddt::{
    Architecture, ConvertorConfig, Descriptor, DescriptorBuilder, DescriptorCache, PrimitiveKind,
    TypeSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Layout file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Layout '{name}': {source}")]
    Layout {
        name: String,
        #[source]
        source: ddt::Error,
    },
}

/// Whole layout file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectConfig {
    #[serde(default)]
    pub convertor: ConvertorSection,

    #[serde(default, rename = "layout")]
    pub layouts: Vec<LayoutDef>,
}

/// `[convertor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertorSection {
    /// Peer architecture; the host when omitted.
    #[serde(default)]
    pub remote: Architecture,

    #[serde(default)]
    pub force_general_path: bool,

    #[serde(default = "default_true")]
    pub use_optimized: bool,

    /// Wire buffer size for each pack/unpack call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1500
}

impl Default for ConvertorSection {
    fn default() -> Self {
        Self {
            remote: Architecture::host(),
            force_general_path: false,
            use_optimized: true,
            chunk_size: default_chunk_size(),
        }
    }
}

impl ConvertorSection {
    pub fn to_config(&self) -> ConvertorConfig {
        ConvertorConfig {
            remote: self.remote,
            force_general_path: self.force_general_path,
            use_optimized: self.use_optimized,
        }
    }
}

/// One `[[layout]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<isize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<isize>,

    /// Declared size, checked against the elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,

    pub elements: Vec<ElementDef>,
}

/// Entry of an `elements` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementDef {
    Primitive {
        primitive: String,
        #[serde(default = "default_count")]
        count: usize,
        /// Stride between primitives; the primitive width when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extent: Option<usize>,
        #[serde(default)]
        disp: isize,
    },
    Loop {
        #[serde(rename = "loop")]
        count: usize,
        extent: usize,
        body: Vec<ElementDef>,
    },
}

fn default_count() -> usize {
    1
}

impl InspectConfig {
    /// Load and validate a layout file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layouts.is_empty() {
            return Err(ConfigError::Invalid("No layouts defined".into()));
        }
        if self.convertor.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be non-zero".into()));
        }
        self.convertor
            .to_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut seen = HashSet::new();
        for layout in &self.layouts {
            if layout.name.is_empty() {
                return Err(ConfigError::Invalid("Layout with empty name".into()));
            }
            if !seen.insert(layout.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate layout name '{}'",
                    layout.name
                )));
            }
        }
        Ok(())
    }

    pub fn layout(&self, name: &str) -> Result<&LayoutDef, ConfigError> {
        self.layouts
            .iter()
            .find(|layout| layout.name == name)
            .ok_or_else(|| ConfigError::Invalid(format!("No layout named '{}'", name)))
    }

    /// Commit every layout through `cache`, in file order.
    pub fn commit_all(
        &self,
        cache: &DescriptorCache,
    ) -> Result<Vec<(String, Arc<Descriptor>)>, ConfigError> {
        self.layouts
            .iter()
            .map(|layout| Ok((layout.name.clone(), layout.commit(cache)?)))
            .collect()
    }
}

impl LayoutDef {
    /// Flatten the nested definition into a build request.
    pub fn to_spec(&self) -> Result<TypeSpec, ConfigError> {
        let mut builder = DescriptorBuilder::new();
        for element in &self.elements {
            builder = self.emit(builder, element)?;
        }
        builder = match (self.lower_bound, self.upper_bound) {
            (Some(lower), Some(upper)) => builder.bounds(lower, upper),
            (None, None) => builder,
            _ => {
                return Err(self.invalid("lower_bound and upper_bound must be given together"));
            }
        };
        if let Some(size) = self.size {
            builder = builder.declared_size(size);
        }
        builder.spec().map_err(|source| ConfigError::Layout {
            name: self.name.clone(),
            source,
        })
    }

    /// Commit through `cache`, reusing an entry already committed under
    /// this name.
    pub fn commit(&self, cache: &DescriptorCache) -> Result<Arc<Descriptor>, ConfigError> {
        let spec = self.to_spec()?;
        cache
            .get_or_try_build(&self.name, || Descriptor::build(spec))
            .map_err(|source| ConfigError::Layout {
                name: self.name.clone(),
                source,
            })
    }

    fn emit(
        &self,
        builder: DescriptorBuilder,
        element: &ElementDef,
    ) -> Result<DescriptorBuilder, ConfigError> {
        match element {
            ElementDef::Primitive {
                primitive,
                count,
                extent,
                disp,
            } => {
                let kind = PrimitiveKind::from_name(primitive)
                    .ok_or_else(|| self.invalid(format!("unknown primitive '{}'", primitive)))?;
                let extent = extent.unwrap_or_else(|| kind.size());
                Ok(builder.strided(kind, *count, extent, *disp))
            }
            ElementDef::Loop {
                count,
                extent,
                body,
            } => {
                let mut builder = builder.begin_loop(*count, *extent);
                for inner in body {
                    builder = self.emit(builder, inner)?;
                }
                Ok(builder.end_loop())
            }
        }
    }

    fn invalid(&self, reason: impl std::fmt::Display) -> ConfigError {
        ConfigError::Invalid(format!("Layout '{}': {}", self.name, reason))
    }
}

/// Layout file written by `gen-config`.
pub const EXAMPLE: &str = r#"# ddt-inspect layout file

[convertor]
chunk_size = 1500
force_general_path = false
use_optimized = true

# Peer representation; omit for the host.
# [convertor.remote]
# endian = "big"

# Every other double of a 20-slot array.
[[layout]]
name = "strided_doubles"
lower_bound = 0
upper_bound = 152
elements = [
  { loop = 10, extent = 16, body = [
    { primitive = "double", count = 1, disp = 0 },
  ] },
]

# 4 x { 5 ints @0, 5 ints @32, 5 ints @64 }
[[layout]]
name = "int_blocks"
elements = [
  { loop = 4, extent = 96, body = [
    { primitive = "int", count = 5, disp = 0 },
    { primitive = "int", count = 5, disp = 32 },
    { primitive = "int", count = 5, disp = 64 },
  ] },
]

# Padded struct { char; double; short[3]; }
[[layout]]
name = "padded_struct"
lower_bound = 0
upper_bound = 24
elements = [
  { primitive = "char", disp = 0 },
  { primitive = "double", disp = 8 },
  { primitive = "short", count = 3, disp = 16 },
]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_example_parses_and_commits() {
        let config = InspectConfig::parse(EXAMPLE).expect("example");
        assert_eq!(config.layouts.len(), 3);
        assert_eq!(config.convertor.chunk_size, 1500);

        let cache = DescriptorCache::new(8);
        let committed = config.commit_all(&cache).expect("commit");
        let (name, strided) = &committed[0];
        assert_eq!(name, "strided_doubles");
        assert_eq!(strided.size(), 80);
        assert_eq!(strided.extent(), 152);

        let blocks = config.layout("int_blocks").expect("layout").commit(&cache).expect("commit");
        assert!(Arc::ptr_eq(&blocks, &committed[1].1));
        assert_eq!(blocks.element_total(), 60);

        let padded = &committed[2].1;
        assert_eq!(padded.size(), 15);
        assert_eq!(padded.extent(), 24);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("layouts.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(EXAMPLE.as_bytes()).expect("write");
        drop(file);

        let config = InspectConfig::from_file(&path).expect("load");
        assert!(config.layout("padded_struct").is_ok());
        assert!(matches!(
            config.layout("missing"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let result = InspectConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            InspectConfig::parse(""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = r#"
[[layout]]
name = "a"
elements = [{ primitive = "int" }]

[[layout]]
name = "a"
elements = [{ primitive = "byte" }]
"#;
        match InspectConfig::parse(content) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("Duplicate")),
            other => panic!("unexpected parse result {:?}", other),
        }
    }

    #[test]
    fn test_unknown_primitive_rejected() {
        let content = r#"
[[layout]]
name = "odd"
elements = [{ primitive = "quad" }]
"#;
        let config = InspectConfig::parse(content).expect("parse");
        match config.layouts[0].to_spec() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("unknown primitive 'quad'")),
            other => panic!("unexpected spec result {:?}", other),
        }
    }

    #[test]
    fn test_size_mismatch_reports_layout() {
        let content = r#"
[[layout]]
name = "sized"
size = 9
elements = [{ primitive = "int", count = 2 }]
"#;
        let config = InspectConfig::parse(content).expect("parse");
        let cache = DescriptorCache::new(2);
        match config.layouts[0].commit(&cache) {
            Err(ConfigError::Layout { name, source }) => {
                assert_eq!(name, "sized");
                assert!(matches!(source, ddt::Error::MalformedDescriptor(_)));
            }
            other => panic!("unexpected commit result {:?}", other),
        }
    }

    #[test]
    fn test_big_endian_remote_section() {
        let content = r#"
[convertor]
chunk_size = 7

[convertor.remote]
endian = "big"

[[layout]]
name = "one"
elements = [{ primitive = "short", count = 4, extent = 4 }]
"#;
        let config = InspectConfig::parse(content).expect("parse");
        let convertor = config.convertor.to_config();
        assert_eq!(convertor.remote.endian, ddt::Endian::Big);
        assert_eq!(convertor.remote.long_size, Architecture::host().long_size);
        assert!(convertor.use_optimized);
        let spec = config.layouts[0].to_spec().expect("spec");
        assert_eq!(spec.elements.len(), 1);
    }
}
