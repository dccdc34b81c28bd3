// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ddt-inspect CLI
//!
//! Inspect derived datatype layouts and push data through the convertor in
//! bounded chunks.
//!
//! # Usage
//!
//! ```bash
//! # Write an example layout file
//! ddt-inspect gen-config --output layouts.toml
//!
//! # Check every layout commits
//! ddt-inspect validate --config layouts.toml
//!
//! # Dump raw and optimized element lists
//! ddt-inspect show --config layouts.toml --layout int_blocks
//!
//! # Pack 3 instances from user memory into a stream, 64 bytes per call
//! ddt-inspect pack --config layouts.toml --layout int_blocks --count 3 \
//!     --input memory.bin --output stream.bin --chunk-size 64
//!
//! # And back
//! ddt-inspect unpack --config layouts.toml --layout int_blocks --count 3 \
//!     --input stream.bin --output memory.out
//! ```

mod layout;
mod run;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ddt::{DescriptorCache, Status};
use layout::{InspectConfig, EXAMPLE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Derived datatype inspector
#[derive(Parser, Debug)]
#[command(name = "ddt-inspect")]
#[command(about = "Inspect derived datatype layouts and drive chunked pack/unpack runs")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example layout file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "layouts.toml")]
        output: PathBuf,
    },

    /// Validate a layout file and commit every layout
    Validate {
        /// Layout file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print descriptor summaries and element lists
    Show {
        /// Layout file path
        #[arg(short, long)]
        config: PathBuf,

        /// Only this layout
        #[arg(short, long)]
        layout: Option<String>,

        /// Also report how many whole elements fit in this many packed bytes
        #[arg(long)]
        bytes: Option<usize>,
    },

    /// Pack user memory read from a file into a packed stream
    Pack {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Unpack a packed stream into user memory
    Unpack {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Layout file path
    #[arg(short, long)]
    config: PathBuf,

    /// Layout name
    #[arg(short, long)]
    layout: String,

    /// Number of instances
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Input file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Wire buffer size per call (overrides the layout file)
    #[arg(long)]
    chunk_size: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Show {
            config,
            layout,
            bytes,
        } => cmd_show(config, layout, bytes),
        Commands::Pack { run } => cmd_pack(run),
        Commands::Unpack { run } => cmd_unpack(run),
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<()> {
    std::fs::write(&output, EXAMPLE)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Example layout file written to: {}", output.display());
    Ok(())
}

fn cmd_validate(config: PathBuf) -> Result<()> {
    let file = InspectConfig::from_file(&config)
        .with_context(|| format!("loading {}", config.display()))?;
    let cache = DescriptorCache::with_predefined(file.layouts.len());
    let committed = file.commit_all(&cache)?;
    println!("Configuration is valid!");
    for (name, desc) in &committed {
        println!(
            "  {:<20} size {:>6}  extent {:>6}  depth {}  {}",
            name,
            desc.size(),
            desc.extent(),
            desc.max_nesting_depth(),
            if desc.is_contiguous() {
                "contiguous"
            } else {
                "strided"
            }
        );
    }
    Ok(())
}

fn cmd_show(config: PathBuf, only: Option<String>, bytes: Option<usize>) -> Result<()> {
    let file = InspectConfig::from_file(&config)
        .with_context(|| format!("loading {}", config.display()))?;
    let cache = DescriptorCache::with_predefined(file.layouts.len());
    for layout in &file.layouts {
        if only.as_deref().is_some_and(|name| name != layout.name) {
            continue;
        }
        let desc = layout.commit(&cache)?;
        println!("[{}]", layout.name);
        print!("{}", desc);
        println!(
            "elements per instance: {}",
            desc.kinds()
                .map(|kind| format!("{} x{}", kind, desc.kind_count(kind)))
                .collect::<Vec<_>>()
                .join(", ")
        );
        if let Some(bytes) = bytes {
            println!(
                "whole elements in {} bytes: {}",
                bytes,
                desc.element_count(bytes)
            );
        }
        println!();
    }
    Ok(())
}

fn cmd_pack(args: RunArgs) -> Result<()> {
    let file = InspectConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let cache = DescriptorCache::with_predefined(1);
    let desc = file.layout(&args.layout)?.commit(&cache)?;
    let chunk = args.chunk_size.unwrap_or(file.convertor.chunk_size);

    let src = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let (stream, report) = run::pack(desc, args.count, &src, file.convertor.to_config(), chunk)
        .with_context(|| format!("packing '{}'", args.layout))?;
    std::fs::write(&args.output, &stream)
        .with_context(|| format!("writing {}", args.output.display()))?;

    tracing::info!(
        calls = report.calls,
        bytes = report.bytes,
        elements = report.elements,
        fast_path = report.fast_path,
        "pack complete"
    );
    println!(
        "Packed {} bytes ({} elements) in {} calls of {} bytes",
        report.bytes, report.elements, report.calls, chunk
    );
    Ok(())
}

fn cmd_unpack(args: RunArgs) -> Result<()> {
    let file = InspectConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let cache = DescriptorCache::with_predefined(1);
    let desc = file.layout(&args.layout)?.commit(&cache)?;
    let chunk = args.chunk_size.unwrap_or(file.convertor.chunk_size);
    let expected = desc
        .packed_size(args.count)
        .context("packed size overflows")?;

    let stream = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if stream.len() > expected {
        tracing::warn!(
            surplus = stream.len() - expected,
            "input is longer than the packed size, extra bytes are ignored"
        );
    }
    let (dst, report) = run::unpack(
        desc.clone(),
        args.count,
        &stream,
        file.convertor.to_config(),
        chunk,
    )
    .with_context(|| format!("unpacking '{}'", args.layout))?;
    std::fs::write(&args.output, &dst)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Unpacked {} bytes ({} elements) in {} calls of {} bytes",
        report.bytes, report.elements, report.calls, chunk
    );
    if report.status != Status::Complete {
        bail!(
            "input ended after {} of {} bytes ({}), {} whole elements placed",
            report.bytes,
            expected,
            report.status,
            desc.element_count(report.bytes)
        );
    }
    Ok(())
}
