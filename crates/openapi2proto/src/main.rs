//! CLI for `openapi2proto`.
//!
//! ```text
//! # Print the .proto to stdout, package derived from info.title
//! openapi2proto api/openapi.yaml
//!
//! # Explicit package, project config, files on disk
//! openapi2proto api/openapi.yaml petstore.v1 \
//!   --config api/openapi2proto.yaml \
//!   --output proto/petstore/v1/petstore.proto \
//!   --descriptor-out target/petstore.bin
//! ```
//!
//! Diagnostics go to stderr; set `RUST_LOG=openapi2proto=debug` for detail.

#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use openapi2proto::{CompileConfig, Document, ProjectConfig};
use prost::Message;
use tracing_subscriber::EnvFilter;

/// Compile an `OpenAPI` v3 document into a proto3 file.
#[derive(Parser)]
#[command(name = "openapi2proto", version, about)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the `OpenAPI` document (YAML, or JSON with a `.json` extension).
    file: PathBuf,

    /// Protobuf package. Overrides the config file; derived from `info.title` when unset.
    package: Option<String>,

    /// Path to a project config YAML file.
    ///
    /// CLI flags override values from the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the `.proto` source here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the binary `FileDescriptorSet` here.
    #[arg(long)]
    descriptor_out: Option<PathBuf>,

    /// Attach `google.api.http` rules to every RPC.
    #[arg(long)]
    annotations: bool,

    /// Emit messages only, no service.
    #[arg(long)]
    skip_rpc: bool,

    /// Skip operations marked deprecated.
    #[arg(long)]
    skip_deprecated: bool,

    /// Do not prefix enum values with the enum name.
    #[arg(long)]
    no_enum_prefix: bool,

    /// Emit not-required scalars as `google.protobuf.*Value` wrappers.
    #[arg(long)]
    wrap_primitives: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let project = match &cli.config {
        Some(path) => {
            eprintln!("Loading config: {}", path.display());
            ProjectConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => ProjectConfig::default(),
    };
    let config = apply_cli_overrides(CompileConfig::new().with_project_config(&project), &cli);

    let doc = Document::load(&cli.file)
        .with_context(|| format!("Failed to load document: {}", cli.file.display()))?;
    let set = openapi2proto::compile_to_set(&doc, &config)
        .with_context(|| format!("Failed to compile {}", cli.file.display()))?;

    if let Some(path) = &cli.descriptor_out {
        fs::write(path, set.encode_to_vec())
            .with_context(|| format!("Failed to write descriptor: {}", path.display()))?;
        eprintln!("Wrote descriptor set to {}", path.display());
    }

    let text: String = set.file.iter().map(openapi2proto::print_file).collect();
    match &cli.output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }

    Ok(())
}

/// Apply CLI flags that override config file values.
///
/// Boolean flags only turn behavior on (or, for `--no-enum-prefix`, off);
/// an unset flag keeps the config file's value.
fn apply_cli_overrides(mut config: CompileConfig, cli: &Cli) -> CompileConfig {
    if let Some(package) = &cli.package {
        config = config.package_name(package);
    }
    if cli.annotations {
        config = config.use_annotation(true);
    }
    if cli.skip_rpc {
        config = config.skip_rpc(true);
    }
    if cli.skip_deprecated {
        config = config.skip_deprecated_rpc(true);
    }
    if cli.no_enum_prefix {
        config = config.prefix_enum_values(false);
    }
    if cli.wrap_primitives {
        config = config.wrap_primitives(true);
    }
    config
}
