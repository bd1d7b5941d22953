//! Wires the pieces together: timestamp, manifest loading, resolution and
//! archive writing. Shared by the binary and by callers that drive the
//! pipeline without a command line.

use std::io::{self, Write};
use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::archive::ArchiveWriter;
use crate::cli::{self, Args};
use crate::common::ZIP_EPOCH;
use crate::error::{PackageError, Result};
use crate::manifest::{self, ResolvedManifest};
use crate::stamp;

/// Everything one packaging run needs.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub output: PathBuf,
    /// Prefix joined onto every manifest destination.
    pub directory: String,
    pub timestamp: i64,
    /// Status file whose `BUILD_TIMESTAMP` replaces `timestamp`.
    pub stamp_from: Option<PathBuf>,
    pub default_mode: String,
    pub compression_type: String,
    pub compression_level: String,
    pub manifest: PathBuf,
}

impl PackageOptions {
    pub fn new(output: impl Into<PathBuf>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            directory: "/".to_string(),
            timestamp: ZIP_EPOCH,
            stamp_from: None,
            default_mode: String::new(),
            compression_type: String::new(),
            compression_level: String::new(),
            manifest: manifest.into(),
        }
    }
}

impl From<&Args> for PackageOptions {
    fn from(args: &Args) -> Self {
        Self {
            output: args.output.clone(),
            directory: args.directory.clone(),
            timestamp: args.timestamp,
            stamp_from: args.stamp_from.clone(),
            default_mode: args.mode.clone(),
            compression_type: args.compression_type.clone(),
            compression_level: args.compression_level.clone(),
            manifest: args.manifest.clone(),
        }
    }
}

/// Runs one packaging pass and returns the manifest that was archived.
///
/// The first error aborts the run; nothing is placed at `options.output`
/// unless every entry was written.
pub fn build_package(options: &PackageOptions) -> Result<ResolvedManifest> {
    build_package_with_listing(options, &mut io::sink())
}

/// Like [`build_package`], but writes the resolved destinations to `listing`
/// as soon as the manifest is resolved, before the archive is opened. The
/// listing is therefore complete even when a later entry fails.
pub fn build_package_with_listing<W: Write>(options: &PackageOptions, listing: &mut W) -> Result<ResolvedManifest> {
    let timestamp = stamp::effective_timestamp(options.timestamp, options.stamp_from.as_deref())?;
    let raw = manifest::load_manifest(&options.manifest)?;
    let resolved = manifest::resolve(&options.directory, raw);
    print_destinations(&resolved, listing).map_err(|e| PackageError::io(e, "<listing>"))?;

    let mut writer = ArchiveWriter::new(
        &options.output,
        timestamp,
        &options.default_mode,
        &options.compression_type,
        &options.compression_level,
    )?;
    for entry in &resolved {
        writer.add(entry)?;
    }
    writer.close()?;
    Ok(resolved)
}

/// Writes the resolved destinations, one per line, in archive order.
pub fn print_destinations<W: Write>(resolved: &ResolvedManifest, out: &mut W) -> io::Result<()> {
    for dest in resolved.dests() {
        writeln!(out, "{}", dest)?;
    }
    out.flush()
}

fn init_tracing(verbose: bool) {
    let default = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Public entry for running the CLI.
pub fn run_cli_app() -> Result<()> {
    let args = cli::run();
    init_tracing(args.verbose);

    let options = PackageOptions::from(&args);
    if args.quiet {
        build_package(&options)?;
    } else {
        build_package_with_listing(&options, &mut io::stdout().lock())?;
    }
    Ok(())
}
