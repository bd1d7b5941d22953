//! # pkgzip
//!
//! Packages a build system's manifest of files, directories, trees and
//! symlinks into a single deterministic ZIP archive.
//!
//! ## Key Modules
//!
//! - [`manifest`]: Decodes manifests and resolves them into a deduplicated,
//!   parent-complete, sorted entry list.
//! - [`archive`]: Writes resolved entries as ZIP records with fixed
//!   timestamps and packed unix modes.
//! - [`stamp`]: Picks the single timestamp shared by every record.
//! - [`cli_runner`]: Runs the whole pipeline.
//!
//! ## Examples
//!
//! ```no_run
//! use pkgzip::cli_runner::{build_package, PackageOptions};
//!
//! let mut options = PackageOptions::new("out/pkg.zip", "out/manifest.json");
//! options.directory = "/opt/app".into();
//! options.default_mode = "644".into();
//! let resolved = build_package(&options)?;
//! println!("{} entries", resolved.len());
//! # Ok::<(), pkgzip::PackageError>(())
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod error;
pub mod manifest;
pub mod stamp;

pub use archive::ArchiveWriter;
pub use error::{ErrorKind, PackageError, Result};
pub use manifest::{EntryKind, ManifestEntry, ResolvedManifest};
