//! # Packaging manifests
//!
//! A manifest is a JSON array of packaging actions emitted by the build
//! system. Each action names an archive destination, an optional filesystem
//! source and the metadata the record should carry:
//!
//! ```json
//! [
//!   {"type": "file", "dest": "/bin/tool", "src": "out/tool", "mode": "755",
//!    "user": "root", "group": "root", "uid": 0, "gid": 0, "origin": "//tools:tool"}
//! ]
//! ```
//!
//! Decoding lives here; deduplication, parent synthesis and ordering live in
//! [`resolve`].

pub mod resolve;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PackageError, Result};

pub use resolve::{combine_paths, resolve, ResolvedManifest};

/// The kind of packaging action an entry requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Take content from `src`.
    #[serde(rename = "file")]
    File,
    /// A zero-length file; `src` is ignored.
    #[serde(rename = "empty-file")]
    EmptyFile,
    /// An empty directory.
    #[serde(rename = "dir")]
    Dir,
    /// A tree artifact: recursively take the tree rooted at `src`.
    #[serde(rename = "tree")]
    Tree,
    /// A symlink `dest -> src`.
    #[serde(rename = "symlink")]
    Symlink,
}

impl EntryKind {
    /// Human-readable label used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::EmptyFile => "empty_file",
            EntryKind::Dir => "directory",
            EntryKind::Tree => "tree",
            EntryKind::Symlink => "symlink",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One requested packaging action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Archive-relative destination. Absolute until combined with the prefix.
    pub dest: String,
    /// Filesystem source for files and trees, link target for symlinks.
    #[serde(default)]
    pub src: String,
    /// Octal permission string; empty means "use the writer's default".
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub uid: i64,
    #[serde(default)]
    pub gid: i64,
    /// Free-text provenance, e.g. the build target that requested the entry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
}

impl ManifestEntry {
    /// Creates an entry with empty ownership and provenance.
    pub fn new(kind: EntryKind, dest: impl Into<String>, src: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            kind,
            dest: dest.into(),
            src: src.into(),
            mode: mode.into(),
            user: String::new(),
            group: String::new(),
            uid: 0,
            gid: 0,
            origin: String::new(),
        }
    }

    /// Sets the provenance string.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// Decodes a manifest from its JSON text.
pub fn parse_manifest(json: &str) -> serde_json::Result<Vec<ManifestEntry>> {
    serde_json::from_str(json)
}

/// Reads and decodes the manifest file at `path`.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = fs::read_to_string(path).map_err(|e| PackageError::io(e, path))?;
    parse_manifest(&content).map_err(|source| PackageError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}
