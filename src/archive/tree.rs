//! Tree-artifact expansion.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::CompressionMethod;

use super::ArchiveWriter;
use crate::common::clean_archive_path;
use crate::error::{PackageError, Result};

/// Mode for directories found inside a tree, and for its files when the
/// entry has no mode of its own.
const TREE_MODE: u32 = 0o755;

fn join_dest(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => rel.to_string(),
        (false, false) => format!("{base}/{rel}"),
    }
}

/// Archive-style relative path (`/`-separated) of `path` below `top`.
fn relative_dest(top: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(top).map_err(|_| PackageError::StripPrefix {
        prefix: top.to_path_buf(),
        path: path.to_path_buf(),
    })?;
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(segments.join("/"))
}

impl ArchiveWriter {
    /// Expands the directory tree at `tree_top` under `dest`.
    ///
    /// The whole tree is walked before anything is written, so a walk error
    /// leaves no records from this tree behind. Records are emitted sorted by
    /// destination; the tree's own top becomes `"<dest>/"`.
    pub fn add_tree(&mut self, tree_top: &Path, dest: &str, mode: Option<u32>) -> Result<()> {
        let dest = clean_archive_path(dest);

        // dest -> source file; `None` marks a directory.
        let mut pending: BTreeMap<String, Option<PathBuf>> = BTreeMap::new();
        for entry in WalkDir::new(tree_top).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            let target = join_dest(&dest, &relative_dest(tree_top, entry.path())?);
            if entry.file_type().is_dir() {
                pending.insert(target, None);
            } else {
                pending.insert(target, Some(entry.into_path()));
            }
        }
        tracing::debug!(tree = %tree_top.display(), dest = %dest, records = pending.len(), "expanding tree");

        for (name, source) in pending {
            match source {
                Some(path) => {
                    let file_mode = match mode {
                        Some(m) => Some(m),
                        None if path.exists() => Some(TREE_MODE),
                        None => self.default_mode,
                    };
                    self.write_file(&name, &path, file_mode)?;
                }
                None if name.is_empty() => {}
                None => {
                    let options = self
                        .base_options()
                        .compression_method(CompressionMethod::Stored)
                        .unix_permissions(TREE_MODE);
                    self.write_dir_record(&name, options)?;
                }
            }
        }
        Ok(())
    }
}
