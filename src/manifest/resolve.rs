//! Manifest resolution: prefixing, deduplication, parent synthesis, ordering.

use std::collections::BTreeMap;

use crate::common::{clean_archive_path, DEFAULT_DIR_MODE};
use crate::manifest::{EntryKind, ManifestEntry};

/// Joins `prefix` and `dest` with exactly one `/` and strips any leading `/`
/// from the result, so destinations are always archive-relative.
///
/// ```
/// use pkgzip::manifest::combine_paths;
/// assert_eq!(combine_paths("/usr/", "/lib/x"), "usr/lib/x");
/// assert_eq!(combine_paths("", "a/b"), "a/b");
/// ```
pub fn combine_paths(prefix: &str, dest: &str) -> String {
    let joined = format!("{}/{}", prefix.trim_end_matches('/'), dest.trim_start_matches('/'));
    joined.trim_start_matches('/').to_string()
}

/// Every proper ancestor of `dest` after lexical cleaning, nearest first.
/// The root is never included.
fn ancestors(dest: &str) -> Vec<String> {
    let cleaned = clean_archive_path(dest);
    let segments: Vec<&str> = cleaned.split('/').filter(|s| !s.is_empty()).collect();
    (1..segments.len())
        .rev()
        .map(|n| segments[..n].join("/"))
        .collect()
}

/// A deduplicated, parent-complete manifest sorted by destination.
///
/// Only [`resolve`] builds one, so for every value:
/// - destinations are unique and strictly ascending (byte order);
/// - every ancestor directory of every destination is present as an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedManifest {
    entries: Vec<ManifestEntry>,
}

impl ResolvedManifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destinations in archive order.
    pub fn dests(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.dest.as_str())
    }

    pub fn into_inner(self) -> Vec<ManifestEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a ResolvedManifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resolves raw manifest entries against a destination prefix.
///
/// Later entries replace earlier ones with the same combined destination in
/// full. Missing ancestor directories are synthesised as `0755` directories
/// owned by uid/gid 0.
pub fn resolve<I>(prefix: &str, raw_entries: I) -> ResolvedManifest
where
    I: IntoIterator<Item = ManifestEntry>,
{
    let mut by_dest: BTreeMap<String, ManifestEntry> = BTreeMap::new();
    for mut entry in raw_entries {
        entry.dest = combine_paths(prefix, &entry.dest);
        if let Some(previous) = by_dest.insert(entry.dest.clone(), entry) {
            tracing::debug!(dest = %previous.dest, origin = %previous.origin, "manifest entry overridden");
        }
    }

    // Walking every ancestor of every explicit entry reaches the fixed point
    // in one pass: a synthesised parent's own ancestors are on the same chain.
    let mut synthesized: BTreeMap<String, ManifestEntry> = BTreeMap::new();
    for (dest, entry) in &by_dest {
        for parent in ancestors(dest) {
            if by_dest.contains_key(&parent) || synthesized.contains_key(&parent) {
                continue;
            }
            tracing::debug!(dest = %parent, child = %dest, "synthesizing parent directory");
            let dir = ManifestEntry::new(EntryKind::Dir, parent.clone(), "", DEFAULT_DIR_MODE)
                .with_origin(format!("parent directory of {}", entry.origin));
            synthesized.insert(parent, dir);
        }
    }
    by_dest.extend(synthesized);

    ResolvedManifest {
        entries: by_dest.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(dest: &str, src: &str) -> ManifestEntry {
        ManifestEntry::new(EntryKind::File, dest, src, "")
    }

    #[test]
    fn test_combine_paths() {
        assert_eq!(combine_paths("/usr/", "/lib/x"), "usr/lib/x");
        assert_eq!(combine_paths("", "a/b"), "a/b");
        assert_eq!(combine_paths("/", "/a.txt"), "a.txt");
        assert_eq!(combine_paths("opt///", "///bin"), "opt/bin");
        assert_eq!(combine_paths("/", "/"), "");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        assert_eq!(ancestors("a/b/c"), vec!["a/b".to_string(), "a".to_string()]);
        assert!(ancestors("a").is_empty());
        assert!(ancestors("").is_empty());
        assert_eq!(ancestors("x/"), Vec::<String>::new());
    }

    #[test]
    fn test_dot_dot_segments_do_not_become_directories() {
        assert!(ancestors("a/../b").is_empty());
        assert_eq!(ancestors("a/./b/../c/d"), vec!["a/c".to_string(), "a".to_string()]);

        let resolved = resolve("/", vec![file("a/../b", "src")]);
        let dests: Vec<&str> = resolved.dests().collect();
        assert_eq!(dests, vec!["a/../b"]);
    }

    #[test]
    fn test_empty_manifest_resolves_to_nothing() {
        let resolved = resolve("/", Vec::new());
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let resolved = resolve("/", vec![file("/a", "first"), file("a", "second")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.entries()[0], file("a", "second"));
    }

    #[test]
    fn test_parent_synthesis_is_complete() {
        let resolved = resolve("", vec![file("a/b/c", "src").with_origin("//pkg:c")]);
        let dests: Vec<&str> = resolved.dests().collect();
        assert_eq!(dests, vec!["a", "a/b", "a/b/c"]);

        for parent in &resolved.entries()[..2] {
            assert_eq!(parent.kind, EntryKind::Dir);
            assert_eq!(parent.mode, "0755");
            assert_eq!(parent.uid, 0);
            assert!(parent.src.is_empty());
            assert_eq!(parent.origin, "parent directory of //pkg:c");
        }
    }

    #[test]
    fn test_explicit_parent_is_not_replaced() {
        let mut dir = ManifestEntry::new(EntryKind::Dir, "x", "", "0700");
        dir.user = "app".into();
        let resolved = resolve("/", vec![file("x/y.txt", "y"), dir.clone()]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.entries()[0], dir);
    }

    #[test]
    fn test_sorted_and_unique() {
        let resolved = resolve(
            "/pkg",
            vec![
                file("z", "1"),
                file("b/a", "2"),
                file("a-b", "3"),
                file("a/b", "4"),
                file("b/a", "5"),
            ],
        );
        let dests: Vec<&str> = resolved.dests().collect();
        assert_eq!(dests, vec!["pkg", "pkg/a", "pkg/a-b", "pkg/a/b", "pkg/b", "pkg/b/a", "pkg/z"]);
        assert!(dests.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_root_destination_is_kept() {
        let resolved = resolve("/", vec![ManifestEntry::new(EntryKind::Dir, "/", "", "")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.entries()[0].dest, "");
    }

    #[test]
    fn test_scenario_b_shape() {
        let resolved = resolve("/", vec![file("x/y.txt", "y")]);
        let entries = resolved.entries();
        assert_eq!(entries[0].kind, EntryKind::Dir);
        assert_eq!(entries[0].dest, "x");
        assert_eq!(entries[1].dest, "x/y.txt");
        assert_eq!(entries[1].mode, "");
    }
}
