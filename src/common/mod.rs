//! Common utilities and constants shared by the resolver and the writer.

use crate::error::{PackageError, Result};

/// 1980-01-01T00:00:00Z, the earliest instant a ZIP (DOS) timestamp can hold.
pub const ZIP_EPOCH: i64 = 315_532_800;

/// Mode given to directories the resolver synthesises, and to directories and
/// files expanded from a tree artifact.
pub const DEFAULT_DIR_MODE: &str = "0755";

/// Highest mode a ZIP record can carry: the `rwx` bits for owner, group and
/// other. Setuid, setgid and sticky bits are not representable.
pub const MAX_MODE: u32 = 0o777;

/// Parses a symbolic mode string into permission bits.
///
/// An empty string means "no override" and yields `None`. Otherwise the
/// string must be an octal number no greater than [`MAX_MODE`], optionally
/// prefixed with `0o` (e.g. `"644"`, `"0755"`, `"0o755"`).
pub fn parse_mode(mode: &str) -> Result<Option<u32>> {
    let trimmed = mode.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    match u32::from_str_radix(digits, 8) {
        Ok(bits) if bits <= MAX_MODE => Ok(Some(bits)),
        _ => Err(PackageError::InvalidMode { mode: mode.to_string() }),
    }
}

/// Lexically normalises a `/`-separated archive path: drops empty and `.`
/// segments and resolves `..` against the preceding segment. The result has
/// no leading or trailing `/`.
pub fn clean_archive_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_octal_forms() {
        assert_eq!(parse_mode("644").unwrap(), Some(0o644));
        assert_eq!(parse_mode("0755").unwrap(), Some(0o755));
        assert_eq!(parse_mode("0o755").unwrap(), Some(0o755));
        assert_eq!(parse_mode("").unwrap(), None);
    }

    #[test]
    fn test_parse_mode_rejects_garbage() {
        assert!(matches!(parse_mode("rwxr-xr-x"), Err(PackageError::InvalidMode { .. })));
        assert!(matches!(parse_mode("0o"), Err(PackageError::InvalidMode { .. })));
        assert!(matches!(parse_mode("789"), Err(PackageError::InvalidMode { .. })));
    }

    #[test]
    fn test_parse_mode_rejects_special_bits() {
        assert_eq!(parse_mode("0777").unwrap(), Some(0o777));
        assert!(matches!(parse_mode("4755"), Err(PackageError::InvalidMode { ref mode }) if mode == "4755"));
        assert!(matches!(parse_mode("1777"), Err(PackageError::InvalidMode { .. })));
        assert!(matches!(parse_mode("0o2755"), Err(PackageError::InvalidMode { .. })));
    }

    #[test]
    fn test_clean_archive_path() {
        assert_eq!(clean_archive_path("t/"), "t");
        assert_eq!(clean_archive_path("./a//b/../c"), "a/c");
        assert_eq!(clean_archive_path("a/../b"), "b");
        assert_eq!(clean_archive_path("../x"), "x");
        assert_eq!(clean_archive_path(""), "");
    }
}
