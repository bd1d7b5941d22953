//! Build-stamp handling: picks the single modification time used for every
//! record of an archive.
//!
//! The build system can provide a "volatile status" file with one
//! `KEY VALUE` pair per line. When given, its `BUILD_TIMESTAMP` value is used
//! as-is; otherwise the requested timestamp is clamped to the ZIP epoch.

use std::fs;
use std::path::Path;

use crate::common::ZIP_EPOCH;
use crate::error::{PackageError, Result};

const BUILD_TIMESTAMP_KEY: &str = "BUILD_TIMESTAMP";

/// Reads `BUILD_TIMESTAMP` from a status file.
pub fn read_build_timestamp(status_file: &Path) -> Result<i64> {
    let content = fs::read_to_string(status_file).map_err(|e| PackageError::io(e, status_file))?;
    parse_build_timestamp(&content, status_file)
}

fn parse_build_timestamp(content: &str, status_file: &Path) -> Result<i64> {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some(BUILD_TIMESTAMP_KEY) {
            continue;
        }
        let Some(value) = parts.next() else { continue };
        return value.parse::<i64>().map_err(|_| PackageError::InvalidStamp {
            path: status_file.to_path_buf(),
            value: value.to_string(),
        });
    }
    Err(PackageError::MissingStampKey { path: status_file.to_path_buf() })
}

/// Resolves the run's timestamp.
///
/// With a status file the stamp is taken verbatim (no epoch clamp); without
/// one the result is `max(ZIP_EPOCH, requested)`.
pub fn effective_timestamp(requested: i64, stamp_from: Option<&Path>) -> Result<i64> {
    match stamp_from {
        Some(path) => read_build_timestamp(path),
        None => Ok(requested.max(ZIP_EPOCH)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn status_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_clamps_to_zip_epoch() {
        assert_eq!(effective_timestamp(0, None).unwrap(), ZIP_EPOCH);
        assert_eq!(effective_timestamp(1_700_000_000, None).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_reads_build_timestamp() {
        let file = status_file("BUILD_HOST box\nBUILD_TIMESTAMP 1600000000\nBUILD_USER me\n");
        assert_eq!(effective_timestamp(0, Some(file.path())).unwrap(), 1_600_000_000);
    }

    #[test]
    fn test_status_file_bypasses_clamp() {
        let file = status_file("  BUILD_TIMESTAMP 1000000000  \n");
        assert_eq!(effective_timestamp(1_700_000_000, Some(file.path())).unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_missing_key() {
        let file = status_file("BUILD_HOST box\nBUILD_TIMESTAMP\n");
        let err = read_build_timestamp(file.path()).unwrap_err();
        assert!(matches!(err, PackageError::MissingStampKey { .. }));
    }

    #[test]
    fn test_non_integer_value() {
        let file = status_file("BUILD_TIMESTAMP soon\n");
        let err = read_build_timestamp(file.path()).unwrap_err();
        assert!(matches!(err, PackageError::InvalidStamp { ref value, .. } if value == "soon"));
    }
}
