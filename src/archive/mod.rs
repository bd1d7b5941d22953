//! # Deterministic ZIP writer
//!
//! Maps resolved manifest entries onto ZIP records. Every record written by
//! one [`ArchiveWriter`] carries the same modification time, and its external
//! attributes hold a unix mode in the upper 16 bits: the entry's own mode when
//! it has one, else the writer's default mode.
//!
//! Output is streamed into a temporary file next to the requested path and
//! only moved into place by [`ArchiveWriter::close`], so an aborted run never
//! leaves a truncated archive at the output path.

mod tree;

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::common::parse_mode;
use crate::error::{PackageError, Result};
use crate::manifest::{EntryKind, ManifestEntry};

/// Mode used for symlink records when neither the entry nor the writer has one.
const DEFAULT_SYMLINK_MODE: u32 = 0o777;

/// Files at or above this size need ZIP64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Streams `reader` into `writer`. Read failures are attributed to `src`,
/// write failures to the archive at `output`.
fn copy_record<R: Read, W: Write>(reader: &mut R, writer: &mut W, src: &Path, output: &Path) -> Result<u64> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PackageError::io(e, src)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|source| PackageError::Output { source, path: output.to_path_buf() })?;
        copied += n as u64;
    }
}

/// Compression applied to file records. Directory and symlink records are
/// always stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compression {
    pub method: CompressionMethod,
    /// `None` lets the codec pick its default level.
    pub level: Option<i32>,
}

impl Compression {
    /// Parses the compression type (`"deflated"`, `"stored"`, or `""` for
    /// deflated) and the optional integer level.
    pub fn parse(compression_type: &str, compression_level: &str) -> Result<Self> {
        let method = match compression_type {
            "deflated" | "" => CompressionMethod::Deflated,
            "stored" => CompressionMethod::Stored,
            other => {
                return Err(PackageError::InvalidConfig(format!("invalid compression type: {other}")));
            }
        };

        if compression_level.is_empty() {
            return Ok(Self { method, level: None });
        }
        let level: i32 = compression_level.parse().map_err(|_| {
            PackageError::InvalidConfig(format!("invalid compression level: {compression_level}"))
        })?;

        if method == CompressionMethod::Stored {
            tracing::debug!(level, "compression level ignored for stored records");
            return Ok(Self { method, level: None });
        }
        if !(0..=9).contains(&level) {
            return Err(PackageError::InvalidConfig(format!(
                "compression level {level} out of range 0-9 for deflated"
            )));
        }
        Ok(Self { method, level: Some(level) })
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self { method: CompressionMethod::Deflated, level: None }
    }
}

/// Converts a unix timestamp (UTC) into a ZIP modification time.
pub fn zip_datetime(unix_ts: i64) -> Result<DateTime> {
    let out_of_range =
        || PackageError::InvalidConfig(format!("timestamp {unix_ts} cannot be represented in a zip archive"));
    let utc = chrono::DateTime::from_timestamp(unix_ts, 0).ok_or_else(out_of_range)?;
    let year = u16::try_from(utc.year()).map_err(|_| out_of_range())?;
    DateTime::from_date_and_time(
        year,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    )
    .map_err(|_| out_of_range())
}

/// Writes manifest entries into a single ZIP archive.
///
/// Single-threaded; entries are written in the order they are added.
pub struct ArchiveWriter {
    output_path: PathBuf,
    zip: ZipWriter<BufWriter<NamedTempFile>>,
    timestamp: DateTime,
    default_mode: Option<u32>,
    compression: Compression,
    records_written: usize,
    /// Directory record names already emitted, with trailing `/`.
    dirs_written: HashSet<String>,
}

impl ArchiveWriter {
    /// Validates the settings and opens the output for writing.
    ///
    /// # Arguments
    /// * `output_path` - Where the finished archive is placed by [`close`](Self::close).
    /// * `timestamp` - Unix time stamped on every record.
    /// * `default_mode` - Octal mode for entries without their own; empty means `0`.
    /// * `compression_type` - `"deflated"`, `"stored"` or `""` (deflated).
    /// * `compression_level` - Integer level, or empty for the codec default.
    ///
    /// All settings are checked before anything is created on disk.
    pub fn new(
        output_path: impl AsRef<Path>,
        timestamp: i64,
        default_mode: &str,
        compression_type: &str,
        compression_level: &str,
    ) -> Result<Self> {
        let compression = Compression::parse(compression_type, compression_level)?;
        let default_mode = parse_mode(default_mode)
            .map_err(|_| PackageError::InvalidConfig(format!("invalid default mode: {default_mode}")))?;
        let timestamp = zip_datetime(timestamp)?;

        let output_path = output_path.as_ref().to_path_buf();
        let dir = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".pkgzip-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| PackageError::Output { source, path: output_path.clone() })?;
        tracing::debug!(output = %output_path.display(), temp = %temp.path().display(), "opened archive");

        Ok(Self {
            output_path,
            zip: ZipWriter::new(BufWriter::with_capacity(1024 * 1024, temp)),
            timestamp,
            default_mode,
            compression,
            records_written: 0,
            dirs_written: HashSet::new(),
        })
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Adds one manifest entry. Trees expand into one record per walked node.
    pub fn add(&mut self, entry: &ManifestEntry) -> Result<()> {
        let mode = parse_mode(&entry.mode)?;
        let name = entry.dest.trim_end_matches('/');

        match entry.kind {
            EntryKind::File => self.write_file(name, Path::new(&entry.src), mode),
            EntryKind::EmptyFile => {
                let options = self.file_options(mode);
                self.zip.start_file(name, options)?;
                self.record_written(name, entry.kind);
                Ok(())
            }
            EntryKind::Dir => self.write_dir(name, mode),
            EntryKind::Tree => self.add_tree(Path::new(&entry.src), &entry.dest, mode),
            EntryKind::Symlink => {
                let link_mode = mode.or(self.default_mode).unwrap_or(DEFAULT_SYMLINK_MODE);
                let options = self.base_options().unix_permissions(link_mode);
                self.zip.add_symlink(name, entry.src.as_str(), options)?;
                self.record_written(name, entry.kind);
                Ok(())
            }
        }
    }

    /// Finalises the archive and moves it to the output path.
    pub fn close(mut self) -> Result<()> {
        let buffered = self.zip.finish()?;
        let temp = buffered.into_inner().map_err(|e| PackageError::Output {
            source: e.into_error(),
            path: self.output_path.clone(),
        })?;
        temp.as_file()
            .sync_all()
            .map_err(|source| PackageError::Output { source, path: self.output_path.clone() })?;
        temp.persist(&self.output_path)?;
        tracing::info!(
            output = %self.output_path.display(),
            records = self.records_written,
            "archive written"
        );
        Ok(())
    }

    fn base_options(&self) -> FileOptions {
        FileOptions::default().last_modified_time(self.timestamp)
    }

    /// Options for a content record: writer compression plus the entry's
    /// mode, falling back to the writer default.
    fn file_options(&self, mode: Option<u32>) -> FileOptions {
        self.base_options()
            .compression_method(self.compression.method)
            .compression_level(self.compression.level)
            .unix_permissions(mode.or(self.default_mode).unwrap_or(0))
    }

    fn dir_options(&self, mode: Option<u32>) -> FileOptions {
        self.base_options()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(mode.or(self.default_mode).unwrap_or(0))
    }

    fn write_file(&mut self, name: &str, src: &Path, mode: Option<u32>) -> Result<()> {
        let mut file = File::open(src).map_err(|e| PackageError::io(e, src))?;
        let size = file.metadata().map_err(|e| PackageError::io(e, src))?.len();
        let options = self.file_options(mode).large_file(size >= ZIP64_THRESHOLD);

        self.zip.start_file(name, options)?;
        copy_record(&mut file, &mut self.zip, src, &self.output_path)?;
        self.record_written(name, EntryKind::File);
        Ok(())
    }

    fn write_dir(&mut self, name: &str, mode: Option<u32>) -> Result<()> {
        let name = name.trim_end_matches('/');
        if name.is_empty() {
            // The archive root has no record of its own.
            tracing::debug!("skipping root directory entry");
            return Ok(());
        }
        let options = self.dir_options(mode);
        self.write_dir_record(name, options)
    }

    /// Writes `"<name>/"` unless a record of that name was already written,
    /// e.g. by an enclosing tree artifact.
    fn write_dir_record(&mut self, name: &str, options: FileOptions) -> Result<()> {
        let dir_name = format!("{name}/");
        if self.dirs_written.contains(&dir_name) {
            tracing::debug!(name = %dir_name, "directory record already written");
            return Ok(());
        }
        self.zip.add_directory(dir_name.as_str(), options)?;
        self.record_written(&dir_name, EntryKind::Dir);
        self.dirs_written.insert(dir_name);
        Ok(())
    }

    fn record_written(&mut self, name: &str, kind: EntryKind) {
        self.records_written += 1;
        tracing::debug!(name, kind = %kind, "record written");
    }
}
