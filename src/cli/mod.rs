use clap::Parser;
use std::path::PathBuf;

use crate::common::ZIP_EPOCH;

/// Packages the contents of a build manifest into a deterministic ZIP archive.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The output zip file path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// An absolute path to use as a prefix for all files in the zip.
    #[arg(short, long, default_value = "/")]
    pub directory: String,

    /// The unix time to use for files added into the zip. Values prior to Jan 1, 1980 are ignored.
    #[arg(short, long, default_value_t = ZIP_EPOCH, allow_negative_numbers = true)]
    pub timestamp: i64,

    /// Status file to read BUILD_TIMESTAMP from. Overrides --timestamp when set.
    #[arg(long = "stamp_from")]
    pub stamp_from: Option<PathBuf>,

    /// The file system mode (octal) to use for entries that do not carry one.
    #[arg(short, long, default_value = "")]
    pub mode: String,

    /// The compression type to use: "deflated" or "stored". [default: deflated]
    #[arg(short = 'c', long = "compression_type", default_value = "")]
    pub compression_type: String,

    /// The compression level to use.
    #[arg(short = 'l', long = "compression_level", default_value = "")]
    pub compression_level: String,

    /// Manifest of contents to add to the archive.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Log every record written.
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print the resolved destinations.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parses command-line arguments using `clap`.
///
/// Exits the process with a usage message if parsing fails.
pub fn run() -> Args {
    Args::parse()
}
