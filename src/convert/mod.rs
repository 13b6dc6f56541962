//! Extension change with format conversion.
//!
//! A conversion request pairs a snapshot of one file with a normalized target
//! extension. The pipeline tries an ordered cascade of converters and reports
//! exactly one tagged outcome per request.

pub mod batch;
pub mod converters;
pub mod pipeline;

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;

use crate::{path_to_file_extension_string, path_to_filename_string};

/// Extensions the native codec and the external tools can both handle.
pub const RASTER_EXTENSIONS: [&str; 10] = [
    "avif", "bmp", "gif", "ico", "jpg", "png", "tga", "tif", "webp", "qoi",
];

/// Immutable snapshot of one filesystem entry at scan time.
///
/// Superseded by a new entry after any move or rename, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// Filename including the extension.
    pub name: String,
    /// Lowercase extension without the leading dot. Empty when absent.
    pub extension: String,
}

/// One file paired with the requested target extension.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: FileEntry,
    /// Normalized target: lowercase, no leading dot.
    pub target_extension: String,
}

/// Result of converting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The file now lives at the given path in the requested format.
    Converted(PathBuf),
    /// No converter succeeded; the file was moved to the quarantine directory.
    Quarantined { path: PathBuf, reason: String },
    /// No converter succeeded and no quarantine is configured; the file was
    /// left untouched at its original path.
    Failed(String),
}

impl FileEntry {
    /// Create a snapshot for the given path.
    ///
    /// # Errors
    /// Returns an error if the path does not point to an existing file.
    pub fn new(path: PathBuf) -> Result<Self> {
        anyhow::ensure!(path.is_file(), "Not a file: '{}'", path.display());
        let name = path_to_filename_string(&path);
        let extension = path_to_file_extension_string(&path);
        Ok(Self { path, name, extension })
    }

    /// Create snapshots for all given paths, keeping input order.
    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Vec<Self>> {
        paths.into_iter().map(Self::new).collect()
    }

    /// Directory containing the file.
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl ConversionRequest {
    /// Pair a source file with a target extension.
    ///
    /// # Errors
    /// Returns an error if the extension is empty after normalization.
    pub fn new(source: FileEntry, target_extension: &str) -> Result<Self> {
        let target_extension = normalize_extension(target_extension);
        anyhow::ensure!(!target_extension.is_empty(), "Target extension cannot be empty");
        Ok(Self {
            source,
            target_extension,
        })
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converted(path) => {
                write!(f, "Converted: {}", path.display())
            }
            Self::Quarantined { path, reason } => {
                write!(f, "Quarantined to {}: {reason}", path.display())
            }
            Self::Failed(error) => write!(f, "Failed: {error}"),
        }
    }
}

/// Normalize a user-supplied extension: trimmed, lowercase, no leading dots.
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Collapse extension aliases so that "jpeg" and "jpg" compare equal.
#[must_use]
pub fn canonical_format(extension: &str) -> &str {
    match extension {
        "jpeg" | "jpe" => "jpg",
        "tiff" => "tif",
        other => other,
    }
}

/// True when the extension names a raster-image format the cascade handles.
#[must_use]
pub fn is_raster_extension(extension: &str) -> bool {
    RASTER_EXTENSIONS.contains(&canonical_format(extension))
}

/// Sniff the actual image format from the file's leading bytes.
///
/// Returns the canonical extension for the detected format, or `None` when
/// the content is not a recognizable image. The declared file extension
/// plays no part here.
#[must_use]
pub fn sniff_extension(path: &Path) -> Option<String> {
    let mut header = [0_u8; 512];
    let mut file = File::open(path).ok()?;
    let read = file.read(&mut header).ok()?;
    let format = image::guess_format(&header[..read]).ok()?;
    format
        .extensions_str()
        .first()
        .map(|ext| canonical_format(ext).to_string())
}

/// Map an extension to the codec format used for re-encoding.
///
/// # Errors
/// Returns an error for extensions the native codec cannot write.
pub fn codec_format(extension: &str) -> Result<ImageFormat> {
    ImageFormat::from_extension(extension)
        .with_context(|| format!("No native codec for extension '{extension}'"))
}
