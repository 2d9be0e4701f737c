//! Log source abstraction.
//!
//! The reconstructor consumes lines; where they come from is a
//! [`LogSource`]. [`FileSource`] reads a log from disk, [`VecSource`] wraps
//! lines already in memory (tests, embedded logs).
//!
//! # Implementing Custom Sources
//!
//! ```
//! use trade_log_reconstructor::source::{LogSource, SourceMetadata};
//! use trade_log_reconstructor::Result;
//!
//! struct Fixed {
//!     metadata: SourceMetadata,
//! }
//!
//! impl LogSource for Fixed {
//!     type LineIter = std::vec::IntoIter<String>;
//!
//!     fn lines(self) -> Result<Self::LineIter> {
//!         Ok(vec!["00:00:01|Candle".to_string()].into_iter())
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::loader::LogLoader;

// ============================================================================
// Source Metadata
// ============================================================================

/// Information about a log source, for logging and summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Short label (file name, or a caller-supplied name)
    pub label: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,

    /// Line count, when known up front
    pub line_count: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_line_count(mut self, count: u64) -> Self {
        self.line_count = Some(count);
        self
    }

    /// Metadata for a file: the label is the file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            metadata.label = Some(name.to_string());
        }

        metadata
    }
}

// ============================================================================
// Log Source Trait
// ============================================================================

/// A single-pass supplier of raw log lines.
///
/// `lines()` consumes `self`. Lines are yielded in file order without their
/// line terminators.
pub trait LogSource {
    /// Iterator type returned by `lines()`.
    type LineIter: Iterator<Item = String>;

    /// Consume the source and return its lines.
    fn lines(self) -> Result<Self::LineIter>;

    /// Metadata about this source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// In-memory Source
// ============================================================================

/// Lines held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    lines: Vec<String>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(lines: Vec<String>) -> Self {
        let count = lines.len() as u64;
        Self {
            lines,
            metadata: SourceMetadata::new().with_line_count(count),
        }
    }

    /// Split `text` into lines.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_owned).collect())
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl LogSource for VecSource {
    type LineIter = std::vec::IntoIter<String>;

    fn lines(self) -> Result<Self::LineIter> {
        Ok(self.lines.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// File Source
// ============================================================================

/// A log file on disk, read whole when `lines()` is called.
#[derive(Debug, Clone)]
pub struct FileSource {
    loader: LogLoader,
    metadata: SourceMetadata,
}

impl FileSource {
    /// Fails with `FileUnavailable` if the path cannot be read.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let loader = LogLoader::new(path.as_ref())?;
        let metadata = SourceMetadata::from_path(path.as_ref());
        Ok(Self { loader, metadata })
    }

    pub fn path(&self) -> &Path {
        self.loader.path()
    }
}

impl LogSource for FileSource {
    type LineIter = std::vec::IntoIter<String>;

    fn lines(mut self) -> Result<Self::LineIter> {
        Ok(self.loader.read_lines()?.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_metadata_builder() {
        let metadata = SourceMetadata::new()
            .with_label("bot")
            .with_file_size(1024)
            .with_line_count(10);

        assert_eq!(metadata.label.as_deref(), Some("bot"));
        assert_eq!(metadata.file_size, Some(1024));
        assert_eq!(metadata.line_count, Some(10));
    }

    #[test]
    fn test_source_metadata_from_path() {
        let metadata = SourceMetadata::from_path("/logs/bot_2024-01-01.log");
        assert_eq!(metadata.label.as_deref(), Some("bot_2024-01-01.log"));
        assert_eq!(metadata.file_size, None);
    }

    #[test]
    fn test_vec_source_from_text() {
        let source = VecSource::from_text("a|b\r\nc|d\n");
        assert_eq!(source.metadata().line_count, Some(2));

        let lines: Vec<String> = source.lines().unwrap().collect();
        assert_eq!(lines, vec!["a|b", "c|d"]);
    }

    #[test]
    fn test_vec_source_empty() {
        let source = VecSource::new(Vec::new());
        assert_eq!(source.lines().unwrap().count(), 0);
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "00:00:01|Candle").unwrap();

        let source = FileSource::new(file.path()).unwrap();
        assert!(source.metadata().file_size.is_some());
        assert_eq!(source.lines().unwrap().count(), 1);
    }

    #[test]
    fn test_file_source_missing() {
        assert!(FileSource::new("/nonexistent/bot.log").is_err());
    }
}
