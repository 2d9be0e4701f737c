//! Log file loader.
//!
//! Logs are processed whole, so the loader reads the entire file into
//! memory in one call. Bytes that are not valid UTF-8 are replaced rather
//! than rejected; a corrupt byte should cost one record, not the run.
//!
//! # Example
//!
//! ```no_run
//! use trade_log_reconstructor::LogLoader;
//!
//! let mut loader = LogLoader::new("bot.log")?;
//! let text = loader.read_all()?;
//! println!("{} lines, {} bytes", loader.stats().lines, loader.stats().bytes_read);
//! # Ok::<(), trade_log_reconstructor::ReconError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ReconError, Result};

/// Statistics for log file loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// File size in bytes, from metadata
    pub file_size: u64,

    /// Bytes actually read
    pub bytes_read: u64,

    /// Number of lines in the text
    pub lines: u64,

    /// Whether any bytes had to be replaced during UTF-8 decoding
    pub lossy_utf8: bool,
}

/// Reads a trading bot log from disk.
///
/// Construction fails with [`ReconError::FileUnavailable`] when the path does
/// not exist or is not a readable file, so a missing input is reported
/// before any parser state is created.
#[derive(Debug, Clone)]
pub struct LogLoader {
    path: PathBuf,
    stats: LoaderStats,
}

impl LogLoader {
    /// Create a loader for `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata =
            std::fs::metadata(&path).map_err(|e| ReconError::file_unavailable(&path, e))?;
        if !metadata.is_file() {
            return Err(ReconError::file_unavailable(&path, "not a regular file"));
        }

        Ok(Self {
            path,
            stats: LoaderStats {
                file_size: metadata.len(),
                ..Default::default()
            },
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get statistics.
    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Read the whole file as text.
    pub fn read_all(&mut self) -> Result<String> {
        let bytes =
            std::fs::read(&self.path).map_err(|e| ReconError::file_unavailable(&self.path, e))?;
        self.stats.bytes_read = bytes.len() as u64;

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                self.stats.lossy_utf8 = true;
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };

        self.stats.lines = text.lines().count() as u64;

        log::info!(
            "Loaded {}: {} lines, {} bytes{}",
            self.path.display(),
            self.stats.lines,
            self.stats.file_size,
            if self.stats.lossy_utf8 { " (invalid UTF-8 replaced)" } else { "" }
        );

        Ok(text)
    }

    /// Read the whole file as owned lines.
    pub fn read_lines(&mut self) -> Result<Vec<String>> {
        Ok(self.read_all()?.lines().map(str::to_owned).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file() {
        let err = LogLoader::new("/nonexistent/path/bot.log").unwrap_err();
        assert!(matches!(err, ReconError::FileUnavailable { .. }));
    }

    #[test]
    fn test_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogLoader::new(dir.path()).unwrap_err();
        assert!(matches!(err, ReconError::FileUnavailable { .. }));
    }

    #[test]
    fn test_read_all() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "00:00:01|Candle").unwrap();
        writeln!(file, "00:00:02|Candle").unwrap();

        let mut loader = LogLoader::new(file.path()).unwrap();
        let text = loader.read_all().unwrap();

        assert_eq!(text.lines().count(), 2);
        assert_eq!(loader.stats().lines, 2);
        assert_eq!(loader.stats().file_size, loader.stats().bytes_read);
        assert!(!loader.stats().lossy_utf8);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"00:00:01|Top|BTC\xffSpot|1|1\n").unwrap();

        let mut loader = LogLoader::new(file.path()).unwrap();
        let lines = loader.read_lines().unwrap();

        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains('\u{FFFD}'));
        assert!(loader.stats().lossy_utf8);
    }
}
