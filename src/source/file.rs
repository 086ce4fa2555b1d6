//! File-based data source.
//!
//! Polls a JSON file holding one perfmon payload.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use perfmon_types::PollPayload;

use super::{DataSource, SourceError};

/// A data source that reads perfmon payloads from a JSON file.
///
/// Useful for replaying a captured daemon response. The source tracks the
/// file's modification time and only returns new data when the file has
/// been updated.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_modified: None,
        }
    }

    /// Returns the path being monitored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn read_file(&self) -> Result<PollPayload, SourceError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Transport(format!("read {}: {}", self.path.display(), e)))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Result<Option<PollPayload>, SourceError> {
        let current_modified = self.get_modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // Never read, or missing so far
            (Some(_), None) => false, // File disappeared, keep what we have
            (Some(last), Some(current)) => current > last,
        };

        if !file_changed {
            return Ok(None);
        }

        // Recorded before parsing, so a bad file is read once per change.
        self.last_modified = current_modified;
        self.read_file().map(Some)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{ "snapshots": [
            { "hname": "h1", "time": 100, "procs": [ { "pname": "p1", "cpu": 0.3 } ] }
        ] }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/perfmon.json");
        assert_eq!(source.path(), Path::new("/tmp/perfmon.json"));
        assert_eq!(source.description(), "file: /tmp/perfmon.json");
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        let payload = source.poll().unwrap().unwrap();
        assert_eq!(payload.snapshots[0].hname, "h1");

        // Second poll without file change should return nothing
        assert!(source.poll().unwrap().is_none());
    }

    #[test]
    fn test_file_source_detects_changes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());
        let _ = source.poll();

        std::thread::sleep(std::time::Duration::from_millis(10));
        file.rewind().unwrap();
        writeln!(
            file,
            r#"{{ "snapshots": [ {{ "hname": "h2", "time": 101, "procs": [] }} ] }}"#
        )
        .unwrap();
        file.flush().unwrap();

        // Note: may be flaky on filesystems with coarse mtime resolution
        if let Ok(Some(payload)) = source.poll() {
            assert_eq!(payload.snapshots[0].hname, "h2");
        }
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/perfmon.json");

        let err = source.poll().unwrap_err();
        assert!(matches!(err, SourceError::Transport(_)));
        assert!(err.to_string().contains("/nonexistent/path/perfmon.json"));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        let err = source.poll().unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_file_source_unchanged_bad_file_not_reread() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_err());
        assert!(source.poll().unwrap().is_none());
    }
}
