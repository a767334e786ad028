//! Atomic file writes for the JSON course store.
//!
//! Content goes to a temporary file in the target directory, is fsynced, and
//! then renamed over the target so readers never observe a partial course.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Atomically write content to a file using temp file + fsync + rename.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or any step of the
/// write/rename sequence fails.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let normalized_content = normalize_line_endings(content);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {parent}"))?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("Failed to create temporary file in: {temp_dir}"))?;

    temp_file
        .write_all(normalized_content.as_bytes())
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("courses").join("abc.json");

        write_file_atomic(&path, "{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("course.json");

        write_file_atomic(&path, "first").unwrap();
        write_file_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_normalizes_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("notes.json");

        write_file_atomic(&path, "a\r\nb\rc").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc");
    }
}
