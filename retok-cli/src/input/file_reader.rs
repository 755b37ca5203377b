//! File reading utilities

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reader for line-oriented UTF-8 input files
pub struct FileReader;

impl FileReader {
    /// Read a file as UTF-8 text
    pub fn read_text(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(content)
    }

    /// Read a file as trimmed lines, one repair input per line
    pub fn read_lines(path: &Path) -> Result<Vec<String>> {
        let content = Self::read_text(path)?;
        Ok(content.lines().map(|line| line.trim().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_read_lines_trims_each_line() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "  first line \r\n\nsecond\tline\n").unwrap();

        let lines = FileReader::read_lines(&file_path).unwrap();
        assert_eq!(lines, vec!["first line", "", "second\tline"]);
    }

    #[test]
    fn test_read_text_nonexistent_file() {
        let path = Path::new("/nonexistent/file.txt");
        let result = FileReader::read_text(path);

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }

    #[test]
    fn test_read_lines_utf8_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("utf8.txt");
        fs::write(&file_path, "日本語のテキスト\nüber straße").unwrap();

        let lines = FileReader::read_lines(&file_path).unwrap();
        assert_eq!(lines, vec!["日本語のテキスト", "über straße"]);
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("empty.txt");
        File::create(&file_path).unwrap();

        assert!(FileReader::read_lines(&file_path).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("latin1.txt");
        fs::write(&file_path, [0x66, 0x6f, 0xf6]).unwrap();

        assert!(FileReader::read_lines(&file_path).is_err());
    }
}
