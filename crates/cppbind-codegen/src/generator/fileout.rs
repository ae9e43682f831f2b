use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GeneratorError;

/// How generated files reach the disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOutOptions {
    /// Run all generation but write nothing.
    pub dry_run: bool,
    /// Compare with the file on disk first and log the differing lines.
    pub diff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutState {
    Written,
    /// Diff mode found identical contents; the file was left alone.
    Unchanged,
    DryRun,
}

/// One generated file, written as a whole.
#[derive(Debug)]
pub struct FileOut {
    path: PathBuf,
    options: FileOutOptions,
}

impl FileOut {
    pub fn new(path: impl Into<PathBuf>, options: FileOutOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn done(&self, contents: &str) -> Result<FileOutState, GeneratorError> {
        if self.options.diff {
            match fs::read_to_string(&self.path) {
                Ok(existing) if existing == contents => return Ok(FileOutState::Unchanged),
                Ok(existing) => log::info!("{}", line_diff(&self.path, &existing, contents)),
                Err(_) => log::info!("New file: {}", self.path.display()),
            }
        }
        if self.options.dry_run {
            return Ok(FileOutState::DryRun);
        }

        let io_error = |source| GeneratorError::FileOut {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&self.path, contents).map_err(io_error)?;
        Ok(FileOutState::Written)
    }
}

/// Unified diff of the file on disk against the generated text.
fn line_diff(path: &Path, old: &str, new: &str) -> String {
    let name = path.display().to_string();
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&name, &name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample").join("core").join("point.cpp");
        let state = FileOut::new(&path, FileOutOptions::default()).done("int x;\n").unwrap();
        assert_eq!(state, FileOutState::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;\n");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.cpp");
        let options = FileOutOptions {
            dry_run: true,
            diff: false,
        };
        assert_eq!(FileOut::new(&path, options).done("x").unwrap(), FileOutState::DryRun);
        assert!(!path.exists());
    }

    #[test]
    fn test_diff_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.cpp");
        fs::write(&path, "a\nb\nc\n").unwrap();
        let options = FileOutOptions {
            dry_run: false,
            diff: true,
        };
        assert_eq!(FileOut::new(&path, options).done("a\nb\nc\n").unwrap(), FileOutState::Unchanged);
        assert_eq!(FileOut::new(&path, options).done("a\nx\nc\n").unwrap(), FileOutState::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nx\nc\n");
    }

    #[test]
    fn test_line_diff() {
        let diff = line_diff(Path::new("f.h"), "a\nb\nc\nd\ne\n", "a\nX\nc\nY\ne\n");
        assert!(diff.starts_with("--- f.h\n+++ f.h\n@@ "));
        assert!(diff.ends_with(" a\n-b\n+X\n c\n-d\n+Y\n e\n"));
        assert!(!diff.contains("-c\n"));
        assert!(!diff.contains("+c\n"));
    }
}
