//! Source fixtures with an embedded cursor, and throwaway project directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

/// Marks the cursor inside fixture sources.
pub const CURSOR: char = '¦';

/// Split a fixture into its source text and the byte offset of the cursor.
///
/// # Panics
/// When the fixture does not contain exactly one cursor marker.
pub fn cursor_fixture(fixture: &str) -> (String, usize) {
    let offset = fixture
        .find(CURSOR)
        .unwrap_or_else(|| panic!("fixture has no cursor marker: {fixture:?}"));
    let source = fixture.replacen(CURSOR, "", 1);
    assert!(
        !source.contains(CURSOR),
        "fixture has more than one cursor marker: {fixture:?}"
    );
    (source, offset)
}

/// A project directory that is removed when dropped.
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    /// Create a project holding `files`, given as `(relative path, text)`.
    pub fn new(files: &[(&str, &str)]) -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create project directory")?;
        let project = Self { dir };
        for (relative, text) in files {
            project.write(relative, text)?;
        }
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write (or overwrite) one file, creating parent directories.
    pub fn write(&self, relative: &str, text: &str) -> Result<PathBuf> {
        if Path::new(relative).is_absolute() {
            bail!("project files must be relative: {relative}");
        }
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
