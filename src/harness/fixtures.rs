//! Filesystem fixtures for routines that point remote tools at local files
//!
//! Each routine creates its own [`Fixture`]; the directory is removed when
//! the fixture is dropped. The harness and the server are assumed to share
//! a filesystem.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Create an empty fixture directory whose name starts with `prefix`
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .with_context(|| format!("Failed to create fixture directory '{}'", prefix))?;
        tracing::debug!("Created fixture directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fixture root as a string for JSON arguments
    pub fn root(&self) -> String {
        self.dir.path().display().to_string()
    }

    /// Last path component of the fixture root
    pub fn dir_name(&self) -> String {
        self.dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Absolute path of a file inside the fixture (may not exist)
    pub fn file(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.file(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.file(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}
