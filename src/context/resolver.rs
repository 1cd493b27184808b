//! File content resolvers.
//!
//! The engine never reads files itself; it asks a [`FileResolver`] for the
//! head-revision content of a path and treats `None` as "not available".

use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Looks up the current content of a repository-relative path.
pub trait FileResolver {
    fn resolve(&self, path: &str) -> Option<String>;
}

impl<F> FileResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Resolver that never finds anything; every snippet degrades to diff text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFiles;

impl FileResolver for NoFiles {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Reads files from a checked-out working tree.
#[derive(Debug, Clone)]
pub struct DiskResolver {
    root: PathBuf,
}

impl DiskResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root, refusing anything that could escape it.
    fn locate(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || path.is_empty() {
            debug!(path, "refusing to resolve path outside the repository");
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl FileResolver for DiskResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        let full = self.locate(path)?;
        match std::fs::read(&full) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                debug!(path, error = %e, "file content unavailable");
                None
            }
        }
    }
}
