//! Path containment for tool operations.

use std::io;
use std::path::{Component, Path, PathBuf};

/// The working directory every tool operates in.
///
/// Containment is a prefix check on resolved paths. It keeps a cooperative
/// model inside the tree; it is not a security boundary.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`, which must exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// Canonical absolute root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path against the root.
    ///
    /// A missing or empty path means the root itself. Returns `None` when the
    /// resolved path falls outside the root.
    pub fn resolve(&self, relative: Option<&str>) -> Option<PathBuf> {
        let relative = relative.filter(|p| !p.trim().is_empty()).unwrap_or(".");
        let resolved = resolve_path(&self.root.join(relative));
        resolved.starts_with(&self.root).then_some(resolved)
    }
}

/// Resolve `path` without requiring it to exist.
///
/// Existing prefixes are canonicalized as they are walked so symlinks are
/// followed; the non-existent remainder is folded lexically.
fn resolve_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => {
                out.push(name);
                if let Ok(canonical) = out.canonicalize() {
                    out = canonical;
                }
            }
        }
    }
    out
}
