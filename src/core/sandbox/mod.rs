//! Workspace confinement for file and shell tools.

mod blocklist;

use std::path::{Component, Path, PathBuf};

pub use blocklist::is_dangerous_command;

/// Dangling links chased before giving up.
const MAX_LINK_HOPS: u8 = 8;

/// Errors raised while resolving a tool-supplied path.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The path argument was empty or whitespace.
    #[error("path required")]
    EmptyPath,

    /// The resolved path lies outside the workspace root.
    #[error("path escapes workspace")]
    Escape,

    /// An existing ancestor could not be canonicalized.
    #[error("failed to resolve path: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves paths against a fixed workspace root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`.
    ///
    /// The root is canonicalized when it exists; otherwise it is made absolute
    /// and normalized lexically.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| {
            let absolute = if root.is_absolute() {
                root.to_path_buf()
            } else {
                std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("/"))
                    .join(root)
            };
            normalize(&absolute)
        });

        Self { root }
    }

    /// The absolute workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the workspace.
    ///
    /// Relative paths are joined to the root, absolute paths are taken as-is,
    /// and both are normalized before the containment check, so `..` segments
    /// cannot climb out. Symlinks, dangling ones included, are then followed
    /// and must stay inside the root.
    pub fn resolve(&self, candidate: &str) -> Result<PathBuf, SandboxError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(SandboxError::EmptyPath);
        }

        let candidate = Path::new(candidate);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let resolved = normalize(&joined);

        if !self.contains(&resolved) {
            return Err(SandboxError::Escape);
        }

        self.check_links(&resolved, MAX_LINK_HOPS)?;
        Ok(resolved)
    }

    /// Follow symlinks along `path` and reject any that lead outside.
    ///
    /// The nearest ancestor present on disk (a link counts even when its
    /// target is missing) decides. Dangling links are chased by hand since
    /// writing through them would create the target.
    fn check_links(&self, path: &Path, hops: u8) -> Result<(), SandboxError> {
        for ancestor in path.ancestors() {
            if !ancestor.starts_with(&self.root) {
                break;
            }
            let Ok(meta) = ancestor.symlink_metadata() else {
                continue;
            };

            if let Ok(real) = std::fs::canonicalize(ancestor) {
                if !self.contains(&real) {
                    tracing::warn!(path = %path.display(), "symlink leads outside workspace");
                    return Err(SandboxError::Escape);
                }
                return Ok(());
            }
            if !meta.file_type().is_symlink() || hops == 0 {
                return Err(SandboxError::Escape);
            }

            let parent = std::fs::canonicalize(ancestor.parent().unwrap_or(self.root.as_path()))?;
            let target = parent.join(std::fs::read_link(ancestor)?);
            let rest = path.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
            let next = normalize(&target.join(rest));
            if !self.contains(&next) {
                tracing::warn!(path = %path.display(), "dangling symlink leads outside workspace");
                return Err(SandboxError::Escape);
            }
            return self.check_links(&next, hops - 1);
        }
        Ok(())
    }

    /// Render `path` relative to the root for user-facing messages.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    /// Root itself, or root followed by a separator and more components.
    fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

/// Lexically clean a path: drop `.` segments and fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping at the root is a no-op, matching `/..` == `/`.
                out.pop();
            }
        }
    }
    out
}
