//! Path sandbox for filesystem-backed resources.
//!
//! Canonicalization (resolving `..` and symlinks) happens before the
//! containment check. A naive prefix check on the unresolved string
//! would let `root/../secret` through; that is treated as a security
//! defect here.

use std::path::{Path, PathBuf};

use glob::Pattern;

use flymcp_protocol::logging::{debug, targets};

/// One canonical root directory plus allow/deny rules.
///
/// Created once at server startup from the invoking workspace
/// directory; immutable afterwards and shared by reference with the
/// resource strategies, so no locking is needed.
#[derive(Debug)]
pub struct Sandbox {
    root: PathBuf,
    allow: Vec<Pattern>,
    deny: Vec<Pattern>,
}

impl Sandbox {
    /// Creates a sandbox rooted at `root`.
    ///
    /// The root is canonicalized eagerly; allow/deny rules are glob
    /// patterns matched against root-relative paths. An empty allow
    /// list permits everything not denied.
    pub fn new(
        root: impl AsRef<Path>,
        allow: &[String],
        deny: &[String],
    ) -> Result<Self, SandboxError> {
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|err| SandboxError::Root(root.as_ref().to_path_buf(), err))?;

        let compile = |patterns: &[String]| -> Result<Vec<Pattern>, SandboxError> {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(|err| SandboxError::Pattern(p.clone(), err)))
                .collect()
        };

        Ok(Self {
            root,
            allow: compile(allow)?,
            deny: compile(deny)?,
        })
    }

    /// Returns the canonical root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller-supplied path to a canonical path inside the
    /// root, or `None` when it escapes.
    ///
    /// `None` is a normal, expected outcome; callers turn it into a
    /// clean error response, never a crash. Nonexistent paths also
    /// yield `None` since they cannot be canonicalized.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = joined.canonicalize().ok()?;
        if canonical.starts_with(&self.root) {
            Some(canonical)
        } else {
            debug!(
                target: targets::SANDBOX,
                "rejected path outside root: {}",
                path.display()
            );
            None
        }
    }

    /// Returns whether a canonical path is readable under the
    /// configured allow/deny rules.
    ///
    /// Independent of containment: a path inside the root can still be
    /// excluded (build artifacts, secrets directories). Deny wins.
    #[must_use]
    pub fn is_readable(&self, canonical: &Path) -> bool {
        let Ok(relative) = canonical.strip_prefix(&self.root) else {
            return false;
        };
        let relative = relative.to_string_lossy();

        if self.deny.iter().any(|p| p.matches(&relative)) {
            debug!(target: targets::SANDBOX, "denied by rule: {relative}");
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|p| p.matches(&relative))
    }
}

/// Sandbox construction errors.
#[derive(Debug)]
pub enum SandboxError {
    /// The root directory could not be canonicalized.
    Root(PathBuf, std::io::Error),
    /// An allow/deny rule is not a valid glob pattern.
    Pattern(String, glob::PatternError),
}

impl std::fmt::Display for SandboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxError::Root(path, err) => {
                write!(f, "invalid sandbox root {}: {err}", path.display())
            }
            SandboxError::Pattern(pattern, err) => {
                write!(f, "invalid rule pattern '{pattern}': {err}")
            }
        }
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SandboxError::Root(_, err) => Some(err),
            SandboxError::Pattern(_, err) => Some(err),
        }
    }
}
