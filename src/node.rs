//! Hierarchy node paths.

use derive_more::Display;
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorePrefix;

/// A hierarchy node path.
///
/// Paths are `/`-separated, always start with `/`, and name a group or array within a container.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display("{}", _0.to_string_lossy())]
pub struct NodePath(PathBuf);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePathError {
    pub(crate) fn from_name(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(PathBuf::from(path)))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self(PathBuf::from("/"))
    }

    /// Extracts a string slice containing the node path.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap()
    }

    /// Returns the name of the node (the last path component), or an empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        let path = self.as_str();
        path.rsplit('/').next().unwrap_or("")
    }

    /// Returns the path of a child node called `name`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `name` is empty or contains a `/` character.
    pub fn child(&self, name: &str) -> Result<Self, NodePathError> {
        if name.is_empty() || name.contains('/') {
            return Err(NodePathError(name.to_string()));
        }
        let path = self.as_str();
        if path == "/" {
            Self::new(&format!("/{name}"))
        } else {
            Self::new(&format!("{path}/{name}"))
        }
    }

    /// Validates a path.
    ///
    /// A path always starts with `/`, a non-root path cannot end with `/`, and there are no empty
    /// components (no `//` substring).
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/") || (path.starts_with('/') && !path.ends_with('/') && !path.contains("//"))
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<&StorePrefix> for NodePath {
    type Error = NodePathError;

    fn try_from(prefix: &StorePrefix) -> Result<Self, Self::Error> {
        let path = "/".to_string() + prefix.as_str().strip_suffix('/').unwrap_or(prefix.as_str());
        Self::new(&path)
    }
}
