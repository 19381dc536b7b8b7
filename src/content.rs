//! Injected content resolution for URI-backed image bytes.
//!
//! The codec layer never opens files or connections on its own: callers
//! supply a [`ContentResolver`] and [`Image::content`] goes through it.
//! Alternative backends (object storage, HTTP) implement the same trait
//! without touching the codecs.
//!
//! [`Image::content`]: crate::types::Image::content

use std::fs;
use std::path::PathBuf;

use crate::error::ArrowlabelError;

/// Supplies content bytes for a URI.
///
/// Resolution is synchronous and performed once per request; this crate
/// applies no retry, backoff, or caching. Bulk or concurrent loading belongs
/// to the caller.
pub trait ContentResolver {
    /// Reads the content behind `uri`.
    fn resolve(&self, uri: &str) -> Result<Vec<u8>, ArrowlabelError>;
}

/// Filesystem-backed resolver, optionally rooted at a prefix directory that
/// URIs are joined under.
#[derive(Clone, Debug, Default)]
pub struct FileResolver {
    root: Option<PathBuf>,
}

impl FileResolver {
    /// Creates a resolver that treats URIs as plain paths.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Creates a resolver that joins URIs under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl ContentResolver for FileResolver {
    fn resolve(&self, uri: &str) -> Result<Vec<u8>, ArrowlabelError> {
        let path = match &self.root {
            Some(root) => root.join(uri),
            None => PathBuf::from(uri),
        };
        fs::read(&path).map_err(|source| ArrowlabelError::ContentRead {
            uri: uri.to_string(),
            source,
        })
    }
}
