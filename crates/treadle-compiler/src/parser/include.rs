//! Include resolution.
//!
//! The parser splices included files in at the directive site; where the
//! bytes come from is behind the [`IncludeResolver`] trait so the library
//! can be used without touching the filesystem.

use std::collections::HashMap;
use std::path::Path;

/// Why an include could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("includes are not supported here")]
    Unsupported,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Turns an `#include` request into file contents.
pub trait IncludeResolver {
    /// Resolve `request` relative to the file named `from`, returning the
    /// canonical name and contents of the included file. The canonical
    /// name is what repeat-include detection keys on.
    fn resolve(&mut self, from: &str, request: &str) -> Result<(String, String), IncludeError>;
}

/// Filesystem resolver: requests are paths relative to the directory of
/// the including file.
pub struct FsResolver;

impl IncludeResolver for FsResolver {
    fn resolve(&mut self, from: &str, request: &str) -> Result<(String, String), IncludeError> {
        let dir = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
        let path = dir.join(request);
        let text = std::fs::read_to_string(&path)?;
        Ok((path.to_string_lossy().into_owned(), text))
    }
}

/// Resolver for contexts without a filesystem: every include fails.
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&mut self, _from: &str, _request: &str) -> Result<(String, String), IncludeError> {
        Err(IncludeError::Unsupported)
    }
}

/// Map-backed resolver for tests and embedding.
#[derive(Debug, Default)]
pub struct StaticResolver {
    files: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(name.into(), text.into());
        self
    }
}

impl IncludeResolver for StaticResolver {
    fn resolve(&mut self, _from: &str, request: &str) -> Result<(String, String), IncludeError> {
        match self.files.get(request) {
            Some(text) => Ok((request.to_string(), text.clone())),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", request),
            )
            .into()),
        }
    }
}
