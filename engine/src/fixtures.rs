//! Fixture files on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use lspcheck_lsp::path_to_file_uri;

use crate::markers::{MarkerError, MarkerTable};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reading fixture {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} cannot be expressed as a file URI", path.display())]
    Uri { path: PathBuf },
    #[error("markers in fixture `{name}`: {source}")]
    Markers {
        name: String,
        #[source]
        source: MarkerError,
    },
}

/// A directory of fixtures sharing one file extension.
///
/// Fixtures are addressed by bare name: `lib` is `<dir>/lib.<ext>`.
#[derive(Debug, Clone)]
pub struct Fixtures {
    dir: PathBuf,
    extension: String,
}

impl Fixtures {
    /// Resolve `dir` to an absolute, canonical path.
    pub fn open(dir: &Path, extension: impl Into<String>) -> Result<Self, FixtureError> {
        let dir = dir.canonicalize().map_err(|source| FixtureError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir,
            extension: extension.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `file://` URI of the fixture directory, used as the workspace root.
    pub fn root_uri(&self) -> Result<String, FixtureError> {
        uri_for(&self.dir)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }

    /// `file://` URI of a fixture. The file does not need to exist.
    pub fn uri(&self, name: &str) -> Result<String, FixtureError> {
        uri_for(&self.path(name))
    }

    /// Fixture text with line endings preserved.
    pub fn read(&self, name: &str) -> Result<String, FixtureError> {
        let path = self.path(name);
        fs::read_to_string(&path).map_err(|source| FixtureError::Read { path, source })
    }

    pub fn markers(&self, name: &str) -> Result<MarkerTable, FixtureError> {
        let text = self.read(name)?;
        MarkerTable::extract(&text).map_err(|source| FixtureError::Markers {
            name: name.to_string(),
            source,
        })
    }
}

fn uri_for(path: &Path) -> Result<String, FixtureError> {
    path_to_file_uri(path)
        .map(String::from)
        .map_err(|_| FixtureError::Uri {
            path: path.to_path_buf(),
        })
}
