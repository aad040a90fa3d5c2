use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{AssetSource, BackendResult};
use crate::BackendError;

/// File-based asset source reading from a root directory
pub struct FileAssetSource {
    /// Directory asset names are resolved against
    root: PathBuf,
}

impl FileAssetSource {
    /// Create a new file source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this source
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl AssetSource for FileAssetSource {
    fn source_type(&self) -> &'static str {
        "file"
    }

    fn read(&self, name: &str) -> BackendResult<Vec<u8>> {
        let path = self.resolve(name);
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackendError::NotFound {
                name: name.to_string(),
            },
            _ => BackendError::Io {
                name: name.to_string(),
                message: format!("{}: {}", path.display(), e),
            },
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_file()
    }
}
