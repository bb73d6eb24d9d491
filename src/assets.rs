use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::InstallerError;

/// Where the live system keeps the repository signing keys.
pub const HOST_KEY_DIR: &str = "/var/db/xbps/keys";

/// Places the package manager's trust roots under a directory.
pub trait Assets: Send + Sync {
    fn restore(&self, dir: &Path) -> Result<(), InstallerError>;
}

/// Copies every regular file from a directory on the running system.
#[derive(Debug, Clone)]
pub struct KeyDirectory {
    source: PathBuf,
}

impl KeyDirectory {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Default for KeyDirectory {
    fn default() -> Self {
        Self::new(HOST_KEY_DIR)
    }
}

impl Assets for KeyDirectory {
    fn restore(&self, dir: &Path) -> Result<(), InstallerError> {
        let failed = |source: io::Error| InstallerError::Assets {
            dir: dir.to_path_buf(),
            source,
        };

        fs::create_dir_all(dir).map_err(failed)?;
        for entry in fs::read_dir(&self.source).map_err(failed)? {
            let entry = entry.map_err(failed)?;
            if !entry.file_type().map_err(failed)?.is_file() {
                continue;
            }
            debug!(key = %entry.path().display(), "restoring");
            fs::copy(entry.path(), dir.join(entry.file_name())).map_err(failed)?;
        }
        Ok(())
    }
}

/// Assets held in memory, as `(file name, contents)` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    files: Vec<(String, Vec<u8>)>,
}

impl StaticAssets {
    pub fn new(files: Vec<(String, Vec<u8>)>) -> Self {
        Self { files }
    }
}

impl Assets for StaticAssets {
    fn restore(&self, dir: &Path) -> Result<(), InstallerError> {
        let failed = |source: io::Error| InstallerError::Assets {
            dir: dir.to_path_buf(),
            source,
        };

        fs::create_dir_all(dir).map_err(failed)?;
        for (name, contents) in &self.files {
            fs::write(dir.join(name), contents).map_err(failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn copies_files_but_not_directories() {
        let host = tempfile::tempdir().unwrap();
        fs::write(host.path().join("60:ae:0c.plist"), b"<plist/>").unwrap();
        fs::create_dir(host.path().join("nested")).unwrap();

        let target = tempfile::tempdir().unwrap();
        let keys = target.path().join("var/db/xbps/keys");
        KeyDirectory::new(host.path()).restore(&keys).unwrap();

        assert_eq!(fs::read(keys.join("60:ae:0c.plist")).unwrap(), b"<plist/>");
        assert!(!keys.join("nested").exists());
    }

    #[test]
    fn missing_source_is_an_asset_error() {
        let target = tempfile::tempdir().unwrap();
        let err = KeyDirectory::new(target.path().join("nope"))
            .restore(&target.path().join("keys"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Assets);
    }

    #[test]
    fn static_assets_are_written() {
        let target = tempfile::tempdir().unwrap();
        StaticAssets::new(vec![("a.plist".into(), b"key".to_vec())])
            .restore(target.path())
            .unwrap();
        assert_eq!(fs::read(target.path().join("a.plist")).unwrap(), b"key");
    }
}
