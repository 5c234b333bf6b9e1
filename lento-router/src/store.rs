//! Byte-level storage of cache artifacts.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

/// Named artifact storage with atomic overwrites.
#[cfg_attr(test, automock)]
pub trait PersistentStore {
    fn exists(&self, artifact: &str) -> bool;

    fn read(&self, artifact: &str) -> io::Result<Vec<u8>>;

    /// Replaces the artifact atomically - readers see either the old or the new contents.
    fn write(&self, artifact: &str, contents: &[u8]) -> io::Result<()>;
}

pub type PersistentStorePtr = Box<dyn PersistentStore + Send + Sync>;

/// Stores artifacts as files in a single directory, created on first write.
#[derive(Clone, Debug)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[inline]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl PersistentStore for FileStore {
    fn exists(&self, artifact: &str) -> bool {
        self.directory.join(artifact).is_file()
    }

    fn read(&self, artifact: &str) -> io::Result<Vec<u8>> {
        fs::read(self.directory.join(artifact))
    }

    fn write(&self, artifact: &str, contents: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.directory)?;

        let mut file = NamedTempFile::new_in(&self.directory)?;
        file.write_all(contents)?;
        file.flush()?;
        file.persist(self.directory.join(artifact))
            .map_err(|error| error.error)?;
        Ok(())
    }
}
