use crate::store::{BackendError, StorageBackend};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

///
/// FileBackend
///
/// One file per key under a caller-chosen directory. Writes go through a
/// sibling temp file and a rename, so an interrupted write cannot
/// truncate the previously persisted value.
///

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) the backing directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, BackendError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| BackendError::Io {
            key: dir.display().to_string(),
            message: err.to_string(),
        })?;

        Ok(Self { dir })
    }

    // Keys become file names; reject anything that could escape the
    // directory or collide with the temp suffix.
    fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(BackendError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.dir.join(format!("{key}.json")))
    }

    fn io_err(key: &str, err: &io::Error) -> BackendError {
        BackendError::Io {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let path = self.path_for(key)?;

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_err(key, &err)),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        fs::write(&tmp, bytes).map_err(|err| Self::io_err(key, &err))?;
        fs::rename(&tmp, &path).map_err(|err| Self::io_err(key, &err))
    }

    fn remove(&mut self, key: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_err(key, &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::open(dir.path()).expect("open should succeed");

        backend.write("products", b"[1,2,3]").expect("write");
        let bytes = backend.read("products").expect("read");

        assert_eq!(bytes.as_deref(), Some(b"[1,2,3]".as_slice()));
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::open(dir.path()).expect("open should succeed");

        assert!(backend.read("avatars").expect("read").is_none());
    }

    #[test]
    fn overwrite_replaces_previous_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::open(dir.path()).expect("open should succeed");

        backend.write("products", b"old").expect("write");
        backend.write("products", b"new").expect("write");

        let bytes = backend.read("products").expect("read");
        assert_eq!(bytes.as_deref(), Some(b"new".as_slice()));
    }

    #[test]
    fn hostile_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::open(dir.path()).expect("open should succeed");

        let err = backend.write("../escape", b"x").unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));

        let err = backend.read("").unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::open(dir.path()).expect("open should succeed");

        backend.write("products", b"x").expect("write");
        backend.remove("products").expect("first remove");
        backend.remove("products").expect("second remove");

        assert!(backend.read("products").expect("read").is_none());
    }

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut backend = FileBackend::open(dir.path()).expect("open should succeed");
            backend.write("products", b"persisted").expect("write");
        }

        let backend = FileBackend::open(dir.path()).expect("reopen should succeed");
        let bytes = backend.read("products").expect("read");
        assert_eq!(bytes.as_deref(), Some(b"persisted".as_slice()));
    }
}
