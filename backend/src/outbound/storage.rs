//! Filesystem-backed object storage.
//!
//! Objects live beneath a root directory opened once through `cap_std`, so a
//! key can never address a path outside it. Keys are `/`-separated relative
//! paths; each upload is staged next to its target and renamed into place.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{ObjectStorage, ObjectStorageError};

/// Object storage writing into a local directory tree.
#[derive(Clone)]
pub struct DirectoryObjectStorage {
    root: Arc<Dir>,
    root_path: PathBuf,
}

impl DirectoryObjectStorage {
    /// Open `root`, creating it when missing.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root_path = root.into();
        Dir::create_ambient_dir_all(&root_path, ambient_authority())?;
        let root = Dir::open_ambient_dir(&root_path, ambient_authority())?;
        Ok(Self {
            root: Arc::new(root),
            root_path,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

fn relative_key(key: &str) -> Result<PathBuf, ObjectStorageError> {
    let segments: Vec<&str> = key.split('/').collect();
    let valid = segments.iter().all(|segment| {
        !segment.is_empty()
            && !matches!(*segment, "." | "..")
            && !segment.contains(['\\', '\0'])
    });
    if valid {
        Ok(segments.iter().collect())
    } else {
        Err(ObjectStorageError::invalid_key(key))
    }
}

fn write_object(root: &Dir, relative: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = relative
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "key has no file name"))?;
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    if !parent.as_os_str().is_empty() {
        root.create_dir_all(parent)?;
    }

    let mut staged_name = file_name.to_os_string();
    staged_name.push(format!(".tmp-{}", Uuid::new_v4().simple()));
    let staged = parent.join(staged_name);

    root.write(&staged, bytes)?;
    root.rename(&staged, root, relative).inspect_err(|_| {
        let _ = root.remove_file(&staged);
    })
}

#[async_trait]
impl ObjectStorage for DirectoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStorageError> {
        let relative = relative_key(key)?;
        let root = Arc::clone(&self.root);
        let payload = bytes.to_vec();
        let size = payload.len();

        tokio::task::spawn_blocking(move || write_object(&root, &relative, &payload))
            .await
            .map_err(|err| ObjectStorageError::upload(key, err.to_string()))?
            .map_err(|err| ObjectStorageError::upload(key, err.to_string()))?;

        debug!(key, content_type, size, "object stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn storage() -> (tempfile::TempDir, DirectoryObjectStorage) {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = DirectoryObjectStorage::open(dir.path().join("assets")).expect("open");
        (dir, storage)
    }

    #[tokio::test]
    async fn upload_creates_nested_directories() {
        let (_dir, storage) = storage();

        storage
            .upload("operations/op-1/xray2.png", b"png-bytes", "image/png")
            .await
            .expect("upload succeeds");

        let root = Dir::open_ambient_dir(storage.root_path(), ambient_authority()).expect("root");
        let stored = root.read("operations/op-1/xray2.png").expect("object exists");
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn upload_replaces_existing_object_without_leftovers() {
        let (_dir, storage) = storage();
        storage
            .upload("operations/op-1/scan.png", b"first", "image/png")
            .await
            .expect("first upload");
        storage
            .upload("operations/op-1/scan.png", b"second", "image/png")
            .await
            .expect("second upload");

        let root = Dir::open_ambient_dir(storage.root_path(), ambient_authority()).expect("root");
        assert_eq!(
            root.read("operations/op-1/scan.png").expect("object"),
            b"second"
        );
        let entries = root
            .read_dir("operations/op-1")
            .expect("listing")
            .count();
        assert_eq!(entries, 1);
    }

    #[rstest]
    #[case("../escape.png")]
    #[case("operations//x.png")]
    #[case("/absolute.png")]
    #[case("operations/op-1/..")]
    #[case("")]
    fn keys_outside_the_root_are_rejected(#[case] key: &str) {
        assert_eq!(
            relative_key(key),
            Err(ObjectStorageError::invalid_key(key))
        );
    }
}
