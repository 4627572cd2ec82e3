//! src/services/picture_store.rs
//!
//! PictureStore: local-disk blob storage for spot pictures. Files live under
//! `base_path/{namespace}/{uuid}.{ext}` and callers only ever see the
//! relative path (`spots/3f2c….jpg`), which is what gets persisted.

use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Namespace spot pictures are written under.
pub const SPOTS_NAMESPACE: &str = "spots";

const MAX_PATH_LEN: usize = 512;
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum PictureError {
    #[error("invalid picture path")]
    InvalidPath,
    #[error("picture type `{0}` is not supported (expected jpg, jpeg, png, gif or webp)")]
    UnsupportedType(String),
    #[error("picture is empty")]
    Empty,
    #[error("picture `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type PictureResult<T> = Result<T, PictureError>;

/// An uploaded picture that has not been written to disk yet.
#[derive(Clone)]
pub struct PictureUpload {
    /// Client-supplied filename, only used to derive the extension.
    pub file_name: String,
    pub bytes: Bytes,
}

impl std::fmt::Debug for PictureUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PictureUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PictureUpload {
    /// Lowercased extension if it is one of the accepted image types.
    pub fn extension(&self) -> PictureResult<String> {
        let ext = Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(PictureError::UnsupportedType(self.file_name.clone()))
        }
    }

    /// Check type and size without touching the disk.
    pub fn check(&self) -> PictureResult<()> {
        self.extension()?;
        if self.bytes.is_empty() {
            return Err(PictureError::Empty);
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PictureStore {
    /// Root of the public disk.
    pub base_path: PathBuf,
}

impl PictureStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Reject relative paths that could escape the public disk.
    fn ensure_path_safe(&self, rel: &str) -> PictureResult<()> {
        if rel.is_empty() || rel.len() > MAX_PATH_LEN {
            return Err(PictureError::InvalidPath);
        }
        if rel.starts_with('/') || rel.contains("..") {
            return Err(PictureError::InvalidPath);
        }
        if rel
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(PictureError::InvalidPath);
        }
        Ok(())
    }

    fn full_path(&self, rel: &str) -> PathBuf {
        self.base_path.join(rel)
    }

    /// Write `upload` under `namespace` and return its relative path.
    ///
    /// The payload goes to a temp file first, is fsynced, then renamed into
    /// place so readers never observe a partial picture.
    pub async fn put(&self, namespace: &str, upload: &PictureUpload) -> PictureResult<String> {
        upload.check()?;
        let ext = upload.extension()?;
        let rel = format!("{}/{}.{}", namespace, Uuid::new_v4().simple(), ext);
        self.ensure_path_safe(&rel)?;

        let file_path = self.full_path(&rel);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            PictureError::Io(io::Error::other("picture path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, &upload.bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PictureError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PictureError::Io(err));
        }

        debug!("stored picture {} ({} bytes)", rel, upload.bytes.len());
        Ok(rel)
    }

    /// Open a stored picture for streaming out.
    pub async fn open(&self, rel: &str) -> PictureResult<(File, u64)> {
        self.ensure_path_safe(rel)?;
        let file = File::open(self.full_path(rel)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                PictureError::NotFound(rel.to_string())
            } else {
                PictureError::Io(err)
            }
        })?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(PictureError::NotFound(rel.to_string()));
        }
        Ok((file, meta.len()))
    }

    /// Remove a stored picture. Missing files are not an error.
    pub async fn remove(&self, rel: &str) -> PictureResult<()> {
        self.ensure_path_safe(rel)?;
        match fs::remove_file(self.full_path(rel)).await {
            Ok(_) => {
                debug!("removed picture {}", rel);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("picture {} already missing", rel);
                Ok(())
            }
            Err(err) => Err(PictureError::Io(err)),
        }
    }

    /// Remove a picture, logging instead of failing. Used for cleanup after
    /// the database has already moved on.
    pub async fn discard(&self, rel: &str) {
        if let Err(err) = self.remove(rel).await {
            debug!("failed to discard picture {}: {}", rel, err);
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn upload(name: &str, body: &'static [u8]) -> PictureUpload {
        PictureUpload {
            file_name: name.into(),
            bytes: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn put_writes_under_namespace_and_open_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());

        let rel = store
            .put(SPOTS_NAMESPACE, &upload("Beach.JPG", b"jpeg-bytes"))
            .await
            .unwrap();
        assert!(rel.starts_with("spots/"));
        assert!(rel.ends_with(".jpg"));

        let (mut file, len) = store.open(&rel).await.unwrap();
        assert_eq!(len, 10);
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"jpeg-bytes");

        // no temp files left behind
        let mut entries = fs::read_dir(dir.path().join(SPOTS_NAMESPACE)).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with(".tmp-"));
    }

    #[tokio::test]
    async fn rejects_unsupported_and_empty_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());

        let err = store
            .put(SPOTS_NAMESPACE, &upload("notes.txt", b"hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, PictureError::UnsupportedType(_)));

        let err = store
            .put(SPOTS_NAMESPACE, &upload("empty.png", b""))
            .await
            .unwrap_err();
        assert!(matches!(err, PictureError::Empty));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());

        assert!(matches!(
            store.open("../secret.png").await,
            Err(PictureError::InvalidPath)
        ));
        assert!(matches!(
            store.open("/etc/passwd").await,
            Err(PictureError::InvalidPath)
        ));
        assert!(matches!(
            store.remove("spots\\x.png").await,
            Err(PictureError::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());
        let rel = store
            .put(SPOTS_NAMESPACE, &upload("a.png", b"png"))
            .await
            .unwrap();

        store.remove(&rel).await.unwrap();
        store.remove(&rel).await.unwrap();
        assert!(matches!(
            store.open(&rel).await,
            Err(PictureError::NotFound(_))
        ));
    }
}
