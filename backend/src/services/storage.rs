//! Attachment file storage on the local filesystem

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};
use crate::repositories::NewAttachment;

/// Upload directory plus the limits files are checked against
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
    limits: UploadConfig,
}

impl UploadStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            limits: config.clone(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.limits.max_file_size
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn check_mime_type(&self, mime_type: &str) -> AppResult<()> {
        if self.limits.allows(mime_type) {
            Ok(())
        } else {
            Err(AppError::field(
                "files",
                format!("File type {} is not allowed", mime_type),
            ))
        }
    }

    /// Fails once `size` passes the configured limit
    pub fn check_size(&self, size: u64) -> AppResult<()> {
        if size > self.limits.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.limits.max_file_size
            )));
        }
        Ok(())
    }

    /// Write one uploaded file under a generated `uuid.ext` name
    pub async fn save(&self, original_name: &str, mime_type: &str, bytes: &[u8]) -> AppResult<NewAttachment> {
        self.check_mime_type(mime_type)?;
        self.check_size(bytes.len() as u64)?;

        let stored_name = stored_name_for(original_name, Uuid::new_v4());
        let path = self.dir.join(&stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("writing {}: {}", path.display(), e)))?;

        tracing::debug!("Stored upload {} as {}", original_name, stored_name);

        Ok(NewAttachment {
            original_name: original_name.to_string(),
            stored_name,
            mime_type: mime_type.to_string(),
            size_bytes: bytes.len() as i64,
            path: path.to_string_lossy().into_owned(),
        })
    }

    /// Remove files whose database rows were never committed
    pub async fn discard(&self, files: &[NewAttachment]) {
        for file in files {
            if let Err(e) = tokio::fs::remove_file(&file.path).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", file.path, e);
            }
        }
    }

    /// Path of a stored file; names with separators or `..` are rejected
    pub fn resolve(&self, filename: &str) -> AppResult<PathBuf> {
        if !is_safe_filename(filename) {
            return Err(AppError::field("filename", "Invalid file name"));
        }
        Ok(self.dir.join(filename))
    }

    pub async fn read(&self, filename: &str) -> AppResult<Vec<u8>> {
        let path = self.resolve(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound("File".into())),
            Err(e) => Err(AppError::StorageError(format!("reading {}: {}", path.display(), e))),
        }
    }
}

fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\', '\0'])
        && !filename.contains("..")
        && Path::new(filename).file_name().is_some()
}

/// `uuid.ext`, keeping a short alphanumeric extension from the client's name
fn stored_name_for(original_name: &str, id: Uuid) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path) -> UploadStorage {
        UploadStorage::new(&UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            max_file_size: 8,
            allowed_mime_types: vec!["image/png".into(), "application/pdf".into()],
        })
    }

    #[test]
    fn test_stored_name_keeps_extension() {
        let id = Uuid::nil();
        assert_eq!(
            stored_name_for("Receipt.PDF", id),
            "00000000-0000-0000-0000-000000000000.pdf"
        );
        assert_eq!(stored_name_for("noext", id), id.to_string());
        assert_eq!(stored_name_for("weird.p d f", id), id.to_string());
    }

    #[test]
    fn test_safe_filenames() {
        assert!(is_safe_filename("abc.png"));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn test_limits() {
        let s = storage(Path::new("/tmp"));
        assert!(s.check_mime_type("IMAGE/PNG").is_ok());
        assert!(s.check_mime_type("text/html").is_err());
        assert!(s.check_size(8).is_ok());
        assert!(matches!(s.check_size(9), Err(AppError::PayloadTooLarge(_))));
    }

    #[tokio::test]
    async fn test_save_read_discard() {
        let dir = std::env::temp_dir().join(format!("card-stock-{}", Uuid::new_v4()));
        let s = storage(&dir);
        s.ensure_dir().await.unwrap();

        let file = s.save("scan.png", "image/png", b"pngdata").await.unwrap();
        assert_eq!(file.size_bytes, 7);
        assert!(file.stored_name.ends_with(".png"));
        assert_eq!(s.read(&file.stored_name).await.unwrap(), b"pngdata");

        s.discard(std::slice::from_ref(&file)).await;
        assert!(matches!(
            s.read(&file.stored_name).await,
            Err(AppError::NotFound(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
