use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// On-disk store for complaint attachments.
///
/// Each attachment is a flat file at `{dir}/{stored_name}`; the stored name
/// is derived from the complaint id, never from the uploaded filename.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    pub async fn write_file(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(stored_name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn delete_file(&self, stored_name: &str) -> Result<()> {
        let path = self.file_path(stored_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted upload {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", stored_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce a client-supplied filename to a safe display name: directory
/// components dropped, anything outside `[A-Za-z0-9._-]` replaced with `_`,
/// leading dots stripped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\Users\me\statement.pdf"), "statement.pdf");
    }

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my statement (1).pdf"), "my_statement__1_.pdf");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[tokio::test]
    async fn write_then_delete() {
        let dir = std::env::temp_dir().join(format!("ragguard_storage_{}", uuid::Uuid::new_v4()));
        let storage = Storage::new(dir.clone()).await.unwrap();

        storage.write_file("a.pdf", b"%PDF-1.4").await.unwrap();
        assert!(dir.join("a.pdf").exists());
        assert_eq!(std::fs::read(dir.join("a.pdf")).unwrap(), b"%PDF-1.4");

        storage.delete_file("a.pdf").await.unwrap();
        assert!(!dir.join("a.pdf").exists());
        // deleting twice is fine
        storage.delete_file("a.pdf").await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }
}
