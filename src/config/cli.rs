use crate::core::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Mapping and report files written under an output directory on disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    output_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.output_dir.join(path);

        // 輸出目錄可能尚未建立
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&target, data).await?;
        tracing::debug!("Wrote {} bytes to {}", data.len(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested"));

        storage
            .write_file("out/damper_duct_mapping_ws.json", b"{}")
            .await
            .unwrap();

        let written = tokio::fs::read(dir.path().join("nested/out/damper_duct_mapping_ws.json"))
            .await
            .unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_output() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("mapping.csv", b"first").await.unwrap();
        storage.write_file("mapping.csv", b"second").await.unwrap();

        let written = tokio::fs::read(dir.path().join("mapping.csv")).await.unwrap();
        assert_eq!(written, b"second");
    }

    #[tokio::test]
    async fn test_write_into_a_file_path_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blocker"), b"x").unwrap();
        let storage = LocalStorage::new(dir.path().join("blocker"));

        assert!(storage.write_file("mapping.json", b"{}").await.is_err());
    }
}
