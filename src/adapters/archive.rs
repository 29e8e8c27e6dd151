use crate::domain::ports::ArchiveExtractor;
use crate::utils::error::{IntakeError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extracts ZIP archives with the `zip` crate on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

fn extract_blocking(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    std::fs::create_dir_all(dest)?;
    zip.extract(dest)?;
    Ok(zip.len())
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let archive_path: PathBuf = archive.to_path_buf();
        let dest_path: PathBuf = dest.to_path_buf();

        let entries = tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &dest_path))
            .await
            .map_err(|e| IntakeError::Extraction {
                archive: archive.to_path_buf(),
                message: format!("extraction task failed: {}", e),
            })?
            .map_err(|e| IntakeError::Extraction {
                archive: archive.to_path_buf(),
                message: e.to_string(),
            })?;

        tracing::debug!("Unpacked {} entries from {}", entries, archive.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    #[tokio::test]
    async fn test_extracts_nested_tree() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("submission.zip");
        {
            let mut zip = ZipWriter::new(File::create(&archive).unwrap());
            zip.add_directory("wrap/api/", SimpleFileOptions::default()).unwrap();
            zip.start_file("wrap/api/package.json", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"{}").unwrap();
            zip.finish().unwrap();
        }

        let dest = tmp.path().join("submission");
        ZipExtractor.extract(&archive, &dest).await.unwrap();

        let content = std::fs::read_to_string(dest.join("wrap/api/package.json")).unwrap();
        assert_eq!(content, "{}");
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip at all").unwrap();

        let err = ZipExtractor
            .extract(&archive, &tmp.path().join("broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Extraction { .. }));
    }
}
