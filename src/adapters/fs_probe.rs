use crate::domain::ports::SizeProbe;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct FsSizeProbe;

#[async_trait]
impl SizeProbe for FsSizeProbe {
    async fn size_of(&self, path: &Path) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}
