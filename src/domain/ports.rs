use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Expands an archive into a destination directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// The external tools a run shells out to.
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn install_dependencies(&self, dir: &Path) -> Result<()>;

    /// Drops every table in the configured schema.
    async fn reset_database(&self) -> Result<()>;

    async fn run_migration(&self, dir: &Path) -> Result<()>;

    /// Starts the service in `dir` and returns without waiting on it.
    fn launch_service(&self, dir: &Path) -> Result<()>;

    async fn open_editor(&self, dir: &Path) -> Result<()>;
}

#[async_trait]
impl<T: Toolchain + ?Sized> Toolchain for Arc<T> {
    async fn install_dependencies(&self, dir: &Path) -> Result<()> {
        (**self).install_dependencies(dir).await
    }

    async fn reset_database(&self) -> Result<()> {
        (**self).reset_database().await
    }

    async fn run_migration(&self, dir: &Path) -> Result<()> {
        (**self).run_migration(dir).await
    }

    fn launch_service(&self, dir: &Path) -> Result<()> {
        (**self).launch_service(dir)
    }

    async fn open_editor(&self, dir: &Path) -> Result<()> {
        (**self).open_editor(dir).await
    }
}

#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn size_of(&self, path: &Path) -> std::io::Result<u64>;
}
