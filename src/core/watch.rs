use crate::config::toml_config::WatchConfig;
use crate::core::intake::IntakePipeline;
use crate::core::stability::{Readiness, StabilityDetector};
use crate::domain::model::{RunReport, WatchEvent, WatchEventKind};
use crate::domain::ports::{ArchiveExtractor, SizeProbe, Toolchain};
use crate::utils::error::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

impl WatchEvent {
    pub fn from_notify(event: &Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::Other,
            EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Renamed,
            _ => WatchEventKind::Other,
        };
        // For a two-sided rename the destination comes last.
        let path = event.paths.last()?.clone();
        Some(Self::new(kind, path))
    }
}

/// Gates archives on stability, then runs them through the pipeline.
pub struct ArchiveDispatcher<P, E, T>
where
    P: SizeProbe,
    E: ArchiveExtractor,
    T: Toolchain,
{
    detector: StabilityDetector<P>,
    pipeline: IntakePipeline<E, T>,
    extension: String,
    serialize_runs: bool,
    pending: Mutex<HashSet<PathBuf>>,
}

impl<P, E, T> ArchiveDispatcher<P, E, T>
where
    P: SizeProbe + 'static,
    E: ArchiveExtractor + 'static,
    T: Toolchain + 'static,
{
    pub fn new(
        detector: StabilityDetector<P>,
        pipeline: IntakePipeline<E, T>,
        config: &WatchConfig,
    ) -> Self {
        Self {
            detector,
            pipeline,
            extension: config.extension.clone(),
            serialize_runs: config.serialize_runs,
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn pipeline(&self) -> &IntakePipeline<E, T> {
        &self.pipeline
    }

    /// Waits for the archive to settle and processes it in the calling task.
    pub async fn process_when_stable(&self, archive: &Path) -> Option<RunReport> {
        match self.detector.wait_until_stable(archive).await {
            Readiness::Ready { .. } => self.pipeline.process_logged(archive).await,
            Readiness::NotReady { polls } => {
                tracing::warn!(
                    "⚠️ File {} is not stable after {} polls. Skipping.",
                    archive.display(),
                    polls
                );
                None
            }
        }
    }

    /// Claims the path unless it is already being handled.
    async fn claim(&self, path: &Path) -> bool {
        self.pending.lock().await.insert(path.to_path_buf())
    }

    async fn release(&self, path: &Path) {
        self.pending.lock().await.remove(path);
    }

    /// Consumes watch events until the sender side closes.
    pub async fn dispatch(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<WatchEvent>) {
        let (run_tx, mut run_rx) = mpsc::unbounded_channel::<PathBuf>();

        let worker = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                while let Some(path) = run_rx.recv().await {
                    this.pipeline.process_logged(&path).await;
                    this.release(&path).await;
                }
            })
        };

        while let Some(event) = events.recv().await {
            if !event.is_archive(&self.extension) {
                continue;
            }
            if !self.claim(&event.path).await {
                tracing::debug!("{} is already pending", event.path.display());
                continue;
            }
            tracing::info!("📥 New archive: {}", event.path.display());

            let this = Arc::clone(&self);
            let run_tx = run_tx.clone();
            tokio::spawn(async move {
                let path = event.path;
                match this.detector.wait_until_stable(&path).await {
                    Readiness::Ready { .. } if this.serialize_runs => {
                        if run_tx.send(path.clone()).is_err() {
                            this.release(&path).await;
                        }
                    }
                    Readiness::Ready { .. } => {
                        this.pipeline.process_logged(&path).await;
                        this.release(&path).await;
                    }
                    Readiness::NotReady { polls } => {
                        tracing::warn!(
                            "⚠️ File {} is not stable after {} polls. Skipping.",
                            path.display(),
                            polls
                        );
                        this.release(&path).await;
                    }
                }
            });
        }

        drop(run_tx);
        if let Err(e) = worker.await {
            tracing::error!("⛔ Run worker stopped: {}", e);
        }
    }
}

/// Watches `config.dir` for archives for the lifetime of the process.
pub async fn run_watch_loop<P, E, T>(
    config: &WatchConfig,
    dispatcher: Arc<ArchiveDispatcher<P, E, T>>,
) -> Result<()>
where
    P: SizeProbe + 'static,
    E: ArchiveExtractor + 'static,
    T: Toolchain + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => {
                if let Some(event) = WatchEvent::from_notify(&event) {
                    let _ = tx.send(event);
                }
            }
            Err(e) => tracing::warn!("Watch error: {}", e),
        }
    })?;
    watcher.watch(&config.dir, RecursiveMode::NonRecursive)?;

    tracing::info!(
        "👁️ Watching {} for *.{} archives",
        config.dir.display(),
        config.extension
    );

    dispatcher.dispatch(rx).await;
    drop(watcher);
    Ok(())
}
