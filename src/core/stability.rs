use crate::domain::model::PendingArchive;
use crate::domain::ports::SizeProbe;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Two consecutive reads agreed after `intervals` waits.
    Ready { intervals: u32 },
    NotReady { polls: u32 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Decides when a file that may still be copying has stopped growing.
pub struct StabilityDetector<P: SizeProbe> {
    probe: P,
    interval: Duration,
    timeout: Duration,
}

impl<P: SizeProbe> StabilityDetector<P> {
    pub fn new(probe: P, interval: Duration, timeout: Duration) -> Self {
        Self {
            probe,
            interval,
            timeout,
        }
    }

    /// Number of size reads the budget allows: one up front, then one per interval.
    pub fn max_polls(&self) -> u32 {
        let interval_ms = self.interval.as_millis().max(1);
        let waits = (self.timeout.as_millis() / interval_ms).min(u32::MAX as u128 - 1) as u32;
        waits + 1
    }

    pub async fn wait_until_stable(&self, path: &Path) -> Readiness {
        let mut pending = PendingArchive::new(path);
        let max_polls = self.max_polls();

        while pending.poll_count < max_polls {
            if pending.poll_count > 0 {
                tokio::time::sleep(self.interval).await;
            }
            let tick = pending.poll_count;
            pending.poll_count += 1;

            match self.probe.size_of(&pending.path).await {
                Ok(size) => {
                    if pending.observe(size) {
                        tracing::debug!(
                            "File {} settled at {} bytes after {} polls",
                            pending.path.display(),
                            size,
                            pending.poll_count
                        );
                        return Readiness::Ready { intervals: tick };
                    }
                }
                Err(e) => {
                    // The previous sample is kept; a briefly missing file is not a reset.
                    tracing::debug!("Skipping poll of {}: {}", pending.path.display(), e);
                }
            }
        }

        Readiness::NotReady {
            polls: pending.poll_count,
        }
    }
}
