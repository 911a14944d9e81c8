use super::{ImportJob, ImportOutcome, ImportReport, ImportReporter, ImportScheduler, Importer};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

const IDLE_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportProgress {
    pub pending: u32,
    pub imported: u32,
    pub failed: u32,
    pub last_result: Option<ImportReport>,
}

pub struct ImportState(pub Mutex<ImportProgress>);

impl ImportState {
    pub fn new() -> Self {
        Self(Mutex::new(ImportProgress::default()))
    }

    fn update(&self, f: impl FnOnce(&mut ImportProgress)) {
        if let Ok(mut p) = self.0.lock() {
            f(&mut p);
        }
    }

    fn finish(&self, report: ImportReport) {
        self.update(|p| {
            p.pending = p.pending.saturating_sub(1);
            if report.is_success() {
                p.imported += 1;
            } else {
                p.failed += 1;
            }
            p.last_result = Some(report);
        });
    }

    pub fn get(&self) -> ImportProgress {
        self.0.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for ImportState {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs import jobs on a bounded pool of blocking worker threads.
///
/// `schedule` returns immediately. Jobs may finish in any order; there is no
/// cancellation once a job is queued.
pub struct ImportQueue {
    runtime: Mutex<Option<Runtime>>,
    importer: Arc<Importer>,
    reporter: Arc<dyn ImportReporter>,
    state: Arc<ImportState>,
}

impl ImportQueue {
    pub fn new(
        importer: Importer,
        reporter: Arc<dyn ImportReporter>,
        workers: usize,
    ) -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers.max(1))
            .thread_name("waymark-import")
            .build()
            .map_err(|e| format!("failed to start import workers: {e}"))?;
        tracing::debug!(workers, "import queue started");
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            importer: Arc::new(importer),
            reporter,
            state: Arc::new(ImportState::new()),
        })
    }

    pub fn importer(&self) -> &Importer {
        &self.importer
    }

    pub fn progress(&self) -> ImportProgress {
        self.state.get()
    }

    /// Block until no job is pending or `timeout` passes. Returns true when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state.get().pending == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(IDLE_POLL);
        }
    }

    /// Stop accepting jobs and give running ones up to `timeout` to finish.
    pub fn shutdown(&self, timeout: Duration) {
        let runtime = self.runtime.lock().ok().and_then(|mut rt| rt.take());
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(timeout);
            tracing::debug!("import queue stopped");
        }
    }
}

impl ImportScheduler for ImportQueue {
    fn schedule(&self, job: ImportJob) {
        let Ok(guard) = self.runtime.lock() else {
            return;
        };
        let Some(runtime) = guard.as_ref() else {
            tracing::warn!(resource = %job.resource, "import queue is shut down, dropping job");
            self.reporter.report(ImportReport {
                resource: job.resource,
                outcome: ImportOutcome::Failed {
                    error: "import queue is shut down".into(),
                },
            });
            return;
        };

        self.state.update(|p| p.pending += 1);
        let importer = Arc::clone(&self.importer);
        let reporter = Arc::clone(&self.reporter);
        let state = Arc::clone(&self.state);
        runtime.spawn_blocking(move || {
            tracing::debug!(resource = %job.resource, "import started");
            let report = importer.run(&job);
            reporter.report(report.clone());
            state.finish(report);
        });
    }
}

impl Drop for ImportQueue {
    fn drop(&mut self) {
        self.shutdown(Duration::from_secs(5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::BookmarkStore;
    use crate::import::ChannelReporter;
    use tempfile::TempDir;

    fn queue(dir: &TempDir) -> (ImportQueue, tokio::sync::mpsc::UnboundedReceiver<ImportReport>) {
        let (reporter, rx) = ChannelReporter::new();
        let importer = Importer::new(BookmarkStore::new(dir.path().join("store")), 1 << 20);
        let queue = ImportQueue::new(importer, Arc::new(reporter), 2).unwrap();
        (queue, rx)
    }

    fn job(dir: &TempDir, name: &str, body: &str) -> ImportJob {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        ImportJob {
            resource: path.to_string_lossy().to_string(),
            staging_dir: dir.path().join("staging"),
        }
    }

    #[test]
    fn every_job_reports_once() {
        let dir = TempDir::new().unwrap();
        let (queue, mut rx) = queue(&dir);
        queue.schedule(job(&dir, "a.gpx", r#"<gpx><wpt lat="1" lon="2"/></gpx>"#));
        queue.schedule(job(&dir, "b.txt", "nothing"));
        assert!(queue.wait_idle(Duration::from_secs(10)));

        let mut reports = vec![rx.try_recv().unwrap(), rx.try_recv().unwrap()];
        assert!(rx.try_recv().is_err());
        reports.sort_by(|a, b| a.resource.cmp(&b.resource));
        assert!(reports[0].is_success());
        assert!(!reports[1].is_success());

        let progress = queue.progress();
        assert_eq!(progress.pending, 0);
        assert_eq!(progress.imported, 1);
        assert_eq!(progress.failed, 1);
        assert!(progress.last_result.is_some());
    }

    #[test]
    fn schedule_after_shutdown_reports_failure() {
        let dir = TempDir::new().unwrap();
        let (queue, mut rx) = queue(&dir);
        queue.shutdown(Duration::from_secs(1));
        queue.schedule(job(&dir, "a.gpx", "<gpx/>"));
        let report = rx.try_recv().unwrap();
        assert!(!report.is_success());
        assert_eq!(queue.progress().pending, 0);
    }
}
