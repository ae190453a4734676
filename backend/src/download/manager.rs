//! Batch runner: one downloader process at a time, cancellable

use crate::download::task::{self, ItemContext};
use crate::download::{DownloadOptions, DownloadRequest};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Colour hint for status text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Working,
    Warning,
    Error,
}

/// Capabilities the UI provides to the runner. Calls arrive on the runner's
/// task; marshalling onto a UI thread is the implementor's business.
pub trait DownloadReporter: Send + Sync {
    fn status(&self, text: &str, level: StatusLevel);

    /// Percentage in [0, 100]
    fn progress(&self, percent: f64);

    /// A history entry was written
    fn history_changed(&self);

    /// Called exactly once at the end of a batch that started
    fn finished(&self, outcome: &BatchOutcome);
}

/// Terminal state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    AllSucceeded,
    Partial,
    /// Covers both failure and cancellation
    NoneSucceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchOutcome {
    pub fn state(&self) -> BatchState {
        if self.succeeded == self.total {
            BatchState::AllSucceeded
        } else if self.succeeded > 0 {
            BatchState::Partial
        } else {
            BatchState::NoneSucceeded
        }
    }

    pub fn is_success(&self) -> bool {
        self.state() != BatchState::NoneSucceeded
    }

    pub fn message(&self) -> String {
        match self.state() {
            BatchState::AllSucceeded => "All Downloads Complete!".to_string(),
            BatchState::Partial => format!("Completed {}/{}", self.succeeded, self.total),
            BatchState::NoneSucceeded => "Downloads failed or cancelled.".to_string(),
        }
    }
}

/// Handle to the item currently running
struct ActiveItem {
    url: String,
    cancel_tx: mpsc::Sender<()>,
}

struct RunnerInner {
    history: HistoryStore,

    /// Set while a batch is in progress
    busy: AtomicBool,

    /// Cleared as soon as the item's process has exited or been cancelled
    active: Mutex<Option<ActiveItem>>,

    command_log: Option<PathBuf>,
}

/// Runs batches of downloads sequentially
#[derive(Clone)]
pub struct BatchRunner {
    inner: Arc<RunnerInner>,
}

impl BatchRunner {
    pub fn new(history: HistoryStore) -> Self {
        Self::build(history, None)
    }

    /// Dump rendered command lines to `path` for requests with `debug` set
    pub fn with_command_log(history: HistoryStore, path: PathBuf) -> Self {
        Self::build(history, Some(path))
    }

    fn build(history: HistoryStore, command_log: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                history,
                busy: AtomicBool::new(false),
                active: Mutex::new(None),
                command_log,
            }),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    pub fn is_running(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Request termination of the running item. Returns false when nothing
    /// is running, e.g. between items or when idle.
    pub fn cancel(&self) -> bool {
        let Some(item) = self.inner.active.lock().take() else {
            return false;
        };

        match item.cancel_tx.try_send(()) {
            Ok(()) => {
                info!("User cancelled the download process: {}", item.url);
                true
            }
            Err(e) => {
                error!("Failed to cancel {}: {}", item.url, e);
                false
            }
        }
    }

    /// Run a batch on a background task
    pub fn spawn(
        &self,
        urls: Vec<String>,
        options: DownloadOptions,
        reporter: Arc<dyn DownloadReporter>,
    ) -> JoinHandle<Result<BatchOutcome>> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(&urls, &options, reporter.as_ref()).await })
    }

    /// Process `urls` one after another.
    ///
    /// Configuration problems are reported before anything is launched and
    /// returned as [`Error::Config`]; `finished` is not called in that case.
    /// Otherwise every item runs regardless of earlier failures; a cancel
    /// only stops the item running at that moment.
    pub async fn run(
        &self,
        urls: &[String],
        options: &DownloadOptions,
        reporter: &dyn DownloadReporter,
    ) -> Result<BatchOutcome> {
        if let Err(e) = super::validate(urls, options) {
            reporter.status(&format!("Error: {}", e), StatusLevel::Error);
            return Err(e);
        }

        if self.inner.busy.swap(true, Ordering::SeqCst) {
            let e = Error::Config("a download batch is already running".into());
            reporter.status(&format!("Error: {}", e), StatusLevel::Error);
            return Err(e);
        }

        let total = urls.len();
        info!(
            "Starting batch of {} downloads. Mode: {}",
            total,
            options.mode.as_str()
        );

        let mut succeeded = 0;
        for (index, url) in urls.iter().enumerate() {
            reporter.status(
                &format!("Processing {}/{}...", index + 1, total),
                StatusLevel::Working,
            );
            reporter.progress(0.0);

            let request = DownloadRequest::new(url, options);
            let item = self.run_one(&request, reporter).await;

            if item.succeeded {
                succeeded += 1;
            }
            if item.cancelled {
                reporter.status("Cancelled", StatusLevel::Warning);
            }
        }

        let outcome = BatchOutcome { succeeded, total };
        info!("Batch finished: {}", outcome.message());

        self.inner.busy.store(false, Ordering::SeqCst);
        reporter.finished(&outcome);

        Ok(outcome)
    }

    /// Run a single item with the cancel slot armed for its duration.
    /// Launch and I/O failures are logged and contained here.
    async fn run_one(
        &self,
        request: &DownloadRequest<'_>,
        reporter: &dyn DownloadReporter,
    ) -> task::ItemResult {
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        *self.inner.active.lock() = Some(ActiveItem {
            url: request.url.to_string(),
            cancel_tx,
        });

        let ctx = ItemContext {
            reporter,
            history: &self.inner.history,
            cancel_rx: &mut cancel_rx,
            command_log: self.inner.command_log.as_deref(),
        };
        let result = task::run_item(request, ctx).await;

        // A cancel that arrived after the loop ended found no one listening;
        // clearing the slot keeps later calls from targeting a dead process.
        self.inner.active.lock().take();

        match result {
            Ok(item) => {
                // The slot was taken by cancel() but the signal raced natural exit
                if cancel_rx.try_recv().is_ok() {
                    return task::ItemResult {
                        cancelled: true,
                        ..item
                    };
                }
                item
            }
            Err(e) => {
                error!("Critical system error for {}: {}", request.url, e);
                task::ItemResult::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_states() {
        let all = BatchOutcome { succeeded: 3, total: 3 };
        assert_eq!(all.state(), BatchState::AllSucceeded);
        assert_eq!(all.message(), "All Downloads Complete!");

        let partial = BatchOutcome { succeeded: 2, total: 3 };
        assert_eq!(partial.state(), BatchState::Partial);
        assert_eq!(partial.message(), "Completed 2/3");
        assert!(partial.is_success());

        let none = BatchOutcome { succeeded: 0, total: 2 };
        assert_eq!(none.state(), BatchState::NoneSucceeded);
        assert!(!none.is_success());
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BatchRunner::new(HistoryStore::new(dir.path().join("history.json")));
        assert!(!runner.cancel());
        assert!(!runner.is_running());
    }
}
