//! Off-thread computation of edits.
//!
//! Expensive edits (tracing a picture, re-timing a score) are computed on a
//! worker thread against a cloned snapshot of the document. The worker only
//! produces `(undo, redo)` pairs; nothing touches the live document until
//! [`Editor::submit_batch`](crate::editor::Editor::submit_batch) commits them,
//! which it refuses if the document changed since the snapshot was taken.
//!
//! Cancellation is cooperative: [`BatchJob::cancel`] raises a flag the
//! worker polls through its [`CancellationToken`]. A cancelled job never
//! yields an outcome, so there is nothing to submit.
//!
//! # Example
//!
//! ```
//! use palimpsest_core::Document;
//! use palimpsest_history::batch::BatchJob;
//! use palimpsest_history::editor::Editor;
//!
//! let mut editor = Editor::new(Document::with_keyframes(1));
//! let job = BatchJob::spawn(editor.snapshot(), "noop", |_document, _token| Vec::new());
//! let outcome = job.join().unwrap();
//! editor.submit_batch(outcome).unwrap();
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use palimpsest_core::Document;
use web_time::{Duration, Instant};

use crate::error::{HistoryError, Result};
use crate::value::ItemPair;

/// The worker's read-only view of its job's cancel flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A document copy tagged with the editor revision it was taken at.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub document: Document,
    pub revision: u64,
}

/// Pairs computed by a batch job, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub base_revision: u64,
    pub description: String,
    pub pairs: Vec<ItemPair>,
    /// Wall time from spawn to join.
    pub elapsed: Duration,
}

/// A running batch computation.
pub struct BatchJob {
    handle: JoinHandle<Vec<ItemPair>>,
    cancelled: Arc<AtomicBool>,
    base_revision: u64,
    description: String,
    started: Instant,
}

impl BatchJob {
    /// Run `compute` on a worker thread against `snapshot`.
    pub fn spawn<F>(snapshot: DocumentSnapshot, description: impl Into<String>, compute: F) -> Self
    where
        F: FnOnce(&Document, &CancellationToken) -> Vec<ItemPair> + Send + 'static,
    {
        let DocumentSnapshot { document, revision } = snapshot;
        let cancelled = Arc::new(AtomicBool::new(false));
        let token = CancellationToken {
            cancelled: Arc::clone(&cancelled),
        };
        let handle = thread::spawn(move || compute(&document, &token));
        tracing::debug!(target: "palimpsest.batch", base_revision = revision, "batch job spawned");
        Self {
            handle,
            cancelled,
            base_revision: revision,
            description: description.into(),
            started: Instant::now(),
        }
    }

    /// Ask the worker to stop. Whatever it returns afterwards is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker.
    ///
    /// A cancelled job yields [`HistoryError::Cancelled`] whatever the worker
    /// returned.
    pub fn join(self) -> Result<BatchOutcome> {
        let pairs = self.handle.join().map_err(|_| {
            tracing::warn!(target: "palimpsest.batch", "batch worker panicked");
            HistoryError::WorkerPanicked
        })?;
        if self.cancelled.load(Ordering::Acquire) {
            tracing::debug!(target: "palimpsest.batch", "batch job cancelled");
            return Err(HistoryError::Cancelled);
        }
        let elapsed = self.started.elapsed();
        tracing::debug!(
            target: "palimpsest.batch",
            pairs = pairs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "batch job finished"
        );
        Ok(BatchOutcome {
            base_revision: self.base_revision,
            description: self.description,
            pairs,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Edit, UndoItem};
    use palimpsest_core::fixtures::guide;

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            document: Document::new(),
            revision: 3,
        }
    }

    /// Spin until `token` is cancelled, giving up after ten seconds.
    fn wait_for_cancel(token: &CancellationToken) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !token.is_cancelled() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(std::time::Duration::from_millis(1));
        }
        true
    }

    #[test]
    fn join_returns_pairs_with_base_revision() {
        let job = BatchJob::spawn(snapshot(), "guides", |document, _| {
            let start = document.guides.len();
            vec![ItemPair::new(
                UndoItem::Guides(Edit::Remove(vec![start])),
                UndoItem::Guides(Edit::Append(vec![guide(2.0)])),
            )]
        });
        assert_eq!(job.base_revision(), 3);
        assert!(!job.is_cancelled());
        let outcome = job.join().unwrap();
        assert_eq!(outcome.base_revision, 3);
        assert_eq!(outcome.description, "guides");
        assert_eq!(outcome.pairs.len(), 1);
    }

    #[test]
    fn worker_observes_cancel() {
        let job = BatchJob::spawn(snapshot(), "slow", |_, token| {
            assert!(wait_for_cancel(token));
            Vec::new()
        });
        job.cancel();
        assert!(job.is_cancelled());
        assert!(matches!(job.join(), Err(HistoryError::Cancelled)));
    }

    #[test]
    fn cancel_after_the_worker_finished_still_discards() {
        let job = BatchJob::spawn(snapshot(), "fast", |document, _| {
            vec![ItemPair::new(
                UndoItem::Guides(Edit::Remove(vec![document.guides.len()])),
                UndoItem::Guides(Edit::Append(vec![guide(1.0)])),
            )]
        });
        while !job.is_finished() {
            thread::yield_now();
        }
        job.cancel();
        assert!(matches!(job.join(), Err(HistoryError::Cancelled)));
    }

    #[test]
    fn panicking_worker_is_reported() {
        let job = BatchJob::spawn(snapshot(), "boom", |_, _| {
            panic!("worker failure");
        });
        assert!(matches!(job.join(), Err(HistoryError::WorkerPanicked)));
    }
}
