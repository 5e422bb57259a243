//! Progress tracking and cancellation for a batch run.

use crate::core::error::EditorError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// The run has started.
    Started {
        threads: usize,
        readers: usize,
    },
    /// A task's source is about to be loaded.
    TaskStarted {
        source: PathBuf,
    },
    /// A task's result has been saved.
    TaskCompleted {
        destination: PathBuf,
        effects_applied: usize,
        duration_ms: u64,
    },
    /// A chain step named an unknown effect.
    EffectSkipped {
        source: PathBuf,
        code: String,
    },
    /// The run was cancelled.
    Cancelled,
    /// A fatal error occurred.
    Error {
        message: String,
    },
    /// The run has finished.
    Completed {
        tasks_processed: usize,
        total_duration_ms: u64,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// A shared stop signal.
///
/// A child token reports cancellation when either it or its parent has been
/// cancelled; cancelling a child leaves the parent untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also observes this one.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    /// Request cancellation. Returns `true` if this call set the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Check if work should stop.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.load(Ordering::SeqCst))
    }
}

/// Tracks run progress and owns the run-wide cancellation token.
pub struct ProgressTracker {
    tasks_started: AtomicU64,
    tasks_completed: AtomicU64,
    effects_applied: AtomicU64,
    effects_skipped: AtomicU64,
    token: CancellationToken,
    start_time: Instant,
    callback: Option<Arc<ProgressCallback>>,
    /// Task durations for the final summary.
    task_times: parking_lot::Mutex<Vec<u64>>,
}

impl ProgressTracker {
    /// Create a tracker; the clock starts now.
    pub fn new(callback: Option<Arc<ProgressCallback>>) -> Self {
        Self {
            tasks_started: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            effects_applied: AtomicU64::new(0),
            effects_skipped: AtomicU64::new(0),
            token: CancellationToken::new(),
            start_time: Instant::now(),
            callback,
            task_times: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Announce the run.
    pub fn start(&self, threads: usize, readers: usize) {
        self.send_update(ProgressUpdate::Started { threads, readers });
    }

    /// Report that a task has started.
    pub fn task_started(&self, source: PathBuf) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::TaskStarted { source });
    }

    /// Report that an unknown effect code was skipped.
    pub fn effect_skipped(&self, source: PathBuf, code: String) {
        self.effects_skipped.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::EffectSkipped { source, code });
    }

    /// Report that a task's result has been saved.
    pub fn task_completed(&self, destination: PathBuf, effects_applied: usize, duration_ms: u64) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.effects_applied
            .fetch_add(effects_applied as u64, Ordering::Relaxed);
        self.task_times.lock().push(duration_ms);
        self.send_update(ProgressUpdate::TaskCompleted {
            destination,
            effects_applied,
            duration_ms,
        });
    }

    /// The run-wide cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Check if the run should stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        if self.token.cancel() {
            self.send_update(ProgressUpdate::Cancelled);
        }
    }

    /// Report a fatal error.
    pub fn report_error(&self, error: &EditorError) {
        self.send_update(ProgressUpdate::Error {
            message: error.to_string(),
        });
    }

    /// Finish tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            tasks_processed: self.tasks_completed(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
        });
    }

    /// Tasks whose result has been saved.
    pub fn tasks_completed(&self) -> usize {
        self.tasks_completed.load(Ordering::Relaxed) as usize
    }

    /// Tasks that were picked up.
    pub fn tasks_started(&self) -> usize {
        self.tasks_started.load(Ordering::Relaxed) as usize
    }

    /// Effects applied across completed tasks.
    pub fn effects_applied(&self) -> usize {
        self.effects_applied.load(Ordering::Relaxed) as usize
    }

    /// Unknown effect codes skipped.
    pub fn effects_skipped(&self) -> usize {
        self.effects_skipped.load(Ordering::Relaxed) as usize
    }

    /// Mean task duration in milliseconds.
    pub fn average_task_ms(&self) -> Option<u64> {
        let times = self.task_times.lock();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<u64>() / times.len() as u64)
    }

    /// Time since the tracker was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(None)
    }
}
