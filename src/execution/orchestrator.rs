//! Batch run orchestration.
//!
//! With a thread budget of zero the orchestrator reads one task at a time and
//! processes it inline. Otherwise it starts `ceil(T / threads_per_reader)`
//! reader agents. Each reader pulls a batch of tasks, hands it to one worker
//! thread and waits for that worker before pulling the next batch. Workers
//! run every task's effect chain through a shared [`SubImageDecomposer`] and
//! save each result on its own writer thread.
//!
//! A load or save failure is fatal: it trips the run's cancellation token,
//! every agent winds down at its next check, and [`Orchestrator::run`]
//! returns the first such error.

use crate::core::config::EditorConfig;
use crate::core::error::{EditorError, EditorResult};
use crate::core::raster::Raster;
use crate::core::store::RasterStore;
use crate::execution::chain::EffectChainRunner;
use crate::execution::decomposer::SubImageDecomposer;
use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::tasks::{TaskRecord, TaskSource};
use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks whose result was saved.
    pub tasks_processed: usize,
    /// Effects applied across all saved tasks.
    pub effects_applied: usize,
    /// Unrecognized effect codes that were passed through.
    pub effects_skipped: usize,
    /// Malformed task records dropped by the source.
    pub records_skipped: usize,
    /// Reader agents used; zero in sequential mode.
    pub readers: usize,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

/// Drives a task stream through load, effect chain and save.
pub struct Orchestrator<S: RasterStore> {
    config: EditorConfig,
    store: S,
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl<S: RasterStore> Orchestrator<S> {
    /// Create an orchestrator; fails if `config` cannot drive a run.
    pub fn new(config: EditorConfig, store: S) -> EditorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            progress_callback: None,
        })
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every task in `source`.
    pub fn run<R: Read + Send>(&self, source: &TaskSource<R>) -> EditorResult<RunSummary> {
        let tracker = ProgressTracker::new(self.progress_callback.clone());
        let readers = self.config.reader_count();
        tracker.start(self.config.threads, readers);

        if self.config.is_sequential() {
            log::info!("Running sequentially");
        } else {
            log::info!(
                "Running with {} threads across {} readers (batch size {})",
                self.config.threads,
                readers,
                self.config.batch_size
            );
        }

        let failure = Mutex::new(None);
        if self.config.is_sequential() {
            self.run_sequential(source, &tracker, &failure);
        } else {
            self.run_concurrent(source, readers, &tracker, &failure);
        }

        if let Some(error) = failure.into_inner() {
            return Err(error);
        }

        tracker.complete();
        let summary = RunSummary {
            tasks_processed: tracker.tasks_completed(),
            effects_applied: tracker.effects_applied(),
            effects_skipped: tracker.effects_skipped(),
            records_skipped: source.records_skipped(),
            readers,
            duration: tracker.elapsed(),
        };
        if let Some(average) = tracker.average_task_ms() {
            log::debug!("Average task time: {}ms", average);
        }
        Ok(summary)
    }

    fn run_sequential<R: Read + Send>(
        &self,
        source: &TaskSource<R>,
        tracker: &ProgressTracker,
        failure: &Mutex<Option<EditorError>>,
    ) {
        let runner = EffectChainRunner::sequential();
        while !tracker.is_cancelled() {
            let Some(task) = source.next_task() else {
                break;
            };
            if let Err(error) = self.process_task(&task, &runner, tracker, false) {
                record_failure(tracker, failure, error);
            }
        }
    }

    fn run_concurrent<R: Read + Send>(
        &self,
        source: &TaskSource<R>,
        readers: usize,
        tracker: &ProgressTracker,
        failure: &Mutex<Option<EditorError>>,
    ) {
        let decomposer = match SubImageDecomposer::from_config(&self.config) {
            Ok(decomposer) => decomposer,
            Err(error) => return record_failure(tracker, failure, error),
        };
        let decomposer = &decomposer;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(readers);
            for id in 0..readers {
                let spawned = thread::Builder::new()
                    .name(format!("reader-{}", id))
                    .spawn_scoped(scope, move || {
                        self.reader_loop(id, source, decomposer, tracker)
                    });
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(error) => {
                        record_failure(tracker, failure, error.into());
                        break;
                    }
                }
            }

            for (id, handle) in handles {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(EditorError::WorkerPanicked(format!("reader-{}", id))));
                if let Err(error) = result {
                    record_failure(tracker, failure, error);
                }
            }
        });
    }

    /// One reader agent: pull a batch, run it on a worker, repeat.
    fn reader_loop<R: Read + Send>(
        &self,
        id: usize,
        source: &TaskSource<R>,
        decomposer: &SubImageDecomposer,
        tracker: &ProgressTracker,
    ) -> EditorResult<()> {
        let runner = EffectChainRunner::decomposed(decomposer).with_buffer(self.config.chain_buffer);
        let mut batches = 0usize;

        while !tracker.is_cancelled() {
            let batch = source.next_batch(self.config.batch_size);
            if batch.is_empty() {
                break;
            }
            batches += 1;
            log::debug!("Reader {} took a batch of {} tasks", id, batch.len());

            let runner = &runner;
            thread::scope(|scope| {
                let worker = thread::Builder::new()
                    .name(format!("worker-{}", id))
                    .spawn_scoped(scope, move || self.process_batch(batch, runner, tracker))?;
                worker
                    .join()
                    .map_err(|_| EditorError::WorkerPanicked(format!("worker-{}", id)))?
            })?;
        }

        log::debug!("Reader {} finished after {} batches", id, batches);
        Ok(())
    }

    fn process_batch(
        &self,
        batch: Vec<TaskRecord>,
        runner: &EffectChainRunner<'_>,
        tracker: &ProgressTracker,
    ) -> EditorResult<()> {
        for task in &batch {
            if tracker.is_cancelled() {
                return Err(EditorError::Cancelled);
            }
            self.process_task(task, runner, tracker, true)?;
        }
        Ok(())
    }

    /// Load, filter and save one task.
    fn process_task(
        &self,
        task: &TaskRecord,
        runner: &EffectChainRunner<'_>,
        tracker: &ProgressTracker,
        detached_save: bool,
    ) -> EditorResult<()> {
        let start = Instant::now();
        tracker.task_started(task.source_path.clone());

        let raster = self.store.load(&task.source_path)?;
        let (raster, report) = runner.run(raster, &task.effects, tracker.token())?;
        if report.cancelled {
            return Err(EditorError::Cancelled);
        }
        for code in report.skipped {
            tracker.effect_skipped(task.source_path.clone(), code);
        }

        if detached_save {
            self.save_on_writer(&raster, &task.destination_path)?;
        } else {
            self.store.save(&raster, &task.destination_path)?;
        }

        let elapsed = start.elapsed().as_millis() as u64;
        log::info!(
            "{} -> {} ({} effects, {}ms)",
            task.source_path.display(),
            task.destination_path.display(),
            report.applied.len(),
            elapsed
        );
        tracker.task_completed(task.destination_path.clone(), report.applied.len(), elapsed);
        Ok(())
    }

    fn save_on_writer(&self, raster: &Raster, destination: &Path) -> EditorResult<()> {
        thread::scope(|scope| {
            let writer = thread::Builder::new()
                .name("writer".to_string())
                .spawn_scoped(scope, || self.store.save(raster, destination))?;
            writer
                .join()
                .map_err(|_| EditorError::WorkerPanicked("writer".to_string()))?
        })
    }
}

/// Keep the first fatal error and stop the run.
fn record_failure(tracker: &ProgressTracker, slot: &Mutex<Option<EditorError>>, error: EditorError) {
    if matches!(error, EditorError::Cancelled) {
        return;
    }
    let mut slot = slot.lock();
    if slot.is_none() {
        log::error!("{}", error);
        tracker.report_error(&error);
        *slot = Some(error);
    } else {
        log::debug!("Suppressed follow-up error: {}", error);
    }
    drop(slot);
    tracker.cancel();
}
