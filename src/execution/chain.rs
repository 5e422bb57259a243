//! Effect-chain execution for a single task.
//!
//! In concurrent mode the chain runs as two stages joined by a bounded
//! channel:
//!
//! ```text
//! ┌──────────────┐  StageResult  ┌──────────────┐
//! │ effect stage │──────────────▶│ report stage │
//! └──────────────┘   (bounded)   └──────────────┘
//! ```
//!
//! The effect stage applies each effect in order through the decomposer and
//! swaps planes between effects; the report stage consumes the results in
//! order. Either stage can stop the other through a shared cancellation
//! token. Sequential mode applies the same steps inline.

use crate::core::error::{EditorError, EditorResult};
use crate::core::raster::Raster;
use crate::execution::decomposer::SubImageDecomposer;
use crate::execution::progress::CancellationToken;
use crate::filters::{EffectCode, EffectEngine, EffectOutcome};
use crossbeam::channel::{self, Receiver, Sender};

/// Summary of one chain run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Effects that ran, in order.
    pub applied: Vec<EffectCode>,
    /// Unrecognized codes that were skipped, in order.
    pub skipped: Vec<String>,
    /// Whether the chain stopped before its last step.
    pub cancelled: bool,
}

impl ChainReport {
    fn record(&mut self, outcome: EffectOutcome) {
        match outcome {
            EffectOutcome::Applied(effect) => self.applied.push(effect),
            EffectOutcome::Skipped(code) => self.skipped.push(code),
        }
    }

    /// Number of steps that completed, applied or skipped.
    pub fn steps(&self) -> usize {
        self.applied.len() + self.skipped.len()
    }
}

/// One completed step handed from the effect stage to the report stage.
#[derive(Debug)]
struct StageResult {
    index: usize,
    outcome: EffectOutcome,
}

/// Runs a task's effect chain against one raster.
#[derive(Debug, Clone, Copy)]
pub struct EffectChainRunner<'d> {
    decomposer: Option<&'d SubImageDecomposer>,
    buffer: usize,
}

impl<'d> EffectChainRunner<'d> {
    /// Apply every effect to the whole raster on the calling thread.
    pub fn sequential() -> Self {
        Self {
            decomposer: None,
            buffer: 1,
        }
    }

    /// Apply effects through `decomposer` in a two-stage pipeline.
    pub fn decomposed(decomposer: &'d SubImageDecomposer) -> Self {
        Self {
            decomposer: Some(decomposer),
            buffer: 1,
        }
    }

    /// Capacity of the channel between the stages.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Whether this runner uses the staged pipeline.
    pub fn is_pipelined(&self) -> bool {
        self.decomposer.is_some()
    }

    /// Run `effects` in order. The returned raster's output plane holds the
    /// result of the last step.
    pub fn run(
        &self,
        raster: Raster,
        effects: &[String],
        cancel: &CancellationToken,
    ) -> EditorResult<(Raster, ChainReport)> {
        if self.is_pipelined() && !effects.is_empty() {
            self.run_pipelined(raster, effects, cancel)
        } else {
            self.run_inline(raster, effects, cancel)
        }
    }

    fn run_inline(
        &self,
        mut raster: Raster,
        effects: &[String],
        cancel: &CancellationToken,
    ) -> EditorResult<(Raster, ChainReport)> {
        let mut report = ChainReport::default();
        let last = effects.len().saturating_sub(1);
        for (index, code) in effects.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.record(self.step(&mut raster, code)?);
            if index != last {
                raster.swap_planes();
            }
        }
        Ok((raster, report))
    }

    fn run_pipelined(
        &self,
        raster: Raster,
        effects: &[String],
        cancel: &CancellationToken,
    ) -> EditorResult<(Raster, ChainReport)> {
        let token = cancel.child();
        let (tx, rx) = channel::bounded(self.buffer);

        std::thread::scope(|scope| {
            let stage_token = token.clone();
            let producer = std::thread::Builder::new()
                .name("effect-stage".to_string())
                .spawn_scoped(scope, move || self.produce(raster, effects, &stage_token, tx))?;

            let report = Self::consume(effects.len(), &token, rx);

            let raster = producer
                .join()
                .map_err(|_| EditorError::WorkerPanicked("effect stage".to_string()))??;
            Ok((raster, report))
        })
    }

    /// Effect stage: apply each step and push its outcome downstream.
    fn produce(
        &self,
        mut raster: Raster,
        effects: &[String],
        token: &CancellationToken,
        tx: Sender<StageResult>,
    ) -> EditorResult<Raster> {
        let last = effects.len().saturating_sub(1);
        for (index, code) in effects.iter().enumerate() {
            if token.is_cancelled() {
                log::debug!("Effect stage abandoned at step {}", index);
                break;
            }
            let outcome = match self.step(&mut raster, code) {
                Ok(outcome) => outcome,
                Err(error) => {
                    token.cancel();
                    return Err(error);
                }
            };
            if index != last {
                raster.swap_planes();
            }
            if tx.send(StageResult { index, outcome }).is_err() {
                // Report stage is gone.
                token.cancel();
                break;
            }
        }
        Ok(raster)
    }

    /// Report stage: take results strictly in chain order.
    fn consume(expected: usize, token: &CancellationToken, rx: Receiver<StageResult>) -> ChainReport {
        let mut report = ChainReport::default();
        for next in 0..expected {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match rx.recv() {
                Ok(result) if result.index == next => report.record(result.outcome),
                Ok(result) => {
                    log::error!("Effect step {} arrived while expecting {}", result.index, next);
                    token.cancel();
                    report.cancelled = true;
                    break;
                }
                Err(_) => {
                    report.cancelled = true;
                    break;
                }
            }
        }
        report
    }

    fn step(&self, raster: &mut Raster, code: &str) -> EditorResult<EffectOutcome> {
        match (self.decomposer, code.parse::<EffectCode>()) {
            (Some(decomposer), Ok(effect)) => {
                decomposer.apply(raster, effect)?;
                Ok(EffectOutcome::Applied(effect))
            }
            _ => Ok(EffectEngine::apply_code(raster, code)),
        }
    }
}
