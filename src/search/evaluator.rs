//! Trial evaluation and history keeping
//!
//! Each trial is a pure function of its hyperparameter vector over the shared
//! read-only observation set; trials are therefore embarrassingly parallel.
//! The history is the only shared state, append-only behind a single writer
//! lock, and a recorded trial is never mutated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::engine::{fit, BinnerConfig, Observation, SplitParams, SplitStrategy};
use crate::utils::progress::{create_progress_bar, finish_with_success};

use super::{ParamSpace, Proposer, SearchTrial, TrialOutcome, SENTINEL_SCORE};

/// Evaluates hyperparameter vectors against one observation set and keeps
/// the append-only trial history
pub struct Evaluator<'a, S> {
    observations: &'a [Observation],
    splitter: S,
    config: BinnerConfig,
    history: Mutex<Vec<SearchTrial>>,
    cancelled: AtomicBool,
}

impl<'a, S: SplitStrategy + Sync> Evaluator<'a, S> {
    pub fn new(observations: &'a [Observation], splitter: S, config: BinnerConfig) -> Self {
        Self {
            observations,
            splitter,
            config,
            history: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Evaluate one hyperparameter vector and record the trial.
    ///
    /// Engine errors do not propagate: the trial is recorded with
    /// [`SENTINEL_SCORE`] and the error text, so one bad combination never
    /// halts exploration of the others.
    pub fn evaluate(&self, params: &SplitParams) -> SearchTrial {
        let (score, outcome) = match fit(self.observations, &self.splitter, params, &self.config)
        {
            Ok(report) => {
                let separability = report.stability.as_ref().map_or(0.0, |m| m.separability);
                (
                    report.score,
                    TrialOutcome::Completed {
                        n_bins: report.bins.len(),
                        iv: report.iv,
                        ks: report.ks,
                        separability,
                        degenerate: report.degenerate,
                    },
                )
            }
            Err(err) => (SENTINEL_SCORE, TrialOutcome::Failed {
                error: err.to_string(),
            }),
        };
        self.record(params.clone(), score, outcome)
    }

    fn record(&self, params: SplitParams, score: f64, outcome: TrialOutcome) -> SearchTrial {
        let mut history = self.lock_history();
        let trial = SearchTrial {
            number: history.len(),
            params,
            score,
            outcome,
        };
        history.push(trial.clone());
        trial
    }

    /// Run `n_trials` sequential proposer-driven trials.
    /// Stops early when cancelled; cancellation is only checked between
    /// trials, never mid-refinement.
    pub fn run(
        &self,
        space: &ParamSpace,
        proposer: &mut dyn Proposer,
        n_trials: usize,
        show_progress: bool,
    ) -> Vec<SearchTrial> {
        let pb = show_progress
            .then(|| create_progress_bar(n_trials as u64, "   Searching split parameters"));

        let mut trials = Vec::with_capacity(n_trials);
        for _ in 0..n_trials {
            if self.is_cancelled() {
                break;
            }
            let params = proposer.propose(space, &self.history());
            trials.push(self.evaluate(&params));
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = &pb {
            finish_with_success(pb, &format!("Explored {} trials", trials.len()));
        }
        trials
    }

    /// Evaluate a pre-proposed batch in parallel. Trial numbering follows
    /// completion order; only log reproducibility depends on it.
    pub fn run_batch(&self, batch: &[SplitParams]) -> Vec<SearchTrial> {
        batch
            .par_iter()
            .filter_map(|params| {
                if self.is_cancelled() {
                    None
                } else {
                    Some(self.evaluate(params))
                }
            })
            .collect()
    }

    /// Ask the evaluator to stop before the next trial
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Snapshot of the trial history so far
    pub fn history(&self) -> Vec<SearchTrial> {
        self.lock_history().clone()
    }

    /// Highest-scoring completed trial, if any trial completed
    pub fn best(&self) -> Option<SearchTrial> {
        self.lock_history()
            .iter()
            .filter(|t| t.is_completed())
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    /// Trial history as pretty-printed JSON for post-hoc reporting
    pub fn history_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.history())
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<SearchTrial>> {
        // a poisoned lock only means another trial panicked; the history
        // itself is still valid
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}
