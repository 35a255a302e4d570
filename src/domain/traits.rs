// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The training loop reports everything it measures through the
// ExperimentTracker trait. It never knows where the numbers end
// up: the shipped implementation writes an offline run directory
// (infra::tracker::LocalRunTracker), tests use an in-memory one.

use anyhow::Result;
use serde_json::Value;
use std::path::Path;

use crate::domain::watch::ParamSummary;

// ─── ExperimentTracker ───────────────────────────────────────────────────────
/// Sink for everything recorded about one training run.
pub trait ExperimentTracker {
    /// Record the run's hyperparameters. Called once, before training.
    fn log_hyperparams(&mut self, params: &Value) -> Result<()>;

    /// Record named scalar values reached at `step` (global optimizer step)
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()>;

    /// Record parameter and gradient summaries taken at `step`
    fn log_watch(&mut self, step: usize, summaries: &[ParamSummary]) -> Result<()>;

    /// Register a file produced by the run (a model checkpoint).
    ///
    /// The caller may delete `path` afterwards, so the tracker keeps
    /// its own copy of the contents.
    fn log_artifact(&mut self, name: &str, path: &Path, step: usize) -> Result<()>;

    /// Keep a copy of the program source alongside the run
    fn save_code(&mut self, name: &str, contents: &str) -> Result<()>;

    /// Flush and close the run
    fn finish(&mut self) -> Result<()>;
}
