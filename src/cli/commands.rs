// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `eval`
// and their configurable flags. Every `train` default matches
// `TrainConfig::default()`, so a bare `train` is the reference run.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on QMNIST (downloads the data if needed)
    Train(TrainArgs),

    /// Score the latest checkpoint on the QMNIST test split
    Eval(EvalArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Root under which QMNIST/raw is cached
    #[arg(long, default_value = "qmnist/data")]
    pub data_dir: String,

    /// Directory for checkpoints, metrics.csv and experiment runs
    #[arg(long, default_value = "qmnist/logs")]
    pub log_dir: String,

    /// Experiment project name
    #[arg(long, default_value = "qmnist")]
    pub project: String,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Fraction of an epoch between validation passes
    #[arg(long, default_value_t = 0.5)]
    pub val_check_interval: f64,

    #[arg(long, default_value_t = 4)]
    pub train_workers: usize,

    #[arg(long, default_value_t = 2)]
    pub val_workers: usize,

    /// Optimizer steps between parameter and gradient summaries (0 disables)
    #[arg(long, default_value_t = 100)]
    pub log_freq: usize,

    /// Seed for weight init and shuffling; unseeded when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for TrainArgs {
    fn default() -> Self {
        TrainConfig::default().into()
    }
}

/// Boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:           a.data_dir,
            log_dir:            a.log_dir,
            project:            a.project,
            max_epochs:         a.epochs,
            batch_size:         a.batch_size,
            lr:                 a.lr,
            momentum:           a.momentum,
            val_check_interval: a.val_check_interval,
            train_workers:      a.train_workers,
            val_workers:        a.val_workers,
            log_freq:           a.log_freq,
            seed:               a.seed,
        }
    }
}

impl From<TrainConfig> for TrainArgs {
    fn from(c: TrainConfig) -> Self {
        TrainArgs {
            data_dir:           c.data_dir,
            log_dir:            c.log_dir,
            project:            c.project,
            epochs:             c.max_epochs,
            batch_size:         c.batch_size,
            lr:                 c.lr,
            momentum:           c.momentum,
            val_check_interval: c.val_check_interval,
            train_workers:      c.train_workers,
            val_workers:        c.val_workers,
            log_freq:           c.log_freq,
            seed:               c.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Log directory of the training run to evaluate
    #[arg(long, default_value = "qmnist/logs")]
    pub log_dir: String,

    /// Override the data directory saved with the checkpoint
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override the batch size saved with the checkpoint
    #[arg(long)]
    pub batch_size: Option<usize>,
}
