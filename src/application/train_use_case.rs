// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Prepare data: download QMNIST if absent  (Layer 4 - data)
//   Step 2: Decode train and test splits             (Layer 4 - data)
//   Step 3: Save config for `eval`                   (Layer 6 - infra)
//   Step 4: Start the experiment run                 (Layer 6 - infra)
//   Step 5: Run the training loop                    (Layer 5 - ml)
//   Step 6: Close the run                            (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::QmnistDataset,
    download::QmnistCache,
    loader::LoaderSettings,
};
use crate::domain::{image::Split, traits::ExperimentTracker};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    tracker::LocalRunTracker,
};
use crate::ml::{
    task::HyperParameters,
    trainer::{run_training, FitSinks, FitSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a training run. Serialisable so it can be saved
// next to the checkpoints and reloaded by `eval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:           String,
    pub log_dir:            String,
    pub project:            String,
    pub max_epochs:         usize,
    pub batch_size:         usize,
    pub lr:                 f64,
    pub momentum:           f64,
    pub val_check_interval: f64,
    pub train_workers:      usize,
    pub val_workers:        usize,
    /// Optimizer steps between parameter/gradient summaries, 0 disables
    pub log_freq:           usize,
    pub seed:               Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:           "qmnist/data".to_string(),
            log_dir:            "qmnist/logs".to_string(),
            project:            "qmnist".to_string(),
            max_epochs:         20,
            batch_size:         64,
            lr:                 1e-4,
            momentum:           0.9,
            val_check_interval: 0.5,
            train_workers:      4,
            val_workers:        2,
            log_freq:           100,
            seed:               None,
        }
    }
}

impl TrainConfig {
    pub fn checkpoint_dir(&self) -> PathBuf {
        checkpoint_dir(&self.log_dir)
    }

    pub fn train_loader_settings(&self, shuffle_seed: u64) -> LoaderSettings {
        LoaderSettings::train(self.batch_size, self.train_workers, shuffle_seed)
    }

    pub fn val_loader_settings(&self) -> LoaderSettings {
        LoaderSettings::validation(self.batch_size, self.val_workers)
    }
}

impl From<&TrainConfig> for HyperParameters {
    fn from(cfg: &TrainConfig) -> Self {
        HyperParameters {
            lr:         cfg.lr,
            momentum:   cfg.momentum,
            batch_size: cfg.batch_size,
        }
    }
}

/// Where checkpoints for a log directory live
pub fn checkpoint_dir(log_dir: impl AsRef<Path>) -> PathBuf {
    log_dir.as_ref().join("checkpoints")
}

/// Download both splits if they are not cached yet
pub fn prepare_data(cache: &QmnistCache) -> Result<()> {
    cache.ensure(Split::Train)?;
    cache.ensure(Split::Test)?;
    tracing::info!("QMNIST ready in '{}'", cache.raw_dir().display());
    Ok(())
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<FitSummary> {
        let cfg = &self.config;

        // ── Step 1 + 2: QMNIST on disk, then in memory ───────────────────────
        let cache = QmnistCache::new(&cfg.data_dir);
        prepare_data(&cache)?;
        let train_dataset = QmnistDataset::load(&cache, Split::Train)?;
        let val_dataset   = QmnistDataset::load(&cache, Split::Test)?;

        // ── Step 3: Save config for eval ─────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(cfg.checkpoint_dir())?;
        ckpt_manager.save_config(cfg)?;
        let csv = MetricsLogger::new(&cfg.log_dir)?;

        // ── Step 4: Experiment run with hyperparameters and source ───────────
        let mut tracker = LocalRunTracker::create(&cfg.log_dir, &cfg.project)?;
        start_run(&mut tracker, cfg)?;
        tracing::info!("Run directory: '{}'", tracker.run_dir().display());

        // ── Step 5: Training loop ────────────────────────────────────────────
        let summary = run_training(
            cfg,
            train_dataset,
            val_dataset,
            FitSinks { tracker: &mut tracker, checkpoints: &ckpt_manager, csv: &csv },
        )?;

        // ── Step 6: Close the run ────────────────────────────────────────────
        tracker.finish()?;
        Ok(summary)
    }
}

/// Record hyperparameters, config and the program source
fn start_run(tracker: &mut dyn ExperimentTracker, cfg: &TrainConfig) -> Result<()> {
    let params = serde_json::json!({
        "hparams": HyperParameters::from(cfg),
        "config":  cfg,
        "watch":   { "log": "all", "log_freq": cfg.log_freq },
    });
    tracker.log_hyperparams(&params)?;
    tracker.save_code("main.rs", include_str!("../main.rs"))?;
    tracker.save_code("model.rs", include_str!("../ml/model.rs"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tracker::MemoryTracker;

    #[test]
    fn test_default_config_matches_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.lr, 1e-4);
        assert_eq!(cfg.momentum, 0.9);
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.max_epochs, 20);
        assert_eq!(cfg.val_check_interval, 0.5);
        assert_eq!(cfg.data_dir, "qmnist/data");
        assert_eq!(cfg.log_dir, "qmnist/logs");
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn test_defaults_reach_hyperparameters_and_loaders() {
        let cfg = TrainConfig::default();
        assert_eq!(HyperParameters::from(&cfg), HyperParameters::default());

        let train = cfg.train_loader_settings(1);
        assert_eq!(train, LoaderSettings { batch_size: 64, num_workers: 4, shuffle: Some(1) });

        let val = cfg.val_loader_settings();
        assert_eq!(val, LoaderSettings { batch_size: 64, num_workers: 2, shuffle: None });
    }

    #[test]
    fn test_start_run_records_hyperparameters() {
        let mut tracker = MemoryTracker::default();
        start_run(&mut tracker, &TrainConfig::default()).unwrap();

        let params = tracker.hparams.unwrap();
        assert_eq!(params["hparams"]["lr"], 1e-4);
        assert_eq!(params["hparams"]["batch_size"], 64);
        assert_eq!(params["config"]["max_epochs"], 20);
        assert_eq!(params["watch"]["log"], "all");
    }

    #[test]
    fn test_checkpoint_dir_under_logs() {
        assert_eq!(TrainConfig::default().checkpoint_dir(), PathBuf::from("qmnist/logs/checkpoints"));
    }
}
