// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores classifier weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights for the most recent epoch
//   2. latest.json        - stem, epoch and global step of that file
//   3. train_config.json  - the run configuration, for `eval`
//
// Only the newest checkpoint is kept: saving epoch N removes the
// file written for epoch N-1.
//
// File naming convention:
//   qmnist/logs/checkpoints/
//     epoch=19-step=18760.mpk   ← weights after the last epoch
//     latest.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Classifier;

/// Pointer to the newest checkpoint on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCheckpoint {
    pub stem:        String,
    pub epoch:       usize,
    pub global_step: usize,
}

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn stem(epoch: usize, global_step: usize) -> String {
        format!("epoch={epoch}-step={global_step}")
    }

    /// Files in the checkpoint dir named `<stem>.<ext>`. The recorder
    /// picks the extension, so matching on the stem is enough.
    fn files_with_stem(&self, stem: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{stem}.");
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if matches {
                found.push(path);
            }
        }
        Ok(found)
    }

    /// Save model weights after `epoch`, replacing the previous
    /// checkpoint. Returns the path of the written file.
    pub fn save_model<B: Backend>(
        &self,
        model:       &Classifier<B>,
        epoch:       usize,
        global_step: usize,
    ) -> Result<PathBuf> {
        let previous = self.latest().ok();
        let stem     = Self::stem(epoch, global_step);
        // Path without extension - the recorder adds it
        let path     = self.dir.join(&stem);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest = LatestCheckpoint { stem: stem.clone(), epoch, global_step };
        fs::write(self.dir.join("latest.json"), serde_json::to_string_pretty(&latest)?)
            .with_context(|| "Failed to write latest.json")?;

        if let Some(prev) = previous.filter(|p| p.stem != stem) {
            for old in self.files_with_stem(&prev.stem)? {
                fs::remove_file(&old)
                    .with_context(|| format!("Cannot remove old checkpoint '{}'", old.display()))?;
            }
        }

        let written = self
            .files_with_stem(&stem)?
            .into_iter()
            .next()
            .unwrap_or(path);
        tracing::debug!("Saved checkpoint '{}'", written.display());
        Ok(written)
    }

    /// Load weights from the latest checkpoint into `model`.
    ///
    /// The model must have the same architecture as the one that
    /// was saved, or loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  Classifier<B>,
        device: &B::Device,
    ) -> Result<Classifier<B>> {
        let latest = self.latest()?;
        let path   = self.dir.join(&latest.stem);

        tracing::info!("Loading checkpoint from epoch {} (step {})", latest.epoch, latest.global_step);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'eval'.",
                    path.display()
                )
            })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read latest.json. Fails if nothing has been saved yet.
    pub fn latest(&self) -> Result<LatestCheckpoint> {
        let path = self.dir.join("latest.json");
        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest.json'. Have you run 'train' first?")?;
        Ok(serde_json::from_str(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ClassifierConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let saved: Classifier<TestBackend> = ClassifierConfig::new().init(&device);
        ckpt.save_model(&saved, 0, 938).unwrap();

        let fresh: Classifier<TestBackend> = ClassifierConfig::new().init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        for ((name, _, a), (_, _, b)) in saved.named_parameters().iter().zip(loaded.named_parameters()) {
            // CompactRecorder stores half precision
            let max_diff = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).fold(0.0f32, f32::max);
            assert!(max_diff < 1e-2, "{name} differs by {max_diff}");
        }
    }

    #[test]
    fn test_only_latest_checkpoint_is_kept() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new().init(&device);

        let first  = ckpt.save_model(&model, 0, 10).unwrap();
        let second = ckpt.save_model(&model, 1, 20).unwrap();

        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(
            ckpt.latest().unwrap(),
            LatestCheckpoint { stem: "epoch=1-step=20".into(), epoch: 1, global_step: 20 }
        );
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig { max_epochs: 3, seed: Some(7), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_load_without_training_fails() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new().init(&device);
        assert!(ckpt.load_model(model, &device).is_err());
        assert!(ckpt.load_config().is_err());
    }
}
