// ============================================================
// Layer 2 - EvalUseCase
// ============================================================
// Rebuilds the classifier from the latest checkpoint and scores
// it on the QMNIST test split.

use anyhow::Result;

use crate::application::train_use_case::checkpoint_dir;
use crate::data::{
    dataset::QmnistDataset,
    download::QmnistCache,
    loader::{build_loader, LoaderSettings},
};
use crate::domain::image::Split;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    metrics::{MetricState, MetricValues},
    model::{Classifier, ClassifierConfig},
    task::evaluate_batch,
};

type EvalBackend = burn::backend::Wgpu;

pub struct EvalUseCase {
    log_dir:    String,
    data_dir:   Option<String>,
    batch_size: Option<usize>,
}

impl EvalUseCase {
    /// `data_dir` / `batch_size` fall back to the values the model
    /// was trained with.
    pub fn new(log_dir: String, data_dir: Option<String>, batch_size: Option<usize>) -> Self {
        Self { log_dir, data_dir, batch_size }
    }

    pub fn execute(&self) -> Result<MetricValues> {
        let ckpt = CheckpointManager::new(checkpoint_dir(&self.log_dir))?;
        let cfg  = ckpt.load_config()?;

        let data_dir   = self.data_dir.clone().unwrap_or(cfg.data_dir.clone());
        let batch_size = self.batch_size.unwrap_or(cfg.batch_size);

        let device = burn::backend::wgpu::WgpuDevice::default();
        let model: Classifier<EvalBackend> = ClassifierConfig::new().init(&device);
        let model = ckpt.load_model(model, &device)?;

        let dataset = QmnistDataset::load(&QmnistCache::new(&data_dir), Split::Test)?;
        let loader  = build_loader::<EvalBackend, _>(
            LoaderSettings::validation(batch_size, cfg.val_workers), device, dataset,
        );

        let mut state = MetricState::new();
        for batch in loader.iter() {
            evaluate_batch(&model, batch, &mut state);
        }
        let metrics = state.compute();

        tracing::info!("Evaluated {} test samples", state.samples());
        Ok(metrics)
    }
}
