// ============================================================
// Layer 5 - Training Loop
// ============================================================
// The explicit fit loop around ClassifierModule:
//
//   for epoch in 0..max_epochs
//       for batch in train_loader
//           training_step → optimizer_step (+ watch every log_freq)
//           validate when the batch count hits the check interval
//       checkpoint, CSV row
//
// With val_check_interval = 0.5 validation runs every
// floor(num_batches * 0.5) batches and always on the last batch,
// so twice per epoch for QMNIST (batches 469 and 938).
//
// Key Burn insight:
//   - Training uses Autodiff<Wgpu> for gradients
//   - model.valid() returns the model on the inner Wgpu backend
//   - The validation loader therefore batches for the inner backend

use anyhow::Result;
use burn::{
    data::dataloader::DataLoader,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::DigitBatch,
    dataset::QmnistDataset,
    loader::{build_loader, LoaderSettings},
};
use crate::domain::traits::ExperimentTracker;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    metrics::MetricValues,
    task::{ClassifierModule, HyperParameters},
};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Console progress line every this many training batches
const PROGRESS_EVERY: usize = 50;

/// What a finished fit reports back
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub epochs_completed: usize,
    pub global_step:      usize,
    pub validation_runs:  usize,
    pub last_train:       MetricValues,
    pub last_validation:  Option<MetricValues>,
}

/// Training batches between validation runs for a given interval.
/// Never below one batch.
pub fn validation_every(num_batches: usize, val_check_interval: f64) -> usize {
    let interval = val_check_interval.clamp(f64::EPSILON, 1.0);
    ((num_batches as f64 * interval).floor() as usize).max(1)
}

/// Whether validation runs after the `batch_number`-th (1-based) batch
pub fn should_validate(batch_number: usize, num_batches: usize, every: usize) -> bool {
    batch_number == num_batches || batch_number % every == 0
}

/// Everything the loop writes to besides the model itself
pub struct FitSinks<'a> {
    pub tracker:     &'a mut dyn ExperimentTracker,
    pub checkpoints: &'a CheckpointManager,
    pub csv:         &'a MetricsLogger,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: QmnistDataset,
    val_dataset:   QmnistDataset,
    sinks:         FitSinks<'_>,
) -> Result<FitSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    fit::<TrainBackend>(cfg, device, train_dataset, val_dataset, sinks)
}

pub fn fit<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    device:        B::Device,
    train_dataset: QmnistDataset,
    val_dataset:   QmnistDataset,
    sinks:         FitSinks<'_>,
) -> Result<FitSummary> {
    let FitSinks { tracker, checkpoints, csv } = sinks;

    // Unseeded unless asked: every run draws fresh weights and order
    let shuffle_seed = match cfg.seed {
        Some(seed) => {
            B::seed(seed);
            seed
        }
        None => rand::random(),
    };

    tracing::info!(
        "Training on {} ({} samples), validating on {} ({} samples)",
        train_dataset.split(), train_dataset.sample_count(),
        val_dataset.split(), val_dataset.sample_count(),
    );

    let train_settings = cfg.train_loader_settings(shuffle_seed);
    let val_settings   = cfg.val_loader_settings();
    let num_batches    = train_settings.num_batches(train_dataset.sample_count());
    let val_every      = validation_every(num_batches, cfg.val_check_interval);

    let train_loader: Arc<dyn DataLoader<DigitBatch<B>>> =
        build_loader::<B, _>(train_settings, device.clone(), train_dataset);
    let val_loader: Arc<dyn DataLoader<DigitBatch<B::InnerBackend>>> =
        build_loader::<B::InnerBackend, _>(val_settings, device.clone(), val_dataset);

    let hparams    = HyperParameters::from(cfg);
    let mut module = ClassifierModule::<B>::new(hparams, &device);
    let mut optim  = module.configure_optimizers();
    tracing::info!(
        "Model ready: {} train batches/epoch, validating every {} batches",
        num_batches, val_every,
    );

    let mut global_step     = 0usize;
    let mut validation_runs = 0usize;
    let mut last_validation = None;
    let mut last_train      = MetricValues::default();

    for epoch in 0..cfg.max_epochs {
        module.on_train_epoch_start();

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let (loss, metrics) = module.training_step(batch, global_step, tracker)?;

            let watch = cfg.log_freq > 0 && global_step % cfg.log_freq == 0;
            let summaries = module.optimizer_step(&mut optim, loss, watch);
            if !summaries.is_empty() {
                tracker.log_watch(global_step, &summaries)?;
            }
            global_step += 1;

            let batch_number = batch_idx + 1;
            if batch_number % PROGRESS_EVERY == 0 {
                tracing::info!(
                    "epoch {} [{}/{}] train_loss={:.4}",
                    epoch, batch_number, num_batches, metrics.loss,
                );
            }

            if should_validate(batch_number, num_batches, val_every) {
                let val = validate(&mut module, val_loader.as_ref(), global_step, tracker)?;
                validation_runs += 1;
                last_validation = Some(val);
            }
        }

        last_train = module.train_epoch_metrics();
        let val = last_validation.unwrap_or_default();

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | val_prec={:.1}% | val_rec={:.1}%",
            epoch + 1, cfg.max_epochs, last_train.loss, val.loss,
            val.accuracy * 100.0, val.precision * 100.0, val.recall * 100.0,
        );

        // Epoch entries sit on the same step axis as the batch scalars
        tracker.log_scalars(global_step, &[("epoch", epoch as f64)])?;
        csv.log(&EpochMetrics::new(epoch, last_train, val))?;

        let path = checkpoints.save_model(module.model(), epoch, global_step)?;
        tracker.log_artifact("model", &path, global_step)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(FitSummary {
        epochs_completed: cfg.max_epochs,
        global_step,
        validation_runs,
        last_train,
        last_validation,
    })
}

fn validate<B: AutodiffBackend>(
    module:      &mut ClassifierModule<B>,
    loader:      &dyn DataLoader<DigitBatch<B::InnerBackend>>,
    global_step: usize,
    tracker:     &mut dyn ExperimentTracker,
) -> Result<MetricValues> {
    module.on_validation_start();
    for batch in loader.iter() {
        module.validation_step(batch);
    }
    let metrics = module.on_validation_end(global_step, tracker)?;
    tracing::info!(
        "validation @ step {}: val_loss={:.4} val_acc={:.4}",
        global_step, metrics.loss, metrics.accuracy,
    );
    Ok(metrics)
}
