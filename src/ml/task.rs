// ============================================================
// Layer 5 - Classifier Training Module
// ============================================================
// Owns the network plus everything that defines one unit of
// optimisation and one unit of evaluation:
//
//   configure_optimizers  → SGD, momentum 0.9, no decay/schedule
//   training_step         → forward, CE loss, metrics, log, loss out
//   optimizer_step        → backward, optional watch, SGD update
//   validation_step       → same maths on the inner (no-grad) model
//   on_validation_end     → epoch-level val_* scalars
//
// The loop itself lives in trainer.rs.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::DigitBatch;
use crate::domain::{
    traits::ExperimentTracker,
    watch::{ParamKind, ParamSummary},
};
use crate::ml::{
    metrics::{MetricState, MetricValues},
    model::{float_values, Classifier, ClassifierConfig},
};

/// The values saved with every run, so it can be reproduced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    pub lr:         f64,
    pub momentum:   f64,
    pub batch_size: usize,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self { lr: 1e-4, momentum: 0.9, batch_size: 64 }
    }
}

pub struct ClassifierModule<B: AutodiffBackend> {
    model:       Classifier<B>,
    hparams:     HyperParameters,
    train_state: MetricState,
    val_state:   MetricState,
    // Snapshot of the model on the inner backend, taken per validation run
    valid_model: Option<Classifier<B::InnerBackend>>,
}

impl<B: AutodiffBackend> ClassifierModule<B> {
    pub fn new(hparams: HyperParameters, device: &B::Device) -> Self {
        Self::from_model(ClassifierConfig::new().init(device), hparams)
    }

    pub fn from_model(model: Classifier<B>, hparams: HyperParameters) -> Self {
        Self {
            model,
            hparams,
            train_state: MetricState::new(),
            val_state:   MetricState::new(),
            valid_model: None,
        }
    }

    pub fn model(&self) -> &Classifier<B> {
        &self.model
    }

    /// SGD with classical momentum: dampening 0, no Nesterov,
    /// no weight decay. The learning rate is applied per step.
    pub fn optimizer_config(&self) -> SgdConfig {
        SgdConfig::new().with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(self.hparams.momentum)
                .with_dampening(0.0)
                .with_nesterov(false),
        ))
    }

    pub fn configure_optimizers(&self) -> impl Optimizer<Classifier<B>, B> {
        self.optimizer_config().init::<B, Classifier<B>>()
    }

    pub fn on_train_epoch_start(&mut self) {
        self.train_state.reset();
    }

    /// Run one training batch and log its loss and metrics at
    /// `global_step`. Returns the loss for the optimizer step.
    pub fn training_step(
        &mut self,
        batch:       DigitBatch<B>,
        global_step: usize,
        tracker:     &mut dyn ExperimentTracker,
    ) -> Result<(Tensor<B, 1>, MetricValues)> {
        let output = self.model.forward_classification(batch);
        let (preds, targets) = output.predictions_and_targets();
        let loss = output.loss_value();

        self.train_state.update(&preds, &targets, loss);
        let metrics = MetricState::for_batch(&preds, &targets, loss);

        tracker.log_scalars(global_step, &[
            ("train_loss", metrics.loss),
            ("train_acc",  metrics.accuracy),
            ("train_prec", metrics.precision),
            ("train_rec",  metrics.recall),
        ])?;

        Ok((output.loss, metrics))
    }

    /// Backward pass and parameter update.
    ///
    /// With `watch` set, weights and gradients are summarised
    /// before the update and returned; otherwise the Vec is empty.
    pub fn optimizer_step<O: Optimizer<Classifier<B>, B>>(
        &mut self,
        optim: &mut O,
        loss:  Tensor<B, 1>,
        watch: bool,
    ) -> Vec<ParamSummary> {
        let grads = loss.backward();

        let summaries = if watch {
            self.watch_summaries(&grads)
        } else {
            Vec::new()
        };

        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = optim.step(self.hparams.lr, self.model.clone(), grads);
        summaries
    }

    fn watch_summaries(&self, grads: &B::Gradients) -> Vec<ParamSummary> {
        let mut summaries: Vec<ParamSummary> = self
            .model
            .named_parameters()
            .into_iter()
            .map(|(name, shape, values)| {
                ParamSummary::from_values(name, ParamKind::Parameter, shape, &values)
            })
            .collect();

        let hidden = &self.model.hidden;
        let output = &self.model.output;
        let mut push_grad = |name: &str, shape: Vec<usize>, values: Option<Vec<f32>>| {
            if let Some(values) = values {
                summaries.push(ParamSummary::from_values(name, ParamKind::Gradient, shape, &values));
            }
        };

        let w = hidden.weight.val();
        push_grad("hidden.weight", w.dims().to_vec(), w.grad(grads).map(float_values));
        if let Some(b) = &hidden.bias {
            let b = b.val();
            push_grad("hidden.bias", b.dims().to_vec(), b.grad(grads).map(float_values));
        }
        let w = output.weight.val();
        push_grad("output.weight", w.dims().to_vec(), w.grad(grads).map(float_values));
        if let Some(b) = &output.bias {
            let b = b.val();
            push_grad("output.bias", b.dims().to_vec(), b.grad(grads).map(float_values));
        }

        summaries
    }

    /// Mean loss and metrics over the training batches seen this epoch
    pub fn train_epoch_metrics(&self) -> MetricValues {
        self.train_state.compute()
    }

    pub fn on_validation_start(&mut self) {
        self.val_state.reset();
        self.valid_model = Some(self.model.valid());
    }

    /// Evaluate one batch on the inner backend. Parameters are
    /// never touched; the loss is only kept for aggregation.
    pub fn validation_step(&mut self, batch: DigitBatch<B::InnerBackend>) -> f64 {
        let model = self.valid_model.get_or_insert_with(|| self.model.valid());
        evaluate_batch(model, batch, &mut self.val_state)
    }

    /// Log the epoch-level validation values at `global_step`
    pub fn on_validation_end(
        &mut self,
        global_step: usize,
        tracker:     &mut dyn ExperimentTracker,
    ) -> Result<MetricValues> {
        self.valid_model = None;
        let metrics = self.val_state.compute();

        tracker.log_scalars(global_step, &[
            ("val_loss", metrics.loss),
            ("val_acc",  metrics.accuracy),
            ("val_prec", metrics.precision),
            ("val_rec",  metrics.recall),
        ])?;

        Ok(metrics)
    }
}

/// Forward one batch without gradients and fold the result into
/// `state`. Returns the batch's mean loss.
pub fn evaluate_batch<B: Backend>(
    model: &Classifier<B>,
    batch: DigitBatch<B>,
    state: &mut MetricState,
) -> f64 {
    let output = model.forward_classification(batch);
    let (preds, targets) = output.predictions_and_targets();
    let loss = output.loss_value();
    state.update(&preds, &targets, loss);
    loss
}
