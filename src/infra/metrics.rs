// ============================================================
// Layer 6 - Epoch Metrics Logger
// ============================================================
// Appends one CSV row per training epoch.
//
// Output file: qmnist/logs/metrics.csv
//
//   epoch,train_loss,train_acc,val_loss,val_acc,val_prec,val_rec
//   0,1.912340,0.512000,1.402100,0.701300,0.712000,0.701300
//
// The val_* columns hold the last validation run of the epoch,
// i.e. the one at the epoch boundary.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::ml::metrics::MetricValues;

const CSV_HEADER: &str = "epoch,train_loss,train_acc,val_loss,val_acc,val_prec,val_rec";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub train_acc:  f64,
    pub val_loss:   f64,
    pub val_acc:    f64,
    pub val_prec:   f64,
    pub val_rec:    f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train: MetricValues, val: MetricValues) -> Self {
        Self {
            epoch,
            train_loss: train.loss,
            train_acc:  train.accuracy,
            val_loss:   val.loss,
            val_acc:    val.accuracy,
            val_prec:   val.precision,
            val_rec:    val.recall,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// repeated runs append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.train_acc, m.val_loss, m.val_acc, m.val_prec, m.val_rec,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
