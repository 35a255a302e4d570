// ============================================================
// Layer 5 - Classification Metrics
// ============================================================
// Multiclass accuracy, precision and recall with micro
// averaging over the ten digit classes.
//
// From the confusion counts summed over all classes:
//   precision = sum(tp) / sum(tp + fp)
//   recall    = sum(tp) / sum(tp + fn)
//   accuracy  = sum(tp) / samples
// with 0 / 0 taken as 0. Every sample is exactly one prediction and
// one target, so all three reduce to the fraction predicted correctly.
//
// MetricState accumulates counts across batches. The same type
// gives per-batch values (a fresh state fed one batch) and
// running values (one state fed the whole pass).

use serde::{Deserialize, Serialize};

use crate::domain::image::NUM_CLASSES;

/// Loss plus the three classification metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricValues {
    pub loss:      f64,
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricState {
    true_pos:  [u64; NUM_CLASSES],
    false_pos: [u64; NUM_CLASSES],
    false_neg: [u64; NUM_CLASSES],
    // Sample-weighted so a short final batch counts for less
    loss_sum:  f64,
    samples:   u64,
}

fn safe_div(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl MetricState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics of a single batch, without touching any running state
    pub fn for_batch(predictions: &[i64], targets: &[i64], batch_loss: f64) -> MetricValues {
        let mut state = Self::new();
        state.update(predictions, targets, batch_loss);
        state.compute()
    }

    /// Fold one batch of predictions into the counts.
    ///
    /// `batch_loss` is the mean loss over the batch; it is weighted
    /// by the batch size when accumulated.
    pub fn update(&mut self, predictions: &[i64], targets: &[i64], batch_loss: f64) {
        debug_assert_eq!(predictions.len(), targets.len());

        for (&pred, &target) in predictions.iter().zip(targets) {
            let (pred, target) = (pred as usize, target as usize);
            if pred == target {
                self.true_pos[target] += 1;
            } else {
                self.false_pos[pred]  += 1;
                self.false_neg[target] += 1;
            }
        }

        let n = targets.len() as u64;
        self.loss_sum += batch_loss * n as f64;
        self.samples  += n;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn total(counts: &[u64; NUM_CLASSES]) -> u64 {
        counts.iter().sum()
    }

    pub fn precision(&self) -> f64 {
        let tp = Self::total(&self.true_pos);
        safe_div(tp, tp + Self::total(&self.false_pos))
    }

    pub fn recall(&self) -> f64 {
        let tp = Self::total(&self.true_pos);
        safe_div(tp, tp + Self::total(&self.false_neg))
    }

    pub fn accuracy(&self) -> f64 {
        safe_div(Self::total(&self.true_pos), self.samples)
    }

    pub fn mean_loss(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.loss_sum / self.samples as f64 }
    }

    pub fn compute(&self) -> MetricValues {
        MetricValues {
            loss:      self.mean_loss(),
            accuracy:  self.accuracy(),
            precision: self.precision(),
            recall:    self.recall(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let m = MetricState::for_batch(&[0, 1, 2, 2, 9], &[0, 1, 2, 2, 9], 0.1);
        assert_eq!(m.accuracy,  1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall,    1.0);
        assert!((m.loss - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_all_predictions_wrong() {
        let m = MetricState::for_batch(&[1, 2, 3, 4], &[0, 1, 2, 3], 2.0);
        assert_eq!(m.accuracy,  0.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall,    0.0);
    }

    #[test]
    fn test_mixed_batch_counts_every_sample_once() {
        // 2 of 3 correct: one class-0 sample predicted as 1
        let m = MetricState::for_batch(&[0, 1, 1], &[0, 0, 1], 0.0);
        assert!((m.accuracy  - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall    - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_state_is_zero() {
        assert_eq!(MetricState::new().compute(), MetricValues::default());
    }

    #[test]
    fn test_running_state_accumulates_and_resets() {
        let mut state = MetricState::new();
        state.update(&[3, 3], &[3, 3], 1.0);
        state.update(&[5, 4, 4, 4], &[5, 5, 4, 4], 4.0);

        // loss weighted by batch size: (1*2 + 4*4) / 6
        assert!((state.mean_loss() - 3.0).abs() < 1e-12);
        assert_eq!(state.samples(), 6);
        // 5 of 6 correct across both batches
        assert!((state.accuracy() - 5.0 / 6.0).abs() < 1e-12);
        assert!((state.recall()   - 5.0 / 6.0).abs() < 1e-12);

        state.reset();
        assert_eq!(state.samples(), 0);
        assert_eq!(state.compute(), MetricValues::default());
    }
}
