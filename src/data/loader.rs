use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use std::sync::Arc;

use crate::data::batcher::{DigitBatch, DigitBatcher};
use crate::domain::image::DigitImage;

/// How one dataloader pulls batches out of its dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub batch_size:  usize,
    pub num_workers: usize,
    /// `Some(seed)` reshuffles on every pass, `None` keeps dataset order
    pub shuffle:     Option<u64>,
}

impl LoaderSettings {
    /// Training loader: shuffled, 4 background workers
    pub fn train(batch_size: usize, num_workers: usize, seed: u64) -> Self {
        Self { batch_size, num_workers, shuffle: Some(seed) }
    }

    /// Validation loader: dataset order, 2 background workers
    pub fn validation(batch_size: usize, num_workers: usize) -> Self {
        Self { batch_size, num_workers, shuffle: None }
    }

    /// Batches in one pass over `num_items` samples (last one may be short)
    pub fn num_batches(&self, num_items: usize) -> usize {
        num_items.div_ceil(self.batch_size.max(1))
    }
}

/// Build a Burn DataLoader over `dataset` on `device`
pub fn build_loader<B, D>(
    settings: LoaderSettings,
    device:   B::Device,
    dataset:  D,
) -> Arc<dyn DataLoader<DigitBatch<B>>>
where
    B: Backend,
    D: Dataset<DigitImage> + 'static,
{
    let mut builder = DataLoaderBuilder::new(DigitBatcher::<B>::new(device))
        .batch_size(settings.batch_size);
    // Zero workers means batching on the calling thread; Burn treats
    // any explicit count, including 0, as a multi-threaded loader.
    if settings.num_workers > 0 {
        builder = builder.num_workers(settings.num_workers);
    }

    match settings.shuffle {
        Some(seed) => builder.shuffle(seed).build(dataset),
        None       => builder.build(dataset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::QmnistDataset;
    use crate::domain::image::Split;
    use burn::backend::NdArray;

    fn tiny_dataset(n: usize) -> QmnistDataset {
        let samples = (0..n).map(|i| DigitImage::blank((i % 10) as u8)).collect();
        QmnistDataset::new(Split::Test, samples)
    }

    #[test]
    fn test_num_batches_rounds_up() {
        let s = LoaderSettings::validation(64, 2);
        assert_eq!(s.num_batches(60_000), 938);
        assert_eq!(s.num_batches(128), 2);
        assert_eq!(s.num_batches(0), 0);
    }

    #[test]
    fn test_validation_loader_keeps_order() {
        let loader = build_loader::<NdArray, _>(
            LoaderSettings::validation(4, 0), Default::default(), tiny_dataset(10),
        );

        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 2);

        let labels: Vec<i64> = batches
            .into_iter()
            .flat_map(|b| b.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_train_loader_without_workers_batches_inline() {
        let loader = build_loader::<NdArray, _>(
            LoaderSettings::train(4, 0, 3), Default::default(), tiny_dataset(9),
        );
        let sizes: Vec<usize> = loader.iter().map(|b| b.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 9);
        assert_eq!(sizes.len(), 3);
    }

    #[test]
    fn test_train_loader_covers_every_sample() {
        let loader = build_loader::<NdArray, _>(
            LoaderSettings::train(3, 2, 7), Default::default(), tiny_dataset(10),
        );

        let mut labels: Vec<i64> = loader
            .iter()
            .flat_map(|b| b.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect();
        labels.sort();
        assert_eq!(labels, (0..10).collect::<Vec<i64>>());
    }
}
