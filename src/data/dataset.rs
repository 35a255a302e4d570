use anyhow::Result;
use burn::data::dataset::Dataset;

use crate::data::{download::QmnistCache, idx};
use crate::domain::image::{DigitImage, Split};

/// In-memory QMNIST split. Implements Burn's Dataset so the
/// DataLoader can call .get(index) and .len() on it.
pub struct QmnistDataset {
    split:   Split,
    samples: Vec<DigitImage>,
}

impl QmnistDataset {
    pub fn new(split: Split, samples: Vec<DigitImage>) -> Self {
        Self { split, samples }
    }

    /// Download the split if needed, then decode it into memory
    pub fn load(cache: &QmnistCache, split: Split) -> Result<Self> {
        let paths   = cache.ensure(split)?;
        let samples = idx::read_split(&paths.images, &paths.labels)?;
        tracing::info!("Loaded QMNIST {} split: {} samples", split, samples.len());
        Ok(Self::new(split, samples))
    }

    pub fn split(&self) -> Split { self.split }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<DigitImage> for QmnistDataset {
    fn get(&self, index: usize) -> Option<DigitImage> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
