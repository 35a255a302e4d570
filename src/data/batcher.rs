// ============================================================
// Layer 4 - Digit Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DigitImage>
// into tensors the classifier can consume.
//
//   Input:  N DigitImages, 784 u8 pixels each
//   Output: DigitBatch with
//             images  [N, 1, 28, 28]  f32 in [0, 1]
//             targets [N]             digit classes
//
// The [N, 1, 28, 28] layout is a single grey channel per image,
// the usual image-tensor convention. The model flattens it.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::image::{DigitImage, IMAGE_SIDE};

/// A batch of digit images ready for the model forward pass.
/// All tensors have the batch size as their first dimension.
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Pixel intensities scaled to [0, 1] - shape: [batch, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// True digit classes - shape: [batch]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> DigitBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<DigitImage, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitImage>) -> DigitBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|img| img.pixels.iter().map(|&p| p as f32 / 255.0))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|img| img.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, IMAGE_SIDE, IMAGE_SIDE]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        DigitBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::IMAGE_PIXELS;
    use burn::{backend::NdArray, tensor::ElementConversion};

    #[test]
    fn test_batch_shapes_and_scaling() {
        let device  = Default::default();
        let batcher = DigitBatcher::<NdArray>::new(device);

        let bright = DigitImage::new(vec![255; IMAGE_PIXELS], 8);
        let batch  = batcher.batch(vec![DigitImage::blank(1), bright]);

        assert_eq!(batch.images.dims(), [2, 1, 28, 28]);
        assert_eq!(batch.targets.dims(), [2]);
        assert_eq!(batch.len(), 2);

        let max: f32 = batch.images.clone().max().into_scalar().elem();
        let min: f32 = batch.images.min().into_scalar().elem();
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(min, 0.0);

        let targets = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![1, 8]);
    }
}
