use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig, Relu},
    prelude::*,
    tensor::ElementConversion,
};

use crate::data::batcher::DigitBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    #[config(default = 784)]
    pub input_features:  usize,
    #[config(default = 64)]
    pub hidden_features: usize,
    #[config(default = 10)]
    pub num_classes:     usize,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        Classifier {
            hidden:     LinearConfig::new(self.input_features, self.hidden_features).init(device),
            activation: Relu::new(),
            output:     LinearConfig::new(self.hidden_features, self.num_classes).init(device),
        }
    }
}

/// 784 → 64 → ReLU → 10 fully-connected digit classifier.
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    pub hidden:     Linear<B>,
    pub activation: Relu,
    pub output:     Linear<B>,
}

pub struct ClassificationOutput<B: Backend> {
    /// Mean cross-entropy over the batch - shape [1]
    pub loss:    Tensor<B, 1>,
    /// Unnormalised class scores - shape [batch, 10]
    pub logits:  Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationOutput<B> {
    /// Argmax class per sample and the true class, as host vectors
    pub fn predictions_and_targets(&self) -> (Vec<i64>, Vec<i64>) {
        let preds = self.logits.clone().argmax(1).flatten::<1>(0, 1);
        (int_values(preds), int_values(self.targets.clone()))
    }

    pub fn loss_value(&self) -> f64 {
        self.loss.clone().into_scalar().elem::<f64>()
    }
}

impl<B: Backend> Classifier<B> {
    /// images: [batch, 1, 28, 28] (anything that flattens to 784 per row)
    /// → logits: [batch, 10]. No softmax; the loss applies it.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, channels, height, width] = images.dims();
        let x = images.reshape([batch_size, channels * height * width]);

        let x = self.hidden.forward(x);
        let x = self.activation.forward(x);
        self.output.forward(x)
    }

    pub fn forward_classification(&self, batch: DigitBatch<B>) -> ClassificationOutput<B> {
        let logits = self.forward(batch.images);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.targets.clone());

        ClassificationOutput { loss, logits, targets: batch.targets }
    }

    /// Current values of every learnable tensor, keyed by dotted path
    pub fn named_parameters(&self) -> Vec<(&'static str, Vec<usize>, Vec<f32>)> {
        let mut params = vec![named("hidden.weight", self.hidden.weight.val())];
        if let Some(bias) = &self.hidden.bias {
            params.push(named("hidden.bias", bias.val()));
        }
        params.push(named("output.weight", self.output.weight.val()));
        if let Some(bias) = &self.output.bias {
            params.push(named("output.bias", bias.val()));
        }
        params
    }
}

fn named<B: Backend, const D: usize>(
    name:   &'static str,
    tensor: Tensor<B, D>,
) -> (&'static str, Vec<usize>, Vec<f32>) {
    let shape = tensor.dims().to_vec();
    (name, shape, float_values(tensor))
}

/// Copy a float tensor to the host as f32.
///
/// The data is converted to f32 first, so reading it back as f32
/// cannot mismatch.
pub fn float_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .expect("tensor data converted to f32 reads back as f32")
}

/// Copy an int tensor to the host as i64
pub fn int_values<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Vec<i64> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .expect("tensor data converted to i64 reads back as i64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::DigitBatcher;
    use crate::domain::image::{DigitImage, IMAGE_PIXELS, NUM_CLASSES};
    use burn::{
        backend::NdArray,
        data::dataloader::batcher::Batcher,
        tensor::Distribution,
    };

    type TestBackend = NdArray;

    #[test]
    fn test_host_copies_keep_every_value() {
        let device = Default::default();
        let floats = Tensor::<TestBackend, 2>::from_floats([[0.5, -1.0], [2.0, 3.5]], &device);
        assert_eq!(float_values(floats), vec![0.5, -1.0, 2.0, 3.5]);

        let ints = Tensor::<TestBackend, 1, Int>::from_ints([7, 0, 9], &device);
        assert_eq!(int_values(ints), vec![7, 0, 9]);
    }

    #[test]
    fn test_default_config_shapes() {
        let cfg = ClassifierConfig::new();
        assert_eq!(cfg.input_features,  784);
        assert_eq!(cfg.hidden_features, 64);
        assert_eq!(cfg.num_classes,     10);
        assert_eq!(cfg.input_features, IMAGE_PIXELS);
        assert_eq!(cfg.num_classes,    NUM_CLASSES);
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new().init(&device);

        for n in [1, 2, 7, 64] {
            let images = Tensor::<TestBackend, 4>::random(
                [n, 1, 28, 28], Distribution::Uniform(0.0, 1.0), &device,
            );
            assert_eq!(model.forward(images).dims(), [n, 10]);
        }
    }

    #[test]
    fn test_cross_entropy_near_zero_for_confident_correct_logits() {
        let device = Default::default();
        // One-hot logits scaled up: softmax is ~1.0 on the true class
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[50.0, 0.0, 0.0], [0.0, 50.0, 0.0], [0.0, 0.0, 50.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &device);
        let loss: f64 = CrossEntropyLossConfig::new()
            .init(&device)
            .forward(logits, targets)
            .into_scalar()
            .elem();
        assert!(loss >= 0.0);
        assert!(loss < 1e-6, "loss = {loss}");
    }

    #[test]
    fn test_forward_classification_on_blank_batch() {
        let device  = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new().init(&device);
        let batch   = DigitBatcher::<TestBackend>::new(device)
            .batch(vec![DigitImage::blank(0), DigitImage::blank(1)]);

        let out = model.forward_classification(batch);
        let loss = out.loss_value();
        assert!(loss.is_finite() && loss >= 0.0);

        let (preds, targets) = out.predictions_and_targets();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|&p| (0..10).contains(&p)));
        assert_eq!(targets, vec![0, 1]);
    }

    #[test]
    fn test_named_parameters_cover_both_layers() {
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new().init(&device);
        let names: Vec<_> = model.named_parameters().iter().map(|(n, _, _)| *n).collect();
        assert_eq!(names, vec!["hidden.weight", "hidden.bias", "output.weight", "output.bias"]);

        let (_, shape, values) = &model.named_parameters()[0];
        // Burn stores Linear weights as [d_input, d_output]
        assert_eq!(shape, &vec![784, 64]);
        assert_eq!(values.len(), 784 * 64);
    }
}
