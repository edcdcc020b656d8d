//! CNN Model Architecture for Bee Subspecies Classification
//!
//! Three convolutional stages followed by three fully connected layers.
//! Every convolution is 3x3 with stride 1 and padding 2, so each one grows
//! the feature map by two pixels; each max pool halves it.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the BeeClassifier CNN model
#[derive(Config, Debug)]
pub struct BeeClassifierConfig {
    /// Number of output classes (K, taken from the label encoder)
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "120")]
    pub image_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Dropout rate applied at the end of each convolutional stage
    #[config(default = "0.5")]
    pub dropout: f64,

    /// Widths of the two hidden fully connected layers
    #[config(default = "[256, 128]")]
    pub hidden_units: [usize; 2],
}

impl BeeClassifierConfig {
    /// Side length of the feature map leaving the last stage
    pub fn feature_map_size(&self) -> usize {
        let grow = |s: usize| s + 2;
        let pool = |s: usize| s / 2;

        // stage 1: conv, conv, pool
        let s = pool(grow(grow(self.image_size)));
        // stage 2: conv, pool, conv
        let s = grow(pool(grow(s)));
        // stage 3: conv, pool
        pool(grow(s))
    }

    /// Number of features entering the first fully connected layer
    pub fn flattened_features(&self) -> usize {
        let size = self.feature_map_size();
        STAGE3_CHANNELS * size * size
    }
}

const STAGE1_CHANNELS: usize = 32;
const STAGE2_CHANNELS: usize = 64;
const STAGE3_CHANNELS: usize = 128;

fn conv3x3<B: Backend>(in_channels: usize, out_channels: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([1, 1])
        .with_padding(PaddingConfig2d::Explicit(2, 2))
        .init(device)
}

/// Bee Subspecies Classifier CNN
///
/// Architecture:
/// - Stage 1: conv → ReLU → conv → max pool → dropout
/// - Stage 2: conv → ReLU → max pool → conv → ReLU → dropout
/// - Stage 3: conv → ReLU → max pool → dropout
/// - Flatten, then three linear layers down to `num_classes` logits
#[derive(Module, Debug)]
pub struct BeeClassifier<B: Backend> {
    pub stage1_conv1: Conv2d<B>,
    pub stage1_conv2: Conv2d<B>,
    pub stage2_conv1: Conv2d<B>,
    pub stage2_conv2: Conv2d<B>,
    pub stage3_conv: Conv2d<B>,

    pool: MaxPool2d,
    dropout: Dropout,
    relu: Relu,

    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> BeeClassifier<B> {
    /// Create a new BeeClassifier from configuration
    pub fn new(config: &BeeClassifierConfig, device: &B::Device) -> Self {
        let [hidden1, hidden2] = config.hidden_units;

        Self {
            stage1_conv1: conv3x3(config.in_channels, STAGE1_CHANNELS, device),
            stage1_conv2: conv3x3(STAGE1_CHANNELS, STAGE1_CHANNELS, device),
            stage2_conv1: conv3x3(STAGE1_CHANNELS, STAGE2_CHANNELS, device),
            stage2_conv2: conv3x3(STAGE2_CHANNELS, STAGE2_CHANNELS, device),
            stage3_conv: conv3x3(STAGE2_CHANNELS, STAGE3_CHANNELS, device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            relu: Relu::new(),
            fc1: LinearConfig::new(config.flattened_features(), hidden1).init(device),
            fc2: LinearConfig::new(hidden1, hidden2).init(device),
            fc3: LinearConfig::new(hidden2, config.num_classes).init(device),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        // Stage 1
        let x = self.relu.forward(self.stage1_conv1.forward(x));
        let x = self.stage1_conv2.forward(x);
        let x = self.dropout.forward(self.pool.forward(x));

        // Stage 2
        let x = self.relu.forward(self.stage2_conv1.forward(x));
        let x = self.pool.forward(x);
        let x = self.relu.forward(self.stage2_conv2.forward(x));
        let x = self.dropout.forward(x);

        // Stage 3
        let x = self.relu.forward(self.stage3_conv.forward(x));
        let x = self.dropout.forward(self.pool.forward(x));

        // [B, C, H, W] -> [B, C*H*W]
        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = self.fc1.forward(x);
        let x = self.fc2.forward(x);
        self.fc3.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};

    type TestBackend = DefaultBackend;

    #[test]
    fn test_feature_map_size_for_default_input() {
        let config = BeeClassifierConfig::new(7);
        assert_eq!(config.feature_map_size(), 18);
        assert_eq!(config.flattened_features(), 128 * 18 * 18);
    }

    #[test]
    fn test_feature_map_size_for_small_input() {
        let config = BeeClassifierConfig::new(3).with_image_size(16);
        assert_eq!(config.feature_map_size(), 5);
    }

    #[test]
    fn test_bee_classifier_output_shape() {
        let device = default_device();
        let config = BeeClassifierConfig::new(4).with_image_size(16);
        let model = BeeClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 16, 16], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_forward_softmax_rows_sum_to_one() {
        let device = default_device();
        let config = BeeClassifierConfig::new(3).with_image_size(16);
        let model = BeeClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 16, 16], &device);
        let probs: Vec<f32> = model
            .forward_softmax(input)
            .into_data()
            .iter::<f32>()
            .collect();

        for row in probs.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
            assert!(row.iter().all(|p| *p >= 0.0));
        }
    }
}
