//! Evaluation loop
//!
//! Runs a classifier in inference form over the test split, in order, and
//! collects arg-max predictions, softmax probabilities and true labels.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    tensor::{backend::Backend, Tensor},
};
use tracing::debug;

use crate::dataset::{BeeBatch, BeeBatcher, BeeImageDataset};
use crate::model::BeeClassifier;
use crate::utils::error::Result;

/// Predictions, probabilities and true labels over an evaluation set
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutput {
    /// Arg-max class per sample
    pub predictions: Vec<usize>,
    /// Softmax probabilities per sample, one entry per class
    pub probabilities: Vec<Vec<f32>>,
    /// True class per sample
    pub targets: Vec<usize>,
}

impl EvaluationOutput {
    /// Number of evaluated samples
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if nothing was evaluated
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of correct predictions
    pub fn correct(&self) -> usize {
        self.predictions
            .iter()
            .zip(&self.targets)
            .filter(|(p, t)| p == t)
            .count()
    }

    /// Fraction of correct predictions (0 when empty)
    pub fn accuracy(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.correct() as f64 / self.len() as f64
        }
    }

    /// Probability assigned to `class_idx` for every sample
    pub fn class_scores(&self, class_idx: usize) -> Vec<f32> {
        self.probabilities
            .iter()
            .map(|row| row.get(class_idx).copied().unwrap_or(0.0))
            .collect()
    }

    fn extend(&mut self, predictions: Vec<usize>, probabilities: Vec<Vec<f32>>, targets: Vec<usize>) {
        self.predictions.extend(predictions);
        self.probabilities.extend(probabilities);
        self.targets.extend(targets);
    }
}

/// Arg-max classes and softmax rows for a batch of logits `[N, K]`
pub fn summarize_logits<B: Backend>(logits: Tensor<B, 2>) -> (Vec<usize>, Vec<Vec<f32>>) {
    let [_, num_classes] = logits.dims();

    let predictions: Vec<usize> = logits
        .clone()
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|p| p as usize)
        .collect();

    let probs: Vec<f32> = burn::tensor::activation::softmax(logits, 1)
        .into_data()
        .iter::<f32>()
        .collect();
    let probabilities = probs
        .chunks(num_classes.max(1))
        .map(|row| row.to_vec())
        .collect();

    (predictions, probabilities)
}

/// Evaluate `model` over every sample of `dataset`
///
/// `model` should already be in inference form (`AutodiffModule::valid`),
/// which also disables dropout.
pub fn evaluate<B: Backend>(
    model: &BeeClassifier<B>,
    dataset: &BeeImageDataset,
    batcher: &BeeBatcher,
    batch_size: usize,
    device: &B::Device,
) -> Result<EvaluationOutput> {
    let len = dataset.len();
    let indices: Vec<usize> = (0..len).collect();
    let mut output = EvaluationOutput::default();

    for chunk in indices.chunks(batch_size.max(1)) {
        let items = dataset.load_items(chunk)?;
        let targets: Vec<usize> = items.iter().map(|item| item.label).collect();
        let batch: BeeBatch<B> = batcher.batch(items, device);

        let logits = model.forward(batch.images);
        let (predictions, probabilities) = summarize_logits(logits);
        output.extend(predictions, probabilities, targets);

        debug!("Evaluated {}/{} samples", output.len(), len);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use crate::dataset::BeeSample;
    use crate::model::BeeClassifierConfig;
    use burn::tensor::TensorData;
    use tempfile::TempDir;

    type B = DefaultBackend;

    #[test]
    fn test_accuracy_scenario() {
        let output = EvaluationOutput {
            predictions: vec![0, 1, 1, 1],
            probabilities: vec![vec![0.5, 0.5]; 4],
            targets: vec![0, 1, 0, 1],
        };

        assert_eq!(output.correct(), 3);
        assert!((output.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_empty_output_accuracy() {
        assert_eq!(EvaluationOutput::default().accuracy(), 0.0);
    }

    #[test]
    fn test_summarize_logits() {
        let device = default_device();
        let logits = Tensor::<B, 2>::from_floats(
            TensorData::new(vec![2.0f32, 0.0, -1.0, 0.0, 0.0, 3.0], [2, 3]),
            &device,
        );

        let (predictions, probabilities) = summarize_logits(logits);

        assert_eq!(predictions, vec![0, 2]);
        assert_eq!(probabilities.len(), 2);
        for row in &probabilities {
            assert_eq!(row.len(), 3);
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        assert!(probabilities[0][0] > probabilities[0][1]);
    }

    #[test]
    fn test_evaluate_over_dataset() {
        let dir = TempDir::new().unwrap();
        let samples: Vec<BeeSample> = (0..3)
            .map(|id| {
                let path = dir.path().join(format!("{}.png", id));
                image::RgbImage::from_pixel(9, 9, image::Rgb([40 * id as u8, 90, 200]))
                    .save(&path)
                    .unwrap();
                BeeSample {
                    path,
                    label_name: format!("class_{}", id),
                    label: id,
                    id,
                }
            })
            .collect();

        let device = default_device();
        let config = BeeClassifierConfig::new(3).with_image_size(16);
        let model = BeeClassifier::<B>::new(&config, &device);
        let dataset = BeeImageDataset::new(samples, 16);

        let output = evaluate(&model, &dataset, &BeeBatcher::new(16), 2, &device).unwrap();

        assert_eq!(output.len(), 3);
        assert_eq!(output.targets, vec![0, 1, 2]);
        assert!(output.predictions.iter().all(|p| *p < 3));
        assert_eq!(output.class_scores(1).len(), 3);
    }
}
