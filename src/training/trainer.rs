//! Training loop for the bee classifier
//!
//! Each epoch shuffles the training indices, loads one batch of images at a
//! time, and applies one optimizer step per batch. The loss of every step is
//! recorded for the loss curve. There is no early stopping and no
//! checkpointing; an unreadable image aborts the run.

use std::time::{Duration, Instant};

use burn::{
    data::dataloader::batcher::Batcher,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Tensor},
};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::TrainingParams;
use crate::dataset::{BeeBatch, BeeBatcher, BeeImageDataset};
use crate::model::BeeClassifier;
use crate::utils::error::{BeeError, Result};
use crate::utils::logging::TrainingLogger;

/// Loss history and progress counters of a run
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Optimizer steps taken so far
    pub iteration: usize,
    /// Loss of every optimizer step, in order
    pub step_losses: Vec<f64>,
    /// Mean loss of each completed epoch
    pub epoch_losses: Vec<f64>,
    /// Steps whose loss was NaN or infinite
    pub non_finite_steps: usize,
}

impl TrainingState {
    fn record_step(&mut self, loss: f64) {
        if !loss.is_finite() {
            if self.non_finite_steps == 0 {
                warn!(
                    "Non-finite loss ({}) at step {}; recording it and continuing",
                    loss,
                    self.iteration + 1
                );
            }
            self.non_finite_steps += 1;
        }
        self.step_losses.push(loss);
        self.iteration += 1;
    }
}

/// Result of a single optimizer step
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub loss: f64,
    pub correct: usize,
    pub batch_size: usize,
}

/// Summary of one training epoch
#[derive(Debug, Clone)]
pub struct EpochSummary {
    pub epoch: usize,
    pub mean_loss: f64,
    pub accuracy: f64,
    pub duration: Duration,
}

/// Trainer owning the model parameters and optimizer for one run
pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<BeeClassifier<B>, B>,
{
    /// Model being trained
    pub model: BeeClassifier<B>,
    optimizer: O,
    loss_fn: CrossEntropyLoss<B>,
    learning_rate: f64,
    /// Current training state
    pub state: TrainingState,
    device: B::Device,
}

/// Create a trainer using the Adam optimizer
pub fn adam_trainer<B: AutodiffBackend>(
    model: BeeClassifier<B>,
    learning_rate: f64,
    device: B::Device,
) -> Trainer<B, impl Optimizer<BeeClassifier<B>, B>> {
    let optimizer = AdamConfig::new().init();
    Trainer::new(model, optimizer, learning_rate, device)
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<BeeClassifier<B>, B>,
{
    /// Create a new trainer for `model`
    pub fn new(model: BeeClassifier<B>, optimizer: O, learning_rate: f64, device: B::Device) -> Self {
        let loss_fn = CrossEntropyLossConfig::new().init(&device);

        Self {
            model,
            optimizer,
            loss_fn,
            learning_rate,
            state: TrainingState::default(),
            device,
        }
    }

    /// Cross-entropy loss of the current model on a batch, with the logits
    pub fn compute_loss(&self, batch: &BeeBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.model.forward(batch.images.clone());
        let loss = self
            .loss_fn
            .forward(output.clone(), batch.targets.clone());
        (loss, output)
    }

    /// Forward, backward and one optimizer step on a batch
    pub fn train_step(&mut self, batch: BeeBatch<B>) -> StepOutcome {
        let (loss, output) = self.compute_loss(&batch);
        let loss_value: f64 = loss.clone().into_scalar().elem();

        let predictions = output.argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predictions
            .equal(batch.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        self.state.record_step(loss_value);

        StepOutcome {
            loss: loss_value,
            correct: correct as usize,
            batch_size: batch.targets.dims()[0],
        }
    }

    /// Train for one epoch over `dataset` in shuffled order
    pub fn train_epoch(
        &mut self,
        dataset: &BeeImageDataset,
        batcher: &BeeBatcher,
        params: &TrainingParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<EpochSummary> {
        use burn::data::dataset::Dataset;

        let start = Instant::now();
        let batch_size = params.batch_size;

        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        indices.shuffle(rng);
        let num_batches = indices.len().div_ceil(batch_size);

        if num_batches == 0 {
            return Err(BeeError::Training("training set is empty".to_string()));
        }

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for (batch_idx, chunk) in indices.chunks(batch_size).enumerate() {
            let items = dataset.load_items(chunk)?;
            let batch: BeeBatch<B> = batcher.batch(items, &self.device);

            let outcome = self.train_step(batch);
            loss_sum += outcome.loss;
            correct += outcome.correct;
            seen += outcome.batch_size;

            if (batch_idx + 1) % params.log_interval == 0 {
                info!(
                    "Epoch [{}/{}], Step [{}/{}], Loss: {:.4}",
                    self.state.epoch + 1,
                    params.epochs,
                    batch_idx + 1,
                    num_batches,
                    outcome.loss
                );
            } else {
                debug!(
                    "  Batch {:>4}/{}: loss = {:.4}",
                    batch_idx + 1,
                    num_batches,
                    outcome.loss
                );
            }
        }

        let mean_loss = loss_sum / num_batches as f64;
        self.state.epoch_losses.push(mean_loss);

        Ok(EpochSummary {
            epoch: self.state.epoch,
            mean_loss,
            accuracy: correct as f64 / seen.max(1) as f64,
            duration: start.elapsed(),
        })
    }

    /// Run the full fixed-length training schedule
    pub fn fit(
        &mut self,
        dataset: &BeeImageDataset,
        batcher: &BeeBatcher,
        params: &TrainingParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let mut logger = TrainingLogger::new(params.epochs);

        for epoch in 0..params.epochs {
            self.state.epoch = epoch;
            logger.start_epoch(epoch);

            let summary = self.train_epoch(dataset, batcher, params, rng)?;
            logger.end_epoch(summary.mean_loss, summary.accuracy, self.learning_rate);
        }

        logger.log_complete(self.state.iteration);
        Ok(())
    }

    /// Consume the trainer and return the trained model
    pub fn into_model(self) -> BeeClassifier<B> {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, TrainingBackend};
    use crate::dataset::{BeeItem, BeeSample};
    use crate::model::BeeClassifierConfig;
    use rand::SeedableRng;
    use std::path::Path;
    use tempfile::TempDir;

    type B = TrainingBackend;

    const SIZE: usize = 16;

    fn small_model(num_classes: usize) -> BeeClassifier<B> {
        let config = BeeClassifierConfig::new(num_classes).with_image_size(SIZE);
        BeeClassifier::new(&config, &default_device())
    }

    fn known_batch() -> BeeBatch<B> {
        let items = vec![
            BeeItem {
                image: vec![0.5; 3 * SIZE * SIZE],
                label: 0,
            },
            BeeItem {
                image: vec![-0.5; 3 * SIZE * SIZE],
                label: 1,
            },
            BeeItem {
                image: (0..3 * SIZE * SIZE).map(|i| (i % 7) as f32 / 7.0).collect(),
                label: 2,
            },
        ];
        BeeBatcher::new(SIZE).batch(items, &default_device())
    }

    fn values<const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
        tensor.into_data().iter::<f32>().collect()
    }

    fn write_image(path: &Path, color: [u8; 3]) {
        image::RgbImage::from_pixel(12, 12, image::Rgb(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_loss_is_positive_and_finite() {
        let trainer = adam_trainer(small_model(3), 1e-3, default_device());
        let (loss, logits) = trainer.compute_loss(&known_batch());

        let value: f64 = loss.into_scalar().elem();
        assert!(value.is_finite());
        assert!(value > 0.0);
        assert_eq!(logits.dims(), [3, 3]);
    }

    #[test]
    fn test_optimizer_step_changes_parameters() {
        let mut trainer = adam_trainer(small_model(3), 1e-3, default_device());

        let fc3_before = values(trainer.model.fc3.weight.val());
        let conv_before = values(trainer.model.stage1_conv1.weight.val());

        let outcome = trainer.train_step(known_batch());

        let fc3_after = values(trainer.model.fc3.weight.val());
        let conv_after = values(trainer.model.stage1_conv1.weight.val());

        assert!(fc3_before != fc3_after || conv_before != conv_after);
        assert_eq!(outcome.batch_size, 3);
        assert!(outcome.correct <= 3);
        assert_eq!(trainer.state.step_losses.len(), 1);
        assert_eq!(trainer.state.iteration, 1);
    }

    #[test]
    fn test_fit_records_every_step() {
        let dir = TempDir::new().unwrap();
        let colors = [[250, 200, 10], [10, 20, 30], [120, 90, 60], [200, 10, 10], [5, 5, 250]];
        let samples: Vec<BeeSample> = colors
            .iter()
            .enumerate()
            .map(|(id, color)| {
                let path = dir.path().join(format!("{}.png", id));
                write_image(&path, *color);
                BeeSample {
                    path,
                    label_name: format!("class_{}", id % 2),
                    label: id % 2,
                    id,
                }
            })
            .collect();

        let dataset = BeeImageDataset::new(samples, SIZE);
        let batcher = BeeBatcher::new(SIZE);
        let params = TrainingParams {
            epochs: 2,
            batch_size: 2,
            learning_rate: 1e-3,
            dropout: 0.5,
            log_interval: 1,
        };

        let mut trainer = adam_trainer(small_model(2), params.learning_rate, default_device());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        trainer.fit(&dataset, &batcher, &params, &mut rng).unwrap();

        // 5 samples in batches of 2 -> 3 steps per epoch, last batch smaller
        assert_eq!(trainer.state.step_losses.len(), 6);
        assert_eq!(trainer.state.epoch_losses.len(), 2);
        assert!(trainer.state.step_losses.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_missing_image_aborts_training() {
        let samples = vec![BeeSample {
            path: "/nonexistent/0.png".into(),
            label_name: "a".to_string(),
            label: 0,
            id: 0,
        }];
        let dataset = BeeImageDataset::new(samples, SIZE);
        let params = TrainingParams {
            epochs: 1,
            batch_size: 4,
            ..TrainingParams::default()
        };

        let mut trainer = adam_trainer(small_model(2), 1e-3, default_device());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = trainer.fit(&dataset, &BeeBatcher::new(SIZE), &params, &mut rng);

        assert!(matches!(result, Err(BeeError::ImageLoad(_, _))));
        assert!(trainer.state.step_losses.is_empty());
    }
}
