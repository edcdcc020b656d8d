//! Train/test split
//!
//! A seeded random partition of the samples into a training side and a
//! held-out test side. The test side receives `ceil(n * test_fraction)`
//! samples; the two sides are disjoint and together cover every sample.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::dataset::loader::BeeSample;
use crate::utils::error::{BeeError, Result};

/// Training and test partitions of the dataset
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<BeeSample>,
    pub test: Vec<BeeSample>,
}

impl DatasetSplit {
    /// Randomly partition `samples` with the given test fraction and seed
    pub fn train_test(samples: &[BeeSample], test_fraction: f64, seed: u64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(BeeError::Config(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let total = samples.len();
        let test_size = (total as f64 * test_fraction).ceil() as usize;
        let train_size = total.saturating_sub(test_size);

        if test_size == 0 || train_size == 0 {
            return Err(BeeError::Dataset(format!(
                "cannot split {} samples with test fraction {}: one side would be empty",
                total, test_fraction
            )));
        }

        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let test = indices[..test_size]
            .iter()
            .map(|&i| samples[i].clone())
            .collect::<Vec<_>>();
        let train = indices[test_size..]
            .iter()
            .map(|&i| samples[i].clone())
            .collect::<Vec<_>>();

        info!(
            "Split {} samples into {} train / {} test",
            total,
            train.len(),
            test.len()
        );

        Ok(Self { train, test })
    }

    /// Total number of samples across both sides
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}
