//! Training module for the bee classifier
//!
//! This module provides:
//! - The training loop (shuffled mini-batches, cross-entropy, Adam)
//! - The evaluation loop over the held-out split
//! - The end-to-end experiment driver
//!
//! Training runs for a fixed number of epochs. There is no early stopping,
//! no learning rate schedule and no checkpointing.

pub mod evaluation;
pub mod supervised;
pub mod trainer;

pub use evaluation::{evaluate, EvaluationOutput};
pub use supervised::run_experiment;
pub use trainer::{adam_trainer, Trainer, TrainingState};

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 30;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
