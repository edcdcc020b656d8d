//! # Bee Subspecies Classification
//!
//! Trains a convolutional network with the Burn framework to recognise
//! honeybee subspecies from photographs, then reports test accuracy, a
//! per-class classification report and one-vs-rest ROC curves.
//!
//! ## Modules
//!
//! - `dataset`: CSV table loading, label encoding, train/test split, image preprocessing
//! - `model`: CNN architecture built with Burn
//! - `training`: Training loop, evaluation loop and the experiment driver
//! - `reporting`: Console report and the loss/ROC charts written per run
//! - `utils`: Logging, metrics, ROC curves, charts and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bee_subspecies::backend::TrainingBackend;
//! use bee_subspecies::config::ExperimentConfig;
//! use bee_subspecies::training::run_experiment;
//!
//! let config = ExperimentConfig::default();
//! let report = run_experiment::<TrainingBackend>(&config)?;
//! println!("accuracy: {:.2}", report.accuracy);
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod model;
pub mod reporting;
pub mod training;
pub mod utils;

pub use config::ExperimentConfig;
pub use dataset::{BeeBatch, BeeBatcher, BeeDataset, BeeImageDataset, BeeItem, DatasetSplit, LabelEncoder};
pub use model::{BeeClassifier, BeeClassifierConfig};
pub use reporting::ExperimentReport;
pub use training::{run_experiment, Trainer, TrainingState};
pub use utils::error::{BeeError, Result};
pub use utils::metrics::{ClassificationReport, ConfusionMatrix};
