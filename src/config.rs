//! Experiment configuration
//!
//! All paths and hyperparameters of a run live in one [`ExperimentConfig`]
//! record that is handed to each component. It can be loaded from and saved
//! to JSON; CLI flags override individual fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::{TableColumns, DEFAULT_IMAGE_SIZE};
use crate::training::{DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE};
use crate::utils::error::{BeeError, Result};

/// Main configuration for an experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Dataset location and preprocessing
    pub data: DataConfig,
    /// Training hyperparameters
    pub training: TrainingParams,
    /// Output locations and plot settings
    pub output: OutputConfig,
    /// Random seed for the split and epoch shuffling
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            training: TrainingParams::default(),
            output: OutputConfig::default(),
            seed: 42,
        }
    }
}

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV table describing every image
    pub csv_path: PathBuf,
    /// Directory holding the image files named in the table
    pub image_dir: PathBuf,
    /// Header of the filename column
    pub file_column: String,
    /// Header of the subspecies label column
    pub label_column: String,
    /// Side length images are resized to
    pub image_size: usize,
    /// Fraction of samples held out for evaluation
    pub test_fraction: f64,
    /// Optional cap on the number of samples used (quick runs)
    pub max_samples: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/bee_data.csv"),
            image_dir: PathBuf::from("data/bee_imgs"),
            file_column: "file".to_string(),
            label_column: "subspecies".to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
            test_fraction: 0.3,
            max_samples: None,
        }
    }
}

impl DataConfig {
    /// Table column names to read
    pub fn columns(&self) -> TableColumns {
        TableColumns {
            file: self.file_column.clone(),
            label: self.label_column.clone(),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Dropout probability inside the convolutional stages
    pub dropout: f64,
    /// Log a progress line every N steps
    pub log_interval: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            dropout: 0.5,
            log_interval: 10,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory; each run writes into a timestamped subdirectory
    pub output_dir: PathBuf,
    /// Upper bound of the loss plot's y axis (None = fit to data)
    pub loss_plot_ceiling: Option<f64>,
    /// Persist trained weights with the compact recorder
    pub save_model: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            loss_plot_ceiling: Some(3.2),
            save_model: false,
        }
    }
}

impl ExperimentConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        let training = &self.training;

        if data.image_size == 0 {
            return Err(BeeError::Config("image_size must be greater than 0".to_string()));
        }

        if !(data.test_fraction > 0.0 && data.test_fraction < 1.0) {
            return Err(BeeError::Config(
                "test_fraction must be in range (0.0, 1.0)".to_string(),
            ));
        }

        if data.file_column.is_empty() || data.label_column.is_empty() {
            return Err(BeeError::Config("column names must not be empty".to_string()));
        }

        if let Some(0) = data.max_samples {
            return Err(BeeError::Config("max_samples must be greater than 0".to_string()));
        }

        if training.epochs == 0 {
            return Err(BeeError::Config("epochs must be greater than 0".to_string()));
        }

        if training.batch_size == 0 {
            return Err(BeeError::Config("batch_size must be greater than 0".to_string()));
        }

        if !(training.learning_rate > 0.0) || !training.learning_rate.is_finite() {
            return Err(BeeError::Config("learning_rate must be positive".to_string()));
        }

        if training.dropout < 0.0 || training.dropout >= 1.0 {
            return Err(BeeError::Config("dropout must be in range [0.0, 1.0)".to_string()));
        }

        if training.log_interval == 0 {
            return Err(BeeError::Config("log_interval must be greater than 0".to_string()));
        }

        if let Some(ceiling) = self.output.loss_plot_ceiling {
            if !(ceiling > 0.0) {
                return Err(BeeError::Config(
                    "loss_plot_ceiling must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }
}
