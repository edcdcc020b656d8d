//! Dataset module for bee image handling
//!
//! This module provides functionality for:
//! - Loading the bee table and fitting the class index map
//! - Splitting samples into training and test sides
//! - Preprocessing images and batching them for Burn
//!
//! The class index map is fitted on the full table before splitting, so both
//! sides of the split and every report share the same class indices.

pub mod burn_dataset;
pub mod encoder;
pub mod loader;
pub mod split;

pub use burn_dataset::{BeeBatch, BeeBatcher, BeeImageDataset, BeeItem};
pub use encoder::LabelEncoder;
pub use loader::{BeeDataset, BeeSample, DatasetStats, TableColumns};
pub use split::DatasetSplit;

/// Default side length images are resized to
pub const DEFAULT_IMAGE_SIZE: usize = 120;

/// Per-channel normalization mean (ImageNet)
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel normalization standard deviation (ImageNet)
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];
