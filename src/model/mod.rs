//! Model module for the CNN architecture using the Burn framework
//!
//! The classifier maps a fixed-size RGB image to one raw score per
//! subspecies class. The number of classes always comes from the label
//! encoder fitted on the dataset.

pub mod cnn;

pub use cnn::{BeeClassifier, BeeClassifierConfig};
