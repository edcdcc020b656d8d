//! Label encoder
//!
//! Maps subspecies label strings to dense class indices `0..K`. The encoder
//! must be fitted on the labels of the whole dataset before it is split, so
//! that the training and test sides share one class index map.

use std::collections::HashMap;

use serde::Serialize;

use crate::utils::error::{BeeError, Result};

/// Bijection between distinct label strings and class indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEncoder {
    /// Class names ordered by index
    classes: Vec<String>,
    /// Reverse lookup from name to index
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Fit the encoder on every label of the dataset
    ///
    /// Classes are sorted lexicographically, so the same label set always
    /// produces the same map.
    pub fn fit<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        classes.sort();
        classes.dedup();

        if classes.is_empty() {
            return Err(BeeError::Dataset(
                "cannot fit a label encoder on an empty label set".to_string(),
            ));
        }

        Ok(Self::from_classes(classes))
    }

    fn from_classes(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        Self { classes, index }
    }

    /// Encode a label string to its class index
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| BeeError::UnknownLabel(label.to_string()))
    }

    /// Decode a class index back to its label string
    pub fn decode(&self, class_idx: usize) -> Option<&str> {
        self.classes.get(class_idx).map(String::as_str)
    }

    /// Number of classes (K)
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class names ordered by index
    pub fn class_names(&self) -> &[String] {
        &self.classes
    }
}
