//! Metrics Module for Model Evaluation
//!
//! Provides the classification metrics reported after training:
//! - Accuracy
//! - Per-class precision, recall, F1-score and support
//! - Macro and support-weighted averages
//! - Confusion matrix

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::error::{BeeError, Result};

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name from the label encoder
    pub class_name: String,

    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize, class_name: &str) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // predicted as this class, actually another
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // actually this class, predicted as another
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;
        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: class_name.to_string(),
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }

    /// Whether the class occurs among the targets or the predictions
    pub fn is_present(&self) -> bool {
        self.support > 0 || self.false_positives > 0
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Averaged precision/recall/F1 row of the report
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Precision, recall, F1 and support per class with accuracy and averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// One row per class index, in class-index order
    pub per_class: Vec<ClassMetrics>,

    /// Unweighted mean over the classes present in targets or predictions
    pub macro_avg: AverageMetrics,

    /// Support-weighted mean over all classes
    pub weighted_avg: AverageMetrics,

    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    /// Build the report from predicted and true class indices
    ///
    /// `class_names` fixes the number of classes; every index must be below
    /// its length.
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        class_names: &[String],
    ) -> Result<Self> {
        if predictions.len() != ground_truth.len() {
            return Err(BeeError::Training(format!(
                "{} predictions for {} targets",
                predictions.len(),
                ground_truth.len()
            )));
        }

        let num_classes = class_names.len();
        if let Some(bad) = predictions
            .iter()
            .chain(ground_truth)
            .find(|&&c| c >= num_classes)
        {
            return Err(BeeError::Training(format!(
                "class index {} out of range for {} classes",
                bad, num_classes
            )));
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);
        let total_samples = confusion_matrix.total();
        let correct_predictions = confusion_matrix.correct();

        let per_class: Vec<ClassMetrics> = class_names
            .iter()
            .enumerate()
            .map(|(idx, name)| ClassMetrics::from_confusion_matrix(&confusion_matrix, idx, name))
            .collect();

        let present: Vec<&ClassMetrics> = per_class.iter().filter(|m| m.is_present()).collect();
        let n_present = present.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: present.iter().map(|m| m.precision).sum::<f64>() / n_present,
            recall: present.iter().map(|m| m.recall).sum::<f64>() / n_present,
            f1: present.iter().map(|m| m.f1).sum::<f64>() / n_present,
            support: total_samples,
        };

        let weight = total_samples.max(1) as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            per_class
                .iter()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / weight
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total_samples,
        };

        Ok(Self {
            total_samples,
            correct_predictions,
            accuracy: confusion_matrix.accuracy(),
            per_class,
            macro_avg,
            weighted_avg,
            confusion_matrix,
        })
    }

    /// Class names in class-index order
    pub fn class_names(&self) -> Vec<String> {
        self.per_class.iter().map(|m| m.class_name.clone()).collect()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .per_class
            .iter()
            .map(|m| m.class_name.chars().count())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support",
            width = width
        )?;
        writeln!(f)?;

        for m in &self.per_class {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.class_name, m.precision, m.recall, m.f1, m.support,
                width = width
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_samples,
            width = width
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support,
                width = width
            )?;
        }
        Ok(())
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Row-major counts (row = actual, column = predicted)
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Render the matrix as text, with class names truncated to fit
    pub fn display(&self, class_names: &[String]) -> String {
        let mut output = String::new();
        let short = |idx: usize, len: usize| -> String {
            class_names
                .get(idx)
                .map(|n| n.chars().take(len).collect())
                .unwrap_or_else(|| idx.to_string())
        };

        output.push_str("Confusion Matrix (rows=actual, cols=predicted):\n\n");

        output.push_str(&" ".repeat(13));
        for col in 0..self.num_classes {
            output.push_str(&format!("{:>7}", short(col, 6)));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            output.push_str(&format!("{:>12} ", short(row, 12)));

            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!(" [{:>4}]", count));
                } else if count > 0 {
                    output.push_str(&format!("  {:>4} ", count));
                } else {
                    output.push_str("     . ");
                }
            }
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("class_{}", i)).collect()
    }

    #[test]
    fn test_two_class_scenario() {
        let targets = [0, 1, 0, 1];
        let predictions = [0, 1, 1, 1];

        let report = ClassificationReport::from_predictions(&predictions, &targets, &names(2)).unwrap();

        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(report.correct_predictions, 3);

        let c0 = &report.per_class[0];
        assert_eq!((c0.true_positives, c0.support), (1, 2));
        assert!((c0.precision - 1.0).abs() < 1e-12);
        assert!((c0.recall - 0.5).abs() < 1e-12);

        let c1 = &report.per_class[1];
        assert_eq!((c1.true_positives, c1.support), (2, 2));
        assert!((c1.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((c1.recall - 1.0).abs() < 1e-12);
        assert!((c1.f1 - 0.8).abs() < 1e-12);

        let expected_macro_f1 = (2.0 / 3.0 + 0.8) / 2.0;
        assert!((report.macro_avg.f1 - expected_macro_f1).abs() < 1e-12);
        assert!((report.weighted_avg.f1 - expected_macro_f1).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 4);
    }

    #[test]
    fn test_absent_class_is_excluded_from_macro_average() {
        let report = ClassificationReport::from_predictions(&[0, 0], &[0, 0], &names(3)).unwrap();

        assert_eq!(report.per_class[1].support, 0);
        assert!(!report.per_class[2].is_present());
        assert!((report.macro_avg.f1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        assert!(ClassificationReport::from_predictions(&[0], &[0, 1], &names(2)).is_err());
    }

    #[test]
    fn test_out_of_range_class_is_an_error() {
        assert!(ClassificationReport::from_predictions(&[2], &[0], &names(2)).is_err());
    }

    #[test]
    fn test_report_table_lists_every_class() {
        let class_names = vec!["Italian honey bee".to_string(), "Carniolan honey bee".to_string()];
        let report = ClassificationReport::from_predictions(&[0, 1], &[0, 0], &class_names).unwrap();
        let table = report.to_string();

        assert!(table.contains("Italian honey bee"));
        assert!(table.contains("Carniolan honey bee"));
        assert!(table.contains("macro avg"));
        assert!(table.contains("weighted avg"));
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1, 1, 2], &[0, 1, 2, 2], 3);

        assert_eq!(cm.get(2, 1), 1);
        assert_eq!(cm.correct(), 3);
        assert!((cm.accuracy() - 0.75).abs() < 1e-12);
        assert!(cm.display(&names(3)).contains("[   1]"));
    }
}
