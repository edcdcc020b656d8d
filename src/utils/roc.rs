//! One-vs-rest ROC curves
//!
//! One curve per class: that class's softmax probability is the score, the
//! class itself is positive and every other class negative.

use serde::{Deserialize, Serialize};

/// Receiver operating characteristic curve of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// False positive rate at each threshold, non-decreasing
    pub fpr: Vec<f64>,
    /// True positive rate at each threshold, non-decreasing
    pub tpr: Vec<f64>,
    /// Decreasing score thresholds; the first one is `+inf`
    #[serde(skip)]
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Build the curve of `class_idx` from its scores and the true classes
    ///
    /// Returns `None` when the targets contain no positive or no negative
    /// for this class, since either rate would then be undefined.
    pub fn one_vs_rest(scores: &[f32], targets: &[usize], class_idx: usize) -> Option<Self> {
        let mut pairs: Vec<(f64, bool)> = scores
            .iter()
            .zip(targets)
            .map(|(&s, &t)| (s as f64, t == class_idx))
            .collect();

        let positives = pairs.iter().filter(|(_, p)| *p).count();
        let negatives = pairs.len() - positives;
        if positives == 0 || negatives == 0 {
            return None;
        }

        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut fpr = vec![0.0];
        let mut tpr = vec![0.0];
        let mut thresholds = vec![f64::INFINITY];
        let (mut tp, mut fp) = (0usize, 0usize);

        for (i, (score, positive)) in pairs.iter().enumerate() {
            if *positive {
                tp += 1;
            } else {
                fp += 1;
            }
            // one point per distinct score, after all ties are counted
            let last_of_tie = pairs.get(i + 1).is_none_or(|next| next.0 != *score);
            if last_of_tie {
                fpr.push(fp as f64 / negatives as f64);
                tpr.push(tp as f64 / positives as f64);
                thresholds.push(*score);
            }
        }

        Some(Self {
            fpr,
            tpr,
            thresholds,
        })
    }

    /// Area under the curve by the trapezoidal rule
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }

    /// Number of points on the curve
    pub fn len(&self) -> usize {
        self.fpr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fpr.is_empty()
    }
}

/// ROC curve and AUC of one class, or why it has none
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRoc {
    pub class_idx: usize,
    pub class_name: String,
    /// `None` when the class lacks positives or negatives in the test set
    pub auc: Option<f64>,
    #[serde(skip)]
    pub curve: Option<RocCurve>,
}

/// One-vs-rest curve for every class
///
/// `scores_for(c)` yields the probability of class `c` for every sample.
pub fn one_vs_rest_curves<F>(class_names: &[String], targets: &[usize], scores_for: F) -> Vec<ClassRoc>
where
    F: Fn(usize) -> Vec<f32>,
{
    class_names
        .iter()
        .enumerate()
        .map(|(class_idx, name)| {
            let curve = RocCurve::one_vs_rest(&scores_for(class_idx), targets, class_idx);
            ClassRoc {
                class_idx,
                class_name: name.clone(),
                auc: curve.as_ref().map(RocCurve::auc),
                curve,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_endpoints() {
        let scores = [0.9, 0.2, 0.6, 0.4, 0.7];
        let targets = [1, 0, 1, 0, 0];
        let curve = RocCurve::one_vs_rest(&scores, &targets, 1).unwrap();

        assert_eq!((curve.fpr[0], curve.tpr[0]), (0.0, 0.0));
        assert_eq!(
            (curve.fpr[curve.len() - 1], curve.tpr[curve.len() - 1]),
            (1.0, 1.0)
        );
        assert!(curve.fpr.windows(2).all(|w| w[0] <= w[1]));
        assert!(curve.tpr.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_perfect_separation_has_unit_area() {
        let scores = [0.9, 0.8, 0.3, 0.1];
        let targets = [0, 0, 1, 1];
        let curve = RocCurve::one_vs_rest(&scores, &targets, 0).unwrap();

        assert!((curve.auc() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_scores_have_zero_area() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let targets = [0, 0, 1, 1];
        let curve = RocCurve::one_vs_rest(&scores, &targets, 0).unwrap();

        assert!(curve.auc().abs() < 1e-12);
    }

    #[test]
    fn test_tied_scores_give_chance_area() {
        let scores = [0.5; 6];
        let targets = [0, 1, 0, 1, 0, 1];
        let curve = RocCurve::one_vs_rest(&scores, &targets, 1).unwrap();

        assert_eq!(curve.len(), 2);
        assert!((curve.auc() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_ranking_area() {
        // positives at 0.8, 0.4; negatives at 0.6, 0.2 -> 3 of 4 pairs ordered
        let scores = [0.8, 0.6, 0.4, 0.2];
        let targets = [1, 0, 1, 0];
        let curve = RocCurve::one_vs_rest(&scores, &targets, 1).unwrap();

        assert!((curve.auc() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_class_without_positives_is_undefined() {
        assert!(RocCurve::one_vs_rest(&[0.3, 0.7], &[0, 0], 1).is_none());
        assert!(RocCurve::one_vs_rest(&[0.3, 0.7], &[1, 1], 1).is_none());
    }

    #[test]
    fn test_one_vs_rest_curves() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let probabilities = [[0.8, 0.1, 0.1], [0.2, 0.7, 0.1], [0.6, 0.3, 0.1]];
        let targets = [0, 1, 0];

        let curves = one_vs_rest_curves(&names, &targets, |c| {
            probabilities.iter().map(|row| row[c]).collect()
        });

        assert_eq!(curves.len(), 3);
        assert!(curves[0].auc.is_some());
        assert!(curves[1].auc.is_some());
        assert!(curves[2].auc.is_none());
        assert!(curves[2].curve.is_none());
    }
}
