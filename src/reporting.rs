//! Experiment report
//!
//! Collects everything a finished run produces (accuracy, classification
//! report, per-class ROC/AUC, loss history, timing) and renders it to the
//! console and to files in the run directory.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use crate::training::evaluation::EvaluationOutput;
use crate::training::trainer::TrainingState;
use crate::utils::charts::{palette_color, DataSeries, LineChart, COLOR_REFERENCE};
use crate::utils::error::Result;
use crate::utils::format_duration;
use crate::utils::metrics::ClassificationReport;
use crate::utils::roc::{one_vs_rest_curves, ClassRoc};

/// Confusion matrices above this many classes are not printed
const MAX_PRINTED_MATRIX_CLASSES: usize = 12;

pub const LOSS_CURVE_FILE: &str = "loss_curve.svg";
pub const ROC_CURVES_FILE: &str = "roc_curves.svg";
pub const REPORT_FILE: &str = "report.json";

/// Results of one experiment run
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub backend: String,
    pub class_names: Vec<String>,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Test accuracy (0 for an empty test set)
    pub accuracy: f64,
    pub classification: ClassificationReport,
    /// One entry per class; `auc` is `None` where the curve is undefined
    pub roc: Vec<ClassRoc>,
    /// Loss of every optimizer step
    pub step_losses: Vec<f64>,
    pub epoch_losses: Vec<f64>,
    pub elapsed_secs: f64,
}

/// Files written for a run
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub loss_curve: PathBuf,
    pub roc_curves: PathBuf,
    pub report: PathBuf,
}

impl ExperimentReport {
    /// Assemble the report from the evaluation output and training history
    pub fn new(
        evaluation: &EvaluationOutput,
        state: &TrainingState,
        class_names: &[String],
        train_samples: usize,
        backend: &str,
        elapsed_secs: f64,
    ) -> Result<Self> {
        let classification = ClassificationReport::from_predictions(
            &evaluation.predictions,
            &evaluation.targets,
            class_names,
        )?;
        let roc = one_vs_rest_curves(class_names, &evaluation.targets, |c| {
            evaluation.class_scores(c)
        });

        Ok(Self {
            backend: backend.to_string(),
            class_names: class_names.to_vec(),
            train_samples,
            test_samples: evaluation.len(),
            accuracy: evaluation.accuracy(),
            classification,
            roc,
            step_losses: state.step_losses.clone(),
            epoch_losses: state.epoch_losses.clone(),
            elapsed_secs,
        })
    }

    /// Macro mean of the defined AUC values
    pub fn mean_auc(&self) -> Option<f64> {
        let defined: Vec<f64> = self.roc.iter().filter_map(|r| r.auc).collect();
        if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        }
    }

    /// Print the results to the console
    pub fn print(&self) {
        println!();
        println!("{}", "Results".green().bold());
        println!(
            "  🎯 Test accuracy on {} test images: {:.2}%",
            self.test_samples,
            self.accuracy * 100.0
        );
        println!(
            "  ⏱️  Computational time: {}",
            format_duration(self.elapsed_secs)
        );

        println!();
        println!("{}", "Classification report:".cyan().bold());
        print!("{}", self.classification);

        if self.class_names.len() <= MAX_PRINTED_MATRIX_CLASSES {
            println!();
            print!(
                "{}",
                self.classification.confusion_matrix.display(&self.class_names)
            );
        }

        println!();
        println!("{}", "ROC AUC (one-vs-rest):".cyan().bold());
        for roc in &self.roc {
            match roc.auc {
                Some(auc) => println!("  {:3}. {:28} {:.3}", roc.class_idx, roc.class_name, auc),
                None => println!(
                    "  {:3}. {:28} {}",
                    roc.class_idx,
                    roc.class_name,
                    "undefined (class lacks positives or negatives in the test set)".yellow()
                ),
            }
        }
        if let Some(mean) = self.mean_auc() {
            println!("  Mean AUC: {:.3}", mean);
        }
    }

    /// Loss chart over every training step
    pub fn loss_chart(&self, ceiling: Option<f64>) -> (LineChart, Vec<DataSeries>) {
        let points: Vec<(f64, f64)> = self
            .step_losses
            .iter()
            .enumerate()
            .map(|(i, &loss)| ((i + 1) as f64, loss))
            .collect();

        let mut chart = LineChart::new("CrossEntropyLoss", "Iteration", "Loss")
            .with_x_range(1.0, points.len().max(2) as f64);
        chart = match ceiling {
            Some(max) => chart.with_y_range(0.0, max),
            None => {
                let max = points
                    .iter()
                    .map(|p| p.1)
                    .filter(|l| l.is_finite())
                    .fold(0.0f64, f64::max);
                chart.with_y_range(0.0, max.max(f64::EPSILON))
            }
        };

        let series = vec![DataSeries::new("Training loss", points, palette_color(0))];
        (chart, series)
    }

    /// ROC chart with every defined curve and the chance diagonal
    pub fn roc_chart(&self) -> (LineChart, Vec<DataSeries>) {
        let chart = LineChart::new(
            "Receiver operating characteristic for all labels",
            "False Positive Rate",
            "True Positive Rate",
        )
        .with_x_range(0.0, 1.0)
        .with_y_range(0.0, 1.0);

        let mut series: Vec<DataSeries> = self
            .roc
            .iter()
            .filter_map(|roc| {
                let curve = roc.curve.as_ref()?;
                let auc = roc.auc?;
                let points = curve.fpr.iter().copied().zip(curve.tpr.iter().copied()).collect();
                Some(DataSeries::new(
                    format!(
                        "ROC curve of class {} {} (area = {:.2})",
                        roc.class_idx, roc.class_name, auc
                    ),
                    points,
                    palette_color(roc.class_idx),
                ))
            })
            .collect();

        series.push(
            DataSeries::new("chance", vec![(0.0, 0.0), (1.0, 1.0)], COLOR_REFERENCE)
                .dashed()
                .without_legend(),
        );

        (chart, series)
    }

    /// Write the loss curve, ROC chart and JSON report into `run_dir`
    pub fn write_artifacts(&self, run_dir: &Path, loss_ceiling: Option<f64>) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths {
            loss_curve: run_dir.join(LOSS_CURVE_FILE),
            roc_curves: run_dir.join(ROC_CURVES_FILE),
            report: run_dir.join(REPORT_FILE),
        };

        let (chart, series) = self.loss_chart(loss_ceiling);
        chart.write(&series, &paths.loss_curve)?;

        let skipped = self.roc.iter().filter(|r| r.curve.is_none()).count();
        if skipped > 0 {
            warn!("{} class(es) have no ROC curve and are left out of the plot", skipped);
        }
        let (chart, series) = self.roc_chart();
        chart.write(&series, &paths.roc_curves)?;

        std::fs::write(&paths.report, serde_json::to_string_pretty(self)?)?;

        info!("Wrote report artifacts to {:?}", run_dir);
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_report() -> ExperimentReport {
        let evaluation = EvaluationOutput {
            predictions: vec![0, 1, 1, 1],
            probabilities: vec![
                vec![0.9, 0.1, 0.0],
                vec![0.2, 0.8, 0.0],
                vec![0.4, 0.6, 0.0],
                vec![0.1, 0.9, 0.0],
            ],
            targets: vec![0, 1, 0, 1],
        };
        let state = TrainingState {
            step_losses: vec![2.1, 1.5, f64::NAN, 0.9],
            epoch_losses: vec![1.8, 0.9],
            ..TrainingState::default()
        };
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        ExperimentReport::new(&evaluation, &state, &names, 10, "NdArray (CPU)", 12.5).unwrap()
    }

    #[test]
    fn test_report_contents() {
        let report = sample_report();

        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(report.test_samples, 4);
        assert_eq!(report.roc.len(), 3);
        assert!(report.roc[0].auc.is_some());
        // class C never occurs in the targets
        assert!(report.roc[2].auc.is_none());
        assert!(report.mean_auc().is_some());
    }

    #[test]
    fn test_roc_chart_skips_undefined_classes() {
        let report = sample_report();
        let (_, series) = report.roc_chart();

        // two defined curves plus the diagonal
        assert_eq!(series.len(), 3);
        assert!(series.iter().any(|s| s.dashed));
        assert!(series[0].name.starts_with("ROC curve of class 0"));
    }

    #[test]
    fn test_loss_chart_uses_ceiling() {
        let report = sample_report();
        let (chart, series) = report.loss_chart(Some(3.2));

        assert_eq!(chart.y_range, Some((0.0, 3.2)));
        assert_eq!(series[0].points.len(), 4);
        assert_eq!(series[0].points[0].0, 1.0);
    }

    #[test]
    fn test_write_artifacts() {
        let dir = TempDir::new().unwrap();
        let report = sample_report();

        let paths = report.write_artifacts(dir.path(), Some(3.2)).unwrap();

        assert!(paths.loss_curve.exists());
        assert!(paths.roc_curves.exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.report).unwrap()).unwrap();
        assert_eq!(json["test_samples"], 4);
        assert_eq!(json["step_losses"].as_array().unwrap().len(), 4);
        assert!(json["roc"][2]["auc"].is_null());
    }
}
