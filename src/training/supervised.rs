//! Supervised Training Experiment
//!
//! Wires the pipeline end to end: load the table, split, train, evaluate
//! and report. Every setting comes from the [`ExperimentConfig`] passed in.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use burn::{
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    record::CompactRecorder,
    tensor::backend::{AutodiffBackend, Backend},
};
use chrono::Local;
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::backend::backend_name;
use crate::config::ExperimentConfig;
use crate::dataset::{BeeBatcher, BeeDataset, BeeImageDataset, DatasetSplit};
use crate::model::{BeeClassifier, BeeClassifierConfig};
use crate::reporting::ExperimentReport;
use crate::training::evaluation::evaluate;
use crate::training::trainer::adam_trainer;
use crate::utils::error::BeeError;

pub const CONFIG_FILE: &str = "config.json";
pub const MODEL_FILE: &str = "bee_classifier";

/// Create `output_dir/run_<timestamp>`
fn create_run_dir(output_dir: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut run_dir = output_dir.join(format!("run_{}", timestamp));

    // two runs within the same second get distinct directories
    let mut suffix = 1;
    while run_dir.exists() {
        run_dir = output_dir.join(format!("run_{}_{}", timestamp, suffix));
        suffix += 1;
    }

    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run directory {:?}", run_dir))?;
    Ok(run_dir)
}

/// Load the bee table, applying the optional sample cap
pub fn load_dataset(config: &ExperimentConfig) -> Result<BeeDataset> {
    let data = &config.data;
    let mut dataset = BeeDataset::from_csv(&data.csv_path, &data.image_dir, &data.columns())
        .with_context(|| format!("Failed to load dataset table {:?}", data.csv_path))?;

    if let Some(max) = data.max_samples {
        if dataset.len() > max {
            info!("Limiting dataset to {} of {} samples", max, dataset.len());
            dataset.truncate_random(max, config.seed);
        }
    }

    Ok(dataset)
}

/// Run one full experiment and return its report
///
/// # Type Parameters
/// * `B` - The autodiff backend to train on (e.g. `Autodiff<NdArray>`)
pub fn run_experiment<B>(config: &ExperimentConfig) -> Result<ExperimentReport>
where
    B: AutodiffBackend,
{
    config.validate()?;
    let start = Instant::now();

    println!("{}", "Initializing Experiment...".green().bold());
    let device = B::Device::default();
    println!("  🧠 Backend: {}", backend_name());

    let run_dir = create_run_dir(&config.output.output_dir)?;
    println!("  📁 Run directory: {:?}", run_dir);
    config
        .save(&run_dir.join(CONFIG_FILE))
        .context("Failed to write run configuration")?;

    println!();
    println!("{}", "Loading Dataset...".cyan());
    let dataset = load_dataset(config)?;
    dataset.get_stats().print();

    let class_names = dataset.encoder.class_names().to_vec();
    let num_classes = class_names.len();

    println!();
    println!("{}", "Splitting Dataset...".cyan());
    let split = DatasetSplit::train_test(&dataset.samples, config.data.test_fraction, config.seed)?;
    println!("  🏷️  Training samples: {}", split.train.len());
    println!("  ✅ Test samples:     {}", split.test.len());

    let image_size = config.data.image_size;
    let train_dataset = BeeImageDataset::new(split.train, image_size);
    let test_dataset = BeeImageDataset::new(split.test, image_size);
    let batcher = BeeBatcher::new(image_size);

    println!();
    println!("{}", "Creating Model...".cyan());
    let model_config = BeeClassifierConfig::new(num_classes)
        .with_image_size(image_size)
        .with_dropout(config.training.dropout);
    let model = BeeClassifier::<B>::new(&model_config, &device);
    println!("  Classes: {}", num_classes);
    println!("  Flattened features: {}", model_config.flattened_features());

    let params = &config.training;
    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  🔄 Epochs:        {}", params.epochs);
    println!("  📦 Batch size:    {}", params.batch_size);
    println!("  📈 Learning rate: {}", params.learning_rate);
    println!("  🎲 Seed:          {}", config.seed);
    println!();

    println!("{}", "Starting Training...".green().bold());
    let mut trainer = adam_trainer(model, params.learning_rate, device);
    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);
    trainer
        .fit(&train_dataset, &batcher, params, &mut epoch_rng)
        .context("Training failed")?;

    let state = trainer.state.clone();
    let model = trainer.into_model();

    println!();
    println!("{}", "Evaluating...".cyan());
    let inner_device = <B::InnerBackend as Backend>::Device::default();
    let inference_model = model.valid();
    let evaluation = evaluate(
        &inference_model,
        &test_dataset,
        &batcher,
        params.batch_size,
        &inner_device,
    )
    .context("Evaluation failed")?;

    let report = ExperimentReport::new(
        &evaluation,
        &state,
        &class_names,
        train_dataset.len(),
        backend_name(),
        start.elapsed().as_secs_f64(),
    )?;
    report.print();

    let paths = report
        .write_artifacts(&run_dir, config.output.loss_plot_ceiling)
        .context("Failed to write report artifacts")?;

    println!();
    println!("{}", "Artifacts:".cyan().bold());
    println!("  📉 Loss curve: {:?}", paths.loss_curve);
    println!("  📈 ROC curves: {:?}", paths.roc_curves);
    println!("  📄 Report:     {:?}", paths.report);

    if config.output.save_model {
        let model_path = run_dir.join(MODEL_FILE);
        inference_model
            .save_file(&model_path, &CompactRecorder::new())
            .map_err(|e| BeeError::Model(format!("failed to save {:?}: {:?}", model_path, e)))?;
        println!("  💾 Model:      {:?}", model_path);
    }

    println!();
    println!("{}", "Experiment Complete!".green().bold());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrainingBackend;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path) -> ExperimentConfig {
        let image_dir = dir.join("bee_imgs");
        std::fs::create_dir_all(&image_dir).unwrap();

        let labels = ["Italian honey bee", "Russian honey bee", "-1"];
        let mut table = String::from("file,location,subspecies,health\n");
        for i in 0..9 {
            let file = format!("{:03}.png", i);
            let shade = (i * 25) as u8;
            image::RgbImage::from_pixel(10, 14, image::Rgb([shade, 255 - shade, 80]))
                .save(image_dir.join(&file))
                .unwrap();
            table.push_str(&format!("{},\"Here, TX\",{},healthy\n", file, labels[i % 3]));
        }
        let csv_path = dir.join("bee_data.csv");
        std::fs::write(&csv_path, table).unwrap();

        let mut config = ExperimentConfig::default();
        config.data.csv_path = csv_path;
        config.data.image_dir = image_dir;
        config.data.image_size = 16;
        config.training.epochs = 1;
        config.training.batch_size = 4;
        config.output.output_dir = dir.join("output");
        config
    }

    #[test]
    fn test_load_dataset_applies_sample_cap() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(dir.path());
        config.data.max_samples = Some(5);

        let dataset = load_dataset(&config).unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.num_classes(), 3);
    }

    #[test]
    fn test_run_experiment_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(dir.path());

        let report = run_experiment::<TrainingBackend>(&config).unwrap();

        // 9 samples -> ceil(2.7) = 3 test, 6 train in batches of 4
        assert_eq!(report.test_samples, 3);
        assert_eq!(report.train_samples, 6);
        assert_eq!(report.step_losses.len(), 2);
        assert_eq!(report.class_names.len(), 3);

        let run_dirs: Vec<PathBuf> = std::fs::read_dir(&config.output.output_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(run_dirs.len(), 1);
        for file in [CONFIG_FILE, "loss_curve.svg", "roc_curves.svg", "report.json"] {
            assert!(run_dirs[0].join(file).exists(), "missing {}", file);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_any_output() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(dir.path());
        config.training.epochs = 0;

        assert!(run_experiment::<TrainingBackend>(&config).is_err());
        assert!(!config.output.output_dir.exists());
    }
}
