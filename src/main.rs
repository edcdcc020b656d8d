//! Bee Subspecies Classification CLI
//!
//! Entry point for training and evaluating the bee subspecies classifier
//! with the Burn framework.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use bee_subspecies::backend::{backend_name, TrainingBackend};
use bee_subspecies::config::ExperimentConfig;
use bee_subspecies::training::run_experiment;
use bee_subspecies::training::supervised::load_dataset;
use bee_subspecies::utils::logging::{init_logging, LogConfig};

/// Sample cap used by `--quick`
const QUICK_MAX_SAMPLES: usize = 500;

/// Honeybee subspecies classification from images
#[derive(Parser, Debug)]
#[command(name = "bee_subspecies")]
#[command(version = "0.1.0")]
#[command(about = "Honeybee subspecies image classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier and report on the held-out split
    Train {
        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV table describing the images
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory containing the image files
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size for training
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Fraction of samples held out for testing (0.0-1.0)
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Side length images are resized to
        #[arg(long)]
        image_size: Option<usize>,

        /// Root directory for run outputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quick test mode - use only 500 samples for fast verification
        #[arg(long, default_value = "false")]
        quick: bool,

        /// Save the trained weights into the run directory
        #[arg(long, default_value = "false")]
        save_model: bool,
    },

    /// Show dataset statistics and the class index map
    Stats {
        /// CSV table describing the images
        #[arg(long, default_value = "data/bee_data.csv")]
        csv: PathBuf,

        /// Directory containing the image files
        #[arg(long, default_value = "data/bee_imgs")]
        image_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging(&LogConfig::from_verbosity(cli.verbose));

    print_banner();

    match cli.command {
        Commands::Train {
            config,
            csv,
            image_dir,
            epochs,
            batch_size,
            learning_rate,
            test_fraction,
            image_size,
            output_dir,
            seed,
            quick,
            save_model,
        } => {
            let mut experiment = match config {
                Some(path) => ExperimentConfig::load(&path)
                    .with_context(|| format!("Failed to load config {:?}", path))?,
                None => ExperimentConfig::default(),
            };

            if let Some(v) = csv {
                experiment.data.csv_path = v;
            }
            if let Some(v) = image_dir {
                experiment.data.image_dir = v;
            }
            if let Some(v) = epochs {
                experiment.training.epochs = v;
            }
            if let Some(v) = batch_size {
                experiment.training.batch_size = v;
            }
            if let Some(v) = learning_rate {
                experiment.training.learning_rate = v;
            }
            if let Some(v) = test_fraction {
                experiment.data.test_fraction = v;
            }
            if let Some(v) = image_size {
                experiment.data.image_size = v;
            }
            if let Some(v) = output_dir {
                experiment.output.output_dir = v;
            }
            if let Some(v) = seed {
                experiment.seed = v;
            }
            if quick {
                println!(
                    "{} Quick mode: using at most {} samples",
                    "⚡".yellow(),
                    QUICK_MAX_SAMPLES
                );
                experiment.data.max_samples = Some(QUICK_MAX_SAMPLES);
            }
            if save_model {
                experiment.output.save_model = true;
            }

            info!("Training on {}", backend_name());
            run_experiment::<TrainingBackend>(&experiment)?;
        }

        Commands::Stats { csv, image_dir } => {
            let mut experiment = ExperimentConfig::default();
            experiment.data.csv_path = csv;
            experiment.data.image_dir = image_dir;

            let dataset = load_dataset(&experiment)?;
            dataset.get_stats().print();

            println!();
            println!("{}", "Class index map:".cyan().bold());
            for (idx, name) in dataset.encoder.class_names().iter().enumerate() {
                println!("  {} -> {:?}", idx, name);
            }
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════════╗
 ║   🐝 Bee Subspecies Classification                           ║
 ║   Convolutional image classifier with Burn + Rust            ║
 ╚══════════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}
