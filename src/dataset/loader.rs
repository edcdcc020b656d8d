//! Bee Dataset Loader
//!
//! Reads the CSV table describing the bee photographs, resolves each image
//! path against the image directory and encodes the subspecies labels. The
//! label encoder is fitted on the whole table here, before any split.

use std::io::Read;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::encoder::LabelEncoder;
use crate::utils::error::{BeeError, Result};

/// A single image sample with its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeeSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Subspecies label as written in the table
    pub label_name: String,
    /// Encoded class index
    pub label: usize,
    /// Row index in the table
    pub id: usize,
}

/// Names of the table columns the loader reads
#[derive(Debug, Clone)]
pub struct TableColumns {
    pub file: String,
    pub label: String,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            file: "file".to_string(),
            label: "subspecies".to_string(),
        }
    }
}

/// The full bee dataset with its class index map
#[derive(Debug, Clone)]
pub struct BeeDataset {
    /// Directory the image paths are resolved against
    pub image_dir: PathBuf,
    /// All samples in table order
    pub samples: Vec<BeeSample>,
    /// Class index map fitted on every label in the table
    pub encoder: LabelEncoder,
}

impl BeeDataset {
    /// Load the dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        csv_path: P,
        image_dir: Q,
        columns: &TableColumns,
    ) -> Result<Self> {
        let csv_path = csv_path.as_ref();
        info!("Loading bee dataset table from: {:?}", csv_path);

        if !csv_path.exists() {
            return Err(BeeError::Dataset(format!(
                "dataset table does not exist: {:?}",
                csv_path
            )));
        }

        let file = std::fs::File::open(csv_path)?;
        Self::from_reader(file, image_dir, columns)
    }

    /// Load the dataset from any CSV reader
    pub fn from_reader<R: Read, Q: AsRef<Path>>(
        reader: R,
        image_dir: Q,
        columns: &TableColumns,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref().to_path_buf();
        let mut reader = csv::Reader::from_reader(reader);

        let headers = reader.headers()?.clone();
        let file_idx = column_index(&headers, &columns.file)?;
        let label_idx = column_index(&headers, &columns.label)?;

        let mut rows: Vec<(String, String)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let file = record.get(file_idx).unwrap_or_default().trim();
            let label = record.get(label_idx).unwrap_or_default().trim();

            if file.is_empty() {
                return Err(BeeError::Dataset(format!(
                    "row {} has an empty '{}' column",
                    rows.len() + 1,
                    columns.file
                )));
            }

            rows.push((file.to_string(), label.to_string()));
        }

        let encoder = LabelEncoder::fit(rows.iter().map(|(_, label)| label.as_str()))?;
        info!("Found {} subspecies classes", encoder.num_classes());

        let samples = rows
            .into_iter()
            .enumerate()
            .map(|(id, (file, label_name))| {
                let label = encoder.encode(&label_name)?;
                Ok(BeeSample {
                    path: image_dir.join(file),
                    label_name,
                    label,
                    id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Class index map: {:?}", encoder.class_names());
        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            image_dir,
            samples,
            encoder,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.encoder.num_classes()
    }

    /// Keep a seeded random subset of at most `max` samples
    ///
    /// The encoder is left untouched, so K still reflects the full table.
    pub fn truncate_random(&mut self, max: usize, seed: u64) {
        if self.samples.len() <= max {
            return;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
        self.samples.truncate(max);
        self.samples.sort_by_key(|s| s.id);
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.encoder.class_names().to_vec(),
        }
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| {
            BeeError::Dataset(format!(
                "column '{}' not found in table header {:?}",
                name,
                headers.iter().collect::<Vec<_>>()
            ))
        })
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, name) in self.class_names.iter().enumerate() {
            let count = self.class_counts[idx];
            let bar_len = (count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:28} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
file,date,time,location,zip code,subspecies,health,pollen_carrying,caste
041_066.png,8/28/18,16:07,\"Alvin, TX, USA\",77511,-1,hive being robbed,False,worker
041_072.png,8/28/18,16:07,\"Alvin, TX, USA\",77511,-1,hive being robbed,False,worker
038_294.png,8/25/18,11:05,\"Saratoga, CA, USA\",95070,Italian honey bee,healthy,False,worker
032_672.png,8/24/18,11:19,\"Keene, NH, USA\",3431,Russian honey bee,healthy,True,worker
032_673.png,8/24/18,11:19,\"Keene, NH, USA\",3431,Russian honey bee,healthy,False,worker
";

    #[test]
    fn test_load_from_reader() {
        let dataset =
            BeeDataset::from_reader(TABLE.as_bytes(), "imgs", &TableColumns::default()).unwrap();

        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.num_classes(), 3);
        assert_eq!(dataset.samples[0].path, PathBuf::from("imgs/041_066.png"));
        assert_eq!(dataset.samples[2].label_name, "Italian honey bee");

        let italian = dataset.encoder.encode("Italian honey bee").unwrap();
        assert_eq!(dataset.samples[2].label, italian);
        assert_eq!(dataset.samples[3].label, dataset.samples[4].label);
    }

    #[test]
    fn test_missing_column() {
        let columns = TableColumns {
            file: "file".to_string(),
            label: "species".to_string(),
        };
        let result = BeeDataset::from_reader(TABLE.as_bytes(), "imgs", &columns);
        assert!(matches!(result, Err(BeeError::Dataset(msg)) if msg.contains("species")));
    }

    #[test]
    fn test_missing_table_file() {
        let result =
            BeeDataset::from_csv("/nonexistent/bee_data.csv", "imgs", &TableColumns::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_stats() {
        let dataset =
            BeeDataset::from_reader(TABLE.as_bytes(), "imgs", &TableColumns::default()).unwrap();
        let stats = dataset.get_stats();

        assert_eq!(stats.total_samples, 5);
        assert_eq!(stats.class_counts.iter().sum::<usize>(), 5);
        assert_eq!(stats.class_names[0], "-1");
        assert_eq!(stats.class_counts[0], 2);
    }

    #[test]
    fn test_truncate_keeps_encoder() {
        let mut dataset =
            BeeDataset::from_reader(TABLE.as_bytes(), "imgs", &TableColumns::default()).unwrap();
        dataset.truncate_random(2, 42);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.num_classes(), 3);
        assert!(dataset.samples[0].id < dataset.samples[1].id);
    }
}
