//! Burn Dataset Integration for the bee images
//!
//! This module implements Burn's Dataset trait and Batcher. Images are read
//! from disk on every access (no caching), resized, converted to RGB and
//! normalized with the per-channel ImageNet constants.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tracing::warn;

use crate::dataset::loader::BeeSample;
use crate::dataset::{NORMALIZE_MEAN, NORMALIZE_STD};
use crate::utils::error::{BeeError, Result};

/// A single preprocessed bee image ready for Burn
#[derive(Clone, Debug)]
pub struct BeeItem {
    /// Normalized image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Class index
    pub label: usize,
}

impl BeeItem {
    /// Load and preprocess the image at `path`
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| BeeError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .with_guessed_format()
            .map_err(|e| BeeError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| BeeError::ImageLoad(path.to_path_buf(), e.to_string()))?;

        Ok(Self {
            image: preprocess_image(&img, image_size),
            label,
        })
    }
}

/// Resize to `image_size` x `image_size`, force RGB and normalize to CHW floats
pub fn preprocess_image(img: &DynamicImage, image_size: usize) -> Vec<f32> {
    let rgb = img
        .resize_exact(image_size as u32, image_size as u32, FilterType::CatmullRom)
        .to_rgb8();

    let plane = image_size * image_size;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * image_size + x as usize;
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            data[c * plane + offset] = (value - NORMALIZE_MEAN[c]) / NORMALIZE_STD[c];
        }
    }

    data
}

/// Bee image dataset implementing Burn's Dataset trait
///
/// Images are loaded lazily on every access.
#[derive(Debug, Clone)]
pub struct BeeImageDataset {
    samples: Vec<BeeSample>,
    image_size: usize,
}

impl BeeImageDataset {
    /// Create a new dataset over the given samples
    pub fn new(samples: Vec<BeeSample>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
        }
    }

    /// Load a single item, failing if its image is missing or unreadable
    pub fn load_item(&self, index: usize) -> Result<BeeItem> {
        let sample = self.samples.get(index).ok_or_else(|| {
            BeeError::Dataset(format!(
                "index {} out of range for dataset of {} samples",
                index,
                self.samples.len()
            ))
        })?;
        BeeItem::from_path(&sample.path, sample.label, self.image_size)
    }

    /// Load the items at `indices`, stopping at the first failure
    pub fn load_items(&self, indices: &[usize]) -> Result<Vec<BeeItem>> {
        indices.iter().map(|&i| self.load_item(i)).collect()
    }
}

impl Dataset<BeeItem> for BeeImageDataset {
    fn get(&self, index: usize) -> Option<BeeItem> {
        if index >= self.samples.len() {
            return None;
        }

        match self.load_item(index) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of bee images
#[derive(Clone, Debug)]
pub struct BeeBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking preprocessed items into tensors
#[derive(Clone, Debug)]
pub struct BeeBatcher {
    image_size: usize,
}

impl BeeBatcher {
    /// Create a batcher for images of the given side length
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, BeeItem, BeeBatch<B>> for BeeBatcher {
    fn batch(&self, items: Vec<BeeItem>, device: &B::Device) -> BeeBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, size, size]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        BeeBatch { images, targets }
    }
}
