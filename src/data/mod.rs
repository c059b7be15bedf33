//! Fixed-shape batch source
//!
//! Inspection runs over one fixed batch: no shuffling, no augmentation, no
//! iteration. The batch either comes from a serialized file or is
//! synthesized (a deterministic gradient fill, or seeded noise), and is
//! optionally normalized per the usual `(x - mean) / std` image transform.

use crate::{Error, Result};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// How the batch values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFill {
    /// Deterministic smooth gradient over batch/channel/row/column
    #[default]
    Gradient,
    /// Seeded uniform noise in [0, 1)
    Noise,
}

/// Per-channel normalization applied after filling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: f32,
    pub std: f32,
}

fn default_seed() -> u64 {
    42
}

/// Describes the fixed batch an inspection run evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Synthetic fill, used when no file is given
    #[serde(default)]
    pub fill: BatchFill,
    /// Load the batch from a serialized file instead of synthesizing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Number of images in the batch
    pub batch_size: usize,
    /// Image channels
    pub channels: usize,
    /// Image height
    pub height: usize,
    /// Image width
    pub width: usize,
    /// Optional normalization transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<Normalize>,
    /// Seed for the noise fill
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl DataConfig {
    /// The demonstration batch: 227 three-channel 32×32 images normalized
    /// with mean 0.5 and std 0.5.
    pub fn demo() -> Self {
        Self {
            fill: BatchFill::Gradient,
            file: None,
            batch_size: 227,
            channels: 3,
            height: 32,
            width: 32,
            normalize: Some(Normalize {
                mean: 0.5,
                std: 0.5,
            }),
            seed: default_seed(),
        }
    }
}

/// A fixed batch of images plus labels. Labels are carried for
/// completeness; the inspection core never reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `[batch, channel, height, width]`
    pub images: Array4<f32>,
    pub labels: Vec<u32>,
}

impl Batch {
    /// Number of images in the batch.
    pub fn len(&self) -> usize {
        self.images.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialized batch file layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoredBatch {
    shape: Vec<usize>,
    data: Vec<f32>,
    labels: Vec<u32>,
}

/// Produce the fixed batch described by `config`.
///
/// # Errors
///
/// Returns [`Error::Config`] for zero batch dimensions or a file whose
/// shape disagrees with the configuration, [`Error::Serialization`] for
/// malformed files, and propagates I/O failures.
pub fn load_batch(config: &DataConfig) -> Result<Batch> {
    if config.batch_size == 0 || config.channels == 0 || config.height == 0 || config.width == 0 {
        return Err(Error::Config(
            "batch dimensions must be non-zero".to_string(),
        ));
    }
    if let Some(n) = &config.normalize {
        if n.std == 0.0 {
            return Err(Error::Config(
                "normalization std must be non-zero".to_string(),
            ));
        }
    }

    let mut batch = match &config.file {
        Some(path) => read_batch_file(config, path)?,
        None => synthesize(config),
    };

    if let Some(n) = &config.normalize {
        batch.images.mapv_inplace(|v| (v - n.mean) / n.std);
    }
    Ok(batch)
}

fn synthesize(config: &DataConfig) -> Batch {
    let shape = (config.batch_size, config.channels, config.height, config.width);
    let images = match config.fill {
        BatchFill::Gradient => Array4::from_shape_fn(shape, |(b, c, y, x)| {
            let phase = (b * 31 + c * 17 + y * 5 + x) as f32;
            (phase * 0.113).sin() * 0.5 + 0.5
        }),
        BatchFill::Noise => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            Array4::from_shape_fn(shape, |_| rng.gen::<f32>())
        }
    };
    let labels = (0..config.batch_size).map(|i| (i % 10) as u32).collect();
    Batch { images, labels }
}

fn read_batch_file(config: &DataConfig, path: &PathBuf) -> Result<Batch> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "batch file does not exist: {}",
            path.display()
        )));
    }
    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;
    let stored: StoredBatch = serde_json::from_str(&content)
        .map_err(|e| Error::Serialization(format!("batch deserialization failed: {e}")))?;

    let expected = vec![config.batch_size, config.channels, config.height, config.width];
    if stored.shape != expected {
        return Err(Error::Config(format!(
            "batch file shape {:?} does not match the configured {:?}",
            stored.shape, expected
        )));
    }
    if stored.labels.len() != config.batch_size {
        return Err(Error::Config(format!(
            "batch file has {} labels for {} images",
            stored.labels.len(),
            config.batch_size
        )));
    }
    let images = Array4::from_shape_vec(
        (config.batch_size, config.channels, config.height, config.width),
        stored.data,
    )
    .map_err(|e| Error::Serialization(format!("batch values do not fill the shape: {e}")))?;
    Ok(Batch {
        images,
        labels: stored.labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn small_config() -> DataConfig {
        DataConfig {
            fill: BatchFill::Gradient,
            file: None,
            batch_size: 4,
            channels: 3,
            height: 8,
            width: 8,
            normalize: None,
            seed: 7,
        }
    }

    #[test]
    fn test_gradient_fill_is_deterministic() {
        let config = small_config();
        let a = load_batch(&config).unwrap();
        let b = load_batch(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.images.dim(), (4, 3, 8, 8));
        assert_eq!(a.labels.len(), 4);
    }

    #[test]
    fn test_gradient_fill_is_in_unit_range() {
        let batch = load_batch(&small_config()).unwrap();
        assert!(batch.images.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_noise_fill_respects_seed() {
        let config = DataConfig {
            fill: BatchFill::Noise,
            ..small_config()
        };
        let a = load_batch(&config).unwrap();
        let b = load_batch(&config).unwrap();
        assert_eq!(a, b);

        let other_seed = DataConfig {
            seed: 8,
            ..config
        };
        let c = load_batch(&other_seed).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_normalization_recenters() {
        let config = DataConfig {
            normalize: Some(Normalize {
                mean: 0.5,
                std: 0.5,
            }),
            ..small_config()
        };
        let batch = load_batch(&config).unwrap();
        // Gradient fill lives in [0, 1]; normalized values live in [-1, 1]
        assert!(batch.images.iter().all(|&v| (-1.0..=1.0).contains(&v)));
        assert!(batch.images.iter().any(|&v| v < 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = DataConfig {
            batch_size: 0,
            ..small_config()
        };
        assert!(matches!(load_batch(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_std_rejected() {
        let config = DataConfig {
            normalize: Some(Normalize {
                mean: 0.5,
                std: 0.0,
            }),
            ..small_config()
        };
        assert!(matches!(load_batch(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        let stored = StoredBatch {
            shape: vec![1, 1, 2, 2],
            data: vec![0.1, 0.2, 0.3, 0.4],
            labels: vec![3],
        };
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let config = DataConfig {
            file: Some(path),
            batch_size: 1,
            channels: 1,
            height: 2,
            width: 2,
            ..small_config()
        };
        let batch = load_batch(&config).unwrap();
        assert_eq!(batch.labels, vec![3]);
        assert_relative_eq!(batch.images[[0, 0, 0, 1]], 0.2);
    }

    #[test]
    fn test_file_shape_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        let stored = StoredBatch {
            shape: vec![1, 1, 2, 2],
            data: vec![0.0; 4],
            labels: vec![0],
        };
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let config = DataConfig {
            file: Some(path),
            batch_size: 2,
            channels: 1,
            height: 2,
            width: 2,
            ..small_config()
        };
        assert!(matches!(load_batch(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_demo_matches_reference_run() {
        let config = DataConfig::demo();
        assert_eq!(config.batch_size, 227);
        assert_eq!(config.channels, 3);
    }
}
