//! Network architecture configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Describes a small image-classification CNN: a stack of
/// conv → batchnorm → relu → avgpool blocks followed by flatten and a
/// linear classifier. Each block halves the spatial resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Input image channels
    pub in_channels: usize,
    /// Output channels of each block, in order
    pub block_channels: Vec<usize>,
    /// Classifier output size
    pub num_classes: usize,
    /// Input spatial resolution (square images)
    pub image_size: usize,
}

impl NetworkConfig {
    /// Three-block configuration sized for 32×32 three-channel images.
    pub fn cifar_small() -> Self {
        Self {
            in_channels: 3,
            block_channels: vec![16, 32, 64],
            num_classes: 10,
            image_size: 32,
        }
    }

    /// One-block configuration for tests.
    pub fn tiny() -> Self {
        Self {
            in_channels: 3,
            block_channels: vec![4],
            num_classes: 10,
            image_size: 8,
        }
    }

    /// Look up a configuration by preset name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "cifar-small" => Some(Self::cifar_small()),
            "tiny" => Some(Self::tiny()),
            _ => None,
        }
    }

    /// Preset names accepted by [`NetworkConfig::preset`].
    pub fn preset_names() -> &'static [&'static str] {
        &["cifar-small", "tiny"]
    }

    /// Spatial resolution after all blocks (each block halves it).
    pub fn feature_size(&self) -> usize {
        self.image_size >> self.block_channels.len()
    }

    /// Flattened feature count entering the classifier.
    pub fn classifier_inputs(&self) -> usize {
        let last = self.block_channels.last().copied().unwrap_or(0);
        last * self.feature_size() * self.feature_size()
    }

    /// Check that the configuration describes a buildable network.
    pub fn validated(&self) -> Result<()> {
        if self.in_channels == 0 || self.num_classes == 0 || self.image_size == 0 {
            return Err(Error::Config(
                "network dimensions must be non-zero".to_string(),
            ));
        }
        if self.block_channels.is_empty() {
            return Err(Error::Config(
                "network must have at least one block".to_string(),
            ));
        }
        if self.block_channels.contains(&0) {
            return Err(Error::Config(
                "block channel counts must be non-zero".to_string(),
            ));
        }
        // Each block halves the spatial resolution with a 2×2 pool
        let divisor = 1usize << self.block_channels.len();
        if self.image_size % divisor != 0 || self.feature_size() == 0 {
            return Err(Error::Config(format!(
                "image size {} is not divisible into {} pooling stages",
                self.image_size,
                self.block_channels.len()
            )));
        }
        Ok(())
    }
}
