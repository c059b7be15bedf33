//! YAML schema for probe runs

use crate::data::DataConfig;
use crate::nn::Device;
use crate::observe::TapDirection;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

fn default_preset() -> String {
    "cifar-small".to_string()
}

fn default_channel_axis() -> usize {
    1
}

/// Complete probe run specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSpec {
    /// Model configuration
    pub model: ModelSection,

    /// Batch configuration
    #[serde(default = "DataConfig::demo")]
    pub data: DataConfig,

    /// Observation points to instrument
    pub probes: Vec<ProbeSection>,

    /// Optional CSV export path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<PathBuf>,
}

/// Which network to build and where its weights come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    /// Network preset name (see `NetworkConfig::preset_names`)
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Checkpoint to load; deterministic initialization when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PathBuf>,

    /// Execution device, an explicit configuration value
    #[serde(default)]
    pub device: Device,
}

/// One observation point to instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSection {
    /// Canonical layer address
    pub layer: String,

    /// Intercept the layer's input or output
    #[serde(default)]
    pub direction: TapDirection,

    /// Axis carrying the channel/feature dimension
    #[serde(default = "default_channel_axis")]
    pub channel_axis: usize,
}

impl ProbeSpec {
    /// Parse a specification from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "specification file does not exist: {}",
                path.display()
            )));
        }
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))
    }
}
