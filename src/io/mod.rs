//! Checkpoint serialization
//!
//! A checkpoint is metadata plus a flat map of named parameter tensors,
//! stored as JSON or YAML (detected from the file extension). Parameter
//! names use the canonical dotted addressing scheme; checkpoints written
//! from a multi-device replicated training run carry a `replica.` prefix on
//! every key, which [`load_checkpoint`] strips so that downstream code sees
//! one addressing scheme regardless of how the model was trained.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Array4, Dimension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Key prefix added by the multi-device replication wrapper.
pub const REPLICA_PREFIX: &str = "replica.";

/// Checkpoint description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Model name/identifier
    pub name: String,
    /// Architecture tag (e.g. "cnn")
    pub architecture: String,
    /// Writing crate version
    pub version: String,
    /// When the checkpoint was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CheckpointMetadata {
    /// Metadata with no timestamp.
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: None,
        }
    }

    /// Metadata stamped with the current time.
    pub fn stamped(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            created_at: Some(Utc::now()),
            ..Self::new(name, architecture)
        }
    }
}

/// A stored parameter: shape plus row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamTensor {
    /// Axis lengths
    pub shape: Vec<usize>,
    /// Row-major element values
    pub data: Vec<f32>,
}

impl ParamTensor {
    /// Capture an ndarray array of any rank.
    pub fn from_array<D: Dimension>(array: &ndarray::Array<f32, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.data.len()
    }

    /// View as a 1-D array, if the stored shape is 1-D and consistent.
    pub fn to_array1(&self) -> Option<Array1<f32>> {
        if self.shape.len() != 1 || !self.consistent() {
            return None;
        }
        Some(Array1::from_vec(self.data.clone()))
    }

    /// View as a 2-D array, if the stored shape is 2-D and consistent.
    pub fn to_array2(&self) -> Option<Array2<f32>> {
        if self.shape.len() != 2 || !self.consistent() {
            return None;
        }
        Array2::from_shape_vec((self.shape[0], self.shape[1]), self.data.clone()).ok()
    }

    /// View as a 4-D array, if the stored shape is 4-D and consistent.
    pub fn to_array4(&self) -> Option<Array4<f32>> {
        if self.shape.len() != 4 || !self.consistent() {
            return None;
        }
        Array4::from_shape_vec(
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]),
            self.data.clone(),
        )
        .ok()
    }
}

/// A loaded checkpoint: metadata plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub metadata: CheckpointMetadata,
    /// Parameters keyed by canonical dotted name
    pub parameters: BTreeMap<String, ParamTensor>,
}

impl CheckpointState {
    /// Rewrite replica-prefixed keys to canonical names.
    ///
    /// Applied once at load time; address resolution everywhere downstream
    /// is independent of the replication wrapper.
    pub fn canonicalize(mut self) -> Self {
        let needs_rewrite = self
            .parameters
            .keys()
            .any(|key| key.starts_with(REPLICA_PREFIX));
        if !needs_rewrite {
            return self;
        }
        let mut canonical = BTreeMap::new();
        for (key, tensor) in std::mem::take(&mut self.parameters) {
            let name = key
                .strip_prefix(REPLICA_PREFIX)
                .map_or(key.clone(), str::to_string);
            canonical.insert(name, tensor);
        }
        self.parameters = canonical;
        self
    }

    /// Total number of stored parameter values.
    pub fn parameter_count(&self) -> usize {
        self.parameters.values().map(ParamTensor::len).sum()
    }
}

/// Checkpoint file format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    Json,
    Yaml,
}

impl CheckpointFormat {
    /// Map a file extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

fn detect_format(path: &Path) -> Result<CheckpointFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("checkpoint file has no extension".to_string()))?;
    CheckpointFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("unsupported checkpoint extension: {ext}")))
}

/// Load a checkpoint, canonicalizing parameter addresses.
///
/// # Errors
///
/// Returns [`Error::Config`] when the file does not exist, and
/// [`Error::Serialization`] for an unknown extension or malformed content.
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<CheckpointState> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Config(format!(
            "checkpoint path does not exist: {}",
            path.display()
        )));
    }
    let format = detect_format(path)?;

    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;

    let state: CheckpointState = match format {
        CheckpointFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?,
        CheckpointFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?,
    };

    Ok(state.canonicalize())
}

/// Write a checkpoint in the format matching the path's extension.
pub fn save_checkpoint(state: &CheckpointState, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = detect_format(path)?;

    let data = match format {
        CheckpointFormat::Json => serde_json::to_string(state)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        CheckpointFormat::Yaml => serde_yaml::to_string(state)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
    };

    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_state() -> CheckpointState {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "block0.conv.weight".to_string(),
            ParamTensor {
                shape: vec![1, 1, 1, 1],
                data: vec![0.5],
            },
        );
        parameters.insert(
            "block0.conv.bias".to_string(),
            ParamTensor {
                shape: vec![1],
                data: vec![0.0],
            },
        );
        CheckpointState {
            metadata: CheckpointMetadata::new("sample", "cnn"),
            parameters,
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ckpt.json");
        let state = sample_state();
        save_checkpoint(&state, &path).unwrap();
        let restored = load_checkpoint(&path).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ckpt.yaml");
        let state = sample_state();
        save_checkpoint(&state, &path).unwrap();
        let restored = load_checkpoint(&path).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_replica_prefix_is_stripped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replicated.json");

        let mut state = sample_state();
        let prefixed: BTreeMap<String, ParamTensor> = std::mem::take(&mut state.parameters)
            .into_iter()
            .map(|(k, v)| (format!("{REPLICA_PREFIX}{k}"), v))
            .collect();
        state.parameters = prefixed;
        save_checkpoint(&state, &path).unwrap();

        let restored = load_checkpoint(&path).unwrap();
        assert!(restored.parameters.contains_key("block0.conv.weight"));
        assert!(restored
            .parameters
            .keys()
            .all(|k| !k.starts_with(REPLICA_PREFIX)));
    }

    #[test]
    fn test_canonicalize_is_noop_for_canonical_keys() {
        let state = sample_state();
        let canonical = state.clone().canonicalize();
        assert_eq!(canonical, state);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_checkpoint("/nonexistent/ckpt.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ckpt.bin");
        std::fs::write(&path, b"junk").unwrap();
        let err = load_checkpoint(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_malformed_content_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ckpt.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = load_checkpoint(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_param_tensor_shape_consistency() {
        let bad = ParamTensor {
            shape: vec![2, 2],
            data: vec![1.0, 2.0, 3.0],
        };
        assert!(bad.to_array2().is_none());

        let good = ParamTensor {
            shape: vec![2, 2],
            data: vec![1.0, 2.0, 3.0, 4.0],
        };
        assert_eq!(good.to_array2().unwrap().dim(), (2, 2));
        assert!(good.to_array1().is_none());
        assert!(good.to_array4().is_none());
    }

    #[test]
    fn test_parameter_count() {
        assert_eq!(sample_state().parameter_count(), 2);
    }
}
