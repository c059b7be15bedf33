//! Evaluation-mode network collaborator
//!
//! A [`Network`] is an ordered composition of named layers with a canonical
//! dotted addressing scheme (`block0.conv`, `classifier`, …). It is loaded
//! once, holds no gradient state, and is immutable during inspection: the
//! only operations are forward evaluation and address resolution.

mod config;
mod conv;
mod linear;
mod network;
mod norm;
mod pool;

pub use config::NetworkConfig;
pub use conv::Conv2d;
pub use linear::Linear;
pub use network::{Layer, NamedLayer, Network};
pub use norm::BatchNorm2d;
pub use pool::AvgPool2d;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Execution device, passed explicitly to the network constructor.
///
/// Device selection is a configuration value, never inferred from the
/// process environment. This build executes on the CPU; requesting `cuda`
/// is a configuration error rather than a silent fallback, because on an
/// accelerator the captured activations would need an explicit host
/// transfer before reduction and this build provides none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Host execution
    #[default]
    Cpu,
    /// Accelerator execution (unavailable in this build)
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

pub(crate) fn check_device(device: Device) -> Result<()> {
    match device {
        Device::Cpu => Ok(()),
        Device::Cuda => Err(Error::Config(
            "device `cuda` requested but this build executes on cpu only".to_string(),
        )),
    }
}

/// Deterministic weight fill: a sine sweep scaled by Xavier fan-in/fan-out.
pub(crate) fn sine_fill(len: usize, fan_in: usize, fan_out: usize, phase: f32) -> Vec<f32> {
    let scale = (2.0 / (fan_in + fan_out) as f32).sqrt();
    (0..len).map(|i| (i as f32 * phase).sin() * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuda_is_rejected() {
        assert!(check_device(Device::Cpu).is_ok());
        let err = check_device(Device::Cuda).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_device_serde_lowercase() {
        let yaml = serde_yaml::to_string(&Device::Cpu).unwrap();
        assert_eq!(yaml.trim(), "cpu");
        let device: Device = serde_yaml::from_str("cuda").unwrap();
        assert_eq!(device, Device::Cuda);
    }

    #[test]
    fn test_sine_fill_is_deterministic_and_bounded() {
        let a = sine_fill(64, 16, 16, 0.123);
        let b = sine_fill(64, 16, 16, 0.123);
        assert_eq!(a, b);
        let scale = (2.0f32 / 32.0).sqrt();
        assert!(a.iter().all(|v| v.abs() <= scale));
    }
}
