//! Batch normalization layer (evaluation mode)

use crate::io::ParamTensor;
use crate::{Error, Result};
use ndarray::{Array1, ArrayD, Ix4};
use std::collections::BTreeMap;

/// Numerical stability constant.
const EPS: f32 = 1e-5;

/// Batch normalization over `[batch, channel, height, width]` activations.
///
/// Inspection runs in evaluation mode only: the layer always applies its
/// stored running statistics and never updates them:
/// `y = gamma * (x - running_mean) / sqrt(running_var + eps) + beta`,
/// broadcast per channel.
#[derive(Debug)]
pub struct BatchNorm2d {
    /// Learned scale, one per channel
    pub gamma: Array1<f32>,
    /// Learned shift, one per channel
    pub beta: Array1<f32>,
    /// Running mean accumulated during training
    pub running_mean: Array1<f32>,
    /// Running variance accumulated during training
    pub running_var: Array1<f32>,
    eps: f32,
}

impl BatchNorm2d {
    /// Create an identity normalization: unit scale, zero shift, zero mean,
    /// unit variance.
    pub fn new(channels: usize) -> Self {
        Self {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
            running_mean: Array1::zeros(channels),
            running_var: Array1::ones(channels),
            eps: EPS,
        }
    }

    /// Build from checkpoint parameters `{prefix}.gamma`, `{prefix}.beta`,
    /// `{prefix}.running_mean` and `{prefix}.running_var`. Returns `None`
    /// when any is missing or the lengths disagree.
    pub fn from_params(params: &BTreeMap<String, ParamTensor>, prefix: &str) -> Option<Self> {
        let gamma = params.get(&format!("{prefix}.gamma"))?.to_array1()?;
        let beta = params.get(&format!("{prefix}.beta"))?.to_array1()?;
        let running_mean = params.get(&format!("{prefix}.running_mean"))?.to_array1()?;
        let running_var = params.get(&format!("{prefix}.running_var"))?.to_array1()?;
        let channels = gamma.len();
        if beta.len() != channels || running_mean.len() != channels || running_var.len() != channels
        {
            return None;
        }
        Some(Self {
            gamma,
            beta,
            running_mean,
            running_var,
            eps: EPS,
        })
    }

    pub fn channels(&self) -> usize {
        self.gamma.len()
    }

    /// Forward pass: normalize each channel with its running statistics.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input = input
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                Error::InvalidShape(format!(
                    "batch norm expects a 4-axis activation, got {} axes",
                    input.ndim()
                ))
            })?;
        let (_, channels, _, _) = input.dim();
        if channels != self.channels() {
            return Err(Error::InvalidShape(format!(
                "batch norm expects {} channels, got {channels}",
                self.channels()
            )));
        }

        let mut output = input.to_owned();
        for c in 0..channels {
            let inv_std = 1.0 / (self.running_var[c] + self.eps).sqrt();
            let mean = self.running_mean[c];
            let gamma = self.gamma[c];
            let beta = self.beta[c];
            output
                .index_axis_mut(ndarray::Axis(1), c)
                .mapv_inplace(|v| gamma * (v - mean) * inv_std + beta);
        }
        Ok(output.into_dyn())
    }

    /// Named parameters under `prefix`, in checkpoint form.
    pub fn params(&self, prefix: &str) -> Vec<(String, ParamTensor)> {
        vec![
            (format!("{prefix}.gamma"), ParamTensor::from_array(&self.gamma)),
            (format!("{prefix}.beta"), ParamTensor::from_array(&self.beta)),
            (
                format!("{prefix}.running_mean"),
                ParamTensor::from_array(&self.running_mean),
            ),
            (
                format!("{prefix}.running_var"),
                ParamTensor::from_array(&self.running_var),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array4;

    #[test]
    fn test_identity_statistics_pass_through() {
        let bn = BatchNorm2d::new(2);
        let input = Array4::from_shape_vec(
            (1, 2, 1, 2),
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap()
        .into_dyn();
        let output = bn.forward(&input).unwrap();
        for (a, b) in output.iter().zip(input.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_normalizes_with_running_statistics() {
        let mut bn = BatchNorm2d::new(1);
        bn.running_mean[0] = 2.0;
        bn.running_var[0] = 4.0;
        let input = Array4::from_elem((1, 1, 1, 1), 6.0f32).into_dyn();
        let output = bn.forward(&input).unwrap();
        // (6 - 2) / sqrt(4 + eps) ≈ 2
        assert_relative_eq!(output[[0, 0, 0, 0]], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_gamma_beta_affine() {
        let mut bn = BatchNorm2d::new(1);
        bn.gamma[0] = 3.0;
        bn.beta[0] = 1.0;
        let input = Array4::from_elem((1, 1, 1, 1), 2.0f32).into_dyn();
        let output = bn.forward(&input).unwrap();
        // 3 * 2 / sqrt(1 + eps) + 1 ≈ 7
        assert_relative_eq!(output[[0, 0, 0, 0]], 7.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_channel_mismatch() {
        let bn = BatchNorm2d::new(3);
        let input = Array4::<f32>::zeros((1, 2, 4, 4)).into_dyn();
        assert!(bn.forward(&input).is_err());
    }

    #[test]
    fn test_rejects_2d_input() {
        let bn = BatchNorm2d::new(3);
        let input = ndarray::Array2::<f32>::zeros((2, 3)).into_dyn();
        assert!(bn.forward(&input).is_err());
    }

    #[test]
    fn test_params_roundtrip() {
        let mut bn = BatchNorm2d::new(4);
        bn.running_mean[1] = 0.25;
        let params: BTreeMap<String, ParamTensor> = bn.params("block0.bn").into_iter().collect();
        let restored = BatchNorm2d::from_params(&params, "block0.bn").unwrap();
        assert_eq!(restored.running_mean, bn.running_mean);
        assert_eq!(restored.channels(), 4);
    }

    #[test]
    fn test_from_params_rejects_length_mismatch() {
        let bn = BatchNorm2d::new(4);
        let mut params: BTreeMap<String, ParamTensor> = bn.params("bn").into_iter().collect();
        params.insert(
            "bn.beta".to_string(),
            ParamTensor {
                shape: vec![2],
                data: vec![0.0, 0.0],
            },
        );
        assert!(BatchNorm2d::from_params(&params, "bn").is_none());
    }
}
