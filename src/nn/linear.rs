//! Linear projection layer

use super::sine_fill;
use crate::io::ParamTensor;
use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayD, Ix2};
use std::collections::BTreeMap;

/// Fully connected projection over `[batch, features]` activations.
#[derive(Debug)]
pub struct Linear {
    /// Weights, `[out_features, in_features]`
    pub weight: Array2<f32>,
    /// Per-output bias
    pub bias: Array1<f32>,
}

impl Linear {
    /// Create a projection with deterministic sine-sweep weights and zero
    /// bias.
    pub fn new(in_features: usize, out_features: usize, phase: f32) -> Self {
        let data = sine_fill(out_features * in_features, in_features, out_features, phase);
        let weight = Array2::from_shape_vec((out_features, in_features), data)
            .expect("weight length matches its shape");
        Self {
            weight,
            bias: Array1::zeros(out_features),
        }
    }

    /// Build from checkpoint parameters `{prefix}.weight` and
    /// `{prefix}.bias`.
    pub fn from_params(params: &BTreeMap<String, ParamTensor>, prefix: &str) -> Option<Self> {
        let weight = params.get(&format!("{prefix}.weight"))?.to_array2()?;
        let bias = params.get(&format!("{prefix}.bias"))?.to_array1()?;
        if bias.len() != weight.dim().0 {
            return None;
        }
        Some(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.dim().1
    }

    pub fn out_features(&self) -> usize {
        self.weight.dim().0
    }

    /// Forward pass: `[n, in] @ weightᵀ + bias = [n, out]`.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input = input
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| {
                Error::InvalidShape(format!(
                    "linear projection expects a 2-axis activation, got {} axes",
                    input.ndim()
                ))
            })?;
        if input.dim().1 != self.in_features() {
            return Err(Error::InvalidShape(format!(
                "linear projection expects {} input features, got {}",
                self.in_features(),
                input.dim().1
            )));
        }
        let output = input.dot(&self.weight.t()) + &self.bias;
        Ok(output.into_dyn())
    }

    /// Named parameters under `prefix`, in checkpoint form.
    pub fn params(&self, prefix: &str) -> Vec<(String, ParamTensor)> {
        vec![
            (format!("{prefix}.weight"), ParamTensor::from_array(&self.weight)),
            (format!("{prefix}.bias"), ParamTensor::from_array(&self.bias)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_projection() {
        let mut linear = Linear::new(2, 2, 0.1);
        // weight = [[1, 2], [3, 4]], bias = [10, 20]
        linear.weight = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        linear.bias = Array1::from_vec(vec![10.0, 20.0]);
        let input = Array2::from_shape_vec((1, 2), vec![1.0, 1.0]).unwrap().into_dyn();
        let output = linear.forward(&input).unwrap();
        assert_relative_eq!(output[[0, 0]], 13.0);
        assert_relative_eq!(output[[0, 1]], 27.0);
    }

    #[test]
    fn test_output_shape() {
        let linear = Linear::new(8, 3, 0.2);
        let input = Array2::<f32>::zeros((5, 8)).into_dyn();
        let output = linear.forward(&input).unwrap();
        assert_eq!(output.shape(), &[5, 3]);
    }

    #[test]
    fn test_rejects_wrong_rank_and_features() {
        let linear = Linear::new(8, 3, 0.2);
        let cube = ndarray::Array3::<f32>::zeros((2, 2, 2)).into_dyn();
        assert!(linear.forward(&cube).is_err());
        let narrow = Array2::<f32>::zeros((5, 4)).into_dyn();
        assert!(linear.forward(&narrow).is_err());
    }

    #[test]
    fn test_params_roundtrip() {
        let linear = Linear::new(6, 4, 0.3);
        let params: BTreeMap<String, ParamTensor> =
            linear.params("classifier").into_iter().collect();
        let restored = Linear::from_params(&params, "classifier").unwrap();
        assert_eq!(restored.weight, linear.weight);
        assert_eq!(restored.bias, linear.bias);
    }
}
