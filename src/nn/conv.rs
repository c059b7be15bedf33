//! 2-D convolution layer

use super::sine_fill;
use crate::io::ParamTensor;
use crate::{Error, Result};
use ndarray::{Array1, Array4, ArrayD, Ix4};
use std::collections::BTreeMap;

/// 2-D convolution over `[batch, channel, height, width]` activations with
/// zero padding and a square kernel.
#[derive(Debug)]
pub struct Conv2d {
    /// Kernel weights, `[out_channels, in_channels, kernel, kernel]`
    pub weight: Array4<f32>,
    /// Per-output-channel bias
    pub bias: Array1<f32>,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    /// Create a convolution with deterministic sine-sweep weights and zero
    /// bias.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        phase: f32,
    ) -> Self {
        let fan_in = in_channels * kernel * kernel;
        let fan_out = out_channels * kernel * kernel;
        let data = sine_fill(out_channels * in_channels * kernel * kernel, fan_in, fan_out, phase);
        let weight =
            Array4::from_shape_vec((out_channels, in_channels, kernel, kernel), data)
                .expect("weight length matches its shape");
        Self {
            weight,
            bias: Array1::zeros(out_channels),
            stride,
            padding,
        }
    }

    /// Build from checkpoint parameters `{prefix}.weight` and
    /// `{prefix}.bias`. Returns `None` when either is missing or has a
    /// shape that is not a 4-D kernel with a matching bias.
    pub fn from_params(
        params: &BTreeMap<String, ParamTensor>,
        prefix: &str,
        stride: usize,
        padding: usize,
    ) -> Option<Self> {
        let weight = params.get(&format!("{prefix}.weight"))?.to_array4()?;
        let bias = params.get(&format!("{prefix}.bias"))?.to_array1()?;
        if bias.len() != weight.dim().0 || weight.dim().2 != weight.dim().3 {
            return None;
        }
        Some(Self {
            weight,
            bias,
            stride,
            padding,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    pub fn kernel(&self) -> usize {
        self.weight.dim().2
    }

    /// Forward pass: `[n, in, h, w]` → `[n, out, oh, ow]`.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input = input
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                Error::InvalidShape(format!(
                    "convolution expects a 4-axis activation, got {} axes",
                    input.ndim()
                ))
            })?;
        let (batch, in_channels, height, width) = input.dim();
        if in_channels != self.in_channels() {
            return Err(Error::InvalidShape(format!(
                "convolution expects {} input channels, got {in_channels}",
                self.in_channels()
            )));
        }

        let kernel = self.kernel();
        let padded_h = height + 2 * self.padding;
        let padded_w = width + 2 * self.padding;
        if padded_h < kernel || padded_w < kernel {
            return Err(Error::InvalidShape(format!(
                "spatial extent {height}x{width} is smaller than the {kernel}x{kernel} kernel"
            )));
        }
        let out_h = (padded_h - kernel) / self.stride + 1;
        let out_w = (padded_w - kernel) / self.stride + 1;

        let mut output = Array4::<f32>::zeros((batch, self.out_channels(), out_h, out_w));
        let pad = self.padding as isize;
        for b in 0..batch {
            for oc in 0..self.out_channels() {
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut acc = self.bias[oc];
                        for ic in 0..in_channels {
                            for ky in 0..kernel {
                                for kx in 0..kernel {
                                    let iy = (oy * self.stride + ky) as isize - pad;
                                    let ix = (ox * self.stride + kx) as isize - pad;
                                    if iy >= 0
                                        && ix >= 0
                                        && (iy as usize) < height
                                        && (ix as usize) < width
                                    {
                                        acc += input[[b, ic, iy as usize, ix as usize]]
                                            * self.weight[[oc, ic, ky, kx]];
                                    }
                                }
                            }
                        }
                        output[[b, oc, oy, ox]] = acc;
                    }
                }
            }
        }
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
