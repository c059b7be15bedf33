//! Average pooling layer

use crate::{Error, Result};
use ndarray::{Array4, ArrayD, Ix4};

/// Average pooling over `[batch, channel, height, width]` activations with
/// a square window.
#[derive(Debug)]
pub struct AvgPool2d {
    kernel: usize,
    stride: usize,
}

impl AvgPool2d {
    pub fn new(kernel: usize, stride: usize) -> Self {
        Self { kernel, stride }
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    /// Forward pass: `[n, c, h, w]` → `[n, c, oh, ow]`.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input = input
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                Error::InvalidShape(format!(
                    "average pooling expects a 4-axis activation, got {} axes",
                    input.ndim()
                ))
            })?;
        let (batch, channels, height, width) = input.dim();
        if height < self.kernel || width < self.kernel {
            return Err(Error::InvalidShape(format!(
                "spatial extent {height}x{width} is smaller than the {k}x{k} pooling window",
                k = self.kernel
            )));
        }
        let out_h = (height - self.kernel) / self.stride + 1;
        let out_w = (width - self.kernel) / self.stride + 1;
        let window = (self.kernel * self.kernel) as f32;

        let mut output = Array4::<f32>::zeros((batch, channels, out_h, out_w));
        for b in 0..batch {
            for c in 0..channels {
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut acc = 0.0f32;
                        for ky in 0..self.kernel {
                            for kx in 0..self.kernel {
                                acc += input[[b, c, oy * self.stride + ky, ox * self.stride + kx]];
                            }
                        }
                        output[[b, c, oy, ox]] = acc / window;
                    }
                }
            }
        }
        Ok(output.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_2x2_window_averages() {
        let pool = AvgPool2d::new(2, 2);
        let input = Array4::from_shape_vec(
            (1, 1, 2, 2),
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap()
        .into_dyn();
        let output = pool.forward(&input).unwrap();
        assert_eq!(output.shape(), &[1, 1, 1, 1]);
        assert_relative_eq!(output[[0, 0, 0, 0]], 2.5);
    }

    #[test]
    fn test_halves_spatial_extent() {
        let pool = AvgPool2d::new(2, 2);
        let input = Array4::<f32>::zeros((2, 3, 8, 8)).into_dyn();
        let output = pool.forward(&input).unwrap();
        assert_eq!(output.shape(), &[2, 3, 4, 4]);
    }

    #[test]
    fn test_rejects_window_larger_than_input() {
        let pool = AvgPool2d::new(4, 4);
        let input = Array4::<f32>::zeros((1, 1, 2, 2)).into_dyn();
        assert!(pool.forward(&input).is_err());
    }

    #[test]
    fn test_rejects_2d_input() {
        let pool = AvgPool2d::new(2, 2);
        let input = ndarray::Array2::<f32>::zeros((2, 4)).into_dyn();
        assert!(pool.forward(&input).is_err());
    }
}
