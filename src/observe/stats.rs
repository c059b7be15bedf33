//! Per-channel activation statistics
//!
//! The collector reduces an N-dimensional activation along every axis except
//! the designated channel axis, producing one summary per channel index.
//! Aggregates are accumulated in f64 regardless of the f32 element type.

use crate::{Error, Result};
use ndarray::{ArrayD, Axis};
use serde::Serialize;

/// Summary statistics for one channel (or feature) slice of an activation.
///
/// Variance is the population variance (the mean of squared deviations,
/// with no Bessel correction), matching what a plain `var()` over the
/// captured values reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    /// Index along the channel axis
    pub index: usize,
    /// Arithmetic mean of all values in the slice
    pub mean: f64,
    /// Population variance of all values in the slice
    pub variance: f64,
    /// Largest value in the slice
    pub max: f64,
    /// Smallest value in the slice
    pub min: f64,
}

/// Compute per-channel statistics of an activation.
///
/// For each index along `channel_axis`, the sub-array obtained by fixing
/// that index is flattened into one value population and reduced to
/// {mean, variance, max, min}. Reports are ordered by ascending index.
///
/// Activations are laid out `[batch, channel, ...spatial]`, so the channel
/// axis is almost always axis 1: a 4-D convolutional output reduces over
/// batch and both spatial axes, and a 2-D linear input reduces over the
/// batch axis only. Both ranks share this code path. Passing the wrong
/// axis on a valid-rank array is *not* detected; the statistics are
/// simply computed over the wrong dimension.
///
/// # Errors
///
/// Returns [`Error::InvalidShape`] when the activation has fewer than two
/// axes, when `channel_axis` is out of bounds, or when a channel slice has
/// an empty value population (a zero-size spatial extent would otherwise
/// silently yield NaN).
pub fn compute_statistics(
    activation: &ArrayD<f32>,
    channel_axis: usize,
) -> Result<Vec<ChannelStats>> {
    let ndim = activation.ndim();
    if ndim < 2 {
        return Err(Error::InvalidShape(format!(
            "activation must have at least 2 axes, got {ndim}"
        )));
    }
    if channel_axis >= ndim {
        return Err(Error::InvalidShape(format!(
            "channel axis {channel_axis} is out of bounds for a {ndim}-axis activation"
        )));
    }

    let channels = activation.len_of(Axis(channel_axis));
    let mut reports = Vec::with_capacity(channels);

    for index in 0..channels {
        let slice = activation.index_axis(Axis(channel_axis), index);
        let population = slice.len();
        if population == 0 {
            return Err(Error::InvalidShape(format!(
                "channel {index} has an empty value population"
            )));
        }

        let mut sum = 0.0f64;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for &value in slice.iter() {
            let value = f64::from(value);
            sum += value;
            if value > max {
                max = value;
            }
            if value < min {
                min = value;
            }
        }
        let mean = sum / population as f64;

        // Second pass: mean of squared deviations (population variance)
        let squared_deviations: f64 = slice
            .iter()
            .map(|&value| {
                let deviation = f64::from(value) - mean;
                deviation * deviation
            })
            .sum();
        let variance = squared_deviations / population as f64;

        reports.push(ChannelStats {
            index,
            mean,
            variance,
            max,
            min,
        });
    }

    Ok(reports)
}
