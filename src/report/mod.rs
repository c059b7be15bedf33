//! Probe reports: rendering and tabular export
//!
//! A [`ProbeReport`] is the read-only result of one (observation point,
//! evaluation) pair. Rendering produces the per-channel lines the tool
//! prints; [`export_csv`] writes all reports of a run into one tabular
//! file, and is only called after the evaluation completed, so a failed run
//! leaves no partial file behind.

use crate::observe::{compute_statistics, ChannelStats, ObservationPoint};
use crate::Result;
use ndarray::ArrayD;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::Path;

/// Per-channel statistics captured at one observation point during one
/// forward evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    /// Where the activation was intercepted
    pub point: ObservationPoint,
    /// Shape of the intercepted activation
    pub shape: Vec<usize>,
    /// One entry per channel index, ascending
    pub channels: Vec<ChannelStats>,
}

impl ProbeReport {
    /// Reduce a captured activation into a report.
    pub fn from_activation(
        point: ObservationPoint,
        activation: &ArrayD<f32>,
        channel_axis: usize,
    ) -> Result<Self> {
        let channels = compute_statistics(activation, channel_axis)?;
        Ok(Self {
            point,
            shape: activation.shape().to_vec(),
            channels,
        })
    }
}

/// Render a report as the per-channel lines the tool prints.
pub fn render(report: &ProbeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: shape {:?}, {} channels",
        report.point,
        report.shape,
        report.channels.len()
    );
    for stats in &report.channels {
        let _ = writeln!(
            out,
            "  channel {:>3}  max {:.4}  min {:.4}  mean {:.4}  variance {:.4}",
            stats.index, stats.max, stats.min, stats.mean, stats.variance
        );
    }
    out
}

/// Write every report of a run into one CSV file.
pub fn export_csv(reports: &[ProbeReport], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::from("layer,direction,channel,mean,variance,min,max\n");
    for report in reports {
        for stats in &report.channels {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{}",
                report.point.layer,
                report.point.direction,
                stats.index,
                stats.mean,
                stats.variance,
                stats.min,
                stats.max
            );
        }
    }
    let mut file = File::create(path.as_ref())?;
    file.write_all(out.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array4;
    use tempfile::TempDir;

    fn sample_report() -> ProbeReport {
        let activation = Array4::from_shape_vec(
            (2, 2, 1, 2),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        )
        .unwrap()
        .into_dyn();
        ProbeReport::from_activation(ObservationPoint::output("block0.bn"), &activation, 1)
            .unwrap()
    }

    #[test]
    fn test_from_activation_captures_shape_and_channels() {
        let report = sample_report();
        assert_eq!(report.shape, vec![2, 2, 1, 2]);
        assert_eq!(report.channels.len(), 2);
        // Channel 0 holds {0, 1, 4, 5}
        assert_relative_eq!(report.channels[0].mean, 2.5);
    }

    #[test]
    fn test_from_activation_propagates_shape_errors() {
        let activation = ndarray::Array1::<f32>::zeros(3).into_dyn();
        let err =
            ProbeReport::from_activation(ObservationPoint::output("x"), &activation, 1)
                .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidShape(_)));
    }

    #[test]
    fn test_render_contains_every_channel() {
        let text = render(&sample_report());
        assert!(text.contains("output of `block0.bn`"));
        assert!(text.contains("channel   0"));
        assert!(text.contains("channel   1"));
        assert!(text.contains("mean 2.5000"));
    }

    #[test]
    fn test_export_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        export_csv(&[sample_report()], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "layer,direction,channel,mean,variance,min,max");
        assert_eq!(lines.len(), 3); // header + 2 channels
        assert!(lines[1].starts_with("block0.bn,output,0,"));
    }

    #[test]
    fn test_export_csv_empty_run_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        export_csv(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
