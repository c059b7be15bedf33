//! Probe command implementation
//!
//! The full inspection pipeline: parse and validate the specification,
//! build the network, obtain the fixed batch, attach one collector per
//! probe, evaluate once, detach everything, then render and optionally
//! export the reports. Any failure aborts before reporting, so a failed
//! evaluation leaves no partial output.

use crate::cli::logging::{log, LogLevel};
use crate::config::{validate_spec, ProbeArgs, ProbeSpec};
use crate::data::load_batch;
use crate::io::load_checkpoint;
use crate::nn::{Network, NetworkConfig};
use crate::observe::{ObservationPoint, ObserverHub};
use crate::report::{export_csv, render, ProbeReport};
use crate::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

pub fn run_probe(args: ProbeArgs, level: LogLevel) -> std::result::Result<(), String> {
    let spec = ProbeSpec::from_yaml_file(&args.spec).map_err(|e| e.to_string())?;
    validate_spec(&spec).map_err(|e| e.to_string())?;

    let mut spec = spec;
    if args.export.is_some() {
        spec.export = args.export;
    }

    let reports = run_spec(&spec, level).map_err(|e| e.to_string())?;

    for report in &reports {
        log(level, LogLevel::Normal, render(report).trim_end());
    }
    if let Some(path) = &spec.export {
        export_csv(&reports, path).map_err(|e| e.to_string())?;
        log(
            level,
            LogLevel::Normal,
            &format!("Exported {} report(s) to {}", reports.len(), path.display()),
        );
    }
    Ok(())
}

/// Attach, evaluate once, detach; returns one report per probe.
fn run_spec(spec: &ProbeSpec, level: LogLevel) -> Result<Vec<ProbeReport>> {
    let config = NetworkConfig::preset(&spec.model.preset).ok_or_else(|| {
        Error::Config(format!("unknown network preset: {}", spec.model.preset))
    })?;

    let network = match &spec.model.checkpoint {
        Some(path) => {
            let state = load_checkpoint(path)?;
            log(
                level,
                LogLevel::Verbose,
                &format!(
                    "Loaded checkpoint `{}` ({} parameters)",
                    state.metadata.name,
                    state.parameter_count()
                ),
            );
            Network::from_checkpoint(&config, &state, spec.model.device)?
        }
        None => Network::new(&config, spec.model.device)?,
    };

    let batch = load_batch(&spec.data)?;
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "Evaluating a batch of {} images ({}x{}x{}) on {}",
            batch.len(),
            spec.data.channels,
            spec.data.height,
            spec.data.width,
            network.device()
        ),
    );

    let hub = ObserverHub::new();
    let collected: Rc<RefCell<Vec<ProbeReport>>> = Rc::new(RefCell::new(Vec::new()));
    let mut handles = Vec::with_capacity(spec.probes.len());

    for probe in &spec.probes {
        let point = ObservationPoint {
            layer: probe.layer.clone(),
            direction: probe.direction,
        };
        let channel_axis = probe.channel_axis;
        let sink = Rc::clone(&collected);
        let handle = hub.attach(
            &network,
            point,
            Box::new(move |event| {
                let report =
                    ProbeReport::from_activation(event.point.clone(), event.activation, channel_axis)?;
                sink.borrow_mut().push(report);
                Ok(())
            }),
        )?;
        handles.push(handle);
    }

    let predictions = network.forward_observed(&batch.images.clone().into_dyn(), &hub)?;

    // Observers must not outlive the run
    for handle in &mut handles {
        handle.detach();
    }
    debug_assert_eq!(hub.active_taps(), 0);

    log(
        level,
        LogLevel::Verbose,
        &format!("Prediction shape: {:?}", predictions.shape()),
    );

    Ok(Rc::try_unwrap(collected)
        .map(RefCell::into_inner)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelSection, ProbeSection};
    use crate::data::DataConfig;
    use crate::nn::Device;
    use crate::observe::TapDirection;

    fn tiny_spec() -> ProbeSpec {
        ProbeSpec {
            model: ModelSection {
                preset: "tiny".to_string(),
                checkpoint: None,
                device: Device::Cpu,
            },
            data: DataConfig {
                batch_size: 2,
                channels: 3,
                height: 8,
                width: 8,
                ..DataConfig::demo()
            },
            probes: vec![
                ProbeSection {
                    layer: "block0.bn".to_string(),
                    direction: TapDirection::Output,
                    channel_axis: 1,
                },
                ProbeSection {
                    layer: "classifier".to_string(),
                    direction: TapDirection::Input,
                    channel_axis: 1,
                },
            ],
            export: None,
        }
    }

    #[test]
    fn test_run_spec_produces_one_report_per_probe() {
        let reports = run_spec(&tiny_spec(), LogLevel::Quiet).unwrap();
        assert_eq!(reports.len(), 2);
        // block0.bn produces 4 channels, the classifier input 4 * 4 * 4 features
        assert_eq!(reports[0].channels.len(), 4);
        assert_eq!(reports[1].channels.len(), 64);
    }

    #[test]
    fn test_run_spec_unknown_layer_fails() {
        let mut spec = tiny_spec();
        spec.probes[0].layer = "block9.bn".to_string();
        let err = run_spec(&spec, LogLevel::Quiet).unwrap_err();
        assert!(matches!(err, Error::LayerNotFound(_)));
    }

    #[test]
    fn test_run_spec_bad_axis_aborts_with_no_reports() {
        let mut spec = tiny_spec();
        spec.probes[0].channel_axis = 9;
        let err = run_spec(&spec, LogLevel::Quiet).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }
}
