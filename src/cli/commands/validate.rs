//! Validate command implementation

use crate::cli::logging::{log, LogLevel};
use crate::config::{validate_spec, ProbeSpec, ValidateArgs};

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    let spec = ProbeSpec::from_yaml_file(&args.spec).map_err(|e| e.to_string())?;
    validate_spec(&spec).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, "Specification OK:");
    log(
        level,
        LogLevel::Normal,
        &format!("  Network: {} on {}", spec.model.preset, spec.model.device),
    );
    log(
        level,
        LogLevel::Normal,
        &format!(
            "  Batch: {} images, {}x{}x{}",
            spec.data.batch_size, spec.data.channels, spec.data.height, spec.data.width
        ),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  Probes: {}", spec.probes.len()),
    );
    for probe in &spec.probes {
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "    {} of `{}` (channel axis {})",
                probe.direction, probe.layer, probe.channel_axis
            ),
        );
    }
    Ok(())
}
