//! Info command implementation

use crate::cli::logging::{log, LogLevel};
use crate::config::InfoArgs;
use crate::io::load_checkpoint;

/// Cap on per-parameter detail lines at verbose level.
const DETAIL_LIMIT: usize = 20;

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let state = load_checkpoint(&args.checkpoint).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, "Checkpoint Information:");
    log(
        level,
        LogLevel::Normal,
        &format!("  Name: {}", state.metadata.name),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  Architecture: {}", state.metadata.architecture),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  Written by: sondear {}", state.metadata.version),
    );
    if let Some(created) = &state.metadata.created_at {
        log(
            level,
            LogLevel::Normal,
            &format!("  Created: {}", created.to_rfc3339()),
        );
    }
    log(
        level,
        LogLevel::Normal,
        &format!("  Tensors: {}", state.parameters.len()),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  Parameters: {}", state.parameter_count()),
    );

    if level == LogLevel::Verbose {
        log(level, LogLevel::Verbose, "\nTensor Details:");
        for (name, tensor) in state.parameters.iter().take(DETAIL_LIMIT) {
            log(
                level,
                LogLevel::Verbose,
                &format!("  {}: {:?}", name, tensor.shape),
            );
        }
        if state.parameters.len() > DETAIL_LIMIT {
            log(
                level,
                LogLevel::Verbose,
                &format!("  ... and {} more tensors", state.parameters.len() - DETAIL_LIMIT),
            );
        }
    }

    Ok(())
}
