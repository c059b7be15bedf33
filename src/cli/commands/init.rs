//! Init command implementation
//!
//! Writes a deterministic demo checkpoint and a matching probe
//! specification so the tool runs end-to-end out of the box:
//!
//! ```bash
//! sondear init demo/
//! sondear probe demo/probe.yaml
//! ```

use crate::cli::logging::{log, LogLevel};
use crate::config::{InitArgs, ModelSection, ProbeSection, ProbeSpec};
use crate::data::DataConfig;
use crate::io::save_checkpoint;
use crate::nn::{Device, Network, NetworkConfig};
use crate::observe::TapDirection;

const CHECKPOINT_FILE: &str = "sondear-demo.json";
const SPEC_FILE: &str = "probe.yaml";

pub fn run_init(args: InitArgs, level: LogLevel) -> Result<(), String> {
    if !args.dir.exists() {
        std::fs::create_dir_all(&args.dir).map_err(|e| e.to_string())?;
    }
    let checkpoint_path = args.dir.join(CHECKPOINT_FILE);
    let spec_path = args.dir.join(SPEC_FILE);
    if !args.force && (checkpoint_path.exists() || spec_path.exists()) {
        return Err(format!(
            "{} or {} already exists (pass --force to overwrite)",
            checkpoint_path.display(),
            spec_path.display()
        ));
    }

    let config = NetworkConfig::cifar_small();
    let network = Network::new(&config, Device::Cpu).map_err(|e| e.to_string())?;
    let state = network.to_checkpoint("sondear-demo", "cnn");
    save_checkpoint(&state, &checkpoint_path).map_err(|e| e.to_string())?;

    let spec = ProbeSpec {
        model: ModelSection {
            preset: "cifar-small".to_string(),
            checkpoint: Some(checkpoint_path.clone()),
            device: Device::Cpu,
        },
        data: DataConfig::demo(),
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
    };
    let yaml = spec.to_yaml().map_err(|e| e.to_string())?;
    std::fs::write(&spec_path, yaml).map_err(|e| e.to_string())?;

    log(
        level,
        LogLevel::Normal,
        &format!("Wrote {}", checkpoint_path.display()),
    );
    log(level, LogLevel::Normal, &format!("Wrote {}", spec_path.display()));
    log(
        level,
        LogLevel::Normal,
        &format!("Run: sondear probe {}", spec_path.display()),
    );
    Ok(())
}
