//! CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sondear: Activation Probing Tool
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "sondear")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Per-channel activation statistics for trained networks via attachable layer taps")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a probe specification: attach taps, evaluate once, report
    Probe(ProbeArgs),

    /// Validate a probe specification without running it
    Validate(ValidateArgs),

    /// Display checkpoint information
    Info(InfoArgs),

    /// Write a demo checkpoint and probe specification
    Init(InitArgs),
}

/// Arguments for the probe command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ProbeArgs {
    /// Path to the YAML probe specification
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Override the specification's CSV export path
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to the YAML probe specification
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to a checkpoint file
    #[arg(value_name = "CHECKPOINT")]
    pub checkpoint: PathBuf,
}

/// Arguments for the init command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Directory to write the demo files into
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_command() {
        let cli = Cli::try_parse_from(["sondear", "probe", "spec.yaml"]).unwrap();
        match cli.command {
            Command::Probe(args) => {
                assert_eq!(args.spec, PathBuf::from("spec.yaml"));
                assert!(args.export.is_none());
            }
            other => panic!("expected probe command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_probe_with_export_override() {
        let cli =
            Cli::try_parse_from(["sondear", "probe", "spec.yaml", "--export", "out.csv"]).unwrap();
        match cli.command {
            Command::Probe(args) => assert_eq!(args.export, Some(PathBuf::from("out.csv"))),
            other => panic!("expected probe command, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["sondear", "--verbose", "validate", "spec.yaml"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_init_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["sondear", "init"]).unwrap();
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(!args.force);
            }
            other => panic!("expected init command, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["sondear"]).is_err());
    }
}
