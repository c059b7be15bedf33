//! Run configuration: YAML schema, validation, CLI types

mod cli;
mod schema;
mod validate;

pub use cli::{Cli, Command, InfoArgs, InitArgs, ProbeArgs, ValidateArgs};
pub use schema::{ModelSection, ProbeSection, ProbeSpec};
pub use validate::{validate_spec, ValidationError};
