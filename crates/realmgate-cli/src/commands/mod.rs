//! CLI command implementations

pub mod authenticate;
pub mod check_config;
pub mod roles;
pub mod test_connection;
pub mod users;

use crate::OutputFormat;
use serde::Serialize;

/// Context passed to all commands
pub struct CommandContext {
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
