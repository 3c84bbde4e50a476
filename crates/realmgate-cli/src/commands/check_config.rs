//! check-config command - validate and print the effective configuration

use super::{print_json, CommandContext};
use anyhow::Result;
use colored::Colorize;
use realmgate_core::RealmGateConfig;

const REDACTED: &str = "********";

pub fn execute(ctx: &CommandContext, config: &RealmGateConfig) -> Result<()> {
    let validation = config.validate();

    let mut shown = config.clone();
    if shown.directory.system_password.is_some() {
        shown.directory.system_password = Some(REDACTED.to_string());
    }

    if ctx.is_json() {
        print_json(&shown)?;
    } else {
        println!("{}", toml::to_string_pretty(&shown)?);
        match &validation {
            Ok(()) => println!("{}", "configuration is valid".green()),
            Err(e) => println!("{}: {}", "invalid".red(), e),
        }
    }

    validation?;
    Ok(())
}
