//! authenticate command - verify a password

use super::{print_json, CommandContext};
use anyhow::{bail, Result};
use colored::Colorize;
use realmgate_auth::{DirectoryAuthProvider, Realm};
use realmgate_core::types::{Credential, Principal};
use serde_json::json;

pub async fn execute(
    ctx: &CommandContext,
    provider: &DirectoryAuthProvider,
    principal: &str,
    password: String,
) -> Result<()> {
    let principal = Principal::parse(principal)?;
    let credential = Credential::new(password);

    match provider.authenticate(&principal, &credential).await {
        Ok(info) => {
            if ctx.is_json() {
                print_json(&info)?;
            } else {
                println!(
                    "{}: {} as {}",
                    "authenticated".green(),
                    principal,
                    info.entry
                );
            }
            Ok(())
        }
        Err(e) => {
            if ctx.is_json() {
                print_json(&json!({
                    "principal": principal,
                    "authenticated": false,
                    "outcome": e.outcome(),
                }))?;
            } else {
                println!("{}: {} ({})", "denied".red(), principal, e);
            }
            bail!("authentication failed");
        }
    }
}
