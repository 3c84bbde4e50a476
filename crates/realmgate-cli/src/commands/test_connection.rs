//! test-connection command - read the root DSE of the directory server

use super::{print_json, CommandContext};
use anyhow::{bail, Result};
use colored::Colorize;
use realmgate_auth::{DirectoryAuthProvider, DirectoryConnector};

pub async fn execute(ctx: &CommandContext, provider: &DirectoryAuthProvider) -> Result<()> {
    if ctx.is_json() {
        let status = provider.status().await;
        print_json(&status)?;
        if !status.connected {
            bail!("directory connection failed");
        }
        return Ok(());
    }

    match provider.test_connection().await {
        Ok(info) => {
            println!("{}: {}", "connected".green(), provider_location(provider));
            println!(
                "  Vendor: {} {}",
                info.vendor.as_deref().unwrap_or("(unknown)"),
                info.version.as_deref().unwrap_or("")
            );
            for context in &info.naming_contexts {
                println!("  Naming context: {}", context);
            }
            Ok(())
        }
        Err(e) => {
            println!("{}: {} ({})", "unreachable".red(), provider_location(provider), e);
            bail!("directory connection failed");
        }
    }
}

fn provider_location(provider: &DirectoryAuthProvider) -> String {
    provider.connector().describe()
}
