//! roles command - show roles and permissions of a principal

use super::{print_json, CommandContext};
use anyhow::Result;
use colored::Colorize;
use realmgate_auth::{DirectoryAuthProvider, Realm};
use realmgate_core::types::Principal;

pub async fn execute(
    ctx: &CommandContext,
    provider: &DirectoryAuthProvider,
    principal: &str,
) -> Result<()> {
    let principal = Principal::parse(principal)?;
    let info = provider.fetch_authorization(&principal).await;

    if ctx.is_json() {
        return print_json(&info);
    }

    println!("{}", principal.as_str().bold());
    print_list("Roles", info.roles.iter());
    print_list("Permissions", info.permissions.iter());

    Ok(())
}

fn print_list<'a>(title: &str, items: impl ExactSizeIterator<Item = &'a String>) {
    println!("  {}:", title.cyan());
    if items.len() == 0 {
        println!("    (none)");
    }
    for item in items {
        println!("    - {}", item);
    }
}
