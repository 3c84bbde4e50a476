//! users command - export users with their groups and roles

use super::print_json;
use anyhow::Result;
use realmgate_auth::{DirectoryAuthProvider, UserMetadataProvider};
use tracing::info;

pub async fn execute(provider: &DirectoryAuthProvider) -> Result<()> {
    let users = provider.users_metadata().await;
    info!("Exported {} users", users.len());
    print_json(&users)
}
