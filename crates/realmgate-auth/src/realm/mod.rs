//! Realms: authentication and authorization sources
//!
//! A [`Realm`] verifies credentials and answers which roles and permissions
//! a principal holds. Several realms can be combined in a [`RealmChain`].
//! Realms must answer "nothing" for principals they do not know rather than
//! fail, so that a chain can always consult the next realm.

mod provider;
mod settings;

use async_trait::async_trait;
use realmgate_core::types::{AuthenticationInfo, AuthorizationInfo, Credential, Principal, UserMetadata};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

pub use provider::DirectoryAuthProvider;
pub use settings::RealmSettings;

/// A source of authentication and authorization
#[async_trait]
pub trait Realm: Send + Sync {
    fn name(&self) -> &str;

    /// Verify a credential for a principal
    async fn authenticate(
        &self,
        principal: &Principal,
        credential: &Credential,
    ) -> AuthResult<AuthenticationInfo>;

    /// Roles and permissions of a principal. Unknown principals and
    /// unreachable directories yield an empty result, never an error.
    async fn fetch_authorization(&self, principal: &Principal) -> AuthorizationInfo;
}

/// A realm able to list its users for export
#[async_trait]
pub trait UserMetadataProvider: Send + Sync {
    async fn users_metadata(&self) -> Vec<UserMetadata>;
}

/// Ordered list of realms consulted one after another
#[derive(Clone, Default)]
pub struct RealmChain {
    realms: Vec<Arc<dyn Realm>>,
}

impl RealmChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realm(mut self, realm: Arc<dyn Realm>) -> Self {
        self.realms.push(realm);
        self
    }

    pub fn len(&self) -> usize {
        self.realms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realms.is_empty()
    }
}

#[async_trait]
impl Realm for RealmChain {
    fn name(&self) -> &str {
        "chain"
    }

    /// First realm accepting the credential wins. When all deny, the last
    /// denial is returned.
    async fn authenticate(
        &self,
        principal: &Principal,
        credential: &Credential,
    ) -> AuthResult<AuthenticationInfo> {
        let mut last_error = AuthError::UnknownPrincipal(principal.to_string());

        for realm in &self.realms {
            match realm.authenticate(principal, credential).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    debug!("Realm {} denied {}: {}", realm.name(), principal, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Union over all realms
    async fn fetch_authorization(&self, principal: &Principal) -> AuthorizationInfo {
        let mut merged = AuthorizationInfo::default();
        for realm in &self.realms {
            merged.merge(realm.fetch_authorization(principal).await);
        }
        merged
    }
}
