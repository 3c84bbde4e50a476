//! Authentication and authorization results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{DirectoryEntryRef, Principal};

/// Set of application role names
pub type RoleSet = BTreeSet<String>;

/// Set of permission strings
pub type PermissionSet = BTreeSet<String>;

/// Proof of a successful authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    /// Principal as supplied by the caller
    pub principal: Principal,

    /// Entry the credential was verified against
    pub entry: DirectoryEntryRef,

    /// Name of the realm that accepted the credential
    pub realm: String,

    pub authenticated_at: DateTime<Utc>,
}

/// Roles held by a principal and the permissions those roles grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationInfo {
    pub roles: RoleSet,
    pub permissions: PermissionSet,
}

impl AuthorizationInfo {
    pub fn new(roles: RoleSet, permissions: PermissionSet) -> Self {
        Self { roles, permissions }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }

    /// Union another result into this one
    pub fn merge(&mut self, other: AuthorizationInfo) {
        self.roles.extend(other.roles);
        self.permissions.extend(other.permissions);
    }
}
