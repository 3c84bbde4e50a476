//! Export records of directory users

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::RoleSet;

/// A group a user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupRef {
    /// Full distinguished name
    pub dn: String,
    /// Value of the group identifier attribute
    pub id: String,
}

impl GroupRef {
    pub fn new(dn: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            id: id.into(),
        }
    }
}

/// One user with its groups and the roles they map to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub username: String,
    pub groups: BTreeSet<GroupRef>,
    pub roles: RoleSet,
}
