//! Group to role mapping and role to permission registry

use realmgate_core::types::{PermissionSet, RoleSet};
use realmgate_core::LIST_DELIMITER;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Immutable table from group key to role names.
///
/// A key is either a group's full DN (`ou=mathematicians,dc=example,dc=com`)
/// or its short identifier (`mathematicians`); both forms may be configured.
#[derive(Debug, Clone, Default)]
pub struct GroupRolesMap {
    groups: HashMap<String, RoleSet>,
}

impl GroupRolesMap {
    /// Build from `group key -> "role1,role2"` pairs
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let groups = entries
            .into_iter()
            .map(|(key, roles)| (key.into(), split_list(roles.as_ref())))
            .collect();
        Self { groups }
    }

    pub fn roles_for(&self, group_key: &str) -> Option<&RoleSet> {
        self.groups.get(group_key)
    }

    /// Union of the roles of every key. Unmapped keys are logged and skipped.
    pub fn roles_for_groups<'a>(&self, group_keys: impl IntoIterator<Item = &'a str>) -> RoleSet {
        let mut roles = RoleSet::new();
        self.collect_roles(group_keys, &mut roles);
        roles
    }

    /// Like [`roles_for_groups`](Self::roles_for_groups), adding into `roles`
    pub fn collect_roles<'a>(&self, group_keys: impl IntoIterator<Item = &'a str>, roles: &mut RoleSet) {
        for key in group_keys {
            match self.groups.get(key) {
                Some(mapped) => {
                    for role in mapped {
                        debug!("User is member of group [{}] so adding role [{}]", key, role);
                        roles.insert(role.clone());
                    }
                }
                None => warn!("Did not find any group to role mappings for group: {}", key),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Source of the permissions granted by a role
pub trait RolePermissionRegistry: Send + Sync {
    /// Permissions of a role, `None` if the role is unknown
    fn permissions_for(&self, role: &str) -> Option<&PermissionSet>;

    /// Union of the permissions of every known role
    fn permissions_for_roles(&self, roles: &RoleSet) -> PermissionSet {
        roles
            .iter()
            .filter_map(|role| self.permissions_for(role))
            .flat_map(|permissions| permissions.iter().cloned())
            .collect()
    }
}

/// Registry loaded from a static `role -> "perm1,perm2"` table
#[derive(Debug, Clone, Default)]
pub struct StaticRoleRegistry {
    roles: HashMap<String, PermissionSet>,
}

impl StaticRoleRegistry {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let roles = entries
            .into_iter()
            .map(|(role, permissions)| (role.into(), split_list(permissions.as_ref())))
            .collect();
        Self { roles }
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

impl RolePermissionRegistry for StaticRoleRegistry {
    fn permissions_for(&self, role: &str) -> Option<&PermissionSet> {
        self.roles.get(role)
    }
}

/// Split a comma-delimited list, trimming and dropping empty items
fn split_list(list: &str) -> RoleSet {
    list.split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
