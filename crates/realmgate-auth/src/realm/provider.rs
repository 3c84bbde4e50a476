//! Directory-backed realm
//!
//! Resolves a principal to its directory entry, verifies credentials by
//! binding as that entry, and derives roles from the groups listing the
//! entry as a member. Every public operation opens exactly one directory
//! session and closes it before returning.

use async_trait::async_trait;
use chrono::Utc;
use realmgate_core::types::{
    AuthenticationInfo, AuthorizationInfo, Credential, DirectoryEntryRef, GroupRef, Principal,
    RoleSet, UserMetadata,
};
use realmgate_core::RealmGateConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Realm, RealmSettings, UserMetadataProvider};
use crate::cache::{self, AuthorizationCache, NoopAuthorizationCache};
use crate::directory::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchFilter, SearchScope};
use crate::error::{AuthError, AuthResult, DirectoryError, DirectoryResult};
use crate::ldap::{DirectoryServerInfo, LdapDirectory, RealmStatus};
use crate::metrics;
use crate::roles::{GroupRolesMap, RolePermissionRegistry, StaticRoleRegistry};

/// Realm authenticating against a directory and mapping groups to roles
pub struct DirectoryAuthProvider {
    name: String,
    enabled: bool,
    settings: RealmSettings,
    group_roles: Arc<GroupRolesMap>,
    connector: Arc<dyn DirectoryConnector>,
    registry: Arc<dyn RolePermissionRegistry>,
    cache: Arc<dyn AuthorizationCache>,
}

impl DirectoryAuthProvider {
    /// Provider with no role mappings, no permissions and no cache
    pub fn new(settings: RealmSettings, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            name: "ldap".to_string(),
            enabled: true,
            settings,
            group_roles: Arc::new(GroupRolesMap::default()),
            connector,
            registry: Arc::new(StaticRoleRegistry::default()),
            cache: Arc::new(NoopAuthorizationCache),
        }
    }

    /// Provider talking to the LDAP server described by the configuration
    pub fn from_config(config: &RealmGateConfig) -> Self {
        let connector = Arc::new(LdapDirectory::from_config(&config.directory));
        Self::from_config_with_connector(config, connector)
    }

    /// Like [`from_config`](Self::from_config) with a caller-supplied connector
    pub fn from_config_with_connector(
        config: &RealmGateConfig,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Self {
        let settings = RealmSettings::from_config(&config.realm, config.directory.server_type);

        let mut provider = Self::new(settings, connector)
            .with_group_roles(GroupRolesMap::new(&config.realm.group_roles_map))
            .with_registry(Arc::new(StaticRoleRegistry::new(&config.roles)))
            .with_cache(cache::from_config(&config.cache));
        provider.enabled = config.directory.enabled;
        provider
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_group_roles(mut self, group_roles: GroupRolesMap) -> Self {
        self.group_roles = Arc::new(group_roles);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn RolePermissionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn AuthorizationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn settings(&self) -> &RealmSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn connector(&self) -> &Arc<dyn DirectoryConnector> {
        &self.connector
    }

    pub fn cache(&self) -> &Arc<dyn AuthorizationCache> {
        &self.cache
    }

    /// Drop the cached authorization of one principal
    pub fn invalidate(&self, principal: &Principal) {
        self.cache.invalidate(principal);
    }

    /// Search the user base for the principal's entry. `None` if absent.
    pub async fn resolve_entry(&self, principal: &Principal) -> DirectoryResult<Option<DirectoryEntryRef>> {
        let mut session = self.connector.open().await?;
        let result = self.find_user_dn(session.as_mut(), principal).await;
        self.release(session.as_mut()).await;
        result
    }

    /// Roles mapped from the principal's groups. Unknown principals get an
    /// empty set; a directory failure ends the lookup with the roles
    /// collected so far.
    pub async fn role_names_for(&self, principal: &Principal) -> RoleSet {
        self.collect_roles(principal).await.0
    }

    /// Every user entry with its groups and their roles. Directory errors
    /// end the enumeration; users processed so far are returned.
    pub async fn list_all_users_with_groups_and_roles(&self) -> Vec<UserMetadata> {
        let mut users = Vec::new();

        let mut session = match self.connector.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not list directory users: {}", e);
                metrics::record_directory_error(&self.name, "list_users");
                return users;
            }
        };

        if let Err(e) = self.enumerate_users(session.as_mut(), &mut users).await {
            warn!(
                "Directory error while listing users, returning {} users: {}",
                users.len(),
                e
            );
            metrics::record_directory_error(&self.name, "list_users");
        }

        self.release(session.as_mut()).await;
        users
    }

    /// Open a system session and read the root DSE
    pub async fn test_connection(&self) -> DirectoryResult<DirectoryServerInfo> {
        let mut session = self.connector.open().await?;
        let result = session
            .search(
                "",
                SearchScope::Base,
                &SearchFilter::any(),
                &[
                    "vendorName",
                    "vendorVersion",
                    "namingContexts",
                    "supportedLDAPVersion",
                ],
            )
            .await;
        self.release(session.as_mut()).await;

        let info = match result?.into_iter().next() {
            Some(entry) => DirectoryServerInfo {
                vendor: entry.first("vendorName").map(str::to_string),
                version: entry.first("vendorVersion").map(str::to_string),
                naming_contexts: entry.values("namingContexts").to_vec(),
                supported_ldap_version: entry.values("supportedLDAPVersion").to_vec(),
            },
            None => DirectoryServerInfo {
                supported_ldap_version: vec!["3".to_string()],
                ..Default::default()
            },
        };

        Ok(info)
    }

    pub async fn status(&self) -> RealmStatus {
        let (connected, error) = if self.enabled {
            match self.test_connection().await {
                Ok(_) => (true, None),
                Err(e) => (false, Some(e.to_string())),
            }
        } else {
            (false, Some("realm is disabled".to_string()))
        };

        RealmStatus {
            name: self.name.clone(),
            enabled: self.enabled,
            connected,
            server: self.connector.describe(),
            checked_at: Utc::now().to_rfc3339(),
            error,
            cached_authorizations: self.cache.len(),
        }
    }

    // =========================================================================
    // Private methods
    // =========================================================================

    async fn release(&self, session: &mut dyn DirectorySession) {
        if let Err(e) = session.close().await {
            debug!("Closing directory session failed: {}", e);
        }
    }

    async fn find_user_dn(
        &self,
        session: &mut dyn DirectorySession,
        principal: &Principal,
    ) -> DirectoryResult<Option<DirectoryEntryRef>> {
        let filter = SearchFilter::user(
            &self.settings.user_object_class,
            &self.settings.user_identifier_attribute,
            principal.as_str(),
        );
        debug!("Searching for user DN, with filter: {}", filter.render_for_log());

        let entries = session
            .search(
                &self.settings.search_base,
                SearchScope::Subtree,
                &filter,
                &[self.settings.user_identifier_attribute.as_str()],
            )
            .await?;

        match entries.into_iter().next() {
            Some(entry) => {
                debug!("Found DN for the user: {}", entry.dn);
                Ok(Some(DirectoryEntryRef::new(entry.dn)))
            }
            None => {
                warn!("User {} was not found in LDAP directory.", principal);
                Ok(None)
            }
        }
    }

    async fn find_groups(
        &self,
        session: &mut dyn DirectorySession,
        member: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = SearchFilter::group_member(&self.settings.group_member_attribute, member);
        debug!(
            "Searching for groups DN of user [{}], with filter: {}",
            member,
            filter.render_for_log()
        );

        session
            .search(
                &self.settings.group_search_base,
                SearchScope::Subtree,
                &filter,
                &[self.settings.group_identifier_attribute.as_str()],
            )
            .await
    }

    /// Lookup keys of a group: every identifier value, then the full DN
    fn group_keys<'a>(&self, group: &'a DirectoryEntry) -> Vec<&'a str> {
        group
            .values(&self.settings.group_identifier_attribute)
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(group.dn.as_str()))
            .collect()
    }

    /// Roles of a principal and whether the lookup completed without a
    /// directory error
    async fn collect_roles(&self, principal: &Principal) -> (RoleSet, bool) {
        let mut roles = RoleSet::new();

        let mut session = match self.connector.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not look up roles of {}: {}", principal, e);
                metrics::record_directory_error(&self.name, "roles");
                return (roles, false);
            }
        };

        let result = self
            .collect_roles_with_session(session.as_mut(), principal, &mut roles)
            .await;
        self.release(session.as_mut()).await;

        match result {
            Ok(()) => (roles, true),
            Err(e) => {
                warn!(
                    "Directory error while looking up roles of {}, keeping {} roles: {}",
                    principal,
                    roles.len(),
                    e
                );
                metrics::record_directory_error(&self.name, "roles");
                (roles, false)
            }
        }
    }

    async fn collect_roles_with_session(
        &self,
        session: &mut dyn DirectorySession,
        principal: &Principal,
        roles: &mut RoleSet,
    ) -> DirectoryResult<()> {
        // Unknown users have no roles. Not an error: other realms may know them.
        let Some(user_dn) = self.find_user_dn(session, principal).await? else {
            return Ok(());
        };

        let groups = self.find_groups(session, user_dn.as_str()).await?;
        if groups.is_empty() {
            warn!("LDAP query did not return any groups for user [{}]", user_dn);
        }

        for group in &groups {
            let keys = self.group_keys(group);
            debug!("Groups found for user [{}]: {:?}", principal, keys);
            self.group_roles.collect_roles(keys, roles);
        }

        Ok(())
    }

    async fn enumerate_users(
        &self,
        session: &mut dyn DirectorySession,
        users: &mut Vec<UserMetadata>,
    ) -> DirectoryResult<()> {
        let id_attribute = self.settings.user_identifier_attribute.as_str();
        let entries = session
            .search(
                &self.settings.search_base,
                SearchScope::Subtree,
                &SearchFilter::object_class(&self.settings.user_object_class),
                &[id_attribute],
            )
            .await?;

        for entry in entries {
            let ids = entry.values(id_attribute);
            if ids.is_empty() {
                continue;
            }

            let groups = self.find_groups(session, &entry.dn).await?;

            let mut group_refs = std::collections::BTreeSet::new();
            let mut roles = RoleSet::new();
            for group in &groups {
                let id = group
                    .first(&self.settings.group_identifier_attribute)
                    .unwrap_or_default();
                group_refs.insert(GroupRef::new(group.dn.as_str(), id));
                self.group_roles.collect_roles(self.group_keys(group), &mut roles);
            }

            for id in ids {
                users.push(UserMetadata {
                    username: id.clone(),
                    groups: group_refs.clone(),
                    roles: roles.clone(),
                });
            }
        }

        Ok(())
    }

    async fn bind_as(
        &self,
        session: &mut dyn DirectorySession,
        principal: &Principal,
        credential: &Credential,
    ) -> AuthResult<DirectoryEntryRef> {
        let user_dn = self
            .find_user_dn(session, principal)
            .await?
            .ok_or_else(|| AuthError::UnknownPrincipal(principal.to_string()))?;

        session
            .bind(user_dn.as_str(), credential)
            .await
            .map_err(|e| match e {
                DirectoryError::InvalidCredentials(_) => AuthError::InvalidCredentials,
                other => AuthError::Directory(other),
            })?;

        Ok(user_dn)
    }
}

#[async_trait]
impl Realm for DirectoryAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(
        &self,
        principal: &Principal,
        credential: &Credential,
    ) -> AuthResult<AuthenticationInfo> {
        debug!("Authenticating user '{}' through LDAP", principal);

        let result = if !self.enabled {
            Err(AuthError::Disabled(self.name.clone()))
        } else if credential.is_empty() {
            // An empty simple bind is anonymous on most servers
            Err(AuthError::InvalidCredentials)
        } else {
            match self.connector.open().await {
                Ok(mut session) => {
                    let bound = self.bind_as(session.as_mut(), principal, credential).await;
                    self.release(session.as_mut()).await;
                    bound
                }
                Err(e) => Err(AuthError::Directory(e)),
            }
        };

        match result {
            Ok(entry) => {
                info!("User {} authenticated as {}", principal, entry);
                metrics::record_authentication(&self.name, "success");
                Ok(AuthenticationInfo {
                    principal: principal.clone(),
                    entry,
                    realm: self.name.clone(),
                    authenticated_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!("Authentication of {} failed: {}", principal, e);
                metrics::record_authentication(&self.name, e.outcome());
                Err(e)
            }
        }
    }

    async fn fetch_authorization(&self, principal: &Principal) -> AuthorizationInfo {
        if !self.enabled {
            return AuthorizationInfo::default();
        }

        if let Some(cached) = self.cache.get(principal) {
            metrics::record_authorization_lookup(&self.name, true);
            return cached;
        }
        metrics::record_authorization_lookup(&self.name, false);

        let (roles, complete) = self.collect_roles(principal).await;
        let permissions = self.registry.permissions_for_roles(&roles);
        let info = AuthorizationInfo::new(roles, permissions);

        // A lookup cut short by the directory is not cached
        if complete {
            self.cache.put(principal, info.clone());
        }

        info
    }
}

#[async_trait]
impl UserMetadataProvider for DirectoryAuthProvider {
    async fn users_metadata(&self) -> Vec<UserMetadata> {
        if !self.enabled {
            return Vec::new();
        }
        self.list_all_users_with_groups_and_roles().await
    }
}
