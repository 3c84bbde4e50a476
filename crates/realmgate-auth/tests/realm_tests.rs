//! Directory realm behaviour against the in-memory directory

use realmgate_auth::{
    AuthError, AuthorizationCache, DirectoryAuthProvider, DirectoryEntry, GroupRolesMap,
    InMemoryAuthorizationCache, InMemoryDirectory, Realm, RealmSettings, StaticRoleRegistry,
    UserMetadataProvider,
};
use realmgate_core::types::{Credential, GroupRef, Principal, RoleSet};
use realmgate_core::RealmGateConfig;
use std::sync::Arc;

const BASE: &str = "dc=example,dc=com";
const EULER: &str = "uid=euler,ou=people,dc=example,dc=com";
const GAUSS: &str = "uid=gauss,ou=people,dc=example,dc=com";
const NEWTON: &str = "uid=newton,ou=people,dc=example,dc=com";
const GRP_A: &str = "ou=grp-A,ou=groups,dc=example,dc=com";
const GRP_B: &str = "ou=grp-B,ou=groups,dc=example,dc=com";
const UNMAPPED: &str = "ou=unmapped,ou=groups,dc=example,dc=com";

fn directory() -> InMemoryDirectory {
    let dir = InMemoryDirectory::new();
    dir.add_user(EULER, "euler", "password")
        .add_user(GAUSS, "gauss", "gauss-secret")
        .add_user(NEWTON, "newton", "apple")
        .add_group(GRP_A, "ou", "grp-A", &[EULER])
        .add_group(GRP_B, "ou", "grp-B", &[EULER, GAUSS])
        .add_group(UNMAPPED, "ou", "unmapped", &[GAUSS]);
    dir
}

fn group_roles() -> GroupRolesMap {
    GroupRolesMap::new([("grp-A", "role1,role2"), (GRP_B, "role3")])
}

fn provider(dir: &InMemoryDirectory) -> DirectoryAuthProvider {
    DirectoryAuthProvider::new(RealmSettings::new(BASE), Arc::new(dir.clone()))
        .with_group_roles(group_roles())
        .with_registry(Arc::new(StaticRoleRegistry::new([
            ("role1", "pages:view,pages:list"),
            ("role3", "pages:edit"),
        ])))
}

fn roles(items: &[&str]) -> RoleSet {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_authenticate_with_correct_credential() {
    let dir = directory();
    let realm = provider(&dir);

    let info = realm
        .authenticate(&Principal::new("euler"), &Credential::new("password"))
        .await
        .unwrap();

    assert_eq!(info.principal.as_str(), "euler");
    assert_eq!(info.entry.as_str(), EULER);
    assert_eq!(info.realm, "ldap");
}

#[tokio::test]
async fn test_authenticate_with_wrong_credential() {
    let dir = directory();
    let realm = provider(&dir);

    let result = realm
        .authenticate(&Principal::new("euler"), &Credential::new("gauss-secret"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    let result = realm
        .authenticate(&Principal::new("gauss"), &Credential::new("password"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_empty_credential_never_binds() {
    let dir = directory();
    let realm = provider(&dir);

    let result = realm
        .authenticate(&Principal::new("euler"), &Credential::new(""))
        .await;

    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert_eq!(dir.stats().binds, 0);
    assert_eq!(dir.stats().sessions_opened, 0);
}

#[tokio::test]
async fn test_unknown_principal_is_denied_without_error_elsewhere() {
    let dir = directory();
    let realm = provider(&dir);
    let riemann = Principal::new("riemann");

    let result = realm.authenticate(&riemann, &Credential::new("password")).await;
    assert!(matches!(result, Err(AuthError::UnknownPrincipal(_))));

    assert!(realm.resolve_entry(&riemann).await.unwrap().is_none());
    assert!(realm.role_names_for(&riemann).await.is_empty());
    assert!(realm.fetch_authorization(&riemann).await.is_empty());
}

#[tokio::test]
async fn test_roles_from_short_id_and_full_dn_keys() {
    let dir = directory();
    let realm = provider(&dir);

    let found = realm.role_names_for(&Principal::new("euler")).await;
    assert_eq!(found, roles(&["role1", "role2", "role3"]));
}

#[tokio::test]
async fn test_unmapped_group_contributes_nothing() {
    let dir = directory();
    let realm = provider(&dir);

    // gauss is in grp-B (mapped by DN) and unmapped
    let found = realm.role_names_for(&Principal::new("gauss")).await;
    assert_eq!(found, roles(&["role3"]));
}

#[tokio::test]
async fn test_user_without_groups_has_no_roles() {
    let dir = directory();
    let realm = provider(&dir);

    let newton = Principal::new("newton");
    assert!(realm.role_names_for(&newton).await.is_empty());
    assert!(realm
        .authenticate(&newton, &Credential::new("apple"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_filter_injection_does_not_widen_search() {
    let dir = directory();
    let realm = provider(&dir);

    for hostile in ["*)(uid=*", "*", "euler)(|(uid=*", "eu*"] {
        let principal = Principal::new(hostile);

        assert!(
            realm.resolve_entry(&principal).await.unwrap().is_none(),
            "{} resolved to an entry",
            hostile
        );
        assert!(realm.role_names_for(&principal).await.is_empty());

        let result = realm
            .authenticate(&principal, &Credential::new("password"))
            .await;
        assert!(matches!(result, Err(AuthError::UnknownPrincipal(_))));
    }
}

#[tokio::test]
async fn test_fetch_authorization_includes_permissions() {
    let dir = directory();
    let realm = provider(&dir);

    let info = realm.fetch_authorization(&Principal::new("euler")).await;

    assert_eq!(info.roles, roles(&["role1", "role2", "role3"]));
    assert!(info.has_permission("pages:view"));
    assert!(info.has_permission("pages:list"));
    assert!(info.has_permission("pages:edit"));
    assert_eq!(info.permissions.len(), 3);
}

#[tokio::test]
async fn test_authorization_is_served_from_cache() {
    let dir = directory();
    let cache = Arc::new(InMemoryAuthorizationCache::default());
    let realm = provider(&dir).with_cache(cache.clone());
    let euler = Principal::new("euler");

    let first = realm.fetch_authorization(&euler).await;
    let opened = dir.stats().sessions_opened;
    assert_eq!(opened, 1);
    assert_eq!(cache.len(), 1);

    let second = realm.fetch_authorization(&euler).await;
    assert_eq!(first, second);
    assert_eq!(dir.stats().sessions_opened, opened);

    realm.invalidate(&euler);
    realm.fetch_authorization(&euler).await;
    assert_eq!(dir.stats().sessions_opened, opened + 1);
}

#[tokio::test]
async fn test_partial_authorization_is_not_cached() {
    let dir = directory();
    let cache = Arc::new(InMemoryAuthorizationCache::default());
    let realm = provider(&dir).with_cache(cache.clone());

    // User search succeeds, group search fails
    dir.fail_searches_after(Some(1));
    let info = realm.fetch_authorization(&Principal::new("euler")).await;

    assert!(info.is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_unreachable_directory() {
    let dir = directory();
    let realm = provider(&dir);
    dir.set_unreachable(true);
    let euler = Principal::new("euler");

    let result = realm.authenticate(&euler, &Credential::new("password")).await;
    assert!(matches!(result, Err(AuthError::Directory(_))));

    assert!(realm.resolve_entry(&euler).await.is_err());
    assert!(realm.role_names_for(&euler).await.is_empty());
    assert!(realm.list_all_users_with_groups_and_roles().await.is_empty());
    assert!(realm.test_connection().await.is_err());

    let status = realm.status().await;
    assert!(!status.connected);
    assert!(status.error.is_some());
}

#[tokio::test]
async fn test_every_session_is_released() {
    let dir = directory();
    let realm = provider(&dir);
    let euler = Principal::new("euler");

    realm.authenticate(&euler, &Credential::new("password")).await.unwrap();
    assert_eq!(dir.stats().sessions_opened, 1);

    let _ = realm.authenticate(&euler, &Credential::new("nope")).await;
    let _ = realm
        .authenticate(&Principal::new("riemann"), &Credential::new("x"))
        .await;
    realm.role_names_for(&euler).await;
    realm.list_all_users_with_groups_and_roles().await;

    dir.fail_searches_after(Some(2));
    realm.list_all_users_with_groups_and_roles().await;

    let stats = dir.stats();
    assert_eq!(stats.sessions_opened, 6);
    assert_eq!(stats.sessions_closed, stats.sessions_opened);
}

#[tokio::test]
async fn test_list_all_users_with_groups_and_roles() {
    let dir = directory();
    let realm = provider(&dir);

    let users = realm.list_all_users_with_groups_and_roles().await;
    assert_eq!(users.len(), 3);

    let euler = &users[0];
    assert_eq!(euler.username, "euler");
    assert!(euler.groups.contains(&GroupRef::new(GRP_A, "grp-A")));
    assert!(euler.groups.contains(&GroupRef::new(GRP_B, "grp-B")));
    assert_eq!(euler.roles, roles(&["role1", "role2", "role3"]));

    let gauss = &users[1];
    assert_eq!(gauss.groups.len(), 2);
    assert_eq!(gauss.roles, roles(&["role3"]));

    let newton = &users[2];
    assert!(newton.groups.is_empty());
    assert!(newton.roles.is_empty());

    let json = serde_json::to_value(&users).unwrap();
    assert_eq!(json[0]["username"], "euler");
    assert_eq!(json[2]["roles"], serde_json::json!([]));
}

#[tokio::test]
async fn test_export_returns_processed_users_when_directory_fails() {
    let dir = directory();
    let realm = provider(&dir);

    // User listing, then groups of euler and gauss; newton's lookup fails
    dir.fail_searches_after(Some(3));
    let users = realm.users_metadata().await;

    let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["euler", "gauss"]);
}

#[tokio::test]
async fn test_export_skips_entries_without_identifier() {
    let dir = directory();
    dir.add_entry(
        DirectoryEntry::new("cn=orphan,ou=people,dc=example,dc=com")
            .with_attr("objectClass", "person"),
    );
    let realm = provider(&dir);

    let users = realm.list_all_users_with_groups_and_roles().await;
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn test_test_connection_reads_root_dse() {
    let dir = directory();
    dir.set_root_dse(
        DirectoryEntry::new("")
            .with_attr("objectClass", "top")
            .with_attr("vendorName", "Example Directory")
            .with_attr("namingContexts", BASE)
            .with_attr("supportedLDAPVersion", "3"),
    );
    let realm = provider(&dir);

    let info = realm.test_connection().await.unwrap();
    assert_eq!(info.vendor.as_deref(), Some("Example Directory"));
    assert_eq!(info.naming_contexts, vec![BASE.to_string()]);
    assert_eq!(info.supported_ldap_version, vec!["3".to_string()]);

    let status = realm.status().await;
    assert!(status.connected);
    assert_eq!(status.server, "memory://");
    assert_eq!(dir.stats().sessions_closed, dir.stats().sessions_opened);
}

#[tokio::test]
async fn test_provider_from_config() {
    let config = RealmGateConfig::from_toml(
        r#"
[directory]
enabled = true

[realm]
search_base = "dc=example,dc=com"
group_search_base = "ou=groups,dc=example,dc=com"

[realm.group_roles_map]
"grp-A" = "role1, role2"
"ou=grp-B,ou=groups,dc=example,dc=com" = "role3"

[roles]
role2 = "sparql:query:select"

[cache]
enabled = true
ttl_seconds = 60
"#,
    )
    .unwrap();

    let dir = directory();
    let realm = DirectoryAuthProvider::from_config_with_connector(&config, Arc::new(dir.clone()))
        .with_name("directory");

    assert!(realm.is_enabled());
    assert_eq!(realm.name(), "directory");
    assert_eq!(realm.settings().group_search_base, "ou=groups,dc=example,dc=com");

    let info = realm.fetch_authorization(&Principal::new("euler")).await;
    assert_eq!(info.roles, roles(&["role1", "role2", "role3"]));
    assert!(info.has_permission("sparql:query:select"));
    assert_eq!(realm.cache().len(), 1);
}

#[tokio::test]
async fn test_disabled_realm() {
    let config = RealmGateConfig::from_toml(
        r#"
[realm]
search_base = "dc=example,dc=com"
"#,
    )
    .unwrap();

    let dir = directory();
    let realm = DirectoryAuthProvider::from_config_with_connector(&config, Arc::new(dir.clone()));
    let euler = Principal::new("euler");

    assert!(!realm.is_enabled());
    let result = realm.authenticate(&euler, &Credential::new("password")).await;
    assert!(matches!(result, Err(AuthError::Disabled(_))));
    assert!(realm.fetch_authorization(&euler).await.is_empty());
    assert!(realm.users_metadata().await.is_empty());
    assert_eq!(dir.stats().sessions_opened, 0);
}
