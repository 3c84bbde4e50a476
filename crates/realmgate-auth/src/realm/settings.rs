//! Resolved realm settings

use realmgate_core::config::{DirectoryServerType, RealmConfig};

/// Where users and groups live and which attributes identify them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmSettings {
    /// Root node for user searches
    pub search_base: String,
    /// Root node for group searches
    pub group_search_base: String,
    pub user_object_class: String,
    pub user_identifier_attribute: String,
    pub group_member_attribute: String,
    pub group_identifier_attribute: String,
}

impl RealmSettings {
    /// Generic LDAP defaults: `person`, `uid`, `member`, `ou`.
    /// Groups are searched under the user search base.
    pub fn new(search_base: impl Into<String>) -> Self {
        let search_base = search_base.into();
        let server_type = DirectoryServerType::Ldap;

        Self {
            group_search_base: search_base.clone(),
            search_base,
            user_object_class: server_type.default_user_object_class().to_string(),
            user_identifier_attribute: server_type.default_user_identifier_attribute().to_string(),
            group_member_attribute: server_type.default_group_member_attribute().to_string(),
            group_identifier_attribute: server_type.default_group_identifier_attribute().to_string(),
        }
    }

    /// Resolve unset attributes from the server type defaults
    pub fn from_config(config: &RealmConfig, server_type: DirectoryServerType) -> Self {
        let pick = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
                .to_string()
        };

        Self {
            search_base: config.search_base.clone(),
            group_search_base: config.group_search_base().to_string(),
            user_object_class: pick(
                &config.user_object_class,
                server_type.default_user_object_class(),
            ),
            user_identifier_attribute: pick(
                &config.user_identifier_attribute,
                server_type.default_user_identifier_attribute(),
            ),
            group_member_attribute: pick(
                &config.group_member_attribute,
                server_type.default_group_member_attribute(),
            ),
            group_identifier_attribute: pick(
                &config.group_identifier_attribute,
                server_type.default_group_identifier_attribute(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_defaults() {
        let settings = RealmSettings::new("dc=example,dc=com");

        assert_eq!(settings.group_search_base, "dc=example,dc=com");
        assert_eq!(settings.user_object_class, "person");
        assert_eq!(settings.user_identifier_attribute, "uid");
        assert_eq!(settings.group_member_attribute, "member");
        assert_eq!(settings.group_identifier_attribute, "ou");
    }

    #[test]
    fn test_active_directory_defaults() {
        let config = RealmConfig {
            search_base: "dc=corp,dc=example,dc=com".to_string(),
            group_identifier_attribute: Some("name".to_string()),
            ..Default::default()
        };

        let settings = RealmSettings::from_config(&config, DirectoryServerType::ActiveDirectory);

        assert_eq!(settings.user_object_class, "user");
        assert_eq!(settings.user_identifier_attribute, "sAMAccountName");
        assert_eq!(settings.group_identifier_attribute, "name");
        assert_eq!(settings.group_search_base, "dc=corp,dc=example,dc=com");
    }
}
