//! Configuration for RealmGate
//!
//! Loaded once at startup from a TOML file, then overridden from
//! `REALMGATE_*` environment variables. Read-only afterwards.
//!
//! Example:
//! ```toml
//! [directory]
//! enabled = true
//! server_url = "ldap://ldap.example.com:389"
//! system_username = "cn=admin,dc=example,dc=com"
//! system_password = "secret"
//!
//! [realm]
//! search_base = "dc=example,dc=com"
//! group_search_base = "ou=groups,dc=example,dc=com"
//!
//! [realm.group_roles_map]
//! "mathematicians" = "admin,editor"
//! "ou=scientists,dc=example,dc=com" = "guest"
//!
//! [roles]
//! admin = "*"
//! guest = "sparql:query:select,pages:view"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmGateConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub realm: RealmConfig,

    /// Role name to comma-delimited permission list
    #[serde(default)]
    pub roles: BTreeMap<String, String>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RealmGateConfig {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| crate::Error::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `REALMGATE_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(format!("{}{}", crate::ENV_PREFIX, name)).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("LDAP_URL") {
            self.directory.enabled = true;
            self.directory.server_url = url;
        }
        if let Some(v) = var("LDAP_START_TLS") {
            self.directory.start_tls = v == "true";
        }
        if let Some(user) = var("LDAP_SYSTEM_USERNAME") {
            self.directory.system_username = Some(user);
        }
        if let Some(password) = var("LDAP_SYSTEM_PASSWORD") {
            self.directory.system_password = Some(password);
        }
        if let Some(timeout) = var("LDAP_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                self.directory.timeout_seconds = t;
            }
        }
        if let Some(base) = var("SEARCH_BASE") {
            self.realm.search_base = base;
        }
        if let Some(base) = var("GROUP_SEARCH_BASE") {
            self.realm.group_search_base = Some(base);
        }
        if let Some(ttl) = var("CACHE_TTL_SECONDS") {
            if let Ok(t) = ttl.parse() {
                self.cache.ttl_seconds = t;
            }
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.directory.validate()?;
        if self.directory.enabled && self.realm.search_base.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "realm.search_base is required".into(),
            ));
        }
        Ok(())
    }
}

/// Directory server type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryServerType {
    /// Generic LDAP server
    #[default]
    Ldap,
    /// Microsoft Active Directory
    ActiveDirectory,
    /// OpenLDAP
    OpenLdap,
}

impl DirectoryServerType {
    pub fn default_user_object_class(&self) -> &'static str {
        match self {
            DirectoryServerType::ActiveDirectory => "user",
            DirectoryServerType::OpenLdap => "inetOrgPerson",
            DirectoryServerType::Ldap => "person",
        }
    }

    pub fn default_user_identifier_attribute(&self) -> &'static str {
        match self {
            DirectoryServerType::ActiveDirectory => "sAMAccountName",
            _ => "uid",
        }
    }

    pub fn default_group_member_attribute(&self) -> &'static str {
        "member"
    }

    pub fn default_group_identifier_attribute(&self) -> &'static str {
        match self {
            DirectoryServerType::Ldap => "ou",
            _ => "cn",
        }
    }
}

/// Directory connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Enable the directory realm
    #[serde(default)]
    pub enabled: bool,

    /// LDAP server URL (ldap:// or ldaps://)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Use STARTTLS for connection upgrade
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// DN of the system account used for searches. Anonymous when unset.
    #[serde(default)]
    pub system_username: Option<String>,

    /// Password of the system account
    #[serde(default)]
    pub system_password: Option<String>,

    /// Connect and operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Server type hint, selects attribute defaults
    #[serde(default)]
    pub server_type: DirectoryServerType,
}

fn default_server_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: default_server_url(),
            start_tls: false,
            skip_tls_verify: false,
            system_username: None,
            system_password: None,
            timeout_seconds: default_timeout(),
            server_type: DirectoryServerType::default(),
        }
    }
}

impl DirectoryConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.server_url.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "directory.server_url is required".into(),
            ));
        }

        if !self.server_url.starts_with("ldap://") && !self.server_url.starts_with("ldaps://") {
            return Err(crate::Error::InvalidConfig(
                "directory.server_url must start with ldap:// or ldaps://".into(),
            ));
        }

        if self.system_username.is_some() && self.system_password.is_none() {
            return Err(crate::Error::InvalidConfig(
                "directory.system_password is required when system_username is set".into(),
            ));
        }

        Ok(())
    }
}

/// Realm settings: where users and groups live and how groups map to roles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmConfig {
    /// Root node for user searches, e.g. "dc=example,dc=com"
    #[serde(default)]
    pub search_base: String,

    /// Root node for group searches. Falls back to `search_base`.
    #[serde(default)]
    pub group_search_base: Option<String>,

    /// ObjectClass identifying user entries
    #[serde(default)]
    pub user_object_class: Option<String>,

    /// Attribute holding the unique user id
    #[serde(default)]
    pub user_identifier_attribute: Option<String>,

    /// Attribute connecting a group to a member DN
    #[serde(default)]
    pub group_member_attribute: Option<String>,

    /// Attribute holding the short group id
    #[serde(default)]
    pub group_identifier_attribute: Option<String>,

    /// Group key (full DN or short id) to comma-delimited role names
    #[serde(default)]
    pub group_roles_map: BTreeMap<String, String>,
}

impl RealmConfig {
    pub fn group_search_base(&self) -> &str {
        self.group_search_base
            .as_deref()
            .unwrap_or(&self.search_base)
    }
}

/// Authorization cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds, 0 keeps entries until invalidated
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Upper bound on cached principals, 0 for unbounded
    #[serde(default)]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            max_entries: 0,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
