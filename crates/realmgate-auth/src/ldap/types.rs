//! LDAP connection settings and status types

use realmgate_core::config::DirectoryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Settings for opening LDAP connections
#[derive(Clone)]
pub struct LdapSettings {
    /// LDAP server URL (ldap:// or ldaps://)
    pub server_url: String,

    /// Upgrade plain connections with STARTTLS
    pub start_tls: bool,

    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,

    /// System account DN; anonymous when unset
    pub system_username: Option<String>,

    pub system_password: Option<String>,

    /// Applied to connect and to every operation
    pub timeout: Duration,
}

impl fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSettings")
            .field("server_url", &self.server_url)
            .field("start_tls", &self.start_tls)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("system_username", &self.system_username)
            .field("system_password", &self.system_password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&DirectoryConfig> for LdapSettings {
    fn from(config: &DirectoryConfig) -> Self {
        Self {
            server_url: config.server_url.clone(),
            start_tls: config.start_tls,
            skip_tls_verify: config.skip_tls_verify,
            system_username: config.system_username.clone(),
            system_password: config.system_password.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Root DSE information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryServerInfo {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub naming_contexts: Vec<String>,
    pub supported_ldap_version: Vec<String>,
}

/// Realm health as reported to operators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmStatus {
    /// Realm name
    pub name: String,

    /// Whether the realm is enabled
    pub enabled: bool,

    /// Whether a system session could be opened
    pub connected: bool,

    /// Server location
    pub server: String,

    /// Time of the check
    pub checked_at: String,

    /// Error message if the connection failed
    pub error: Option<String>,

    /// Principals with a cached authorization
    pub cached_authorizations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_debug_hides_password() {
        let config = DirectoryConfig {
            system_username: Some("cn=admin,dc=example,dc=com".to_string()),
            system_password: Some("secret".to_string()),
            ..Default::default()
        };

        let settings = LdapSettings::from(&config);
        let debug = format!("{:?}", settings);

        assert!(debug.contains("cn=admin"));
        assert!(!debug.contains("secret"));
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }
}
