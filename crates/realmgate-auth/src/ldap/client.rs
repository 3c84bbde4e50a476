//! LDAP Client implementation
//!
//! Opens `ldap3` connections, binds with the system account and runs
//! searches and user binds for the realm. Supports LDAP, LDAPS (SSL) and
//! STARTTLS connections.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use realmgate_core::config::DirectoryConfig;
use realmgate_core::types::Credential;
use tracing::debug;

use super::types::LdapSettings;
use crate::directory::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchFilter, SearchScope};
use crate::error::{DirectoryError, DirectoryResult, RC_INVALID_CREDENTIALS};

/// Connector for a real LDAP server
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    settings: LdapSettings,
}

impl LdapDirectory {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(LdapSettings::from(config))
    }

    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }

    /// Create LDAP connection with proper TLS settings
    async fn connect(&self) -> DirectoryResult<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.timeout)
            .set_starttls(self.settings.start_tls)
            .set_no_tls_verify(self.settings.skip_tls_verify);

        debug!("Connecting to LDAP server: {}", self.settings.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.settings.server_url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        ldap3::drive!(conn);
        Ok(ldap)
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectory {
    async fn open(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        let ldap = self.connect().await?;
        let mut session = LdapSession {
            ldap,
            timeout: self.settings.timeout,
            closed: false,
        };

        if let (Some(dn), Some(password)) = (
            &self.settings.system_username,
            &self.settings.system_password,
        ) {
            if let Err(e) = session.bind(dn, &Credential::new(password.as_str())).await {
                let _ = session.close().await;
                return Err(e);
            }
        }

        Ok(Box::new(session))
    }

    fn describe(&self) -> String {
        self.settings.server_url.clone()
    }
}

/// One `ldap3` connection
pub struct LdapSession {
    ldap: Ldap,
    timeout: std::time::Duration,
    closed: bool,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }

        let search_error = |e: LdapError| DirectoryError::Search {
            base: base.to_string(),
            message: e.to_string(),
        };

        let (rs, _res) = self
            .ldap
            .with_timeout(self.timeout)
            .search(base, to_ldap_scope(scope), &filter.render(), attributes.to_vec())
            .await
            .map_err(search_error)?
            .success()
            .map_err(search_error)?;

        Ok(rs
            .into_iter()
            .map(|result| {
                let entry = SearchEntry::construct(result);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn bind(&mut self, dn: &str, credential: &Credential) -> DirectoryResult<()> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }

        let result = self
            .ldap
            .with_timeout(self.timeout)
            .simple_bind(dn, credential.expose())
            .await
            .map_err(|e| DirectoryError::Connection(format!("Bind failed: {}", e)))?;

        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(DirectoryError::InvalidCredentials(dn.to_string())),
            rc => Err(DirectoryError::Bind {
                dn: dn.to_string(),
                rc,
                message: result.text,
            }),
        }
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }
        self.closed = true;
        self.ldap.unbind().await?;
        Ok(())
    }
}

fn to_ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}
