//! Directory client abstraction
//!
//! The realm never talks to a concrete directory server. It opens a
//! [`DirectorySession`] through a [`DirectoryConnector`], runs searches and
//! binds on it, and closes it before returning. Implementations:
//! - [`crate::ldap::LdapDirectory`] for real LDAP/Active Directory servers
//! - [`memory::InMemoryDirectory`] for tests and local development

pub mod filter;
pub mod memory;

use async_trait::async_trait;
use realmgate_core::types::Credential;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DirectoryResult;

pub use filter::{FilterExpr, SearchFilter};

/// Search scope relative to the search base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// The base entry only
    Base,
    /// Direct children of the base
    OneLevel,
    /// The base and everything below it
    Subtree,
}

/// An entry returned by a search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name
    pub dn: String,

    /// Attribute name to values
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Add a value to an attribute, builder style
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    /// All values of an attribute. Attribute names compare case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

/// Opens sessions against a directory server
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Open a session bound as the configured system account
    /// (anonymous when none is configured)
    async fn open(&self) -> DirectoryResult<Box<dyn DirectorySession>>;

    /// Human readable location of the server, e.g. its URL
    fn describe(&self) -> String;
}

/// One connection to the directory server
#[async_trait]
pub trait DirectorySession: Send {
    /// Search below `base`. `attributes` limits the returned attributes;
    /// empty means all user attributes.
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Re-bind the session with the given DN and credential
    async fn bind(&mut self, dn: &str, credential: &Credential) -> DirectoryResult<()>;

    /// Release the session. Further calls fail.
    async fn close(&mut self) -> DirectoryResult<()>;
}

/// Returns true if `dn` lies within `scope` of `base`
pub fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    let dn = dn.trim().to_ascii_lowercase();
    let base = base.trim().to_ascii_lowercase();

    match scope {
        SearchScope::Base => dn == base,
        SearchScope::OneLevel => parent_dn(&dn).map(|p| p == base).unwrap_or(false),
        SearchScope::Subtree => {
            base.is_empty() || dn == base || dn.ends_with(&format!(",{}", base))
        }
    }
}

fn parent_dn(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return Some(&dn[i + 1..]),
            _ => escaped = false,
        }
    }
    // A single-RDN entry sits directly under the root
    if dn.is_empty() {
        None
    } else {
        Some("")
    }
}
