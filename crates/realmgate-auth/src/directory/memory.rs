//! In-memory directory
//!
//! Holds entries in insertion order and evaluates rendered filters with
//! [`FilterExpr`], so searches behave like a small LDAP server: escaped
//! values stay literal, first inserted match is returned first, and an empty
//! bind password is an anonymous bind. Supports failure injection and counts
//! sessions so tests can check that every opened session is closed.

use async_trait::async_trait;
use parking_lot::RwLock;
use realmgate_core::types::Credential;
use std::sync::Arc;
use tracing::debug;

use super::{in_scope, DirectoryConnector, DirectoryEntry, DirectorySession, FilterExpr, SearchFilter, SearchScope};
use crate::error::{DirectoryError, DirectoryResult};

/// Directory backed by a vector of entries
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    entries: Vec<StoredEntry>,
    root_dse: Option<DirectoryEntry>,
    unreachable: bool,
    /// Searches allowed before every further search fails
    search_budget: Option<usize>,
    stats: DirectoryStats,
}

struct StoredEntry {
    entry: DirectoryEntry,
    password: Option<String>,
}

/// Session and operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub searches: usize,
    pub binds: usize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary entry
    pub fn add_entry(&self, entry: DirectoryEntry) -> &Self {
        self.state.write().entries.push(StoredEntry {
            entry,
            password: None,
        });
        self
    }

    /// Add a `person` entry with a `uid` and a bind password
    pub fn add_user(&self, dn: &str, uid: &str, password: &str) -> &Self {
        let entry = DirectoryEntry::new(dn)
            .with_attr("objectClass", "top")
            .with_attr("objectClass", "person")
            .with_attr("uid", uid);
        self.add_user_entry(entry, password)
    }

    /// Add a prepared user entry with a bind password
    pub fn add_user_entry(&self, entry: DirectoryEntry, password: &str) -> &Self {
        self.state.write().entries.push(StoredEntry {
            entry,
            password: Some(password.to_string()),
        });
        self
    }

    /// Add a group entry with `member` values
    pub fn add_group(&self, dn: &str, id_attribute: &str, id: &str, members: &[&str]) -> &Self {
        let mut entry = DirectoryEntry::new(dn)
            .with_attr("objectClass", "groupOfNames")
            .with_attr(id_attribute, id);
        for member in members {
            entry = entry.with_attr("member", *member);
        }
        self.add_entry(entry)
    }

    /// Entry answered for base-scope searches of the empty DN
    pub fn set_root_dse(&self, entry: DirectoryEntry) -> &Self {
        self.state.write().root_dse = Some(entry);
        self
    }

    /// Make every `open` fail
    pub fn set_unreachable(&self, unreachable: bool) -> &Self {
        self.state.write().unreachable = unreachable;
        self
    }

    /// Let `count` more searches succeed, fail every one after that.
    /// `None` removes the limit.
    pub fn fail_searches_after(&self, count: Option<usize>) -> &Self {
        self.state.write().search_budget = count;
        self
    }

    pub fn stats(&self) -> DirectoryStats {
        self.state.read().stats
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    async fn open(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        let mut state = self.state.write();
        if state.unreachable {
            return Err(DirectoryError::Connection(
                "in-memory directory is unreachable".to_string(),
            ));
        }
        state.stats.sessions_opened += 1;

        Ok(Box::new(MemorySession {
            state: self.state.clone(),
            closed: false,
        }))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

struct MemorySession {
    state: Arc<RwLock<State>>,
    closed: bool,
}

#[async_trait]
impl DirectorySession for MemorySession {
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

        let mut state = self.state.write();
        state.stats.searches += 1;

        if let Some(budget) = state.search_budget.as_mut() {
            if *budget == 0 {
                return Err(DirectoryError::Search {
                    base: base.to_string(),
                    message: "in-memory directory is unreachable".to_string(),
                });
            }
            *budget -= 1;
        }

        let expr = FilterExpr::parse(&filter.render())?;
        debug!(base, filter = %filter, "in-memory search");

        if base.is_empty() && scope == SearchScope::Base {
            return Ok(state
                .root_dse
                .iter()
                .filter(|e| expr.matches(e))
                .map(|e| project(e, attributes))
                .collect());
        }

        Ok(state
            .entries
            .iter()
            .map(|stored| &stored.entry)
            .filter(|e| in_scope(&e.dn, base, scope) && expr.matches(e))
            .map(|e| project(e, attributes))
            .collect())
    }

    async fn bind(&mut self, dn: &str, credential: &Credential) -> DirectoryResult<()> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }

        let mut state = self.state.write();
        state.stats.binds += 1;

        // Unauthenticated simple bind, accepted like most servers do
        if credential.is_empty() {
            return Ok(());
        }

        let accepted = state.entries.iter().any(|stored| {
            stored.entry.dn.eq_ignore_ascii_case(dn)
                && stored.password.as_deref() == Some(credential.expose())
        });

        if accepted {
            Ok(())
        } else {
            Err(DirectoryError::InvalidCredentials(dn.to_string()))
        }
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }
        self.closed = true;
        self.state.write().stats.sessions_closed += 1;
        Ok(())
    }
}

fn project(entry: &DirectoryEntry, attributes: &[&str]) -> DirectoryEntry {
    if attributes.is_empty() {
        return entry.clone();
    }

    DirectoryEntry {
        dn: entry.dn.clone(),
        attrs: entry
            .attrs
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}
