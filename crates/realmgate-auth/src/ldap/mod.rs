//! LDAP/Active Directory client
//!
//! Connects to:
//! - LDAP (OpenLDAP, 389 Directory Server)
//! - Microsoft Active Directory
//!
//! over plain LDAP, LDAPS or STARTTLS. Connection handling, TLS and
//! timeouts are delegated to `ldap3`.

mod client;
mod types;

pub use client::{LdapDirectory, LdapSession};
pub use types::*;
