//! Directory-backed authentication for RealmGate
//!
//! Authenticates principals against an LDAP or Active Directory server and
//! maps the groups they belong to onto application roles and permissions.

pub mod cache;
pub mod directory;
pub mod error;
pub mod ldap;
pub mod metrics;
pub mod realm;
pub mod roles;

pub use cache::{AuthorizationCache, InMemoryAuthorizationCache, NoopAuthorizationCache};
pub use directory::memory::InMemoryDirectory;
pub use directory::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchFilter, SearchScope};
pub use error::{AuthError, AuthResult, DirectoryError, DirectoryResult};
pub use ldap::{DirectoryServerInfo, LdapDirectory, LdapSettings, RealmStatus};
pub use realm::{DirectoryAuthProvider, Realm, RealmChain, RealmSettings, UserMetadataProvider};
pub use roles::{GroupRolesMap, RolePermissionRegistry, StaticRoleRegistry};
