//! Directory and authentication error types

use thiserror::Error;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Result type for realm operations
pub type AuthResult<T> = Result<T, AuthError>;

/// LDAP result code for a failed simple bind
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Errors raised by a directory client
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Failed to connect to directory server: {0}")]
    Connection(String),

    #[error("Invalid credentials for {0}")]
    InvalidCredentials(String),

    #[error("Bind failed for {dn} with code {rc}: {message}")]
    Bind {
        dn: String,
        rc: u32,
        message: String,
    },

    #[error("Search in {base} failed: {message}")]
    Search { base: String, message: String },

    #[error("Malformed search filter: {0}")]
    Filter(String),

    #[error("Directory session already closed")]
    SessionClosed,

    #[error("Directory error: {0}")]
    Ldap(#[from] ldap3::LdapError),
}

impl DirectoryError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, DirectoryError::InvalidCredentials(_))
    }
}

/// Reasons an authentication attempt is denied
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Realm {0} is disabled")]
    Disabled(String),

    #[error("Principal not found in directory: {0}")]
    UnknownPrincipal(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl AuthError {
    /// Short label used for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::Disabled(_) => "disabled",
            AuthError::UnknownPrincipal(_) => "unknown_principal",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Directory(_) => "directory_error",
        }
    }
}
