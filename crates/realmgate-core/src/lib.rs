//! RealmGate Core Library
//!
//! Configuration, error types and domain types shared by the directory
//! realm and the operator CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::RealmGateConfig;
pub use error::{Error, Result};

/// RealmGate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Delimiter between role names in the group roles map and between
/// permissions in the role registry
pub const LIST_DELIMITER: char = ',';

/// Prefix of every environment variable read by [`RealmGateConfig::apply_env`]
pub const ENV_PREFIX: &str = "REALMGATE_";
