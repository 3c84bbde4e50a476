//! Core types for RealmGate

mod authorization;
mod principal;
mod user;

pub use authorization::*;
pub use principal::*;
pub use user::*;
