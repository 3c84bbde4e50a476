//! Realm metrics
//!
//! Recorded through the `metrics` facade; the hosting process decides
//! whether and where to export them.

use metrics::counter;

/// Metric names
pub mod names {
    pub const AUTHENTICATIONS_TOTAL: &str = "realmgate_authentications_total";
    pub const AUTHORIZATION_LOOKUPS_TOTAL: &str = "realmgate_authorization_lookups_total";
    pub const CACHE_HITS_TOTAL: &str = "realmgate_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "realmgate_cache_misses_total";
    pub const DIRECTORY_ERRORS_TOTAL: &str = "realmgate_directory_errors_total";
}

pub fn record_authentication(realm: &str, outcome: &'static str) {
    counter!(names::AUTHENTICATIONS_TOTAL, "realm" => realm.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_authorization_lookup(realm: &str, cache_hit: bool) {
    counter!(names::AUTHORIZATION_LOOKUPS_TOTAL, "realm" => realm.to_string()).increment(1);
    if cache_hit {
        counter!(names::CACHE_HITS_TOTAL, "realm" => realm.to_string()).increment(1);
    } else {
        counter!(names::CACHE_MISSES_TOTAL, "realm" => realm.to_string()).increment(1);
    }
}

pub fn record_directory_error(realm: &str, operation: &'static str) {
    counter!(names::DIRECTORY_ERRORS_TOTAL, "realm" => realm.to_string(), "operation" => operation)
        .increment(1);
}
