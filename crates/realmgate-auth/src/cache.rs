//! Authorization cache
//!
//! The realm reads through and writes to an [`AuthorizationCache`] keyed by
//! principal. Expiry and invalidation are the cache's business; the realm
//! only calls `get` and `put`.

use parking_lot::RwLock;
use realmgate_core::config::CacheConfig;
use realmgate_core::types::{AuthorizationInfo, Principal};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Thread-safe store of authorization results
pub trait AuthorizationCache: Send + Sync {
    fn get(&self, principal: &Principal) -> Option<AuthorizationInfo>;

    fn put(&self, principal: &Principal, info: AuthorizationInfo);

    fn invalidate(&self, principal: &Principal);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the cache described by the configuration
pub fn from_config(config: &CacheConfig) -> Arc<dyn AuthorizationCache> {
    if !config.enabled {
        return Arc::new(NoopAuthorizationCache);
    }

    let ttl = (config.ttl_seconds > 0).then(|| Duration::from_secs(config.ttl_seconds));
    Arc::new(InMemoryAuthorizationCache::new(ttl, config.max_entries))
}

struct CachedAuthorization {
    info: AuthorizationInfo,
    cached_at: Instant,
}

/// In-process cache with optional TTL and size bound
pub struct InMemoryAuthorizationCache {
    entries: RwLock<HashMap<Principal, CachedAuthorization>>,
    ttl: Option<Duration>,
    max_entries: usize,
}

impl InMemoryAuthorizationCache {
    /// `ttl` of `None` keeps entries until invalidated; `max_entries` of 0
    /// means unbounded
    pub fn new(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    fn is_fresh(&self, cached: &CachedAuthorization) -> bool {
        self.ttl
            .map(|ttl| cached.cached_at.elapsed() < ttl)
            .unwrap_or(true)
    }

    fn make_room(&self, entries: &mut HashMap<Principal, CachedAuthorization>) {
        if self.ttl.is_some() {
            entries.retain(|_, cached| self.is_fresh(cached));
        }

        if self.max_entries == 0 {
            return;
        }

        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.cached_at)
                .map(|(principal, _)| principal.clone());
            match oldest {
                Some(principal) => {
                    debug!("Evicting cached authorization for {}", principal);
                    entries.remove(&principal);
                }
                None => break,
            }
        }
    }
}

impl Default for InMemoryAuthorizationCache {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

impl AuthorizationCache for InMemoryAuthorizationCache {
    fn get(&self, principal: &Principal) -> Option<AuthorizationInfo> {
        let entries = self.entries.read();
        entries
            .get(principal)
            .filter(|cached| self.is_fresh(cached))
            .map(|cached| cached.info.clone())
    }

    fn put(&self, principal: &Principal, info: AuthorizationInfo) {
        let mut entries = self.entries.write();
        // An overwrite must not evict another principal
        entries.remove(principal);
        self.make_room(&mut entries);
        entries.insert(
            principal.clone(),
            CachedAuthorization {
                info,
                cached_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, principal: &Principal) {
        self.entries.write().remove(principal);
    }

    fn clear(&self) {
        self.entries.write().clear();
        info!("Authorization cache cleared");
    }

    /// Fresh entries only
    fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|cached| self.is_fresh(cached))
            .count()
    }
}

/// Cache that stores nothing, used when caching is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthorizationCache;

impl AuthorizationCache for NoopAuthorizationCache {
    fn get(&self, _principal: &Principal) -> Option<AuthorizationInfo> {
        None
    }

    fn put(&self, _principal: &Principal, _info: AuthorizationInfo) {}

    fn invalidate(&self, _principal: &Principal) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(role: &str) -> AuthorizationInfo {
        AuthorizationInfo::new([role.to_string()].into_iter().collect(), Default::default())
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = InMemoryAuthorizationCache::default();
        let euler = Principal::new("euler");

        assert!(cache.get(&euler).is_none());
        cache.put(&euler, info("admin"));
        assert!(cache.get(&euler).unwrap().has_role("admin"));
        assert_eq!(cache.len(), 1);

        cache.invalidate(&euler);
        assert!(cache.get(&euler).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = InMemoryAuthorizationCache::new(Some(Duration::from_millis(20)), 0);
        let euler = Principal::new("euler");

        cache.put(&euler, info("admin"));
        assert!(cache.get(&euler).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&euler).is_none());
    }

    #[test]
    fn test_expired_entries_are_dropped_on_put() {
        let cache = InMemoryAuthorizationCache::new(Some(Duration::from_millis(20)), 0);

        for i in 0..100 {
            cache.put(&Principal::new(format!("user{}", i)), info("r"));
        }
        assert_eq!(cache.len(), 100);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.len(), 0);

        cache.put(&Principal::new("euler"), info("admin"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entries.read().len(), 1);
    }

    #[test]
    fn test_size_bound_evicts_oldest() {
        let cache = InMemoryAuthorizationCache::new(None, 2);

        cache.put(&Principal::new("a"), info("r"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put(&Principal::new("b"), info("r"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put(&Principal::new("c"), info("r"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&Principal::new("a")).is_none());
        assert!(cache.get(&Principal::new("c")).is_some());

        // Overwriting an existing key does not evict
        cache.put(&Principal::new("b"), info("s"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&Principal::new("c")).is_some());
    }

    #[test]
    fn test_from_config() {
        let disabled = from_config(&CacheConfig {
            enabled: false,
            ..Default::default()
        });
        disabled.put(&Principal::new("euler"), info("admin"));
        assert!(disabled.get(&Principal::new("euler")).is_none());

        let enabled = from_config(&CacheConfig::default());
        enabled.put(&Principal::new("euler"), info("admin"));
        assert!(enabled.get(&Principal::new("euler")).is_some());
    }
}
