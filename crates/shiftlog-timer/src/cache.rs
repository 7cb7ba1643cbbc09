use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shiftlog_core::config::DEFAULT_CACHE_TTL_MS;
use shiftlog_core::types::{format_timestamp, LogId, UserId};
use shiftlog_core::Clock;
use tracing::debug;

/// Identifies one cached read. Renders as the composite string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `settings:<user_id>`
    Settings(UserId),
    /// `current-log:<user_id>`
    CurrentLog(UserId),
    /// `tasks:<log_id>`
    Tasks(LogId),
    /// `logs:<user_id>:<start>:<end>`; an open bound renders empty.
    Logs {
        user: UserId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Settings(user) => write!(f, "settings:{user}"),
            CacheKey::CurrentLog(user) => write!(f, "current-log:{user}"),
            CacheKey::Tasks(log_id) => write!(f, "tasks:{log_id}"),
            CacheKey::Logs { user, start, end } => {
                let bound = |b: &Option<DateTime<Utc>>| b.map(format_timestamp).unwrap_or_default();
                write!(f, "logs:{user}:{}:{}", bound(start), bound(end))
            }
        }
    }
}

struct Entry {
    value: Box<dyn Any + Send>,
    inserted_at: DateTime<Utc>,
}

/// Short-lived memo of store reads, owned by a single request.
///
/// An entry younger than the TTL is returned without calling the loader;
/// anything older is reloaded and overwritten in place. Writes never
/// invalidate entries, and nothing is evicted. Loader errors are not cached.
pub struct RequestCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: HashMap<String, Entry>,
}

impl RequestCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::milliseconds(DEFAULT_CACHE_TTL_MS))
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached value for `key`, or run `load` and remember its result.
    ///
    /// An entry stored under a different type is treated as a miss.
    pub fn get_or_load<T, E, F>(&mut self, key: &CacheKey, load: F) -> Result<T, E>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let key = key.to_string();
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(&key) {
            if now - entry.inserted_at < self.ttl {
                if let Some(value) = entry.value.downcast_ref::<T>() {
                    debug!(key = %key, "request cache hit");
                    return Ok(value.clone());
                }
            }
        }

        let value = load()?;
        self.entries.insert(
            key,
            Entry {
                value: Box::new(value.clone()),
                inserted_at: self.clock.now(),
            },
        );
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shiftlog_core::ManualClock;
    use std::cell::Cell;

    fn setup() -> (Arc<ManualClock>, RequestCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap(),
        ));
        let cache = RequestCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn keys_render_as_composite_strings() {
        let user = UserId::from("u-1");
        assert_eq!(CacheKey::Settings(user.clone()).to_string(), "settings:u-1");
        assert_eq!(CacheKey::CurrentLog(user.clone()).to_string(), "current-log:u-1");
        assert_eq!(CacheKey::Tasks(7).to_string(), "tasks:7");
        let start = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        assert_eq!(
            CacheKey::Logs {
                user,
                start: Some(start),
                end: None
            }
            .to_string(),
            "logs:u-1:2026-02-02T00:00:00.000Z:"
        );
    }

    #[test]
    fn second_lookup_within_ttl_skips_loader() {
        let (clock, mut cache) = setup();
        let key = CacheKey::Settings("u".into());
        let loads = Cell::new(0);
        let load = || -> Result<u32, ()> {
            loads.set(loads.get() + 1);
            Ok(loads.get())
        };

        assert_eq!(cache.get_or_load(&key, load), Ok(1));
        clock.advance_millis(4_999);
        assert_eq!(cache.get_or_load(&key, load), Ok(1));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn lookup_at_ttl_reloads() {
        let (clock, mut cache) = setup();
        let key = CacheKey::Tasks(1);
        let loads = Cell::new(0);
        let load = || -> Result<u32, ()> {
            loads.set(loads.get() + 1);
            Ok(loads.get())
        };

        cache.get_or_load(&key, load).unwrap();
        clock.advance_millis(5_000);
        assert_eq!(cache.get_or_load(&key, load), Ok(2));
        // superseded in place, not duplicated
        assert_eq!(cache.len(), 1);
        clock.advance_millis(1_000);
        assert_eq!(cache.get_or_load(&key, load), Ok(2));
    }

    #[test]
    fn errors_are_not_cached() {
        let (_clock, mut cache) = setup();
        let key = CacheKey::CurrentLog("u".into());
        let failed: Result<u32, &str> = cache.get_or_load(&key, || Err("offline"));
        assert_eq!(failed, Err("offline"));
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_load(&key, || Ok::<_, &str>(5)), Ok(5));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let (_clock, mut cache) = setup();
        let a = CacheKey::Tasks(1);
        let b = CacheKey::Tasks(2);
        cache.get_or_load(&a, || Ok::<_, ()>("one".to_string())).unwrap();
        let got = cache.get_or_load(&b, || Ok::<_, ()>("two".to_string())).unwrap();
        assert_eq!(got, "two");
    }

    #[test]
    fn type_mismatch_counts_as_miss() {
        let (_clock, mut cache) = setup();
        let key = CacheKey::Tasks(1);
        cache.get_or_load(&key, || Ok::<_, ()>(1u32)).unwrap();
        let s = cache.get_or_load(&key, || Ok::<_, ()>("s".to_string())).unwrap();
        assert_eq!(s, "s");
    }
}
