use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

type Slot<V> = Arc<tokio::sync::Mutex<Option<CacheEntry<V>>>>;

/// Read-through cache with a fixed time-to-live.
///
/// Each key owns an async slot; a caller holds the slot for the whole
/// check/fetch/populate sequence, so concurrent callers for one key wait for a
/// single fetch. Failed fetches are not stored. A zero TTL disables caching.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slots: Mutex::new(HashMap::new()) }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<(V, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.is_enabled() {
            return fetch().await.map(|value| (value, CacheStatus::Bypass));
        }

        let slot = self.lock_slots().entry(key).or_default().clone();
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.stored_at.elapsed() < self.ttl {
                return Ok((cached.value.clone(), CacheStatus::Hit));
            }
        }

        let value = fetch().await?;
        *entry = Some(CacheEntry { value: value.clone(), stored_at: Instant::now() });
        Ok((value, CacheStatus::Miss))
    }

    pub fn invalidate(&self, key: &K) {
        self.lock_slots().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::catalog::cache::{CacheStatus, TtlCache};

    #[tokio::test]
    async fn second_read_within_ttl_is_a_hit() {
        let cache = TtlCache::<&str, u32>::new(Duration::from_secs(300));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(7)
        };
        let first = cache.get_or_try_fetch("creta-2024", fetch).await.expect("first fetch");
        let second = cache
            .get_or_try_fetch("creta-2024", || async { Ok::<_, String>(99) })
            .await
            .expect("second read");

        assert_eq!(first, (7, CacheStatus::Miss));
        assert_eq!(second, (7, CacheStatus::Hit));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = TtlCache::<&str, u32>::new(Duration::from_secs(300));

        let failed = cache.get_or_try_fetch("venue-2020", || async { Err::<u32, _>("offline") }).await;
        let recovered =
            cache.get_or_try_fetch("venue-2020", || async { Ok::<_, &str>(3) }).await;

        assert_eq!(failed, Err("offline"));
        assert_eq!(recovered, Ok((3, CacheStatus::Miss)));
    }

    #[tokio::test]
    async fn zero_ttl_bypasses_the_cache() {
        let cache = TtlCache::<&str, u32>::new(Duration::ZERO);

        let first = cache.get_or_try_fetch("aura-2021", || async { Ok::<_, ()>(1) }).await;
        let second = cache.get_or_try_fetch("aura-2021", || async { Ok::<_, ()>(2) }).await;

        assert_eq!(first, Ok((1, CacheStatus::Bypass)));
        assert_eq!(second, Ok((2, CacheStatus::Bypass)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_readers_of_one_key_share_a_single_fetch() {
        let cache = Arc::new(TtlCache::<String, u32>::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_try_fetch("i20-2018".to_string(), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ()>(42)
                        })
                        .await
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let (value, _) = task.await.expect("task joins").expect("fetch succeeds");
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_refetch() {
        let cache = TtlCache::<&str, u32>::new(Duration::from_secs(60));
        let _ = cache.get_or_try_fetch("nios-2019", || async { Ok::<_, ()>(1) }).await;

        cache.invalidate(&"nios-2019");
        let refreshed = cache.get_or_try_fetch("nios-2019", || async { Ok::<_, ()>(2) }).await;

        assert_eq!(refreshed, Ok((2, CacheStatus::Miss)));
    }
}
