//! 프로세스 내 TTL 결과 캐시.
//!
//! 완성된 응답 payload를 키별로 보관합니다. 항목은 만료 전까지 읽기 전용이며,
//! 다음 미스에서 통째로 교체됩니다.
//!
//! 같은 키에 대한 동시 미스는 각자 계산하고 마지막 쓰기가 남습니다.
//! 계산 클로저는 잠금 없이 실행됩니다.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// 기본 TTL (5분).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// 캐시 항목.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: Arc<V>,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: Arc<V>) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    /// 저장된 값.
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// 생성 후 경과 시간.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// 만료 여부.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

/// 캐시 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// 유효 항목 조회 횟수
    pub hits: u64,
    /// 없거나 만료된 항목 조회 횟수
    pub misses: u64,
    /// 계산 클로저 실행 횟수
    pub computations: u64,
    /// 현재 저장된 항목 수 (만료 포함)
    pub entries: usize,
}

/// 조회 한 번의 결과 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLookup {
    /// 유효한 항목을 그대로 반환
    Hit,
    /// 이번 호출에서 계산
    Miss,
}

impl CacheLookup {
    /// 캐시 적중 여부.
    pub fn is_hit(self) -> bool {
        matches!(self, CacheLookup::Hit)
    }
}

/// TTL 기반 결과 캐시.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    /// 지정한 TTL로 빈 캐시 생성.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// 항목 만료 시간.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 유효한 항목 조회. 없거나 만료되었으면 `None`.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.value))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 항목 저장 (기존 항목은 교체).
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, CacheEntry::new(Arc::clone(&value)));
        value
    }

    /// 유효한 항목이 있으면 반환하고, 없으면 계산 후 저장.
    ///
    /// 계산이 실패하면 아무것도 저장하지 않고 에러를 돌려줍니다.
    pub fn get_or_compute<E, F>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.lookup_or_compute(key, compute).map(|(value, _)| value)
    }

    /// [`get_or_compute`](Self::get_or_compute)와 같지만 이 호출의 적중 여부도 반환.
    ///
    /// 다른 스레드의 계산과 섞이지 않도록 호출 단위로 판단합니다.
    pub fn lookup_or_compute<E, F>(&self, key: K, compute: F) -> Result<(Arc<V>, CacheLookup), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok((value, CacheLookup::Hit));
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let value = compute()?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Cache entry computed");

        Ok((self.insert(key, value), CacheLookup::Miss))
    }

    /// 만료된 항목 제거. 제거한 개수를 반환.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before - entries.len()
    }

    /// 저장된 항목 수 (만료 포함).
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 비어있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 항목 제거 (통계는 유지).
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// 현재 통계.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_or_compute_caches_value() {
        let cache: TtlCache<&str, Vec<i32>> = TtlCache::default();
        let calls = Cell::new(0);

        let first = cache
            .get_or_compute("k", || {
                calls.set(calls.get() + 1);
                Ok::<_, String>(vec![1, 2])
            })
            .unwrap();
        let second = cache
            .get_or_compute("k", || {
                calls.set(calls.get() + 1);
                Ok::<_, String>(vec![9])
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                computations: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_lookup_reports_own_status_under_concurrency() {
        let cache = Arc::new(TtlCache::<u8, u8>::default());
        let (computing, release) = std::sync::mpsc::channel::<()>();
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

        cache.insert(1, 10);

        // 다른 키의 계산이 진행되는 동안 적중 조회
        let slow = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                cache
                    .lookup_or_compute(2, || {
                        started_tx.send(()).unwrap();
                        release.recv().unwrap();
                        Ok::<_, ()>(20)
                    })
                    .unwrap()
            })
        };
        started_rx.recv().unwrap();

        let (value, status) = cache.lookup_or_compute(1, || Ok::<_, ()>(99)).unwrap();
        assert_eq!(*value, 10);
        assert_eq!(status, CacheLookup::Hit);

        computing.send(()).unwrap();
        let (value, status) = slow.join().unwrap();
        assert_eq!(*value, 20);
        assert_eq!(status, CacheLookup::Miss);
        assert!(!status.is_hit());
    }

    #[test]
    fn test_distinct_keys_compute_separately() {
        let cache: TtlCache<u32, u32> = TtlCache::default();
        cache.get_or_compute(1, || Ok::<_, ()>(10)).unwrap();
        cache.get_or_compute(2, || Ok::<_, ()>(20)).unwrap();

        assert_eq!(*cache.get(&1).unwrap(), 10);
        assert_eq!(*cache.get(&2).unwrap(), 20);
        assert_eq!(cache.stats().computations, 2);
    }

    #[test]
    fn test_compute_error_is_not_stored() {
        let cache: TtlCache<&str, u32> = TtlCache::default();
        let result = cache.get_or_compute("k", || Err::<u32, _>("boom"));
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());

        let value = cache.get_or_compute("k", || Ok::<_, &str>(5)).unwrap();
        assert_eq!(*value, 5);
    }

    #[test]
    fn test_expired_entry_is_recomputed() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        cache.get_or_compute("k", || Ok::<_, ()>(1)).unwrap();
        let value = cache.get_or_compute("k", || Ok::<_, ()>(2)).unwrap();

        assert_eq!(*value, 2);
        assert_eq!(cache.stats().computations, 2);
        assert_eq!(cache.stats().hits, 0);
        // 교체되므로 항목은 하나
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::ZERO);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        let fresh: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(60));
        fresh.insert(1, 1);
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_clear_keeps_stats() {
        let cache: TtlCache<u8, u8> = TtlCache::default();
        cache.get_or_compute(1, || Ok::<_, ()>(1)).unwrap();
        cache.clear();
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.stats().computations, 1);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_concurrent_readers_share_payload() {
        let cache = Arc::new(TtlCache::<u8, String>::default());
        let original = cache.insert(1, "payload".to_string());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get(&1))
            })
            .collect();

        for handle in handles {
            let value = handle.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&value, &original));
        }
    }
}
