//! In-memory page-state cache.
//!
//! Keeps per-page UI state (fetched rows, filters, selected day) alive
//! across view switches so navigating back does not refetch or lose
//! scroll context. One entry per key, whole-entry replace on write,
//! entries older than their TTL read as absent. Single-tab and
//! in-memory only; a reload starts empty.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::util;

/// Default entry lifetime: 10 minutes.
pub const DEFAULT_TTL_MS: i64 = 10 * util::MINUTE_MS;

struct Entry {
    data: Box<dyn Any>,
    written_at_ms: i64,
}

/// Constructed store handed to the component tree through context, so
/// session lifecycle (create at login, `clear_all` at logout) is
/// explicit. Clone is cheap and shares the same map.
#[derive(Clone)]
pub struct PageCache {
    entries: Rc<RefCell<HashMap<String, Entry>>>,
    clock: Rc<dyn Fn() -> i64>,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::with_clock(Rc::new(util::now_ms))
    }

    /// Same cache with a caller-supplied clock, for tests.
    pub fn with_clock(clock: Rc<dyn Fn() -> i64>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            clock,
        }
    }

    /// Cached value for `key` if present and younger than `ttl_ms`,
    /// otherwise `initial`. A stale entry is discarded on the spot so
    /// it cannot be resurrected by a later shorter-TTL read.
    pub fn get<T: Clone + 'static>(&self, key: &str, initial: T, ttl_ms: i64) -> T {
        let now = (self.clock)();
        let mut entries = self.entries.borrow_mut();
        match entries.get(key) {
            Some(entry) if now - entry.written_at_ms < ttl_ms => entry
                .data
                .downcast_ref::<T>()
                .cloned()
                .unwrap_or(initial),
            Some(_) => {
                entries.remove(key);
                initial
            }
            None => initial,
        }
    }

    /// Replace the entry for `key`. The updater receives the previous
    /// value (if any, regardless of age) and returns the next one.
    /// Last writer wins; timestamp is always refreshed.
    pub fn set<T: Clone + 'static>(&self, key: &str, updater: impl FnOnce(Option<T>) -> T) {
        let now = (self.clock)();
        let mut entries = self.entries.borrow_mut();
        let prev = entries
            .remove(key)
            .and_then(|e| e.data.downcast::<T>().ok())
            .map(|b| *b);
        entries.insert(
            key.to_string(),
            Entry {
                data: Box::new(updater(prev)),
                written_at_ms: now,
            },
        );
    }

    pub fn clear(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    /// Drop everything. Called on logout so per-user state cannot leak
    /// into the next session.
    pub fn clear_all(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cache_with_manual_clock() -> (PageCache, Rc<Cell<i64>>) {
        let now = Rc::new(Cell::new(1_000_000i64));
        let clock = now.clone();
        let cache = PageCache::with_clock(Rc::new(move || clock.get()));
        (cache, now)
    }

    #[test]
    fn read_after_write_returns_written_value() {
        let (cache, _) = cache_with_manual_clock();
        cache.set("calendar", |_: Option<Vec<u32>>| vec![1, 2, 3]);
        let got: Vec<u32> = cache.get("calendar", Vec::new(), DEFAULT_TTL_MS);
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn expired_entry_reads_as_initial_and_is_discarded() {
        let (cache, now) = cache_with_manual_clock();
        cache.set("calendar", |_: Option<u32>| 7);
        now.set(now.get() + DEFAULT_TTL_MS + 1);
        assert_eq!(cache.get("calendar", 0u32, DEFAULT_TTL_MS), 0);
        // Discarded, so even a generous TTL no longer sees it.
        assert_eq!(cache.get("calendar", 0u32, i64::MAX), 0);
    }

    #[test]
    fn entry_exactly_at_ttl_is_stale() {
        let (cache, now) = cache_with_manual_clock();
        cache.set("k", |_: Option<u32>| 5);
        now.set(now.get() + 100);
        assert_eq!(cache.get("k", 0u32, 100), 0);
    }

    #[test]
    fn updater_sees_previous_value_and_last_writer_wins() {
        let (cache, _) = cache_with_manual_clock();
        cache.set("k", |_: Option<u32>| 1);
        cache.set("k", |prev: Option<u32>| prev.unwrap_or(0) + 10);
        cache.set("k", |_: Option<u32>| 99);
        assert_eq!(cache.get("k", 0u32, DEFAULT_TTL_MS), 99);
    }

    #[test]
    fn write_refreshes_timestamp() {
        let (cache, now) = cache_with_manual_clock();
        cache.set("k", |_: Option<u32>| 1);
        now.set(now.get() + DEFAULT_TTL_MS - 1);
        cache.set("k", |prev: Option<u32>| prev.unwrap_or(0));
        now.set(now.get() + DEFAULT_TTL_MS - 1);
        assert_eq!(cache.get("k", 0u32, DEFAULT_TTL_MS), 1);
    }

    #[test]
    fn type_mismatch_reads_as_initial() {
        let (cache, _) = cache_with_manual_clock();
        cache.set("k", |_: Option<u32>| 1);
        assert_eq!(cache.get("k", String::from("x"), DEFAULT_TTL_MS), "x");
    }

    #[test]
    fn clear_and_clear_all_purge() {
        let (cache, _) = cache_with_manual_clock();
        cache.set("a", |_: Option<u32>| 1);
        cache.set("b", |_: Option<u32>| 2);
        cache.clear("a");
        assert_eq!(cache.get("a", 0u32, DEFAULT_TTL_MS), 0);
        assert_eq!(cache.get("b", 0u32, DEFAULT_TTL_MS), 2);
        cache.clear_all();
        assert_eq!(cache.get("b", 0u32, DEFAULT_TTL_MS), 0);
    }

    #[test]
    fn clones_share_the_same_map() {
        let (cache, _) = cache_with_manual_clock();
        let other = cache.clone();
        cache.set("k", |_: Option<u32>| 42);
        assert_eq!(other.get("k", 0u32, DEFAULT_TTL_MS), 42);
    }
}
