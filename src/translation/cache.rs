/*!
 * Translation caching functionality.
 *
 * A bounded map from (source language, target language, normalized text) to
 * a translation. When the ceiling is exceeded the oldest fifth of the entries
 * is evicted. Clones share the same storage.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::Mutex;

/// Default number of entries kept before eviction starts
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Cache key combining source text, source language, and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_language: String,
    target_language: String,
    /// Trimmed source text
    source_text: String,
}

impl CacheKey {
    fn new(source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            source_text: source_text.trim().to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<CacheKey, String>,
    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,
}

/// Translation cache for storing and retrieving translations
#[derive(Debug, Clone)]
pub struct TranslationCache {
    store: Arc<Mutex<CacheStore>>,
    capacity: usize,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl TranslationCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::default())),
            capacity: capacity.max(1),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a translation from the cache
    pub fn get(&self, source_text: &str, source_language: &str, target_language: &str) -> Option<String> {
        let key = CacheKey::new(source_text, source_language, target_language);
        let found = self.store.lock().entries.get(&key).cloned();

        match found {
            Some(translation) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache hit for '{}' ({} -> {})",
                    truncate_text(source_text, 30),
                    source_language,
                    target_language
                );
                Some(translation)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a translation, evicting the oldest entries when over capacity
    pub fn store(&self, source_text: &str, source_language: &str, target_language: &str, translation: &str) {
        let key = CacheKey::new(source_text, source_language, target_language);
        let mut store = self.store.lock();

        if store.entries.insert(key.clone(), translation.to_string()).is_none() {
            store.order.push_back(key);
        }

        if store.entries.len() > self.capacity {
            let evict = (self.capacity / 5).max(1);
            for _ in 0..evict {
                match store.order.pop_front() {
                    Some(old) => {
                        store.entries.remove(&old);
                    }
                    None => break,
                }
            }
            debug!("Translation cache evicted {} entries", evict);
        }
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        (hits, misses, hit_rate)
    }

    /// Clear the cache
    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.entries.clear();
        store.order.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.store.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_trimmed_and_language_scoped() {
        let cache = TranslationCache::new(10);
        cache.store("  Hello ", "en", "es", "Hola");
        assert_eq!(cache.get("Hello", "en", "es").as_deref(), Some("Hola"));
        assert_eq!(cache.get("Hello", "en", "fr"), None);
        assert_eq!(cache.stats().0, 1);
        assert_eq!(cache.stats().1, 1);
    }

    #[test]
    fn test_eviction_drops_oldest_fifth() {
        let cache = TranslationCache::new(10);
        for i in 0..11 {
            cache.store(&format!("line {}", i), "en", "es", &format!("linea {}", i));
        }
        assert_eq!(cache.len(), 9);
        assert!(cache.get("line 0", "en", "es").is_none());
        assert!(cache.get("line 1", "en", "es").is_none());
        assert!(cache.get("line 2", "en", "es").is_some());
        assert!(cache.get("line 10", "en", "es").is_some());
    }

    #[test]
    fn test_clones_share_storage_and_clear_empties() {
        let cache = TranslationCache::new(5);
        let shared = cache.clone();
        shared.store("a", "en", "es", "b");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(shared.is_empty());
    }

    #[test]
    fn test_truncate_text_respects_char_boundaries() {
        assert_eq!(truncate_text("señor", 3), "señ...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
