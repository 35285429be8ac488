//! Memoization and usage tracking for completion requests
//!
//! Completion runs on every keystroke, so work whose answer does not depend on
//! the cursor is remembered between requests:
//!
//! - **Symbol existence**: whether a name resolves to a known definition
//! - **Signatures**: the call shape shown in parameter hints
//! - **Project summaries**: per-file definitions, keyed by path and
//!   revalidated by a blake3 hash of the file text
//!
//! The cache is shared between requests through an `Arc` and is safe to use
//! from several threads at once (`DashMap` for the maps, atomics for the
//! counters).
//!
//! # Invalidation
//!
//! Symbol and signature memos are not tied to a file revision. Hosts call
//! [`CompletionCache::clear`] when sources change; project summaries revalidate
//! themselves by content hash. Usage counters survive `clear` and are reset
//! only by [`CompletionCache::reset_usage`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::CompletionConfig;
use crate::workspace::{FileSummary, ProjectSources};

/// Cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Memoized entries across all maps (usage counters excluded)
    pub size: usize,
    /// Maximum entries per map
    pub capacity: usize,
    /// Hit rate over all memo lookups (`None` before the first lookup)
    pub hit_rate: Option<f64>,
    /// Names with a recorded usage
    pub tracked_usage: usize,
}

#[derive(Debug, Clone)]
struct CachedSummary {
    content_hash: blake3::Hash,
    summary: Arc<FileSummary>,
}

/// Thread-safe memo store shared by completion requests.
///
/// # Example
///
/// ```ignore
/// let cache = Arc::new(CompletionCache::new(1000));
/// let exists = cache.symbol_exists("map", || catalog::lookup("map").is_some());
/// cache.record_usage("map");
/// ```
#[derive(Debug)]
pub struct CompletionCache {
    symbols: DashMap<String, bool>,
    signatures: DashMap<String, Option<String>>,
    summaries: DashMap<PathBuf, CachedSummary>,
    usage: DashMap<String, usize>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CompletionCache {
    /// Create a cache holding at most `max_size` entries per memo map.
    pub fn new(max_size: usize) -> Self {
        Self {
            symbols: DashMap::with_capacity(max_size.min(1024)),
            signatures: DashMap::with_capacity(max_size.min(1024)),
            summaries: DashMap::new(),
            usage: DashMap::new(),
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Make room in `map` before an insert, dropping ~10% of its entries.
    fn evict_if_full<V>(&self, map: &DashMap<String, V>) {
        if map.len() < self.max_size {
            return;
        }
        let to_remove = (self.max_size / 10).max(1);
        let mut removed = 0;
        map.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });
        debug!("Evicted {} memo entries (capacity {})", removed, self.max_size);
    }

    /// Whether `name` resolves to a known definition, computing it on a miss.
    pub fn symbol_exists(&self, name: &str, compute: impl FnOnce() -> bool) -> bool {
        if let Some(known) = self.symbols.get(name) {
            self.hit();
            return *known;
        }
        self.miss();
        let exists = compute();
        self.evict_if_full(&self.symbols);
        self.symbols.insert(name.to_string(), exists);
        exists
    }

    /// Call signature of `name`, computing it on a miss. Absent signatures are
    /// memoized too.
    pub fn signature(&self, name: &str, compute: impl FnOnce() -> Option<String>) -> Option<String> {
        if let Some(known) = self.signatures.get(name) {
            self.hit();
            return known.clone();
        }
        self.miss();
        let signature = compute();
        self.evict_if_full(&self.signatures);
        self.signatures.insert(name.to_string(), signature.clone());
        signature
    }

    /// Summary of one project file, rescanned only when its text changed.
    pub fn file_summary(&self, path: PathBuf, text: &str, max_text: usize) -> Arc<FileSummary> {
        let content_hash = blake3::hash(text.as_bytes());
        if let Some(cached) = self.summaries.get(&path) {
            if cached.content_hash == content_hash {
                self.hit();
                return Arc::clone(&cached.summary);
            }
        }
        self.miss();
        trace!("Scanning project file {:?}", path);
        let summary = Arc::new(FileSummary::scan(&path, text, max_text));
        self.summaries.insert(
            path,
            CachedSummary {
                content_hash,
                summary: Arc::clone(&summary),
            },
        );
        summary
    }

    /// Summaries of the project's files, skipping `exclude` (the file being
    /// edited).
    ///
    /// Files that cannot be listed or read are skipped; a project that cannot
    /// be enumerated at all contributes nothing.
    pub fn project_summaries(
        &self,
        project: &dyn ProjectSources,
        config: &CompletionConfig,
        exclude: Option<&Path>,
    ) -> Vec<Arc<FileSummary>> {
        let paths = match project.file_paths(config.max_project_files) {
            Ok(paths) => paths,
            Err(err) => {
                debug!("Project enumeration failed: {}", err);
                return Vec::new();
            }
        };

        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            if exclude.is_some_and(|excluded| excluded == path) {
                continue;
            }
            match project.read(&path) {
                Ok(text) => summaries.push(self.file_summary(path, &text, config.max_file_text)),
                Err(err) => debug!("Skipping project file: {}", err),
            }
        }
        summaries
    }

    /// Count one acceptance of `name`.
    ///
    /// # Returns
    /// The new usage count
    pub fn record_usage(&self, name: &str) -> usize {
        let mut count = self.usage.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn usage_count(&self, name: &str) -> usize {
        self.usage.get(name).map_or(0, |count| *count)
    }

    pub fn reset_usage(&self) {
        self.usage.clear();
    }

    /// Drop every memo and project summary. Usage counters are kept.
    pub fn clear(&self) {
        self.symbols.clear();
        self.signatures.clear();
        self.summaries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Completion cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        CacheStats {
            size: self.len(),
            capacity: self.max_size,
            hit_rate: (total > 0).then(|| hits as f64 / total as f64),
            tracked_usage: self.usage.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.symbols.len() + self.signatures.len() + self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::workspace::InMemoryProject;

    #[test]
    fn test_symbol_memo_computes_once() {
        let cache = CompletionCache::new(10);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            true
        };
        assert!(cache.symbol_exists("map", compute));
        assert!(cache.symbol_exists("map", || unreachable!()));
        assert_eq!(calls.get(), 1);

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, Some(0.5));
    }

    #[test]
    fn test_absent_signature_is_memoized() {
        let cache = CompletionCache::default();
        assert_eq!(cache.signature("nope", || None), None);
        assert_eq!(cache.signature("nope", || Some("(nope x)".to_string())), None);
    }

    #[test]
    fn test_eviction_keeps_size_bounded() {
        let cache = CompletionCache::new(20);
        for i in 0..100 {
            cache.symbol_exists(&format!("sym{}", i), || false);
        }
        assert!(cache.len() <= 20);
    }

    #[test]
    fn test_clear_keeps_usage() {
        let cache = CompletionCache::default();
        cache.symbol_exists("map", || true);
        assert_eq!(cache.record_usage("map"), 1);
        assert_eq!(cache.record_usage("map"), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hit_rate, None);
        assert_eq!(cache.usage_count("map"), 2);

        cache.reset_usage();
        assert_eq!(cache.usage_count("map"), 0);
    }

    #[test]
    fn test_file_summary_rescans_on_change() {
        let cache = CompletionCache::default();
        let path = PathBuf::from("src/a.phel");
        let first = cache.file_summary(path.clone(), "(defn one [] 1)", 100_000);
        let again = cache.file_summary(path.clone(), "(defn one [] 1)", 100_000);
        assert!(Arc::ptr_eq(&first, &again));

        let changed = cache.file_summary(path, "(defn two [] 2)", 100_000);
        assert_eq!(changed.definitions[0].name, "two");
    }

    #[test]
    fn test_project_summaries_exclude_current_file() {
        let cache = CompletionCache::default();
        let project = InMemoryProject::new()
            .with_file("src/main.phel", "(ns app\\main) (defn run [] 1)")
            .with_file("src/utils.phel", "(ns app\\utils) (defn helper [x] x)");
        let summaries = cache.project_summaries(
            &project,
            &CompletionConfig::default(),
            Some(Path::new("src/main.phel")),
        );
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].namespace.as_deref(), Some("app\\utils"));
    }
}
