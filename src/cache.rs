use lru::LruCache;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use crate::pattern::{Pattern, PatternOptions};

/// Default cache size for compiled patterns.
/// This is chosen to be large enough to hold patterns for typical glob operations
/// (e.g., a project with many different glob patterns) while not using excessive memory.
const DEFAULT_CACHE_SIZE: usize = 1024;

/// Default cache size for directory listings.
/// This is chosen to balance memory usage with cache hit rate.
/// Most glob operations traverse a limited number of directories.
const DEFAULT_READDIR_CACHE_SIZE: usize = 512;

/// Default TTL for cached directory listings (5 seconds).
/// This prevents stale data while still providing significant speedup
/// for repeated glob operations on the same directories.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Cache key for compiled patterns.
/// Includes the pattern string and all options that affect compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PatternCacheKey {
    pattern: String,
    noext: bool,
    windows_paths_no_escape: bool,
    nocase: bool,
    nobrace: bool,
    platform: String,
}

impl Hash for PatternCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
        self.noext.hash(state);
        self.windows_paths_no_escape.hash(state);
        self.nocase.hash(state);
        self.nobrace.hash(state);
        self.platform.hash(state);
    }
}

impl PatternCacheKey {
    fn new(pattern: &str, options: &PatternOptions) -> Self {
        Self {
            pattern: pattern.to_string(),
            noext: options.noext,
            windows_paths_no_escape: options.windows_paths_no_escape,
            nocase: options.nocase,
            nobrace: options.nobrace,
            platform: options.platform.clone().unwrap_or_default(),
        }
    }
}

/// Global pattern cache instance.
/// Uses RwLock for lock-free reads - multiple readers can access simultaneously.
static PATTERN_CACHE: OnceLock<RwLock<LruCache<PatternCacheKey, Pattern>>> = OnceLock::new();

/// Initialize the global pattern cache with the default size.
fn get_cache() -> &'static RwLock<LruCache<PatternCacheKey, Pattern>> {
    PATTERN_CACHE.get_or_init(|| {
        RwLock::new(LruCache::new(
            NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap(),
        ))
    })
}

/// Get a compiled pattern from the cache, or compile and cache it if not found.
///
/// Uses a read-optimized locking strategy:
/// 1. First try a read lock (allows concurrent readers)
/// 2. Only upgrade to write lock if cache miss
///
/// This function provides significant speedup when the same patterns are used
/// repeatedly, which is common in glob operations with brace expansion or
/// when multiple glob() calls use similar patterns.
///
/// # Arguments
/// * `pattern` - The glob pattern string to compile
/// * `options` - The pattern compilation options
///
/// # Returns
/// A compiled `Pattern` ready for matching.
pub fn get_or_compile_pattern(pattern: &str, options: &PatternOptions) -> Pattern {
    let key = PatternCacheKey::new(pattern, options);

    let cache = get_cache();

    // Try to get from cache with READ lock (allows concurrent readers)
    {
        let guard = cache.read().unwrap();
        if let Some(cached) = guard.peek(&key) {
            tracing::trace!(pattern, "pattern cache hit");
            return cached.clone();
        }
    }

    tracing::trace!(pattern, "pattern cache miss, compiling");
    // Cache miss - compile the pattern (outside lock)
    let compiled = Pattern::with_pattern_options(pattern, options.clone());

    // Store in cache with WRITE lock
    {
        let mut guard = cache.write().unwrap();
        // Double-check: another thread might have compiled it
        if let Some(cached) = guard.peek(&key) {
            return cached.clone();
        }
        guard.put(key, compiled.clone());
    }

    compiled
}

/// Get the current number of cached patterns.
/// Useful for debugging and monitoring.
#[allow(dead_code)]
pub fn cache_size() -> usize {
    let cache = get_cache();
    let guard = cache.read().unwrap();
    guard.len()
}

/// Clear the pattern cache.
/// This is mainly useful for testing.
#[allow(dead_code)]
pub fn clear_cache() {
    let cache = get_cache();
    let mut guard = cache.write().unwrap();
    guard.clear();
}

/// Get cache statistics for monitoring.
#[allow(dead_code)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

#[allow(dead_code)]
pub fn get_cache_stats() -> CacheStats {
    let cache = get_cache();
    let guard = cache.read().unwrap();
    CacheStats {
        size: guard.len(),
        capacity: guard.cap().get(),
    }
}

// ============================================================================
// Readdir Cache Implementation
// ============================================================================

/// A cached directory entry with minimal information needed for glob matching.
#[derive(Debug, Clone)]
pub struct CachedDirEntry {
    /// File name (not full path)
    pub name: String,
    /// True if this is a directory
    pub is_dir: bool,
    /// True if this is a file
    pub is_file: bool,
    /// True if this is a symbolic link
    pub is_symlink: bool,
}

/// A cached directory listing with timestamp for TTL-based invalidation.
/// Uses Arc for zero-copy sharing on cache hits.
#[derive(Debug, Clone)]
struct CachedDirListing {
    /// Entries wrapped in Arc for cheap cloning on cache hit
    entries: Arc<[CachedDirEntry]>,
    cached_at: Instant,
}

impl CachedDirListing {
    fn new(entries: Vec<CachedDirEntry>) -> Self {
        Self {
            entries: entries.into(),
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Global readdir cache instance.
/// Uses RwLock for lock-free reads - multiple readers can access simultaneously.
static READDIR_CACHE: OnceLock<RwLock<LruCache<PathBuf, CachedDirListing>>> = OnceLock::new();

/// Initialize the global readdir cache with the default size.
fn get_readdir_cache() -> &'static RwLock<LruCache<PathBuf, CachedDirListing>> {
    READDIR_CACHE.get_or_init(|| {
        RwLock::new(LruCache::new(
            NonZeroUsize::new(DEFAULT_READDIR_CACHE_SIZE).unwrap(),
        ))
    })
}

/// Read a directory's contents, using the cache if available and not expired.
///
/// This function provides significant speedup when the same directories are
/// traversed repeatedly, which is common in:
/// - Multiple glob operations on the same codebase
/// - Glob class cache reuse (passing Glob as options)
/// - Patterns with overlapping directory prefixes
///
/// # Arguments
/// * `path` - The directory path to read
/// * `follow_symlinks` - If true, resolve symlink targets for type detection
///
/// # Returns
/// A vector of cached directory entries, or an empty vector if the directory
/// cannot be read.
pub fn read_dir_cached(path: &Path, follow_symlinks: bool) -> Vec<CachedDirEntry> {
    read_dir_cached_with_ttl(path, follow_symlinks, DEFAULT_CACHE_TTL)
}

/// Read a directory's contents with a custom TTL.
///
/// Uses a read-optimized locking strategy:
/// 1. First try a read lock (allows concurrent readers)
/// 2. Only upgrade to write lock if cache miss or expired
///
/// # Arguments
/// * `path` - The directory path to read
/// * `follow_symlinks` - If true, resolve symlink targets for type detection
/// * `ttl` - Time-to-live for cached entries
pub fn read_dir_cached_with_ttl(
    path: &Path,
    follow_symlinks: bool,
    ttl: Duration,
) -> Vec<CachedDirEntry> {
    let cache = get_readdir_cache();

    // Create a canonical cache key to handle relative vs absolute paths
    let cache_key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    // Try to get from cache with READ lock (allows concurrent readers)
    {
        let guard = cache.read().unwrap();
        if let Some(cached) = guard.peek(&cache_key) {
            if !cached.is_expired(ttl) {
                tracing::trace!(path = %path.display(), "readdir cache hit");
                // Zero-copy return via Arc clone (just increments ref count)
                return cached.entries.to_vec();
            }
        }
    }

    tracing::trace!(path = %path.display(), "readdir cache miss, reading directory");
    // Cache miss or expired - read the directory (outside lock)
    let entries = read_dir_uncached(path, follow_symlinks);

    // Store in cache with WRITE lock
    {
        let mut guard = cache.write().unwrap();
        // Double-check: another thread might have populated it
        if let Some(cached) = guard.peek(&cache_key) {
            if !cached.is_expired(ttl) {
                return cached.entries.to_vec();
            }
        }
        guard.put(cache_key, CachedDirListing::new(entries.clone()));
    }

    entries
}

/// Read a directory without using the cache.
/// This is the underlying implementation used by the cache.
fn read_dir_uncached(path: &Path, follow_symlinks: bool) -> Vec<CachedDirEntry> {
    let read_dir = match std::fs::read_dir(path) {
        Ok(rd) => rd,
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "skipping unreadable directory");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();

    for entry_result in read_dir {
        let entry = match entry_result {
            Ok(e) => e,
            Err(_) => continue,
        };

        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => continue, // Skip non-UTF8 filenames
        };

        let entry_path = entry.path();

        // Get file type
        let (is_dir, is_file, is_symlink) = if follow_symlinks {
            // When following symlinks, we need to:
            // 1. Check if it's a symlink (via symlink_metadata)
            // 2. Get the TARGET's type (via fs::metadata which follows symlinks)
            //
            // Note: DirEntry::metadata() on macOS returns the symlink's metadata,
            // not the target's. We must use std::fs::metadata() to follow.
            let is_symlink = entry_path
                .symlink_metadata()
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);

            // Use fs::metadata() to follow symlinks and get target type
            match std::fs::metadata(&entry_path) {
                Ok(meta) => {
                    let ft = meta.file_type();
                    (ft.is_dir(), ft.is_file(), is_symlink)
                }
                Err(_) => {
                    // Broken symlink or permission error
                    (false, false, is_symlink)
                }
            }
        } else {
            // Not following symlinks - use symlink_metadata to get the link type
            match entry_path.symlink_metadata() {
                Ok(meta) => {
                    let ft = meta.file_type();
                    (ft.is_dir(), ft.is_file(), ft.is_symlink())
                }
                Err(_) => (false, false, false),
            }
        };

        entries.push(CachedDirEntry {
            name,
            is_dir,
            is_file,
            is_symlink,
        });
    }

    entries
}

/// Get the current number of cached directory listings.
#[allow(dead_code)]
pub fn readdir_cache_size() -> usize {
    let cache = get_readdir_cache();
    let guard = cache.read().unwrap();
    guard.len()
}

/// Clear the readdir cache.
/// This is useful for:
/// - Testing
/// - When you know the filesystem has changed
/// - Freeing memory
#[allow(dead_code)]
pub fn clear_readdir_cache() {
    let cache = get_readdir_cache();
    let mut guard = cache.write().unwrap();
    guard.clear();
}

/// Get readdir cache statistics for monitoring.
#[allow(dead_code)]
pub struct ReaddirCacheStats {
    pub size: usize,
    pub capacity: usize,
}

#[allow(dead_code)]
pub fn get_readdir_cache_stats() -> ReaddirCacheStats {
    let cache = get_readdir_cache();
    let guard = cache.read().unwrap();
    ReaddirCacheStats {
        size: guard.len(),
        capacity: guard.cap().get(),
    }
}

/// Invalidate a specific directory in the cache.
/// Useful when you know a directory has been modified.
#[allow(dead_code)]
pub fn invalidate_dir(path: &Path) {
    let cache = get_readdir_cache();
    let cache_key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut guard = cache.write().unwrap();
    guard.pop(&cache_key);
}

/// Invalidate all directories under a given path.
/// Useful when a subtree has been modified.
#[allow(dead_code)]
pub fn invalidate_subtree(path: &Path) {
    let cache = get_readdir_cache();
    let prefix = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut guard = cache.write().unwrap();

    // Collect keys to remove (can't modify while iterating)
    let keys_to_remove: Vec<PathBuf> = guard
        .iter()
        .filter(|(k, _)| k.starts_with(&prefix))
        .map(|(k, _)| k.clone())
        .collect();

    for key in keys_to_remove {
        guard.pop(&key);
    }
}
