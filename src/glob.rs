use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use ahash::AHashSet;
use rayon::prelude::*;

use crate::cache::get_or_compile_pattern;
use crate::cancel::CancellationToken;
use crate::error::GlobError;
use crate::ignore::IgnoreFilter;
use crate::options::{validate_options, GlobOptions, IgnorePatterns};
use crate::pattern::{expand_braces, preprocess_pattern, Pattern, PatternOptions};
use crate::walker::{WalkOptions, Walker};

/// A single matched path, with the file-type metadata the walker already has
/// on hand (no extra stat call beyond what traversal itself performs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobResult {
    /// The path relative to cwd (or absolute if the `absolute` option is set)
    pub path: String,
    pub is_directory: bool,
    pub is_file: bool,
    pub is_symlink: bool,
}

/// A pull-style handle over a background-thread walk; implements `Iterator`.
///
/// Backpressure comes from the bounded channel: the producer thread blocks on
/// `send` once the buffer fills, so a slow consumer throttles the walk rather
/// than letting it race ahead and buffer unboundedly in memory.
pub struct GlobStream {
    rx: mpsc::Receiver<GlobResult>,
}

impl Iterator for GlobStream {
    type Item = GlobResult;

    fn next(&mut self) -> Option<GlobResult> {
        self.rx.recv().ok()
    }
}

/// Patterns compiled once and reusable across `walk`s from different `cwd`s.
///
/// Compilation itself is memoized process-wide by `cache::get_or_compile_pattern`,
/// so this mostly saves callers from re-validating options and re-expanding braces;
/// the cache is what makes repeated `Glob::new_multi` calls with the same pattern
/// text and compilation-affecting options cheap.
#[derive(Debug, Clone)]
pub struct CompiledPatternSet {
    patterns: Vec<String>,
    options: GlobOptions,
}

impl CompiledPatternSet {
    /// Walk from `cwd`, reusing the patterns and every option except `cwd` itself.
    pub fn walk(&self, cwd: impl AsRef<Path>) -> Result<Vec<GlobResult>, GlobError> {
        let mut options = self.options.clone();
        options.cwd = Some(cwd.as_ref().to_string_lossy().into_owned());
        let glob = Glob::new_multi(self.patterns.clone(), options);
        Ok(glob.walk_sync_with_file_types())
    }
}

pub struct Glob {
    #[allow(dead_code)]
    pattern_strs: Vec<String>,
    cwd: PathBuf,
    /// Patterns stored in Arc for cheap cloning into closures
    patterns: Arc<[Pattern]>,
    absolute: bool,
    posix: bool,
    #[allow(dead_code)]
    nobrace: bool,
    #[allow(dead_code)]
    noext: bool,
    dot: bool,
    follow: bool,
    #[allow(dead_code)]
    windows_paths_no_escape: bool,
    /// Maximum depth to traverse (None = unlimited, negative = empty results)
    max_depth: Option<i32>,
    /// Only return files, not directories
    nodir: bool,
    /// Prepend `./` to relative paths
    dot_relative: bool,
    /// Append `/` to directories
    mark: bool,
    /// Match pattern against basename if no path separators
    #[allow(dead_code)]
    match_base: bool,
    /// Disable ** pattern matching
    #[allow(dead_code)]
    noglobstar: bool,
    /// Case-insensitive matching
    #[allow(dead_code)]
    nocase: bool,
    /// Walker options for directory traversal
    walk_options: WalkOptions,
    /// Ignore filter for excluding paths
    ignore_filter: Option<IgnoreFilter>,
    /// Pre-computed: true if any pattern requires directory matching (ends with /)
    any_pattern_requires_dir: bool,
    /// Pre-computed: number of fast-path patterns (for optimization decisions)
    fast_pattern_count: usize,
    /// When false, don't include children of matched paths
    include_child_matches: bool,
    /// Cooperative cancellation, checked before every emission.
    cancel: Option<CancellationToken>,
}

fn patterns_to_strings(patterns: &[impl AsRef<str>]) -> Vec<String> {
    patterns.iter().map(|p| p.as_ref().to_string()).collect()
}

/// Reject brace ranges wide enough to blow the safety cap before any pattern
/// compilation or directory read happens.
fn check_patterns_brace_safety(pattern_strs: &[String]) -> Result<(), GlobError> {
    for p in pattern_strs {
        crate::pattern::check_brace_range_safety(p).map_err(GlobError::Configuration)?;
    }
    Ok(())
}

/// A pre-cancelled token must short-circuit before any directory read, per
/// the `signal` option's contract: no partial results, just `Cancelled`.
fn check_not_cancelled(options: &GlobOptions) -> Result<(), GlobError> {
    if let Some(ref token) = options.cancel {
        if token.is_cancelled() {
            return Err(GlobError::Cancelled);
        }
    }
    Ok(())
}

/// Check whether a walk root can actually be read, distinguishing the two
/// cases the error policy cares about (§7.1): a missing root and a
/// permission-denied one both degrade to an empty result rather than a hard
/// error, but are worth telling apart in logs.
fn check_walk_root(root: &Path) -> Result<(), crate::error::WalkRootError> {
    match std::fs::metadata(root) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(crate::error::WalkRootError::NotFound(root.to_path_buf()))
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(crate::error::WalkRootError::PermissionDenied(root.to_path_buf()))
        }
        // Other transient I/O errors are left to the walker itself, which
        // already treats an unreadable root as "no entries".
        Err(_) => Ok(()),
    }
}

/// Synchronous, collecting walk. Returns every match with the file-type
/// metadata the walker already gathered during traversal.
pub fn walk(
    patterns: &[impl AsRef<str>],
    options: GlobOptions,
) -> Result<Vec<GlobResult>, GlobError> {
    validate_options(&options)?;
    check_not_cancelled(&options)?;
    let pattern_strs = patterns_to_strings(patterns);
    check_patterns_brace_safety(&pattern_strs)?;
    let glob = Glob::new_multi(pattern_strs, options);
    Ok(glob.walk_sync_with_file_types())
}

/// Same as `walk`, run on a blocking thread pool so callers on an async
/// runtime don't stall their executor during traversal.
pub async fn walk_async(
    patterns: &[impl AsRef<str>],
    options: GlobOptions,
) -> Result<Vec<GlobResult>, GlobError> {
    validate_options(&options)?;
    check_not_cancelled(&options)?;
    let pattern_strs = patterns_to_strings(patterns);
    check_patterns_brace_safety(&pattern_strs)?;
    tokio::task::spawn_blocking(move || {
        let glob = Glob::new_multi(pattern_strs, options);
        glob.walk_sync_with_file_types()
    })
    .await
    .map_err(|_| GlobError::Cancelled)
}

/// Push-style walk: results stream out of a bounded channel as a background
/// thread produces them, rather than collecting everything up front.
pub fn stream(patterns: &[impl AsRef<str>], options: GlobOptions) -> Result<GlobStream, GlobError> {
    validate_options(&options)?;
    check_not_cancelled(&options)?;
    let pattern_strs = patterns_to_strings(patterns);
    check_patterns_brace_safety(&pattern_strs)?;
    let (tx, rx) = mpsc::sync_channel(256);

    std::thread::spawn(move || {
        let glob = Glob::new_multi(pattern_strs, options);
        glob.walk_stream_with_file_types(|result| {
            // A dropped receiver just ends the walk early; nothing to report.
            let _ = tx.send(result);
        });
    });

    Ok(GlobStream { rx })
}

/// Compile `patterns` once under `options`, returning a handle that can be
/// walked repeatedly against different working directories.
pub fn compile(
    patterns: &[impl AsRef<str>],
    options: GlobOptions,
) -> Result<CompiledPatternSet, GlobError> {
    validate_options(&options)?;
    check_not_cancelled(&options)?;
    let pattern_strs = patterns_to_strings(patterns);
    check_patterns_brace_safety(&pattern_strs)?;
    // Warm the process-wide pattern cache so the first `walk` off this set
    // doesn't pay compilation cost again.
    let _ = Glob::new_multi(pattern_strs.clone(), options.clone());
    Ok(CompiledPatternSet {
        patterns: pattern_strs,
        options,
    })
}

impl Glob {
    /// Create a new Glob from a single pattern string
    pub fn new(pattern_str: String, options: GlobOptions) -> Self {
        Self::new_multi(vec![pattern_str], options)
    }

    /// Create a new Glob from multiple pattern strings
    pub fn new_multi(pattern_strs: Vec<String>, options: GlobOptions) -> Self {
        let cwd = options
            .cwd
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let absolute = options.absolute.unwrap_or(false);
        let posix = options.posix.unwrap_or(false);
        let nobrace = options.nobrace.unwrap_or(false);
        let noext = options.noext.unwrap_or(false);
        let dot = options.dot.unwrap_or(false);
        let follow = options.follow.unwrap_or(false);
        let windows_paths_no_escape = options.effective_windows_paths_no_escape();
        let max_depth = options.max_depth;
        let nodir = options.nodir.unwrap_or(false);
        let dot_relative = options.dot_relative.unwrap_or(false);
        let mark = options.mark.unwrap_or(false);
        let match_base = options.match_base.unwrap_or(false);
        let noglobstar = options.noglobstar.unwrap_or(false);
        let nocase = options.effective_nocase();
        let platform = options.effective_platform();
        let include_child_matches = options.effective_include_child_matches();

        // Create pattern options
        let pattern_opts = PatternOptions {
            noext,
            windows_paths_no_escape,
            platform: Some(platform.clone()),
            nocase,
            nobrace,
        };

        // Process all input patterns and expand braces for each
        // Use AHashSet to track already-seen pattern strings for deduplication (faster hashing)
        let mut seen_patterns: AHashSet<String> = AHashSet::new();
        let mut patterns: Vec<Pattern> = Vec::new();
        // Leading-`!` entries (not `!(...)` extglob groups) are negations: they
        // never get walked as positive patterns, they just filter the result
        // set, so they're folded into the same ignore machinery as `options.ignore`.
        let mut negation_pattern_strs: Vec<String> = Vec::new();

        for pattern_str in &pattern_strs {
            // Skip empty patterns - they match nothing (like glob v13)
            if pattern_str.is_empty() {
                continue;
            }

            let (is_negation, pattern_str): (bool, &str) = match pattern_str.strip_prefix('!') {
                Some(rest) if !rest.starts_with('(') => (true, rest),
                _ => (false, pattern_str.as_str()),
            };

            if is_negation {
                if !pattern_str.is_empty() {
                    negation_pattern_strs.push(pattern_str.to_string());
                }
                continue;
            }

            // Check if the ORIGINAL pattern has path separators BEFORE brace expansion
            // This is important because matchBase should only apply if the entire original
            // pattern has no separators. If {a,b/c} is used, neither a nor b/c gets matchBase.
            let original_has_slash = pattern_str.contains('/') || pattern_str.contains('\\');

            // Helper function to apply matchBase transformation to a pattern
            // Only applies if:
            // 1. matchBase is true
            // 2. The ORIGINAL pattern (before brace expansion) has no path separators
            // 3. The expanded pattern has no path separators
            let apply_match_base = |pattern: &str| -> String {
                if match_base
                    && !original_has_slash
                    && !pattern.contains('/')
                    && !pattern.contains('\\')
                {
                    format!("**/{pattern}")
                } else {
                    pattern.to_string()
                }
            };

            // Expand braces unless nobrace is set
            if nobrace {
                let transformed = apply_match_base(pattern_str);
                // Deduplicate: only add if we haven't seen this pattern before
                if seen_patterns.insert(transformed.clone()) {
                    // Use pattern cache for compiled patterns
                    patterns.push(get_or_compile_pattern(&transformed, &pattern_opts));
                }
            } else {
                let expanded = expand_braces(pattern_str);
                if expanded.is_empty() {
                    let transformed = apply_match_base(pattern_str);
                    if seen_patterns.insert(transformed.clone()) {
                        // Use pattern cache for compiled patterns
                        patterns.push(get_or_compile_pattern(&transformed, &pattern_opts));
                    }
                } else {
                    for p in expanded {
                        let transformed = apply_match_base(&p);
                        // Deduplicate: skip duplicate expanded patterns
                        if seen_patterns.insert(transformed.clone()) {
                            // Use pattern cache for compiled patterns
                            patterns.push(get_or_compile_pattern(&transformed, &pattern_opts));
                        }
                    }
                }
            }
        }

        // Optimization: Sort patterns so fast-path patterns come first.
        // This allows early exit when using .any() since fast patterns are checked first.
        // Patterns with fast-path matching are much quicker to evaluate.
        patterns.sort_by(|a, b| {
            // Fast-path patterns should come first
            let a_fast = a.fast_path().is_fast();
            let b_fast = b.fast_path().is_fast();
            match (a_fast, b_fast) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => std::cmp::Ordering::Equal,
            }
        });

        // Create ignore filter from the `ignore` option plus any leading-`!`
        // negation patterns found above; both are "drop this path" rules and
        // share the exact same pattern-matching/pruning machinery.
        let mut combined_ignore_patterns: Vec<String> = match &options.ignore {
            Some(IgnorePatterns::Single(pattern)) => vec![pattern.clone()],
            Some(IgnorePatterns::Many(patterns)) => patterns.clone(),
            None => Vec::new(),
        };
        combined_ignore_patterns.extend(negation_pattern_strs);
        let ignore_filter = if combined_ignore_patterns.is_empty() {
            options
                .ignore_predicate
                .as_ref()
                .map(|handle| IgnoreFilter::new(Vec::new(), noext, windows_paths_no_escape).with_predicate(handle.0.clone()))
        } else {
            let filter = IgnoreFilter::new(combined_ignore_patterns, noext, windows_paths_no_escape);
            Some(match &options.ignore_predicate {
                Some(handle) => filter.with_predicate(handle.0.clone()),
                None => filter,
            })
        };

        // Create walk options
        // Note: We always walk with dot=true in the walker, and handle dot filtering
        // at the pattern matching level. This allows patterns with explicit dots
        // (like ".hidden" or "**/.config") to match even when dot:false.

        // Calculate effective max depth from patterns for optimization.
        // If all patterns have a bounded depth (no **), we can limit the walker
        // to avoid traversing deeper than necessary.
        // Use the maximum depth required by any pattern.
        let pattern_max_depth = {
            let mut max_depth: Option<usize> = Some(0);
            for p in &patterns {
                match (max_depth, p.max_depth()) {
                    (None, _) => break, // Already unlimited
                    (_, None) => {
                        max_depth = None;
                        break;
                    } // This pattern is unlimited
                    (Some(a), Some(b)) => max_depth = Some(a.max(b)), // Take max of bounded depths
                }
            }
            max_depth
        };

        // Combine user-provided max_depth with pattern-derived depth.
        // User max_depth takes precedence (it's an explicit limit), but if user
        // didn't specify one, use pattern-derived depth for optimization.
        // Convert max_depth: negative values and Some(-1) will be handled in walk_sync
        let walker_max_depth = match (max_depth, pattern_max_depth) {
            (Some(d), _) if d < 0 => Some(0), // Negative values: will return empty in walk_sync
            (Some(d), _) => Some(d as usize), // User-provided depth takes precedence
            (None, Some(d)) => Some(d + 1),   // Pattern depth + 1 (for root directory)
            (None, None) => None,             // Unlimited (has **)
        };

        // Optimization: Only enable accurate symlink detection when needed.
        // The `mark` option requires knowing whether an entry is a symlink to avoid
        // adding a trailing slash. When following symlinks, walkdir reports the TARGET
        // type, so we need an extra syscall to detect the symlink. Skip this overhead
        // when not needed.
        let need_accurate_symlink_detection = mark && follow;

        let parallel = options.parallel.unwrap_or(false);
        let cache = options.effective_cache();

        let walk_options = WalkOptions::new()
            .follow_symlinks(follow)
            .max_depth(walker_max_depth)
            .dot(true)
            .need_accurate_symlink_detection(need_accurate_symlink_detection)
            .parallel(parallel)
            .cache(cache);

        // Pre-compute: check if any pattern requires directory matching (ends with /)
        let any_pattern_requires_dir = patterns.iter().any(|p| p.requires_dir());

        // Pre-compute: count patterns with fast-path matching for optimization decisions
        let fast_pattern_count = patterns.iter().filter(|p| p.fast_path().is_fast()).count();

        // Convert to Arc<[Pattern]> for cheap cloning into closures
        let patterns: Arc<[Pattern]> = patterns.into();

        Self {
            pattern_strs,
            cwd,
            patterns,
            absolute,
            posix,
            nobrace,
            noext,
            dot,
            follow,
            windows_paths_no_escape,
            max_depth,
            nodir,
            dot_relative,
            mark,
            match_base,
            noglobstar,
            nocase,
            walk_options,
            ignore_filter,
            any_pattern_requires_dir,
            fast_pattern_count,
            include_child_matches,
            cancel: options.cancel.clone(),
        }
    }

    /// Attach a cancellation token, checked before every emitted result.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn walk_sync(&self) -> Vec<String> {
        // If maxDepth is negative, return empty results
        if let Some(d) = self.max_depth {
            if d < 0 {
                return Vec::new();
            }
        }

        // OPTIMIZATION: Static pattern fast path
        // If ALL patterns are static (no wildcards), we can use direct stat() instead of walking.
        // This is 10-100x faster for patterns like "package.json" or "src/index.ts".
        if self.all_patterns_static() {
            return self.resolve_static_patterns();
        }

        // OPTIMIZATION: Shallow pattern fast path
        // If ALL patterns have max_depth of 0 (root-level only), use direct readdir
        // instead of the full walker machinery. This is 2-3x faster for patterns like "*.js".
        if self.all_patterns_shallow() && self.ignore_filter.is_none() {
            return self.resolve_shallow_patterns();
        }

        // OPTIMIZATION: Multi-base walking
        // If patterns have different prefixes (e.g., ['src/**/*.ts', 'test/**/*.ts']),
        // walk from each prefix separately instead of from cwd.
        // This avoids traversing unrelated directories.
        if self.should_use_multi_base_walking() {
            return self.walk_multi_base();
        }

        // Pre-allocate result vector with estimated capacity based on pattern depth.
        // Simple patterns (depth 0-1) typically match fewer files than recursive patterns.
        // This reduces reallocations during collection.
        let estimated_capacity = self.estimate_result_capacity();
        let mut results = Vec::with_capacity(estimated_capacity);
        // Use AHashSet for faster hashing than std::collections::HashSet
        let mut seen: AHashSet<String> = AHashSet::with_capacity(estimated_capacity);
        let mut ignored_dirs: AHashSet<String> = AHashSet::with_capacity(8); // Most globs have few ignored dirs

        // When includeChildMatches is false, track matched paths to exclude their children
        let mut matched_parents: AHashSet<String> = if self.include_child_matches {
            AHashSet::new() // Empty, won't be used
        } else {
            AHashSet::with_capacity(estimated_capacity / 4)
        };

        // Pre-allocate a reusable buffer for path formatting
        let mut result_buffer = String::with_capacity(self.estimate_path_buffer_capacity());

        // Check if any pattern matches the cwd itself ("**" or ".").
        // Cache this check since preprocess_pattern is called for each pattern.
        let include_cwd = self.patterns.iter().any(|p| {
            let raw = p.raw();
            // Fast path: check common cases without calling preprocess_pattern
            raw == "**" || raw == "." || raw == "./**" || {
                let preprocessed = preprocess_pattern(raw);
                preprocessed == "**" || preprocessed == "."
            }
        });

        // Get the absolute cwd path, canonicalized
        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());

        // Calculate the walk root based on literal prefixes of all patterns.
        // If all patterns share a common literal prefix, we can start walking from there
        // instead of the cwd, which can significantly reduce the number of files traversed.
        let (walk_root, prefix_to_strip) = self.calculate_walk_root();

        // Pre-compute the prefix with trailing slash for efficient path concatenation.
        // This avoids repeated format!() calls in the hot loop.
        let prefix_with_slash: Option<String> =
            prefix_to_strip.as_ref().map(|prefix| format!("{prefix}/"));

        // Adjust walk options for prefix-based walking
        // If we have a prefix, the user's max_depth is relative to cwd, but the walker
        // is relative to walk_root. We need to reduce max_depth by the prefix depth.
        let adjusted_walk_options = if let Some(ref prefix) = prefix_to_strip {
            let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();
            if let Some(max_d) = self.walk_options.max_depth {
                // User specified max_depth, adjust for prefix
                if max_d <= prefix_depth {
                    // If max_depth is less than or equal to prefix depth,
                    // we should only include the prefix directory itself
                    self.walk_options.clone().max_depth(Some(0))
                } else {
                    self.walk_options
                        .clone()
                        .max_depth(Some(max_d - prefix_depth))
                }
            } else {
                self.walk_options.clone()
            }
        } else {
            self.walk_options.clone()
        };

        // Create a directory pruning filter using the patterns' could_match_in_dir method.
        // This allows us to skip entire directory subtrees that can't possibly contain matches.
        //
        // The filter receives the path relative to walk_root, but the patterns expect paths
        // relative to cwd. When we have a prefix_to_strip, we need to prepend it.
        // Use Arc::clone for cheap reference counting instead of deep cloning patterns.
        let patterns_for_filter = Arc::clone(&self.patterns);
        let prefix_for_filter = prefix_to_strip.clone();
        // Pre-compute prefix with slash for the filter to avoid repeated format! calls
        let prefix_slash_for_filter = prefix_with_slash.clone();

        let prune_filter = Box::new(move |dir_path: &str| -> bool {
            // Construct the path relative to cwd for pattern matching.
            // Use Cow to avoid allocation when no prefix is needed.
            let path_from_cwd: Cow<'_, str> = if let Some(ref prefix) = prefix_for_filter {
                if dir_path.is_empty() {
                    Cow::Borrowed(prefix.as_str())
                } else {
                    // Use pre-computed prefix with slash for efficiency
                    if let Some(ref prefix_slash) = prefix_slash_for_filter {
                        Cow::Owned(format!("{prefix_slash}{dir_path}"))
                    } else {
                        Cow::Owned(format!("{prefix}/{dir_path}"))
                    }
                }
            } else {
                Cow::Borrowed(dir_path)
            };

            // Check if ANY pattern could potentially match files in this directory.
            // If no pattern can match, we can safely skip this directory.
            patterns_for_filter
                .iter()
                .any(|p| p.could_match_in_dir(&path_from_cwd))
        });

        // Create walker with the optimized walk root, adjusted options, and pruning filter
        let mut walker = Walker::new(walk_root.clone(), adjusted_walk_options)
            .with_dir_prune_filter(prune_filter);
        if let Some(ref token) = self.cancel {
            walker = walker.with_cancellation_token(token.clone());
        }

        // Optimization: Check if we have any ignore patterns to avoid unnecessary work
        let has_ignore_filter = self.ignore_filter.is_some();

        for entry in walker.walk() {
            let path = entry.path();

            // Strip the walk_root prefix to get the path relative to walk_root
            // Then prepend the prefix_to_strip to get the path relative to cwd
            let rel_path_from_walk_root = match path.strip_prefix(&walk_root) {
                Ok(p) => p,
                Err(_) => continue, // Skip if can't strip prefix
            };
            let rel_str_from_walk_root = rel_path_from_walk_root.to_string_lossy();

            // Cache whether this is the walk root (empty relative path)
            let is_walk_root_entry = rel_str_from_walk_root.is_empty();

            // Construct the path relative to cwd by prepending the stripped prefix.
            // Use Cow to avoid allocation when possible.
            let normalized = self.normalize_path(
                &rel_str_from_walk_root,
                &prefix_to_strip,
                is_walk_root_entry,
            );

            // Check if this path is inside an ignored directory.
            if self.is_in_ignored_dir(&normalized, &ignored_dirs) {
                continue;
            }

            // Check ignore patterns
            // Optimization: Only create rel_path and abs_path when we have ignore patterns
            if has_ignore_filter {
                // For operations that need the actual relative path from cwd
                let rel_path = if prefix_to_strip.is_some() {
                    PathBuf::from(normalized.as_ref())
                } else {
                    rel_path_from_walk_root.to_path_buf()
                };
                let abs_path = abs_cwd.join(&rel_path);
                let ignore_filter = self.ignore_filter.as_ref().unwrap();

                // Check if this specific path should be ignored
                if ignore_filter.should_ignore(&normalized, &abs_path) {
                    // If children are also ignored, mark this directory
                    if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                        ignored_dirs.insert(normalized.into_owned());
                    }
                    continue;
                }

                // Also check if this is a directory whose children should be ignored
                // (for optimization - skip traversing)
                if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                    ignored_dirs.insert(normalized.to_string());
                }
            }

            // Handle root of walk_root (which might be cwd or cwd/prefix)
            if is_walk_root_entry && prefix_to_strip.is_none() {
                // This is the cwd itself - handle specially
                // Root directory - only include if pattern matches it
                // With nodir: true, skip even the root directory since it's a directory
                if include_cwd && !self.nodir {
                    // Check if cwd itself is ignored
                    if let Some(ref ignore_filter) = self.ignore_filter {
                        if ignore_filter.should_ignore(".", &abs_cwd) {
                            continue;
                        }
                    }

                    let result = if self.absolute {
                        let formatted = self.format_path_into_buffer(&abs_cwd, &mut result_buffer);
                        if self.mark {
                            if formatted.ends_with('/') || formatted.ends_with('\\') {
                                formatted.to_string()
                            } else {
                                let mut s = formatted.to_string();
                                s.push('/');
                                s
                            }
                        } else {
                            formatted.to_string()
                        }
                    } else {
                        // For relative paths, "." becomes "./" with mark:true
                        if self.mark {
                            "./".to_string()
                        } else {
                            ".".to_string()
                        }
                    };
                    if seen.insert(result.clone()) {
                        results.push(result);
                    }
                }
                continue;
            }

            // Skip empty normalized paths that aren't the cwd
            if normalized.is_empty() {
                continue;
            }

            // If nodir is true, skip directories
            // Note: Symlinks are not considered directories unless follow is true
            // When follow is true, walkdir reports symlinks-to-dirs as dirs
            if self.nodir && entry.is_dir() {
                continue;
            }

            // If dot:false, check if this path contains dotfile segments
            // that aren't explicitly allowed by any pattern
            if !self.dot && !self.path_allowed_by_dot_rules(&normalized) {
                continue;
            }

            // When includeChildMatches is false, skip paths that are children of already-matched paths
            if !self.include_child_matches
                && self.is_child_of_matched(&normalized, &matched_parents)
            {
                continue;
            }

            // Check if any pattern matches
            // For patterns that end with /, only match if entry is a directory
            let is_dir = entry.is_dir();
            let is_symlink = entry.is_symlink();

            // Optimization: Use specialized matching based on pattern characteristics.
            // Patterns are already sorted with fast-path patterns first (in new_multi),
            // so .any() will try fast patterns before falling back to regex patterns.
            let matches = if !self.any_pattern_requires_dir {
                // Fast path: no patterns require directory matching
                self.patterns
                    .iter()
                    .any(|p| match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    })
            } else {
                // Standard path: some patterns require directory matching
                self.patterns.iter().any(|p| {
                    let path_matches = match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    };
                    if path_matches && p.requires_dir() {
                        is_dir
                    } else {
                        path_matches
                    }
                })
            };

            if matches {
                // Build the result path using optimized helper
                let result = self.build_result_path(
                    &normalized,
                    is_dir,
                    is_symlink,
                    &abs_cwd,
                    &mut result_buffer,
                );

                // Deduplicate results (important for overlapping brace expansions)
                if seen.insert(result.clone()) {
                    // When includeChildMatches is false, track this path to exclude its children
                    if !self.include_child_matches {
                        matched_parents.insert(normalized.into_owned());
                    }
                    results.push(result);
                }
            }
        }

        results
    }

    /// Walk the directory tree and return GlobResult objects.
    /// This is used when withFileTypes: true is set.
    pub fn walk_sync_with_file_types(&self) -> Vec<GlobResult> {
        // If maxDepth is negative, return empty results
        if let Some(d) = self.max_depth {
            if d < 0 {
                return Vec::new();
            }
        }

        // Pre-allocate result vector with estimated capacity
        let estimated_capacity = self.estimate_result_capacity();
        let mut results = Vec::with_capacity(estimated_capacity);
        // Use AHashSet for faster hashing
        let mut seen: AHashSet<String> = AHashSet::with_capacity(estimated_capacity);
        let mut ignored_dirs: AHashSet<String> = AHashSet::with_capacity(8);

        // When includeChildMatches is false, track matched paths to exclude their children
        let mut matched_parents: AHashSet<String> = if self.include_child_matches {
            AHashSet::new()
        } else {
            AHashSet::with_capacity(estimated_capacity / 4)
        };

        // Check if any pattern matches the cwd itself ("**" or ".").
        let include_cwd = self.patterns.iter().any(|p| {
            let raw = p.raw();
            raw == "**" || raw == "." || raw == "./**" || {
                let preprocessed = preprocess_pattern(raw);
                preprocessed == "**" || preprocessed == "."
            }
        });

        // Get the absolute cwd path, canonicalized
        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());

        // Calculate the walk root based on literal prefixes
        let (walk_root, prefix_to_strip) = self.calculate_walk_root();

        // Pre-compute the prefix with trailing slash for efficient path concatenation
        let prefix_with_slash: Option<String> =
            prefix_to_strip.as_ref().map(|prefix| format!("{prefix}/"));

        // Adjust walk options for prefix-based walking
        let adjusted_walk_options = if let Some(ref prefix) = prefix_to_strip {
            let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();
            if let Some(max_d) = self.walk_options.max_depth {
                if max_d <= prefix_depth {
                    self.walk_options.clone().max_depth(Some(0))
                } else {
                    self.walk_options
                        .clone()
                        .max_depth(Some(max_d - prefix_depth))
                }
            } else {
                self.walk_options.clone()
            }
        } else {
            self.walk_options.clone()
        };

        // Create directory pruning filter using Arc::clone for cheap reference counting
        let patterns_for_filter = Arc::clone(&self.patterns);
        let prefix_for_filter = prefix_to_strip.clone();
        let prefix_slash_for_filter = prefix_with_slash.clone();

        let prune_filter = Box::new(move |dir_path: &str| -> bool {
            // Use Cow to avoid allocation when no prefix is needed
            let path_from_cwd: Cow<'_, str> = if let Some(ref prefix) = prefix_for_filter {
                if dir_path.is_empty() {
                    Cow::Borrowed(prefix.as_str())
                } else if let Some(ref prefix_slash) = prefix_slash_for_filter {
                    Cow::Owned(format!("{prefix_slash}{dir_path}"))
                } else {
                    Cow::Owned(format!("{prefix}/{dir_path}"))
                }
            } else {
                Cow::Borrowed(dir_path)
            };

            patterns_for_filter
                .iter()
                .any(|p| p.could_match_in_dir(&path_from_cwd))
        });

        // Create walker
        let mut walker = Walker::new(walk_root.clone(), adjusted_walk_options)
            .with_dir_prune_filter(prune_filter);
        if let Some(ref token) = self.cancel {
            walker = walker.with_cancellation_token(token.clone());
        }

        // Check if we have ignore patterns
        let has_ignore_filter = self.ignore_filter.is_some();

        for entry in walker.walk() {
            let path = entry.path();

            let rel_path_from_walk_root = match path.strip_prefix(&walk_root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let rel_str_from_walk_root = rel_path_from_walk_root.to_string_lossy();

            let is_walk_root_entry = rel_str_from_walk_root.is_empty();

            // Use optimized normalization with Cow
            let normalized = self.normalize_path(
                &rel_str_from_walk_root,
                &prefix_to_strip,
                is_walk_root_entry,
            );

            // Check if this path is inside an ignored directory
            if self.is_in_ignored_dir(&normalized, &ignored_dirs) {
                continue;
            }

            // Check ignore patterns
            if has_ignore_filter {
                let rel_path = if prefix_to_strip.is_some() {
                    PathBuf::from(normalized.as_ref())
                } else {
                    rel_path_from_walk_root.to_path_buf()
                };
                let abs_path = abs_cwd.join(&rel_path);
                let ignore_filter = self.ignore_filter.as_ref().unwrap();

                if ignore_filter.should_ignore(&normalized, &abs_path) {
                    if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                        ignored_dirs.insert(normalized.into_owned());
                    }
                    continue;
                }

                if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                    ignored_dirs.insert(normalized.to_string());
                }
            }

            // Handle root of walk_root
            if is_walk_root_entry && prefix_to_strip.is_none() {
                if include_cwd && !self.nodir {
                    if let Some(ref ignore_filter) = self.ignore_filter {
                        if ignore_filter.should_ignore(".", &abs_cwd) {
                            continue;
                        }
                    }

                    let result_path = ".".to_string();
                    if seen.insert(result_path.clone()) {
                        results.push(GlobResult {
                            path: result_path,
                            is_directory: true,
                            is_file: false,
                            is_symlink: entry.is_symlink(),
                        });
                    }
                }
                continue;
            }

            if normalized.is_empty() {
                continue;
            }

            // If nodir is true, skip directories
            if self.nodir && entry.is_dir() {
                continue;
            }

            // If dot:false, check if this path contains dotfile segments
            if !self.dot && !self.path_allowed_by_dot_rules(&normalized) {
                continue;
            }

            // When includeChildMatches is false, skip paths that are children of already-matched paths
            if !self.include_child_matches
                && self.is_child_of_matched(&normalized, &matched_parents)
            {
                continue;
            }

            // Check if any pattern matches
            let is_dir = entry.is_dir();

            let matches = if !self.any_pattern_requires_dir {
                self.patterns
                    .iter()
                    .any(|p| match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    })
            } else {
                self.patterns.iter().any(|p| {
                    let path_matches = match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    };
                    if path_matches && p.requires_dir() {
                        is_dir
                    } else {
                        path_matches
                    }
                })
            };

            if matches {
                // For withFileTypes, we return the relative path (no dotRelative/mark modifications)
                // The JavaScript wrapper handles path formatting via PathScurry
                let normalized_string = normalized.into_owned();
                if seen.insert(normalized_string.clone()) {
                    // When includeChildMatches is false, track this path to exclude its children
                    if !self.include_child_matches {
                        matched_parents.insert(normalized_string.clone());
                    }

                    results.push(GlobResult {
                        path: normalized_string,
                        is_directory: is_dir,
                        is_file: entry.is_file(),
                        is_symlink: entry.is_symlink(),
                    });
                }
            }
        }

        results
    }

    /// Format a path according to options (posix, etc.)
    fn format_path(&self, path: &std::path::Path) -> String {
        let path_str = path.to_string_lossy().to_string();
        if self.posix {
            // Convert to POSIX-style paths (forward slashes)
            path_str.replace('\\', "/")
        } else {
            path_str
        }
    }

    /// Ensure a path ends with a trailing slash
    fn ensure_trailing_slash(&self, path: &str) -> String {
        if path.ends_with('/') || path.ends_with('\\') {
            path.to_string()
        } else if self.posix || !cfg!(windows) {
            format!("{path}/")
        } else {
            // On Windows without posix option, use the native separator
            format!("{path}/")
        }
    }

    /// Check if a path is allowed by dot filtering rules.
    /// Returns true if:
    /// - dot: true (always allow)
    /// - The path has no dotfile segments
    /// - Any pattern explicitly allows the dotfile segments in this path
    fn path_allowed_by_dot_rules(&self, path: &str) -> bool {
        // Check if path contains any dotfile segments
        let has_dotfile = path
            .split('/')
            .any(|segment| segment.starts_with('.') && segment != "." && segment != "..");

        if !has_dotfile {
            return true;
        }

        // Check if any pattern explicitly allows the dotfiles in this path
        self.patterns.iter().any(|p| p.allows_dotfile(path))
    }

    /// Estimate the capacity for the result vector based on pattern characteristics.
    ///
    /// This helps reduce reallocations during result collection. The estimate is
    /// based on pattern depth and whether the pattern is recursive:
    /// - Simple root patterns (*.txt): ~16 results expected
    /// - One-level patterns (src/*.js): ~64 results expected  
    /// - Recursive patterns (**/*.js): ~256 results expected
    fn estimate_result_capacity(&self) -> usize {
        // Find the maximum depth across all patterns
        let max_pattern_depth = self.patterns.iter().filter_map(|p| p.max_depth()).max();

        match max_pattern_depth {
            Some(0) => 16,  // Root-level patterns: few files expected
            Some(1) => 64,  // One directory level: moderate number
            Some(2) => 128, // Two levels deep
            Some(_) => 256, // Deeper patterns
            None => 256,    // Recursive patterns (**): could be many files
        }
    }

    /// Estimate string buffer capacity based on pattern characteristics.
    /// Used to pre-allocate string buffers for path construction.
    #[inline]
    fn estimate_path_buffer_capacity(&self) -> usize {
        // Average path length: ~40-60 characters for typical project structures
        // Add extra for absolute paths and prefix
        if self.absolute {
            128 // Absolute paths can be longer
        } else if self.dot_relative {
            64 // Relative with ./ prefix
        } else {
            48 // Simple relative paths
        }
    }

    /// Format a path into the provided buffer, returning a reference to the result.
    /// This avoids allocations by reusing the buffer across iterations.
    #[inline]
    fn format_path_into_buffer<'a>(&self, path: &Path, buffer: &'a mut String) -> &'a str {
        buffer.clear();
        let path_str = path.to_string_lossy();
        if self.posix {
            // Convert backslashes to forward slashes
            for c in path_str.chars() {
                buffer.push(if c == '\\' { '/' } else { c });
            }
        } else {
            buffer.push_str(&path_str);
        }
        buffer.as_str()
    }

    /// Build a normalized path from walk entry, minimizing allocations.
    /// Returns Cow::Borrowed when no transformation is needed, Cow::Owned otherwise.
    #[inline]
    fn normalize_path<'a>(
        &self,
        rel_str_from_walk_root: &'a str,
        prefix_to_strip: &Option<String>,
        is_walk_root: bool,
    ) -> Cow<'a, str> {
        // Fast path: no prefix and no backslashes
        if prefix_to_strip.is_none() && !rel_str_from_walk_root.contains('\\') {
            return Cow::Borrowed(rel_str_from_walk_root);
        }

        // Need to construct the path
        match prefix_to_strip {
            Some(prefix) => {
                if is_walk_root {
                    Cow::Owned(prefix.clone())
                } else if rel_str_from_walk_root.contains('\\') {
                    Cow::Owned(format!(
                        "{}/{}",
                        prefix,
                        rel_str_from_walk_root.replace('\\', "/")
                    ))
                } else {
                    Cow::Owned(format!("{prefix}/{rel_str_from_walk_root}"))
                }
            }
            None => {
                // Has backslashes, needs conversion
                Cow::Owned(rel_str_from_walk_root.replace('\\', "/"))
            }
        }
    }

    /// Build a normalized path using a reusable buffer to minimize allocations.
    /// This is the optimized hot path for scoped patterns where prefix concatenation
    /// is needed for every file.
    ///
    /// # Arguments
    /// * `rel_str_from_walk_root` - The path relative to the walk root
    /// * `prefix_to_strip` - The original prefix (without trailing slash)
    /// * `prefix_with_slash` - Pre-computed "prefix/" for fast concatenation
    /// * `is_walk_root` - True if this is the walk root entry itself
    /// * `buffer` - Reusable string buffer
    #[inline]
    fn normalize_path_buffered<'a>(
        rel_str_from_walk_root: &str,
        prefix_to_strip: &Option<String>,
        prefix_with_slash: &Option<String>,
        is_walk_root: bool,
        buffer: &'a mut String,
    ) -> &'a str {
        // Fast path: no prefix and no backslashes - can't return borrowed reference
        // from the input because we need to return from buffer for consistency
        if prefix_to_strip.is_none() {
            if !rel_str_from_walk_root.contains('\\') {
                buffer.clear();
                buffer.push_str(rel_str_from_walk_root);
                return buffer.as_str();
            }
            // Has backslashes, needs conversion
            buffer.clear();
            for c in rel_str_from_walk_root.chars() {
                buffer.push(if c == '\\' { '/' } else { c });
            }
            return buffer.as_str();
        }

        // Clear and reuse buffer
        buffer.clear();

        let prefix = prefix_to_strip.as_ref().unwrap();

        if is_walk_root {
            buffer.push_str(prefix);
        } else {
            // Use pre-computed prefix with slash for efficiency
            if let Some(ref prefix_slash) = prefix_with_slash {
                buffer.push_str(prefix_slash);
            } else {
                buffer.push_str(prefix);
                buffer.push('/');
            }

            if rel_str_from_walk_root.contains('\\') {
                // Convert backslashes while appending
                for c in rel_str_from_walk_root.chars() {
                    buffer.push(if c == '\\' { '/' } else { c });
                }
            } else {
                buffer.push_str(rel_str_from_walk_root);
            }
        }
        buffer.as_str()
    }

    /// Build the final result path from the normalized path.
    /// Uses the provided buffer to minimize allocations.
    #[inline]
    fn build_result_path(
        &self,
        normalized: &str,
        is_dir: bool,
        is_symlink: bool,
        abs_cwd: &Path,
        result_buffer: &mut String,
    ) -> String {
        // When mark:true, add trailing slash to directories but NOT to symlinks
        let should_mark_as_dir = is_dir && !is_symlink && self.mark;

        if self.absolute {
            // Build absolute path
            result_buffer.clear();
            let abs_path = abs_cwd.join(normalized);
            let formatted = self.format_path_into_buffer(&abs_path, result_buffer);

            if should_mark_as_dir && !formatted.ends_with('/') && !formatted.ends_with('\\') {
                let mut result = formatted.to_string();
                result.push('/');
                result
            } else {
                formatted.to_string()
            }
        } else {
            // Build relative path
            let base = if self.dot_relative && !normalized.starts_with("../") {
                result_buffer.clear();
                result_buffer.push_str("./");
                result_buffer.push_str(normalized);
                result_buffer.as_str()
            } else {
                normalized
            };

            if should_mark_as_dir && !base.ends_with('/') && !base.ends_with('\\') {
                let mut result = base.to_string();
                result.push('/');
                result
            } else {
                base.to_string()
            }
        }
    }

    /// Check if a path is inside any of the ignored directories.
    /// Uses byte-level comparison for performance.
    #[inline]
    fn is_in_ignored_dir(&self, normalized: &str, ignored_dirs: &AHashSet<String>) -> bool {
        if ignored_dirs.is_empty() {
            return false;
        }

        let normalized_bytes = normalized.as_bytes();
        ignored_dirs.iter().any(|ignored_dir: &String| {
            let ignored_bytes = ignored_dir.as_bytes();
            normalized_bytes.starts_with(ignored_bytes)
                && (normalized_bytes.len() == ignored_bytes.len()
                    || normalized_bytes.get(ignored_bytes.len()) == Some(&b'/'))
        })
    }

    /// Check if a path is a child of any matched parent.
    /// Used when includeChildMatches is false.
    #[inline]
    fn is_child_of_matched(&self, normalized: &str, matched_parents: &AHashSet<String>) -> bool {
        if matched_parents.is_empty() {
            return false;
        }

        let normalized_bytes = normalized.as_bytes();
        matched_parents.iter().any(|matched_path: &String| {
            let matched_bytes = matched_path.as_bytes();
            normalized_bytes.starts_with(matched_bytes)
                && normalized_bytes.len() > matched_bytes.len()
                && normalized_bytes.get(matched_bytes.len()) == Some(&b'/')
        })
    }

    /// Calculate the optimal walk root based on literal prefixes of patterns.
    ///
    /// Returns a tuple of (walk_root, prefix_to_strip, is_absolute_pattern):
    /// - walk_root: The directory to start walking from (cwd, cwd/prefix, or absolute root)
    /// - prefix_to_strip: If Some, this prefix was extracted and should be prepended
    ///   to relative paths from walk_root to get the path relative to cwd
    /// - is_absolute_pattern: True if we're walking from an absolute pattern root
    ///
    /// For patterns like `src/**/*.ts`, instead of walking from cwd and visiting
    /// all directories, we can walk from `cwd/src` which is much faster.
    ///
    /// For absolute patterns like `C:/foo/**/*.ts` or `/usr/local/**`, we walk from
    /// that absolute path directly.
    ///
    /// When patterns have different prefixes (e.g., `src/**` and `test/**`),
    /// we find the longest common prefix, or fall back to cwd if there's no
    /// common prefix.
    #[tracing::instrument(level = "debug", skip(self), fields(cwd = %self.cwd.display()))]
    fn calculate_walk_root(&self) -> (PathBuf, Option<String>) {
        // If there are no patterns, just walk from cwd
        if self.patterns.is_empty() {
            if let Err(err) = check_walk_root(&self.cwd) {
                tracing::debug!(error = %err, "walk root not usable, walk will yield no entries");
            }
            return (self.cwd.clone(), None);
        }

        // Check if any pattern is absolute (has a root like C:/, /, or //server/share/)
        // If we have absolute patterns, we need to handle them specially
        let has_absolute_pattern = self.patterns.iter().any(|p| p.is_absolute());

        if has_absolute_pattern {
            // For absolute patterns, we need to check if ALL patterns are absolute
            // and share a common root. If not, we can't optimize.
            let all_absolute = self.patterns.iter().all(|p| p.is_absolute());

            if all_absolute && self.patterns.len() == 1 {
                // Single absolute pattern - walk from its root + literal prefix
                let pattern = &self.patterns[0];
                let root = pattern.root();

                // Get the literal prefix (directories before any glob magic)
                if let Some(prefix) = pattern.literal_prefix() {
                    // Walk from root + prefix
                    let walk_root = PathBuf::from(&root).join(&prefix);
                    // The prefix to strip is the root + prefix
                    let full_prefix = if root.ends_with('/') {
                        format!("{root}{prefix}")
                    } else {
                        format!("{root}/{prefix}")
                    };
                    return (walk_root, Some(full_prefix));
                } else {
                    // No literal prefix, just walk from the root
                    return (PathBuf::from(&root), Some(root.to_string()));
                }
            } else if all_absolute {
                // Multiple absolute patterns - find common root
                let roots: Vec<&str> = self.patterns.iter().map(|p| p.root()).collect();

                // Check if all roots are the same
                if !roots.is_empty() && roots.iter().all(|r| *r == roots[0]) {
                    let common_root = roots[0];

                    // Get literal prefixes after the root
                    let prefixes: Vec<Option<String>> =
                        self.patterns.iter().map(|p| p.literal_prefix()).collect();

                    // If any pattern has no prefix, walk from the root
                    if prefixes.iter().any(|p| p.is_none()) {
                        return (PathBuf::from(common_root), Some(common_root.to_string()));
                    }

                    // Find common prefix among all patterns
                    let prefix_strs: Vec<&str> = prefixes
                        .iter()
                        .filter_map(|p| p.as_ref().map(|s| s.as_str()))
                        .collect();

                    let common_prefix = Self::longest_common_prefix(&prefix_strs);

                    if common_prefix.is_empty() {
                        return (PathBuf::from(common_root), Some(common_root.to_string()));
                    }

                    let walk_root = PathBuf::from(common_root).join(&common_prefix);
                    let full_prefix = if common_root.ends_with('/') {
                        format!("{common_root}{common_prefix}")
                    } else {
                        format!("{common_root}/{common_prefix}")
                    };
                    return (walk_root, Some(full_prefix));
                }
            }

            // Mixed absolute and relative patterns, or different roots
            // Fall back to walking from cwd for relative patterns
            // This is a limitation - we can't efficiently handle mixed patterns
            return (self.cwd.clone(), None);
        }

        // Get literal prefixes from all patterns
        let prefixes: Vec<Option<String>> =
            self.patterns.iter().map(|p| p.literal_prefix()).collect();

        // If any pattern has no prefix (e.g., `**/*.js` or `*.txt`), we must walk from cwd
        if prefixes.iter().any(|p| p.is_none()) {
            return (self.cwd.clone(), None);
        }

        // All patterns have prefixes - find the longest common prefix
        let prefix_strs: Vec<&str> = prefixes
            .iter()
            .filter_map(|p| p.as_ref().map(|s| s.as_str()))
            .collect();

        if prefix_strs.is_empty() {
            return (self.cwd.clone(), None);
        }

        // Find the longest common prefix among all pattern prefixes
        let common_prefix = Self::longest_common_prefix(&prefix_strs);

        if common_prefix.is_empty() {
            return (self.cwd.clone(), None);
        }

        // Construct the walk root
        let walk_root = self.cwd.join(&common_prefix);

        // Verify the walk root exists before using it. The walk itself still
        // tolerates a missing/unreadable root (it just yields no entries), so
        // this only logs the `WalkRootError` that describes why, rather than
        // failing the walk.
        if let Err(err) = check_walk_root(&walk_root) {
            tracing::debug!(error = %err, "walk root not usable, walk will yield no entries");
            return (walk_root, Some(common_prefix));
        }

        (walk_root, Some(common_prefix))
    }

    /// Group patterns by their first-level literal prefix.
    ///
    /// This enables multi-base walking: instead of walking from cwd when patterns
    /// have different prefixes, we walk from each unique prefix separately.
    ///
    /// Returns a map of prefix -> pattern indices.
    /// Patterns without a prefix (e.g., `**/*.js`) go into the `None` group.
    ///
    /// # Example
    /// ```ignore
    /// patterns: ["src/**/*.ts", "src/lib/*.ts", "test/**/*.ts", "**/*.js"]
    /// Result: {
    ///   Some("src") -> [0, 1],
    ///   Some("test") -> [2],
    ///   None -> [3]
    /// }
    /// ```
    fn group_patterns_by_base(&self) -> std::collections::HashMap<Option<String>, Vec<usize>> {
        use std::collections::HashMap;
        let mut groups: HashMap<Option<String>, Vec<usize>> = HashMap::new();

        for (idx, pattern) in self.patterns.iter().enumerate() {
            // Get the first component of the literal prefix
            // This is more aggressive grouping than using the full prefix
            let base = pattern.literal_prefix().map(|prefix| {
                // Get just the first path component
                prefix
                    .split('/')
                    .next()
                    .map(|s| s.to_string())
                    .unwrap_or(prefix)
            });

            groups.entry(base).or_default().push(idx);
        }

        groups
    }

    /// Check if multi-base walking would be beneficial.
    ///
    /// Multi-base walking helps when:
    /// 1. All patterns have literal prefixes (no patterns like `**/*.js`)
    /// 2. There are multiple distinct first-level prefixes (e.g., `src` and `test`)
    /// 3. All prefixes point to existing directories
    fn should_use_multi_base_walking(&self) -> bool {
        // Quick check: if any pattern has no prefix, we can't use multi-base
        if self.patterns.iter().any(|p| p.literal_prefix().is_none()) {
            return false;
        }

        // Get first-level bases
        let groups = self.group_patterns_by_base();

        // Need at least 2 distinct bases to benefit from multi-base walking
        if groups.len() < 2 {
            return false;
        }

        // All groups must have Some base (no None group)
        if groups.contains_key(&None) {
            return false;
        }

        // Check that all base directories exist
        groups.keys().all(|base| {
            if let Some(base_str) = base {
                self.cwd.join(base_str).exists()
            } else {
                false
            }
        })
    }

    /// Walk using multiple base directories in parallel using rayon.
    ///
    /// This is an optimization for patterns like `['src/**/*.ts', 'test/**/*.ts']`.
    /// Instead of walking from cwd and visiting all directories, we walk from
    /// `src/` and `test/` concurrently using rayon's parallel iterators.
    ///
    /// Each base directory is processed in parallel, and results are merged
    /// with deduplication at the end.
    fn walk_multi_base(&self) -> Vec<String> {
        let groups = self.group_patterns_by_base();
        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());

        // Convert groups to a Vec for parallel iteration
        let groups_vec: Vec<(Option<String>, Vec<usize>)> = groups.into_iter().collect();

        // Process each base group in parallel using rayon
        // Each group returns its own Vec of results (local deduplication)
        let group_results: Vec<Vec<String>> = groups_vec
            .par_iter()
            .filter_map(|(base, pattern_indices)| {
                // Skip groups without a valid base
                base.as_ref()?;

                Some(self.walk_single_base_group(pattern_indices, &abs_cwd))
            })
            .collect();

        // Merge all results and deduplicate
        let estimated_capacity = self.estimate_result_capacity();
        let mut seen: AHashSet<String> = AHashSet::with_capacity(estimated_capacity);
        let mut results = Vec::with_capacity(estimated_capacity);

        for group_result in group_results {
            for result in group_result {
                if seen.insert(result.clone()) {
                    results.push(result);
                }
            }
        }

        results
    }

    /// Walk a single base directory group and return results.
    ///
    /// This method is designed to be called in parallel from `walk_multi_base`.
    /// It handles all the logic for walking a single base directory and matching
    /// patterns within that group.
    fn walk_single_base_group(&self, pattern_indices: &[usize], abs_cwd: &Path) -> Vec<String> {
        let estimated_capacity = self.estimate_result_capacity() / 4; // Smaller per-group
        let mut results = Vec::with_capacity(estimated_capacity);
        let mut seen: AHashSet<String> = AHashSet::with_capacity(estimated_capacity);
        let mut ignored_dirs: AHashSet<String> = AHashSet::with_capacity(8);
        let mut matched_parents: AHashSet<String> = if self.include_child_matches {
            AHashSet::new()
        } else {
            AHashSet::with_capacity(estimated_capacity / 4)
        };
        let mut result_buffer = String::with_capacity(self.estimate_path_buffer_capacity());
        let has_ignore_filter = self.ignore_filter.is_some();

        // Get the patterns for this group
        let group_patterns: Vec<&Pattern> =
            pattern_indices.iter().map(|&i| &self.patterns[i]).collect();

        // Find the longest common prefix within this group
        let prefixes: Vec<Option<String>> =
            group_patterns.iter().map(|p| p.literal_prefix()).collect();
        let prefix_strs: Vec<&str> = prefixes
            .iter()
            .filter_map(|p| p.as_ref().map(|s| s.as_str()))
            .collect();
        let common_prefix = Self::longest_common_prefix(&prefix_strs);

        // Walk from the common prefix (at least the base)
        let walk_root = self.cwd.join(&common_prefix);
        let prefix_to_strip = if common_prefix.is_empty() {
            None
        } else {
            Some(common_prefix.clone())
        };

        // Pre-compute the prefix with trailing slash for efficient path concatenation
        let prefix_with_slash: Option<String> =
            prefix_to_strip.as_ref().map(|prefix| format!("{prefix}/"));

        // Adjust walk options for this prefix
        let adjusted_walk_options = if let Some(ref prefix) = prefix_to_strip {
            let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();
            if let Some(max_d) = self.walk_options.max_depth {
                if max_d <= prefix_depth {
                    self.walk_options.clone().max_depth(Some(0))
                } else {
                    self.walk_options
                        .clone()
                        .max_depth(Some(max_d - prefix_depth))
                }
            } else {
                self.walk_options.clone()
            }
        } else {
            self.walk_options.clone()
        };

        // Create pruning filter for this group's patterns
        let patterns_arc: Arc<[Pattern]> = group_patterns.iter().cloned().cloned().collect();
        let prefix_for_filter = prefix_to_strip.clone();
        let prefix_slash_for_filter = prefix_with_slash.clone();

        let prune_filter = Box::new(move |dir_path: &str| -> bool {
            let path_from_cwd: Cow<'_, str> = if let Some(ref prefix) = prefix_for_filter {
                if dir_path.is_empty() {
                    Cow::Borrowed(prefix.as_str())
                } else if let Some(ref prefix_slash) = prefix_slash_for_filter {
                    Cow::Owned(format!("{prefix_slash}{dir_path}"))
                } else {
                    Cow::Owned(format!("{prefix}/{dir_path}"))
                }
            } else {
                Cow::Borrowed(dir_path)
            };

            patterns_arc
                .iter()
                .any(|p| p.could_match_in_dir(&path_from_cwd))
        });

        // Create walker for this group
        let mut walker = Walker::new(walk_root.clone(), adjusted_walk_options)
            .with_dir_prune_filter(prune_filter);
        if let Some(ref token) = self.cancel {
            walker = walker.with_cancellation_token(token.clone());
        }

        // Walk and collect results
        for entry in walker.walk() {
            let path = entry.path();

            let rel_path_from_walk_root = match path.strip_prefix(&walk_root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let rel_str_from_walk_root = rel_path_from_walk_root.to_string_lossy();
            let is_walk_root_entry = rel_str_from_walk_root.is_empty();

            let normalized = self.normalize_path(
                &rel_str_from_walk_root,
                &prefix_to_strip,
                is_walk_root_entry,
            );

            if self.is_in_ignored_dir(&normalized, &ignored_dirs) {
                continue;
            }

            if has_ignore_filter {
                let rel_path = if prefix_to_strip.is_some() {
                    PathBuf::from(normalized.as_ref())
                } else {
                    rel_path_from_walk_root.to_path_buf()
                };
                let abs_path = abs_cwd.join(&rel_path);
                let ignore_filter = self.ignore_filter.as_ref().unwrap();

                if ignore_filter.should_ignore(&normalized, &abs_path) {
                    if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                        ignored_dirs.insert(normalized.into_owned());
                    }
                    continue;
                }

                if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                    ignored_dirs.insert(normalized.to_string());
                }
            }

            // Handle root of walk_root - for multi-base, this is the base directory itself
            if is_walk_root_entry {
                // The base directory (e.g., "src") - check if any pattern matches it
                let matches_base = group_patterns.iter().any(|p| {
                    let path_matches = match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    };
                    if path_matches && p.requires_dir() {
                        true // It's the base dir, which is a directory
                    } else {
                        path_matches
                    }
                });

                if matches_base && !self.nodir {
                    if let Some(ref ignore_filter) = self.ignore_filter {
                        let abs_path = abs_cwd.join(&*normalized);
                        if ignore_filter.should_ignore(&normalized, &abs_path) {
                            continue;
                        }
                    }

                    let result = self.build_result_path(
                        &normalized,
                        true, // is_dir
                        entry.is_symlink(),
                        abs_cwd,
                        &mut result_buffer,
                    );

                    if seen.insert(result.clone()) {
                        if !self.include_child_matches {
                            matched_parents.insert(normalized.into_owned());
                        }
                        results.push(result);
                    }
                }
                continue;
            }

            if normalized.is_empty() {
                continue;
            }

            if self.nodir && entry.is_dir() {
                continue;
            }

            if !self.dot && !self.path_allowed_by_dot_rules(&normalized) {
                continue;
            }

            if !self.include_child_matches
                && self.is_child_of_matched(&normalized, &matched_parents)
            {
                continue;
            }

            let is_dir = entry.is_dir();
            let is_symlink = entry.is_symlink();

            // Check if any pattern in this group matches
            let matches = group_patterns.iter().any(|p| {
                let path_matches = match p.matches_fast(&normalized) {
                    Some(result) => result,
                    None => p.matches(&normalized),
                };
                if path_matches && p.requires_dir() {
                    is_dir
                } else {
                    path_matches
                }
            });

            if matches {
                let result = self.build_result_path(
                    &normalized,
                    is_dir,
                    is_symlink,
                    abs_cwd,
                    &mut result_buffer,
                );

                if seen.insert(result.clone()) {
                    if !self.include_child_matches {
                        matched_parents.insert(normalized.into_owned());
                    }
                    results.push(result);
                }
            }
        }

        results
    }

    /// Find the longest common prefix among a list of paths.
    ///
    /// For example:
    /// - `["src/lib", "src/bin"]` -> `"src"`
    /// - `["src", "test"]` -> `""`
    /// - `["packages/foo", "packages/bar"]` -> `"packages"`
    fn longest_common_prefix(paths: &[&str]) -> String {
        if paths.is_empty() {
            return String::new();
        }

        if paths.len() == 1 {
            return paths[0].to_string();
        }

        // Split all paths into components
        let path_components: Vec<Vec<&str>> =
            paths.iter().map(|p| p.split('/').collect()).collect();

        // Find the minimum length
        let min_len = path_components.iter().map(|c| c.len()).min().unwrap_or(0);

        // Find common prefix components
        let mut common_components: Vec<&str> = Vec::new();
        for i in 0..min_len {
            let first = path_components[0][i];
            if path_components.iter().all(|c| c[i] == first) {
                common_components.push(first);
            } else {
                break;
            }
        }

        common_components.join("/")
    }

    /// Check if all patterns are static (no wildcards, can be resolved with stat()).
    ///
    /// Static patterns are patterns like `package.json` or `src/index.ts` that
    /// resolve to a single path and can be checked with a direct stat() call
    /// instead of walking the entire directory tree.
    fn all_patterns_static(&self) -> bool {
        !self.patterns.is_empty() && self.patterns.iter().all(|p| p.is_static())
    }

    /// Check if all patterns are shallow (max_depth 0, root-level only).
    ///
    /// Shallow patterns like `*.js` or `*.{ts,tsx}` can be resolved with a single
    /// readdir call instead of using the full walker machinery.
    fn all_patterns_shallow(&self) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        // All patterns must have max_depth of 0 (no path separators, no **)
        self.patterns.iter().all(|p| p.max_depth() == Some(0))
    }

    /// Resolve shallow patterns using direct readdir.
    ///
    /// This is a fast path for patterns like `*.js` that only match at the root level.
    /// Instead of using the full walker machinery with all its overhead, we do a
    /// single readdir and filter the results.
    fn resolve_shallow_patterns(&self) -> Vec<String> {
        use std::fs;

        let mut results = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();

        // Read the directory entries directly
        let entries = match fs::read_dir(&self.cwd) {
            Ok(rd) => rd,
            Err(_) => return results,
        };

        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());

        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let file_name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };

            // Filter dotfiles if dot option is false
            if !self.dot && file_name.starts_with('.') {
                continue;
            }

            // Get file type - use file_type() from DirEntry when possible
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };

            let is_dir_raw = file_type.is_dir();
            let is_symlink = file_type.is_symlink();

            // If following symlinks and this is a symlink, get target type
            // Note: entry.metadata() returns metadata for the symlink itself on macOS,
            // not the target. Use fs::metadata() on the path to follow the symlink.
            let is_dir = if is_symlink && self.follow {
                match fs::metadata(entry.path()) {
                    Ok(meta) => meta.is_dir(),
                    Err(_) => false, // Broken symlink
                }
            } else {
                is_dir_raw
            };

            // Skip directories if nodir is true
            if self.nodir && is_dir {
                continue;
            }

            // Check if any pattern matches
            let matches = self.patterns.iter().any(|p| {
                let path_matches = match p.matches_fast(&file_name) {
                    Some(result) => result,
                    None => p.matches(&file_name),
                };
                if path_matches && p.requires_dir() {
                    is_dir
                } else {
                    path_matches
                }
            });

            if !matches {
                continue;
            }

            // Build result path
            let result = if self.absolute {
                let abs_path = abs_cwd.join(&file_name);
                let formatted = if self.posix {
                    abs_path.to_string_lossy().replace('\\', "/")
                } else {
                    abs_path.to_string_lossy().to_string()
                };
                if self.mark && is_dir && !is_symlink && !formatted.ends_with('/') {
                    format!("{formatted}/")
                } else {
                    formatted
                }
            } else {
                let base = if self.dot_relative {
                    format!("./{file_name}")
                } else {
                    file_name.clone()
                };
                if self.mark && is_dir && !is_symlink && !base.ends_with('/') {
                    format!("{base}/")
                } else {
                    base
                }
            };

            if seen.insert(result.clone()) {
                results.push(result);
            }
        }

        results
    }

    /// Resolve static patterns directly using stat() instead of walking.
    ///
    /// This is a fast path for patterns like `package.json` or `src/index.ts`
    /// that can be resolved to a single file path. Instead of walking the
    /// directory tree and matching each file, we directly check if the file
    /// exists.
    ///
    /// Returns a Vec of matching paths.
    fn resolve_static_patterns(&self) -> Vec<String> {
        use std::fs;

        let mut results = Vec::with_capacity(self.patterns.len());
        let mut seen: AHashSet<String> = AHashSet::with_capacity(self.patterns.len());

        for pattern in self.patterns.iter() {
            if let Some(static_path) = pattern.static_path() {
                // Construct the full path
                let full_path = self.cwd.join(static_path);

                // Check if the file exists
                let metadata = if self.follow {
                    fs::metadata(&full_path)
                } else {
                    fs::symlink_metadata(&full_path)
                };

                if let Ok(meta) = metadata {
                    let is_dir = meta.is_dir();
                    let is_symlink = meta.file_type().is_symlink();

                    // Check nodir option
                    if self.nodir && is_dir {
                        continue;
                    }

                    // Check if pattern requires directory (ends with /)
                    if pattern.requires_dir() && !is_dir {
                        continue;
                    }

                    // Apply ignore filter if present
                    if let Some(ref filter) = self.ignore_filter {
                        if filter.should_ignore(static_path, &full_path) {
                            continue;
                        }
                    }

                    // Check dot option
                    if !self.dot {
                        let has_hidden = static_path
                            .split('/')
                            .any(|seg| seg.starts_with('.') && seg != "." && seg != "..");
                        if has_hidden && !pattern.allows_dotfile(static_path) {
                            continue;
                        }
                    }

                    // Strip trailing slash from static path (glob returns paths without trailing slash unless mark: true)
                    let base_path = static_path.trim_end_matches('/');

                    // Format the result path
                    let result = if self.absolute {
                        let abs_path = full_path.canonicalize().unwrap_or(full_path.clone());
                        let formatted = if self.posix {
                            abs_path.to_string_lossy().replace('\\', "/")
                        } else {
                            abs_path.to_string_lossy().to_string()
                        };
                        if self.mark && is_dir && !is_symlink && !formatted.ends_with('/') {
                            format!("{formatted}/")
                        } else {
                            formatted
                        }
                    } else {
                        let base = if self.dot_relative && !base_path.starts_with("../") {
                            format!("./{base_path}")
                        } else {
                            base_path.to_string()
                        };
                        if self.mark && is_dir && !is_symlink && !base.ends_with('/') {
                            format!("{base}/")
                        } else {
                            base
                        }
                    };

                    // Deduplicate (in case of brace expansion producing duplicates)
                    if seen.insert(result.clone()) {
                        results.push(result);
                    }
                }
            }
        }

        results
    }

    /// Walk the directory tree and stream results via callback.
    /// This reduces peak memory usage by not collecting all results into a Vec.
    pub fn walk_stream<F>(&self, mut callback: F)
    where
        F: FnMut(String),
    {
        // If maxDepth is negative, return empty results
        if let Some(d) = self.max_depth {
            if d < 0 {
                return;
            }
        }

        // Use AHashSet for deduplication (can't eliminate this for correctness)
        let mut seen: AHashSet<String> = AHashSet::with_capacity(self.estimate_result_capacity());
        let mut ignored_dirs: AHashSet<String> = AHashSet::with_capacity(8);

        // When includeChildMatches is false, track matched paths to exclude their children
        let mut matched_parents: AHashSet<String> = if self.include_child_matches {
            AHashSet::new()
        } else {
            AHashSet::with_capacity(64)
        };

        // Pre-allocate a reusable buffer for path formatting
        let mut result_buffer = String::with_capacity(self.estimate_path_buffer_capacity());

        // Check if any pattern matches the cwd itself
        let include_cwd = self.patterns.iter().any(|p| {
            let raw = p.raw();
            raw == "**" || raw == "." || raw == "./**" || {
                let preprocessed = preprocess_pattern(raw);
                preprocessed == "**" || preprocessed == "."
            }
        });

        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());
        let (walk_root, prefix_to_strip) = self.calculate_walk_root();

        // Pre-compute the prefix with trailing slash for efficient path concatenation
        let prefix_with_slash: Option<String> =
            prefix_to_strip.as_ref().map(|prefix| format!("{prefix}/"));

        // Adjust walk options for prefix-based walking
        let adjusted_walk_options = if let Some(ref prefix) = prefix_to_strip {
            let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();
            if let Some(max_d) = self.walk_options.max_depth {
                if max_d <= prefix_depth {
                    self.walk_options.clone().max_depth(Some(0))
                } else {
                    self.walk_options
                        .clone()
                        .max_depth(Some(max_d - prefix_depth))
                }
            } else {
                self.walk_options.clone()
            }
        } else {
            self.walk_options.clone()
        };

        // Create directory pruning filter
        let patterns_for_filter = Arc::clone(&self.patterns);
        let prefix_for_filter = prefix_to_strip.clone();
        let prefix_slash_for_filter = prefix_with_slash.clone();

        let prune_filter = Box::new(move |dir_path: &str| -> bool {
            let path_from_cwd: Cow<'_, str> = if let Some(ref prefix) = prefix_for_filter {
                if dir_path.is_empty() {
                    Cow::Borrowed(prefix.as_str())
                } else if let Some(ref prefix_slash) = prefix_slash_for_filter {
                    Cow::Owned(format!("{prefix_slash}{dir_path}"))
                } else {
                    Cow::Owned(format!("{prefix}/{dir_path}"))
                }
            } else {
                Cow::Borrowed(dir_path)
            };

            patterns_for_filter
                .iter()
                .any(|p| p.could_match_in_dir(&path_from_cwd))
        });

        let mut walker = Walker::new(walk_root.clone(), adjusted_walk_options)
            .with_dir_prune_filter(prune_filter);
        if let Some(ref token) = self.cancel {
            walker = walker.with_cancellation_token(token.clone());
        }

        let has_ignore_filter = self.ignore_filter.is_some();

        for entry in walker.walk() {
            let path = entry.path();

            let rel_path_from_walk_root = match path.strip_prefix(&walk_root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let rel_str_from_walk_root = rel_path_from_walk_root.to_string_lossy();
            let is_walk_root_entry = rel_str_from_walk_root.is_empty();

            let normalized = self.normalize_path(
                &rel_str_from_walk_root,
                &prefix_to_strip,
                is_walk_root_entry,
            );

            if self.is_in_ignored_dir(&normalized, &ignored_dirs) {
                continue;
            }

            if has_ignore_filter {
                let rel_path = if prefix_to_strip.is_some() {
                    PathBuf::from(normalized.as_ref())
                } else {
                    rel_path_from_walk_root.to_path_buf()
                };
                let abs_path = abs_cwd.join(&rel_path);
                let ignore_filter = self.ignore_filter.as_ref().unwrap();

                if ignore_filter.should_ignore(&normalized, &abs_path) {
                    if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                        ignored_dirs.insert(normalized.into_owned());
                    }
                    continue;
                }

                if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                    ignored_dirs.insert(normalized.to_string());
                }
            }

            // Handle root
            if is_walk_root_entry && prefix_to_strip.is_none() {
                if include_cwd && !self.nodir {
                    if let Some(ref ignore_filter) = self.ignore_filter {
                        if ignore_filter.should_ignore(".", &abs_cwd) {
                            continue;
                        }
                    }

                    let result = if self.absolute {
                        let formatted = self.format_path_into_buffer(&abs_cwd, &mut result_buffer);
                        if self.mark {
                            if formatted.ends_with('/') || formatted.ends_with('\\') {
                                formatted.to_string()
                            } else {
                                format!("{formatted}/")
                            }
                        } else {
                            formatted.to_string()
                        }
                    } else if self.mark {
                        "./".to_string()
                    } else {
                        ".".to_string()
                    };
                    if seen.insert(result.clone()) {
                        callback(result);
                    }
                }
                continue;
            }

            if normalized.is_empty() {
                continue;
            }

            if self.nodir && entry.is_dir() {
                continue;
            }

            if !self.dot && !self.path_allowed_by_dot_rules(&normalized) {
                continue;
            }

            if !self.include_child_matches
                && self.is_child_of_matched(&normalized, &matched_parents)
            {
                continue;
            }

            let is_dir = entry.is_dir();
            let is_symlink = entry.is_symlink();

            let matches = if !self.any_pattern_requires_dir {
                self.patterns
                    .iter()
                    .any(|p| match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    })
            } else {
                self.patterns.iter().any(|p| {
                    let path_matches = match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    };
                    if path_matches && p.requires_dir() {
                        is_dir
                    } else {
                        path_matches
                    }
                })
            };

            if matches {
                let result = self.build_result_path(
                    &normalized,
                    is_dir,
                    is_symlink,
                    &abs_cwd,
                    &mut result_buffer,
                );

                if seen.insert(result.clone()) {
                    if !self.include_child_matches {
                        matched_parents.insert(normalized.into_owned());
                    }
                    callback(result);
                }
            }
        }
    }

    /// Walk the directory tree and stream GlobResult results via callback.
    /// This reduces peak memory usage by not collecting all results into a Vec.
    pub fn walk_stream_with_file_types<F>(&self, mut callback: F)
    where
        F: FnMut(GlobResult),
    {
        // If maxDepth is negative, return empty results
        if let Some(d) = self.max_depth {
            if d < 0 {
                return;
            }
        }

        let mut seen: AHashSet<String> = AHashSet::with_capacity(self.estimate_result_capacity());
        let mut ignored_dirs: AHashSet<String> = AHashSet::with_capacity(8);
        let mut matched_parents: AHashSet<String> = if self.include_child_matches {
            AHashSet::new()
        } else {
            AHashSet::with_capacity(64)
        };

        let include_cwd = self.patterns.iter().any(|p| {
            let raw = p.raw();
            raw == "**" || raw == "." || raw == "./**" || {
                let preprocessed = preprocess_pattern(raw);
                preprocessed == "**" || preprocessed == "."
            }
        });

        let abs_cwd = self.cwd.canonicalize().unwrap_or_else(|_| self.cwd.clone());
        let (walk_root, prefix_to_strip) = self.calculate_walk_root();

        let adjusted_walk_options = if let Some(ref prefix) = prefix_to_strip {
            let prefix_depth = prefix.split('/').filter(|s| !s.is_empty()).count();
            if let Some(max_d) = self.walk_options.max_depth {
                if max_d <= prefix_depth {
                    self.walk_options.clone().max_depth(Some(0))
                } else {
                    self.walk_options
                        .clone()
                        .max_depth(Some(max_d - prefix_depth))
                }
            } else {
                self.walk_options.clone()
            }
        } else {
            self.walk_options.clone()
        };

        let patterns_for_filter = Arc::clone(&self.patterns);
        let prefix_for_filter = prefix_to_strip.clone();

        let prune_filter = Box::new(move |dir_path: &str| -> bool {
            let path_from_cwd: Cow<'_, str> = if let Some(ref prefix) = prefix_for_filter {
                if dir_path.is_empty() {
                    Cow::Borrowed(prefix.as_str())
                } else {
                    Cow::Owned(format!("{prefix}/{dir_path}"))
                }
            } else {
                Cow::Borrowed(dir_path)
            };

            patterns_for_filter
                .iter()
                .any(|p| p.could_match_in_dir(&path_from_cwd))
        });

        let mut walker = Walker::new(walk_root.clone(), adjusted_walk_options)
            .with_dir_prune_filter(prune_filter);
        if let Some(ref token) = self.cancel {
            walker = walker.with_cancellation_token(token.clone());
        }

        let has_ignore_filter = self.ignore_filter.is_some();

        for entry in walker.walk() {
            let path = entry.path();

            let rel_path_from_walk_root = match path.strip_prefix(&walk_root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let rel_str_from_walk_root = rel_path_from_walk_root.to_string_lossy();
            let is_walk_root_entry = rel_str_from_walk_root.is_empty();

            let normalized = self.normalize_path(
                &rel_str_from_walk_root,
                &prefix_to_strip,
                is_walk_root_entry,
            );

            if self.is_in_ignored_dir(&normalized, &ignored_dirs) {
                continue;
            }

            if has_ignore_filter {
                let rel_path = if prefix_to_strip.is_some() {
                    PathBuf::from(normalized.as_ref())
                } else {
                    rel_path_from_walk_root.to_path_buf()
                };
                let abs_path = abs_cwd.join(&rel_path);
                let ignore_filter = self.ignore_filter.as_ref().unwrap();

                if ignore_filter.should_ignore(&normalized, &abs_path) {
                    if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                        ignored_dirs.insert(normalized.into_owned());
                    }
                    continue;
                }

                if entry.is_dir() && ignore_filter.children_ignored(&normalized, &abs_path) {
                    ignored_dirs.insert(normalized.to_string());
                }
            }

            if is_walk_root_entry && prefix_to_strip.is_none() {
                if include_cwd && !self.nodir {
                    if let Some(ref ignore_filter) = self.ignore_filter {
                        if ignore_filter.should_ignore(".", &abs_cwd) {
                            continue;
                        }
                    }

                    let result_path = ".".to_string();
                    if seen.insert(result_path.clone()) {
                        callback(GlobResult {
                            path: result_path,
                            is_directory: true,
                            is_file: false,
                            is_symlink: entry.is_symlink(),
                        });
                    }
                }
                continue;
            }

            if normalized.is_empty() {
                continue;
            }

            if self.nodir && entry.is_dir() {
                continue;
            }

            if !self.dot && !self.path_allowed_by_dot_rules(&normalized) {
                continue;
            }

            if !self.include_child_matches
                && self.is_child_of_matched(&normalized, &matched_parents)
            {
                continue;
            }

            let is_dir = entry.is_dir();

            let matches = if !self.any_pattern_requires_dir {
                self.patterns
                    .iter()
                    .any(|p| match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    })
            } else {
                self.patterns.iter().any(|p| {
                    let path_matches = match p.matches_fast(&normalized) {
                        Some(result) => result,
                        None => p.matches(&normalized),
                    };
                    if path_matches && p.requires_dir() {
                        is_dir
                    } else {
                        path_matches
                    }
                })
            };

            if matches {
                let normalized_string = normalized.into_owned();
                if seen.insert(normalized_string.clone()) {
                    if !self.include_child_matches {
                        matched_parents.insert(normalized_string.clone());
                    }

                    callback(GlobResult {
                        path: normalized_string,
                        is_directory: is_dir,
                        is_file: entry.is_file(),
                        is_symlink: entry.is_symlink(),
                    });
                }
            }
        }
    }
}
