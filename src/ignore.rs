use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use crate::pattern::{expand_braces, Pattern, PatternOptions};

/// A caller-supplied ignore predicate, the object form of the `ignore`
/// option (alongside or instead of patterns). `ignored`/`children_ignored`
/// mirror the pattern-based `should_ignore`/`children_ignored` split: the
/// first governs whether a single path is dropped, the second whether an
/// entire subtree is pruned without being read.
///
/// Predicate vetoes are final: unlike pattern-based ignores, they are never
/// reconsidered when `include_child_matches` is disabled.
pub trait IgnorePredicate: Send + Sync {
    fn ignored(&self, path: &Path) -> bool;
    fn children_ignored(&self, path: &Path) -> bool;
}

/// `GlobOptions`-embeddable handle around a predicate. Wrapping it lets
/// `GlobOptions` keep deriving `Debug`/`Clone` without requiring every
/// predicate implementation to also implement them.
#[derive(Clone)]
pub struct IgnorePredicateHandle(pub Arc<dyn IgnorePredicate>);

impl std::fmt::Debug for IgnorePredicateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IgnorePredicateHandle(..)")
    }
}

/// Ignore filter for glob matching
///
/// Ignores paths matching the ignore patterns.
/// Ignore patterns are always parsed in dot:true mode.
/// Patterns ending in /** can skip entire directory trees.
pub struct IgnoreFilter {
    /// Patterns that match against relative paths
    relative: Vec<Pattern>,
    /// Patterns that indicate children should be ignored (ends with /**)
    relative_children: Vec<Pattern>,
    /// Patterns that match against absolute paths
    absolute: Vec<Pattern>,
    /// Absolute patterns that indicate children should be ignored
    absolute_children: Vec<Pattern>,
    /// Pattern options for creating patterns
    pattern_opts: PatternOptions,
    /// Optional caller-supplied predicate, checked against absolute paths
    /// alongside the pattern sets above.
    predicate: Option<Arc<dyn IgnorePredicate>>,
}

/// Normalize path separators, avoiding allocation when no backslashes are present.
/// Returns Cow::Borrowed when the input already uses forward slashes only.
#[inline]
fn normalize_path_separators(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Build path with trailing slash, avoiding allocation when already has slash.
#[inline]
fn with_trailing_slash<'a>(path: &'a str, buffer: &'a mut String) -> &'a str {
    if path == "." {
        "./"
    } else if path.ends_with('/') {
        path
    } else {
        buffer.clear();
        buffer.reserve(path.len() + 1);
        buffer.push_str(path);
        buffer.push('/');
        buffer.as_str()
    }
}

impl IgnoreFilter {
    /// Create a new IgnoreFilter from ignore patterns
    pub fn new(ignore_patterns: Vec<String>, noext: bool, windows_paths_no_escape: bool) -> Self {
        let pattern_opts = PatternOptions {
            noext,
            windows_paths_no_escape,
            nocase: false, // Ignore patterns are always case-sensitive per glob behavior
            ..Default::default()
        };

        let mut filter = Self {
            relative: Vec::new(),
            relative_children: Vec::new(),
            absolute: Vec::new(),
            absolute_children: Vec::new(),
            pattern_opts,
            predicate: None,
        };

        for pattern_str in ignore_patterns {
            filter.add(&pattern_str);
        }

        filter
    }

    /// Attach a predicate-based ignore alongside this filter's patterns.
    /// The predicate is consulted in addition to, not instead of, any
    /// patterns already added.
    pub fn with_predicate(mut self, predicate: Arc<dyn IgnorePredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Add an ignore pattern
    pub fn add(&mut self, pattern_str: &str) {
        // Expand braces first
        let expanded = expand_braces(pattern_str);
        let patterns_to_process = if expanded.is_empty() {
            vec![pattern_str.to_string()]
        } else {
            expanded
        };

        for pattern in patterns_to_process {
            // Strip leading ./ portions
            let stripped = pattern.trim_start_matches("./");

            // Check if this pattern ends with /** (children should be ignored)
            let is_children = stripped.ends_with("/**");

            // For children patterns, we need to match the parent directory
            // e.g., "node_modules/**" should match "node_modules" and its children
            let children_pattern = if is_children {
                // Create a pattern without the trailing /**
                let base = stripped.trim_end_matches("/**");
                if base.is_empty() {
                    None // "/**" alone doesn't make sense as a children pattern
                } else {
                    Some(base.to_string())
                }
            } else {
                None
            };

            // Check if pattern is absolute
            let is_absolute = stripped.starts_with('/')
                || (stripped.len() >= 2 && stripped.chars().nth(1) == Some(':'))
                || stripped.starts_with("//");

            // Create the pattern (ignore patterns always use dot:true mode internally)
            let pat = Pattern::with_pattern_options(stripped, self.pattern_opts.clone());

            if is_absolute {
                self.absolute.push(pat);
                if let Some(children_base) = children_pattern {
                    let children_pat =
                        Pattern::with_pattern_options(&children_base, self.pattern_opts.clone());
                    self.absolute_children.push(children_pat);
                }
            } else {
                self.relative.push(pat);
                if let Some(children_base) = children_pattern {
                    let children_pat =
                        Pattern::with_pattern_options(&children_base, self.pattern_opts.clone());
                    self.relative_children.push(children_pat);
                }
            }
        }
    }

    /// Check if a path should be ignored
    ///
    /// Both the path and path with trailing slash are checked.
    /// `rel_path` is the relative path from the glob's cwd.
    /// `abs_path` is the absolute path.
    pub fn should_ignore(&self, rel_path: &str, abs_path: &Path) -> bool {
        // Normalize the relative path (avoids allocation if no backslashes)
        let rel_normalized = normalize_path_separators(rel_path);

        // Build path with trailing slash using reusable buffer
        let mut slash_buffer = String::new();
        let rel_with_slash = with_trailing_slash(&rel_normalized, &mut slash_buffer);

        // Check relative patterns
        for pattern in &self.relative {
            // Use the pattern's match method which handles globstar correctly
            if pattern.matches(&rel_normalized) || pattern.matches(rel_with_slash) {
                return true;
            }
        }

        // Check absolute patterns
        let abs_lossy = abs_path.to_string_lossy();
        let abs_str = normalize_path_separators(&abs_lossy);

        // Reuse buffer for absolute path with slash
        slash_buffer.clear();
        let abs_with_slash = with_trailing_slash(&abs_str, &mut slash_buffer);

        for pattern in &self.absolute {
            if pattern.matches(&abs_str) || pattern.matches(abs_with_slash) {
                return true;
            }
        }

        if let Some(ref predicate) = self.predicate {
            if predicate.ignored(abs_path) {
                return true;
            }
        }

        false
    }

    /// Check if a directory's children should be ignored
    ///
    /// This is used to skip traversing into directories that match patterns like "node_modules/**".
    pub fn children_ignored(&self, rel_path: &str, abs_path: &Path) -> bool {
        // Normalize the relative path (avoids allocation if no backslashes)
        let rel_normalized = normalize_path_separators(rel_path);

        // Build path with trailing slash using reusable buffer
        let mut slash_buffer = String::new();
        let rel_with_slash = with_trailing_slash(&rel_normalized, &mut slash_buffer);

        // Check relative children patterns
        for pattern in &self.relative_children {
            if pattern.matches(&rel_normalized) || pattern.matches(rel_with_slash) {
                return true;
            }
        }

        // Check absolute children patterns
        let abs_lossy = abs_path.to_string_lossy();
        let abs_str = normalize_path_separators(&abs_lossy);

        // Reuse buffer for absolute path with slash
        slash_buffer.clear();
        let abs_with_slash = with_trailing_slash(&abs_str, &mut slash_buffer);

        for pattern in &self.absolute_children {
            if pattern.matches(&abs_str) || pattern.matches(abs_with_slash) {
                return true;
            }
        }

        if let Some(ref predicate) = self.predicate {
            if predicate.children_ignored(abs_path) {
                return true;
            }
        }

        false
    }

    /// Check if this filter has any patterns or a predicate attached
    pub fn is_empty(&self) -> bool {
        self.relative.is_empty()
            && self.absolute.is_empty()
            && self.relative_children.is_empty()
            && self.absolute_children.is_empty()
            && self.predicate.is_none()
    }
}
