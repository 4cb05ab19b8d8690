use crate::cancel::CancellationToken;
use crate::error::GlobError;
use crate::ignore::IgnorePredicateHandle;
use serde::{Deserialize, Serialize};

/// One or more ignore patterns, as passed through the `ignore` option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IgnorePatterns {
    Single(String),
    Many(Vec<String>),
}

impl IgnorePatterns {
    pub fn as_vec(&self) -> Vec<String> {
        match self {
            IgnorePatterns::Single(s) => vec![s.clone()],
            IgnorePatterns::Many(v) => v.clone(),
        }
    }
}

/// Complete GlobOptions struct with all glob v13 options.
///
/// All options are optional and false by default unless otherwise noted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GlobOptions {
    // ==================== Path Options ====================
    /// The current working directory in which to search.
    /// Defaults to the process cwd.
    pub cwd: Option<String>,

    /// A string path resolved against `cwd`, used as the starting point for
    /// absolute patterns that start with `/`.
    ///
    /// Note that this doesn't necessarily limit the walk to the `root` directory,
    /// and doesn't affect the cwd starting point for non-absolute patterns.
    /// A pattern containing `..` will still be able to traverse out of the root
    /// directory, if it is not an actual root directory on the filesystem.
    pub root: Option<String>,

    // ==================== Pattern Options ====================
    /// Include `.dot` files in normal matches and `globstar` matches.
    /// Note that an explicit dot in a portion of the pattern will always match dot files.
    pub dot: Option<bool>,

    /// Do not expand `{a,b}` and `{1..3}` brace sets.
    pub nobrace: Option<bool>,

    /// Do not match `**` against multiple filenames.
    /// (Ie, treat it as a normal `*` instead.)
    ///
    /// Conflicts with `match_base`.
    pub noglobstar: Option<bool>,

    /// Do not match "extglob" patterns such as `+(a|b)`.
    pub noext: Option<bool>,

    /// Perform a case-insensitive match.
    ///
    /// Defaults to `true` on macOS and Windows systems, and `false` on all others.
    pub nocase: Option<bool>,

    /// Treat brace expansion like `{a,b}` as a "magic" pattern.
    /// Has no effect if `nobrace` is set. Only affects `has_magic`.
    pub magical_braces: Option<bool>,

    // ==================== Traversal Options ====================
    /// Follow symlinked directories when expanding `**` patterns.
    /// This can result in a lot of duplicate references in the presence of
    /// cyclic links, and make performance quite bad.
    ///
    /// By default, a `**` in a pattern will follow 1 symbolic link if it is not
    /// the first item in the pattern, or none if it is the first item in the
    /// pattern, following the same behavior as Bash.
    pub follow: Option<bool>,

    /// Limit the directory traversal to a given depth below the cwd.
    ///
    /// - `None`: No limit (traverse all levels)
    /// - `0`: Only the starting directory itself
    /// - `1`: Starting directory and immediate children
    /// - `n`: Up to n levels deep from the starting directory
    ///
    /// Negative values result in empty results.
    pub max_depth: Option<i32>,

    /// Perform a basename-only match if the pattern does not contain any slash
    /// characters. Cannot be used with `noglobstar: true`.
    pub match_base: Option<bool>,

    // ==================== Output Options ====================
    /// Set to `true` to always receive absolute paths for matched files.
    /// Set to `false` to always return relative paths.
    ///
    /// When this option is not set, absolute paths are returned for patterns
    /// that are absolute, and otherwise paths are returned relative to `cwd`.
    ///
    /// Conflicts with `with_file_types`.
    pub absolute: Option<bool>,

    /// Prepend all relative path strings with `./` (or `.\` on Windows).
    ///
    /// Relative patterns starting with `../` are not prepended, even if this
    /// option is set.
    pub dot_relative: Option<bool>,

    /// Add a `/` character to directory matches.
    /// Note that this requires additional stat calls in some cases.
    pub mark: Option<bool>,

    /// Do not match directories, only files.
    /// (To match _only_ directories, put a `/` at the end of the pattern.)
    pub nodir: Option<bool>,

    /// Return `/` delimited paths, even on Windows.
    pub posix: Option<bool>,

    /// Return entries with file-type metadata attached instead of bare path
    /// strings. Conflicts with `absolute`.
    pub with_file_types: Option<bool>,

    // ==================== Performance Options ====================
    /// Call `lstat()` on all entries, whether required or not to determine
    /// if it's a valid match. When used with `with_file_types`, this means
    /// matches will include data such as modified time and permissions.
    pub stat: Option<bool>,

    /// Resolve the canonical path of every result. An entry that cannot be
    /// resolved is omitted.
    pub realpath: Option<bool>,

    // ==================== Filtering Options ====================
    /// Patterns to exclude from matching. Can be a single pattern or a list.
    ///
    /// **Note:** `ignore` patterns are always matched in `dot: true` mode,
    /// regardless of any other settings. Patterns ending in `/**` ignore the
    /// directory and all its children.
    pub ignore: Option<IgnorePatterns>,

    /// A predicate-based ignore, checked in addition to `ignore` patterns.
    /// `ignored(path)` drops a single entry; `children_ignored(path)` prunes
    /// an entire subtree without reading it. Unlike pattern-based ignores,
    /// a predicate veto is final and is never reconsidered when
    /// `include_child_matches` is disabled.
    ///
    /// Not (de)serializable; only reachable when constructing `GlobOptions`
    /// in-process.
    #[serde(skip)]
    pub ignore_predicate: Option<IgnorePredicateHandle>,

    /// Do not match any children of any matches.
    ///
    /// For example, a recursive pattern would match "a/foo" but not
    /// "a/foo/b/foo" in this mode. Defaults to `true`.
    pub include_child_matches: Option<bool>,

    // ==================== Platform Options ====================
    /// Defaults to the current OS if not set.
    ///
    /// Setting `platform: "win32"` on non-Windows systems may cause strange
    /// behavior.
    pub platform: Option<String>,

    /// Use `\` as a path separator _only_, and _never_ as an escape character.
    /// If set, all `\` characters are replaced with `/` in the pattern.
    pub windows_paths_no_escape: Option<bool>,

    /// Set to false to enable `windows_paths_no_escape`.
    ///
    /// Deprecated: use `windows_paths_no_escape` instead.
    pub allow_windows_escape: Option<bool>,

    // ==================== Performance Options (engine-specific) ====================
    /// Enable parallel directory walking using multiple threads.
    ///
    /// When `true`, uses parallel traversal, which can be faster on spinning
    /// disks, network filesystems, and very large trees, at the cost of
    /// result ordering. When `false` (default), uses serial traversal, which
    /// is faster on SSDs for small to medium trees and deterministic.
    pub parallel: Option<bool>,

    /// Enable the two-tier pattern/readdir cache (`cache.rs`).
    ///
    /// Safe to enable for short-lived, repeated walks over a mostly-static
    /// tree; stale listings can persist up to the cache's TTL, so leave this
    /// off for trees that change while the process runs.
    pub cache: Option<bool>,

    // ==================== Cancellation ====================
    /// Cooperative cancellation handle, checked before and during the walk.
    /// A token that is already cancelled when passed in causes `walk`/
    /// `walk_async`/`stream`/`iterate` to return `Err(GlobError::Cancelled)`
    /// before any directory is read.
    ///
    /// Not (de)serializable; only reachable when constructing `GlobOptions`
    /// in-process.
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,

    // ==================== Not supported ====================
    // A custom filesystem implementation and host-side debug logging are
    // host-language concerns that live above this crate's boundary.
}

impl GlobOptions {
    /// Get the effective windows_paths_no_escape value, considering the
    /// deprecated allow_windows_escape option.
    pub fn effective_windows_paths_no_escape(&self) -> bool {
        if let Some(val) = self.windows_paths_no_escape {
            val
        } else if let Some(allow) = self.allow_windows_escape {
            !allow
        } else {
            false
        }
    }

    /// Get the platform string, defaulting to the current OS.
    pub fn effective_platform(&self) -> String {
        if let Some(ref p) = self.platform {
            p.clone()
        } else {
            match std::env::consts::OS {
                "macos" => "darwin".to_string(),
                "windows" => "win32".to_string(),
                os => os.to_string(),
            }
        }
    }

    /// Get the effective nocase value based on platform defaults.
    /// - macOS (darwin): true
    /// - Windows (win32): true
    /// - Linux and others: false
    pub fn effective_nocase(&self) -> bool {
        if let Some(val) = self.nocase {
            val
        } else {
            let platform = self.effective_platform();
            platform == "darwin" || platform == "win32"
        }
    }

    /// Check if include_child_matches is enabled (defaults to true).
    pub fn effective_include_child_matches(&self) -> bool {
        self.include_child_matches.unwrap_or(true)
    }

    /// Check if the cache is enabled (defaults to false).
    pub fn effective_cache(&self) -> bool {
        self.cache.unwrap_or(false)
    }
}

/// Validate glob options, rejecting combinations the engine cannot honor.
pub fn validate_options(options: &GlobOptions) -> Result<(), GlobError> {
    if options.match_base.unwrap_or(false) && options.noglobstar.unwrap_or(false) {
        return Err(GlobError::Configuration(
            "base matching requires globstar".to_string(),
        ));
    }

    if options.with_file_types.unwrap_or(false) && options.absolute.is_some() {
        return Err(GlobError::Configuration(
            "cannot set absolute and withFileTypes:true".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = GlobOptions::default();
        assert!(opts.cwd.is_none());
        assert!(opts.dot.is_none());
        assert!(opts.absolute.is_none());
    }

    #[test]
    fn test_effective_windows_paths_no_escape() {
        let opts = GlobOptions::default();
        assert!(!opts.effective_windows_paths_no_escape());

        let opts = GlobOptions {
            windows_paths_no_escape: Some(true),
            ..Default::default()
        };
        assert!(opts.effective_windows_paths_no_escape());

        let opts = GlobOptions {
            allow_windows_escape: Some(false),
            ..Default::default()
        };
        assert!(opts.effective_windows_paths_no_escape());

        let opts = GlobOptions {
            windows_paths_no_escape: Some(false),
            allow_windows_escape: Some(false),
            ..Default::default()
        };
        assert!(!opts.effective_windows_paths_no_escape());
    }

    #[test]
    fn test_effective_platform() {
        let opts = GlobOptions {
            platform: Some("darwin".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.effective_platform(), "darwin");

        let opts = GlobOptions {
            platform: Some("win32".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.effective_platform(), "win32");

        let opts = GlobOptions::default();
        let platform = opts.effective_platform();
        assert!(!platform.is_empty());
    }

    #[test]
    fn test_effective_nocase() {
        let opts = GlobOptions {
            nocase: Some(true),
            ..Default::default()
        };
        assert!(opts.effective_nocase());

        let opts = GlobOptions {
            nocase: Some(false),
            ..Default::default()
        };
        assert!(!opts.effective_nocase());

        let opts = GlobOptions {
            platform: Some("darwin".to_string()),
            ..Default::default()
        };
        assert!(opts.effective_nocase());

        let opts = GlobOptions {
            platform: Some("win32".to_string()),
            ..Default::default()
        };
        assert!(opts.effective_nocase());

        let opts = GlobOptions {
            platform: Some("linux".to_string()),
            ..Default::default()
        };
        assert!(!opts.effective_nocase());
    }

    #[test]
    fn test_effective_include_child_matches() {
        let opts = GlobOptions::default();
        assert!(opts.effective_include_child_matches());

        let opts = GlobOptions {
            include_child_matches: Some(false),
            ..Default::default()
        };
        assert!(!opts.effective_include_child_matches());
    }

    #[test]
    fn test_effective_cache() {
        let opts = GlobOptions::default();
        assert!(!opts.effective_cache());

        let opts = GlobOptions {
            cache: Some(true),
            ..Default::default()
        };
        assert!(opts.effective_cache());
    }

    #[test]
    fn test_validate_options_valid() {
        let opts = GlobOptions::default();
        assert!(validate_options(&opts).is_ok());

        let opts = GlobOptions {
            match_base: Some(true),
            ..Default::default()
        };
        assert!(validate_options(&opts).is_ok());
    }

    #[test]
    fn test_validate_options_match_base_with_noglobstar() {
        let opts = GlobOptions {
            match_base: Some(true),
            noglobstar: Some(true),
            ..Default::default()
        };
        assert!(validate_options(&opts).is_err());
    }

    #[test]
    fn test_validate_options_with_file_types_and_absolute() {
        let opts = GlobOptions {
            with_file_types: Some(true),
            absolute: Some(true),
            ..Default::default()
        };
        assert!(validate_options(&opts).is_err());

        let opts = GlobOptions {
            with_file_types: Some(true),
            ..Default::default()
        };
        assert!(validate_options(&opts).is_ok());
    }

    #[test]
    fn test_ignore_patterns_as_vec() {
        let single = IgnorePatterns::Single("*.log".to_string());
        assert_eq!(single.as_vec(), vec!["*.log".to_string()]);

        let many = IgnorePatterns::Many(vec!["*.log".to_string(), "tmp/**".to_string()]);
        assert_eq!(many.as_vec(), vec!["*.log".to_string(), "tmp/**".to_string()]);
    }
}
