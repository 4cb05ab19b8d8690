#![deny(clippy::all)]
#![allow(dead_code)]

// Module declarations
pub mod cache;
pub mod cancel;
pub mod error;
pub mod glob;
pub mod ignore;
pub mod options;
pub mod pattern;
pub mod processor;
pub mod util;
pub mod walker;

// SIMD-optimized string operations
pub mod simd;

// Re-exports
pub use cancel::CancellationToken;
pub use error::{GlobError, WalkRootError};
pub use glob::{compile, stream, walk, walk_async, CompiledPatternSet, GlobResult, GlobStream};
pub use ignore::{IgnorePredicate, IgnorePredicateHandle};
pub use options::{GlobOptions, IgnorePatterns};
pub use processor::iterate;
pub use processor::GlobIterator;

/// Escapes magic glob characters in a pattern so it matches literally.
///
/// `windows_paths_no_escape` selects `[x]` wrapping instead of backslash escapes.
pub fn escape(pattern: &str, windows_paths_no_escape: bool) -> String {
    pattern::escape_pattern(pattern, windows_paths_no_escape)
}

/// Reverses the effect of `escape`.
pub fn unescape(pattern: &str, windows_paths_no_escape: bool) -> String {
    pattern::unescape_pattern(pattern, windows_paths_no_escape)
}

/// True if `pattern` contains any magic (unescaped) glob characters.
pub fn has_magic(pattern: &str, noext: bool, windows_paths_no_escape: bool) -> bool {
    pattern::has_magic_in_pattern(pattern, noext, windows_paths_no_escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_then_unescape_roundtrips() {
        let escaped = escape("a*b?c", false);
        assert_eq!(unescape(&escaped, false), "a*b?c");
    }

    #[test]
    fn has_magic_detects_wildcards() {
        assert!(has_magic("*.rs", false, false));
        assert!(!has_magic("plain.rs", false, false));
    }
}
