// Pull-style iteration over glob matches.

use crate::error::GlobError;
use crate::glob::{self, GlobResult};
use crate::options::GlobOptions;

/// Iterator over the matches of a single `iterate()` call.
///
/// The walk runs once, eagerly, when `iterate` is invoked; this wraps the
/// resulting `Vec<GlobResult>` so callers get `Iterator` ergonomics (early
/// `break`, `.take(n)`, chaining) without committing to streaming semantics.
/// Restartable per call to `iterate` but not per iteration: draining this
/// iterator does not re-walk the tree.
pub struct GlobIterator {
    inner: std::vec::IntoIter<GlobResult>,
}

impl Iterator for GlobIterator {
    type Item = GlobResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for GlobIterator {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Walk `patterns` under `options` and return a pull-style iterator over the matches.
///
/// Delegates to [`glob::walk`] so ignore filtering, dot rules, multi-base walk root
/// resolution, and caching all stay in one place: consuming the returned iterator
/// fully yields exactly the set `walk(patterns, options)` would return.
pub fn iterate(
    patterns: &[impl AsRef<str>],
    options: GlobOptions,
) -> Result<GlobIterator, GlobError> {
    let results = glob::walk(patterns, options)?;
    Ok(GlobIterator {
        inner: results.into_iter(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn create_test_fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let base = temp.path();

        File::create(base.join("foo.txt")).unwrap();
        File::create(base.join("bar.txt")).unwrap();
        File::create(base.join("baz.js")).unwrap();
        File::create(base.join(".hidden")).unwrap();

        fs::create_dir_all(base.join("src")).unwrap();
        File::create(base.join("src/main.js")).unwrap();
        File::create(base.join("src/util.js")).unwrap();

        fs::create_dir_all(base.join("src/lib")).unwrap();
        File::create(base.join("src/lib/helper.js")).unwrap();

        fs::create_dir_all(base.join("node_modules/dep")).unwrap();
        File::create(base.join("node_modules/dep/index.js")).unwrap();

        temp
    }

    fn opts(temp: &TempDir) -> GlobOptions {
        GlobOptions {
            cwd: Some(temp.path().to_string_lossy().into_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn iterate_yields_matching_paths() {
        let temp = create_test_fixture();
        let results: Vec<GlobResult> = iterate(&["*.txt"], opts(&temp)).unwrap().collect();
        let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"foo.txt"));
        assert!(paths.contains(&"bar.txt"));
        assert!(!paths.contains(&"baz.js"));
    }

    #[test]
    fn iterate_is_restartable_per_call() {
        let temp = create_test_fixture();
        let options = opts(&temp);

        let first: Vec<GlobResult> = iterate(&["**/*.js"], options.clone()).unwrap().collect();
        let second: Vec<GlobResult> = iterate(&["**/*.js"], options).unwrap().collect();

        assert_eq!(first, second);
    }

    #[test]
    fn iterate_matches_walk_result_set() {
        let temp = create_test_fixture();
        let options = opts(&temp);

        let walked = glob::walk(&["**/*"], options.clone()).unwrap();
        let iterated: Vec<GlobResult> = iterate(&["**/*"], options).unwrap().collect();

        let mut walked_sorted = walked;
        let mut iterated_sorted = iterated;
        walked_sorted.sort_by(|a, b| a.path.cmp(&b.path));
        iterated_sorted.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(walked_sorted, iterated_sorted);
    }

    #[test]
    fn iterate_honors_ignore_patterns() {
        let temp = create_test_fixture();
        let mut options = opts(&temp);
        options.ignore = Some(crate::options::IgnorePatterns::Single(
            "node_modules/**".to_string(),
        ));

        let results: Vec<GlobResult> = iterate(&["**/*.js"], options).unwrap().collect();
        let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"baz.js"));
        assert!(!paths.iter().any(|p| p.contains("node_modules")));
    }

    #[test]
    fn iterate_reports_invalid_options_as_error() {
        let temp = create_test_fixture();
        let mut options = opts(&temp);
        options.match_base = Some(true);
        options.noglobstar = Some(true);

        assert!(iterate(&["*"], options).is_err());
    }
}
