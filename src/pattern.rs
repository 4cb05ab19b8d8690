use fancy_regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Fast-path matching strategies for common patterns.
/// These allow skipping expensive regex matching for simple cases.
#[derive(Debug, Clone)]
pub enum FastPath {
    /// Pattern is `*.ext` - just check file extension
    /// Contains the extension to match (without the dot)
    ExtensionOnly(String),

    /// Pattern is `*.{ext1,ext2}` or `**/*.{ext1,ext2}` - check extension against a set
    /// Contains the set of valid extensions (without dots)
    ExtensionSet(HashSet<String>),

    /// Pattern is a literal filename - just compare strings
    /// Contains the exact filename to match
    LiteralName(String),

    /// Pattern is `**/*.ext` - recursive extension matching
    /// Contains the extension to match (without the dot)
    RecursiveExtension(String),

    /// Pattern is `**/*.{ext1,ext2}` - recursive extension set matching
    /// Contains the set of valid extensions (without dots)
    RecursiveExtensionSet(HashSet<String>),

    /// Pattern requires full regex matching (complex patterns)
    None,
}

impl FastPath {
    /// Check if this is a fast-path optimization (not None)
    pub fn is_fast(&self) -> bool {
        !matches!(self, FastPath::None)
    }
}

/// Options for pattern parsing
#[derive(Default, Clone)]
pub struct PatternOptions {
    /// Disable extglob patterns (e.g., +(a|b), *(a|b), etc.)
    pub noext: bool,
    /// On Windows, treat backslashes as path separators instead of escape characters
    pub windows_paths_no_escape: bool,
    /// Platform for path handling (win32, darwin, linux)
    pub platform: Option<String>,
    /// Perform case-insensitive matching
    pub nocase: bool,
    /// Treat braces as literal characters (disables brace expansion)
    pub nobrace: bool,
}

/// Represents a segment of a parsed glob pattern.
/// Mirrors minimatch's pattern types: string, RegExp, or GLOBSTAR.
#[derive(Clone, Debug)]
pub enum PatternPart {
    /// Literal string segment (no magic characters)
    Literal(String),
    /// Magic pattern segment (has wildcards, etc.)
    Magic(String, Regex),
    /// GLOBSTAR segment (**)
    Globstar,
}

impl PatternPart {
    /// Check if this part is a literal string
    pub fn is_string(&self) -> bool {
        matches!(self, PatternPart::Literal(_))
    }

    /// Check if this part is a globstar
    pub fn is_globstar(&self) -> bool {
        matches!(self, PatternPart::Globstar)
    }

    /// Check if this part is a regex (magic pattern)
    pub fn is_regexp(&self) -> bool {
        matches!(self, PatternPart::Magic(_, _))
    }

    /// Get the raw string representation of this part
    pub fn raw(&self) -> &str {
        match self {
            PatternPart::Literal(s) => s,
            PatternPart::Magic(s, _) => s,
            PatternPart::Globstar => "**",
        }
    }

    /// Test if this part matches the given path segment
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            PatternPart::Literal(s) => s == segment,
            PatternPart::Magic(_, regex) => regex.is_match(segment).unwrap_or(false),
            PatternPart::Globstar => true, // Globstar matches any segment
        }
    }
}

/// Represents a parsed glob pattern with precompiled regex for matching.
#[derive(Clone)]
pub struct Pattern {
    /// The original raw pattern string
    raw: String,
    /// The compiled full-pattern regex for matching complete paths
    regex: Regex,
    /// Parsed pattern parts for segment-by-segment matching
    parts: Vec<PatternPart>,
    /// The original glob parts (split by /)
    glob_parts: Vec<String>,
    /// Whether this pattern is absolute
    is_absolute: bool,
    /// Whether this pattern starts with a Windows drive letter (C:)
    is_drive: bool,
    /// Whether this pattern is a UNC path (//server/share)
    is_unc: bool,
    /// The root portion of the path (/, C:/, //server/share/, etc.)
    root: String,
    /// Whether this pattern contains magic characters
    has_magic: bool,
    /// Whether extglob is disabled
    noext: bool,
    /// Whether backslashes are path separators (Windows mode)
    windows_paths_no_escape: bool,
    /// Platform for path handling
    platform: String,
    /// Whether to perform case-insensitive matching
    nocase: bool,
    /// Whether this pattern ends with / (requires directory match)
    requires_dir: bool,
    /// Fast-path optimization for this pattern (if applicable)
    fast_path: FastPath,
    /// Whether this pattern is a leading-`!` negation (filters results rather
    /// than being walked for matches). `!(...)` extglob groups don't count.
    negated: bool,
}

// Escape tokens for brace expansion (avoid collisions with actual content)
const ESC_SLASH: &str = "\x00SLASH\x00";
const ESC_OPEN: &str = "\x00OPEN\x00";
const ESC_CLOSE: &str = "\x00CLOSE\x00";
const ESC_COMMA: &str = "\x00COMMA\x00";
const ESC_PERIOD: &str = "\x00PERIOD\x00";

/// Extglob types supported by minimatch
const EXTGLOB_TYPES: [char; 5] = ['!', '?', '+', '*', '@'];

impl Pattern {
    /// Create a new Pattern from a glob pattern string.
    /// Supports: `*` (any chars except /), `**` (any path segments), `?` (single char),
    /// and extglob patterns: `+(...)`, `*(...)`, `?(...)`, `@(...)`, `!(...)`
    pub fn new(pattern: &str) -> Self {
        Self::with_options(pattern, false)
    }

    /// Create a new Pattern with options (legacy API for compatibility).
    pub fn with_options(pattern: &str, noext: bool) -> Self {
        Self::with_pattern_options(
            pattern,
            PatternOptions {
                noext,
                ..Default::default()
            },
        )
    }

    /// Create a new Pattern with full options.
    pub fn with_pattern_options(pattern: &str, options: PatternOptions) -> Self {
        // A leading `!` negates the whole pattern, same as the reference's
        // minimatch-based negation. `!(...)` extglob groups aren't negation.
        let negated = pattern.starts_with('!') && !pattern[1..].starts_with('(');
        let pattern_body = if negated { &pattern[1..] } else { pattern };

        // Determine platform
        let platform = options
            .platform
            .clone()
            .unwrap_or_else(|| std::env::consts::OS.to_string());
        let is_windows = platform == "win32" || platform == "windows";

        // If windowsPathsNoEscape is true, convert backslashes to forward slashes
        // before any other processing
        let processed_pattern = if options.windows_paths_no_escape {
            pattern_body.replace('\\', "/")
        } else {
            pattern_body.to_string()
        };

        // Preprocess to strip ./ prefix - this must happen before parsing into parts
        // so that parts don't include the leading "." segment
        let preprocessed = preprocess_pattern(&processed_pattern);

        // Check if pattern ends with / (requires directory match)
        // Strip the trailing slash for matching purposes
        let requires_dir = preprocessed.ends_with('/');
        let pattern_for_matching = if requires_dir {
            preprocessed.trim_end_matches('/').to_string()
        } else {
            preprocessed.clone()
        };

        // Parse pattern into parts
        let (glob_parts, parts, root, is_absolute, is_drive, is_unc) = parse_pattern_parts(
            &pattern_for_matching,
            options.noext,
            is_windows,
            options.nocase,
        );

        // Compile the full regex
        let regex = pattern_to_regex(
            &pattern_for_matching,
            options.noext,
            options.windows_paths_no_escape,
            options.nocase,
        );

        // Check for magic characters
        let has_magic = has_magic_in_pattern(
            &pattern_for_matching,
            options.noext,
            options.windows_paths_no_escape,
        );

        // Compute fast-path optimization
        let fast_path = detect_fast_path(
            &pattern_for_matching,
            &parts,
            options.nocase,
            options.nobrace,
        );

        Self {
            raw: pattern.to_string(),
            regex,
            parts,
            glob_parts,
            is_absolute,
            is_drive,
            is_unc,
            root,
            has_magic,
            noext: options.noext,
            windows_paths_no_escape: options.windows_paths_no_escape,
            platform,
            nocase: options.nocase,
            requires_dir,
            fast_path,
            negated,
        }
    }

    /// Test if this pattern matches the given path.
    /// Path should use forward slashes and be relative.
    pub fn matches(&self, path: &str) -> bool {
        // For case-insensitive matching, we lowercase the path
        // The regex is already compiled with (?i) flag when nocase is true
        if self.nocase {
            self.regex.is_match(&path.to_lowercase()).unwrap_or(false)
        } else {
            self.regex.is_match(path).unwrap_or(false)
        }
    }

    /// Get the raw pattern string.
    #[allow(dead_code)]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Check if the pattern contains magic glob characters.
    /// Takes into account escaped characters.
    #[allow(dead_code)]
    pub fn has_magic(&self) -> bool {
        self.has_magic
    }

    /// Get the parsed pattern parts.
    #[allow(dead_code)]
    pub fn parts(&self) -> &[PatternPart] {
        &self.parts
    }

    /// Get the original glob parts (split by /).
    #[allow(dead_code)]
    pub fn glob_parts(&self) -> &[String] {
        &self.glob_parts
    }

    /// Check if the pattern is absolute.
    #[allow(dead_code)]
    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    /// Check if the pattern starts with a Windows drive letter.
    #[allow(dead_code)]
    pub fn is_drive(&self) -> bool {
        self.is_drive
    }

    /// Check if the pattern requires matching a directory (ends with /).
    pub fn requires_dir(&self) -> bool {
        self.requires_dir
    }

    /// Whether this pattern is a leading-`!` negation pattern.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Get the fast-path optimization for this pattern.
    ///
    /// Returns the type of fast-path matching that can be used, or `FastPath::None`
    /// if full regex matching is required.
    ///
    /// # Examples
    /// ```ignore
    /// let pattern = Pattern::new("*.js");
    /// assert!(matches!(pattern.fast_path(), FastPath::ExtensionOnly(_)));
    ///
    /// let pattern = Pattern::new("**/*.{js,ts}");
    /// assert!(matches!(pattern.fast_path(), FastPath::RecursiveExtensionSet(_)));
    ///
    /// let pattern = Pattern::new("src/**/*.js");
    /// assert!(matches!(pattern.fast_path(), FastPath::None)); // Has literal prefix
    /// ```
    pub fn fast_path(&self) -> &FastPath {
        &self.fast_path
    }

    /// Try to match the path using fast-path optimization.
    ///
    /// Returns `Some(true)` if the path matches, `Some(false)` if it doesn't match,
    /// or `None` if fast-path matching is not applicable and full regex matching
    /// should be used.
    ///
    /// # Arguments
    /// * `path` - The file path to match against (should use forward slashes)
    ///
    /// # Examples
    /// ```ignore
    /// let pattern = Pattern::new("*.js");
    ///
    /// // Fast-path matching for extension-only patterns
    /// assert_eq!(pattern.matches_fast("foo.js"), Some(true));
    /// assert_eq!(pattern.matches_fast("foo.ts"), Some(false));
    ///
    /// // Fall back to regex for complex patterns
    /// let complex = Pattern::new("src/**/*.js");
    /// assert_eq!(complex.matches_fast("src/lib/foo.js"), None);
    /// ```
    pub fn matches_fast(&self, path: &str) -> Option<bool> {
        let path_ref = Path::new(path);

        match &self.fast_path {
            FastPath::ExtensionOnly(ext) => {
                // Check if file extension matches
                // For case-insensitive, compare lowercase
                if let Some(file_ext) = path_ref.extension().and_then(|e| e.to_str()) {
                    if self.nocase {
                        Some(file_ext.to_lowercase() == ext.to_lowercase())
                    } else {
                        Some(file_ext == ext)
                    }
                } else {
                    Some(false)
                }
            }
            FastPath::ExtensionSet(exts) => {
                // Check if file extension is in the set
                if let Some(file_ext) = path_ref.extension().and_then(|e| e.to_str()) {
                    if self.nocase {
                        let lower_ext = file_ext.to_lowercase();
                        Some(exts.iter().any(|e| e.to_lowercase() == lower_ext))
                    } else {
                        Some(exts.contains(file_ext))
                    }
                } else {
                    Some(false)
                }
            }
            FastPath::LiteralName(name) => {
                // Check if filename matches exactly
                if let Some(file_name) = path_ref.file_name().and_then(|n| n.to_str()) {
                    if self.nocase {
                        Some(file_name.to_lowercase() == name.to_lowercase())
                    } else {
                        Some(file_name == name)
                    }
                } else {
                    Some(false)
                }
            }
            FastPath::RecursiveExtension(ext) => {
                // For **/*.ext, just check the extension (path can be at any depth)
                if let Some(file_ext) = path_ref.extension().and_then(|e| e.to_str()) {
                    if self.nocase {
                        Some(file_ext.to_lowercase() == ext.to_lowercase())
                    } else {
                        Some(file_ext == ext)
                    }
                } else {
                    Some(false)
                }
            }
            FastPath::RecursiveExtensionSet(exts) => {
                // For **/*.{ext1,ext2}, check extension against the set
                if let Some(file_ext) = path_ref.extension().and_then(|e| e.to_str()) {
                    if self.nocase {
                        let lower_ext = file_ext.to_lowercase();
                        Some(exts.iter().any(|e| e.to_lowercase() == lower_ext))
                    } else {
                        Some(exts.contains(file_ext))
                    }
                } else {
                    Some(false)
                }
            }
            FastPath::None => None, // Fall back to regex
        }
    }

    /// Check if the pattern is a UNC path (//server/share).
    #[allow(dead_code)]
    pub fn is_unc(&self) -> bool {
        self.is_unc
    }

    /// Get the root portion of the pattern (/, C:/, //server/share/, etc.)
    #[allow(dead_code)]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Get the platform for this pattern.
    #[allow(dead_code)]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Get the number of pattern parts.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the pattern is empty.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get a specific pattern part by index.
    #[allow(dead_code)]
    pub fn part(&self, index: usize) -> Option<&PatternPart> {
        self.parts.get(index)
    }

    /// Check if the first part is a literal string.
    #[allow(dead_code)]
    pub fn is_string(&self) -> bool {
        self.parts.first().map_or(false, |p| p.is_string())
    }

    /// Check if the first part is a globstar.
    #[allow(dead_code)]
    pub fn is_globstar(&self) -> bool {
        self.parts.first().map_or(false, |p| p.is_globstar())
    }

    /// Check if the first part is a regex (magic pattern).
    #[allow(dead_code)]
    pub fn is_regexp(&self) -> bool {
        self.parts.first().map_or(false, |p| p.is_regexp())
    }

    /// Get the glob string representation.
    #[allow(dead_code)]
    pub fn glob_string(&self) -> String {
        if self.is_absolute && !self.glob_parts.is_empty() {
            format!("{}{}", self.glob_parts[0], self.glob_parts[1..].join("/"))
        } else {
            self.glob_parts.join("/")
        }
    }

    /// Check if there are more parts after the first one.
    #[allow(dead_code)]
    pub fn has_more(&self) -> bool {
        self.parts.len() > 1
    }

    /// Create a pattern for matching against basename only (for matchBase option).
    /// If the pattern has no path separators, it's treated as `**/<pattern>`.
    pub fn for_match_base(pattern: &str, options: PatternOptions) -> Self {
        // Check if pattern contains path separators
        let has_slash = pattern.contains('/');
        let has_backslash = !options.windows_paths_no_escape && pattern.contains('\\');

        if has_slash || has_backslash {
            // Pattern has path components, use as-is
            Self::with_pattern_options(pattern, options)
        } else {
            // No path separators - prepend **/ for basename matching
            let new_pattern = format!("**/{}", pattern);
            Self::with_pattern_options(&new_pattern, options)
        }
    }

    /// Returns the maximum directory depth this pattern can match.
    ///
    /// - `Some(0)` = root only (e.g., `*.txt`)
    /// - `Some(1)` = one level deep (e.g., `src/*.js`)
    /// - `Some(n)` = n levels deep
    /// - `None` = unlimited depth (has `**`)
    ///
    /// This is used for optimization: patterns without `**` can limit directory traversal.
    pub fn max_depth(&self) -> Option<usize> {
        // Check if any part is a globstar - if so, unlimited depth
        for part in &self.parts {
            if part.is_globstar() {
                return None;
            }
        }

        // Count depth based on number of path segments (parts - 1 for the filename)
        // e.g., "src/*.js" has 2 parts -> depth 1
        // e.g., "*.txt" has 1 part -> depth 0
        if self.parts.is_empty() {
            Some(0)
        } else {
            Some(self.parts.len().saturating_sub(1))
        }
    }

    /// Returns true if this pattern requires recursive directory traversal.
    ///
    /// A pattern is recursive if it contains `**` (globstar).
    /// Non-recursive patterns can be matched with limited directory traversal.
    pub fn is_recursive(&self) -> bool {
        self.parts.iter().any(|p| p.is_globstar())
    }

    /// Returns the literal directory prefix before any glob characters.
    ///
    /// This is useful for optimization: we can start walking from the prefix
    /// directory instead of the cwd.
    ///
    /// Examples:
    /// - `src/lib/**/*.rs` -> `Some("src/lib")`
    /// - `packages/foo/*.js` -> `Some("packages/foo")`
    /// - `**/*.rs` -> `None`
    /// - `*.rs` -> `None`
    /// - `src/*/foo.rs` -> `Some("src")`
    pub fn literal_prefix(&self) -> Option<String> {
        let mut prefix_parts: Vec<&str> = Vec::new();

        for part in &self.parts {
            match part {
                PatternPart::Literal(s) => {
                    // Skip root markers like "/" for Unix absolute paths
                    // Skip "." as it's just the current directory marker
                    if s == "/" || s == "." {
                        continue;
                    }
                    prefix_parts.push(s);
                }
                // Stop at any magic or globstar
                PatternPart::Magic(_, _) | PatternPart::Globstar => break,
            }
        }

        if prefix_parts.is_empty() {
            None
        } else {
            Some(prefix_parts.join("/"))
        }
    }

    /// Check if a directory path could possibly contain matches for this pattern.
    ///
    /// This is used for early pruning during directory traversal. If this method
    /// returns `false`, we can skip traversing the entire directory subtree.
    ///
    /// # Arguments
    /// * `dir_path` - The relative directory path to check (e.g., "src", "src/lib")
    ///
    /// # Returns
    /// * `true` if this directory or its children could match the pattern
    /// * `false` if we can safely skip this directory
    ///
    /// # Examples
    /// ```ignore
    /// let pattern = Pattern::new("src/lib/**/*.ts");
    /// assert!(pattern.could_match_in_dir("src"));      // Could contain src/lib/...
    /// assert!(pattern.could_match_in_dir("src/lib"));  // Could contain matches
    /// assert!(!pattern.could_match_in_dir("test"));    // Cannot match
    /// assert!(!pattern.could_match_in_dir("docs"));    // Cannot match
    ///
    /// let pattern2 = Pattern::new("**/*.ts");
    /// assert!(pattern2.could_match_in_dir("any/path")); // ** matches anything
    /// ```
    pub fn could_match_in_dir(&self, dir_path: &str) -> bool {
        // Empty directory path (root) always could match
        if dir_path.is_empty() || dir_path == "." {
            return true;
        }

        // Split the directory path into segments
        let dir_segments: Vec<&str> = dir_path.split('/').filter(|s| !s.is_empty()).collect();

        // Get pattern parts (skip leading / for absolute paths)
        let pattern_parts: Vec<&PatternPart> = self
            .parts
            .iter()
            .filter(|p| match p {
                PatternPart::Literal(s) => s != "/",
                _ => true,
            })
            .collect();

        // Walk through pattern parts and directory segments together
        self.could_match_in_dir_recursive(&pattern_parts, &dir_segments, 0, 0)
    }

    /// Recursive helper for could_match_in_dir
    fn could_match_in_dir_recursive(
        &self,
        pattern_parts: &[&PatternPart],
        dir_segments: &[&str],
        pattern_idx: usize,
        dir_idx: usize,
    ) -> bool {
        // If we've exhausted the directory path, the pattern could match deeper
        if dir_idx >= dir_segments.len() {
            return true;
        }

        // If we've exhausted the pattern parts, we can't match this directory
        // (the directory is deeper than what the pattern can match)
        if pattern_idx >= pattern_parts.len() {
            return false;
        }

        let pattern_part = pattern_parts[pattern_idx];
        let dir_segment = dir_segments[dir_idx];

        match pattern_part {
            PatternPart::Globstar => {
                // Globstar can match zero or more segments, so:
                // 1. Try matching zero segments (skip globstar, same dir position)
                // 2. Try matching current segment and continue with globstar
                // 3. Try matching current segment and move past globstar

                // Option 1: Globstar matches zero segments - skip to next pattern part
                if self.could_match_in_dir_recursive(
                    pattern_parts,
                    dir_segments,
                    pattern_idx + 1,
                    dir_idx,
                ) {
                    return true;
                }

                // Option 2: Globstar consumes this segment and continues as globstar
                if self.could_match_in_dir_recursive(
                    pattern_parts,
                    dir_segments,
                    pattern_idx,
                    dir_idx + 1,
                ) {
                    return true;
                }

                // Option 3: Globstar consumes this segment and moves on
                self.could_match_in_dir_recursive(
                    pattern_parts,
                    dir_segments,
                    pattern_idx + 1,
                    dir_idx + 1,
                )
            }
            PatternPart::Literal(lit) => {
                // For case-insensitive matching, compare lowercase
                let matches = if self.nocase {
                    lit.to_lowercase() == dir_segment.to_lowercase()
                } else {
                    lit == dir_segment
                };

                if matches {
                    // Continue checking remaining segments
                    self.could_match_in_dir_recursive(
                        pattern_parts,
                        dir_segments,
                        pattern_idx + 1,
                        dir_idx + 1,
                    )
                } else {
                    false
                }
            }
            PatternPart::Magic(_, regex) => {
                // Check if the regex matches this directory segment
                let matches = if self.nocase {
                    regex.is_match(&dir_segment.to_lowercase()).unwrap_or(false)
                } else {
                    regex.is_match(dir_segment).unwrap_or(false)
                };

                if matches {
                    // Continue checking remaining segments
                    self.could_match_in_dir_recursive(
                        pattern_parts,
                        dir_segments,
                        pattern_idx + 1,
                        dir_idx + 1,
                    )
                } else {
                    false
                }
            }
        }
    }

    /// Check if this pattern explicitly allows dotfiles for the given path.
    /// A pattern explicitly allows dotfiles when:
    /// - A pattern segment explicitly starts with `.` (e.g., `.hidden`, `.git/**`)
    /// - A pattern segment starts with `[.]` or similar character class matching `.`
    ///
    /// This is used to determine if a path with dotfile segments should be matched
    /// when `dot: false`.
    pub fn allows_dotfile(&self, path: &str) -> bool {
        let path_parts: Vec<&str> = path.split('/').collect();

        // Get preprocessed pattern parts (without ./ prefix if any)
        let processed_raw = preprocess_pattern(&self.raw);
        let pattern_parts: Vec<&str> = processed_raw.split('/').collect();

        // Check each dotfile segment in the path
        for (i, path_part) in path_parts.iter().enumerate() {
            if path_part.starts_with('.') && *path_part != "." && *path_part != ".." {
                // This is a dotfile segment - check if pattern explicitly allows it
                if !Self::pattern_part_allows_dot(&pattern_parts, i) {
                    return false;
                }
            }
        }
        true
    }

    /// Check if pattern part at the given index explicitly allows a dotfile.
    fn pattern_part_allows_dot(pattern_parts: &[&str], path_index: usize) -> bool {
        // Find the pattern part that corresponds to this path index
        // Handle globstar (**) which can match multiple path segments
        let mut pattern_idx = 0;
        let mut path_idx = 0;

        while pattern_idx < pattern_parts.len() {
            let part = pattern_parts[pattern_idx];

            if part == "**" {
                // Globstar can match zero or more segments
                // Check if the next pattern part after globstar allows dots
                if pattern_idx + 1 < pattern_parts.len() {
                    let next_part = pattern_parts[pattern_idx + 1];
                    if Self::part_explicitly_matches_dot(next_part) {
                        // The part after ** explicitly matches dots
                        return true;
                    }
                }
                // Globstar without explicit dot pattern - doesn't allow dots by default
                if path_idx == path_index {
                    return false;
                }
                // Try matching more path segments with globstar
                pattern_idx += 1;
                continue;
            }

            if path_idx == path_index {
                // This is the pattern part that matches our dotfile segment
                return Self::part_explicitly_matches_dot(part);
            }

            pattern_idx += 1;
            path_idx += 1;
        }

        false
    }

    /// Check if a single pattern part explicitly matches a dot at the start.
    fn part_explicitly_matches_dot(part: &str) -> bool {
        // Check for literal dot at start
        if part.starts_with('.') {
            return true;
        }

        // Check for character class that includes dot at start
        // e.g., [.] or [.-] or [!a] (negated class can't match dot at start)
        if part.starts_with('[') {
            // Simple heuristic: if it starts with [. or [^. or [!.
            // Note: [^...] and [!...] are negation, so check if . is in the class
            if let Some(close_bracket) = part.find(']') {
                let class_content = &part[1..close_bracket];
                if !class_content.starts_with('^') && !class_content.starts_with('!') {
                    // Not negated - check if . is in the class
                    if class_content.contains('.') {
                        return true;
                    }
                }
            }
        }

        false
    }
}

/// Parse a pattern into its component parts.
/// Returns (glob_parts, pattern_parts, root, is_absolute, is_drive, is_unc)
fn parse_pattern_parts(
    pattern: &str,
    noext: bool,
    is_windows: bool,
    nocase: bool,
) -> (Vec<String>, Vec<PatternPart>, String, bool, bool, bool) {
    let mut glob_parts: Vec<String> = pattern.split('/').map(String::from).collect();
    let mut root = String::new();
    let mut is_absolute = false;
    let mut is_drive = false;
    let mut is_unc = false;

    // Check for absolute paths
    if !glob_parts.is_empty() {
        // Check for UNC path: //server/share or //./device or //?/device
        if glob_parts.len() >= 4
            && glob_parts[0].is_empty()
            && glob_parts[1].is_empty()
            && !glob_parts[2].is_empty()
            && !glob_parts[3].is_empty()
        {
            if is_windows {
                is_unc = true;
                is_absolute = true;
                // Normalize UNC root: //server/share/ or //?/C:/
                let is_device = glob_parts[2] == "?" || glob_parts[2] == ".";
                if is_device {
                    // Device path: //?/C:/ or //./C:/
                    root = format!("//{}/{}/", glob_parts[2], glob_parts[3]);
                    // Merge first 4 parts into root
                    let rest: Vec<String> = glob_parts.drain(4..).collect();
                    glob_parts = vec![root.clone()];
                    glob_parts.extend(rest);
                } else {
                    // Network path: //server/share/
                    root = format!("//{}/{}/", glob_parts[2], glob_parts[3]);
                    // Merge first 4 parts into root
                    let rest: Vec<String> = glob_parts.drain(4..).collect();
                    glob_parts = vec![root.clone()];
                    glob_parts.extend(rest);
                }
            }
        }
        // Check for Windows drive letter: C:/ or c:/
        else if is_windows
            && glob_parts.len() >= 1
            && glob_parts[0].len() == 2
            && glob_parts[0]
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_alphabetic())
            && glob_parts[0].chars().nth(1) == Some(':')
        {
            is_drive = true;
            is_absolute = true;
            root = format!("{}/", glob_parts[0]);
            // Merge drive letter with trailing slash
            if glob_parts.len() > 1 && glob_parts[1].is_empty() {
                glob_parts.remove(1);
            }
            glob_parts[0] = root.clone();
        }
        // Check for Unix absolute path: /
        else if glob_parts[0].is_empty() && glob_parts.len() > 1 {
            is_absolute = true;
            root = "/".to_string();
            // Normalize: ['', 'foo'] -> ['/', 'foo']
            glob_parts[0] = "/".to_string();
        }
    }

    // Parse each part into PatternPart
    let mut pattern_parts = Vec::with_capacity(glob_parts.len());
    for part in &glob_parts {
        if part == "**" {
            pattern_parts.push(PatternPart::Globstar);
        } else if has_magic_in_pattern(part, noext, false) {
            // Create regex for this part
            let part_regex = segment_to_regex(part, noext, nocase);
            pattern_parts.push(PatternPart::Magic(part.clone(), part_regex));
        } else {
            pattern_parts.push(PatternPart::Literal(part.clone()));
        }
    }

    (
        glob_parts,
        pattern_parts,
        root,
        is_absolute,
        is_drive,
        is_unc,
    )
}

/// Convert a single path segment to a regex (not a full pattern).
fn segment_to_regex(segment: &str, noext: bool, nocase: bool) -> Regex {
    let mut regex_str = String::with_capacity(segment.len() * 2);
    // Add case-insensitive flag if nocase is true
    if nocase {
        regex_str.push_str("(?i)");
    }
    regex_str.push('^');

    let chars: Vec<char> = segment.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        // Handle escape sequences
        if c == '\\' && i + 1 < len {
            let next = chars[i + 1];
            match next {
                '.' | '+' | '^' | '$' | '(' | ')' | '{' | '}' | '[' | ']' | '|' | '\\' | '*'
                | '?' | '/' => {
                    regex_str.push('\\');
                    regex_str.push(next);
                }
                _ => {
                    regex_str.push(next);
                }
            }
            i += 2;
            continue;
        }

        // Check for extglob patterns
        if !noext && EXTGLOB_TYPES.contains(&c) && i + 1 < len && chars[i + 1] == '(' {
            if let Some((extglob_regex, new_pos)) = parse_extglob(&chars, i, noext) {
                regex_str.push_str(&extglob_regex);
                i = new_pos;
                continue;
            }
        }

        match c {
            '*' => {
                regex_str.push_str("[^/]*");
            }
            '?' => {
                regex_str.push_str("[^/]");
            }
            '[' => {
                if let Some((class_regex, new_pos)) = parse_character_class(&chars, i) {
                    regex_str.push_str(&class_regex);
                    i = new_pos;
                    continue;
                }
                regex_str.push_str("\\[");
            }
            '.' | '+' | '^' | '$' | '(' | ')' | '{' | '}' | ']' | '|' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            _ => {
                regex_str.push(c);
            }
        }

        i += 1;
    }

    regex_str.push('$');

    Regex::new(&regex_str).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

/// Check if a pattern contains magic glob characters, taking escapes into account.
/// This matches glob/minimatch behavior:
/// - `*`, `?`, `[` are always magic
/// - `+(`, `@(` are magic when extglob is enabled (noext=false)
/// - `!(` is NOT magic (glob treats it as a special case)
/// - `*(`, `?(` have the `*`/`?` as magic regardless of extglob
///
/// Special handling for Windows UNC/device paths:
/// - `//?/` and `//./` prefixes contain `?` and `.` which are NOT magic
/// - `//server/share/` UNC roots are not magic
pub fn has_magic_in_pattern(pattern: &str, noext: bool, windows_paths_no_escape: bool) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    // Skip UNC/device path prefix on Windows
    // These patterns start with // and may contain ? or . in the root
    // Format: //server/share/ or //?/C:/ or //./device/
    if chars.len() >= 4 && chars[0] == '/' && chars[1] == '/' {
        // Check for device path: //?/ or //./
        if (chars[2] == '?' || chars[2] == '.') && chars[3] == '/' {
            // Device path: //?/C:/ or //./device/
            // Skip past //?/ prefix (4 chars), then find end of device name
            i = 4;
            // Find the next / after the device/drive
            while i < chars.len() && chars[i] != '/' {
                i += 1;
            }
            // Skip the trailing / if present
            if i < chars.len() && chars[i] == '/' {
                i += 1;
            }
        } else if !chars[2].is_whitespace() && chars[2] != '/' {
            // UNC path: //server/share/
            // Skip past //server/share/
            // Find end of server name
            let mut slashes_found = 0;
            while i < chars.len() && slashes_found < 4 {
                if chars[i] == '/' {
                    slashes_found += 1;
                }
                i += 1;
            }
        }
    }

    while i < chars.len() {
        let c = chars[i];

        // Handle escape sequences (unless windowsPathsNoEscape)
        if c == '\\' && !windows_paths_no_escape && i + 1 < chars.len() {
            // Skip the escaped character - it's not magic
            i += 2;
            continue;
        }

        // Check for magic characters
        match c {
            '*' | '?' | '[' => return true,
            // Check for extglob patterns (only + and @ trigger when followed by ()
            // Note: ! is NOT magic per glob's behavior
            // Note: * and ? are already caught above
            '+' | '@' if !noext && i + 1 < chars.len() && chars[i + 1] == '(' => {
                return true;
            }
            _ => {}
        }

        i += 1;
    }

    false
}

/// Check if a pattern contains extglob syntax
fn has_extglob(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    for i in 0..chars.len().saturating_sub(1) {
        if EXTGLOB_TYPES.contains(&chars[i]) && chars[i + 1] == '(' {
            return true;
        }
    }
    false
}

/// Preprocess a glob pattern for matching.
/// Handles ./ prefix stripping and other normalization.
pub fn preprocess_pattern(pattern: &str) -> String {
    let mut result = pattern.to_string();

    // Strip leading ./ (common in glob patterns)
    while result.starts_with("./") {
        result = result[2..].to_string();
    }

    result
}

/// Parse an extglob pattern starting at position i (which is the type character).
/// Returns (regex_part, new_position) or None if not a valid extglob.
fn parse_extglob(chars: &[char], start: usize, noext: bool) -> Option<(String, usize)> {
    if noext {
        return None;
    }

    // Check if we have a valid extglob start: type char followed by (
    if start + 1 >= chars.len() || chars[start + 1] != '(' {
        return None;
    }

    let ext_type = chars[start];
    if !EXTGLOB_TYPES.contains(&ext_type) {
        return None;
    }

    // Find the matching closing parenthesis, handling nesting
    let mut depth = 1;
    let mut i = start + 2;
    let mut alternatives: Vec<String> = Vec::new();
    let mut current = String::new();

    while i < chars.len() && depth > 0 {
        let c = chars[i];

        match c {
            '(' => {
                // Check if this is a nested extglob
                if i > 0 && EXTGLOB_TYPES.contains(&chars[i - 1]) && !current.is_empty() {
                    // This is a nested extglob, recurse
                    if let Some((nested, new_pos)) = parse_extglob(chars, i - 1, noext) {
                        // Remove the type char we already added
                        current.pop();
                        current.push_str(&nested);
                        i = new_pos;
                        continue;
                    }
                }
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    alternatives.push(current.clone());
                } else {
                    current.push(c);
                }
            }
            '|' if depth == 1 => {
                alternatives.push(current.clone());
                current.clear();
            }
            '\\' if i + 1 < chars.len() => {
                // Handle escaped characters
                current.push('\\');
                i += 1;
                if i < chars.len() {
                    current.push(chars[i]);
                }
            }
            '*' => {
                // Handle * and ** within extglob
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    // ** in extglob - match any path segments
                    current.push_str(".*");
                    i += 1;
                } else {
                    // Single * - match any chars except /
                    current.push_str("[^/]*?");
                }
            }
            '?' if i + 1 < chars.len() && chars[i + 1] == '(' => {
                // This might be a nested ?(...) extglob, handled above
                current.push(c);
            }
            '?' => {
                current.push_str("[^/]");
            }
            // Escape regex special characters (except | which we handle, and () which we track)
            '.' | '+' | '^' | '$' | '{' | '}' | '[' | ']' => {
                current.push('\\');
                current.push(c);
            }
            _ => {
                current.push(c);
            }
        }

        i += 1;
    }

    if depth != 0 {
        // Unclosed extglob - not valid
        return None;
    }

    // Convert alternatives to regex based on extglob type
    let alt_regex = if alternatives.is_empty() {
        String::new()
    } else {
        alternatives.join("|")
    };

    let regex_part = match ext_type {
        '+' => {
            // +(pattern) - one or more
            format!("(?:{})+", alt_regex)
        }
        '*' => {
            // *(pattern) - zero or more
            format!("(?:{})*", alt_regex)
        }
        '?' => {
            // ?(pattern) - zero or one
            format!("(?:{})?", alt_regex)
        }
        '@' => {
            // @(pattern) - exactly one
            format!("(?:{})", alt_regex)
        }
        '!' => {
            // !(pattern) - negation (match anything that doesn't match the pattern)
            // Uses negative lookahead to exclude the patterns
            if alt_regex.is_empty() {
                // !() matches any non-empty string
                "[^/]+".to_string()
            } else {
                // Match any path segment that doesn't match the alternatives
                // The negative lookahead checks if the next segment (up to / or end) matches
                // (?:$|/) ensures we're checking a complete segment
                format!("(?!(?:{})(?:$|/))[^/]+", alt_regex)
            }
        }
        _ => return None,
    };

    Some((regex_part, i))
}

/// POSIX character classes - maps [:class:] to regex equivalents
/// Note: We use Unicode properties where possible for proper Unicode support
fn get_posix_class(name: &str) -> Option<(&'static str, bool)> {
    // Returns (regex_pattern, needs_unicode_flag)
    // The unicode flag is always true for fancy_regex, so we just track it for documentation
    match name {
        "[:alnum:]" => Some((r"\p{L}\p{Nl}\p{Nd}", true)),
        "[:alpha:]" => Some((r"\p{L}\p{Nl}", true)),
        "[:ascii:]" => Some((r"\x00-\x7f", false)),
        "[:blank:]" => Some((r"\p{Zs}\t", true)),
        "[:cntrl:]" => Some((r"\p{Cc}", true)),
        "[:digit:]" => Some((r"\p{Nd}", true)),
        "[:graph:]" => Some((r"\p{Z}\p{C}", true)), // negated in implementation
        "[:lower:]" => Some((r"\p{Ll}", true)),
        "[:print:]" => Some((r"\p{C}", true)), // negated in implementation
        "[:punct:]" => Some((r"\p{P}", true)),
        "[:space:]" => Some((r"\p{Z}\t\r\n\x0b\x0c", true)), // \v\f
        "[:upper:]" => Some((r"\p{Lu}", true)),
        "[:word:]" => Some((r"\p{L}\p{Nl}\p{Nd}\p{Pc}", true)),
        "[:xdigit:]" => Some(("A-Fa-f0-9", false)),
        _ => None,
    }
}

/// Parse a character class (bracket expression) starting at position i.
/// Returns (regex_part, new_position) or None if not a valid character class.
fn parse_character_class(chars: &[char], start: usize) -> Option<(String, usize)> {
    if start >= chars.len() || chars[start] != '[' {
        return None;
    }

    let mut i = start + 1;
    let mut ranges = String::new();
    let mut negs = String::new();
    let mut negate = false;
    let mut saw_start = false;
    let mut escaping = false;
    let mut range_start: Option<char> = None;

    // Check for negation at the start
    if i < chars.len() && (chars[i] == '!' || chars[i] == '^') {
        negate = true;
        i += 1;
    }

    while i < chars.len() {
        let c = chars[i];

        // Handle ] as end of class (but not at very start)
        if c == ']' && saw_start && !escaping {
            // Build the final regex
            let result = build_character_class_regex(&ranges, &negs, negate);
            return Some((result, i + 1));
        }

        saw_start = true;

        // Handle escape sequences
        if c == '\\' && !escaping {
            escaping = true;
            i += 1;
            continue;
        }

        // Handle POSIX character classes like [:alpha:]
        if c == '[' && !escaping && i + 1 < chars.len() && chars[i + 1] == ':' {
            // Look for closing :]
            if let Some(end) = find_posix_class_end(chars, i) {
                let class_name: String = chars[i..=end].iter().collect();
                if let Some((pattern, _needs_unicode)) = get_posix_class(&class_name) {
                    // Check if this is a negated POSIX class ([:graph:] and [:print:])
                    if class_name == "[:graph:]" || class_name == "[:print:]" {
                        negs.push_str(pattern);
                    } else {
                        ranges.push_str(pattern);
                    }
                    i = end + 1;
                    range_start = None;
                    continue;
                }
            }
        }

        // Now it's a normal character
        escaping = false;

        // Handle range (c-d)
        if let Some(start_char) = range_start {
            if c > start_char {
                ranges.push_str(&escape_for_bracket(start_char));
                ranges.push('-');
                ranges.push_str(&escape_for_bracket(c));
            } else if c == start_char {
                ranges.push_str(&escape_for_bracket(c));
            }
            // If c < start_char, silently drop the range (like minimatch)
            range_start = None;
            i += 1;
            continue;
        }

        // Check if this is the start of a range
        // Pattern: c-d or c-] or c<more>
        if i + 1 < chars.len() && chars[i + 1] == '-' {
            if i + 2 < chars.len() && chars[i + 2] == ']' {
                // c-] pattern - literal c and -
                ranges.push_str(&escape_for_bracket(c));
                ranges.push_str("\\-");
                i += 2;
                continue;
            } else if i + 2 < chars.len() {
                // c-d pattern - start of a range
                range_start = Some(c);
                i += 2;
                continue;
            }
        }

        // Just a normal character
        ranges.push_str(&escape_for_bracket(c));
        i += 1;
    }

    // Didn't find closing bracket - not a valid character class
    None
}

/// Find the end position of a POSIX character class like [:alpha:]
fn find_posix_class_end(chars: &[char], start: usize) -> Option<usize> {
    // start is at '[', we need to find ':]'
    let mut i = start + 2; // skip '[:'
    while i < chars.len() {
        if chars[i] == ':' && i + 1 < chars.len() && chars[i + 1] == ']' {
            return Some(i + 1);
        }
        if !chars[i].is_ascii_alphabetic() {
            return None; // Invalid POSIX class name
        }
        i += 1;
    }
    None
}

/// Escape special characters for use inside a bracket expression
fn escape_for_bracket(c: char) -> String {
    match c {
        '[' | ']' | '\\' | '-' | '^' => format!("\\{}", c),
        _ => c.to_string(),
    }
}

/// Build the final regex for a character class
fn build_character_class_regex(ranges: &str, negs: &str, negate: bool) -> String {
    if ranges.is_empty() && negs.is_empty() {
        // Empty class - cannot match anything
        return r"\b\B".to_string(); // Matches nothing (word boundary followed by non-word boundary)
    }

    // Handle single character that's not actually magic
    // [a] is just a literal 'a', not a character class
    if negs.is_empty() && !negate {
        // Check if it's a single character (possibly escaped)
        let chars: Vec<char> = ranges.chars().collect();
        if chars.len() == 1 {
            return escape_regex_char(chars[0]);
        }
        if chars.len() == 2 && chars[0] == '\\' {
            return format!("\\{}", chars[1]);
        }
    }

    let sranges = if !ranges.is_empty() {
        format!("[{}{}]", if negate { "^" } else { "" }, ranges)
    } else {
        String::new()
    };

    let snegs = if !negs.is_empty() {
        format!("[{}{}]", if negate { "" } else { "^" }, negs)
    } else {
        String::new()
    };

    // Combine ranges and negs
    if !ranges.is_empty() && !negs.is_empty() {
        format!("({}|{})", sranges, snegs)
    } else if !ranges.is_empty() {
        sranges
    } else {
        snegs
    }
}

/// Escape a character for use in a regex (outside of bracket expressions)
fn escape_regex_char(c: char) -> String {
    match c {
        '.' | '+' | '^' | '$' | '(' | ')' | '{' | '}' | '[' | ']' | '|' | '\\' | '*' | '?' => {
            format!("\\{}", c)
        }
        _ => c.to_string(),
    }
}

/// Convert a glob pattern to a regex.
///
/// Supports:
/// - `*` - matches any characters except `/`
/// - `**` - matches any path segments (including none)
/// - `?` - matches single character except `/`
/// - `[abc]` - character class matching a, b, or c
/// - `[a-z]` - character range matching a through z
/// - `[!abc]` or `[^abc]` - negated character class
/// - `[[:alpha:]]` - POSIX character classes
/// - `+(pattern|...)` - matches one or more of the patterns
/// - `*(pattern|...)` - matches zero or more of the patterns  
/// - `?(pattern|...)` - matches zero or one of the patterns
/// - `@(pattern|...)` - matches exactly one of the patterns
/// - `!(pattern|...)` - matches anything except the patterns
/// - `\*`, `\?`, `\[` - escaped magic characters (literal matching)
/// - Literal matching for all other characters
fn pattern_to_regex(
    pattern: &str,
    noext: bool,
    windows_paths_no_escape: bool,
    nocase: bool,
) -> Regex {
    // Preprocess: handle ./ prefix
    let pattern = preprocess_pattern(pattern);
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    // Add case-insensitive flag if nocase is true
    if nocase {
        regex_str.push_str("(?i)");
    }
    regex_str.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        // Handle escape sequences (backslash)
        // If windowsPathsNoEscape is true, backslashes were already converted to /
        // so we won't see them here. But if false, handle escapes.
        if c == '\\' && !windows_paths_no_escape {
            if i + 1 < len {
                // Escape the next character (treat it as literal)
                let next = chars[i + 1];
                // Escape it for regex if it's a regex special char
                match next {
                    '.' | '+' | '^' | '$' | '(' | ')' | '{' | '}' | '[' | ']' | '|' | '\\'
                    | '*' | '?' | '/' => {
                        regex_str.push('\\');
                        regex_str.push(next);
                    }
                    _ => {
                        // For non-special chars, just add the literal char
                        regex_str.push(next);
                    }
                }
                i += 2;
                continue;
            } else {
                // Trailing backslash - treat as literal backslash
                regex_str.push_str("\\\\");
                i += 1;
                continue;
            }
        }

        // Check for extglob patterns
        if !noext && EXTGLOB_TYPES.contains(&c) && i + 1 < len && chars[i + 1] == '(' {
            if let Some((extglob_regex, new_pos)) = parse_extglob(&chars, i, noext) {
                regex_str.push_str(&extglob_regex);
                i = new_pos;
                continue;
            }
        }

        match c {
            '*' => {
                if i + 1 < len && chars[i + 1] == '*' {
                    // Check for proper globstar: must be bounded by / or start/end
                    let at_start = i == 0 || chars[i - 1] == '/';
                    let at_end = i + 2 >= len;
                    let followed_by_slash = i + 2 < len && chars[i + 2] == '/';

                    if at_start && (at_end || followed_by_slash) {
                        // Proper globstar - match any path segments (including empty)
                        // If there's a leading / before **, check if we should remove it
                        // Only remove if the last char in regex_str is actually '/'
                        let has_leading_slash = i > 0 && chars[i - 1] == '/';
                        if has_leading_slash && regex_str.ends_with('/') {
                            // Remove the trailing / we just added to regex
                            regex_str.pop();
                        }

                        if i == 0 && at_end {
                            // Pattern is just ** - match anything (including empty)
                            regex_str.push_str(".*");
                        } else if at_end {
                            // Pattern ends with ** - match the directory itself plus anything below
                            // src/** should match: "src", "src/foo", "src/a/b/c"
                            regex_str.push_str("(/.*)?");
                        } else {
                            // ** followed by slash - match zero or more path segments
                            // **/foo should match: "foo", "a/foo", "a/b/foo"
                            regex_str.push_str("(.*/)?");
                        }
                        i += 2;
                        // Skip the trailing slash if present
                        if i < len && chars[i] == '/' {
                            i += 1;
                        }
                        continue;
                    }
                    // Not a proper globstar - treat as two * wildcards
                    // Each * matches any chars except /
                    // e.g., b** becomes b[^/]*[^/]* which is equivalent to b[^/]*
                    regex_str.push_str("[^/]*[^/]*");
                    i += 2;
                    continue;
                }
                // Single * - check if it's a standalone segment or part of a segment
                // Standalone segment (preceded by / or at start, followed by / or at end): [^/]+
                // Part of a segment (suffix like a*, prefix like *a): [^/]*
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                let at_segment_end = i + 1 >= len || chars[i + 1] == '/';

                if at_segment_start && at_segment_end {
                    // Standalone * as a complete segment - must match at least one char
                    regex_str.push_str("[^/]+");
                } else {
                    // * is part of a segment (e.g., a*, *a, a*b) - can match zero chars
                    regex_str.push_str("[^/]*");
                }
            }
            '?' => {
                // Match single char except /
                regex_str.push_str("[^/]");
            }
            '[' => {
                // Try to parse as a character class
                if let Some((class_regex, new_pos)) = parse_character_class(&chars, i) {
                    regex_str.push_str(&class_regex);
                    i = new_pos;
                    continue;
                }
                // Not a valid character class, escape the bracket
                regex_str.push_str("\\[");
            }
            // Escape regex special characters
            '.' | '+' | '^' | '$' | '(' | ')' | '{' | '}' | ']' | '|' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            _ => {
                regex_str.push(c);
            }
        }

        i += 1;
    }

    regex_str.push('$');

    Regex::new(&regex_str).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

/// Detect the fast-path optimization for a pattern.
///
/// This analyzes the pattern to determine if it can use a fast-path matching
/// strategy instead of full regex matching.
///
/// # Fast-path patterns supported:
/// - `*.ext` -> `ExtensionOnly("ext")`
/// - `**/*.ext` -> `RecursiveExtension("ext")`
/// - `*.{ext1,ext2}` (after brace expansion) -> `ExtensionSet`
/// - `**/*.{ext1,ext2}` (after brace expansion) -> `RecursiveExtensionSet`
/// - `filename.ext` (no magic) -> `LiteralName("filename.ext")`
///
/// # Returns
/// The detected `FastPath` variant, or `FastPath::None` if no optimization applies.
fn detect_fast_path(pattern: &str, parts: &[PatternPart], nocase: bool, nobrace: bool) -> FastPath {
    // Preprocess the pattern (for documentation purposes, actual analysis uses parts)
    let _pattern = preprocess_pattern(pattern);

    // Check if pattern is a literal (no magic at all)
    if parts.len() == 1 {
        if let PatternPart::Literal(name) = &parts[0] {
            // Pure literal pattern - fast string comparison
            let name_for_match = if nocase {
                name.to_lowercase()
            } else {
                name.clone()
            };
            return FastPath::LiteralName(name_for_match);
        }
    }

    // Check for `*.ext` pattern (extension-only at root level)
    // Pattern should be exactly one part that matches `*.something`
    if parts.len() == 1 {
        if let PatternPart::Magic(raw, _) = &parts[0] {
            if let Some(ext) = parse_extension_pattern(raw) {
                let ext_for_match = if nocase { ext.to_lowercase() } else { ext };
                return FastPath::ExtensionOnly(ext_for_match);
            }
            // Only detect extension set patterns if nobrace is false
            // When nobrace is true, braces should be treated as literal characters
            if !nobrace {
                if let Some(exts) = parse_extension_set_pattern(raw) {
                    let exts_for_match: HashSet<String> = if nocase {
                        exts.into_iter().map(|e| e.to_lowercase()).collect()
                    } else {
                        exts
                    };
                    return FastPath::ExtensionSet(exts_for_match);
                }
            }
        }
    }

    // Check for `**/*.ext` pattern (recursive extension matching)
    // Should be: [Globstar, Magic("*.ext")]
    if parts.len() == 2 {
        if let (PatternPart::Globstar, PatternPart::Magic(raw, _)) = (&parts[0], &parts[1]) {
            if let Some(ext) = parse_extension_pattern(raw) {
                let ext_for_match = if nocase { ext.to_lowercase() } else { ext };
                return FastPath::RecursiveExtension(ext_for_match);
            }
            // Only detect extension set patterns if nobrace is false
            if !nobrace {
                if let Some(exts) = parse_extension_set_pattern(raw) {
                    let exts_for_match: HashSet<String> = if nocase {
                        exts.into_iter().map(|e| e.to_lowercase()).collect()
                    } else {
                        exts
                    };
                    return FastPath::RecursiveExtensionSet(exts_for_match);
                }
            }
        }
    }

    // No fast-path optimization detected
    FastPath::None
}

/// Parse a pattern like `*.ext` and return the extension.
/// Returns `Some("ext")` if the pattern is exactly `*.ext`, otherwise `None`.
fn parse_extension_pattern(pattern: &str) -> Option<String> {
    // Pattern must start with `*.`
    if !pattern.starts_with("*.") {
        return None;
    }

    // Get the extension part
    let ext = &pattern[2..];

    // Extension must not contain any magic characters
    if ext.is_empty() || has_magic_in_pattern(ext, false, false) {
        return None;
    }

    // Extension must not contain path separators
    if ext.contains('/') || ext.contains('\\') {
        return None;
    }

    // Extension must not contain braces (those are handled by parse_extension_set_pattern)
    if ext.contains('{') || ext.contains('}') {
        return None;
    }

    Some(ext.to_string())
}

/// Parse a pattern like `*.{ext1,ext2}` and return the extension set.
/// Returns `Some(HashSet)` if the pattern matches, otherwise `None`.
///
/// Note: This handles simple brace expansion for extensions only.
/// Complex patterns like `*.{a,b/*.c}` are not supported and return None.
fn parse_extension_set_pattern(pattern: &str) -> Option<HashSet<String>> {
    // Pattern must start with `*.{`
    if !pattern.starts_with("*.{") {
        return None;
    }

    // Pattern must end with `}`
    if !pattern.ends_with('}') {
        return None;
    }

    // Extract the brace content
    let brace_content = &pattern[3..pattern.len() - 1];

    // Split by comma (simple case - no nested braces)
    if brace_content.contains('{') || brace_content.contains('}') {
        return None; // Nested braces not supported for fast-path
    }

    let extensions: Vec<&str> = brace_content.split(',').collect();

    // Validate each extension
    for ext in &extensions {
        if ext.is_empty() {
            return None;
        }
        if has_magic_in_pattern(ext, false, false) {
            return None;
        }
        if ext.contains('/') || ext.contains('\\') {
            return None;
        }
    }

    Some(extensions.into_iter().map(String::from).collect())
}

/// Safety cap on a single numeric/alpha `{a..b[..c]}` brace range (§4.2).
/// Ranges whose expansion would exceed this are rejected by
/// `check_brace_range_safety` rather than materialized.
pub const BRACE_RANGE_SAFETY_CAP: usize = 65_536;

/// Scan `pattern` for `{start..end[..step]}` numeric ranges and return an
/// error describing the first one whose expansion would exceed
/// `BRACE_RANGE_SAFETY_CAP`, without materializing any of the expansion.
///
/// Comma alternatives are bounded by the size of the input text already, so
/// only numeric ranges need a check; `{0..999999999}` would otherwise try to
/// allocate roughly a billion strings.
pub fn check_brace_range_safety(pattern: &str) -> Result<(), String> {
    let escaped = escape_braces(pattern);
    check_brace_range_safety_internal(&escaped)
}

fn check_brace_range_safety_internal(s: &str) -> Result<(), String> {
    let (_pre, body, post) = match balanced_match(s) {
        Some(m) => m,
        None => return Ok(()),
    };

    if is_numeric_sequence(&body) {
        let parts: Vec<&str> = body.split("..").collect();
        let x = parse_numeric(parts[0]);
        let y = parse_numeric(parts[1]);
        let step = if parts.len() == 3 {
            parse_numeric(parts[2]).unsigned_abs().max(1)
        } else {
            1
        };
        let span = x.abs_diff(y);
        let count = span / step + 1;
        if count as usize > BRACE_RANGE_SAFETY_CAP {
            return Err(format!(
                "numeric brace range {{{body}}} would expand to {count} entries, \
                 exceeding the safety cap of {BRACE_RANGE_SAFETY_CAP}"
            ));
        }
    } else {
        check_brace_range_safety_internal(&body)?;
    }

    check_brace_range_safety_internal(&post)
}

/// Expand brace expressions in a glob pattern.
/// Supports:
/// - Comma alternatives: `{a,b,c}` -> `["a", "b", "c"]`
/// - Numeric sequences: `{1..5}` -> `["1", "2", "3", "4", "5"]`
/// - Alpha sequences: `{a..e}` -> `["a", "b", "c", "d", "e"]`
/// - Step values: `{1..10..2}` -> `["1", "3", "5", "7", "9"]`
/// - Zero-padding: `{01..03}` -> `["01", "02", "03"]`
/// - Nested braces: `{a,{b,c}}` -> `["a", "b", "c"]`
/// - Escaped braces: `\{a,b\}` stays as-is
pub fn expand_braces(pattern: &str) -> Vec<String> {
    if pattern.is_empty() {
        return vec![];
    }

    // Handle leading {} (bash quirk - preserve it)
    let pattern = if pattern.starts_with("{}") {
        format!("\\{{\\}}{}", &pattern[2..])
    } else {
        pattern.to_string()
    };

    // Escape special sequences
    let escaped = escape_braces(&pattern);

    // Expand and unescape
    expand_internal(&escaped, true)
        .into_iter()
        .map(|s| unescape_braces(&s))
        .collect()
}

/// Escape backslash sequences to prevent them from being processed
fn escape_braces(s: &str) -> String {
    s.replace("\\\\", ESC_SLASH)
        .replace("\\{", ESC_OPEN)
        .replace("\\}", ESC_CLOSE)
        .replace("\\,", ESC_COMMA)
        .replace("\\.", ESC_PERIOD)
}

/// Restore escaped sequences
fn unescape_braces(s: &str) -> String {
    s.replace(ESC_SLASH, "\\")
        .replace(ESC_OPEN, "{")
        .replace(ESC_CLOSE, "}")
        .replace(ESC_COMMA, ",")
        .replace(ESC_PERIOD, ".")
}

/// Find balanced braces in a string, returning (start, end) of the first balanced pair
fn find_balanced(s: &str, open: char, close: char) -> Option<(usize, usize)> {
    let chars: Vec<char> = s.chars().collect();
    let mut open_idx = None;
    let mut depth = 0;

    for (i, &c) in chars.iter().enumerate() {
        if c == open {
            if open_idx.is_none() {
                open_idx = Some(i);
            }
            depth += 1;
        } else if c == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return open_idx.map(|start| (start, i));
            }
        }
    }

    None
}

/// Extract pre, body, and post from a balanced brace match
fn balanced_match(s: &str) -> Option<(String, String, String)> {
    find_balanced(s, '{', '}').map(|(start, end)| {
        let pre = s[..start].to_string();
        let body = s[start + 1..end].to_string();
        let post = s[end + 1..].to_string();
        (pre, body, post)
    })
}

/// Parse comma-separated parts, respecting nested braces
fn parse_comma_parts(s: &str) -> Vec<String> {
    if s.is_empty() {
        return vec!["".to_string()];
    }

    // If no balanced braces, simple split
    if let Some((pre, body, post)) = balanced_match(s) {
        let mut p: Vec<String> = pre.split(',').map(String::from).collect();

        // Append the brace section to the last pre part
        if let Some(last) = p.last_mut() {
            last.push('{');
            last.push_str(&body);
            last.push('}');
        }

        // Recursively parse post
        let post_parts = parse_comma_parts(&post);
        if !post.is_empty() {
            if let Some(last) = p.last_mut() {
                if let Some(first_post) = post_parts.first() {
                    last.push_str(first_post);
                }
            }
            p.extend(post_parts.into_iter().skip(1));
        }

        p
    } else {
        s.split(',').map(String::from).collect()
    }
}

/// Check if a string represents a numeric sequence pattern
fn is_numeric_sequence(s: &str) -> bool {
    // Matches: -?\d+\.\.-?\d+(\.\.-?\d+)?
    let parts: Vec<&str> = s.split("..").collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }
    parts.iter().all(|p| {
        let p = p.trim_start_matches('-');
        !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())
    })
}

/// Check if a string represents an alpha sequence pattern
fn is_alpha_sequence(s: &str) -> bool {
    // Matches: [a-zA-Z]\.\.[a-zA-Z](\.\.-?\d+)?
    let parts: Vec<&str> = s.split("..").collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }

    // First two parts must be single letters
    if parts[0].len() != 1 || parts[1].len() != 1 {
        return false;
    }

    let c0 = parts[0].chars().next().unwrap();
    let c1 = parts[1].chars().next().unwrap();
    if !c0.is_ascii_alphabetic() || !c1.is_ascii_alphabetic() {
        return false;
    }

    // Third part (if exists) must be a number (step)
    if parts.len() == 3 {
        let p = parts[2].trim_start_matches('-');
        if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }

    true
}

/// Check if a number string has leading zeros (for padding)
fn is_padded(s: &str) -> bool {
    let s = s.trim_start_matches('-');
    s.len() > 1 && s.starts_with('0')
}

/// Parse a sequence part as either a number or a character code
fn parse_numeric(s: &str) -> i64 {
    s.parse::<i64>()
        .unwrap_or_else(|_| s.chars().next().map(|c| c as i64).unwrap_or(0))
}

/// Generate a numeric or alpha sequence
fn generate_sequence(parts: &[&str], is_alpha: bool) -> Vec<String> {
    let x = parse_numeric(parts[0]);
    let y = parse_numeric(parts[1]);
    let width = parts[0].len().max(parts[1].len());
    let mut incr = if parts.len() == 3 {
        parse_numeric(parts[2]).abs()
    } else {
        1
    };

    let reverse = y < x;
    if reverse {
        incr = -incr;
    }

    let pad = parts.iter().any(|p| is_padded(p));

    let mut result = Vec::new();
    let mut i = x;

    loop {
        let should_continue = if reverse { i >= y } else { i <= y };
        if !should_continue {
            break;
        }

        let s = if is_alpha {
            let c = (i as u8) as char;
            if c == '\\' {
                String::new()
            } else {
                c.to_string()
            }
        } else {
            let mut s = i.to_string();
            if pad {
                let need = width.saturating_sub(s.len());
                if need > 0 {
                    let zeros = "0".repeat(need);
                    if i < 0 {
                        s = format!("-{}{}", zeros, &s[1..]);
                    } else {
                        s = format!("{}{}", zeros, s);
                    }
                }
            }
            s
        };

        if !s.is_empty() {
            result.push(s);
        }

        i += incr;

        // Defense in depth: `check_brace_range_safety` is expected to reject
        // oversized ranges before this ever runs, but don't hang/OOM on a
        // range that reached here anyway.
        if result.len() > BRACE_RANGE_SAFETY_CAP {
            break;
        }
    }

    result
}

/// Internal expansion function
fn expand_internal(s: &str, is_top: bool) -> Vec<String> {
    // Find the first balanced brace pair
    let matched = balanced_match(s);

    if matched.is_none() {
        return vec![s.to_string()];
    }

    let (pre, body, post) = matched.unwrap();

    // Expand the post part recursively
    let post_expansions = if post.is_empty() {
        vec!["".to_string()]
    } else {
        expand_internal(&post, false)
    };

    // Check if pre ends with $ (bash variable syntax - don't expand)
    if pre.ends_with('$') {
        return post_expansions
            .iter()
            .map(|p| format!("{}{{{}}}{}", pre, body, p))
            .collect();
    }

    // Check what type of expansion we have
    let is_numeric_seq = is_numeric_sequence(&body);
    let is_alpha_seq = is_alpha_sequence(&body);
    let is_sequence = is_numeric_seq || is_alpha_seq;
    let is_options = body.contains(',');

    // If neither sequence nor options, might be a partial match
    if !is_sequence && !is_options {
        // Check for {a},b} case - look for comma followed by } in post
        if post.contains(',') && post.contains('}') {
            let new_str = format!("{}{{{}{}{}", pre, body, ESC_CLOSE, post);
            return expand_internal(&new_str, is_top);
        }
        return vec![s.to_string()];
    }

    // Generate the expansion parts
    let parts: Vec<String> = if is_sequence {
        let seq_parts: Vec<&str> = body.split("..").collect();
        generate_sequence(&seq_parts, is_alpha_seq)
    } else {
        // Comma-separated options
        let comma_parts = parse_comma_parts(&body);
        if comma_parts.len() == 1 {
            // Single item - might be nested braces: x{{a,b}}y
            let expanded = expand_internal(&comma_parts[0], false);
            let embraced: Vec<String> = expanded.iter().map(|e| format!("{{{}}}", e)).collect();
            if embraced.len() == 1 {
                return post_expansions
                    .iter()
                    .map(|p| format!("{}{}{}", pre, embraced[0], p))
                    .collect();
            }
            embraced
        } else {
            // Multiple comma-separated items - expand each recursively
            comma_parts
                .into_iter()
                .flat_map(|p| expand_internal(&p, false))
                .collect()
        }
    };

    // Combine pre + parts + post_expansions
    let mut result = Vec::new();
    for part in &parts {
        for post_exp in &post_expansions {
            let expansion = format!("{}{}{}", pre, part, post_exp);
            if !is_top || is_sequence || !expansion.is_empty() {
                result.push(expansion);
            }
        }
    }

    result
}

/// Magic glob characters that need escaping in glob patterns.
/// Note: This matches minimatch/glob's escape behavior which only escapes:
/// `*`, `?`, `[`, `]`, `(`, `)`
/// Braces `{}`, pipes `|`, `+`, `@`, `!` are NOT escaped because:
/// - Braces are expanded before pattern matching (and brace expansion can be disabled)
/// - Pipes only have meaning inside parentheses
/// - `+`, `@`, `!` only matter when followed by `(`
const ESCAPE_CHARS: &[char] = &['*', '?', '[', ']', '(', ')'];

/// Escape magic glob characters in a pattern.
///
/// This makes a pattern safe to use as a literal string match.
/// For example, `*.txt` becomes `\*.txt` which will only match
/// a file literally named `*.txt`.
///
/// Note: This matches glob/minimatch behavior and only escapes
/// `*`, `?`, `[`, `]`, `(`, `)`. Braces and other characters are not escaped.
///
/// # Arguments
/// * `pattern` - The pattern to escape
/// * `windows_paths_no_escape` - If true, use `[]` wrapping instead of backslash escapes
///
/// # Returns
/// The escaped pattern string
pub fn escape_pattern(pattern: &str, windows_paths_no_escape: bool) -> String {
    let mut result = String::with_capacity(pattern.len() * 2);

    for c in pattern.chars() {
        if ESCAPE_CHARS.contains(&c) {
            if windows_paths_no_escape {
                // On Windows with windowsPathsNoEscape, wrap in brackets instead
                // This makes `*` become `[*]` which matches literal `*`
                result.push('[');
                result.push(c);
                result.push(']');
            } else {
                // Use backslash escape
                result.push('\\');
                result.push(c);
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Unescape magic glob characters in a pattern.
///
/// This reverses the effect of `escape_pattern`, turning escaped
/// magic characters back into literals.
///
/// # Arguments
/// * `pattern` - The pattern to unescape
/// * `windows_paths_no_escape` - If true, remove `[]` wrapping instead of backslash escapes
///
/// # Returns
/// The unescaped pattern string
pub fn unescape_pattern(pattern: &str, windows_paths_no_escape: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if windows_paths_no_escape {
            // Look for `[x]` pattern where x is a magic character
            if c == '['
                && i + 2 < chars.len()
                && chars[i + 2] == ']'
                && ESCAPE_CHARS.contains(&chars[i + 1])
            {
                result.push(chars[i + 1]);
                i += 3;
                continue;
            }
        } else {
            // Look for `\x` pattern where x is a magic character
            if c == '\\' && i + 1 < chars.len() && ESCAPE_CHARS.contains(&chars[i + 1]) {
                result.push(chars[i + 1]);
                i += 2;
                continue;
            }
        }

        result.push(c);
        i += 1;
    }

    result
}


#[cfg(test)]
mod test_bstar {
    use super::*;

    #[test]
    fn test_bstar_pattern_matches() {
        let pat = Pattern::new("b**");

        // Should match - adjacent `**` after literal becomes `*` (no path separator)
        assert!(pat.matches("b"), "b** should match 'b'");
        assert!(pat.matches("bc"), "b** should match 'bc'");
        assert!(pat.matches("bcd"), "b** should match 'bcd'");

        // Should NOT match - b** is NOT a globstar when adjacent to literal,
        // so it collapses to two bounded `*` wildcards that cannot cross `/`.
        assert!(!pat.matches("b/c"), "b** should NOT match 'b/c'");
        assert!(!pat.matches("bc/e"), "b** should NOT match 'bc/e'");
        assert!(!pat.matches("c"), "b** should NOT match 'c'");
    }

    #[test]
    fn test_c_star_pattern_matches() {
        let pat = Pattern::new("c/*");

        // Should match
        assert!(pat.matches("c/d"), "c/* should match 'c/d'");
        assert!(pat.matches("c/x"), "c/* should match 'c/x'");

        // Should NOT match
        assert!(!pat.matches("c"), "c/* should NOT match 'c'");
        assert!(!pat.matches("c/d/e"), "c/* should NOT match 'c/d/e'");
    }
}

#[cfg(test)]
mod test_nocase {
    use super::*;

    fn make_pattern(pattern: &str, nocase: bool) -> Pattern {
        Pattern::with_pattern_options(
            pattern,
            PatternOptions {
                nocase,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_nocase_simple_pattern() {
        // Case-sensitive (default)
        let pat = make_pattern("*.TXT", false);
        assert!(pat.matches("file.TXT"));
        assert!(!pat.matches("file.txt"));
        assert!(!pat.matches("file.Txt"));

        // Case-insensitive
        let pat = make_pattern("*.TXT", true);
        assert!(pat.matches("file.TXT"));
        assert!(pat.matches("file.txt"));
        assert!(pat.matches("file.Txt"));
    }

    #[test]
    fn test_nocase_literal_pattern() {
        // Case-sensitive (default)
        let pat = make_pattern("README.md", false);
        assert!(pat.matches("README.md"));
        assert!(!pat.matches("readme.md"));
        assert!(!pat.matches("Readme.MD"));

        // Case-insensitive
        let pat = make_pattern("README.md", true);
        assert!(pat.matches("README.md"));
        assert!(pat.matches("readme.md"));
        assert!(pat.matches("Readme.MD"));
    }

    #[test]
    fn test_nocase_globstar() {
        // Case-insensitive globstar matching
        let pat = make_pattern("**/*.JS", true);
        assert!(pat.matches("file.js"));
        assert!(pat.matches("src/file.JS"));
        assert!(pat.matches("src/lib/FILE.Js"));
    }

    #[test]
    fn test_nocase_path_segments() {
        // Case-insensitive matching for entire path
        let pat = make_pattern("SRC/**/*.js", true);
        assert!(pat.matches("src/main.js"));
        assert!(pat.matches("SRC/main.js"));
        assert!(pat.matches("Src/lib/util.js"));
    }

    #[test]
    fn test_nocase_character_class() {
        // Character classes should also be case-insensitive with nocase
        let pat = make_pattern("[ABC]", true);
        assert!(pat.matches("a"));
        assert!(pat.matches("A"));
        assert!(pat.matches("b"));
        assert!(pat.matches("B"));
    }

    #[test]
    fn test_nocase_question_mark() {
        // Question mark with case-insensitive
        let pat = make_pattern("???.JS", true);
        assert!(pat.matches("foo.js"));
        assert!(pat.matches("BAR.JS"));
        assert!(pat.matches("Baz.Js"));
    }

    #[test]
    fn test_nocase_preserves_results() {
        // The matching should work, but results preserve original case
        // (This is just testing that matching works - result formatting is in glob.rs)
        let pat = make_pattern("*.txt", true);
        assert!(pat.matches("FILE.TXT"));
        assert!(pat.matches("file.txt"));
    }
}


#[cfg(test)]
mod test_fast_path {
    use super::*;

    // Fast-path detection tests

    #[test]
    fn test_extension_only_pattern() {
        // *.ext should use ExtensionOnly fast-path
        let pattern = Pattern::new("*.js");
        assert!(
            matches!(pattern.fast_path(), FastPath::ExtensionOnly(ext) if ext == "js"),
            "*.js should be ExtensionOnly(js), got {:?}",
            pattern.fast_path()
        );

        let pattern = Pattern::new("*.ts");
        assert!(matches!(pattern.fast_path(), FastPath::ExtensionOnly(ext) if ext == "ts"));

        let pattern = Pattern::new("*.txt");
        assert!(matches!(pattern.fast_path(), FastPath::ExtensionOnly(ext) if ext == "txt"));
    }

    #[test]
    fn test_extension_set_pattern() {
        // *.{ext1,ext2} should use ExtensionSet fast-path
        let pattern = Pattern::new("*.{js,ts}");
        match pattern.fast_path() {
            FastPath::ExtensionSet(exts) => {
                assert!(exts.contains("js"), "Should contain js");
                assert!(exts.contains("ts"), "Should contain ts");
                assert_eq!(exts.len(), 2, "Should have exactly 2 extensions");
            }
            other => panic!("Expected ExtensionSet, got {:?}", other),
        }

        let pattern = Pattern::new("*.{json,yaml,yml}");
        match pattern.fast_path() {
            FastPath::ExtensionSet(exts) => {
                assert!(exts.contains("json"));
                assert!(exts.contains("yaml"));
                assert!(exts.contains("yml"));
                assert_eq!(exts.len(), 3);
            }
            other => panic!("Expected ExtensionSet, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_name_pattern() {
        // Literal filename should use LiteralName fast-path
        let pattern = Pattern::new("package.json");
        assert!(
            matches!(pattern.fast_path(), FastPath::LiteralName(name) if name == "package.json"),
            "package.json should be LiteralName, got {:?}",
            pattern.fast_path()
        );

        let pattern = Pattern::new("README.md");
        assert!(matches!(pattern.fast_path(), FastPath::LiteralName(name) if name == "README.md"));

        let pattern = Pattern::new(".gitignore");
        assert!(matches!(pattern.fast_path(), FastPath::LiteralName(name) if name == ".gitignore"));
    }

    #[test]
    fn test_recursive_extension_pattern() {
        // **/*.ext should use RecursiveExtension fast-path
        let pattern = Pattern::new("**/*.js");
        assert!(
            matches!(pattern.fast_path(), FastPath::RecursiveExtension(ext) if ext == "js"),
            "**/*.js should be RecursiveExtension(js), got {:?}",
            pattern.fast_path()
        );

        let pattern = Pattern::new("**/*.ts");
        assert!(matches!(pattern.fast_path(), FastPath::RecursiveExtension(ext) if ext == "ts"));

        let pattern = Pattern::new("**/*.md");
        assert!(matches!(pattern.fast_path(), FastPath::RecursiveExtension(ext) if ext == "md"));
    }

    #[test]
    fn test_recursive_extension_set_pattern() {
        // **/*.{ext1,ext2} should use RecursiveExtensionSet fast-path
        let pattern = Pattern::new("**/*.{js,ts}");
        match pattern.fast_path() {
            FastPath::RecursiveExtensionSet(exts) => {
                assert!(exts.contains("js"));
                assert!(exts.contains("ts"));
                assert_eq!(exts.len(), 2);
            }
            other => panic!("Expected RecursiveExtensionSet, got {:?}", other),
        }
    }

    #[test]
    fn test_no_fast_path_for_complex_patterns() {
        // Patterns with literal prefixes should not use fast-path
        let pattern = Pattern::new("src/**/*.js");
        assert!(
            matches!(pattern.fast_path(), FastPath::None),
            "src/**/*.js should be None, got {:?}",
            pattern.fast_path()
        );

        // Patterns with multiple wildcards
        let pattern = Pattern::new("*/*/*.js");
        assert!(matches!(pattern.fast_path(), FastPath::None));

        // Patterns with question marks
        let pattern = Pattern::new("*.???");
        assert!(matches!(pattern.fast_path(), FastPath::None));

        // Patterns with character classes
        let pattern = Pattern::new("*.[jt]s");
        assert!(matches!(pattern.fast_path(), FastPath::None));

        // Patterns with extglobs
        let pattern = Pattern::new("*.+(js|ts)");
        assert!(matches!(pattern.fast_path(), FastPath::None));
    }

    // Fast-path matching tests

    #[test]
    fn test_matches_fast_extension_only() {
        let pattern = Pattern::new("*.js");

        // Should match
        assert_eq!(pattern.matches_fast("foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("bar.js"), Some(true));
        assert_eq!(pattern.matches_fast("index.js"), Some(true));

        // Should not match
        assert_eq!(pattern.matches_fast("foo.ts"), Some(false));
        assert_eq!(pattern.matches_fast("foo.jsx"), Some(false));
        assert_eq!(pattern.matches_fast("foo"), Some(false));
    }

    #[test]
    fn test_matches_fast_extension_set() {
        let pattern = Pattern::new("*.{js,ts}");

        // Should match
        assert_eq!(pattern.matches_fast("foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("foo.ts"), Some(true));

        // Should not match
        assert_eq!(pattern.matches_fast("foo.jsx"), Some(false));
        assert_eq!(pattern.matches_fast("foo.tsx"), Some(false));
    }

    #[test]
    fn test_matches_fast_literal_name() {
        let pattern = Pattern::new("package.json");

        // Should match
        assert_eq!(pattern.matches_fast("package.json"), Some(true));

        // Should not match
        assert_eq!(pattern.matches_fast("package-lock.json"), Some(false));
        assert_eq!(pattern.matches_fast("tsconfig.json"), Some(false));
        assert_eq!(pattern.matches_fast("PACKAGE.JSON"), Some(false)); // case-sensitive
    }

    #[test]
    fn test_matches_fast_recursive_extension() {
        let pattern = Pattern::new("**/*.js");

        // Should match files at any depth
        assert_eq!(pattern.matches_fast("foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("src/foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("src/lib/deep/foo.js"), Some(true));

        // Should not match wrong extensions
        assert_eq!(pattern.matches_fast("foo.ts"), Some(false));
        assert_eq!(pattern.matches_fast("src/foo.ts"), Some(false));
    }

    #[test]
    fn test_matches_fast_recursive_extension_set() {
        let pattern = Pattern::new("**/*.{js,ts}");

        // Should match
        assert_eq!(pattern.matches_fast("foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("src/foo.ts"), Some(true));

        // Should not match
        assert_eq!(pattern.matches_fast("foo.jsx"), Some(false));
    }

    #[test]
    fn test_matches_fast_returns_none_for_complex() {
        // Complex patterns should return None (use regex fallback)
        let pattern = Pattern::new("src/**/*.js");
        assert_eq!(pattern.matches_fast("src/foo.js"), None);

        let pattern = Pattern::new("*/*/*.js");
        assert_eq!(pattern.matches_fast("a/b/c.js"), None);
    }

    #[test]
    fn test_matches_fast_nocase() {
        // Case-insensitive matching
        let pattern = Pattern::with_pattern_options(
            "*.JS",
            PatternOptions {
                nocase: true,
                ..Default::default()
            },
        );

        assert_eq!(pattern.matches_fast("foo.js"), Some(true));
        assert_eq!(pattern.matches_fast("foo.JS"), Some(true));
        assert_eq!(pattern.matches_fast("foo.Js"), Some(true));

        // Literal name with nocase
        let pattern = Pattern::with_pattern_options(
            "README.md",
            PatternOptions {
                nocase: true,
                ..Default::default()
            },
        );

        assert_eq!(pattern.matches_fast("readme.md"), Some(true));
        assert_eq!(pattern.matches_fast("README.MD"), Some(true));
        assert_eq!(pattern.matches_fast("Readme.Md"), Some(true));
    }

    // Helper function tests

    #[test]
    fn test_parse_extension_pattern() {
        // Valid extension patterns
        assert_eq!(parse_extension_pattern("*.js"), Some("js".to_string()));
        assert_eq!(parse_extension_pattern("*.ts"), Some("ts".to_string()));
        assert_eq!(parse_extension_pattern("*.json"), Some("json".to_string()));

        // Invalid patterns
        assert_eq!(parse_extension_pattern("*."), None); // empty extension
        assert_eq!(parse_extension_pattern("**/*.js"), None); // has **
        assert_eq!(parse_extension_pattern("*.j?s"), None); // has magic
        assert_eq!(parse_extension_pattern("*.j*s"), None); // has magic
        assert_eq!(parse_extension_pattern("foo.js"), None); // no leading *
        assert_eq!(parse_extension_pattern("*.js/bar"), None); // has path separator
    }

    #[test]
    fn test_parse_extension_set_pattern() {
        // Valid extension set patterns
        let result = parse_extension_set_pattern("*.{js,ts}");
        assert!(result.is_some());
        let exts = result.unwrap();
        assert!(exts.contains("js"));
        assert!(exts.contains("ts"));

        let result = parse_extension_set_pattern("*.{json,yaml,yml}");
        assert!(result.is_some());
        let exts = result.unwrap();
        assert_eq!(exts.len(), 3);

        // Invalid patterns
        assert!(parse_extension_set_pattern("*.js").is_none()); // no braces
        assert!(parse_extension_set_pattern("*.{js}").is_some()); // single item is ok
        assert!(parse_extension_set_pattern("*.{js,}").is_none()); // empty item
        assert!(parse_extension_set_pattern("*.{,ts}").is_none()); // empty item
        assert!(parse_extension_set_pattern("*.{js,t*s}").is_none()); // magic in extension
    }

    #[test]
    fn test_fast_path_is_fast() {
        assert!(FastPath::ExtensionOnly("js".to_string()).is_fast());
        assert!(FastPath::ExtensionSet(HashSet::new()).is_fast());
        assert!(FastPath::LiteralName("foo".to_string()).is_fast());
        assert!(FastPath::RecursiveExtension("js".to_string()).is_fast());
        assert!(FastPath::RecursiveExtensionSet(HashSet::new()).is_fast());
        assert!(!FastPath::None.is_fast());
    }
}
