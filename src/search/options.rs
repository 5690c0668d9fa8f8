//! Query-time options (spec §6). These are in-memory structs only —
//! no config-file, environment or CLI loading lives in this crate;
//! a collaborator front-end is expected to build a `SearchOptions`
//! from whatever its own configuration surface looks like.

use serde::{Deserialize, Serialize};

use crate::symbols::SymbolKind;

/// Whether a match must land on a symbol's declaration vs. a usage
/// site, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceFilter {
    Any,
    DeclarationOnly,
    UsageOnly,
}

impl Default for OccurrenceFilter {
    fn default() -> Self {
        OccurrenceFilter::Any
    }
}

/// How much of a `SearchHit` a caller wants filled in — trades payload
/// size against round trips for UIs that only need a file/line list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSize {
    /// Location only, no context lines or relational data.
    Compact,
    /// Location plus a short context window (default).
    Standard,
    /// Everything the engine can attach: full context, breadcrumbs,
    /// references, dependencies.
    Full,
}

impl Default for OutputSize {
    fn default() -> Self {
        OutputSize::Standard
    }
}

/// AST-derived post-match filtering (spec §4.9's `SemanticFilter`),
/// applied after a candidate match is confirmed against file bytes.
/// Flags are independent booleans rather than a single mutually
/// exclusive region enum, so a caller can ask for e.g. "code, not
/// comments, excluding test symbols" in one filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticFilter {
    /// Keep only matches in plain code, outside strings and comments.
    pub code_only: bool,
    /// Keep only matches inside string literals.
    pub strings_only: bool,
    /// Keep only matches inside comments.
    pub comments_only: bool,
    /// Drop matches inside comments, independent of `code_only` — lets
    /// a caller ask for "strings and code, but not comments" without
    /// `code_only` also excluding the strings.
    pub exclude_comments: bool,
    /// Widen `strings_only` to also admit backtick-delimited template
    /// strings, which are tracked as a distinct region from ordinary
    /// quoted string literals.
    pub include_template_strings: bool,
    /// Drop matches whose enclosing symbol or containing file is
    /// recognized as test code.
    pub exclude_tests: bool,
    pub occurrence: OccurrenceFilter,
    pub exported_only: bool,
    pub mutable_only: bool,
    pub global_only: bool,
    pub symbol_kinds: Vec<SymbolKind>,
}

/// Top-level options accepted by `SearchEngine::search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub pattern: String,
    pub case_sensitive: bool,
    /// If `false`, `pattern` is auto-detected as literal or regex via
    /// the regex heuristic; if `true`, `pattern` is always compiled
    /// as a regex regardless of heuristic.
    pub force_regex: bool,
    pub whole_word: bool,
    pub max_results: usize,
    pub paths: Vec<String>,
    pub semantic: SemanticFilter,
    /// Keep only lines that do NOT match `pattern`, the grep `-v`
    /// sense — applied after region/symbol filtering.
    pub invert_match: bool,
    /// Skip candidate files whose path looks like test code entirely,
    /// before their bytes are even scanned. Coarser and cheaper than
    /// `semantic.exclude_tests`, which filters per-match.
    pub exclude_tests: bool,
    /// Lines of surrounding context to attach to each hit's
    /// `context_lines`, like `grep -C`.
    pub max_context_lines: u32,
    /// Collapse multiple hits in the same file into one `SearchHit`
    /// per file rather than one per match.
    pub merge_file_results: bool,
    /// Extend `context_lines` to cover the whole enclosing function,
    /// capped at `max_function_line_count`, instead of a fixed window.
    pub full_function: bool,
    pub max_function_line_count: u32,
    /// Extra lines of padding kept around a `full_function` context
    /// window.
    pub context_padding: u32,
    /// Report one aggregate count per file instead of per-match hits.
    pub count_per_file: bool,
    /// Report only the list of matching files, no per-match detail.
    pub files_only: bool,
    /// Stop collecting further hits from a single file once it has
    /// contributed this many, to bound a single hot file's share of
    /// the result set.
    pub max_count_per_file: Option<usize>,
    pub include_object_ids: bool,
    /// Attach a short "enclosing scope" trail (e.g. `Module > Class >
    /// method`) to each hit.
    pub include_breadcrumbs: bool,
    /// Attach async/unsafe/deprecated-style safety flags from the
    /// enclosing symbol.
    pub include_safety: bool,
    pub include_references: bool,
    pub include_dependencies: bool,
    pub output_size: OutputSize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            pattern: String::new(),
            case_sensitive: false,
            force_regex: false,
            whole_word: false,
            max_results: DEFAULT_MAX_RESULTS,
            paths: Vec::new(),
            semantic: SemanticFilter::default(),
            invert_match: false,
            exclude_tests: false,
            max_context_lines: 0,
            merge_file_results: false,
            full_function: false,
            max_function_line_count: DEFAULT_MAX_FUNCTION_LINE_COUNT,
            context_padding: 0,
            count_per_file: false,
            files_only: false,
            max_count_per_file: None,
            include_object_ids: false,
            include_breadcrumbs: false,
            include_safety: false,
            include_references: false,
            include_dependencies: false,
            output_size: OutputSize::default(),
        }
    }
}

/// Cap applied when a caller doesn't specify one, preventing an
/// unbounded pattern like a single common character from returning
/// the entire corpus.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Hard ceiling `normalize` clamps `max_results` to, independent of
/// what a caller requests.
pub const MAX_RESULTS_CEILING: usize = 10_000;

/// Default cap on how many lines a `full_function` context window may
/// span, for a function whose body is pathologically long.
pub const DEFAULT_MAX_FUNCTION_LINE_COUNT: u32 = 200;

impl SearchOptions {
    pub fn new(pattern: impl Into<String>) -> Self {
        SearchOptions {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Repair caller-supplied option combinations that don't compose
    /// (spec §6): `max_results == 0` means "use the default," not "no
    /// results," and the value is always clamped to
    /// `MAX_RESULTS_CEILING`. `whole_word` with `force_regex` is
    /// meaningless on a regex pattern that isn't a literal, so
    /// `whole_word` is dropped in that case rather than silently
    /// wrapping the caller's regex in `\b`. `max_function_line_count`
    /// of `0` falls back to the default rather than producing an
    /// empty context window whenever `full_function` is set.
    pub fn normalize(mut self) -> Self {
        if self.max_results == 0 {
            self.max_results = DEFAULT_MAX_RESULTS;
        }
        self.max_results = self.max_results.min(MAX_RESULTS_CEILING);

        if self.force_regex {
            self.whole_word = false;
        }

        if self.max_function_line_count == 0 {
            self.max_function_line_count = DEFAULT_MAX_FUNCTION_LINE_COUNT;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_results_normalizes_to_default() {
        let opts = SearchOptions::new("x");
        let mut opts = opts;
        opts.max_results = 0;
        assert_eq!(opts.normalize().max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn max_results_is_clamped_to_ceiling() {
        let mut opts = SearchOptions::new("x");
        opts.max_results = 1_000_000;
        assert_eq!(opts.normalize().max_results, MAX_RESULTS_CEILING);
    }

    #[test]
    fn force_regex_drops_whole_word() {
        let mut opts = SearchOptions::new("a.*b");
        opts.force_regex = true;
        opts.whole_word = true;
        let normalized = opts.normalize();
        assert!(!normalized.whole_word);
    }

    #[test]
    fn zero_max_function_line_count_normalizes_to_default() {
        let mut opts = SearchOptions::new("x");
        opts.full_function = true;
        opts.max_function_line_count = 0;
        assert_eq!(opts.normalize().max_function_line_count, DEFAULT_MAX_FUNCTION_LINE_COUNT);
    }
}
