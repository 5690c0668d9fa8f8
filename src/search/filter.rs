//! Applies a [`super::options::SemanticFilter`] to a confirmed match,
//! using whatever AST-derived context (enclosing symbol, lexical
//! region) the caller can attach. This module only judges; region
//! classification and symbol lookup are the caller's job (typically
//! `SearchEngine`, which has the `SymbolTable` and file bytes at hand).

use crate::symbols::Symbol;

use super::options::{OccurrenceFilter, SemanticFilter};

/// Which lexical region a concrete match offset falls in, and whether
/// it coincides with a symbol's own declaration span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchContext {
    pub region: MatchRegion,
    pub is_declaration: bool,
    /// Whether the match's file is recognized as test code (by path
    /// convention, e.g. `tests/`, `_test.rs`).
    pub in_test_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRegion {
    Code,
    Comment,
    StringLiteral,
    /// Backtick-delimited template/interpolated string, tracked
    /// separately from `StringLiteral` since callers may want strings
    /// without template interpolation noise, or vice versa.
    TemplateString,
}

/// Returns `true` if the match should be kept under `filter`, given
/// its `context` and the symbol (if any) enclosing it.
pub fn passes(filter: &SemanticFilter, context: MatchContext, enclosing: Option<&Symbol>) -> bool {
    if !region_passes(filter, context.region) {
        return false;
    }

    if !occurrence_matches(filter.occurrence, context.is_declaration) {
        return false;
    }

    if filter.exclude_tests && context.in_test_file {
        return false;
    }

    if filter.exported_only || filter.mutable_only || filter.global_only || !filter.symbol_kinds.is_empty() {
        let Some(symbol) = enclosing else {
            // A filter that requires symbol-level facts can't be
            // satisfied by a match with no enclosing symbol at all.
            return false;
        };

        if filter.exported_only && !symbol.is_exported {
            return false;
        }
        if filter.mutable_only && !symbol.is_mutable {
            return false;
        }
        if filter.global_only && !symbol.is_global {
            return false;
        }
        if !filter.symbol_kinds.is_empty() && !filter.symbol_kinds.contains(&symbol.kind) {
            return false;
        }
    }

    true
}

fn region_passes(filter: &SemanticFilter, region: MatchRegion) -> bool {
    if filter.exclude_comments && region == MatchRegion::Comment {
        return false;
    }
    if filter.code_only && region != MatchRegion::Code {
        return false;
    }
    if filter.comments_only && region != MatchRegion::Comment {
        return false;
    }
    if filter.strings_only {
        let is_string = region == MatchRegion::StringLiteral
            || (filter.include_template_strings && region == MatchRegion::TemplateString);
        if !is_string {
            return false;
        }
    }
    true
}

fn occurrence_matches(wanted: OccurrenceFilter, is_declaration: bool) -> bool {
    match wanted {
        OccurrenceFilter::Any => true,
        OccurrenceFilter::DeclarationOnly => is_declaration,
        OccurrenceFilter::UsageOnly => !is_declaration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Span, SymbolKind};

    fn ctx(region: MatchRegion, is_declaration: bool) -> MatchContext {
        MatchContext { region, is_declaration, in_test_file: false }
    }

    fn exported_symbol() -> Symbol {
        let mut s = Symbol::new("run", SymbolKind::Function, Span { start: 0, end: 10 });
        s.is_exported = true;
        s
    }

    #[test]
    fn exported_only_rejects_private_symbol() {
        let mut filter = SemanticFilter::default();
        filter.exported_only = true;
        let mut symbol = exported_symbol();
        symbol.is_exported = false;
        assert!(!passes(&filter, ctx(MatchRegion::Code, true), Some(&symbol)));
    }

    #[test]
    fn exported_only_accepts_exported_symbol() {
        let mut filter = SemanticFilter::default();
        filter.exported_only = true;
        let symbol = exported_symbol();
        assert!(passes(&filter, ctx(MatchRegion::Code, true), Some(&symbol)));
    }

    #[test]
    fn code_only_rejects_string_literal_match() {
        let mut filter = SemanticFilter::default();
        filter.code_only = true;
        assert!(!passes(&filter, ctx(MatchRegion::StringLiteral, false), None));
    }

    #[test]
    fn strings_only_rejects_template_string_without_opt_in() {
        let mut filter = SemanticFilter::default();
        filter.strings_only = true;
        assert!(!passes(&filter, ctx(MatchRegion::TemplateString, false), None));
    }

    #[test]
    fn strings_only_with_template_strings_admits_both_kinds() {
        let mut filter = SemanticFilter::default();
        filter.strings_only = true;
        filter.include_template_strings = true;
        assert!(passes(&filter, ctx(MatchRegion::TemplateString, false), None));
        assert!(passes(&filter, ctx(MatchRegion::StringLiteral, false), None));
        assert!(!passes(&filter, ctx(MatchRegion::Code, false), None));
    }

    #[test]
    fn exclude_comments_is_independent_of_code_only() {
        // "code and strings, but not comments" — exclude_comments
        // alone must not also reject StringLiteral the way the old
        // single-enum RegionFilter::CodeOnly would have.
        let mut filter = SemanticFilter::default();
        filter.exclude_comments = true;
        assert!(passes(&filter, ctx(MatchRegion::StringLiteral, false), None));
        assert!(passes(&filter, ctx(MatchRegion::Code, false), None));
        assert!(!passes(&filter, ctx(MatchRegion::Comment, false), None));
    }

    #[test]
    fn exclude_tests_rejects_matches_in_test_files() {
        let mut filter = SemanticFilter::default();
        filter.exclude_tests = true;
        let test_ctx = MatchContext { region: MatchRegion::Code, is_declaration: false, in_test_file: true };
        assert!(!passes(&filter, test_ctx, None));
    }

    #[test]
    fn symbol_required_filter_rejects_match_with_no_enclosing_symbol() {
        let mut filter = SemanticFilter::default();
        filter.mutable_only = true;
        assert!(!passes(&filter, ctx(MatchRegion::Code, false), None));
    }

    #[test]
    fn default_filter_accepts_anything() {
        let filter = SemanticFilter::default();
        assert!(passes(&filter, ctx(MatchRegion::StringLiteral, false), None));
    }
}
